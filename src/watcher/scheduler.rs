use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Watcher;

/// Runs a batch right away, then once per `period`, until `cancel` fires.
///
/// A batch already running is allowed to finish; cancellation is only
/// observed between batches. The watcher is handed back for the final save.
pub(crate) async fn run(
    mut watcher: Watcher,
    period: Duration,
    cancel: CancellationToken,
) -> Watcher {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("context done: stopping worker");
                break;
            }
            _ = ticker.tick() => watcher.run_batch().await,
        }
    }
    watcher
}
