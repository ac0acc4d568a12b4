use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::{Watcher, scheduler};
use crate::snapshot::{Snapshot, SnapshotError, SnapshotStore};

/// Handle on the running watcher.
///
/// Cancelling the token given to [`Controller::start`] stops the worker,
/// waits for the current batch, saves the snapshot, then releases every
/// [`Controller::wait_stopped`] caller.
#[derive(Clone)]
pub(crate) struct Controller {
    stopped: watch::Receiver<bool>,
}

impl Controller {
    pub(crate) async fn start(
        mut watcher: Watcher,
        store: SnapshotStore,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        match load_snapshot(&store).await {
            Ok(Some(snapshot)) => {
                info!(
                    path = %store.path().display(),
                    saved_at = %snapshot.saved_at,
                    tracked = snapshot.watch_list.as_ref().map_or(0, |list| list.len()),
                    "previous state restored"
                );
                watcher.restore(snapshot);
            }
            Ok(None) => info!(
                path = %store.path().display(),
                "no previous state: the watch list will be built on the first batch"
            ),
            Err(err) => warn!(
                path = %store.path().display(),
                error = %err,
                "failed to load previous state: starting from scratch"
            ),
        }

        let tracker = TaskTracker::new();
        let worker = tracker.spawn(scheduler::run(watcher, poll_interval, cancel.clone()));
        tracker.close();

        let (stopped_tx, stopped_rx) = watch::channel(false);
        tokio::spawn(autostop(cancel, tracker, worker, store, stopped_tx));

        Self {
            stopped: stopped_rx,
        }
    }

    /// Blocks until the watcher is fully stopped. Safe to call from many tasks.
    pub(crate) async fn wait_stopped(&self) {
        let mut stopped = self.stopped.clone();
        // Err only if the stopper is gone, in which case there is nothing left to wait for.
        let _ = stopped.wait_for(|done| *done).await;
    }
}

async fn autostop(
    cancel: CancellationToken,
    tracker: TaskTracker,
    worker: JoinHandle<Watcher>,
    store: SnapshotStore,
    stopped: watch::Sender<bool>,
) {
    cancel.cancelled().await;
    debug!("stop requested: waiting for in-flight work");
    tracker.wait().await;

    match worker.await {
        Ok(watcher) => match save_snapshot(&store, watcher.snapshot()).await {
            Ok(()) => info!(
                path = %store.path().display(),
                tracked = watcher.watch_list().map_or(0, |list| list.len()),
                "state saved"
            ),
            Err(err) => error!(
                path = %store.path().display(),
                error = %err,
                "failed to save state"
            ),
        },
        // A panicked worker dropped the watch list with it. The file on disk
        // keeps the last saved state, which never claims an undelivered completion.
        Err(err) => error!(error = %err, "worker did not stop cleanly: state not saved"),
    }

    stopped.send_replace(true);
    info!("watcher stopped");
}

async fn load_snapshot(store: &SnapshotStore) -> Result<Option<Snapshot>, SnapshotError> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|err| SnapshotError::Task(err.to_string()))?
}

async fn save_snapshot(store: &SnapshotStore, snapshot: Snapshot) -> Result<(), SnapshotError> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.save(&snapshot))
        .await
        .map_err(|err| SnapshotError::Task(err.to_string()))?
}
