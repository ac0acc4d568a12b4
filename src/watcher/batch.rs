use std::collections::BTreeSet;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{AiringStatus, WatchList, Watcher};
use crate::catalog::{CatalogError, SeasonEntry, TitleDetails};
use crate::notify::Notification;
use crate::season::SeasonId;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("season {step}/{total} ({season}): failed to fetch season titles: {source}")]
    Season {
        step: usize,
        total: usize,
        season: SeasonId,
        source: CatalogError,
    },
    #[error("season {step}/{total} ({season}): failed to fetch details of MalID {mal_id}: {source}")]
    Details {
        step: usize,
        total: usize,
        season: SeasonId,
        mal_id: u32,
        source: CatalogError,
    },
}

/// Titles detected as finished during a batch, keyed by their watch-list id.
type FinishedBatch = Vec<(u32, TitleDetails)>;

/// Result of a complete bootstrap: the tracked titles and the ones skipped
/// because they had already finished.
struct InitialList {
    list: WatchList,
    skipped: BTreeSet<u32>,
}

impl Watcher {
    /// One scheduling tick: bootstrap the list if needed, otherwise refresh,
    /// discover, then notify.
    pub(crate) async fn run_batch(&mut self) {
        let started = Instant::now();
        info!("starting new batch");

        if self.needs_initial_list() {
            info!(seasons = self.seasons, "initializing watch list...");
            match self.build_initial_list().await {
                Ok(InitialList { list, skipped }) => {
                    info!(
                        tracked = list.len(),
                        skipped = skipped.len(),
                        "watch list initialized"
                    );
                    self.watch_list = Some(list);
                    self.skipped = skipped;
                }
                // Nothing is kept: the next batch starts over from the current season.
                Err(err) => error!(error = %err, "failed to build initial list"),
            }
        } else {
            let mut finished = self.refresh_statuses().await;
            finished.extend(self.discover_new_titles().await);
            self.dispatch_finished(finished).await;
        }

        info!(elapsed = ?started.elapsed(), "batch executed");
    }

    async fn fetch_season(&self, season: SeasonId) -> Result<Vec<SeasonEntry>, CatalogError> {
        self.limiter.acquire().await;
        self.catalog.season(season).await
    }

    async fn fetch_details(&mut self, mal_id: u32) -> Result<TitleDetails, CatalogError> {
        self.limiter.acquire().await;
        let anime = self.catalog.details(mal_id).await?;
        self.filters.record(&anime);
        Ok(anime)
    }

    async fn build_initial_list(&mut self) -> Result<InitialList, BootstrapError> {
        let total = self.seasons as usize;
        let mut list = WatchList::new();
        let mut skipped = BTreeSet::new();

        let current = SeasonId::containing((self.today)());
        for (index, season) in current.walk_back(total).enumerate() {
            let step = index + 1;
            let entries = self
                .fetch_season(season)
                .await
                .map_err(|source| BootstrapError::Season {
                    step,
                    total,
                    season,
                    source,
                })?;
            info!(
                "building initial list: season {step}/{total} ({season}): fetching details for {} titles...",
                entries.len()
            );

            let before = list.len();
            for (position, entry) in entries.iter().enumerate() {
                let anime = self.fetch_details(entry.mal_id).await.map_err(|source| {
                    BootstrapError::Details {
                        step,
                        total,
                        season,
                        mal_id: entry.mal_id,
                        source,
                    }
                })?;
                let title = anime.display_title();
                let position = position + 1;
                match AiringStatus::from_remote(&anime.status) {
                    Some(status @ (AiringStatus::NotAired | AiringStatus::Airing)) => {
                        if list.contains_key(&entry.mal_id) {
                            debug!(
                                mal_id = entry.mal_id,
                                "building initial list: {position}/{}: '{title}' is '{}': already in the list",
                                entries.len(),
                                status.label()
                            );
                        } else {
                            debug!(
                                mal_id = entry.mal_id,
                                "building initial list: {position}/{}: '{title}' is '{}': adding it to the list",
                                entries.len(),
                                status.label()
                            );
                            list.insert(entry.mal_id, status);
                        }
                    }
                    // Completed before tracking started: remembered so that
                    // discovery never picks it up as new.
                    Some(AiringStatus::Finished) => {
                        debug!(
                            mal_id = entry.mal_id,
                            "building initial list: {position}/{}: '{title}' is already finished: skipping",
                            entries.len()
                        );
                        skipped.insert(entry.mal_id);
                    }
                    None => warn!(
                        mal_id = entry.mal_id,
                        status = %anime.status,
                        "building initial list: {position}/{}: '{title}' has an unknown status: skipping",
                        entries.len()
                    ),
                }
            }
            info!(
                "building initial list: season {step}/{total} ({season}): added {}/{} titles",
                list.len() - before,
                entries.len()
            );
        }
        Ok(InitialList { list, skipped })
    }

    /// Re-checks every tracked title not yet finished. Titles that turned
    /// finished are returned without touching their local status.
    async fn refresh_statuses(&mut self) -> FinishedBatch {
        let pending = self
            .watch_list
            .iter()
            .flatten()
            .filter(|(_, status)| **status != AiringStatus::Finished)
            .map(|(mal_id, status)| (*mal_id, *status))
            .collect::<Vec<_>>();
        let total = pending.len();
        let mut finished = Vec::new();

        for (index, (mal_id, known)) in pending.into_iter().enumerate() {
            let position = index + 1;
            let anime = match self.fetch_details(mal_id).await {
                Ok(anime) => anime,
                Err(err) => {
                    error!(
                        mal_id,
                        error = %err,
                        "updating state: [{position}/{total}] can't check current status"
                    );
                    continue;
                }
            };
            let title = anime.display_title();

            let Some(current) = AiringStatus::from_remote(&anime.status) else {
                warn!(
                    mal_id,
                    status = %anime.status,
                    "updating state: [{position}/{total}] '{title}' has an unknown status: skipping"
                );
                continue;
            };

            if current == known {
                debug!(
                    mal_id,
                    "updating state: [{position}/{total}] '{title}' status '{}' is unchanged",
                    known.label()
                );
            } else if current == AiringStatus::Finished {
                // Committed by dispatch only: if the process dies before the
                // notification goes out, the next batch detects this again.
                info!(
                    mal_id,
                    "updating state: [{position}/{total}] '{title}' is now finished"
                );
                finished.push((mal_id, anime));
            } else {
                debug!(
                    mal_id,
                    "updating state: [{position}/{total}] '{title}' status was '{}' and now is '{}'",
                    known.label(),
                    current.label()
                );
                self.set_status(mal_id, current);
            }
        }
        finished
    }

    /// Adds titles of the current season that are not tracked yet.
    async fn discover_new_titles(&mut self) -> FinishedBatch {
        let season = SeasonId::containing((self.today)());
        let entries = match self.fetch_season(season).await {
            Ok(entries) => entries,
            Err(err) => {
                error!(%season, error = %err, "finding new titles: can't get current season titles");
                return Vec::new();
            }
        };

        let mut finished = Vec::new();
        let mut added = 0;
        for entry in entries {
            if self.is_tracked(entry.mal_id) {
                continue;
            }
            let anime = match self.fetch_details(entry.mal_id).await {
                Ok(anime) => anime,
                Err(err) => {
                    error!(
                        mal_id = entry.mal_id,
                        title = %entry.title,
                        error = %err,
                        "finding new titles: can't get details of '{}'",
                        entry.display_title
                    );
                    continue;
                }
            };

            match AiringStatus::from_remote(&anime.status) {
                Some(AiringStatus::Finished) => {
                    // Tracked as airing until the notification is delivered; the
                    // entry alone keeps it from being rediscovered as new.
                    self.set_status(entry.mal_id, AiringStatus::Airing);
                    info!(
                        mal_id = entry.mal_id,
                        "finding new titles: found an already finished title: '{}'",
                        anime.display_title()
                    );
                    finished.push((entry.mal_id, anime));
                }
                Some(status) => {
                    self.set_status(entry.mal_id, status);
                    debug!(
                        mal_id = entry.mal_id,
                        "finding new titles: a new ({}) title has been found: '{}'",
                        status.label(),
                        anime.display_title()
                    );
                }
                None => {
                    warn!(
                        mal_id = entry.mal_id,
                        status = %anime.status,
                        "finding new titles: '{}' has an unknown status: skipping",
                        anime.display_title()
                    );
                    continue;
                }
            }
            added += 1;
        }
        info!("finding new titles: {added} new title(s) added to the watch list");
        finished
    }

    /// Notifies each finished title; only a delivered notification commits
    /// the finished status.
    async fn dispatch_finished(&mut self, finished: FinishedBatch) {
        for (mal_id, anime) in finished {
            let notification = Notification::finished(&anime);
            match self.notifier.send(&notification).await {
                Ok(()) => {
                    info!(
                        mal_id,
                        "processing finished titles: notification sent for '{}'",
                        anime.display_title()
                    );
                    self.set_status(mal_id, AiringStatus::Finished);
                }
                Err(err) => error!(
                    mal_id,
                    error = %err,
                    "processing finished titles: notification failed for '{}': retrying next batch",
                    anime.display_title()
                ),
            }
        }
    }
}
