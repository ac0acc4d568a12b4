//! Watch-list state machine and the background worker driving it.

mod batch;
mod controller;
mod scheduler;
mod state;

#[cfg(test)]
mod fakes;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::warn;

use crate::catalog::Catalog;
use crate::limiter::RequestLimiter;
use crate::notify::Notifier;
use crate::snapshot::Snapshot;

pub(crate) use controller::Controller;
pub(crate) use state::{AiringStatus, FilterMetadata, WatchList};

pub(crate) const MIN_SEASONS: u32 = 1;
pub(crate) const MAX_SEASONS: u32 = 40;

/// Bounds the number of seasons walked when building the initial list.
pub(crate) fn clamp_seasons(requested: u32) -> u32 {
    if requested < MIN_SEASONS {
        warn!(
            requested,
            "seasons for initial list building can't be lower than {MIN_SEASONS}: defaulting to {MIN_SEASONS}"
        );
        MIN_SEASONS
    } else if requested > MAX_SEASONS {
        warn!(
            requested,
            "seasons for initial list building can't be more than {MAX_SEASONS}: defaulting to {MAX_SEASONS}"
        );
        MAX_SEASONS
    } else {
        requested
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Owns the watch list and everything a batch needs to mutate it.
pub(crate) struct Watcher {
    seasons: u32,
    catalog: Arc<dyn Catalog>,
    notifier: Arc<dyn Notifier>,
    limiter: Arc<RequestLimiter>,
    /// `None` until the initial list has been built.
    watch_list: Option<WatchList>,
    /// Titles already finished when the initial list was built. Never notified.
    skipped: BTreeSet<u32>,
    filters: FilterMetadata,
    today: fn() -> NaiveDate,
}

impl Watcher {
    pub(crate) fn new(
        seasons: u32,
        catalog: Arc<dyn Catalog>,
        notifier: Arc<dyn Notifier>,
        limiter: Arc<RequestLimiter>,
    ) -> Self {
        Self {
            seasons: seasons.clamp(MIN_SEASONS, MAX_SEASONS),
            catalog,
            notifier,
            limiter,
            watch_list: None,
            skipped: BTreeSet::new(),
            filters: FilterMetadata::default(),
            today: local_today,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        self.watch_list = snapshot.watch_list;
        self.skipped = snapshot.skipped;
        self.filters = snapshot.filters;
    }

    /// An empty list is saved as unset so the next start builds it again.
    pub(crate) fn snapshot(&self) -> Snapshot {
        let watch_list = self.watch_list.clone().filter(|list| !list.is_empty());
        Snapshot {
            skipped: self.skipped.clone(),
            ..Snapshot::new(watch_list, self.filters.clone())
        }
    }

    fn needs_initial_list(&self) -> bool {
        self.watch_list.as_ref().is_none_or(WatchList::is_empty)
    }

    pub(crate) fn watch_list(&self) -> Option<&WatchList> {
        self.watch_list.as_ref()
    }

    fn is_tracked(&self, mal_id: u32) -> bool {
        self.skipped.contains(&mal_id)
            || self
                .watch_list
                .as_ref()
                .is_some_and(|list| list.contains_key(&mal_id))
    }

    fn set_status(&mut self, mal_id: u32, status: AiringStatus) {
        if let Some(list) = self.watch_list.as_mut() {
            list.insert(mal_id, status);
        }
    }
}
