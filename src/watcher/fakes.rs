use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::Watcher;
use crate::catalog::{Catalog, CatalogError, SeasonEntry, TitleDetails};
use crate::http::HttpFailure;
use crate::limiter::RequestLimiter;
use crate::notify::{Notification, Notifier, NotifyError};
use crate::season::{Season, SeasonId};

pub(crate) fn today_in_spring_2024() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).expect("valid date")
}

pub(crate) fn spring_2024() -> SeasonId {
    SeasonId::new(2024, Season::Spring)
}

pub(crate) fn watcher_with(
    catalog: &Arc<FakeCatalog>,
    notifier: &Arc<FakeNotifier>,
    seasons: u32,
) -> Watcher {
    let mut watcher = Watcher::new(
        seasons,
        catalog.clone(),
        notifier.clone(),
        Arc::new(RequestLimiter::unthrottled()),
    );
    watcher.today = today_in_spring_2024;
    watcher
}

fn unavailable() -> CatalogError {
    CatalogError::Http(HttpFailure::Status {
        status: 503,
        body: "maintenance".to_string(),
    })
}

#[derive(Default)]
struct CatalogState {
    seasons: HashMap<SeasonId, Vec<u32>>,
    titles: HashMap<u32, TitleDetails>,
    failing_titles: HashSet<u32>,
    failing_seasons: HashSet<SeasonId>,
    panicking_titles: HashSet<u32>,
    season_calls: Vec<SeasonId>,
    detail_calls: Vec<u32>,
    detail_delay: Option<Duration>,
}

/// In-memory catalog recording every call.
#[derive(Default)]
pub(crate) struct FakeCatalog {
    state: Mutex<CatalogState>,
}

impl FakeCatalog {
    fn state(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().expect("lock fake catalog")
    }

    /// Registers (or replaces) title `mal_id` with the given remote status label.
    pub(crate) fn add_title(&self, mal_id: u32, status: &str) {
        self.state().titles.insert(
            mal_id,
            TitleDetails {
                mal_id,
                title: format!("Title {mal_id}"),
                english_title: None,
                status: status.to_string(),
                genres: vec!["Drama".to_string()],
                rating: Some("PG-13 - Teens 13 or older".to_string()),
            },
        );
    }

    pub(crate) fn set_status(&self, mal_id: u32, status: &str) {
        if let Some(title) = self.state().titles.get_mut(&mal_id) {
            title.status = status.to_string();
        }
    }

    pub(crate) fn list_in_season(&self, season: SeasonId, ids: &[u32]) {
        self.state().seasons.insert(season, ids.to_vec());
    }

    pub(crate) fn fail_details(&self, mal_id: u32, failing: bool) {
        let mut state = self.state();
        if failing {
            state.failing_titles.insert(mal_id);
        } else {
            state.failing_titles.remove(&mal_id);
        }
    }

    pub(crate) fn fail_season(&self, season: SeasonId, failing: bool) {
        let mut state = self.state();
        if failing {
            state.failing_seasons.insert(season);
        } else {
            state.failing_seasons.remove(&season);
        }
    }

    /// Makes the detail lookup of `mal_id` panic, taking the caller down with it.
    pub(crate) fn panic_on_details(&self, mal_id: u32) {
        self.state().panicking_titles.insert(mal_id);
    }

    pub(crate) fn set_detail_delay(&self, delay: Duration) {
        self.state().detail_delay = Some(delay);
    }

    pub(crate) fn season_calls(&self) -> Vec<SeasonId> {
        self.state().season_calls.clone()
    }

    pub(crate) fn detail_calls(&self) -> Vec<u32> {
        self.state().detail_calls.clone()
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn season(&self, season: SeasonId) -> Result<Vec<SeasonEntry>, CatalogError> {
        let mut state = self.state();
        state.season_calls.push(season);
        if state.failing_seasons.contains(&season) {
            return Err(unavailable());
        }
        let ids = state.seasons.get(&season).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .map(|mal_id| SeasonEntry {
                mal_id,
                title: format!("Title {mal_id}"),
                display_title: format!("Title {mal_id}"),
            })
            .collect())
    }

    async fn details(&self, mal_id: u32) -> Result<TitleDetails, CatalogError> {
        let (delay, outcome) = {
            let mut state = self.state();
            state.detail_calls.push(mal_id);
            if state.panicking_titles.contains(&mal_id) {
                drop(state);
                panic!("catalog crashed while fetching {mal_id}");
            }
            let outcome = if state.failing_titles.contains(&mal_id) {
                Err(unavailable())
            } else {
                state.titles.get(&mal_id).cloned().ok_or_else(|| {
                    CatalogError::Http(HttpFailure::Status {
                        status: 404,
                        body: String::new(),
                    })
                })
            };
            (state.detail_delay, outcome)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

/// Notifier that records deliveries and can be switched to fail.
#[derive(Default)]
pub(crate) struct FakeNotifier {
    sent: Mutex<Vec<Notification>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl FakeNotifier {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("lock fake notifier").clone()
    }

    /// Messages of delivered notifications, in delivery order.
    pub(crate) fn sent_messages(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|notification| notification.message)
            .collect()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected("injected failure".to_string()));
        }
        self.sent
            .lock()
            .expect("lock fake notifier")
            .push(notification.clone());
        Ok(())
    }
}
