use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::TitleDetails;

pub(crate) const STATUS_NOT_AIRED: &str = "Not yet aired";
pub(crate) const STATUS_AIRING: &str = "Currently Airing";
pub(crate) const STATUS_FINISHED: &str = "Finished Airing";

/// Lifecycle of a tracked title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AiringStatus {
    NotAired,
    Airing,
    Finished,
}

impl AiringStatus {
    /// Maps a catalog status label; `None` for labels we do not know.
    pub(crate) fn from_remote(raw: &str) -> Option<Self> {
        match raw.trim() {
            STATUS_NOT_AIRED => Some(AiringStatus::NotAired),
            STATUS_AIRING => Some(AiringStatus::Airing),
            STATUS_FINISHED => Some(AiringStatus::Finished),
            _ => None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            AiringStatus::NotAired => STATUS_NOT_AIRED,
            AiringStatus::Airing => STATUS_AIRING,
            AiringStatus::Finished => STATUS_FINISHED,
        }
    }
}

/// Title id to last known status. Ordered so each cycle walks it the same way.
pub(crate) type WatchList = BTreeMap<u32, AiringStatus>;

/// Genres and ratings seen while fetching details, kept for future filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FilterMetadata {
    #[serde(default)]
    pub(crate) genres: BTreeSet<String>,
    #[serde(default)]
    pub(crate) ratings: BTreeSet<String>,
}

impl FilterMetadata {
    pub(crate) fn record(&mut self, anime: &TitleDetails) {
        self.genres.extend(anime.genres.iter().cloned());
        self.ratings.extend(anime.rating.iter().cloned());
    }
}
