pub(crate) mod jikan;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::HttpFailure;
use crate::season::SeasonId;

pub(crate) use jikan::JikanClient;

#[derive(Debug, Error)]
pub(crate) enum CatalogError {
    #[error(transparent)]
    Http(#[from] HttpFailure),
    #[error("unexpected catalog payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("catalog worker failed: {0}")]
    Task(String),
}

/// One line of a season listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeasonEntry {
    pub(crate) mal_id: u32,
    pub(crate) title: String,
    pub(crate) display_title: String,
}

/// Detail record for a single title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TitleDetails {
    pub(crate) mal_id: u32,
    pub(crate) title: String,
    pub(crate) english_title: Option<String>,
    /// Raw status label, e.g. "Currently Airing".
    pub(crate) status: String,
    pub(crate) genres: Vec<String>,
    pub(crate) rating: Option<String>,
}

impl TitleDetails {
    /// English title when the catalog has one, the default title otherwise.
    pub(crate) fn display_title(&self) -> &str {
        pick_display_title(&self.title, self.english_title.as_deref())
    }
}

pub(crate) fn pick_display_title<'a>(title: &'a str, english: Option<&'a str>) -> &'a str {
    match english.map(str::trim) {
        Some(english) if !english.is_empty() => english,
        _ => title,
    }
}

/// Remote anime catalog.
#[async_trait]
pub(crate) trait Catalog: Send + Sync {
    async fn season(&self, season: SeasonId) -> Result<Vec<SeasonEntry>, CatalogError>;

    async fn details(&self, mal_id: u32) -> Result<TitleDetails, CatalogError>;
}
