use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Catalog, CatalogError, SeasonEntry, TitleDetails, pick_display_title};
use crate::http;
use crate::limiter::RequestLimiter;
use crate::season::SeasonId;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.jikan.moe/v4";

/// Guards against a catalog that keeps reporting another page.
const MAX_SEASON_PAGES: u32 = 30;

/// Jikan (unofficial MyAnimeList API) client.
pub(crate) struct JikanClient {
    agent: ureq::Agent,
    base_url: String,
    limiter: Arc<RequestLimiter>,
}

impl JikanClient {
    /// `limiter` throttles follow-up pages of a season listing; the first
    /// request of every call is throttled by the caller.
    pub(crate) fn new(base_url: &str, timeout: Duration, limiter: Arc<RequestLimiter>) -> Self {
        Self {
            agent: http::build_agent(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter,
        }
    }

    async fn fetch(&self, url: String) -> Result<String, CatalogError> {
        let agent = self.agent.clone();
        let body = tokio::task::spawn_blocking(move || http::get_text(&agent, &url))
            .await
            .map_err(|err| CatalogError::Task(err.to_string()))??;
        Ok(body)
    }
}

#[async_trait]
impl Catalog for JikanClient {
    async fn season(&self, season: SeasonId) -> Result<Vec<SeasonEntry>, CatalogError> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1;
        loop {
            if page > 1 {
                self.limiter.acquire().await;
            }
            let url = format!(
                "{}/seasons/{}/{}?page={page}",
                self.base_url,
                season.year,
                season.season.slug()
            );
            let raw = self.fetch(url).await?;
            let parsed: SeasonPage = serde_json::from_str(&raw)?;
            let listed = parsed.data.len();
            entries.extend(
                parsed
                    .data
                    .into_iter()
                    .filter(|record| seen.insert(record.mal_id))
                    .map(AnimeRecord::into_season_entry),
            );
            debug!(%season, page, listed, "fetched season page");

            if !parsed.pagination.has_next_page {
                break;
            }
            if page >= MAX_SEASON_PAGES {
                warn!(%season, page, "season listing still paginating: truncating");
                break;
            }
            page += 1;
        }
        Ok(entries)
    }

    async fn details(&self, mal_id: u32) -> Result<TitleDetails, CatalogError> {
        let raw = self.fetch(format!("{}/anime/{mal_id}", self.base_url)).await?;
        let parsed: AnimeEnvelope = serde_json::from_str(&raw)?;
        Ok(parsed.data.into_details())
    }
}

#[derive(Debug, Deserialize)]
struct SeasonPage {
    #[serde(default)]
    data: Vec<AnimeRecord>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct AnimeEnvelope {
    data: AnimeRecord,
}

#[derive(Debug, Deserialize)]
struct AnimeRecord {
    mal_id: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    title_english: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    genres: Vec<NamedResource>,
    #[serde(default)]
    rating: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

impl AnimeRecord {
    fn into_season_entry(self) -> SeasonEntry {
        let display_title =
            pick_display_title(&self.title, self.title_english.as_deref()).to_string();
        SeasonEntry {
            mal_id: self.mal_id,
            title: self.title,
            display_title,
        }
    }

    fn into_details(self) -> TitleDetails {
        TitleDetails {
            mal_id: self.mal_id,
            title: self.title,
            english_title: self.title_english.filter(|title| !title.trim().is_empty()),
            status: self.status.unwrap_or_default(),
            genres: self.genres.into_iter().map(|genre| genre.name).collect(),
            rating: self.rating.filter(|rating| !rating.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpFailure;
    use crate::http::test_server::{Reply, TestServer};
    use crate::season::Season;

    fn client(server: &TestServer) -> JikanClient {
        JikanClient::new(
            &format!("{}/", server.base_url),
            Duration::from_millis(500),
            Arc::new(RequestLimiter::unthrottled()),
        )
    }

    #[tokio::test]
    async fn season_follows_pagination_and_drops_repeated_ids() {
        let server = TestServer::spawn(vec![
            Reply::new(
                200,
                r#"{"pagination":{"has_next_page":true},"data":[
                    {"mal_id":1,"title":"Sousou no Frieren","title_english":"Frieren: Beyond Journey's End"},
                    {"mal_id":2,"title":"Dungeon Meshi","title_english":null}
                ]}"#
                .to_string(),
            ),
            Reply::new(
                200,
                r#"{"pagination":{"has_next_page":false},"data":[
                    {"mal_id":2,"title":"Dungeon Meshi"},
                    {"mal_id":3,"title":"Kusuriya no Hitorigoto","title_english":""}
                ]}"#
                .to_string(),
            ),
        ]);

        let entries = client(&server)
            .season(SeasonId::new(2024, Season::Winter))
            .await
            .expect("season should load");

        let ids = entries.iter().map(|entry| entry.mal_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(entries[0].display_title, "Frieren: Beyond Journey's End");
        assert_eq!(entries[2].display_title, "Kusuriya no Hitorigoto");

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(
            requests[0]
                .request_line
                .starts_with("GET /seasons/2024/winter?page=1 ")
        );
        assert!(
            requests[1]
                .request_line
                .starts_with("GET /seasons/2024/winter?page=2 ")
        );
    }

    #[tokio::test]
    async fn details_maps_status_genres_and_rating() {
        let server = TestServer::spawn(vec![Reply::new(
            200,
            r#"{"data":{"mal_id":52991,"title":"Sousou no Frieren",
                "title_english":"Frieren: Beyond Journey's End",
                "status":"Finished Airing",
                "rating":"PG-13 - Teens 13 or older",
                "genres":[{"mal_id":2,"type":"anime","name":"Adventure"},
                          {"mal_id":8,"type":"anime","name":"Drama"}]}}"#
                .to_string(),
        )]);

        let details = client(&server)
            .details(52991)
            .await
            .expect("details should load");

        assert_eq!(details.mal_id, 52991);
        assert_eq!(details.status, "Finished Airing");
        assert_eq!(details.display_title(), "Frieren: Beyond Journey's End");
        assert_eq!(details.genres, vec!["Adventure", "Drama"]);
        assert_eq!(details.rating.as_deref(), Some("PG-13 - Teens 13 or older"));
        assert!(
            server.requests()[0]
                .request_line
                .starts_with("GET /anime/52991 ")
        );
    }

    #[tokio::test]
    async fn details_with_sparse_payload_uses_defaults() {
        let server = TestServer::spawn(vec![Reply::new(
            200,
            r#"{"data":{"mal_id":7,"title":"Untitled","rating":""}}"#.to_string(),
        )]);

        let details = client(&server).details(7).await.expect("details");

        assert_eq!(details.status, "");
        assert!(details.genres.is_empty());
        assert_eq!(details.rating, None);
        assert_eq!(details.display_title(), "Untitled");
    }

    #[tokio::test]
    async fn http_errors_surface_as_catalog_errors() {
        let server = TestServer::spawn(vec![Reply::new(
            404,
            r#"{"status":404,"message":"Resource does not exist"}"#.to_string(),
        )]);

        let err = client(&server).details(999).await.expect_err("404");

        match err {
            CatalogError::Http(HttpFailure::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_decode_error() {
        let server = TestServer::spawn(vec![Reply::new(200, "<html>".to_string())]);

        let err = client(&server)
            .season(SeasonId::new(2023, Season::Fall))
            .await
            .expect_err("html is not a season page");

        assert!(matches!(err, CatalogError::Decode(_)), "got {err}");
    }
}
