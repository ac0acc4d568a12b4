//! Push notifications through Pushover.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::TitleDetails;
use crate::http::{self, HttpFailure};

pub(crate) const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

#[derive(Debug, Error)]
pub(crate) enum NotifyError {
    #[error(transparent)]
    Http(#[from] HttpFailure),
    #[error("unexpected pushover reply: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("pushover rejected the message: {0}")]
    Rejected(String),
    #[error("notification worker failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Priority {
    Normal,
    High,
}

impl Priority {
    fn as_pushover(self) -> &'static str {
        match self {
            Priority::Normal => "0",
            Priority::High => "1",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notification {
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) url: Option<String>,
    pub(crate) url_title: Option<String>,
    pub(crate) priority: Priority,
}

impl Notification {
    /// Completion notice for a title that just finished airing.
    pub(crate) fn finished(anime: &TitleDetails) -> Self {
        let mut message = format!("'{}' has finished airing", anime.display_title());
        if !anime.genres.is_empty() {
            message.push_str(&format!("\nGenres: {}", anime.genres.join(", ")));
        }
        Self {
            title: "Anime finished airing".to_string(),
            message,
            url: Some(format!("https://myanimelist.net/anime/{}", anime.mal_id)),
            url_title: Some("Open on MyAnimeList".to_string()),
            priority: Priority::Normal,
        }
    }

    pub(crate) fn stopping() -> Self {
        Self {
            title: "anitrack-watch".to_string(),
            message: "Application is stopping...".to_string(),
            url: None,
            url_title: None,
            priority: Priority::High,
        }
    }
}

#[async_trait]
pub(crate) trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

pub(crate) struct PushoverNotifier {
    agent: ureq::Agent,
    endpoint: String,
    token: String,
    user: String,
}

impl PushoverNotifier {
    pub(crate) fn new(token: String, user: String, timeout: Duration) -> Self {
        Self::with_endpoint(PUSHOVER_ENDPOINT, token, user, timeout)
    }

    pub(crate) fn with_endpoint(
        endpoint: &str,
        token: String,
        user: String,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: http::build_agent(timeout),
            endpoint: endpoint.to_string(),
            token,
            user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushoverReply {
    status: i64,
    #[serde(default)]
    errors: Vec<String>,
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let mut fields = vec![
            ("token", self.token.clone()),
            ("user", self.user.clone()),
            ("title", notification.title.clone()),
            ("message", notification.message.clone()),
            ("priority", notification.priority.as_pushover().to_string()),
        ];
        if let Some(url) = &notification.url {
            fields.push(("url", url.clone()));
        }
        if let Some(url_title) = &notification.url_title {
            fields.push(("url_title", url_title.clone()));
        }

        let raw = tokio::task::spawn_blocking(move || {
            let borrowed = fields
                .iter()
                .map(|(key, value)| (*key, value.as_str()))
                .collect::<Vec<_>>();
            http::post_form(&agent, &endpoint, &borrowed)
        })
        .await
        .map_err(|err| NotifyError::Task(err.to_string()))??;

        let reply: PushoverReply = serde_json::from_str(&raw)?;
        if reply.status != 1 {
            return Err(NotifyError::Rejected(if reply.errors.is_empty() {
                format!("status {}", reply.status)
            } else {
                reply.errors.join("; ")
            }));
        }
        Ok(())
    }
}
