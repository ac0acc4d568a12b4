use std::time::Duration;

use thiserror::Error;

const USER_AGENT: &str = concat!("anitrack-watch/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body kept in messages.
const ERROR_BODY_CHARS: usize = 240;

#[derive(Debug, Error)]
pub(crate) enum HttpFailure {
    #[error("HTTP status {status}{}", format_body(.body))]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response decode failed: {0}")]
    Body(String),
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Single GET; callers decide whether a failure is retried on a later cycle.
pub(crate) fn get_text(agent: &ureq::Agent, url: &str) -> Result<String, HttpFailure> {
    into_text(agent.get(url).call())
}

pub(crate) fn post_form(
    agent: &ureq::Agent,
    url: &str,
    fields: &[(&str, &str)],
) -> Result<String, HttpFailure> {
    into_text(agent.post(url).send_form(fields))
}

fn into_text(result: Result<ureq::Response, ureq::Error>) -> Result<String, HttpFailure> {
    match result {
        Ok(response) => response
            .into_string()
            .map_err(|err| HttpFailure::Body(err.to_string())),
        Err(ureq::Error::Status(status, response)) => {
            let response_body = response.into_string().ok().unwrap_or_default();
            let body = response_body
                .trim()
                .chars()
                .take(ERROR_BODY_CHARS)
                .collect::<String>();
            Err(HttpFailure::Status { status, body })
        }
        Err(ureq::Error::Transport(err)) => Err(HttpFailure::Transport(err.to_string())),
    }
}
