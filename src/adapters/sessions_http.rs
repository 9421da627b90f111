use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::session::RawSessionRecord;

pub const SESSIONS_PATH: &str = "api/getSessions";
pub const TOKEN_HEADER: &str = "x-access-tokens";

pub trait SessionSource: Send + Sync + 'static {
    fn fetch_sessions(&self, token: Option<&str>) -> Result<Vec<RawSessionRecord>, FetchError>;
}

/// How a failed fetch is classified for diagnostics. Both kinds reach the user the
/// same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Domain,
    Transport,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server returned an error: {0}")]
    Domain(String),
    #[error("sessions request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to parse sessions response as JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("sessions response did not contain sessionData")]
    MissingSessionData,
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Domain(_) => FailureKind::Domain,
            Self::Transport(_) | Self::Decode(_) | Self::MissingSessionData => {
                FailureKind::Transport
            }
        }
    }

    /// Text shown in the error notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSessionSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpSessionSource {
    /// `base_url` must end with `/`; the resource path is appended verbatim.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Self {
            client,
            endpoint: format!("{base_url}{SESSIONS_PATH}"),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SessionSource for HttpSessionSource {
    fn fetch_sessions(&self, token: Option<&str>) -> Result<Vec<RawSessionRecord>, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(TOKEN_HEADER, token.unwrap_or_default())
            .send()
            .map_err(FetchError::Transport)?;

        // Error payloads arrive with 4xx statuses too, so the body decides.
        let status = response.status();
        let body = response.bytes().map_err(FetchError::Transport)?;
        tracing::debug!(
            endpoint = %self.endpoint,
            status = status.as_u16(),
            bytes = body.len(),
            "sessions response received"
        );

        parse_sessions_body(&body)
    }
}

/// Splits a response body into the error payload (`message`) and the data payload
/// (`sessionData`). A present, truthy `message` wins over any data.
pub fn parse_sessions_body(body: &[u8]) -> Result<Vec<RawSessionRecord>, FetchError> {
    let payload: Value = serde_json::from_slice(body)?;
    let object = payload.as_object().ok_or(FetchError::MissingSessionData)?;

    if let Some(message) = object.get("message").and_then(message_text) {
        return Err(FetchError::Domain(message));
    }

    let session_data = object
        .get("sessionData")
        .and_then(Value::as_array)
        .ok_or(FetchError::MissingSessionData)?;

    // One record per item: an item that is not even an object still yields an
    // empty record rather than dropping the rest of the list.
    Ok(session_data
        .iter()
        .enumerate()
        .map(|(index, item)| {
            RawSessionRecord::deserialize(item).unwrap_or_else(|error| {
                tracing::warn!(index, error = %error, "unreadable session record");
                RawSessionRecord::default()
            })
        })
        .collect())
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
