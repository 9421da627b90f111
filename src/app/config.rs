use std::time::Duration;

use crate::adapters::credentials::DEFAULT_DB_PATH;
use crate::app::AppError;
use crate::domain::presentation::{DEFAULT_DETAIL_ROUTE, DisplayConfig};

const DEFAULT_BASE_URL: &str = "http://10.0.2.2:5000/";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub credentials_db_path: String,
    pub http_timeout_ms: Option<u64>,
    pub display: DisplayConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(error) = dotenvy::dotenv()
            && !error.not_found()
        {
            return Err(AppError::config(format!("failed to load .env: {error}")));
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut base_url = non_empty(&lookup, "SESSIONS_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::config(
                "SESSIONS_BASE_URL must start with http:// or https://",
            ));
        }
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let http_timeout_ms = match non_empty(&lookup, "HTTP_TIMEOUT_MS") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| AppError::config("HTTP_TIMEOUT_MS must be a valid number"))?,
            ),
            None => None,
        };

        Ok(Self {
            base_url,
            credentials_db_path: non_empty(&lookup, "CREDENTIALS_DB_PATH")
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            http_timeout_ms,
            display: DisplayConfig {
                detail_route: non_empty(&lookup, "DETAIL_ROUTE")
                    .unwrap_or_else(|| DEFAULT_DETAIL_ROUTE.to_string()),
                ..DisplayConfig::default()
            },
        })
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_ms.map(Duration::from_millis)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
