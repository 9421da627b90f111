mod config;
mod error;
mod logging;
mod runtime;
pub mod screen;

pub use config::AppConfig;
pub use error::AppError;

fn bootstrap() -> Result<AppConfig, AppError> {
    logging::init()?;

    let config = AppConfig::from_env()?;

    tracing::info!(
        base_url = %config.base_url,
        credentials_db_path = %config.credentials_db_path,
        http_timeout_ms = ?config.http_timeout_ms,
        detail_route = %config.display.detail_route,
        "application bootstrap initialized"
    );

    Ok(config)
}

/// Focuses the screen once, renders the result and exits.
pub fn run() -> Result<(), AppError> {
    let config = bootstrap()?;
    runtime::run_once(config)
}

/// Keeps the screen open; every line on stdin is a new focus event.
pub fn run_watch() -> Result<(), AppError> {
    let config = bootstrap()?;
    runtime::run_watch(config, std::io::stdin().lock())
}
