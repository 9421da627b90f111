use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};

use crate::adapters::credentials::SqliteCredentialStore;
use crate::adapters::sessions_http::HttpSessionSource;
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::screen::{
    Navigator, Notification, Notifier, ScreenState, SessionListView, SessionsScreen,
};
use crate::domain::session::SessionRecord;

type TerminalScreen = SessionsScreen<HttpSessionSource, SqliteCredentialStore, TerminalView>;

#[derive(Debug, Clone)]
pub struct TerminalView {
    title: String,
}

impl Notifier for TerminalView {
    fn notify(&self, notification: &Notification) {
        eprintln!("{}: {}", notification.title, notification.message);
    }
}

impl SessionListView for TerminalView {
    fn render(&self, state: &ScreenState) {
        print!("{}", render_list(&self.title, state));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route_name: &str, session: &SessionRecord) {
        println!("-> {route_name}");
        println!("   status: {}", session.status);
        println!("   started: {}", format_instant(session.start_date));
        println!("   ended: {}", format_instant(session.end_date));
        if let Some(duration) = session.duration {
            println!("   duration: {duration}");
        }
        println!("   incidents: {}", session.num_of_incidents);
        println!("   image: {}", session.image_url);
        for (key, value) in &session.extra {
            println!("   {key}: {value}");
        }
    }
}

fn render_list(title: &str, state: &ScreenState) -> String {
    let mut out = format!("{title}\n");

    match &state.sessions {
        None if state.loading => out.push_str("  loading...\n"),
        None => out.push_str("  no data\n"),
        Some(cards) if cards.is_empty() => out.push_str("  no trips yet\n"),
        Some(cards) => {
            for (index, card) in cards.iter().enumerate() {
                let duration = card
                    .duration
                    .map(|duration| format!(" | {duration}"))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "  {}. [{}] started {}{} | incidents: {}\n",
                    index + 1,
                    card.status,
                    format_instant(card.start_date),
                    duration,
                    card.num_of_incidents
                ));
            }
        }
    }

    out
}

fn format_instant(instant: Option<DateTime<Utc>>) -> String {
    instant
        .map(|value| value.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

fn open_credential_store(path: &str) -> SqliteCredentialStore {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
        && let Err(error) = std::fs::create_dir_all(parent)
    {
        tracing::warn!(error = %error, path, "failed to create credential store directory");
    }

    match SqliteCredentialStore::initialize(path) {
        Ok(store) => store,
        Err(error) => {
            // Reads against this store fail and are treated as "no token".
            tracing::warn!(error = %error, path, "credential store unavailable");
            SqliteCredentialStore::new(path)
        }
    }
}

fn build_screen(config: &AppConfig) -> Result<TerminalScreen, AppError> {
    let source =
        HttpSessionSource::new(&config.base_url, config.http_timeout()).map_err(AppError::runtime)?;
    tracing::info!(endpoint = %source.endpoint(), "sessions source ready");

    Ok(SessionsScreen::new(
        Arc::new(source),
        Arc::new(open_credential_store(&config.credentials_db_path)),
        Arc::new(TerminalView {
            title: config.display.title.clone(),
        }),
        config.display.clone(),
    ))
}

pub fn run_once(config: AppConfig) -> Result<(), AppError> {
    let mut screen = build_screen(&config)?;
    join_refresh(screen.focus_changed(true))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchCommand {
    Focus,
    Blur,
    Select(usize),
    Quit,
    Unknown,
}

fn parse_command(line: &str) -> WatchCommand {
    match line.trim() {
        "" | "f" | "focus" => WatchCommand::Focus,
        "b" | "blur" => WatchCommand::Blur,
        "q" | "quit" => WatchCommand::Quit,
        other => match other.parse::<usize>() {
            Ok(position) if position > 0 => WatchCommand::Select(position - 1),
            _ => WatchCommand::Unknown,
        },
    }
}

pub fn run_watch<R: BufRead>(config: AppConfig, input: R) -> Result<(), AppError> {
    let mut screen = build_screen(&config)?;
    let navigator = TerminalNavigator;

    eprintln!("enter: refresh | <n>: open trip n | b: leave screen | q: quit");
    let mut in_flight = screen.focus_changed(true);

    for line in input.lines() {
        let line = line.map_err(AppError::runtime)?;
        match parse_command(&line) {
            WatchCommand::Focus => {
                // Re-entering the screen: a blur followed by a focus gain.
                screen.focus_changed(false);
                if let Some(handle) = screen.focus_changed(true) {
                    in_flight = Some(handle);
                }
            }
            WatchCommand::Blur => {
                screen.focus_changed(false);
            }
            WatchCommand::Select(index) => {
                if let Err(error) = screen.select(index, &navigator) {
                    eprintln!("{error}");
                }
            }
            WatchCommand::Quit => break,
            WatchCommand::Unknown => eprintln!("unknown command: {}", line.trim()),
        }
    }

    join_refresh(in_flight)
}

fn join_refresh(handle: Option<JoinHandle<()>>) -> Result<(), AppError> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| AppError::runtime("refresh thread panicked")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use serde_json::Map;

    use super::{WatchCommand, join_refresh, parse_command, render_list};
    use crate::app::screen::ScreenState;
    use crate::domain::presentation::{DisplayConfig, present};
    use crate::domain::session::{SessionDuration, SessionRecord, SessionStatus};

    #[test]
    fn parses_watch_commands() {
        assert_eq!(parse_command(""), WatchCommand::Focus);
        assert_eq!(parse_command(" focus "), WatchCommand::Focus);
        assert_eq!(parse_command("b"), WatchCommand::Blur);
        assert_eq!(parse_command("q"), WatchCommand::Quit);
        assert_eq!(parse_command("3"), WatchCommand::Select(2));
        assert_eq!(parse_command("0"), WatchCommand::Unknown);
        assert_eq!(parse_command("later"), WatchCommand::Unknown);
    }

    #[test]
    fn join_refresh_waits_for_in_flight_fetch() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
        });

        join_refresh(Some(handle)).expect("join should succeed");

        assert!(finished.load(Ordering::SeqCst));
        assert!(join_refresh(None).is_ok());
    }

    #[test]
    fn join_refresh_reports_panicked_fetch() {
        let handle = thread::spawn(|| panic!("refresh exploded"));

        assert_eq!(
            join_refresh(Some(handle))
                .expect_err("panic should surface")
                .to_string(),
            "runtime failure: refresh thread panicked"
        );
    }

    #[test]
    fn renders_loading_and_no_data_states() {
        let loading = ScreenState::default();
        let failed = ScreenState {
            loading: false,
            ..ScreenState::default()
        };

        assert_eq!(render_list("My Trips", &loading), "My Trips\n  loading...\n");
        assert_eq!(render_list("My Trips", &failed), "My Trips\n  no data\n");
    }

    #[test]
    fn renders_cards_in_display_order() {
        let records = vec![SessionRecord {
            image_url: "trip.png".to_string(),
            start_date: Some(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2026, 3, 2, 10, 5, 0).unwrap()),
            status: SessionStatus::Completed,
            num_of_incidents: 2,
            duration: Some(SessionDuration {
                hours: 2,
                minutes: 5,
            }),
            extra: Map::new(),
        }];
        let state = ScreenState {
            loading: false,
            sessions: Some(present(&records, &DisplayConfig::default())),
            last_failure: None,
        };

        assert_eq!(
            render_list("My Trips", &state),
            "My Trips\n  1. [COMPLETED] started 2026-03-02 08:00 UTC | 2h 5m | incidents: 2\n"
        );
    }
}
