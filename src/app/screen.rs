use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use thiserror::Error;
use uuid::Uuid;

use crate::adapters::credentials::{CredentialStore, read_token};
use crate::adapters::sessions_http::{FailureKind, FetchError, SessionSource};
use crate::domain::ordering::order_for_display;
use crate::domain::presentation::{DisplayConfig, SessionCard, present};
use crate::domain::session::{SessionRecord, normalize_all};

pub const ERROR_TITLE: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: &Notification);
}

pub trait SessionListView: Send + Sync + 'static {
    fn render(&self, state: &ScreenState);
}

pub trait Navigator {
    fn navigate(&self, route_name: &str, session: &SessionRecord);
}

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("screen state lock poisoned")]
    StateLockPoisoned,
    #[error("no session card at index {0}")]
    NoSuchCard(usize),
}

/// What the screen currently shows. `sessions == None` means nothing has loaded
/// yet, which is not the same as an empty list.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenState {
    pub loading: bool,
    pub sessions: Option<Vec<SessionCard>>,
    pub last_failure: Option<FailureKind>,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self {
            loading: true,
            sessions: None,
            last_failure: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    request_id: Uuid,
}

impl FetchTicket {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Superseded,
}

/// Turns a stream of focus observations into fetch triggers: one per gain of focus.
#[derive(Debug, Clone, Default)]
pub struct FocusSubscription {
    focused: bool,
}

impl FocusSubscription {
    pub fn observe(&mut self, focused: bool) -> bool {
        let gained = focused && !self.focused;
        self.focused = focused;
        gained
    }
}

#[derive(Debug, Default)]
struct Slot {
    state: ScreenState,
    latest_generation: u64,
}

struct Pipeline<S, C, V> {
    source: Arc<S>,
    credentials: Arc<C>,
    view: Arc<V>,
    display: DisplayConfig,
    slot: Arc<Mutex<Slot>>,
    render_lock: Arc<Mutex<()>>,
}

impl<S, C, V> Clone for Pipeline<S, C, V> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            credentials: Arc::clone(&self.credentials),
            view: Arc::clone(&self.view),
            display: self.display.clone(),
            slot: Arc::clone(&self.slot),
            render_lock: Arc::clone(&self.render_lock),
        }
    }
}

impl<S, C, V> Pipeline<S, C, V>
where
    S: SessionSource,
    C: CredentialStore,
    V: Notifier + SessionListView,
{
    fn lock(&self) -> Result<MutexGuard<'_, Slot>, ScreenError> {
        self.slot.lock().map_err(|_| ScreenError::StateLockPoisoned)
    }

    fn begin_fetch(&self) -> Result<FetchTicket, ScreenError> {
        let mut slot = self.lock()?;
        slot.latest_generation += 1;
        slot.state.loading = true;

        let ticket = FetchTicket {
            generation: slot.latest_generation,
            request_id: Uuid::new_v4(),
        };
        tracing::debug!(
            request_id = %ticket.request_id,
            generation = ticket.generation,
            "sessions fetch started"
        );
        Ok(ticket)
    }

    fn load(&self, ticket: &FetchTicket) -> Result<Vec<SessionRecord>, FetchError> {
        let token = read_token(self.credentials.as_ref());
        if token.is_none() {
            tracing::info!(request_id = %ticket.request_id, "no auth token stored, fetching without one");
        }

        let raw = self.source.fetch_sessions(token.as_deref())?;
        Ok(order_for_display(normalize_all(&raw)))
    }

    fn resolve(
        &self,
        ticket: FetchTicket,
        outcome: Result<Vec<SessionRecord>, FetchError>,
    ) -> Result<Resolution, ScreenError> {
        let mut slot = self.lock()?;

        if ticket.generation != slot.latest_generation {
            tracing::debug!(
                request_id = %ticket.request_id,
                generation = ticket.generation,
                latest_generation = slot.latest_generation,
                "dropping superseded sessions response"
            );
            return Ok(Resolution::Superseded);
        }

        slot.state.loading = false;
        let notification = match outcome {
            Ok(records) => {
                tracing::info!(
                    request_id = %ticket.request_id,
                    sessions = records.len(),
                    "sessions loaded"
                );
                slot.state.sessions = Some(present(&records, &self.display));
                slot.state.last_failure = None;
                None
            }
            Err(error) => {
                match error.kind() {
                    FailureKind::Domain => tracing::warn!(
                        request_id = %ticket.request_id,
                        error = %error,
                        "sessions request rejected"
                    ),
                    FailureKind::Transport => tracing::error!(
                        request_id = %ticket.request_id,
                        error = %error,
                        "sessions request failed"
                    ),
                }
                slot.state.last_failure = Some(error.kind());
                Some(Notification::error(error.user_message()))
            }
        };
        drop(slot);

        // Frames go out one at a time and always show the slot as it is now, so a
        // slow render of an older response cannot land after a newer one.
        let _frame = self
            .render_lock
            .lock()
            .map_err(|_| ScreenError::StateLockPoisoned)?;
        if let Some(notification) = notification {
            self.view.notify(&notification);
        }
        let current = self.lock()?.state.clone();
        self.view.render(&current);

        Ok(Resolution::Applied)
    }

    fn refresh(&self) -> Result<Resolution, ScreenError> {
        let ticket = self.begin_fetch()?;
        let outcome = self.load(&ticket);
        self.resolve(ticket, outcome)
    }
}

/// The "my sessions" screen: owns the displayed list and drives
/// credential → fetch → normalize → order → present on every focus gain.
pub struct SessionsScreen<S, C, V> {
    pipeline: Pipeline<S, C, V>,
    focus: FocusSubscription,
}

impl<S, C, V> SessionsScreen<S, C, V>
where
    S: SessionSource,
    C: CredentialStore,
    V: Notifier + SessionListView,
{
    pub fn new(source: Arc<S>, credentials: Arc<C>, view: Arc<V>, display: DisplayConfig) -> Self {
        Self {
            pipeline: Pipeline {
                source,
                credentials,
                view,
                display,
                slot: Arc::new(Mutex::new(Slot::default())),
                render_lock: Arc::new(Mutex::new(())),
            },
            focus: FocusSubscription::default(),
        }
    }

    /// Feeds a focus observation. On a gain of focus a refresh runs on a background
    /// thread and its handle is returned.
    pub fn focus_changed(&mut self, focused: bool) -> Option<JoinHandle<()>> {
        if !self.focus.observe(focused) {
            return None;
        }

        let pipeline = self.pipeline.clone();
        Some(std::thread::spawn(move || {
            if let Err(error) = pipeline.refresh() {
                tracing::warn!(error = %error, "sessions refresh failed");
            }
        }))
    }

    /// Runs one fetch to completion on the calling thread.
    pub fn refresh(&self) -> Result<Resolution, ScreenError> {
        self.pipeline.refresh()
    }

    pub fn begin_fetch(&self) -> Result<FetchTicket, ScreenError> {
        self.pipeline.begin_fetch()
    }

    pub fn resolve(
        &self,
        ticket: FetchTicket,
        outcome: Result<Vec<SessionRecord>, FetchError>,
    ) -> Result<Resolution, ScreenError> {
        self.pipeline.resolve(ticket, outcome)
    }

    pub fn snapshot(&self) -> Result<ScreenState, ScreenError> {
        Ok(self.pipeline.lock()?.state.clone())
    }

    /// Navigates to the detail view of the card at `index` in display order.
    pub fn select<N: Navigator>(&self, index: usize, navigator: &N) -> Result<(), ScreenError> {
        let card = self
            .pipeline
            .lock()?
            .state
            .sessions
            .as_ref()
            .and_then(|cards| cards.get(index).cloned())
            .ok_or(ScreenError::NoSuchCard(index))?;

        navigator.navigate(&card.detail.route_name, &card.detail.session);
        Ok(())
    }
}
