//! Chat application state and the event machinery that drives it.
//!
//! [`ChatApp`] owns the message log, the active session, the transient
//! status line, and the map view. Mutations come from exactly two places:
//! [`ChatApp::submit`] (the only way a session starts) and
//! [`ChatApp::apply_event`] (the only way connector output reaches state).
//! Everything the UI reads is exposed through render-only accessors.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::core::config::Config;
use crate::core::message::{ChatMessage, MessageLog};
use crate::core::session::{Session, SessionPhase};
use crate::core::stream::{SessionEvent, StreamService};
use crate::utils::logging::LoggingState;
use crate::utils::url::map_url;

pub mod dispatch;
pub mod submit;

pub use submit::SubmitOutcome;

/// Resolved settings a [`ChatApp`] is built from.
pub struct AppSettings {
    pub base_url: String,
    pub stream_timeout: Duration,
    pub map_page: String,
    pub log_file: Option<String>,
}

impl AppSettings {
    pub fn from_config(
        config: &Config,
        base_url_override: Option<&str>,
        timeout_override: Option<u64>,
        log_file: Option<String>,
    ) -> Self {
        Self {
            base_url: config.resolve_base_url(base_url_override),
            stream_timeout: config.resolve_stream_timeout(timeout_override),
            map_page: config.resolve_map_page().to_string(),
            log_file,
        }
    }
}

/// The map document the backend regenerates per query.
///
/// Only the URL lives here; fetching and displaying the document is the
/// collaborator's job.
pub struct MapView {
    base_url: String,
    page: String,
    current: String,
}

impl MapView {
    fn new(base_url: &str, page: &str) -> Self {
        let current = map_url(base_url, page, chrono::Utc::now().timestamp_millis());
        Self {
            base_url: base_url.to_string(),
            page: page.to_string(),
            current,
        }
    }

    /// Rebuild the URL with a fresh cache-busting timestamp.
    pub(crate) fn refresh(&mut self) {
        self.current = map_url(&self.base_url, &self.page, chrono::Utc::now().timestamp_millis());
    }

    pub fn url(&self) -> &str {
        &self.current
    }
}

pub struct ChatApp {
    pub(crate) log: MessageLog,
    pub(crate) session: Option<Session>,
    pub(crate) streams: StreamService,
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) stream_timeout: Duration,
    pub(crate) next_stream_id: u64,
    pub logging: LoggingState,
    status: Option<String>,
    map: MapView,
}

impl ChatApp {
    /// Build the app and hand back the receiver its connector tasks will
    /// feed. The caller drains the receiver and routes every event through
    /// [`ChatApp::apply_event`].
    pub fn new(
        settings: AppSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<(SessionEvent, u64)>), Box<dyn std::error::Error>>
    {
        let (streams, rx) = StreamService::new();
        let logging = LoggingState::new(settings.log_file)?;
        let map = MapView::new(&settings.base_url, &settings.map_page);

        let app = Self {
            log: MessageLog::new(),
            session: None,
            streams,
            http: reqwest::Client::new(),
            base_url: settings.base_url,
            stream_timeout: settings.stream_timeout,
            next_stream_id: 0,
            logging,
            status: None,
            map,
        };
        Ok((app, rx))
    }

    /// Render-only view of the conversation.
    pub fn messages(&self) -> &[ChatMessage] {
        self.log.messages()
    }

    /// Current transient status line, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// True while a session is running; submissions are refused until it
    /// reaches a terminal phase.
    pub fn session_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_terminal())
    }

    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(SessionPhase::Idle)
    }

    /// Current cache-busted map URL.
    pub fn map_url(&self) -> &str {
        self.map.url()
    }

    pub(crate) fn map_view_mut(&mut self) -> &mut MapView {
        &mut self.map
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub(crate) fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn is_current_stream(&self, stream_id: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.stream_id == stream_id)
    }

    /// Move the active session to a terminal phase and release its
    /// channel. Any placeholder still streaming is closed in place so the
    /// log never outlives a session with a live entry. Returns true when
    /// this call performed the release.
    pub(crate) fn finish_session(&mut self, phase: SessionPhase) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if let Some(placeholder) = session.placeholder {
            self.log.abandon_stream(placeholder);
        }
        let released = session.finish(phase);
        tracing::debug!(
            session_id = %session.id,
            phase = phase.as_str(),
            released,
            "session finished"
        );
        released
    }

    /// Append to the transcript file, if logging is active.
    pub(crate) fn transcript(&self, text: &str) {
        if let Err(e) = self.logging.log_message(text) {
            tracing::warn!(error = %e, "transcript write failed");
        }
    }
}
