use tokio::time::Instant;

use crate::core::message::MessageId;
use crate::core::stream::StreamHandle;

/// Lifecycle phase of a streaming exchange.
///
/// This is the only place session progress is tracked; there are no
/// separate loading/streaming/error flags to drift out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session exists.
    Idle,
    /// A session identity was issued and the channel is being opened.
    Connecting,
    /// A `start` frame arrived; content updates are expected.
    Active,
    Completed,
    Failed,
    TimedOut,
}

impl SessionPhase {
    /// Terminal phases admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Failed | SessionPhase::TimedOut
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Active => "active",
            SessionPhase::Completed => "completed",
            SessionPhase::Failed => "failed",
            SessionPhase::TimedOut => "timed-out",
        }
    }
}

/// One streaming exchange, from submission to teardown.
///
/// `stream_id` tags every event the connector task emits for this session;
/// events carrying any other id are stale and get dropped. `deadline` is
/// fixed at creation and never re-armed by traffic.
pub struct Session {
    pub id: String,
    pub stream_id: u64,
    pub phase: SessionPhase,
    pub deadline: Instant,
    pub placeholder: Option<MessageId>,
    pub handle: StreamHandle,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        stream_id: u64,
        deadline: Instant,
        handle: StreamHandle,
    ) -> Self {
        Self {
            id: id.into(),
            stream_id,
            phase: SessionPhase::Connecting,
            deadline,
            placeholder: None,
            handle,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Move to a terminal phase and release the channel.
    ///
    /// The first terminal cause wins: once the session is terminal the
    /// phase no longer changes and the handle is not touched again.
    /// Returns true when this call performed the release.
    pub fn finish(&mut self, phase: SessionPhase) -> bool {
        debug_assert!(phase.is_terminal(), "finish requires a terminal phase");
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = phase;
        self.handle.close()
    }
}
