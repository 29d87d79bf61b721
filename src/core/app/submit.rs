//! Prompt submission: local guards, the acknowledgement exchange, and
//! opening the event channel for an accepted prompt.

use tokio::time::Instant;

use super::ChatApp;
use crate::api::{submit_prompt, PromptAck, SubmitError};
use crate::core::session::Session;
use crate::core::stream::StreamParams;

/// What became of a submitted prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend issued a session and the event channel is opening.
    Accepted,
    /// Nothing but whitespace; no request was made.
    RejectedEmpty,
    /// A session is still running; no request was made.
    RejectedBusy,
    /// The backend answered with an explicit refusal.
    BackendRefused,
    /// The request itself failed or the response was unreadable.
    RequestFailed,
}

impl SubmitOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, SubmitOutcome::Accepted)
    }
}

impl ChatApp {
    /// Submit a prompt. On acceptance the user message is already in the
    /// log, a connector task is running, and events for the new session
    /// will arrive on the receiver handed out by [`ChatApp::new`].
    pub async fn submit(&mut self, prompt: &str) -> SubmitOutcome {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            self.set_status("Type a question first");
            return SubmitOutcome::RejectedEmpty;
        }
        if self.session_active() {
            self.set_status("Still working on the previous question...");
            return SubmitOutcome::RejectedBusy;
        }

        let user_text = trimmed.to_string();
        self.transcript(&format!("You: {user_text}"));
        self.log.push_user(user_text.as_str());
        self.set_status("Submitting prompt...");

        match submit_prompt(&self.http, &self.base_url, &user_text).await {
            Ok(ack) => {
                self.begin_session(ack);
                SubmitOutcome::Accepted
            }
            Err(SubmitError::Backend(error)) => {
                tracing::debug!(error = %error, "backend refused prompt");
                let entry = format!("Error: {error}");
                self.transcript(&entry);
                self.log.push_assistant(entry);
                self.clear_status();
                SubmitOutcome::BackendRefused
            }
            Err(e) => {
                tracing::warn!(error = %e, "prompt submission failed");
                let entry = format!("Connection Error: {e}");
                self.transcript(&entry);
                self.log.push_assistant(entry);
                self.clear_status();
                SubmitOutcome::RequestFailed
            }
        }
    }

    fn begin_session(&mut self, ack: PromptAck) {
        self.next_stream_id += 1;
        let stream_id = self.next_stream_id;
        let deadline = Instant::now() + self.stream_timeout;

        let handle = self.streams.open(StreamParams {
            client: self.http.clone(),
            base_url: self.base_url.clone(),
            session_id: ack.session_id.clone(),
            deadline,
            stream_id,
        });

        tracing::debug!(
            session_id = %ack.session_id,
            stream_id,
            mode = ack.mode.as_deref().unwrap_or("-"),
            assistant_type = ack.assistant_type.as_deref().unwrap_or("-"),
            stream_url = ack.stream_url.as_deref().unwrap_or("-"),
            "streaming session issued"
        );

        self.session = Some(Session::new(ack.session_id, stream_id, deadline, handle));
        // Each query regenerates the map document server-side.
        self.map_view_mut().refresh();

        match ack.mode {
            Some(mode) => self.set_status(format!("Waiting for the assistant ({mode} mode)...")),
            None => self.set_status("Waiting for the assistant..."),
        }
    }
}
