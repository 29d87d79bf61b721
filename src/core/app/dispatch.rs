//! Maps connector events onto message-log and session mutations.
//!
//! Every event passes two guards before it can touch state: its
//! `stream_id` must match the live session, and the session must not have
//! reached a terminal phase. Together these make late or duplicate
//! termination signals harmless no-ops.

use super::ChatApp;
use crate::core::session::SessionPhase;
use crate::core::stream::{Frame, SessionEvent, TransportStage};

fn progress_status(progress: Option<f64>) -> String {
    match progress {
        Some(p) if (0.0..=1.0).contains(&p) => {
            format!("Writing... {}%", (p * 100.0).round() as u32)
        }
        _ => "Writing...".to_string(),
    }
}

impl ChatApp {
    /// Apply one connector event to the chat state.
    pub fn apply_event(&mut self, event: SessionEvent, stream_id: u64) {
        if !self.is_current_stream(stream_id) {
            tracing::debug!(stream_id, "dropping event for superseded stream");
            return;
        }
        if self.session.as_ref().is_some_and(|s| s.is_terminal()) {
            tracing::debug!(stream_id, "dropping event after terminal phase");
            return;
        }

        match event {
            SessionEvent::Opened => self.handle_opened(),
            SessionEvent::Frame(frame) => self.handle_frame(frame),
            SessionEvent::Malformed(_) => self.set_status("Data parsing error"),
            SessionEvent::TransportFailed { stage, detail } => {
                self.handle_transport_failed(stage, detail)
            }
            SessionEvent::DeadlineExpired => self.handle_deadline(),
        }
    }

    fn placeholder(&self) -> Option<crate::core::message::MessageId> {
        self.session.as_ref().and_then(|s| s.placeholder)
    }

    fn handle_opened(&mut self) {
        if let Some(session) = &self.session {
            tracing::debug!(session_id = %session.id, "event channel open");
        }
        self.set_status("Connected to AI assistant...");
    }

    fn handle_frame(&mut self, frame: Frame) {
        match frame {
            Frame::Status { message } => {
                // A status frame with nothing to say leaves the line alone.
                if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
                    self.set_status(message);
                }
            }
            Frame::Start { message } => self.handle_start(message),
            Frame::Content { content, progress } => self.handle_content(content, progress),
            Frame::Complete {
                final_content,
                run_id,
            } => self.handle_complete(final_content, run_id),
            Frame::Error { error } => self.handle_error(error),
            Frame::Timeout => {
                self.set_status("Connection timeout");
                self.finish_session(SessionPhase::TimedOut);
            }
            Frame::Unknown => {
                tracing::debug!("ignoring unrecognized frame type");
            }
        }
    }

    fn handle_start(&mut self, message: Option<String>) {
        if self.placeholder().is_some() {
            tracing::warn!("duplicate start frame ignored");
            return;
        }

        let id = self.log.begin_assistant_stream();
        if let Some(session) = self.session.as_mut() {
            session.phase = SessionPhase::Active;
            session.placeholder = Some(id);
        }
        if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
            self.set_status(message);
        }
    }

    fn handle_content(&mut self, content: String, progress: Option<f64>) {
        let Some(placeholder) = self.placeholder() else {
            // Content with no open answer is a protocol violation; flag it
            // and keep the stream alive rather than fabricating a message.
            tracing::warn!("content frame arrived before start");
            self.set_status("Received content before the response started");
            return;
        };

        if self.log.replace_streaming_content(placeholder, content) {
            self.set_status(progress_status(progress));
        }
    }

    fn handle_complete(&mut self, final_content: String, run_id: Option<String>) {
        tracing::debug!(
            run_id = run_id.as_deref().unwrap_or("-"),
            "stream complete"
        );
        self.transcript(&final_content);
        match self.placeholder() {
            Some(placeholder) => {
                self.log.complete_stream(placeholder, final_content);
            }
            None => {
                // The server skipped `start`; keep the answer anyway.
                tracing::debug!("complete frame without placeholder");
                self.log.push_assistant(final_content);
            }
        }
        self.clear_status();
        self.finish_session(SessionPhase::Completed);
    }

    fn handle_error(&mut self, error: String) {
        tracing::debug!(error = %error, "server reported failure");
        let entry = format!("Error: {error}");
        self.transcript(&entry);
        self.log.push_assistant(entry);
        self.set_status("Error occurred");
        self.finish_session(SessionPhase::Failed);
    }

    fn handle_transport_failed(&mut self, stage: TransportStage, detail: String) {
        tracing::warn!(stage = ?stage, detail = %detail, "transport failure");
        let cause = match stage {
            TransportStage::Connecting => "Could not reach the server",
            TransportStage::Reading => "Connection to the server was lost",
        };

        // Only synthesize a chat entry when no answer has started; a
        // partial answer already tells the user more than this would.
        if self.placeholder().is_none() {
            let entry = format!("Connection failed: {cause}. Please try again.");
            self.transcript(&entry);
            self.log.push_assistant(entry);
        }

        self.set_status(format!("{cause} - please try again"));
        self.finish_session(SessionPhase::Failed);
    }

    fn handle_deadline(&mut self) {
        tracing::warn!("no terminal frame before the deadline");
        self.set_status("Stream timeout - please try again");
        self.finish_session(SessionPhase::TimedOut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Author;
    use crate::utils::test_utils::{attach_test_session, create_test_app};

    fn frame_event(app: &mut ChatApp, frame: Frame, stream_id: u64) {
        app.apply_event(SessionEvent::Frame(frame), stream_id);
    }

    #[test]
    fn progress_status_renders_percentages() {
        assert_eq!(progress_status(Some(0.45)), "Writing... 45%");
        assert_eq!(progress_status(Some(0.0)), "Writing... 0%");
        assert_eq!(progress_status(Some(1.0)), "Writing... 100%");
        assert_eq!(progress_status(None), "Writing...");
        assert_eq!(progress_status(Some(2.5)), "Writing...");
        assert_eq!(progress_status(Some(-0.1)), "Writing...");
    }

    #[test]
    fn parks_scenario_ends_with_exact_final_answer() {
        let (mut app, _rx) = create_test_app();
        app.log.push_user("find parks near me");
        let handle = attach_test_session(&mut app, "session_41_1700000000", 1);

        app.apply_event(SessionEvent::Opened, 1);
        assert_eq!(app.status(), Some("Connected to AI assistant..."));

        frame_event(
            &mut app,
            Frame::Start {
                message: Some("Assistant is writing...".to_string()),
            },
            1,
        );
        assert_eq!(app.phase(), SessionPhase::Active);

        frame_event(
            &mut app,
            Frame::Content {
                content: "Searching parks...".to_string(),
                progress: Some(0.3),
            },
            1,
        );
        frame_event(
            &mut app,
            Frame::Content {
                content: "Searching parks... Found 12.".to_string(),
                progress: Some(0.7),
            },
            1,
        );
        frame_event(
            &mut app,
            Frame::Complete {
                final_content: "Found 12 parks near you.".to_string(),
                run_id: Some("run_abc".to_string()),
            },
            1,
        );

        let messages = app.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].author, Author::User);
        assert_eq!(messages[0].content, "find parks near me");
        assert_eq!(messages[1].author, Author::Assistant);
        assert_eq!(messages[1].content, "Found 12 parks near you.");
        assert!(!messages[1].streaming);

        assert_eq!(app.phase(), SessionPhase::Completed);
        assert!(app.status().is_none());
        assert!(!app.session_active());
        assert!(handle.is_released());
    }

    #[test]
    fn content_snapshots_replace_rather_than_append() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);

        frame_event(&mut app, Frame::Start { message: None }, 1);
        frame_event(
            &mut app,
            Frame::Content {
                content: "The answer".to_string(),
                progress: None,
            },
            1,
        );
        frame_event(
            &mut app,
            Frame::Content {
                content: "The answer is 12.".to_string(),
                progress: None,
            },
            1,
        );

        // Each snapshot carries the whole answer so far.
        let streaming = app.log.streaming_message().expect("placeholder missing");
        assert_eq!(streaming.content, "The answer is 12.");
        assert_eq!(app.messages().len(), 1);
    }

    #[test]
    fn content_before_start_creates_no_message() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);

        frame_event(
            &mut app,
            Frame::Content {
                content: "orphan".to_string(),
                progress: Some(0.5),
            },
            1,
        );

        assert!(app.messages().is_empty());
        assert_eq!(
            app.status(),
            Some("Received content before the response started")
        );
        // The violation is not fatal; the session keeps running.
        assert_eq!(app.phase(), SessionPhase::Connecting);
        assert!(app.session_active());
    }

    #[test]
    fn error_frame_appends_entry_and_fails_session() {
        let (mut app, _rx) = create_test_app();
        let handle = attach_test_session(&mut app, "s", 1);

        frame_event(&mut app, Frame::Start { message: None }, 1);
        frame_event(
            &mut app,
            Frame::Content {
                content: "partial".to_string(),
                progress: None,
            },
            1,
        );
        frame_event(
            &mut app,
            Frame::Error {
                error: "assistant crashed".to_string(),
            },
            1,
        );

        let messages = app.messages();
        assert_eq!(messages.len(), 2);
        // The partial answer survives untouched, just no longer live.
        assert_eq!(messages[0].content, "partial");
        assert!(!messages[0].streaming);
        assert_eq!(messages[1].content, "Error: assistant crashed");

        assert_eq!(app.phase(), SessionPhase::Failed);
        assert_eq!(app.status(), Some("Error occurred"));
        assert!(handle.is_released());
    }

    #[test]
    fn error_frame_without_placeholder_still_appends_entry() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);

        frame_event(
            &mut app,
            Frame::Error {
                error: "No data loaded".to_string(),
            },
            1,
        );

        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.messages()[0].content, "Error: No data loaded");
        assert_eq!(app.phase(), SessionPhase::Failed);
    }

    #[test]
    fn server_timeout_frame_times_out_session() {
        let (mut app, _rx) = create_test_app();
        let handle = attach_test_session(&mut app, "s", 1);

        frame_event(&mut app, Frame::Timeout, 1);

        assert_eq!(app.phase(), SessionPhase::TimedOut);
        assert_eq!(app.status(), Some("Connection timeout"));
        assert!(handle.is_released());
    }

    #[test]
    fn deadline_times_out_session_and_later_frames_are_ignored() {
        let (mut app, _rx) = create_test_app();
        let handle = attach_test_session(&mut app, "s", 1);

        frame_event(&mut app, Frame::Start { message: None }, 1);
        app.apply_event(SessionEvent::DeadlineExpired, 1);

        assert_eq!(app.phase(), SessionPhase::TimedOut);
        assert_eq!(app.status(), Some("Stream timeout - please try again"));
        assert!(handle.is_released());
        assert!(!app.session_active());

        // A straggling frame after the deadline changes nothing.
        let before = app.messages().len();
        frame_event(
            &mut app,
            Frame::Content {
                content: "too late".to_string(),
                progress: None,
            },
            1,
        );
        assert_eq!(app.messages().len(), before);
        assert_eq!(app.phase(), SessionPhase::TimedOut);
    }

    #[test]
    fn finish_session_releases_only_once() {
        let (mut app, _rx) = create_test_app();
        let handle = attach_test_session(&mut app, "s", 1);

        assert!(app.finish_session(SessionPhase::Completed));
        assert!(!app.finish_session(SessionPhase::Failed));
        assert!(!app.finish_session(SessionPhase::TimedOut));
        assert_eq!(app.phase(), SessionPhase::Completed);
        assert!(handle.is_released());
    }

    #[test]
    fn transport_failure_before_start_appends_connection_error() {
        let (mut app, _rx) = create_test_app();
        let handle = attach_test_session(&mut app, "s", 1);

        app.apply_event(
            SessionEvent::TransportFailed {
                stage: TransportStage::Connecting,
                detail: "connection refused".to_string(),
            },
            1,
        );

        assert_eq!(app.messages().len(), 1);
        assert_eq!(
            app.messages()[0].content,
            "Connection failed: Could not reach the server. Please try again."
        );
        assert_eq!(
            app.status(),
            Some("Could not reach the server - please try again")
        );
        assert_eq!(app.phase(), SessionPhase::Failed);
        assert!(handle.is_released());
    }

    #[test]
    fn transport_failure_mid_stream_keeps_partial_answer() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);

        frame_event(&mut app, Frame::Start { message: None }, 1);
        frame_event(
            &mut app,
            Frame::Content {
                content: "half an answer".to_string(),
                progress: None,
            },
            1,
        );
        app.apply_event(
            SessionEvent::TransportFailed {
                stage: TransportStage::Reading,
                detail: "reset by peer".to_string(),
            },
            1,
        );

        // No synthetic entry; the partial answer stands on its own.
        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.messages()[0].content, "half an answer");
        assert!(!app.messages()[0].streaming);
        assert_eq!(
            app.status(),
            Some("Connection to the server was lost - please try again")
        );
        assert_eq!(app.phase(), SessionPhase::Failed);
    }

    #[test]
    fn events_with_stale_stream_ids_are_dropped() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "current", 2);

        frame_event(&mut app, Frame::Start { message: None }, 1);
        frame_event(
            &mut app,
            Frame::Error {
                error: "from an old stream".to_string(),
            },
            1,
        );

        assert!(app.messages().is_empty());
        assert_eq!(app.phase(), SessionPhase::Connecting);
        assert!(app.session_active());
    }

    #[test]
    fn events_after_completion_are_ignored() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);

        frame_event(&mut app, Frame::Start { message: None }, 1);
        frame_event(
            &mut app,
            Frame::Complete {
                final_content: "done".to_string(),
                run_id: None,
            },
            1,
        );
        assert_eq!(app.phase(), SessionPhase::Completed);

        frame_event(
            &mut app,
            Frame::Error {
                error: "late failure".to_string(),
            },
            1,
        );
        app.apply_event(SessionEvent::DeadlineExpired, 1);

        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.messages()[0].content, "done");
        assert_eq!(app.phase(), SessionPhase::Completed);
    }

    #[test]
    fn unknown_frames_change_nothing() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);
        app.set_status("before");

        frame_event(&mut app, Frame::Unknown, 1);

        assert!(app.messages().is_empty());
        assert_eq!(app.status(), Some("before"));
        assert_eq!(app.phase(), SessionPhase::Connecting);
    }

    #[test]
    fn malformed_event_degrades_to_status_and_stream_continues() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);

        frame_event(&mut app, Frame::Start { message: None }, 1);
        app.apply_event(SessionEvent::Malformed("expected value".to_string()), 1);
        assert_eq!(app.status(), Some("Data parsing error"));
        assert!(app.session_active());

        // Healthy frames keep applying afterward.
        frame_event(
            &mut app,
            Frame::Content {
                content: "recovered".to_string(),
                progress: Some(0.9),
            },
            1,
        );
        assert_eq!(
            app.log.streaming_message().expect("placeholder missing").content,
            "recovered"
        );
        assert_eq!(app.status(), Some("Writing... 90%"));
    }

    #[test]
    fn duplicate_start_keeps_first_placeholder() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);

        frame_event(&mut app, Frame::Start { message: None }, 1);
        let first = app.log.streaming_message().expect("placeholder missing").id;

        frame_event(&mut app, Frame::Start { message: None }, 1);

        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.log.streaming_message().expect("placeholder missing").id, first);
    }

    #[test]
    fn empty_status_frames_leave_the_line_alone() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);
        app.set_status("existing");

        frame_event(&mut app, Frame::Status { message: None }, 1);
        assert_eq!(app.status(), Some("existing"));

        frame_event(
            &mut app,
            Frame::Status {
                message: Some("   ".to_string()),
            },
            1,
        );
        assert_eq!(app.status(), Some("existing"));

        frame_event(
            &mut app,
            Frame::Status {
                message: Some("Connecting to OpenAI Assistant...".to_string()),
            },
            1,
        );
        assert_eq!(app.status(), Some("Connecting to OpenAI Assistant..."));
    }

    #[test]
    fn complete_without_start_still_records_the_answer() {
        let (mut app, _rx) = create_test_app();
        attach_test_session(&mut app, "s", 1);

        frame_event(
            &mut app,
            Frame::Complete {
                final_content: "whole answer at once".to_string(),
                run_id: None,
            },
            1,
        );

        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.messages()[0].content, "whole answer at once");
        assert!(!app.messages()[0].streaming);
        assert_eq!(app.phase(), SessionPhase::Completed);
    }
}
