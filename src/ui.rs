//! Line-oriented rendering of the chat state.
//!
//! The renderer owns no chat state of its own; it diffs the app's message
//! slice against what it has already written so streamed snapshots appear
//! as growing text instead of repeated blocks.

use std::io::{self, Write};

use crate::core::app::ChatApp;

pub struct ChatRenderer {
    /// Messages fully written to the terminal.
    printed: usize,
    /// What has been shown so far for the in-progress answer.
    partial: String,
    /// Last status line written, to avoid repeating it.
    last_status: Option<String>,
}

impl ChatRenderer {
    pub fn new() -> Self {
        ChatRenderer {
            printed: 0,
            partial: String::new(),
            last_status: None,
        }
    }

    /// Bring the terminal up to date with the app state.
    pub fn sync(&mut self, app: &ChatApp) -> io::Result<()> {
        let mut out = io::stdout().lock();
        let messages = app.messages();

        while self.printed < messages.len() {
            let message = &messages[self.printed];
            if message.streaming {
                break;
            }

            if message.is_user() {
                // The user already sees their own line at the prompt.
            } else if self.partial.is_empty() {
                writeln!(out, "{}", message.content)?;
                writeln!(out)?;
            } else {
                // The answer we were streaming just finalized.
                if let Some(rest) = message.content.strip_prefix(self.partial.as_str()) {
                    writeln!(out, "{rest}")?;
                } else {
                    // Final text diverged from the last snapshot; show it whole.
                    writeln!(out)?;
                    writeln!(out, "{}", message.content)?;
                }
                writeln!(out)?;
                self.partial.clear();
            }
            self.printed += 1;
        }

        if let Some(message) = messages.get(self.printed) {
            if message.streaming && message.content != self.partial {
                match message.content.strip_prefix(self.partial.as_str()) {
                    Some(delta) => write!(out, "{delta}")?,
                    None => {
                        // Snapshot shrank or was rewritten; start the line over.
                        writeln!(out)?;
                        write!(out, "{}", message.content)?;
                    }
                }
                self.partial = message.content.clone();
            }
        }

        // Status goes to stderr so piped output stays pure answer text,
        // and only while no answer text is mid-line.
        if self.partial.is_empty() {
            let status = app.status().map(str::to_string);
            if status != self.last_status {
                if let Some(ref text) = status {
                    let mut err = io::stderr().lock();
                    writeln!(err, "[{text}]")?;
                    err.flush()?;
                }
                self.last_status = status;
            }
        }

        out.flush()
    }
}

impl Default for ChatRenderer {
    fn default() -> Self {
        Self::new()
    }
}
