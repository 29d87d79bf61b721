use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use memchr::memchr;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::utils::url::stream_url;

/// One decoded frame from a session's event channel.
///
/// The discriminator is the `type` field of the JSON payload. Types this
/// client does not know are preserved as [`Frame::Unknown`] so newer
/// servers can add frame kinds without breaking older clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Status {
        message: Option<String>,
    },
    Start {
        message: Option<String>,
    },
    Content {
        content: String,
        progress: Option<f64>,
    },
    Complete {
        final_content: String,
        run_id: Option<String>,
    },
    Error {
        error: String,
    },
    Timeout,
    #[serde(other)]
    Unknown,
}

impl Frame {
    /// Frames that end the session on arrival.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Complete { .. } | Frame::Error { .. } | Frame::Timeout)
    }
}

/// How far a failed connection got before it broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStage {
    /// The subscription request failed; no event was ever received.
    Connecting,
    /// The channel broke after it had been established.
    Reading,
}

/// Events forwarded from a connector task to the dispatcher.
///
/// Every event travels with the `stream_id` of the task that produced it,
/// so the dispatcher can drop output from superseded sessions.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The channel is open; frames may follow.
    Opened,
    /// A well-formed frame arrived.
    Frame(Frame),
    /// A `data:` payload that could not be decoded. Non-fatal.
    Malformed(String),
    /// Transport-level failure. Fatal for the session.
    TransportFailed {
        stage: TransportStage,
        detail: String,
    },
    /// The watchdog deadline elapsed before a terminal frame arrived.
    DeadlineExpired,
}

/// Handle to a live channel subscription.
///
/// Completion, server error, transport failure, and timeout all funnel
/// through [`StreamHandle::close`]; only the first call performs the
/// release, so teardown runs exactly once no matter how many termination
/// paths fire.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    cancel: CancellationToken,
    released: Arc<AtomicBool>,
}

impl StreamHandle {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Release the subscription: cancel the connector task, which also
    /// disarms the watchdog. Returns true for the call that performed the
    /// release, false for every subsequent call.
    pub fn close(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Decode one `data:` payload into a frame.
pub fn decode_frame(payload: &str) -> Result<Frame, serde_json::Error> {
    serde_json::from_str::<Frame>(payload)
}

fn handle_data_payload(
    payload: &str,
    tx: &mpsc::UnboundedSender<(SessionEvent, u64)>,
    stream_id: u64,
) -> bool {
    if payload.trim().is_empty() {
        return false;
    }

    match decode_frame(payload) {
        Ok(frame) => {
            let terminal = frame.is_terminal();
            let _ = tx.send((SessionEvent::Frame(frame), stream_id));
            terminal
        }
        Err(e) => {
            // One bad frame must not take down an otherwise healthy
            // stream; surface it and keep reading.
            tracing::warn!(stream_id, error = %e, "undecodable frame");
            let _ = tx.send((SessionEvent::Malformed(e.to_string()), stream_id));
            false
        }
    }
}

fn process_event_line(
    line: &str,
    tx: &mpsc::UnboundedSender<(SessionEvent, u64)>,
    stream_id: u64,
) -> bool {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, tx, stream_id))
        .unwrap_or(false)
}

/// Split buffered bytes into lines and dispatch each complete one.
///
/// Returns true once a terminal frame has been forwarded; any bytes still
/// in the buffer at that point belong to a session that is already over.
fn drain_buffered_lines(
    buffer: &mut Vec<u8>,
    tx: &mpsc::UnboundedSender<(SessionEvent, u64)>,
    stream_id: u64,
) -> bool {
    while let Some(newline_pos) = memchr(b'\n', buffer) {
        let should_end = match std::str::from_utf8(&buffer[..newline_pos]) {
            Ok(line) => process_event_line(line.trim(), tx, stream_id),
            Err(e) => {
                tracing::warn!(stream_id, error = %e, "invalid UTF-8 in event channel");
                false
            }
        };
        buffer.drain(..=newline_pos);
        if should_end {
            return true;
        }
    }
    false
}

/// Everything a connector task needs to subscribe to one session.
pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub session_id: String,
    pub deadline: Instant,
    pub stream_id: u64,
}

/// Spawns connector tasks and hands their events to one receiver.
///
/// The service is cheap to clone; all tasks share the same event channel
/// and the consumer applies events strictly in arrival order.
#[derive(Clone)]
pub struct StreamService {
    tx: mpsc::UnboundedSender<(SessionEvent, u64)>,
}

impl StreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SessionEvent, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Subscribe to a session's event channel.
    ///
    /// The task forwards events until a terminal frame arrives, the
    /// transport fails, the deadline expires, or the returned handle is
    /// closed. The handle is the only way to release the subscription.
    pub fn open(&self, params: StreamParams) -> StreamHandle {
        let cancel = CancellationToken::new();
        let handle = StreamHandle::new(cancel.clone());
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                session_id,
                deadline,
                stream_id,
            } = params;

            tokio::select! {
                _ = read_channel(client, base_url, session_id, tx.clone(), stream_id) => {}
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::debug!(stream_id, "watchdog deadline elapsed");
                    let _ = tx.send((SessionEvent::DeadlineExpired, stream_id));
                }
                _ = cancel.cancelled() => {}
            }
        });

        handle
    }
}

async fn read_channel(
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    tx: mpsc::UnboundedSender<(SessionEvent, u64)>,
    stream_id: u64,
) {
    let url = stream_url(&base_url, &session_id);

    let response = match client
        .get(&url)
        .header("Accept", "text/event-stream")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send((
                SessionEvent::TransportFailed {
                    stage: TransportStage::Connecting,
                    detail: e.to_string(),
                },
                stream_id,
            ));
            return;
        }
    };

    if !response.status().is_success() {
        let _ = tx.send((
            SessionEvent::TransportFailed {
                stage: TransportStage::Connecting,
                detail: format!("server returned {}", response.status()),
            },
            stream_id,
        ));
        return;
    }

    let _ = tx.send((SessionEvent::Opened, stream_id));

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send((
                    SessionEvent::TransportFailed {
                        stage: TransportStage::Reading,
                        detail: e.to_string(),
                    },
                    stream_id,
                ));
                return;
            }
        };

        buffer.extend_from_slice(&chunk_bytes);
        if drain_buffered_lines(&mut buffer, &tx, stream_id) {
            return;
        }
    }

    // The server closed the channel without a terminal frame.
    let _ = tx.send((
        SessionEvent::TransportFailed {
            stage: TransportStage::Reading,
            detail: "event channel closed before completion".to_string(),
        },
        stream_id,
    ));
}
