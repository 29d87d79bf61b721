#[cfg(test)]
use crate::core::app::{AppSettings, ChatApp};
#[cfg(test)]
use crate::core::session::Session;
#[cfg(test)]
use crate::core::stream::{SessionEvent, StreamHandle};
#[cfg(test)]
use std::time::Duration;
#[cfg(test)]
use tokio::sync::mpsc;
#[cfg(test)]
use tokio_util::sync::CancellationToken;

/// An app pointed at a port nothing listens on, so tests that should stay
/// offline fail loudly if they ever reach for the network.
#[cfg(test)]
pub fn create_test_app() -> (ChatApp, mpsc::UnboundedReceiver<(SessionEvent, u64)>) {
    create_test_app_with_base_url("http://127.0.0.1:0")
}

#[cfg(test)]
pub fn create_test_app_with_base_url(
    base_url: &str,
) -> (ChatApp, mpsc::UnboundedReceiver<(SessionEvent, u64)>) {
    let settings = AppSettings {
        base_url: base_url.to_string(),
        stream_timeout: Duration::from_secs(60),
        map_page: "default_map.html".to_string(),
        log_file: None,
    };
    ChatApp::new(settings).expect("test app should build")
}

/// Install a live session directly, bypassing the submission handshake.
/// Returns a handle clone so tests can observe the release.
#[cfg(test)]
pub fn attach_test_session(app: &mut ChatApp, session_id: &str, stream_id: u64) -> StreamHandle {
    let handle = StreamHandle::new(CancellationToken::new());
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    app.session = Some(Session::new(session_id, stream_id, deadline, handle.clone()));
    app.next_stream_id = stream_id;
    handle
}
