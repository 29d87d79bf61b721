//! One-shot question mode for scripting.

use std::error::Error;

use crate::core::app::{AppSettings, ChatApp};
use crate::core::session::SessionPhase;
use crate::ui::ChatRenderer;

/// Submit one prompt, stream the answer to stdout, and exit non-zero
/// unless the session completed.
pub async fn run_ask(settings: AppSettings, prompt: &str) -> Result<(), Box<dyn Error>> {
    let (mut app, mut rx) = ChatApp::new(settings)?;
    let mut renderer = ChatRenderer::new();

    let outcome = app.submit(prompt).await;
    renderer.sync(&app)?;
    if !outcome.is_accepted() {
        std::process::exit(1);
    }

    while app.session_active() {
        let Some((event, stream_id)) = rx.recv().await else {
            break;
        };
        app.apply_event(event, stream_id);
        renderer.sync(&app)?;
    }

    if app.phase() != SessionPhase::Completed {
        std::process::exit(1);
    }
    Ok(())
}
