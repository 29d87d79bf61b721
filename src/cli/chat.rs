//! The interactive chat loop.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::core::app::{AppSettings, ChatApp};
use crate::core::session::SessionPhase;
use crate::core::stream::SessionEvent;
use crate::ui::ChatRenderer;

pub async fn run_chat(settings: AppSettings) -> Result<(), Box<dyn Error>> {
    let base_url = settings.base_url.clone();
    let (mut app, mut rx) = ChatApp::new(settings)?;

    eprintln!("🌆 CityTalk - chat with your city's data");
    eprintln!("📡 Backend: {base_url}");
    if app.logging.is_active() {
        eprintln!("📝 Transcript: {}", app.logging.get_status_string());
    }
    eprintln!("💡 Enter a question, Ctrl+D to quit");
    eprintln!();

    let mut renderer = ChatRenderer::new();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            // EOF: the user is done.
            break;
        };

        let outcome = app.submit(&line).await;
        renderer.sync(&app)?;

        if outcome.is_accepted() {
            drive_session(&mut app, &mut rx, &mut renderer).await?;
            if app.phase() == SessionPhase::Completed {
                eprintln!("🗺 Map updated: {}", app.map_url());
                eprintln!();
            }
        }
    }

    Ok(())
}

/// Pump connector events until the session reaches a terminal phase. The
/// watchdog guarantees an event always arrives, so this cannot hang.
async fn drive_session(
    app: &mut ChatApp,
    rx: &mut mpsc::UnboundedReceiver<(SessionEvent, u64)>,
    renderer: &mut ChatRenderer,
) -> Result<(), Box<dyn Error>> {
    while app.session_active() {
        let Some((event, stream_id)) = rx.recv().await else {
            break;
        };
        app.apply_event(event, stream_id);
        renderer.sync(app)?;
    }
    Ok(())
}
