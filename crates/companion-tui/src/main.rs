mod app;
mod clipboard;
mod handler;
mod logging;
mod tui;
mod ui;

use anyhow::{Context, Result};
use companion_core::Config;

use crate::app::App;
use crate::tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = logging::init()?;

    let config = Config::load()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read config, using defaults");
            Config::new()
        })
        .with_env_overrides();

    let mut app = App::new(&config).context(
        "could not set up the API gateway; set gateway_url in the config file or COMPANION_GATEWAY_URL",
    )?;
    tracing::info!(
        provider = config.provider().as_str(),
        model = %config.chat_settings().model,
        log = %log_path.display(),
        "companion starting"
    );

    // Same moment the widget would fetch its question list
    app.load_templates().await;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    if app.reply_task.is_some() {
        tracing::info!("exiting with a reply still pending");
    }
    Ok(())
}
