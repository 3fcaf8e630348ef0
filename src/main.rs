use anyhow::Result;

mod api;
mod app;
mod chat;
mod config;
mod handler;
mod query;
mod tui;
mod ui;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let mut app = App::new(&config)?;
    tracing::info!(session = %app.session(), base_url = config.base_url(), "starting up");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    result
}

async fn run(
    app: &mut App,
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
) -> Result<()> {
    // First fetch of the session history
    app.maybe_refetch();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

/// Diagnostics go to a file; stderr belongs to the terminal UI.
fn init_logging() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let log_path = Config::log_path()?;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TRACKCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
