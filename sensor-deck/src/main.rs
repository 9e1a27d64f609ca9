//! Sensor Deck - live device/sensor dashboard
//!
//! Two tables kept current by the sync engine: a streaming push channel for
//! near-real-time updates, with a timer-based fallback pull when the channel
//! goes quiet.

mod app;
mod ui;

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use sync_client::{EventClient, SyncConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = SyncConfig::from_env();

    // Route tracing into the TUI log pane
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()));
    tracing_subscriber::registry()
        .with(tui_logger::tracing_subscriber_layer())
        .with(env_filter)
        .init();
    tui_logger::init_logger(log::LevelFilter::Info).ok();
    tui_logger::set_default_level(log::LevelFilter::Info);

    // Push broker down is not fatal: the fallback timers keep the tables
    // current in pull-only mode
    let client = match EventClient::connect(&config.socket_addr, "sensor-deck").await {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Push broker unreachable, starting pull-only: {}", e);
            EventClient::disconnected()
        }
    };

    let mut app = App::new(config, client).await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.shutdown().await;

    if let Err(err) = res {
        println!("{:?}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Up => app.select_previous(),
                        KeyCode::Down => app.select_next(),
                        KeyCode::Enter => app.track_selected_device().await,
                        KeyCode::Backspace => app.clear_selection().await,
                        KeyCode::Char('r') => app.refresh().await,
                        _ => {}
                    }
                }
            }
        }
    }
}
