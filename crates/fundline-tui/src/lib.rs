//! Fundline terminal front-end.
//!
//! Renders the donation kiosk with ratatui and drives the wizard through
//! `fundline-core`. Logging must not go to stdout while this module owns
//! the terminal; the binary routes it to a file.

pub mod app;
pub mod boot;
pub mod ui;

use app::App;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use fundline_core::error::Result;
use fundline_core::feed::DonationFeed;
use fundline_core::flow::DonationFlow;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

const TICK_RATE: Duration = Duration::from_millis(100);

/// Runs the kiosk until the user quits.
pub async fn run(
    flow: Arc<DonationFlow>,
    feed: &DonationFeed,
    funding_goal: Option<f64>,
) -> Result<()> {
    info!("starting terminal kiosk");
    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, flow, feed, funding_goal).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    flow: Arc<DonationFlow>,
    feed: &DonationFeed,
    funding_goal: Option<f64>,
) -> Result<()> {
    let mut app = App::new(flow, feed.subscribe(), funding_goal);
    let mut last_tick = Instant::now();

    while !app.should_quit {
        app.tick();
        terminal.draw(|f| ui::draw(f, &app))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key),
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
        }
    }

    info!("terminal kiosk closed");
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
