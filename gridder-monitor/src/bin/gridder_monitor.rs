/// Gridder Monitor
///
/// Live view of a Gridder bot: trades, PnL, price and run config, refreshed on a
/// timer or on demand. Configured through `GRIDDER_*` environment variables.
use std::{
    error::Error,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gridder_monitor::{
    logging,
    ui::{self, KeyAction},
    Controller, HttpMonitorClient, MonitorConfig,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = MonitorConfig::from_env()?;
    logging::init(&config.log_file)?;
    info!("Starting gridder-monitor against {}", config.api_url);

    let api = Arc::new(HttpMonitorClient::new(&config)?);
    let ui_tick = config.ui_tick;
    let (handle, controller) = Controller::spawn(api, config);

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut snapshots = handle.subscribe();
    let mut last_draw: Option<Instant> = None;

    loop {
        let changed = snapshots.has_changed().unwrap_or(false);
        let due = last_draw.map_or(true, |at| at.elapsed() >= Duration::from_secs(1));
        if changed || due {
            let snapshot = snapshots.borrow_and_update().clone();
            terminal.draw(|f| ui::draw(f, &snapshot))?;
            last_draw = Some(Instant::now());
        }

        if event::poll(ui_tick)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let controls = snapshots.borrow().controls.clone();
                match ui::map_key(key.code, &controls) {
                    Some(KeyAction::Quit) => break,
                    Some(KeyAction::Control(event)) => {
                        if !handle.send(event) {
                            break;
                        }
                    }
                    None => {}
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    drop(handle);
    controller.abort();
    info!("gridder-monitor stopped");
    Ok(())
}
