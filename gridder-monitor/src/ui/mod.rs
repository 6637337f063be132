/// Terminal rendering of a [`DashboardSnapshot`]
pub mod input;
pub mod widgets;

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::controller::{DashboardSnapshot, Health};
use crate::scheduler::SchedulerState;
use crate::selection::Controls;

pub use input::{map_key, KeyAction};

pub fn draw(f: &mut Frame, snapshot: &DashboardSnapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(36),
            Constraint::Percentage(32),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_controls(f, &snapshot.controls, rows[0]);

    let top = split_horizontal(rows[1], [60, 40]);
    widgets::render_trades_chart(f, &snapshot.dashboard.trades_chart, top[0]);
    widgets::render_stats(f, &snapshot.dashboard.stats, top[1]);

    let middle = split_horizontal(rows[2], [60, 40]);
    widgets::render_recent_trades(f, &snapshot.dashboard.recent_trades, middle[0]);
    widgets::render_config(f, &snapshot.dashboard.config, middle[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(rows[3]);
    widgets::render_options_pnl(f, &snapshot.dashboard.options_pnl, bottom[0]);
    widgets::render_series(
        f,
        "TOTAL PnL",
        Color::Yellow,
        &snapshot.dashboard.total_pnl,
        bottom[1],
    );
    widgets::render_series(f, "PRICE", Color::White, &snapshot.dashboard.price, bottom[2]);

    render_status(f, snapshot, rows[4]);
}

fn split_horizontal(area: Rect, percentages: [u16; 2]) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(percentages[0]),
            Constraint::Percentage(percentages[1]),
        ])
        .split(area)
}

fn render_controls(f: &mut Frame, controls: &Controls, area: Rect) {
    let selection = &controls.selection;
    let label = Style::default().fg(Color::Gray);
    let value = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let bot = if selection.bot_name.is_empty() {
        "All Bots".to_string()
    } else {
        selection.bot_name.clone()
    };
    let run = if selection.include_all_runs {
        "all runs".to_string()
    } else if controls.runs.is_stale() {
        "loading...".to_string()
    } else if selection.bot_run.is_empty() {
        "--".to_string()
    } else {
        selection.bot_run.clone()
    };
    let auto = if controls.refresh.enabled {
        format!("every {}s", controls.refresh.interval_secs)
    } else {
        format!("paused ({}s)", controls.refresh.interval_secs)
    };

    let line = Line::from(vec![
        Span::styled("[b] Bot: ", label),
        Span::styled(bot, value),
        Span::styled("  [r] Run: ", label),
        Span::styled(
            run,
            if controls.run_selector_enabled() {
                value
            } else {
                Style::default().fg(Color::DarkGray)
            },
        ),
        Span::styled("  [a] All runs: ", label),
        Span::styled(if selection.include_all_runs { "on" } else { "off" }, value),
        Span::styled("  [t] Window: ", label),
        Span::styled(selection.time_filter.label(), value),
        Span::styled("  [+/-/p] Refresh: ", label),
        Span::styled(auto, value),
    ]);

    let block = Block::default()
        .title(" GRIDDER MONITOR ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn render_status(f: &mut Frame, snapshot: &DashboardSnapshot, area: Rect) {
    let (health, color) = match snapshot.health {
        Health::Unknown => ("CONNECTING".to_string(), Color::Yellow),
        Health::Ok => ("OK".to_string(), Color::Green),
        Health::Degraded { failed } => (format!("DEGRADED ({} failed)", failed), Color::Yellow),
        Health::Down => ("BACKEND DOWN".to_string(), Color::Red),
    };

    let updated = snapshot
        .dashboard
        .last_updated
        .map(|time| time.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    let timer = match snapshot.scheduler {
        SchedulerState::Running => "auto",
        SchedulerState::Stopped => "manual",
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", health), Style::default().fg(color)),
        Span::raw(format!("| updated {} | {} ", updated, timer)),
    ];
    if snapshot.refreshing {
        spans.push(Span::styled("| refreshing... ", Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::styled(
        "| [space] refresh  [q] quit",
        Style::default().fg(Color::DarkGray),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
