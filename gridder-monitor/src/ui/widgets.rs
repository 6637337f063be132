/// Panel widgets, one per dashboard panel
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::render::{
    ConfigRow, OptionsSeries, Panel, PanelState, Points, StatsCards, TradePoints, TradeRow,
};

const BUY: Color = Color::Green;
const SELL: Color = Color::Red;
const AXIS: Color = Color::DarkGray;

pub fn render_trades_chart(f: &mut Frame, state: &PanelState<TradePoints>, area: Rect) {
    let title = panel_title("TRADES", state.stale);
    let points = match &state.panel {
        Panel::Ready(points) => points,
        Panel::Placeholder(message) => return render_placeholder(f, &title, message, area),
    };

    let series = [
        Series {
            name: "BUY",
            color: BUY,
            points: &points.buys,
        },
        Series {
            name: "SELL",
            color: SELL,
            points: &points.sells,
        },
    ];
    render_chart(f, &title, &series, GraphType::Scatter, area);
}

pub fn render_recent_trades(f: &mut Frame, state: &PanelState<Vec<TradeRow>>, area: Rect) {
    let title = panel_title("RECENT TRADES", state.stale);
    let rows = match &state.panel {
        Panel::Ready(rows) => rows,
        Panel::Placeholder(message) => return render_placeholder(f, &title, message, area),
    };

    let header = Row::new(vec!["TIME", "SIDE", "PRICE", "QTY", "BOT"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let body = rows.iter().map(|row| {
        let side_color = if row.side.is_buy() { BUY } else { SELL };
        Row::new(vec![
            Span::raw(row.timestamp.format("%m-%d %H:%M:%S").to_string()),
            Span::styled(row.side.as_str(), Style::default().fg(side_color)),
            Span::raw(row.price.to_string()),
            Span::raw(row.quantity.to_string()),
            Span::styled(row.bot_name.clone(), Style::default().fg(Color::Gray)),
        ])
    });

    let table = Table::new(
        body,
        [
            Constraint::Length(15),
            Constraint::Length(5),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(bordered(&title));

    f.render_widget(table, area);
}

pub fn render_stats(f: &mut Frame, state: &PanelState<StatsCards>, area: Rect) {
    let title = panel_title("STATS", state.stale);
    let cards = match &state.panel {
        Panel::Ready(cards) => cards,
        Panel::Placeholder(message) => return render_placeholder(f, &title, message, area),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Bot: ", Style::default().fg(Color::Gray)),
            Span::raw(cards.bot_name.clone()),
            Span::styled("  Run: ", Style::default().fg(Color::Gray)),
            Span::raw(cards.bot_run.clone()),
        ]),
        Line::from(vec![
            Span::styled("Trades: ", Style::default().fg(Color::Gray)),
            Span::styled(
                cards.total_trades.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  ("),
            Span::styled(format!("{} buy", cards.buy_trades), Style::default().fg(BUY)),
            Span::raw(" / "),
            Span::styled(format!("{} sell", cards.sell_trades), Style::default().fg(SELL)),
            Span::raw(")"),
        ]),
        pnl_line("Spot unrealized", cards.spot_unrealized_pnl),
        pnl_line("Options unrealized", cards.options_unrealized_pnl),
        pnl_line("Total unrealized", cards.total_unrealized_pnl),
        pnl_line("Spot realized", cards.spot_realized_pnl),
    ];

    f.render_widget(Paragraph::new(lines).block(bordered(&title)), area);
}

pub fn render_options_pnl(f: &mut Frame, state: &PanelState<OptionsSeries>, area: Rect) {
    let title = panel_title("OPTIONS PnL", state.stale);
    let series = match &state.panel {
        Panel::Ready(series) => series,
        Panel::Placeholder(message) => return render_placeholder(f, &title, message, area),
    };

    let series = [
        Series {
            name: "Call",
            color: Color::Cyan,
            points: &series.call,
        },
        Series {
            name: "Put",
            color: Color::Magenta,
            points: &series.put,
        },
    ];
    render_chart(f, &title, &series, GraphType::Line, area);
}

/// Single-series line chart (total PnL, price)
pub fn render_series(
    f: &mut Frame,
    name: &'static str,
    color: Color,
    state: &PanelState<Points>,
    area: Rect,
) {
    let title = panel_title(name, state.stale);
    let points = match &state.panel {
        Panel::Ready(points) => points,
        Panel::Placeholder(message) => return render_placeholder(f, &title, message, area),
    };

    let series = [Series {
        name,
        color,
        points,
    }];
    render_chart(f, &title, &series, GraphType::Line, area);
}

pub fn render_config(f: &mut Frame, state: &PanelState<Vec<ConfigRow>>, area: Rect) {
    let title = panel_title("CONFIG", state.stale);
    let rows = match &state.panel {
        Panel::Ready(rows) => rows,
        Panel::Placeholder(message) => return render_placeholder(f, &title, message, area),
    };

    let lines: Vec<Line> = rows
        .iter()
        .map(|row| {
            Line::from(vec![
                Span::styled(format!("{}: ", row.key), Style::default().fg(Color::Gray)),
                Span::raw(row.value.clone()),
            ])
        })
        .collect();

    f.render_widget(
        Paragraph::new(lines)
            .block(bordered(&title))
            .wrap(Wrap { trim: true }),
        area,
    );
}

struct Series<'a> {
    name: &'static str,
    color: Color,
    points: &'a Points,
}

fn render_chart(f: &mut Frame, title: &str, series: &[Series], graph: GraphType, area: Rect) {
    let all = series.iter().flat_map(|series| series.points.iter());
    let Some((x_bounds, y_bounds)) = bounds(all) else {
        return render_placeholder(f, title, "No data", area);
    };

    let marker = match graph {
        GraphType::Scatter => symbols::Marker::Dot,
        _ => symbols::Marker::Braille,
    };

    let datasets = series
        .iter()
        .map(|series| {
            Dataset::default()
                .name(series.name)
                .marker(marker)
                .graph_type(graph)
                .style(Style::default().fg(series.color))
                .data(series.points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(bordered(title))
        .x_axis(
            Axis::default()
                .bounds(x_bounds)
                .labels(vec![
                    Line::from(time_label(x_bounds[0])),
                    Line::from(time_label(x_bounds[1])),
                ])
                .style(Style::default().fg(AXIS)),
        )
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .labels(vec![
                    Line::from(format!("{:.2}", y_bounds[0])),
                    Line::from(format!("{:.2}", y_bounds[1])),
                ])
                .style(Style::default().fg(AXIS)),
        );

    f.render_widget(chart, area);
}

/// Axis bounds over every point, padded so flat series stay visible
fn bounds<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> Option<([f64; 2], [f64; 2])> {
    let mut x = [f64::MAX, f64::MIN];
    let mut y = [f64::MAX, f64::MIN];
    let mut any = false;

    for (px, py) in points {
        any = true;
        x = [x[0].min(*px), x[1].max(*px)];
        y = [y[0].min(*py), y[1].max(*py)];
    }
    if !any {
        return None;
    }

    if x[0] == x[1] {
        x = [x[0] - 60.0, x[1] + 60.0];
    }
    let pad = ((y[1] - y[0]) * 0.05).max(1e-6);
    Some((x, [y[0] - pad, y[1] + pad]))
}

fn time_label(epoch_secs: f64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_secs as i64, 0)
        .map(|time| time.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn pnl_line(label: &'static str, value: f64) -> Line<'static> {
    let color = if value >= 0.0 { BUY } else { SELL };
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(format!("{:+.4}", value), Style::default().fg(color)),
    ])
}

fn render_placeholder(f: &mut Frame, title: &str, message: &str, area: Rect) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
    .block(bordered(title));
    f.render_widget(paragraph, area);
}

fn panel_title(name: &str, stale: bool) -> String {
    if stale {
        format!(" {} (stale) ", name)
    } else {
        format!(" {} ", name)
    }
}

fn bordered(title: &str) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_pad_flat_series() {
        let points = [(100.0, 5.0), (100.0, 5.0)];
        let (x, y) = bounds(points.iter()).unwrap();

        assert!(x[0] < 100.0 && x[1] > 100.0);
        assert!(y[0] < 5.0 && y[1] > 5.0);
        assert!(bounds(std::iter::empty()).is_none());
    }

    #[test]
    fn test_panel_title_marks_stale() {
        assert_eq!(panel_title("STATS", false), " STATS ");
        assert_eq!(panel_title("STATS", true), " STATS (stale) ");
    }
}
