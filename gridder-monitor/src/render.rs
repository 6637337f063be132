/// Render pipeline: one pure stage per dashboard panel
///
/// Every stage maps one payload to a complete [`Panel`] value. The [`Dashboard`]
/// swaps panels wholesale; a failed fetch never clears a panel, it only marks
/// the last-known value stale.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::Result;
use crate::fetch::{Payload, Source};
use crate::types::{
    ConfigSnapshot, OptionsPnlPoint, PricePoint, Side, StatsSnapshot, TotalPnlPoint, Trade,
};

/// Rows shown in the recent-trades table
pub const RECENT_TRADES_LIMIT: usize = 10;

pub const NO_TRADES: &str = "No trades for this selection";
pub const NO_OPTIONS_PNL: &str = "No options PnL data";
pub const NO_TOTAL_PNL: &str = "No total PnL data";
pub const NO_PRICE_DATA: &str = "No price data";
pub const NO_CONFIG: &str = "No configuration for this selection";
pub const SELECT_BOT_FOR_CONFIG: &str = "Select a bot to view its configuration";
pub const SELECT_RUN_FOR_CONFIG: &str = "Select a run to view its configuration";
pub const LOADING: &str = "Loading...";
/// A panel whose request failed before it ever loaded
pub const REQUEST_FAILED: &str = "No data (request failed)";

/// Shown for absent categorical values
pub const MISSING: &str = "--";

/// `(unix seconds, value)` pairs, the shape ratatui datasets take
pub type Points = Vec<(f64, f64)>;

#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    Placeholder(&'static str),
    Ready(T),
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            Panel::Placeholder(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Panel::Placeholder(_))
    }
}

/// A panel plus whether its last refresh failed
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState<T> {
    pub panel: Panel<T>,
    pub stale: bool,
}

impl<T> PanelState<T> {
    fn loading() -> Self {
        Self {
            panel: Panel::Placeholder(LOADING),
            stale: false,
        }
    }

    fn replace(&mut self, panel: Panel<T>) {
        self.panel = panel;
        self.stale = false;
    }

    fn mark_stale(&mut self) {
        if matches!(self.panel, Panel::Placeholder(text) if text == LOADING) {
            self.panel = Panel::Placeholder(REQUEST_FAILED);
        }
        self.stale = true;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradePoints {
    pub buys: Points,
    pub sells: Points,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub bot_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsCards {
    pub total_trades: u64,
    pub buy_trades: u64,
    pub sell_trades: u64,
    pub spot_unrealized_pnl: f64,
    pub options_unrealized_pnl: f64,
    pub total_unrealized_pnl: f64,
    pub spot_realized_pnl: f64,
    pub bot_name: String,
    pub bot_run: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsSeries {
    pub call: Points,
    pub put: Points,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRow {
    pub key: String,
    pub value: String,
}

/// Everything the UI draws, one field per panel
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub trades_chart: PanelState<TradePoints>,
    pub recent_trades: PanelState<Vec<TradeRow>>,
    pub stats: PanelState<StatsCards>,
    pub options_pnl: PanelState<OptionsSeries>,
    pub total_pnl: PanelState<Points>,
    pub price: PanelState<Points>,
    pub config: PanelState<Vec<ConfigRow>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            trades_chart: PanelState::loading(),
            recent_trades: PanelState::loading(),
            stats: PanelState::loading(),
            options_pnl: PanelState::loading(),
            total_pnl: PanelState::loading(),
            price: PanelState::loading(),
            config: PanelState {
                panel: Panel::Placeholder(SELECT_BOT_FOR_CONFIG),
                stale: false,
            },
            last_updated: None,
        }
    }
}

impl Dashboard {
    /// Route one settled request to its stage(s).
    pub fn apply(&mut self, source: Source, result: Result<Payload>) {
        match result {
            Ok(Payload::Trades(trades)) => {
                self.trades_chart.replace(trades_chart(&trades));
                self.recent_trades.replace(recent_trades(&trades));
            }
            Ok(Payload::Stats(stats)) => self.stats.replace(stats_cards(&stats)),
            Ok(Payload::OptionsPnl(points)) => self.options_pnl.replace(options_pnl(&points)),
            Ok(Payload::TotalPnl(points)) => self.total_pnl.replace(total_pnl(&points)),
            Ok(Payload::PriceSeries(points)) => self.price.replace(price_series(&points)),
            Err(_) => self.mark_stale(source),
        }
    }

    pub fn mark_stale(&mut self, source: Source) {
        match source {
            Source::Trades => {
                self.trades_chart.mark_stale();
                self.recent_trades.mark_stale();
            }
            Source::Stats => self.stats.mark_stale(),
            Source::OptionsPnl => self.options_pnl.mark_stale(),
            Source::TotalPnl => self.total_pnl.mark_stale(),
            Source::PriceSeries => self.price.mark_stale(),
        }
    }

    pub fn apply_config(&mut self, result: Result<ConfigSnapshot>) {
        match result {
            Ok(config) => self.config.replace(config_rows(&config)),
            Err(_) => self.config.mark_stale(),
        }
    }

    pub fn clear_config(&mut self) {
        self.config.replace(Panel::Placeholder(SELECT_BOT_FOR_CONFIG));
    }

    /// Config requires a run; nothing is requested until one is selected
    pub fn await_run_for_config(&mut self) {
        self.config.replace(Panel::Placeholder(SELECT_RUN_FOR_CONFIG));
    }

    /// Forget the previous selection's config while the new one loads
    pub fn reset_config(&mut self) {
        self.config = PanelState::loading();
    }

    /// Forget the previous bot's data. Config is reset separately.
    pub fn reset_panels(&mut self) {
        self.trades_chart = PanelState::loading();
        self.recent_trades = PanelState::loading();
        self.stats = PanelState::loading();
        self.options_pnl = PanelState::loading();
        self.total_pnl = PanelState::loading();
        self.price = PanelState::loading();
    }

    pub fn mark_updated(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }
}

/// BUY/SELL scatter points
pub fn trades_chart(trades: &[Trade]) -> Panel<TradePoints> {
    if trades.is_empty() {
        return Panel::Placeholder(NO_TRADES);
    }

    let (buys, sells): (Vec<&Trade>, Vec<&Trade>) =
        trades.iter().partition(|trade| trade.side.is_buy());

    Panel::Ready(TradePoints {
        buys: buys.into_iter().map(trade_point).collect(),
        sells: sells.into_iter().map(trade_point).collect(),
    })
}

/// Most recent [`RECENT_TRADES_LIMIT`] trades, newest first
pub fn recent_trades(trades: &[Trade]) -> Panel<Vec<TradeRow>> {
    if trades.is_empty() {
        return Panel::Placeholder(NO_TRADES);
    }

    let mut sorted: Vec<&Trade> = trades.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Panel::Ready(
        sorted
            .into_iter()
            .take(RECENT_TRADES_LIMIT)
            .map(|trade| TradeRow {
                timestamp: trade.timestamp,
                side: trade.side,
                price: trade.price,
                quantity: trade.quantity,
                bot_name: trade.bot_name.clone(),
            })
            .collect(),
    )
}

pub fn stats_cards(stats: &StatsSnapshot) -> Panel<StatsCards> {
    let categorical = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or(MISSING)
            .to_string()
    };

    Panel::Ready(StatsCards {
        total_trades: stats.total_trades,
        buy_trades: stats.buy_trades,
        sell_trades: stats.sell_trades,
        spot_unrealized_pnl: stats.spot_unrealized_pnl,
        options_unrealized_pnl: stats.options_unrealized_pnl,
        total_unrealized_pnl: stats.total_unrealized_pnl,
        spot_realized_pnl: stats.spot_realized_pnl,
        bot_name: categorical(&stats.bot_name),
        bot_run: categorical(&stats.bot_run),
    })
}

pub fn options_pnl(points: &[OptionsPnlPoint]) -> Panel<OptionsSeries> {
    if points.is_empty() {
        return Panel::Placeholder(NO_OPTIONS_PNL);
    }

    Panel::Ready(OptionsSeries {
        call: points
            .iter()
            .map(|point| (epoch_secs(&point.timestamp), point.call_unrealized_pnl))
            .collect(),
        put: points
            .iter()
            .map(|point| (epoch_secs(&point.timestamp), point.put_unrealized_pnl))
            .collect(),
    })
}

pub fn total_pnl(points: &[TotalPnlPoint]) -> Panel<Points> {
    if points.is_empty() {
        return Panel::Placeholder(NO_TOTAL_PNL);
    }

    Panel::Ready(
        points
            .iter()
            .map(|point| (epoch_secs(&point.timestamp), point.total_unrealized_pnl))
            .collect(),
    )
}

pub fn price_series(points: &[PricePoint]) -> Panel<Points> {
    if points.is_empty() {
        return Panel::Placeholder(NO_PRICE_DATA);
    }

    Panel::Ready(
        points
            .iter()
            .map(|point| (epoch_secs(&point.timestamp), point.price))
            .collect(),
    )
}

/// Key/value rows in backend order
pub fn config_rows(config: &ConfigSnapshot) -> Panel<Vec<ConfigRow>> {
    if config.is_empty() {
        return Panel::Placeholder(NO_CONFIG);
    }

    Panel::Ready(
        config
            .iter()
            .map(|(key, value)| ConfigRow {
                key: key.clone(),
                value: format_config_value(value),
            })
            .collect(),
    )
}

fn format_config_value(value: &Value) -> String {
    match value {
        Value::Null => MISSING.to_string(),
        Value::String(text) => text.clone(),
        // Numbers, booleans, and nested values as compact JSON
        other => other.to_string(),
    }
}

fn trade_point(trade: &Trade) -> (f64, f64) {
    (
        epoch_secs(&trade.timestamp),
        trade.price.to_f64().unwrap_or_default(),
    )
}

fn epoch_secs(timestamp: &DateTime<Utc>) -> f64 {
    timestamp.timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn trade(seconds: i64, side: Side, price: Decimal) -> Trade {
        Trade {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds),
            side,
            price,
            quantity: dec!(0.1),
            bot_name: "bot1".to_string(),
        }
    }

    #[test]
    fn test_empty_trades_render_placeholders() {
        assert_eq!(trades_chart(&[]), Panel::Placeholder(NO_TRADES));
        assert_eq!(recent_trades(&[]), Panel::Placeholder(NO_TRADES));
    }

    #[test]
    fn test_one_buy_one_sell() {
        let trades = vec![
            trade(0, Side::Buy, dec!(100)),
            trade(60, Side::Sell, dec!(101)),
        ];

        let points = trades_chart(&trades);
        let points = points.ready().unwrap();

        assert_eq!(points.buys.len(), 1);
        assert_eq!(points.sells.len(), 1);
        assert_eq!(points.buys[0].1, 100.0);
        assert_eq!(points.sells[0].1, 101.0);
        assert_eq!(points.sells[0].0 - points.buys[0].0, 60.0);
    }

    #[test]
    fn test_recent_trades_newest_ten() {
        // Delivered oldest first, as the backend does
        let trades: Vec<Trade> = (0..15)
            .map(|index| trade(index, Side::Buy, Decimal::from(100 + index)))
            .collect();

        let rows = recent_trades(&trades);
        let rows = rows.ready().unwrap();

        assert_eq!(rows.len(), RECENT_TRADES_LIMIT);
        let prices: Vec<Decimal> = rows.iter().map(|row| row.price).collect();
        let expected: Vec<Decimal> = (5..15).rev().map(|index| Decimal::from(100 + index)).collect();
        assert_eq!(prices, expected);
    }

    #[test]
    fn test_stats_cards_defaults() {
        let cards = stats_cards(&StatsSnapshot::default());
        let cards = cards.ready().unwrap();

        assert_eq!(cards.total_trades, 0);
        assert_eq!(cards.total_unrealized_pnl, 0.0);
        assert_eq!(cards.bot_name, MISSING);
        assert_eq!(cards.bot_run, MISSING);
    }

    #[test]
    fn test_config_rows_format_values() {
        let config: ConfigSnapshot = serde_json::from_str(
            r#"{"symbol":"BTCFDUSD","grid_levels":20,"hedge":{"put_delta":0.25},"note":null}"#,
        )
        .unwrap();

        let rows = config_rows(&config);
        let values: Vec<(&str, &str)> = rows
            .ready()
            .unwrap()
            .iter()
            .map(|row| (row.key.as_str(), row.value.as_str()))
            .collect();

        assert_eq!(
            values,
            vec![
                ("symbol", "BTCFDUSD"),
                ("grid_levels", "20"),
                ("hedge", r#"{"put_delta":0.25}"#),
                ("note", MISSING),
            ]
        );
        assert_eq!(config_rows(&ConfigSnapshot::new()), Panel::Placeholder(NO_CONFIG));
    }

    #[test]
    fn test_failed_fetch_keeps_last_known_panel() {
        let mut dashboard = Dashboard::default();
        dashboard.apply(
            Source::PriceSeries,
            Ok(Payload::PriceSeries(vec![PricePoint {
                timestamp: Utc::now(),
                price: 64_000.0,
            }])),
        );
        let before = dashboard.price.panel.clone();

        dashboard.apply(
            Source::PriceSeries,
            Err(MonitorError::Status {
                endpoint: "/api/price-data".to_string(),
                status: 502,
            }),
        );

        assert_eq!(dashboard.price.panel, before);
        assert!(dashboard.price.stale);

        dashboard.apply(Source::PriceSeries, Ok(Payload::PriceSeries(Vec::new())));
        assert_eq!(dashboard.price.panel, Panel::Placeholder(NO_PRICE_DATA));
        assert!(!dashboard.price.stale);
    }

    #[test]
    fn test_trades_failure_marks_chart_and_table() {
        let mut dashboard = Dashboard::default();
        dashboard.mark_stale(Source::Trades);

        assert!(dashboard.trades_chart.stale);
        assert!(dashboard.recent_trades.stale);
        assert!(!dashboard.stats.stale);
    }

    #[test]
    fn test_first_fetch_failure_replaces_loading() {
        let mut dashboard = Dashboard::default();
        dashboard.apply(
            Source::Stats,
            Err(MonitorError::Status {
                endpoint: "/api/stats".to_string(),
                status: 500,
            }),
        );
        dashboard.apply_config(Err(MonitorError::Status {
            endpoint: "/api/run-config".to_string(),
            status: 400,
        }));

        assert_eq!(dashboard.stats.panel, Panel::Placeholder(REQUEST_FAILED));
        assert!(dashboard.stats.stale);
        // Not a LOADING placeholder, left as is
        assert_eq!(dashboard.config.panel, Panel::Placeholder(SELECT_BOT_FOR_CONFIG));
        assert!(dashboard.config.stale);
        assert_eq!(dashboard.price.panel, Panel::Placeholder(LOADING));

        dashboard.reset_config();
        dashboard.apply_config(Err(MonitorError::Status {
            endpoint: "/api/run-config".to_string(),
            status: 502,
        }));
        assert_eq!(dashboard.config.panel, Panel::Placeholder(REQUEST_FAILED));
    }

    #[test]
    fn test_reset_panels_drops_previous_bot_data() {
        let mut dashboard = Dashboard::default();
        dashboard.apply(Source::Trades, Ok(Payload::Trades(vec![trade(0, Side::Buy, dec!(100))])));
        dashboard.apply(Source::TotalPnl, Ok(Payload::TotalPnl(Vec::new())));
        dashboard.apply_config(Ok(ConfigSnapshot::new()));
        assert!(dashboard.trades_chart.panel.ready().is_some());

        dashboard.reset_panels();

        assert_eq!(dashboard.trades_chart.panel, Panel::Placeholder(LOADING));
        assert_eq!(dashboard.recent_trades.panel, Panel::Placeholder(LOADING));
        assert_eq!(dashboard.total_pnl.panel, Panel::Placeholder(LOADING));
        assert_eq!(dashboard.config.panel, Panel::Placeholder(NO_CONFIG));
    }
}
