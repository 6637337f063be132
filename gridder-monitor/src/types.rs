/// Core data types for the monitoring API
///
/// These types match the JSON responses served by the Gridder dashboard
/// backend (see `api::Endpoint` for the paths).

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Order side of an executed grid trade
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum Side {
    #[serde(rename = "BUY", alias = "Buy", alias = "buy")]
    Buy,
    #[serde(rename = "SELL", alias = "Sell", alias = "sell")]
    Sell,
}

impl Side {
    /// Convert to display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trade executed by a bot, received read-only
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Trade {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub bot_name: String,
}

/// Summary statistics for the current selection
///
/// Every numeric field falls back to zero when absent (or null) in the payload.
/// Trade counts also accept float-encoded integers such as `12.0`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StatsSnapshot {
    #[serde(default, deserialize_with = "de_count")]
    pub total_trades: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub buy_trades: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub sell_trades: u64,
    #[serde(default, deserialize_with = "de_null_default", alias = "unrealized_pnl")]
    pub spot_unrealized_pnl: f64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub options_unrealized_pnl: f64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub total_unrealized_pnl: f64,
    #[serde(default, deserialize_with = "de_null_default", alias = "realized_pnl")]
    pub spot_realized_pnl: f64,
    #[serde(default)]
    pub bot_name: Option<String>,
    #[serde(default)]
    pub bot_run: Option<String>,
}

/// Options leg PnL sample (calls and puts used as spot protection)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OptionsPnlPoint {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub call_unrealized_pnl: f64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub put_unrealized_pnl: f64,
}

/// Spot + options unrealized PnL sample
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TotalPnlPoint {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub total_unrealized_pnl: f64,
}

/// Traded pair price sample
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PricePoint {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// One identifiable execution of a bot
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BotRunDescriptor {
    pub bot_run: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Bot/run configuration, keys and size not fixed
pub type ConfigSnapshot = IndexMap<String, serde_json::Value>;

/// `GET /api/bot-names` - older deployments answer `{bots}`, newer `{bot_names}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotCatalog {
    #[serde(default, alias = "bot_names")]
    pub bots: Vec<String>,
}

/// `GET /api/bot-runs`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotRunsResponse {
    #[serde(default)]
    pub runs: Vec<BotRunDescriptor>,
}

/// `GET /api/latest-bot-run`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DefaultSelection {
    #[serde(default)]
    pub bot_name: Option<String>,
    #[serde(default)]
    pub bot_run: Option<String>,
}

/// `GET /api/trades`
#[derive(Debug, Clone, Deserialize)]
pub struct TradesResponse {
    pub trades: Vec<Trade>,
}

/// `GET /api/options-pnl`, `/api/total-pnl`, `/api/price-data`
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesResponse<T> {
    pub data: Vec<T>,
}

/// `GET /api/run-config`
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigResponse {
    pub config: ConfigSnapshot,
}

/// Accept RFC3339 timestamps as well as the naive ISO-8601 strings the backend
/// emits (interpreted as UTC).
pub fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Count {
    Integer(u64),
    Float(f64),
}

/// Counts computed by dataframe backends arrive as floats
fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Count>::deserialize(deserializer)? {
        Some(Count::Integer(count)) => count,
        // Saturating cast: negative and NaN become zero
        Some(Count::Float(count)) => count.round() as u64,
        None => 0,
    })
}
