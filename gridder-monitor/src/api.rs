//! Read-only client for the Gridder dashboard backend.
//!
//! [`MonitorApi`] is the seam between the controller and the network; the
//! production implementation is [`HttpMonitorClient`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::selection::FetchParams;
use crate::types::{
    BotCatalog, BotRunDescriptor, BotRunsResponse, ConfigResponse, ConfigSnapshot,
    DefaultSelection, OptionsPnlPoint, PricePoint, SeriesResponse, StatsSnapshot, TotalPnlPoint,
    Trade, TradesResponse,
};

/// Backend endpoints (GET, JSON)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    BotCatalog,
    BotRuns,
    DefaultSelection,
    Trades,
    Stats,
    OptionsPnl,
    TotalPnl,
    PriceSeries,
    Config,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::BotCatalog => "/api/bot-names",
            Endpoint::BotRuns => "/api/bot-runs",
            Endpoint::DefaultSelection => "/api/latest-bot-run",
            Endpoint::Trades => "/api/trades",
            Endpoint::Stats => "/api/stats",
            Endpoint::OptionsPnl => "/api/options-pnl",
            Endpoint::TotalPnl => "/api/total-pnl",
            Endpoint::PriceSeries => "/api/price-data",
            Endpoint::Config => "/api/run-config",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Data source for the monitor
#[async_trait]
pub trait MonitorApi: Send + Sync {
    async fn bot_catalog(&self) -> Result<Vec<String>>;

    async fn bot_runs(&self, bot_name: &str) -> Result<Vec<BotRunDescriptor>>;

    async fn default_selection(&self) -> Result<DefaultSelection>;

    async fn trades(&self, params: &FetchParams) -> Result<Vec<Trade>>;

    async fn stats(&self, params: &FetchParams) -> Result<StatsSnapshot>;

    async fn options_pnl(&self, params: &FetchParams) -> Result<Vec<OptionsPnlPoint>>;

    async fn total_pnl(&self, params: &FetchParams) -> Result<Vec<TotalPnlPoint>>;

    async fn price_series(&self, params: &FetchParams) -> Result<Vec<PricePoint>>;

    async fn config(&self, bot_name: &str, bot_run: Option<&str>) -> Result<ConfigSnapshot>;
}

/// HTTP implementation of [`MonitorApi`]
#[derive(Debug, Clone)]
pub struct HttpMonitorClient {
    client: Client,
    base: Url,
}

impl HttpMonitorClient {
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MonitorError::Http {
                endpoint: config.api_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base: with_trailing_slash(config.api_url.clone()),
        })
    }

    /// Absolute URL for an endpoint, keeping any path prefix of the base URL
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        self.base
            .join(endpoint.path().trim_start_matches('/'))
            .map_err(|e| MonitorError::Http {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let url = self.endpoint_url(endpoint)?;
        let path = endpoint.path();
        debug!("GET {} {:?}", path, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| MonitorError::from_reqwest(path, e))?
            .error_for_status()
            .map_err(|e| MonitorError::from_reqwest(path, e))?;

        response
            .json::<T>()
            .await
            .map_err(|e| MonitorError::from_reqwest(path, e))
    }
}

#[async_trait]
impl MonitorApi for HttpMonitorClient {
    async fn bot_catalog(&self) -> Result<Vec<String>> {
        let catalog: BotCatalog = self.get_json(Endpoint::BotCatalog, &[]).await?;
        Ok(catalog.bots)
    }

    async fn bot_runs(&self, bot_name: &str) -> Result<Vec<BotRunDescriptor>> {
        let response: BotRunsResponse = self
            .get_json(Endpoint::BotRuns, &[("bot_name", bot_name.to_string())])
            .await?;
        Ok(response.runs)
    }

    async fn default_selection(&self) -> Result<DefaultSelection> {
        self.get_json(Endpoint::DefaultSelection, &[]).await
    }

    async fn trades(&self, params: &FetchParams) -> Result<Vec<Trade>> {
        let response: TradesResponse = self
            .get_json(Endpoint::Trades, &params.query_pairs())
            .await?;
        Ok(response.trades)
    }

    async fn stats(&self, params: &FetchParams) -> Result<StatsSnapshot> {
        self.get_json(Endpoint::Stats, &params.query_pairs()).await
    }

    async fn options_pnl(&self, params: &FetchParams) -> Result<Vec<OptionsPnlPoint>> {
        let response: SeriesResponse<OptionsPnlPoint> = self
            .get_json(Endpoint::OptionsPnl, &params.query_pairs())
            .await?;
        Ok(response.data)
    }

    async fn total_pnl(&self, params: &FetchParams) -> Result<Vec<TotalPnlPoint>> {
        let response: SeriesResponse<TotalPnlPoint> = self
            .get_json(Endpoint::TotalPnl, &params.query_pairs())
            .await?;
        Ok(response.data)
    }

    async fn price_series(&self, params: &FetchParams) -> Result<Vec<PricePoint>> {
        let response: SeriesResponse<PricePoint> = self
            .get_json(Endpoint::PriceSeries, &params.query_pairs())
            .await?;
        Ok(response.data)
    }

    async fn config(&self, bot_name: &str, bot_run: Option<&str>) -> Result<ConfigSnapshot> {
        let mut query = vec![("bot_name", bot_name.to_string())];
        if let Some(bot_run) = bot_run.filter(|run| !run.is_empty()) {
            query.push(("bot_run", bot_run.to_string()));
        }
        let response: ConfigResponse = self.get_json(Endpoint::Config, &query).await?;
        Ok(response.config)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
