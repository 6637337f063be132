//! Startup sequence: bot catalog, default selection and its runs.
//!
//! Every step tolerates an empty or failed response; the first refresh runs
//! regardless of what was resolved here.

use tracing::{info, warn};

use crate::api::MonitorApi;
use crate::types::BotRunDescriptor;

/// What the backend told us at startup
#[derive(Debug, Default)]
pub struct Bootstrap {
    pub bots: Vec<String>,
    /// Default bot, if the backend named one
    pub bot_name: Option<String>,
    /// Default run, adopted only when the backend returned one
    pub bot_run: Option<String>,
    /// Run catalog of the default bot
    pub runs: Vec<BotRunDescriptor>,
}

/// Resolve the initial selection.
pub async fn resolve(api: &dyn MonitorApi) -> Bootstrap {
    let mut bootstrap = Bootstrap::default();

    match api.bot_catalog().await {
        Ok(bots) if bots.is_empty() => warn!("Bot catalog is empty"),
        Ok(bots) => {
            info!("Bot catalog: {} bot(s)", bots.len());
            bootstrap.bots = bots;
        }
        Err(error) => warn!("Failed to load bot catalog: {}", error),
    }

    let default = match api.default_selection().await {
        Ok(default) => default,
        Err(error) => {
            warn!("Failed to load default selection: {}", error);
            return bootstrap;
        }
    };

    let Some(bot_name) = default.bot_name.filter(|name| !name.is_empty()) else {
        info!("Backend returned no default bot");
        return bootstrap;
    };

    bootstrap.runs = match api.bot_runs(&bot_name).await {
        Ok(runs) => runs,
        Err(error) => {
            warn!("Failed to load runs for {}: {}", bot_name, error);
            Vec::new()
        }
    };
    bootstrap.bot_run = default.bot_run.filter(|run| !run.is_empty());

    info!(
        "Default selection: bot {} run {}",
        bot_name,
        bootstrap.bot_run.as_deref().unwrap_or("(none)")
    );
    bootstrap.bot_name = Some(bot_name);
    bootstrap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MonitorError, Result};
    use crate::selection::FetchParams;
    use crate::types::{
        ConfigSnapshot, DefaultSelection, OptionsPnlPoint, PricePoint, StatsSnapshot,
        TotalPnlPoint, Trade,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CatalogApi {
        bots: Vec<String>,
        default: Option<DefaultSelection>,
        config_calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl MonitorApi for CatalogApi {
        async fn bot_catalog(&self) -> Result<Vec<String>> {
            Ok(self.bots.clone())
        }

        async fn bot_runs(&self, _bot_name: &str) -> Result<Vec<BotRunDescriptor>> {
            Ok(vec![BotRunDescriptor {
                bot_run: "run-1".to_string(),
                timestamp: Utc::now(),
            }])
        }

        async fn default_selection(&self) -> Result<DefaultSelection> {
            self.default.clone().ok_or(MonitorError::Status {
                endpoint: "/api/latest-bot-run".to_string(),
                status: 404,
            })
        }

        async fn trades(&self, _params: &FetchParams) -> Result<Vec<Trade>> {
            Ok(Vec::new())
        }

        async fn stats(&self, _params: &FetchParams) -> Result<StatsSnapshot> {
            Ok(StatsSnapshot::default())
        }

        async fn options_pnl(&self, _params: &FetchParams) -> Result<Vec<OptionsPnlPoint>> {
            Ok(Vec::new())
        }

        async fn total_pnl(&self, _params: &FetchParams) -> Result<Vec<TotalPnlPoint>> {
            Ok(Vec::new())
        }

        async fn price_series(&self, _params: &FetchParams) -> Result<Vec<PricePoint>> {
            Ok(Vec::new())
        }

        async fn config(&self, bot_name: &str, bot_run: Option<&str>) -> Result<ConfigSnapshot> {
            self.config_calls
                .lock()
                .unwrap()
                .push((bot_name.to_string(), bot_run.map(str::to_string)));
            Ok(ConfigSnapshot::new())
        }
    }

    #[tokio::test]
    async fn test_default_bot_without_run() {
        let api = CatalogApi {
            bots: vec!["bot1".to_string(), "bot2".to_string()],
            default: Some(DefaultSelection {
                bot_name: Some("bot1".to_string()),
                bot_run: None,
            }),
            ..Default::default()
        };

        let bootstrap = resolve(&api).await;

        assert_eq!(bootstrap.bots.len(), 2);
        assert_eq!(bootstrap.bot_name.as_deref(), Some("bot1"));
        assert!(bootstrap.bot_run.is_none());
        assert_eq!(bootstrap.runs.len(), 1);
        assert!(api.config_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_bot_with_run() {
        let api = CatalogApi {
            bots: vec!["bot1".to_string()],
            default: Some(DefaultSelection {
                bot_name: Some("bot1".to_string()),
                bot_run: Some("run-1".to_string()),
            }),
            ..Default::default()
        };

        let bootstrap = resolve(&api).await;

        assert_eq!(bootstrap.bot_run.as_deref(), Some("run-1"));
        // The controller loads config off the startup path
        assert!(api.config_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_catalog_and_missing_default() {
        let api = CatalogApi::default();

        let bootstrap = resolve(&api).await;

        assert!(bootstrap.bots.is_empty());
        assert!(bootstrap.bot_name.is_none());
        assert!(api.config_calls.lock().unwrap().is_empty());
    }
}
