//! Concurrent refresh of the five filtered data sources.
//!
//! A refresh freezes the selection into [`FetchParams`], tags it with a
//! generation and issues every request at once. Each request settles on its own
//! and is forwarded as a [`FetchOutcome`] the moment it completes; a single
//! [`BatchReport`] follows once all of them have settled.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{Endpoint, MonitorApi};
use crate::error::{MonitorError, Result};
use crate::selection::FetchParams;
use crate::types::{OptionsPnlPoint, PricePoint, StatsSnapshot, TotalPnlPoint, Trade};

/// Filtered data source refreshed on every cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Trades,
    Stats,
    OptionsPnl,
    TotalPnl,
    PriceSeries,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Trades,
        Source::Stats,
        Source::OptionsPnl,
        Source::TotalPnl,
        Source::PriceSeries,
    ];

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Source::Trades => Endpoint::Trades,
            Source::Stats => Endpoint::Stats,
            Source::OptionsPnl => Endpoint::OptionsPnl,
            Source::TotalPnl => Endpoint::TotalPnl,
            Source::PriceSeries => Endpoint::PriceSeries,
        }
    }
}

/// Decoded response of one source
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Trades(Vec<Trade>),
    Stats(StatsSnapshot),
    OptionsPnl(Vec<OptionsPnlPoint>),
    TotalPnl(Vec<TotalPnlPoint>),
    PriceSeries(Vec<PricePoint>),
}

/// Result of a single request within a batch
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub source: Source,
    pub result: Result<Payload>,
}

/// Emitted once per batch after every request has settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub generation: u64,
    pub failed: Vec<Source>,
}

impl BatchReport {
    pub fn all_failed(&self) -> bool {
        self.failed.len() == Source::ALL.len()
    }
}

#[derive(Debug)]
pub enum FetchMessage {
    Outcome(FetchOutcome),
    Settled(BatchReport),
}

/// Dispatches refresh batches and tracks the latest generation
pub struct DataFetchCoordinator {
    api: Arc<dyn MonitorApi>,
    generation: u64,
    tx: mpsc::UnboundedSender<FetchMessage>,
}

impl DataFetchCoordinator {
    pub fn new(api: Arc<dyn MonitorApi>, tx: mpsc::UnboundedSender<FetchMessage>) -> Self {
        Self {
            api,
            generation: 0,
            tx,
        }
    }

    /// Latest dispatched generation (0 before the first refresh)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Spawn a batch for `params`, superseding any batch still in flight.
    /// Returns the new generation.
    pub fn refresh(&mut self, params: FetchParams) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        debug!("Refresh {} dispatched: {:?}", generation, params);

        tokio::spawn(run_batch(
            Arc::clone(&self.api),
            params,
            generation,
            self.tx.clone(),
        ));
        generation
    }
}

/// Issue the five filtered requests concurrently and report each as it lands.
///
/// Never fails: every error is logged and turned into a failed outcome for its
/// own source.
pub async fn run_batch(
    api: Arc<dyn MonitorApi>,
    params: FetchParams,
    generation: u64,
    tx: mpsc::UnboundedSender<FetchMessage>,
) -> BatchReport {
    let api = api.as_ref();
    let params = &params;

    let settled = futures::join!(
        load(Source::Trades, generation, &tx, async {
            api.trades(params).await.map(Payload::Trades)
        }),
        load(Source::Stats, generation, &tx, async {
            api.stats(params).await.map(Payload::Stats)
        }),
        load(Source::OptionsPnl, generation, &tx, async {
            api.options_pnl(params).await.map(Payload::OptionsPnl)
        }),
        load(Source::TotalPnl, generation, &tx, async {
            api.total_pnl(params).await.map(Payload::TotalPnl)
        }),
        load(Source::PriceSeries, generation, &tx, async {
            api.price_series(params).await.map(Payload::PriceSeries)
        }),
    );

    let failed: Vec<Source> = [settled.0, settled.1, settled.2, settled.3, settled.4]
        .into_iter()
        .filter_map(|outcome| outcome.err())
        .collect();

    let report = BatchReport { generation, failed };
    if report.failed.is_empty() {
        debug!("Refresh {} settled", generation);
    } else {
        warn!(
            "Refresh {} settled with {} failed source(s): {:?}",
            generation,
            report.failed.len(),
            report.failed
        );
    }

    if tx.send(FetchMessage::Settled(report.clone())).is_err() {
        debug!("Controller gone, dropping report for refresh {}", generation);
    }
    report
}

/// Await one request, log its failure, forward the outcome.
/// Returns `Err(source)` if the request failed.
async fn load<F>(
    source: Source,
    generation: u64,
    tx: &mpsc::UnboundedSender<FetchMessage>,
    request: F,
) -> std::result::Result<(), Source>
where
    F: Future<Output = Result<Payload>>,
{
    let result = request.await;
    let failed = match &result {
        Ok(_) => false,
        Err(error) => {
            log_failure(source, generation, error);
            true
        }
    };

    let outcome = FetchOutcome {
        generation,
        source,
        result,
    };
    if tx.send(FetchMessage::Outcome(outcome)).is_err() {
        debug!("Controller gone, dropping {:?} outcome", source);
    }

    if failed {
        Err(source)
    } else {
        Ok(())
    }
}

fn log_failure(source: Source, generation: u64, error: &MonitorError) {
    if error.is_transient() {
        warn!(
            "Refresh {}: {} unavailable: {}",
            generation,
            source.endpoint(),
            error
        );
    } else {
        warn!(
            "Refresh {}: {} rejected: {}",
            generation,
            source.endpoint(),
            error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BotRunDescriptor, ConfigSnapshot, DefaultSelection};
    use async_trait::async_trait;
    use chrono::Utc;

    /// Serves a single price point; every other filtered source fails
    struct OnlyPriceApi;

    fn down(endpoint: Endpoint) -> MonitorError {
        MonitorError::Http {
            endpoint: endpoint.to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[async_trait]
    impl MonitorApi for OnlyPriceApi {
        async fn bot_catalog(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn bot_runs(&self, _bot_name: &str) -> Result<Vec<BotRunDescriptor>> {
            Ok(Vec::new())
        }

        async fn default_selection(&self) -> Result<DefaultSelection> {
            Ok(DefaultSelection::default())
        }

        async fn trades(&self, _params: &FetchParams) -> Result<Vec<Trade>> {
            Err(down(Endpoint::Trades))
        }

        async fn stats(&self, _params: &FetchParams) -> Result<StatsSnapshot> {
            Err(MonitorError::Status {
                endpoint: Endpoint::Stats.to_string(),
                status: 500,
            })
        }

        async fn options_pnl(&self, _params: &FetchParams) -> Result<Vec<OptionsPnlPoint>> {
            Err(MonitorError::Decode {
                endpoint: Endpoint::OptionsPnl.to_string(),
                message: "missing field `data`".to_string(),
            })
        }

        async fn total_pnl(&self, _params: &FetchParams) -> Result<Vec<TotalPnlPoint>> {
            Err(down(Endpoint::TotalPnl))
        }

        async fn price_series(&self, _params: &FetchParams) -> Result<Vec<PricePoint>> {
            Ok(vec![PricePoint {
                timestamp: Utc::now(),
                price: 64_000.0,
            }])
        }

        async fn config(&self, _bot_name: &str, _bot_run: Option<&str>) -> Result<ConfigSnapshot> {
            Ok(ConfigSnapshot::new())
        }
    }

    #[tokio::test]
    async fn test_batch_settles_when_all_but_one_fail() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = run_batch(Arc::new(OnlyPriceApi), FetchParams::default(), 7, tx).await;

        assert_eq!(report.generation, 7);
        assert_eq!(
            report.failed,
            vec![
                Source::Trades,
                Source::Stats,
                Source::OptionsPnl,
                Source::TotalPnl
            ]
        );
        assert!(!report.all_failed());

        let mut outcomes = Vec::new();
        let mut settled = None;
        while let Ok(message) = rx.try_recv() {
            match message {
                FetchMessage::Outcome(outcome) => {
                    assert!(settled.is_none(), "outcome after batch report");
                    outcomes.push(outcome);
                }
                FetchMessage::Settled(report) => settled = Some(report),
            }
        }

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|outcome| outcome.generation == 7));
        let price = outcomes
            .iter()
            .find(|outcome| outcome.source == Source::PriceSeries)
            .unwrap();
        assert!(matches!(&price.result, Ok(Payload::PriceSeries(points)) if points.len() == 1));
        assert_eq!(settled, Some(report));
    }

    #[tokio::test]
    async fn test_refresh_increments_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut coordinator = DataFetchCoordinator::new(Arc::new(OnlyPriceApi), tx);
        assert_eq!(coordinator.generation(), 0);

        let first = coordinator.refresh(FetchParams::default());
        let second = coordinator.refresh(FetchParams::default());

        assert_eq!((first, second), (1, 2));
        assert!(!coordinator.is_current(first));
        assert!(coordinator.is_current(second));

        let mut reports = Vec::new();
        while reports.len() < 2 {
            if let Some(FetchMessage::Settled(report)) = rx.recv().await {
                reports.push(report.generation);
            }
        }
        reports.sort();
        assert_eq!(reports, vec![1, 2]);
    }

    #[test]
    fn test_source_endpoints() {
        let paths: Vec<&str> = Source::ALL
            .iter()
            .map(|source| source.endpoint().path())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/api/trades",
                "/api/stats",
                "/api/options-pnl",
                "/api/total-pnl",
                "/api/price-data"
            ]
        );
    }
}
