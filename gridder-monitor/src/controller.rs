//! The monitor controller.
//!
//! [`Controller`] is a single task that owns the selection, the refresh timer
//! and the dashboard. It is the only writer of all three. Control events,
//! timer ticks and fetch results reach it over mpsc channels; the rendered
//! state is published to the UI as a [`DashboardSnapshot`] over a watch channel.
//!
//! Only the run catalog reload is awaited in line. Refreshes and config loads
//! run on their own tasks and report back over channels.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

use crate::api::{Endpoint, MonitorApi};
use crate::bootstrap;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::fetch::{BatchReport, DataFetchCoordinator, FetchMessage};
use crate::render::Dashboard;
use crate::scheduler::{RefreshScheduler, SchedulerState, Tick};
use crate::selection::{reduce, ControlEvent, Controls, Effect};
use crate::types::ConfigSnapshot;

/// Backend health as seen by the last settled refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Health {
    /// No refresh has settled yet
    #[default]
    Unknown,
    Ok,
    Degraded {
        failed: usize,
    },
    Down,
}

impl Health {
    fn from_report(report: &BatchReport) -> Self {
        if report.failed.is_empty() {
            Health::Ok
        } else if report.all_failed() {
            Health::Down
        } else {
            Health::Degraded {
                failed: report.failed.len(),
            }
        }
    }
}

/// Read-only view published after every controller step
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub dashboard: Dashboard,
    pub controls: Controls,
    pub scheduler: SchedulerState,
    pub health: Health,
    /// Generation of the latest dispatched refresh
    pub generation: u64,
    /// Latest refresh has not settled yet
    pub refreshing: bool,
}

/// Config response for the selection it was requested for
#[derive(Debug)]
struct ConfigLoaded {
    bot_name: String,
    bot_run: String,
    result: Result<ConfigSnapshot>,
}

/// UI side of the controller
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<ControlEvent>,
    snapshots: watch::Receiver<DashboardSnapshot>,
}

impl ControllerHandle {
    /// Queue a control event. Returns `false` if the controller has stopped.
    pub fn send(&self, event: ControlEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }
}

pub struct Controller {
    api: Arc<dyn MonitorApi>,
    config: MonitorConfig,
    controls: Controls,
    dashboard: Dashboard,
    health: Health,
    refreshing: bool,
    scheduler: RefreshScheduler,
    fetcher: DataFetchCoordinator,
    /// Deadline of a pending debounced timer restart
    restart_at: Option<Instant>,
    events_rx: mpsc::UnboundedReceiver<ControlEvent>,
    ticks_rx: mpsc::UnboundedReceiver<Tick>,
    fetch_rx: mpsc::UnboundedReceiver<FetchMessage>,
    config_tx: mpsc::UnboundedSender<ConfigLoaded>,
    config_rx: mpsc::UnboundedReceiver<ConfigLoaded>,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
}

impl Controller {
    /// Build the controller and its handle. Arms the refresh timer if auto-refresh
    /// is enabled, so this must run inside a tokio runtime.
    pub fn new(api: Arc<dyn MonitorApi>, config: MonitorConfig) -> (Self, ControllerHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let (config_tx, config_rx) = mpsc::unbounded_channel();

        let controls = Controls::new(config.refresh);
        let scheduler = RefreshScheduler::new(config.refresh, ticks_tx);
        let fetcher = DataFetchCoordinator::new(Arc::clone(&api), fetch_tx);
        let dashboard = Dashboard::default();

        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot {
            dashboard: dashboard.clone(),
            controls: controls.clone(),
            scheduler: scheduler.state(),
            health: Health::Unknown,
            generation: 0,
            refreshing: false,
        });

        let controller = Self {
            api,
            config,
            controls,
            dashboard,
            health: Health::Unknown,
            refreshing: false,
            scheduler,
            fetcher,
            restart_at: None,
            events_rx,
            ticks_rx,
            fetch_rx,
            config_tx,
            config_rx,
            snapshot_tx,
        };
        let handle = ControllerHandle {
            events: events_tx,
            snapshots: snapshot_rx,
        };

        (controller, handle)
    }

    /// Spawn a controller on the current runtime.
    pub fn spawn(
        api: Arc<dyn MonitorApi>,
        config: MonitorConfig,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (controller, handle) = Self::new(api, config);
        (handle, tokio::spawn(controller.run()))
    }

    /// Bootstrap, then process messages until every [`ControllerHandle`] is dropped.
    pub async fn run(mut self) {
        self.bootstrap().await;
        self.publish();

        loop {
            let restart_at = self.restart_at;

            tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Control channel closed, controller stopping");
                        break;
                    }
                },
                Some(tick) = self.ticks_rx.recv() => self.handle_tick(tick),
                Some(message) = self.fetch_rx.recv() => self.handle_fetch(message),
                Some(loaded) = self.config_rx.recv() => self.handle_config(loaded),
                _ = sleep_until(restart_at.unwrap_or_else(Instant::now)), if restart_at.is_some() => {
                    self.restart_at = None;
                    self.scheduler.restart(self.controls.refresh);
                }
            }

            self.publish();
        }

        self.scheduler.stop();
    }

    async fn bootstrap(&mut self) {
        let resolved = bootstrap::resolve(self.api.as_ref()).await;

        self.controls.load_bots(resolved.bots);
        if let Some(bot_name) = resolved.bot_name {
            self.controls.selection.bot_name = bot_name.clone();
            self.controls.load_runs(&bot_name, resolved.runs);
            if let Some(bot_run) = resolved.bot_run {
                self.controls.selection.bot_run = bot_run;
            }
        }
        self.refresh();
        self.load_config();
    }

    async fn handle_event(&mut self, event: ControlEvent) {
        debug!("Control event: {:?}", event);
        let bot_changed = matches!(&event, ControlEvent::SetBotName(_));

        let effects = reduce(&mut self.controls, event);
        if bot_changed {
            if self.controls.selection.bot_name.is_empty() {
                self.dashboard.clear_config();
            } else {
                self.dashboard.reset_panels();
                self.dashboard.reset_config();
            }
        }

        for effect in effects {
            self.execute(effect).await;
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::ReloadRuns => self.reload_runs().await,
            Effect::LoadConfig => self.load_config(),
            Effect::Refresh => self.refresh(),
            Effect::RestartScheduler => self.schedule_restart(),
        }
    }

    /// Reload the run catalog of the selected bot, bounded by the request timeout.
    /// The run selector stays disabled until this completes.
    async fn reload_runs(&mut self) {
        let bot_name = self.controls.selection.bot_name.clone();
        self.publish();

        let runs = match timeout(self.config.request_timeout, self.api.bot_runs(&bot_name)).await {
            Ok(Ok(runs)) => runs,
            Ok(Err(error)) => {
                warn!("Failed to reload runs for {}: {}", bot_name, error);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Run reload for {} timed out after {:?}",
                    bot_name, self.config.request_timeout
                );
                Vec::new()
            }
        };

        debug!("Loaded {} run(s) for {}", runs.len(), bot_name);
        if !self.controls.load_runs(&bot_name, runs) {
            debug!("Discarded run catalog for previously selected bot {}", bot_name);
        }
        self.publish();
    }

    /// Request the config of the selected bot/run on a separate task. The
    /// backend only serves config for a concrete run.
    fn load_config(&mut self) {
        let selection = &self.controls.selection;
        if selection.bot_name.is_empty() {
            self.dashboard.clear_config();
            return;
        }
        if selection.bot_run.is_empty() {
            self.dashboard.await_run_for_config();
            return;
        }

        self.dashboard.reset_config();
        let bot_name = selection.bot_name.clone();
        let bot_run = selection.bot_run.clone();
        let api = Arc::clone(&self.api);
        let tx = self.config_tx.clone();
        let request_timeout = self.config.request_timeout;

        tokio::spawn(async move {
            let request = api.config(&bot_name, Some(bot_run.as_str()));
            let result = match timeout(request_timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(MonitorError::Http {
                    endpoint: Endpoint::Config.to_string(),
                    message: format!("timed out after {:?}", request_timeout),
                }),
            };
            // Receiver lives as long as the controller
            let _ = tx.send(ConfigLoaded {
                bot_name,
                bot_run,
                result,
            });
        });
    }

    fn handle_config(&mut self, loaded: ConfigLoaded) {
        let selection = &self.controls.selection;
        if loaded.bot_name != selection.bot_name || loaded.bot_run != selection.bot_run {
            debug!(
                "Dropping config of previous selection {}/{}",
                loaded.bot_name, loaded.bot_run
            );
            return;
        }

        if let Err(error) = &loaded.result {
            warn!(
                "Failed to load config for {}/{}: {}",
                loaded.bot_name, loaded.bot_run, error
            );
        }
        self.dashboard.apply_config(loaded.result);
    }

    /// Rate or auto-refresh changed. Disabling stops the timer at once; any
    /// other change restarts it after the debounce window.
    fn schedule_restart(&mut self) {
        let refresh = self.controls.refresh;

        if !refresh.enabled || self.config.restart_debounce.is_zero() {
            self.restart_at = None;
            self.scheduler.restart(refresh);
        } else {
            self.restart_at = Some(Instant::now() + self.config.restart_debounce);
        }
    }

    fn handle_tick(&mut self, tick: Tick) {
        if !self.scheduler.accepts(&tick) {
            debug!("Ignoring tick from disarmed timer {}", tick.epoch);
            return;
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        let params = self.controls.selection.snapshot();
        self.fetcher.refresh(params);
        self.refreshing = true;
    }

    fn handle_fetch(&mut self, message: FetchMessage) {
        match message {
            FetchMessage::Outcome(outcome) => {
                if !self.fetcher.is_current(outcome.generation) {
                    debug!(
                        "Dropping {:?} result of superseded refresh {}",
                        outcome.source, outcome.generation
                    );
                    return;
                }
                self.dashboard.apply(outcome.source, outcome.result);
            }
            FetchMessage::Settled(report) => {
                if !self.fetcher.is_current(report.generation) {
                    debug!("Dropping report of superseded refresh {}", report.generation);
                    return;
                }
                self.dashboard.mark_updated(Utc::now());
                self.health = Health::from_report(&report);
                self.refreshing = false;
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(DashboardSnapshot {
            dashboard: self.dashboard.clone(),
            controls: self.controls.clone(),
            scheduler: self.scheduler.state(),
            health: self.health,
            generation: self.fetcher.generation(),
            refreshing: self.refreshing,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Source;

    #[test]
    fn test_health_from_report() {
        struct TestCase {
            failed: Vec<Source>,
            expected: Health,
        }

        let tests = vec![
            TestCase {
                // TC0: clean batch
                failed: vec![],
                expected: Health::Ok,
            },
            TestCase {
                // TC1: partial failure
                failed: vec![Source::Stats, Source::PriceSeries],
                expected: Health::Degraded { failed: 2 },
            },
            TestCase {
                // TC2: backend down
                failed: Source::ALL.to_vec(),
                expected: Health::Down,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let report = BatchReport {
                generation: 1,
                failed: test.failed,
            };
            assert_eq!(Health::from_report(&report), test.expected, "TC{} failed", index);
        }
    }
}
