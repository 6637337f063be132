//! Auto-refresh timer.
//!
//! [`RefreshScheduler`] owns at most one armed timer task. Each arming gets a
//! new epoch and every [`Tick`] carries the epoch of the timer that produced it,
//! so the controller can drop ticks still queued from a disarmed timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::selection::RefreshConfig;

/// Timer firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

pub struct RefreshScheduler {
    config: RefreshConfig,
    epoch: u64,
    timer: Option<JoinHandle<()>>,
    tick_tx: mpsc::UnboundedSender<Tick>,
}

impl RefreshScheduler {
    /// Create a scheduler; it starts Running if `config.enabled`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: RefreshConfig, tick_tx: mpsc::UnboundedSender<Tick>) -> Self {
        let mut scheduler = Self {
            config,
            epoch: 0,
            timer: None,
            tick_tx,
        };
        scheduler.start();
        scheduler
    }

    pub fn state(&self) -> SchedulerState {
        if self.timer.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    pub fn config(&self) -> RefreshConfig {
        self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Arm the periodic timer. No-op if already running, disabled, or the
    /// interval is zero. Returns whether a timer was armed.
    pub fn start(&mut self) -> bool {
        if self.timer.is_some() || !self.config.enabled || self.config.interval_secs == 0 {
            return false;
        }

        self.epoch += 1;
        let epoch = self.epoch;
        let period = Duration::from_secs(self.config.interval_secs);
        let tick_tx = self.tick_tx.clone();

        self.timer = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick_tx.send(Tick { epoch }).is_err() {
                    debug!("Tick receiver dropped, timer {} exiting", epoch);
                    break;
                }
            }
        }));

        info!(
            "Auto-refresh armed: every {}s (timer {})",
            self.config.interval_secs, epoch
        );
        true
    }

    /// Disarm the timer. No-op if already stopped. Returns whether a timer was disarmed.
    pub fn stop(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.abort();
                info!("Auto-refresh stopped (timer {})", self.epoch);
                true
            }
            None => false,
        }
    }

    /// Apply new settings with a single correctly-paced timer: `stop(); start()`.
    pub fn restart(&mut self, config: RefreshConfig) {
        self.config = config;
        self.stop();
        self.start();
    }

    /// Whether a tick came from the currently armed timer
    pub fn accepts(&self, tick: &Tick) -> bool {
        self.timer.is_some() && tick.epoch == self.epoch
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(interval_secs: u64) -> RefreshConfig {
        RefreshConfig {
            interval_secs,
            enabled: true,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Tick>) -> Vec<Tick> {
        let mut ticks = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            ticks.push(tick);
        }
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_follows_enabled_flag() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let running = RefreshScheduler::new(enabled(30), tx.clone());
        assert_eq!(running.state(), SchedulerState::Running);

        let stopped = RefreshScheduler::new(
            RefreshConfig {
                interval_secs: 30,
                enabled: false,
            },
            tx,
        );
        assert_eq!(stopped.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop_are_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = RefreshScheduler::new(enabled(10), tx);
        let epoch = scheduler.epoch();

        assert!(!scheduler.start());
        assert_eq!(scheduler.epoch(), epoch);

        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _scheduler = RefreshScheduler::new(enabled(10), tx);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(drain(&mut rx).is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarts_leave_single_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = RefreshScheduler::new(enabled(30), tx);

        for secs in [5, 15, 60, 10] {
            scheduler.restart(enabled(secs));
            assert!(scheduler.is_running());
        }
        scheduler.restart(RefreshConfig {
            interval_secs: 10,
            enabled: false,
        });
        assert!(!scheduler.is_running());
        scheduler.restart(enabled(10));
        tokio::task::yield_now().await;

        tokio::time::sleep(Duration::from_secs(35)).await;

        let ticks = drain(&mut rx);
        assert_eq!(ticks.len(), 3, "expected one 10s timer, got {:?}", ticks);
        assert!(ticks.iter().all(|tick| scheduler.accepts(tick)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_or_zero_interval_never_arms() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = RefreshScheduler::new(
            RefreshConfig {
                interval_secs: 0,
                enabled: true,
            },
            tx,
        );
        assert!(!scheduler.start());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_epoch_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = RefreshScheduler::new(enabled(10), tx);
        let old = Tick {
            epoch: scheduler.epoch(),
        };

        scheduler.restart(enabled(20));

        assert!(!scheduler.accepts(&old));
        assert!(scheduler.accepts(&Tick {
            epoch: scheduler.epoch()
        }));

        scheduler.stop();
        assert!(!scheduler.accepts(&Tick {
            epoch: scheduler.epoch()
        }));
    }
}
