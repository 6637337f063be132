//! Selection state and the control-panel reducer.
//!
//! User input arrives as [`ControlEvent`]s. [`reduce`] applies one event to
//! [`Controls`] and returns the side effects the controller must run; the
//! reducer itself never performs I/O.

use crate::types::BotRunDescriptor;

/// Refresh rate bounds and step (seconds)
pub const MIN_REFRESH_SECS: u64 = 5;
pub const MAX_REFRESH_SECS: u64 = 300;
pub const REFRESH_STEP_SECS: u64 = 5;
pub const DEFAULT_REFRESH_SECS: u64 = 30;

/// Rolling look-back window applied to every filtered request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    AllTime,
    Hours(u32),
}

impl TimeFilter {
    const PRESETS: [TimeFilter; 5] = [
        TimeFilter::AllTime,
        TimeFilter::Hours(1),
        TimeFilter::Hours(6),
        TimeFilter::Hours(24),
        TimeFilter::Hours(168),
    ];

    pub fn hours(&self) -> Option<u32> {
        match self {
            TimeFilter::AllTime => None,
            TimeFilter::Hours(hours) => Some(*hours),
        }
    }

    /// Next preset, wrapping back to All Time
    pub fn next(&self) -> Self {
        let position = Self::PRESETS.iter().position(|preset| preset == self);
        match position {
            Some(index) => Self::PRESETS[(index + 1) % Self::PRESETS.len()],
            None => TimeFilter::AllTime,
        }
    }

    pub fn label(&self) -> String {
        match self {
            TimeFilter::AllTime => "All Time".to_string(),
            TimeFilter::Hours(168) => "7d".to_string(),
            TimeFilter::Hours(hours) => format!("{}h", hours),
        }
    }
}

/// Current filter values. Empty strings mean "nothing selected".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    pub bot_name: String,
    pub bot_run: String,
    pub include_all_runs: bool,
    pub time_filter: TimeFilter,
}

impl SelectionState {
    /// Freeze the filter values for one refresh cycle
    pub fn snapshot(&self) -> FetchParams {
        let bot_run = if self.include_all_runs || self.bot_run.is_empty() {
            None
        } else {
            Some(self.bot_run.clone())
        };

        FetchParams {
            bot_name: (!self.bot_name.is_empty()).then(|| self.bot_name.clone()),
            bot_run,
            include_all_runs: self.include_all_runs,
            hours_filter: self.time_filter.hours(),
        }
    }
}

/// Immutable copy of the selection taken when a refresh is dispatched
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchParams {
    pub bot_name: Option<String>,
    pub bot_run: Option<String>,
    pub include_all_runs: bool,
    pub hours_filter: Option<u32>,
}

impl FetchParams {
    /// Query string pairs shared by trades, stats, options-PnL, total-PnL and price.
    ///
    /// Absent values are omitted entirely, never sent as empty or sentinel values.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(bot_name) = &self.bot_name {
            pairs.push(("bot_name", bot_name.clone()));
        }
        if self.include_all_runs {
            pairs.push(("include_all_runs", "true".to_string()));
        } else if let Some(bot_run) = &self.bot_run {
            pairs.push(("bot_run", bot_run.clone()));
        }
        if let Some(hours) = self.hours_filter {
            pairs.push(("hours_filter", hours.to_string()));
        }
        pairs
    }
}

/// Auto-refresh timer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REFRESH_SECS,
            enabled: true,
        }
    }
}

impl RefreshConfig {
    pub fn clamp_interval(secs: u64) -> u64 {
        secs.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS)
    }
}

/// Run catalog for the selected bot
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RunCatalog {
    /// Bot changed, reload not completed yet
    #[default]
    Stale,
    Loaded {
        bot_name: String,
        runs: Vec<BotRunDescriptor>,
    },
}

impl RunCatalog {
    pub fn runs(&self) -> &[BotRunDescriptor] {
        match self {
            RunCatalog::Stale => &[],
            RunCatalog::Loaded { runs, .. } => runs,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, RunCatalog::Stale)
    }
}

/// Everything the control panel can change
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Controls {
    pub selection: SelectionState,
    pub refresh: RefreshConfig,
    pub bots: Vec<String>,
    pub runs: RunCatalog,
}

impl Controls {
    pub fn new(refresh: RefreshConfig) -> Self {
        Self {
            refresh,
            ..Default::default()
        }
    }

    /// Run selection input is usable only once the catalog for the current bot
    /// is loaded, non-empty, and all-runs mode is off.
    pub fn run_selector_enabled(&self) -> bool {
        !self.selection.include_all_runs && !self.runs.runs().is_empty()
    }

    pub fn load_bots(&mut self, bots: Vec<String>) {
        self.bots = bots;
    }

    /// Install a reloaded run catalog. Returns `false` (and changes nothing) when
    /// the catalog belongs to a bot that is no longer selected.
    pub fn load_runs(&mut self, bot_name: &str, runs: Vec<BotRunDescriptor>) -> bool {
        if bot_name != self.selection.bot_name {
            return false;
        }
        self.runs = RunCatalog::Loaded {
            bot_name: bot_name.to_string(),
            runs,
        };
        true
    }
}

/// User input, one variant per control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    SetBotName(String),
    SetBotRun(String),
    SetIncludeAllRuns(bool),
    SetTimeFilter(TimeFilter),
    SetRefreshRate(u64),
    SetAutoRefresh(bool),
    RefreshNow,
}

/// Side effects requested by the reducer, executed in order by the controller.
/// `LoadConfig` only dispatches a request, so it never holds back later events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ReloadRuns,
    LoadConfig,
    Refresh,
    RestartScheduler,
}

/// Apply one control event.
pub fn reduce(controls: &mut Controls, event: ControlEvent) -> Vec<Effect> {
    match event {
        ControlEvent::SetBotName(name) => {
            controls.selection.bot_name = name;
            controls.selection.bot_run.clear();
            if controls.selection.bot_name.is_empty() {
                // All bots: there is no run catalog to load
                controls.runs = RunCatalog::Loaded {
                    bot_name: String::new(),
                    runs: Vec::new(),
                };
                Vec::new()
            } else {
                controls.runs = RunCatalog::Stale;
                vec![Effect::ReloadRuns, Effect::Refresh, Effect::LoadConfig]
            }
        }
        ControlEvent::SetBotRun(run) => {
            if controls.selection.include_all_runs {
                return Vec::new();
            }
            controls.selection.bot_run = run;
            vec![Effect::Refresh, Effect::LoadConfig]
        }
        ControlEvent::SetIncludeAllRuns(flag) => {
            controls.selection.include_all_runs = flag;
            if flag {
                controls.selection.bot_run.clear();
                vec![Effect::Refresh, Effect::LoadConfig]
            } else {
                vec![Effect::Refresh]
            }
        }
        ControlEvent::SetTimeFilter(filter) => {
            controls.selection.time_filter = filter;
            vec![Effect::Refresh]
        }
        ControlEvent::SetRefreshRate(secs) => {
            controls.refresh.interval_secs = RefreshConfig::clamp_interval(secs);
            vec![Effect::RestartScheduler]
        }
        ControlEvent::SetAutoRefresh(flag) => {
            controls.refresh.enabled = flag;
            vec![Effect::RestartScheduler]
        }
        ControlEvent::RefreshNow => vec![Effect::Refresh],
    }
}
