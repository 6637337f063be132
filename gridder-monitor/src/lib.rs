/// Gridder Monitor - live terminal dashboard for the Gridder trading bot
///
/// The library is split along the data flow:
/// - `api`: read-only client for the dashboard backend
/// - `selection`: filter state and the control-panel reducer
/// - `scheduler`: auto-refresh timer
/// - `fetch`: concurrent refresh batches with generation tokens
/// - `render`: pure panel stages and the dashboard model
/// - `controller`: the task tying the above together
/// - `ui`: ratatui drawing and key bindings
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod render;
pub mod scheduler;
pub mod selection;
pub mod types;
pub mod ui;

// Re-export commonly used types for convenience
pub use api::{Endpoint, HttpMonitorClient, MonitorApi};
pub use config::MonitorConfig;
pub use controller::{Controller, ControllerHandle, DashboardSnapshot, Health};
pub use error::{MonitorError, Result};
pub use render::{Dashboard, Panel, PanelState};
pub use selection::{ControlEvent, Controls, FetchParams, RefreshConfig, SelectionState, TimeFilter};
pub use types::{
    BotRunDescriptor, ConfigSnapshot, DefaultSelection, OptionsPnlPoint, PricePoint, Side,
    StatsSnapshot, TotalPnlPoint, Trade,
};
