/// Monitor configuration
///
/// Defaults can be overridden from the environment (see [`MonitorConfig::from_env`])
/// or with the builder methods.

use crate::error::{MonitorError, Result};
use crate::selection::{RefreshConfig, DEFAULT_REFRESH_SECS};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Runtime configuration for the monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Base URL of the dashboard backend
    pub api_url: Url,
    /// Per-request timeout; also bounds the run-catalog reload on bot change
    pub request_timeout: Duration,
    /// Initial refresh timer settings
    pub refresh: RefreshConfig,
    /// Quiet period before a rate/auto-refresh change restarts the timer
    pub restart_debounce: Duration,
    /// Log file (the terminal belongs to the UI)
    pub log_file: PathBuf,
    /// UI redraw tick
    pub ui_tick: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("http://127.0.0.1:5000").expect("static URL is valid"),
            request_timeout: Duration::from_secs(10),
            refresh: RefreshConfig {
                interval_secs: DEFAULT_REFRESH_SECS,
                enabled: true,
            },
            restart_debounce: Duration::from_millis(250),
            log_file: PathBuf::from("gridder-monitor.log"),
            ui_tick: Duration::from_millis(250),
        }
    }
}

impl MonitorConfig {
    /// Create a new configuration with custom backend URL
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: parse_url(api_url)?,
            ..Default::default()
        })
    }

    /// Read overrides from `GRIDDER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("GRIDDER_API_URL") {
            config.api_url = parse_url(&url)?;
        }
        if let Some(secs) = lookup("GRIDDER_REFRESH_SECS") {
            let secs = parse_number("GRIDDER_REFRESH_SECS", &secs)?;
            config.refresh.interval_secs = RefreshConfig::clamp_interval(secs);
        }
        if let Some(flag) = lookup("GRIDDER_AUTO_REFRESH") {
            config.refresh.enabled = parse_flag("GRIDDER_AUTO_REFRESH", &flag)?;
        }
        if let Some(secs) = lookup("GRIDDER_HTTP_TIMEOUT_SECS") {
            let secs = parse_number("GRIDDER_HTTP_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(MonitorError::Config {
                    key: "GRIDDER_HTTP_TIMEOUT_SECS",
                    value: "0".to_string(),
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = lookup("GRIDDER_RESTART_DEBOUNCE_MS") {
            config.restart_debounce =
                Duration::from_millis(parse_number("GRIDDER_RESTART_DEBOUNCE_MS", &ms)?);
        }
        if let Some(path) = lookup("GRIDDER_LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set initial refresh timer settings
    pub fn with_refresh(mut self, interval_secs: u64, enabled: bool) -> Self {
        self.refresh = RefreshConfig {
            interval_secs: RefreshConfig::clamp_interval(interval_secs),
            enabled,
        };
        self
    }

    /// Set restart debounce window
    pub fn with_restart_debounce(mut self, debounce: Duration) -> Self {
        self.restart_debounce = debounce;
        self
    }

    /// Set log file path
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|_| MonitorError::Config {
        key: "GRIDDER_API_URL",
        value: raw.to_string(),
    })
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| MonitorError::Config {
        key,
        value: raw.to_string(),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MonitorError::Config {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:5000/");
        assert_eq!(config.refresh.interval_secs, 30);
        assert!(config.refresh.enabled);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.restart_debounce, Duration::from_millis(250));
    }

    #[test]
    fn test_config_builder() {
        let config = MonitorConfig::new("http://gridder.local:8080")
            .unwrap()
            .with_request_timeout(Duration::from_secs(3))
            .with_refresh(2, false)
            .with_restart_debounce(Duration::ZERO)
            .with_log_file("/tmp/monitor.log");

        assert_eq!(config.api_url.host_str(), Some("gridder.local"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.refresh.interval_secs, 5);
        assert!(!config.refresh.enabled);
        assert_eq!(config.restart_debounce, Duration::ZERO);
        assert_eq!(config.log_file, PathBuf::from("/tmp/monitor.log"));
    }

    #[test]
    fn test_env_overrides() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("GRIDDER_API_URL", "http://10.0.0.5:5000"),
            ("GRIDDER_REFRESH_SECS", "60"),
            ("GRIDDER_AUTO_REFRESH", "off"),
            ("GRIDDER_RESTART_DEBOUNCE_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.api_url.host_str(), Some("10.0.0.5"));
        assert_eq!(config.refresh.interval_secs, 60);
        assert!(!config.refresh.enabled);
        assert_eq!(config.restart_debounce, Duration::ZERO);
    }

    #[test]
    fn test_env_rejects_invalid_values() {
        let bad_rate = MonitorConfig::from_lookup(lookup(&[("GRIDDER_REFRESH_SECS", "soon")]));
        assert!(matches!(
            bad_rate,
            Err(MonitorError::Config { key: "GRIDDER_REFRESH_SECS", .. })
        ));

        let bad_flag = MonitorConfig::from_lookup(lookup(&[("GRIDDER_AUTO_REFRESH", "maybe")]));
        assert!(bad_flag.is_err());

        let zero_timeout =
            MonitorConfig::from_lookup(lookup(&[("GRIDDER_HTTP_TIMEOUT_SECS", "0")]));
        assert!(zero_timeout.is_err());

        let bad_url = MonitorConfig::from_lookup(lookup(&[("GRIDDER_API_URL", "not a url")]));
        assert!(bad_url.is_err());
    }
}
