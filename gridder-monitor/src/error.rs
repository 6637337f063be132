use thiserror::Error;

/// All errors generated in `gridder-monitor`.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("HTTP request to {endpoint} failed: {message}")]
    Http { endpoint: String, message: String },

    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },

    #[error("invalid configuration value for {key}: {value}")]
    Config { key: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Determine if an error is expected to clear by itself on the next refresh cycle.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_transient(&self) -> bool {
        match self {
            MonitorError::Http { .. } => true,
            MonitorError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(endpoint: &str, error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return MonitorError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            };
        }

        if error.is_decode() {
            MonitorError::Decode {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            }
        } else {
            MonitorError::Http {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            }
        }
    }
}
