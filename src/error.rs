use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VersabotError {
    #[error("Table '{table}' is missing required columns {missing:?} (found headers: {headers:?})")]
    Schema {
        table: String,
        missing: Vec<String>,
        headers: Vec<String>,
    },

    #[error("Data not ready: {0}")]
    DataNotReady(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Another {0} is already running")]
    Busy(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl VersabotError {
    pub fn schema(table: &str, missing: Vec<String>, headers: &[String]) -> Self {
        Self::Schema {
            table: table.to_string(),
            missing,
            headers: headers.to_vec(),
        }
    }

    /// Short text suitable for showing directly to the dashboard user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Schema { table, missing, .. } => {
                format!("The {} sheet is missing columns: {}", table, missing.join(", "))
            }
            Self::DataNotReady(_) => "Data not ready yet. Refresh and try again.".to_string(),
            Self::Upstream(msg) => format!("Service unavailable: {}", msg),
            Self::Timeout(limit) => format!("The request took longer than {:?}. Try again.", limit),
            Self::Busy(what) => format!("A {} is already running.", what),
            Self::Config(msg) => format!("Check your settings: {}", msg),
            Self::SerializationError(_) => "Received malformed data.".to_string(),
            Self::IoError(e) => format!("Storage error: {}", e),
            #[cfg(feature = "remote")]
            Self::Http(_) => "Network error. Try again.".to_string(),
        }
    }

    /// Whether retrying the same operation later can succeed without user changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DataNotReady(_) | Self::Upstream(_) | Self::Timeout(_) | Self::Busy(_) => true,
            #[cfg(feature = "remote")]
            Self::Http(_) => true,
            _ => false,
        }
    }
}

#[cfg(feature = "remote")]
impl VersabotError {
    /// Maps a transport failure, distinguishing the request timeout.
    ///
    /// The URL is stripped because it carries the API key or sheet token.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Http(err.without_url())
        }
    }
}

pub type Result<T> = std::result::Result<T, VersabotError>;
