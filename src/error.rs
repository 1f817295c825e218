//! rfd-solver error types

use std::time::Duration;

/// rfd-solver error types
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("not found: {0}")]
    NotFound(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid RFD: {0}")]
    InvalidRfd(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Pipeline errors
    /// Upstream provider failure after bounded retries. Fatal for the RFD.
    #[error("generation failed for {target}: {source}")]
    Generation {
        target: String,
        #[source]
        source: Box<SolverError>,
    },

    /// Assembled dataset is missing a field the RFD schema requires. Fatal
    /// for the RFD; nothing is cached.
    #[error("schema violation: missing required field '{field}'{}", record_suffix(.record_index))]
    SchemaViolation {
        field: String,
        record_index: Option<usize>,
    },
}

fn record_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" in record {i}"),
        None => " (no records)".to_string(),
    }
}

impl SolverError {
    /// Whether a retry may succeed: network failures, timeouts, rate limits
    /// and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            SolverError::Http(_) | SolverError::Timeout(_) | SolverError::RateLimited { .. } => {
                true
            }
            SolverError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SolverError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short stable name of the error kind, used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            SolverError::Http(_) => "http",
            SolverError::Timeout(_) => "timeout",
            SolverError::Api { .. } => "api",
            SolverError::RateLimited { .. } => "rate_limited",
            SolverError::AuthenticationFailed => "authentication_failed",
            SolverError::NotFound(_) => "not_found",
            SolverError::Json(_) => "json",
            SolverError::Io(_) => "io",
            SolverError::InvalidRfd(_) => "invalid_rfd",
            SolverError::Configuration(_) => "configuration",
            SolverError::Generation { .. } => "generation",
            SolverError::SchemaViolation { .. } => "schema_violation",
        }
    }
}

impl From<reqwest::Error> for SolverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured duration on the error
            SolverError::Timeout(Duration::ZERO)
        } else {
            SolverError::Http(err.to_string())
        }
    }
}

/// Result type alias for rfd-solver operations
pub type Result<T> = std::result::Result<T, SolverError>;
