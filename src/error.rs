use std::fmt;

use serde::Serialize;

/// One candidate in an ambiguous resolver match, as surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: u32,
    pub role: String,
    pub bounds: (i64, i64, i64, i64),
    pub label: String,
    pub path: String,
}

#[derive(Debug)]
pub enum AxError {
    Permission(String),
    NotFound { query: String, scope: String },
    Ambiguous { candidates: Vec<Candidate> },
    InvalidArgument(String),
    Provider(String),
    Timeout { last_state: String },
    Assertion { reason: String },
    BatchStepFailure { step: usize, source: Box<AxError> },
    Io(std::io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
}

impl fmt::Display for AxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permission(msg) => write!(f, "Permission denied: {msg}"),
            Self::NotFound { query, scope } => {
                write!(f, "No match for '{query}' in {scope}")
            }
            Self::Ambiguous { candidates } => {
                write!(f, "Ambiguous match: {} candidates", candidates.len())
            }
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::Provider(msg) => write!(f, "Provider error: {msg}"),
            Self::Timeout { last_state } => write!(f, "Timed out; last state: {last_state}"),
            Self::Assertion { reason } => write!(f, "Assertion failed: {reason}"),
            Self::BatchStepFailure { step, source } => {
                write!(f, "Step {step} failed: {source}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Yaml(e) => write!(f, "YAML error: {e}"),
        }
    }
}

impl std::error::Error for AxError {}

impl From<std::io::Error> for AxError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for AxError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<serde_yaml::Error> for AxError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(e)
    }
}

impl AxError {
    /// Short kind tag used in structured error output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Permission(_) => "permission",
            Self::NotFound { .. } => "not_found",
            Self::Ambiguous { .. } => "ambiguous",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Provider(_) => "provider",
            Self::Timeout { .. } => "timeout",
            Self::Assertion { .. } => "assertion",
            Self::BatchStepFailure { .. } => "batch_step_failure",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
        }
    }
}
