use std::path::PathBuf;

use thiserror::Error;

use crate::openai::OpenAiError;

#[derive(Debug, Error)]
pub enum PdgError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Filesystem and CSV failures while reading input or writing artifacts.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// How a failed attempt should be retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureClass {
    /// Retry with exponential backoff, or the server hint when given.
    Transient { retry_after: Option<f64> },
    /// Like `Transient`, and also feeds the rate-limit penalty.
    RateLimited { retry_after: Option<f64> },
    /// Retrying cannot help; the item fails now.
    Fatal,
}

impl FailureClass {
    pub fn retry_after(&self) -> Option<f64> {
        match self {
            FailureClass::Transient { retry_after } | FailureClass::RateLimited { retry_after } => {
                *retry_after
            }
            FailureClass::Fatal => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FailureClass::RateLimited { .. })
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureClass::Transient { .. } => write!(f, "transient"),
            FailureClass::RateLimited { .. } => write!(f, "rate-limited"),
            FailureClass::Fatal => write!(f, "fatal"),
        }
    }
}

/// Failure of one `produce` call.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The boundary call itself failed.
    #[error("generation failed: {0}")]
    Failure(#[from] OpenAiError),

    /// The reply was not valid JSON even after one repair round-trip.
    /// `raw` is the original reply, kept for diagnostics.
    #[error("malformed model output: {source}")]
    MalformedOutput {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GenerationError {
    pub fn classify(&self) -> FailureClass {
        match self {
            GenerationError::Failure(e) => e.classify(),
            GenerationError::MalformedOutput { .. } => FailureClass::Transient { retry_after: None },
        }
    }
}

/// Failure of one attempt inside the batch retry loop: generation or persistence.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AttemptError {
    pub fn classify(&self) -> FailureClass {
        match self {
            AttemptError::Generation(e) => e.classify(),
            AttemptError::Storage(_) => FailureClass::Transient { retry_after: None },
        }
    }

    /// The unparseable reply behind a `MalformedOutput`, if that is what failed.
    pub fn malformed_raw(&self) -> Option<&str> {
        match self {
            AttemptError::Generation(GenerationError::MalformedOutput { raw, .. }) => Some(raw),
            _ => None,
        }
    }
}

/// Terminal outcome of an item that never succeeded. Recorded in the ledger,
/// never propagated out of the runner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("non-retryable failure: {last_error}")]
    Fatal { last_error: String },
}

impl ItemError {
    pub fn last_error(&self) -> &str {
        match self {
            ItemError::RetriesExhausted { last_error, .. } | ItemError::Fatal { last_error } => {
                last_error
            }
        }
    }
}
