//! Transport errors for the chat-completions boundary.
//!
//! Every variant maps onto a [`FailureClass`] through
//! [`OpenAiError::classify`], so retry policy never has to look at HTTP
//! status codes or `reqwest` internals.

use thiserror::Error;

use crate::error::FailureClass;

/// Errors raised by a single boundary call.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// No API key configured; nothing was sent.
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    /// HTTP 429. `retry_after_secs` comes from the `Retry-After` header when present.
    #[error("rate limited (HTTP 429): {message}")]
    RateLimited {
        retry_after_secs: Option<f64>,
        message: String,
    },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    ApiError {
        status: u16,
        message: String,
        retry_after_secs: Option<f64>,
    },

    /// The reply had no choices or a null content field.
    #[error("response contained no message content")]
    EmptyResponse,

    /// DNS, connect, timeout or body decoding failure.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl OpenAiError {
    /// Retry classification for this failure.
    ///
    /// Client errors that will fail identically on every attempt
    /// (bad request, auth, unknown model) are fatal.
    pub fn classify(&self) -> FailureClass {
        match self {
            OpenAiError::MissingApiKey => FailureClass::Fatal,
            OpenAiError::RateLimited {
                retry_after_secs, ..
            } => FailureClass::RateLimited {
                retry_after: *retry_after_secs,
            },
            OpenAiError::ApiError {
                status,
                retry_after_secs,
                ..
            } => match status {
                400 | 401 | 403 | 404 | 422 => FailureClass::Fatal,
                _ => FailureClass::Transient {
                    retry_after: *retry_after_secs,
                },
            },
            OpenAiError::EmptyResponse | OpenAiError::NetworkError(_) => {
                FailureClass::Transient { retry_after: None }
            }
        }
    }
}
