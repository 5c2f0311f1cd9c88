pub mod client;
pub mod error;
pub mod types;

pub use client::{CompletionSender, OpenAiClient, request_json_text};
pub use error::OpenAiError;
