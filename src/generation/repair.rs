//! Strict JSON parsing of model replies with a single repair round-trip.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::openai::{CompletionSender, request_json_text};

pub fn repair_prompt(raw: &str) -> String {
    format!("Fix this and return VALID JSON only:\n{raw}")
}

/// Parses a reply into `T`, asking the model once to fix it when it does not parse.
pub struct ResponseRepair<'a, S> {
    sender: &'a S,
    model: &'a str,
}

impl<'a, S: CompletionSender> ResponseRepair<'a, S> {
    pub fn new(sender: &'a S, model: &'a str) -> Self {
        Self { sender, model }
    }

    /// Strict parse of `raw`; on failure one repair request, whose reply is
    /// parsed strictly with no further repair. A second parse failure yields
    /// `MalformedOutput` carrying the original `raw`.
    pub async fn parse<T: DeserializeOwned>(&self, raw: &str) -> Result<T, GenerationError> {
        match serde_json::from_str::<T>(raw) {
            Ok(value) => return Ok(value),
            Err(e) => warn!(error = %e, len = raw.len(), "reply did not parse; requesting repair"),
        }

        let fixed = request_json_text(self.sender, self.model, &repair_prompt(raw)).await?;
        debug!(len = fixed.len(), "received repaired reply");

        serde_json::from_str::<T>(&fixed).map_err(|source| GenerationError::MalformedOutput {
            raw: raw.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::ScriptedSender;
    use crate::openai::OpenAiError;
    use serde_json::Value;

    #[tokio::test]
    async fn valid_json_needs_no_repair() {
        let sender = ScriptedSender::new(vec![]);
        let repair = ResponseRepair::new(&sender, "m");
        let value: Value = repair.parse(r#"{"a": 1}"#).await.unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(sender.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_json_is_repaired_once() {
        let sender = ScriptedSender::new(vec![Ok(r#"{"a": 2}"#.into())]);
        let repair = ResponseRepair::new(&sender, "m");
        let value: Value = repair.parse("{a: 2,}").await.unwrap();
        assert_eq!(value["a"], 2);
        assert_eq!(sender.calls(), 1);

        let prompt = sender.last_prompt().unwrap();
        assert!(prompt.starts_with("Fix this and return VALID JSON only:"));
        assert!(prompt.ends_with("{a: 2,}"));
    }

    #[tokio::test]
    async fn second_failure_is_malformed_with_original_text() {
        let sender = ScriptedSender::new(vec![Ok("still not json".into())]);
        let repair = ResponseRepair::new(&sender, "m");
        let err = repair.parse::<Value>("garbage").await.unwrap_err();
        match err {
            GenerationError::MalformedOutput { raw, .. } => assert_eq!(raw, "garbage"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(sender.calls(), 1);
    }

    #[tokio::test]
    async fn repair_call_failure_propagates_as_generation_failure() {
        let sender = ScriptedSender::new(vec![Err(OpenAiError::EmptyResponse)]);
        let repair = ResponseRepair::new(&sender, "m");
        let err = repair.parse::<Value>("garbage").await.unwrap_err();
        assert!(matches!(err, GenerationError::Failure(OpenAiError::EmptyResponse)));
    }
}
