use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::error::OpenAiError;
use super::types::{ChatRequest, ChatResponse};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// System message for every generation and repair call.
pub const JSON_SYSTEM_PROMPT: &str = "You are a JSON generator. Always return valid JSON only.";

/// Anything that can answer a chat-completions request.
///
/// Implemented by [`OpenAiClient`] for real traffic and by mocks in tests.
#[allow(async_fn_in_trait)]
pub trait CompletionSender {
    async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse, OpenAiError>;
}

pub struct OpenAiClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client pointing at a custom base URL (compatible gateways, tests).
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, OpenAiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl CompletionSender for OpenAiClient {
    async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse, OpenAiError> {
        if self.api_key.is_empty() {
            return Err(OpenAiError::MissingApiKey);
        }

        debug!(model = %req.model, messages = req.messages.len(), "sending chat request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();
        let retry_after_secs = parse_retry_after(response.headers());

        if status == StatusCode::TOO_MANY_REQUESTS {
            let message = response.text().await.unwrap_or_default();
            return Err(OpenAiError::RateLimited {
                retry_after_secs,
                message,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(OpenAiError::ApiError {
                status: status.as_u16(),
                message,
                retry_after_secs,
            });
        }

        let body = response.json::<ChatResponse>().await?;
        Ok(body)
    }
}

/// Send a JSON-mode request and return the first choice's text.
pub async fn request_json_text<S: CompletionSender>(
    sender: &S,
    model: &str,
    prompt: &str,
) -> Result<String, OpenAiError> {
    let req = ChatRequest::json_object(model, JSON_SYSTEM_PROMPT, prompt);
    let response = sender.send_chat(&req).await?;
    response
        .first_text()
        .map(str::to_string)
        .ok_or(OpenAiError::EmptyResponse)
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureClass;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::with_base_url(
            "sk-test".into(),
            format!("{}/v1/", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn ok_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
        })
    }

    #[tokio::test]
    async fn returns_text_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("{\"a\":1}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let text = request_json_text(&client, "gpt-4o-mini", "hi").await.unwrap();
        assert_eq!(text, "{\"a\":1}");
    }

    #[tokio::test]
    async fn maps_429_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "3")
                    .set_body_string("too many"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = request_json_text(&client, "m", "hi").await.unwrap_err();
        assert_eq!(
            err.classify(),
            FailureClass::RateLimited {
                retry_after: Some(3.0)
            }
        );
    }

    #[tokio::test]
    async fn maps_server_error_to_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = request_json_text(&client, "m", "hi").await.unwrap_err();
        match &err {
            OpenAiError::ApiError {
                status, message, ..
            } => {
                assert_eq!(*status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.classify(), FailureClass::Transient { retry_after: None });
    }

    #[tokio::test]
    async fn null_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = request_json_text(&client, "m", "hi").await.unwrap_err();
        assert!(matches!(err, OpenAiError::EmptyResponse));
    }

    #[tokio::test]
    async fn missing_key_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("{}")))
            .expect(0)
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(
            String::new(),
            format!("{}/v1", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = request_json_text(&client, "m", "hi").await.unwrap_err();
        assert!(matches!(err, OpenAiError::MissingApiKey));
    }

    #[test]
    fn retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "1.5".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(1.5));
        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
