//! Transport adapter: one request/response exchange per call.
//!
//! The adapter composes the prompt for the requested [`PromptMode`], posts it
//! to the Messages API and classifies the answer. It never retries; the retry
//! policy belongs to the orchestrator.

use crate::error::TransportError;
use crate::http_client::{HttpClient, HttpResponse, ReqwestHttpClient};
use crate::persona;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1500;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// How the prompt for an exchange is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Persona system prompt plus an attempt-dependent user turn.
    Degraded,
    /// The bare problem text, used only for side-by-side comparison.
    Baseline,
}

/// Successful exchange: the text of the first content block and the token usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens: u64,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs exactly one exchange with the generation endpoint.
    async fn complete(
        &self,
        problem: &str,
        attempt: u32,
        mode: PromptMode,
    ) -> Result<Completion, TransportError>;
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

impl Usage {
    fn total(&self) -> u64 {
        match self.total_tokens {
            Some(total) => total,
            None => self.input_tokens.unwrap_or(0) + self.output_tokens.unwrap_or(0),
        }
    }
}

/// Turns a raw HTTP answer into a completion or a classified failure.
pub fn classify_response(response: HttpResponse) -> Result<Completion, TransportError> {
    if response.status == 429 {
        return Err(TransportError::RateLimited);
    }
    if !response.is_success() {
        return Err(TransportError::RequestFailed {
            status: response.status,
            body: response.body,
        });
    }

    let parsed: MessagesResponse =
        serde_json::from_str(&response.body).map_err(|_| TransportError::MalformedResponse)?;
    let text = parsed
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or(TransportError::MalformedResponse)?;
    let tokens = parsed.usage.map(|usage| usage.total()).unwrap_or(0);

    Ok(Completion { text, tokens })
}

/// Transport talking to the Anthropic Messages API.
pub struct AnthropicTransport<C: HttpClient = ReqwestHttpClient> {
    client: C,
    api_key: String,
    model: String,
    max_tokens: u32,
    endpoint: String,
}

impl AnthropicTransport<ReqwestHttpClient> {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(ReqwestHttpClient::new(), api_key)
    }
}

impl<C: HttpClient> AnthropicTransport<C> {
    pub fn with_client(client: C, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request(&self, problem: &str, attempt: u32, mode: PromptMode) -> serde_json::Value {
        let (system, user_prompt) = match mode {
            PromptMode::Degraded => (
                Some(persona::SYSTEM_PROMPT),
                persona::degraded_prompt(problem, attempt),
            ),
            PromptMode::Baseline => (None, problem.to_string()),
        };

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": user_prompt
                }
            ]
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        body
    }
}

#[async_trait]
impl<C: HttpClient> Transport for AnthropicTransport<C> {
    async fn complete(
        &self,
        problem: &str,
        attempt: u32,
        mode: PromptMode,
    ) -> Result<Completion, TransportError> {
        let body = self.build_request(problem, attempt, mode);
        info!("Calling {} ({:?} mode, attempt {})", self.model, mode, attempt);

        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("content-type", "application/json"),
            ("anthropic-version", ANTHROPIC_VERSION),
        ];
        let response = self
            .client
            .post_json(&self.endpoint, &headers, &body)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        debug!("API answered {}: {}", response.status, response.body);
        classify_response(response)
    }
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn complete(
        &self,
        problem: &str,
        attempt: u32,
        mode: PromptMode,
    ) -> Result<Completion, TransportError> {
        self.as_ref().complete(problem, attempt, mode).await
    }
}

/// Canned answers used in mock mode (`PATRICK_USE_MOCK`).
///
/// Lets the binary run end-to-end without a credential or network access.
pub struct MockTransport;

impl MockTransport {
    pub fn new() -> Self {
        Self
    }

    fn degraded_answer(attempt: u32) -> &'static str {
        match attempt {
            1 => "Turn it off and on again! *tries it* I'm helping! 🌟",
            2 => "Delete the cache! *pushes button* Oh, it worked!",
            3 => "Add a semicolon somewhere. Semicolons fix things.",
            _ => "Push it somewhere else! Firmly grasp it!",
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn complete(
        &self,
        problem: &str,
        attempt: u32,
        mode: PromptMode,
    ) -> Result<Completion, TransportError> {
        debug!("Mock {:?} answer for attempt {}", mode, attempt);
        let completion = match mode {
            PromptMode::Degraded => Completion {
                text: Self::degraded_answer(attempt).to_string(),
                tokens: 40 + u64::from(attempt),
            },
            PromptMode::Baseline => Completion {
                text: format!(
                    "Let me analyze \"{}\" carefully and weigh several approaches before choosing one.",
                    problem
                ),
                tokens: 120,
            },
        };
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::sync::Mutex;

    struct RecordedRequest {
        url: String,
        headers: Vec<(String, String)>,
        body: serde_json::Value,
    }

    /// Mock HTTP client for testing.
    ///
    /// Returns a predetermined response and records every request.
    struct MockHttpClient {
        response: Option<HttpResponse>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockHttpClient {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: Some(HttpResponse::new(status, body)),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                response: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_body(&self) -> serde_json::Value {
            self.requests.lock().unwrap().last().unwrap().body.clone()
        }

        fn last_header(&self, name: &str) -> Option<String> {
            let requests = self.requests.lock().unwrap();
            requests
                .last()
                .unwrap()
                .headers
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn post_json(
            &self,
            url: &str,
            headers: &[(&str, &str)],
            body: &serde_json::Value,
        ) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(RecordedRequest {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.clone(),
            });
            self.response
                .clone()
                .ok_or_else(|| anyhow!("connection refused"))
        }
    }

    const OK_BODY: &str = r#"{
        "content": [{"type": "text", "text": "Add an index!"}],
        "usage": {"total_tokens": 87}
    }"#;

    #[test]
    fn test_classify_success_reads_first_block_and_total_tokens() {
        let completion = classify_response(HttpResponse::new(200, OK_BODY)).unwrap();
        assert_eq!(completion.text, "Add an index!");
        assert_eq!(completion.tokens, 87);
    }

    #[test]
    fn test_classify_success_sums_input_and_output_tokens() {
        let body = r#"{
            "content": [{"type": "text", "text": "Restart it"}],
            "usage": {"input_tokens": 30, "output_tokens": 12}
        }"#;
        let completion = classify_response(HttpResponse::new(200, body)).unwrap();
        assert_eq!(completion.tokens, 42);
    }

    #[test]
    fn test_classify_success_without_usage_counts_zero_tokens() {
        let body = r#"{"content": [{"type": "text", "text": "Just try it"}]}"#;
        let completion = classify_response(HttpResponse::new(200, body)).unwrap();
        assert_eq!(completion.tokens, 0);
    }

    #[test]
    fn test_classify_429_is_rate_limited() {
        let result = classify_response(HttpResponse::new(429, "slow down"));
        assert_eq!(result, Err(TransportError::RateLimited));
    }

    #[test]
    fn test_classify_other_status_is_request_failed() {
        let result = classify_response(HttpResponse::new(529, "overloaded"));
        assert_eq!(
            result,
            Err(TransportError::RequestFailed {
                status: 529,
                body: "overloaded".to_string()
            })
        );
    }

    #[test]
    fn test_classify_non_json_success_is_malformed() {
        let result = classify_response(HttpResponse::new(200, "<html>"));
        assert_eq!(result, Err(TransportError::MalformedResponse));
    }

    #[test]
    fn test_classify_empty_content_is_malformed() {
        let result = classify_response(HttpResponse::new(200, r#"{"content": []}"#));
        assert_eq!(result, Err(TransportError::MalformedResponse));
    }

    #[test]
    fn test_classify_first_block_without_text_is_malformed() {
        let body = r#"{"content": [{"type": "tool_use", "id": "x"}]}"#;
        let result = classify_response(HttpResponse::new(200, body));
        assert_eq!(result, Err(TransportError::MalformedResponse));
    }

    #[tokio::test]
    async fn test_degraded_request_carries_persona_and_first_attempt_prompt() {
        let transport = AnthropicTransport::with_client(MockHttpClient::new(200, OK_BODY), "key");

        let completion = transport
            .complete("slow query", 1, PromptMode::Degraded)
            .await
            .unwrap();
        assert_eq!(completion.text, "Add an index!");

        let body = transport.client.last_body();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["system"], persona::SYSTEM_PROMPT);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(
            body["messages"][0]["content"],
            persona::degraded_prompt("slow query", 1)
        );
    }

    #[tokio::test]
    async fn test_degraded_request_on_later_attempt_asks_for_new_approach() {
        let transport = AnthropicTransport::with_client(MockHttpClient::new(200, OK_BODY), "key");

        transport
            .complete("slow query", 3, PromptMode::Degraded)
            .await
            .unwrap();

        let body = transport.client.last_body();
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.contains("COMPLETELY different"));
    }

    #[tokio::test]
    async fn test_baseline_request_sends_bare_problem_without_system() {
        let transport = AnthropicTransport::with_client(MockHttpClient::new(200, OK_BODY), "key")
            .model("claude-test")
            .max_tokens(64);

        transport
            .complete("slow query", 1, PromptMode::Baseline)
            .await
            .unwrap();

        let body = transport.client.last_body();
        assert!(body.get("system").is_none());
        assert_eq!(body["messages"][0]["content"], "slow query");
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 64);
    }

    #[tokio::test]
    async fn test_request_goes_to_configured_endpoint() {
        let transport = AnthropicTransport::with_client(MockHttpClient::new(200, OK_BODY), "key")
            .endpoint("http://localhost:9999/v1/messages");

        transport
            .complete("x", 1, PromptMode::Degraded)
            .await
            .unwrap();

        let requests = transport.client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://localhost:9999/v1/messages");
    }

    #[tokio::test]
    async fn test_request_sends_auth_version_and_content_type_headers() {
        let transport =
            AnthropicTransport::with_client(MockHttpClient::new(200, OK_BODY), "sk-ant-test");

        transport
            .complete("x", 1, PromptMode::Baseline)
            .await
            .unwrap();

        let client = &transport.client;
        assert_eq!(client.last_header("x-api-key").as_deref(), Some("sk-ant-test"));
        assert_eq!(
            client.last_header("anthropic-version").as_deref(),
            Some("2023-06-01")
        );
        assert_eq!(
            client.last_header("content-type").as_deref(),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let transport = AnthropicTransport::with_client(MockHttpClient::unreachable(), "key");

        let result = transport.complete("x", 1, PromptMode::Degraded).await;
        assert!(matches!(result, Err(TransportError::Network(msg)) if msg.contains("refused")));
    }

    #[tokio::test]
    async fn test_mock_transport_is_deterministic_per_attempt() {
        let transport = MockTransport::new();
        let first = transport.complete("bug", 1, PromptMode::Degraded).await.unwrap();
        let again = transport.complete("bug", 1, PromptMode::Degraded).await.unwrap();
        let second = transport.complete("bug", 2, PromptMode::Degraded).await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first.text, second.text);
        assert_eq!(first.tokens, 41);
    }

    #[tokio::test]
    async fn test_mock_transport_baseline_mentions_problem() {
        let completion = MockTransport::new()
            .complete("fix the bug", 1, PromptMode::Baseline)
            .await
            .unwrap();
        assert!(completion.text.contains("fix the bug"));
    }
}
