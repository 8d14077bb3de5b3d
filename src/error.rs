//! Typed errors for the transport and the orchestrator.

use thiserror::Error;

/// Classified failure of a single exchange with the generation API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The API answered 429 Too Many Requests.
    #[error("rate limited by the API (429 Too Many Requests)")]
    RateLimited,

    /// Any other non-2xx answer.
    #[error("API error: {status} - {body}")]
    RequestFailed { status: u16, body: String },

    /// A 2xx answer whose body does not carry a text content block.
    #[error("failed to parse API response")]
    MalformedResponse,

    /// No HTTP answer was received at all.
    #[error("request failed: {0}")]
    Network(String),
}

impl TransportError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::RateLimited)
    }
}

#[derive(Debug, Error)]
pub enum PatrickError {
    #[error(
        "No Anthropic API key found. Please set it using one of these methods:

1. Set API key in config:
   patrick config --set-api-key sk-ant-your-key-here

2. Set environment variable:
   export ANTHROPIC_API_KEY=sk-ant-your-key-here

3. Check current config:
   patrick config

Get your API key from: https://console.anthropic.com"
    )]
    MissingCredential,

    #[error(transparent)]
    Transport(#[from] TransportError),
}
