//! Chat-completions HTTP client.
//!
//! Speaks the standard `/v1/chat/completions` shape: a `messages` array in,
//! `choices[0].message.content` plus a `usage` block out.  Any non-2xx
//! status or malformed body maps to [`MindError::Endpoint`].

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::MindError;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// A successful completion: the text plus the endpoint's token accounting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatOutcome {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Backend trait ─────────────────────────────────────────────────────────────

/// The decision service's seam to the completion endpoint.
///
/// The production implementation is [`ChatClient`]; tests substitute
/// scripted backends.  Arguments are owned so the returned future can
/// outlive the caller (it runs on the reasoning queue's worker).
pub trait ChatBackend: Send + Sync {
    fn dispatch(
        &self,
        system: String,
        user: String,
        max_tokens: u32,
    ) -> BoxFuture<'static, Result<ChatOutcome, MindError>>;
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Thin reqwest wrapper around the configured endpoint.
///
/// Cheap to clone (reqwest clients share their connection pool).
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(base_url: &str, temperature: f32) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            temperature,
        }
    }

    /// One system+user exchange.  Cancellation-safe: dropping the returned
    /// future aborts the underlying request.
    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<ChatOutcome, MindError> {
        let body = ChatRequest {
            messages: vec![
                WireMessage { role: "system", content: system },
                WireMessage { role: "user", content: user },
            ],
            temperature: self.temperature,
            max_tokens,
            stream: false,
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MindError::Endpoint(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MindError::Endpoint(format!("status {status}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| MindError::Endpoint(format!("malformed body: {e}")))?;

        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| MindError::Endpoint("no choices in response".into()))?;

        let usage = parsed.usage.unwrap_or_default();
        Ok(ChatOutcome {
            text,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

impl ChatBackend for ChatClient {
    fn dispatch(
        &self,
        system: String,
        user: String,
        max_tokens: u32,
    ) -> BoxFuture<'static, Result<ChatOutcome, MindError>> {
        let client = self.clone();
        Box::pin(async move { client.chat(&system, &user, max_tokens).await })
    }
}
