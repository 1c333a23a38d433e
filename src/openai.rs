//! OpenAI completion client
//!
//! Supports both the chat-completions payload and the legacy prompt
//! completion payload; only the first returned choice is used.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

// Generations can be slow; the run is a batch job, so wait long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(900);

/// Posted when the API returns no choices and the policy is
/// `FallbackMessage`. Kept verbatim from the production bot.
pub const FALLBACK_MESSAGE: &str =
    "APIからのレスポンスがありませんでした。APIのレート制限にひっかかった可能性がありんす。";

/// Request body shape sent to the completion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// `/chat/completions` with a role/content message list.
    Chat,
    /// `/completions` with a bare prompt string.
    LegacyCompletions,
}

impl FromStr for PayloadKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chat" => Ok(PayloadKind::Chat),
            "legacy-completions" | "legacy" => Ok(PayloadKind::LegacyCompletions),
            other => Err(Error::Config(format!(
                "unknown payload kind: {} (expected chat or legacy-completions)",
                other
            ))),
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Chat => write!(f, "chat"),
            PayloadKind::LegacyCompletions => write!(f, "legacy-completions"),
        }
    }
}

/// What an empty `choices` array means. Both outcomes are terminal and
/// deliberate; an empty success with no text is never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyChoicePolicy {
    /// Treat as success and answer with [`FALLBACK_MESSAGE`].
    FallbackMessage,
    /// Treat as a hard `NoCompletionChoices` error.
    Error,
}

impl FromStr for EmptyChoicePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fallback-message" | "fallback" => Ok(EmptyChoicePolicy::FallbackMessage),
            "error" => Ok(EmptyChoicePolicy::Error),
            other => Err(Error::Config(format!(
                "unknown empty choice policy: {} (expected fallback-message or error)",
                other
            ))),
        }
    }
}

impl fmt::Display for EmptyChoicePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyChoicePolicy::FallbackMessage => write!(f, "fallback-message"),
            EmptyChoicePolicy::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct LegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyResponse {
    #[serde(default)]
    choices: Vec<LegacyChoice>,
}

#[derive(Debug, Deserialize)]
struct LegacyChoice {
    text: Option<String>,
}

/// OpenAI client.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    payload_kind: PayloadKind,
    empty_choice_policy: EmptyChoicePolicy,
}

impl CompletionClient {
    /// Create client with an API key and model; knobs default to the
    /// chat payload and the fallback-message policy.
    pub fn new<S: Into<String>>(api_key: S, model: S) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("OpenAI API key is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent("slack-qa-bot/0.1.0")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::OpenAi(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            model: model.into(),
            max_tokens: None,
            payload_kind: PayloadKind::Chat,
            empty_choice_policy: EmptyChoicePolicy::FallbackMessage,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_payload_kind(mut self, payload_kind: PayloadKind) -> Self {
        self.payload_kind = payload_kind;
        self
    }

    pub fn with_empty_choice_policy(mut self, policy: EmptyChoicePolicy) -> Self {
        self.empty_choice_policy = policy;
        self
    }

    /// Point the client at a different API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send `prompt` and return the first choice's text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let answer = match self.payload_kind {
            PayloadKind::Chat => self.complete_chat(prompt).await?,
            PayloadKind::LegacyCompletions => self.complete_legacy(prompt).await?,
        };

        match answer {
            Some(text) => Ok(text),
            None => match self.empty_choice_policy {
                EmptyChoicePolicy::FallbackMessage => Ok(FALLBACK_MESSAGE.to_string()),
                EmptyChoicePolicy::Error => Err(Error::NoCompletionChoices),
            },
        }
    }

    async fn complete_chat(&self, prompt: &str) -> Result<Option<String>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
        };

        let body = self.send("/chat/completions", &request).await?;
        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| Error::OpenAi(format!("Invalid response: {}", e)))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }

    async fn complete_legacy(&self, prompt: &str) -> Result<Option<String>> {
        let request = LegacyRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
        };

        let body = self.send("/completions", &request).await?;
        let response: LegacyResponse = serde_json::from_str(&body)
            .map_err(|e| Error::OpenAi(format!("Invalid response: {}", e)))?;

        Ok(response.choices.into_iter().next().and_then(|c| c.text))
    }

    async fn send<T: Serialize>(&self, path: &str, request: &T) -> Result<String> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::OpenAi(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::OpenAi(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::OpenAi(format!("OpenAI error {}: {}", status, text)));
        }

        Ok(text)
    }
}
