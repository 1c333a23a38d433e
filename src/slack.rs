//! Slack Web API client
//!
//! Covers the two calls the bot needs: `conversations.history` to pull
//! the scan window and `chat.postMessage` to reply in a thread.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SLACK_API_URL: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One message from the channel history.
///
/// Slack omits most of these fields on some message subtypes, so
/// everything defaults rather than failing the whole fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub reply_count: u32,
}

impl SlackMessage {
    /// Timestamp a reply must thread under. Top-level messages carry no
    /// `thread_ts`; replying to their own `ts` starts the thread.
    pub fn thread_anchor(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    error: Option<String>,
    needed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
    needed: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    token: &'a str,
    channel: &'a str,
    text: &'a str,
    thread_ts: &'a str,
}

/// Slack client.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: Client,
    bot_token: String,
    base_url: String,
}

impl SlackClient {
    /// Create client with a bot token.
    pub fn new<S: Into<String>>(bot_token: S) -> Result<Self> {
        let bot_token = bot_token.into();
        if bot_token.trim().is_empty() {
            return Err(Error::Config("Slack bot token is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent("slack-qa-bot/0.1.0")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::SlackTransport(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            bot_token,
            base_url: SLACK_API_URL.to_string(),
        })
    }

    /// Point the client at a different API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch channel messages with `ts >= oldest`.
    ///
    /// Returns the full message array on success, never partial data.
    pub async fn fetch_history(&self, channel: &str, oldest: i64) -> Result<Vec<SlackMessage>> {
        let oldest = oldest.to_string();
        let response = self
            .http
            .get(format!("{}/conversations.history", self.base_url))
            .query(&[("channel", channel), ("oldest", oldest.as_str())])
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .map_err(|e| Error::SlackTransport(format!("conversations.history: {}", e)))?;

        let text = response
            .text()
            .await
            .map_err(|e| Error::SlackTransport(format!("conversations.history: {}", e)))?;

        let history: HistoryResponse = serde_json::from_str(&text).map_err(|e| {
            Error::SlackTransport(format!("conversations.history returned invalid JSON: {}", e))
        })?;

        if !history.ok {
            return Err(api_error(history.error, history.needed));
        }

        Ok(history.messages)
    }

    /// Post `text` as a threaded reply under `thread_ts`.
    pub async fn post_thread_reply(
        &self,
        channel: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<()> {
        let body = PostMessageRequest {
            token: &self.bot_token,
            channel,
            text,
            thread_ts,
        };

        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::SlackTransport(format!("chat.postMessage: {}", e)))?;

        let raw = response
            .text()
            .await
            .map_err(|e| Error::SlackTransport(format!("chat.postMessage: {}", e)))?;

        let posted: PostMessageResponse = serde_json::from_str(&raw).map_err(|e| {
            Error::SlackTransport(format!("chat.postMessage returned invalid JSON: {}", e))
        })?;

        if !posted.ok {
            return Err(api_error(posted.error, posted.needed));
        }

        Ok(())
    }
}

fn api_error(error: Option<String>, needed: Option<String>) -> Error {
    Error::SlackApi {
        error: error.unwrap_or_else(|| "unknown_error".to_string()),
        needed: needed.unwrap_or_default(),
    }
}
