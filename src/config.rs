//! Configuration for the Slack Q&A bot
//!
//! All credentials and pipeline knobs live in an explicit `Config` struct
//! built at startup and passed by parameter into each collaborator.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::openai::{EmptyChoicePolicy, PayloadKind};
use crate::window::TimeWindow;

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Marker phrase used to detect question posts ("this is a question").
pub const QUESTION_MARKER: &str = "質問です";

/// Maximum number of candidates answered per run.
pub const DEFAULT_ANSWER_LIMIT: usize = 10;

/// Fixed delay between successive completion+reply cycles.
pub const DEFAULT_PACE_SECS: u64 = 60;

/// What to do when posting a threaded reply fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFailurePolicy {
    /// Log the failure and move on to the next candidate.
    SkipCandidate,
    /// Abort the whole run on the first failed post.
    AbortRun,
}

impl FromStr for PostFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip-candidate" | "skip" => Ok(PostFailurePolicy::SkipCandidate),
            "abort-run" | "abort" => Ok(PostFailurePolicy::AbortRun),
            other => Err(Error::Config(format!(
                "unknown post failure policy: {} (expected skip-candidate or abort-run)",
                other
            ))),
        }
    }
}

impl fmt::Display for PostFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostFailurePolicy::SkipCandidate => write!(f, "skip-candidate"),
            PostFailurePolicy::AbortRun => write!(f, "abort-run"),
        }
    }
}

/// Main configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    pub slack_bot_token: String,
    pub openai_api_key: String,
    pub channel_id: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub question_marker: String,
    pub time_window: TimeWindow,
    pub payload_kind: PayloadKind,
    pub empty_choice_policy: EmptyChoicePolicy,
    pub post_failure_policy: PostFailurePolicy,
    pub answer_limit: usize,
    pub pace: Duration,
}

impl Config {
    /// Build configuration from environment variables.
    ///
    /// `SLACK_BOT_TOKEN`, `OPENAI_API_KEY` and `SLACK_CHANNEL_ID` are
    /// required; missing credentials fail here instead of surfacing as
    /// auth errors three network calls later. The pipeline knobs are
    /// optional overrides (`OPENAI_MODEL`, `OPENAI_MAX_TOKENS`,
    /// `QUESTION_MARKER`, `TIME_WINDOW`, `COMPLETION_PAYLOAD`,
    /// `EMPTY_CHOICE_POLICY`, `POST_FAILURE_POLICY`, `ANSWER_LIMIT`,
    /// `PACE_SECS`); blank values are ignored, malformed ones fail.
    pub fn from_env() -> Result<Self> {
        let slack_bot_token = require_env("SLACK_BOT_TOKEN")?;
        let openai_api_key = require_env("OPENAI_API_KEY")?;
        let channel_id = require_env("SLACK_CHANNEL_ID")?;
        let mut config = Self::new(slack_bot_token, openai_api_key, channel_id);

        if let Some(model) = optional_env("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(raw) = optional_env("OPENAI_MAX_TOKENS") {
            config.max_tokens = Some(parse_env("OPENAI_MAX_TOKENS", &raw)?);
        }
        if let Some(marker) = optional_env("QUESTION_MARKER") {
            config.question_marker = marker;
        }
        if let Some(raw) = optional_env("TIME_WINDOW") {
            config.time_window = raw.parse()?;
        }
        if let Some(raw) = optional_env("COMPLETION_PAYLOAD") {
            config.payload_kind = raw.parse()?;
        }
        if let Some(raw) = optional_env("EMPTY_CHOICE_POLICY") {
            config.empty_choice_policy = raw.parse()?;
        }
        if let Some(raw) = optional_env("POST_FAILURE_POLICY") {
            config.post_failure_policy = raw.parse()?;
        }
        if let Some(raw) = optional_env("ANSWER_LIMIT") {
            config.answer_limit = parse_env("ANSWER_LIMIT", &raw)?;
        }
        if let Some(raw) = optional_env("PACE_SECS") {
            config.pace = Duration::from_secs(parse_env("PACE_SECS", &raw)?);
        }

        Ok(config)
    }

    /// Create configuration with default pipeline knobs.
    pub fn new(
        slack_bot_token: impl Into<String>,
        openai_api_key: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            slack_bot_token: slack_bot_token.into(),
            openai_api_key: openai_api_key.into(),
            channel_id: channel_id.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            question_marker: QUESTION_MARKER.to_string(),
            time_window: TimeWindow::PreviousDayEvening,
            payload_kind: PayloadKind::Chat,
            empty_choice_policy: EmptyChoicePolicy::FallbackMessage,
            post_failure_policy: PostFailurePolicy::SkipCandidate,
            answer_limit: DEFAULT_ANSWER_LIMIT,
            pace: Duration::from_secs(DEFAULT_PACE_SECS),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{} not set", key))),
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::Config(format!("invalid {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("xoxb-token", "sk-key", "C0123456");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.question_marker, QUESTION_MARKER);
        assert_eq!(config.answer_limit, DEFAULT_ANSWER_LIMIT);
        assert_eq!(config.pace, Duration::from_secs(DEFAULT_PACE_SECS));
        assert_eq!(config.time_window, TimeWindow::PreviousDayEvening);
        assert_eq!(config.payload_kind, PayloadKind::Chat);
        assert_eq!(config.empty_choice_policy, EmptyChoicePolicy::FallbackMessage);
        assert_eq!(config.post_failure_policy, PostFailurePolicy::SkipCandidate);
        assert!(config.max_tokens.is_none());
    }

    #[test]
    fn test_from_env_reads_credentials() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::set("SLACK_BOT_TOKEN", "xoxb-abc"),
            EnvGuard::set("OPENAI_API_KEY", "sk-def"),
            EnvGuard::set("SLACK_CHANNEL_ID", "C0HI"),
        ];

        let config = Config::from_env().unwrap();
        assert_eq!(config.slack_bot_token, "xoxb-abc");
        assert_eq!(config.openai_api_key, "sk-def");
        assert_eq!(config.channel_id, "C0HI");
    }

    #[test]
    fn test_from_env_applies_optional_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::set("SLACK_BOT_TOKEN", "xoxb-abc"),
            EnvGuard::set("OPENAI_API_KEY", "sk-def"),
            EnvGuard::set("SLACK_CHANNEL_ID", "C0HI"),
            EnvGuard::set("OPENAI_MODEL", "gpt-4o-mini"),
            EnvGuard::set("OPENAI_MAX_TOKENS", "256"),
            EnvGuard::set("QUESTION_MARKER", "Q:"),
            EnvGuard::set("TIME_WINDOW", "midnight-today"),
            EnvGuard::set("COMPLETION_PAYLOAD", "legacy-completions"),
            EnvGuard::set("EMPTY_CHOICE_POLICY", "error"),
            EnvGuard::set("POST_FAILURE_POLICY", "abort-run"),
            EnvGuard::set("ANSWER_LIMIT", "3"),
            EnvGuard::set("PACE_SECS", "0"),
        ];

        let config = Config::from_env().unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, Some(256));
        assert_eq!(config.question_marker, "Q:");
        assert_eq!(config.time_window, TimeWindow::MidnightToday);
        assert_eq!(config.payload_kind, PayloadKind::LegacyCompletions);
        assert_eq!(config.empty_choice_policy, EmptyChoicePolicy::Error);
        assert_eq!(config.post_failure_policy, PostFailurePolicy::AbortRun);
        assert_eq!(config.answer_limit, 3);
        assert_eq!(config.pace, Duration::ZERO);
    }

    #[test]
    fn test_from_env_ignores_blank_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::set("SLACK_BOT_TOKEN", "xoxb-abc"),
            EnvGuard::set("OPENAI_API_KEY", "sk-def"),
            EnvGuard::set("SLACK_CHANNEL_ID", "C0HI"),
            EnvGuard::set("OPENAI_MODEL", "   "),
            EnvGuard::unset("ANSWER_LIMIT"),
        ];

        let config = Config::from_env().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.answer_limit, DEFAULT_ANSWER_LIMIT);
    }

    #[test]
    fn test_from_env_rejects_malformed_override() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::set("SLACK_BOT_TOKEN", "xoxb-abc"),
            EnvGuard::set("OPENAI_API_KEY", "sk-def"),
            EnvGuard::set("SLACK_CHANNEL_ID", "C0HI"),
            EnvGuard::set("ANSWER_LIMIT", "many"),
        ];

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("ANSWER_LIMIT"));
    }

    #[test]
    fn test_from_env_fails_on_missing_token() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::unset("SLACK_BOT_TOKEN"),
            EnvGuard::set("OPENAI_API_KEY", "sk-def"),
            EnvGuard::set("SLACK_CHANNEL_ID", "C0HI"),
        ];

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("SLACK_BOT_TOKEN"));
    }

    #[test]
    fn test_from_env_rejects_blank_credential() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::set("SLACK_BOT_TOKEN", "   "),
            EnvGuard::set("OPENAI_API_KEY", "sk-def"),
            EnvGuard::set("SLACK_CHANNEL_ID", "C0HI"),
        ];

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn test_post_failure_policy_from_str() {
        assert_eq!(
            "skip-candidate".parse::<PostFailurePolicy>().unwrap(),
            PostFailurePolicy::SkipCandidate
        );
        assert_eq!(
            "abort-run".parse::<PostFailurePolicy>().unwrap(),
            PostFailurePolicy::AbortRun
        );
        assert!("retry".parse::<PostFailurePolicy>().is_err());
    }

    #[test]
    fn test_post_failure_policy_display_round_trips() {
        for policy in [PostFailurePolicy::SkipCandidate, PostFailurePolicy::AbortRun] {
            let parsed: PostFailurePolicy = policy.to_string().parse().unwrap();
            assert_eq!(parsed, policy);
        }
    }
}
