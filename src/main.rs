//! Slack Q&A bot CLI - main entry point
//!
//! One invocation performs one scan-and-answer run; scheduling is left
//! to an external cron.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use slack_qa_bot::{
    pipeline, Config, CompletionClient, EmptyChoicePolicy, Pacing, PayloadKind,
    PostFailurePolicy, SlackClient, TimeWindow,
};

#[derive(Parser)]
#[command(name = "slack-qa-bot")]
#[command(about = "Answers unanswered question posts in a Slack channel", long_about = None)]
#[command(version)]
struct Cli {
    /// Slack bot token (xoxb-...)
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    slack_bot_token: String,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,

    /// Target channel id
    #[arg(long, env = "SLACK_CHANNEL_ID")]
    channel: String,

    /// Completion model
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-3.5-turbo")]
    model: String,

    /// Max tokens forwarded to the completion API
    #[arg(long, env = "OPENAI_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Phrase that marks a post as a question
    #[arg(long, env = "QUESTION_MARKER", default_value = slack_qa_bot::config::QUESTION_MARKER)]
    question_marker: String,

    /// Scan window lower bound: midnight-today or previous-day-evening
    #[arg(long, env = "TIME_WINDOW", default_value = "previous-day-evening")]
    time_window: TimeWindow,

    /// Completion payload shape: chat or legacy-completions
    #[arg(long, env = "COMPLETION_PAYLOAD", default_value = "chat")]
    payload: PayloadKind,

    /// Empty choices handling: fallback-message or error
    #[arg(long, env = "EMPTY_CHOICE_POLICY", default_value = "fallback-message")]
    empty_choice_policy: EmptyChoicePolicy,

    /// Post failure handling: skip-candidate or abort-run
    #[arg(long, env = "POST_FAILURE_POLICY", default_value = "skip-candidate")]
    post_failure_policy: PostFailurePolicy,

    /// Maximum candidates answered per run
    #[arg(long, env = "ANSWER_LIMIT", default_value = "10")]
    limit: usize,

    /// Seconds to wait before each completion+reply cycle
    #[arg(long, env = "PACE_SECS", default_value = "60")]
    pace_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so clap's env-backed args can see it
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("slack_qa_bot=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::new(cli.slack_bot_token, cli.openai_api_key, cli.channel);
    config.model = cli.model;
    config.max_tokens = cli.max_tokens;
    config.question_marker = cli.question_marker;
    config.time_window = cli.time_window;
    config.payload_kind = cli.payload;
    config.empty_choice_policy = cli.empty_choice_policy;
    config.post_failure_policy = cli.post_failure_policy;
    config.answer_limit = cli.limit;
    config.pace = Duration::from_secs(cli.pace_secs);

    let slack = SlackClient::new(config.slack_bot_token.clone())?;
    let openai = CompletionClient::new(config.openai_api_key.clone(), config.model.clone())?
        .with_max_tokens(config.max_tokens)
        .with_payload_kind(config.payload_kind)
        .with_empty_choice_policy(config.empty_choice_policy);

    let pacing = if config.pace.is_zero() {
        Pacing::None
    } else {
        Pacing::Fixed(config.pace)
    };

    match pipeline::run(&config, &slack, &openai, pacing).await {
        Ok(summary) => {
            info!(
                fetched = summary.fetched,
                eligible = summary.eligible,
                answered = summary.answered,
                skipped = summary.skipped,
                "run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!("run aborted: {}", e);
            Err(e.into())
        }
    }
}
