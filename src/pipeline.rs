//! The answer pipeline
//!
//! One run: fetch the window, filter unanswered questions, sort them
//! oldest-first, then answer each in turn with a pacing delay in front
//! of every completion+reply cycle. Strictly sequential; the process is
//! a batch job driven by an external scheduler.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::{Config, PostFailurePolicy};
use crate::error::Result;
use crate::filter::{filter_eligible, sort_by_ts};
use crate::openai::CompletionClient;
use crate::slack::SlackClient;
use crate::window::CHANNEL_TZ;

/// Delay inserted before each completion+reply cycle.
///
/// Crude client-side rate limiting against both APIs; not adaptive.
/// Tests use `Pacing::None` to run without real sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    None,
    Fixed(Duration),
}

impl Pacing {
    pub async fn wait(&self) {
        match self {
            Pacing::None => {}
            Pacing::Fixed(delay) => tokio::time::sleep(*delay).await,
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Messages returned by the history fetch.
    pub fetched: usize,
    /// Messages that passed the question filter.
    pub eligible: usize,
    /// Replies successfully posted.
    pub answered: usize,
    /// Candidates dropped after a completion or post failure.
    pub skipped: usize,
}

/// Execute one run of the pipeline.
///
/// Fetch and config failures abort the run; per-candidate failures are
/// logged and handled per the configured policies.
pub async fn run(
    config: &Config,
    slack: &SlackClient,
    openai: &CompletionClient,
    pacing: Pacing,
) -> Result<RunSummary> {
    let now = Utc::now().with_timezone(&CHANNEL_TZ);
    let oldest = config.time_window.oldest_ts(now);
    info!(channel = %config.channel_id, oldest, window = %config.time_window, "fetching channel history");

    let messages = slack.fetch_history(&config.channel_id, oldest).await?;
    let fetched = messages.len();

    let mut candidates = filter_eligible(messages, &config.question_marker);
    sort_by_ts(&mut candidates);
    let eligible = candidates.len();
    candidates.truncate(config.answer_limit);

    info!(fetched, eligible, limit = config.answer_limit, "scan complete");

    let mut summary = RunSummary {
        fetched,
        eligible,
        ..RunSummary::default()
    };

    for message in &candidates {
        pacing.wait().await;

        let answer = match openai.complete(&message.text).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(ts = %message.ts, "completion failed: {}", e);
                summary.skipped += 1;
                continue;
            }
        };

        let reply = format!("<@{}>\n{}", message.user, answer);
        match slack
            .post_thread_reply(&config.channel_id, message.thread_anchor(), &reply)
            .await
        {
            Ok(()) => {
                info!(ts = %message.ts, "posted threaded reply");
                summary.answered += 1;
            }
            Err(e) => match config.post_failure_policy {
                PostFailurePolicy::SkipCandidate => {
                    warn!(ts = %message.ts, "post failed, skipping candidate: {}", e);
                    summary.skipped += 1;
                }
                PostFailurePolicy::AbortRun => {
                    warn!(ts = %message.ts, "post failed, aborting run: {}", e);
                    return Err(e);
                }
            },
        }
    }

    Ok(summary)
}
