//! Slack Q&A Auto-answer Bot Library
//!
//! This library provides the pieces of a scheduled batch bot that:
//! - Scans a Slack channel for unanswered question posts
//! - Forwards each question to an OpenAI completion endpoint
//! - Posts the generated answer back as a threaded reply
//!
//! One invocation is one run: no persistent process, no stored state
//! between runs, no concurrency beyond sequential iteration with a
//! fixed pacing delay.

pub mod config;
pub mod error;
pub mod filter;
pub mod openai;
pub mod pipeline;
pub mod slack;
pub mod window;

// Re-export common types
pub use config::{Config, PostFailurePolicy};
pub use error::{Error, Result};
pub use openai::{CompletionClient, EmptyChoicePolicy, PayloadKind, FALLBACK_MESSAGE};
pub use pipeline::{run, Pacing, RunSummary};
pub use slack::{SlackClient, SlackMessage};
pub use window::TimeWindow;
