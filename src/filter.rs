//! Question filter and timestamp ordering
//!
//! A message is eligible when its text carries the question marker and
//! nobody has replied to it yet. Eligibility is judged at fetch time, so
//! a reply posted by a previous run that Slack has not yet counted will
//! make the same message eligible again.

use crate::slack::SlackMessage;

/// True iff `text` contains the question marker phrase.
pub fn is_question(text: &str, marker: &str) -> bool {
    text.contains(marker)
}

/// True iff the message is a question with zero replies.
pub fn is_eligible(message: &SlackMessage, marker: &str) -> bool {
    is_question(&message.text, marker) && message.reply_count == 0
}

/// Keep only eligible messages, preserving fetch order.
pub fn filter_eligible(messages: Vec<SlackMessage>, marker: &str) -> Vec<SlackMessage> {
    messages
        .into_iter()
        .filter(|m| is_eligible(m, marker))
        .collect()
}

/// Stable ascending sort by `ts` parsed as a float. Unparseable
/// timestamps compare as not-less-than anything and drift to the end.
pub fn sort_by_ts(messages: &mut [SlackMessage]) {
    use std::cmp::Ordering;

    messages.sort_by(|a, b| {
        match (a.ts.parse::<f64>(), b.ts.parse::<f64>()) {
            (Ok(ta), Ok(tb)) => ta.partial_cmp(&tb).unwrap_or(Ordering::Equal),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => Ordering::Equal,
        }
    });
}
