//! Reply drafting: prompt assembly, the model call, and splitting the
//! answer into the three reply kinds.

pub mod generator;
pub mod prompts;

use serde::{Deserialize, Serialize};

use crate::{ReplyKind, ReplyOption};

pub use generator::ReplyGenerator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub tweet_content: String,
    pub tweet_author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet_context: Option<String>,
}

impl ReplyRequest {
    pub fn new(content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            tweet_content: content.into(),
            tweet_author: author.into(),
            tweet_context: None,
        }
    }

    /// Context with surrounding whitespace removed, `None` when blank.
    pub fn context(&self) -> Option<&str> {
        self.tweet_context
            .as_deref()
            .map(str::trim)
            .filter(|context| !context.is_empty())
    }
}

/// Splits a generated answer into reply options.
///
/// Three blank-line separated paragraphs map positionally onto
/// [`ReplyKind::ORDER`]. Any other paragraph count falls back to cutting
/// the non-empty lines into three contiguous chunks of `ceil(lines / 3)`,
/// each joined with single spaces. Chunks that come out empty are dropped,
/// so the result holds zero to three options.
pub fn parse_replies(content: &str) -> Vec<ReplyOption> {
    let paragraphs: Vec<&str> = content
        .split("\n\n")
        .filter(|paragraph| !paragraph.trim().is_empty())
        .collect();

    if paragraphs.len() == ReplyKind::ORDER.len() {
        return ReplyKind::ORDER
            .iter()
            .zip(paragraphs)
            .map(|(kind, paragraph)| ReplyOption::new(*kind, paragraph.trim()))
            .collect();
    }

    let lines: Vec<&str> = content
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();
    let chunk = lines.len().div_ceil(ReplyKind::ORDER.len());

    let mut replies = Vec::new();
    for (index, kind) in ReplyKind::ORDER.iter().enumerate() {
        let start = (index * chunk).min(lines.len());
        let end = (start + chunk).min(lines.len());
        let joined = lines[start..end].join(" ");
        let text = joined.trim();
        if !text.is_empty() {
            replies.push(ReplyOption::new(*kind, text));
        }
    }
    replies
}
