pub mod config;
pub mod error;
pub mod llm;
pub mod providers;
pub mod recency;
pub mod replies;
pub mod saved;
pub mod scoring;

use serde::{Deserialize, Serialize};

pub use error::ProviderError;
pub use providers::{ProviderChain, ResolvedBatch, SearchMethod, SourceKind};
pub use recency::time_ago;
pub use replies::{parse_replies, ReplyGenerator, ReplyRequest};
pub use saved::{JsonFileStore, MemoryStore, SavedItems, SavedStore};
pub use scoring::{viral_potential, FilterPipeline, RankingStrategy};

/// Upper bound on post length the prompts ask for. Not enforced on ingest.
pub const POST_CHAR_LIMIT: usize = 280;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub handle: String,
    pub avatar: String,
}

impl Author {
    pub fn from_handle(name: &str, handle: &str) -> Self {
        let handle = handle.trim().trim_start_matches('@').to_string();
        Self {
            name: name.trim().to_string(),
            avatar: avatar_url(&handle),
            handle,
        }
    }
}

pub fn avatar_url(handle: &str) -> String {
    format!("https://unavatar.io/x/{}", urlencoding::encode(handle))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub retweets: u64,
    #[serde(default)]
    pub views: u64,
}

impl Metrics {
    /// likes + 2*replies + 3*retweets. Threshold metric only; the viral
    /// scorer keeps its own formula.
    pub fn weighted_engagement(&self) -> u64 {
        self.likes
            .saturating_add(self.replies.saturating_mul(2))
            .saturating_add(self.retweets.saturating_mul(3))
    }
}

/// A candidate post as served to clients.
///
/// `posted_at` is the relative label computed at ingest ("5 minutes ago"),
/// serialized as `timestamp`. `is_saved` is derived from the saved-items
/// store at response time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: Author,
    pub content: String,
    #[serde(rename = "timestamp")]
    pub posted_at: String,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub viral_potential: u32,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_saved: bool,
}

impl Post {
    pub fn weighted_engagement(&self) -> u64 {
        self.metrics.weighted_engagement()
    }
}

/// Client-side narrowing criteria. Missing fields mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub min_engagement: u64,
    pub topics: Vec<String>,
    /// Advisory only: candidates carry no reply-relationship data.
    pub exclude_replies: bool,
    pub only_verified: bool,
    pub min_viral_potential: u32,
}

impl FilterCriteria {
    /// Natural-language search phrase handed to search-backed providers.
    pub fn search_query(&self) -> String {
        let topics: Vec<&str> = self
            .topics
            .iter()
            .map(|topic| topic.trim())
            .filter(|topic| !topic.is_empty())
            .collect();

        let mut query = if topics.is_empty() {
            "latest trending tweets".to_string()
        } else {
            format!("latest trending tweets about {}", topics.join(", "))
        };
        if self.only_verified {
            query.push_str(" from verified accounts");
        }
        query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Controversial,
    Humorous,
    Insightful,
}

impl ReplyKind {
    /// Positional order used when assigning parsed drafts.
    pub const ORDER: [ReplyKind; 3] = [
        ReplyKind::Controversial,
        ReplyKind::Humorous,
        ReplyKind::Insightful,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReplyKind::Controversial => "controversial",
            ReplyKind::Humorous => "humorous",
            ReplyKind::Insightful => "insightful",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOption {
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    pub content: String,
}

impl ReplyOption {
    pub fn new(kind: ReplyKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

pub fn stable_hash64(value: &str) -> u64 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}
