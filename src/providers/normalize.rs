//! Maps loosely-shaped provider payloads onto [`Post`].
//!
//! Each provider declares the field names it accepts for every concept.
//! Dotted names address nested objects (`metrics.likes`). Strings take the
//! first non-empty alias, counts the first positive one, flags are set when
//! any alias is truthy. Missing counts default to 0, missing flags to false.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::recency::time_ago;
use crate::scoring::viral_potential;
use crate::{stable_hash64, Author, Metrics, Post, ProviderError, SourceKind};

#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub author_name: &'static [&'static str],
    pub author_handle: &'static [&'static str],
    pub verified: &'static [&'static str],
    pub content: &'static [&'static str],
    pub posted_at: &'static [&'static str],
    pub likes: &'static [&'static str],
    pub replies: &'static [&'static str],
    pub retweets: &'static [&'static str],
    pub views: &'static [&'static str],
    pub trending: &'static [&'static str],
}

/// `twitter_trends` json-schema output: metrics nested under `metrics`.
pub const STRUCTURED_ALIASES: FieldAliases = FieldAliases {
    author_name: &["author_name"],
    author_handle: &["author_handle"],
    verified: &["author_verified"],
    content: &["content"],
    posted_at: &["posted_at"],
    likes: &["metrics.likes", "likes"],
    replies: &["metrics.replies", "replies"],
    retweets: &["metrics.retweets", "retweets"],
    views: &["metrics.views", "views"],
    trending: &["metrics.trending", "trending"],
};

/// `get_trending_tweets` arguments: flat metrics, `is_trending`.
pub const FUNCTION_CALL_ALIASES: FieldAliases = FieldAliases {
    author_name: &["author_name"],
    author_handle: &["author_handle"],
    verified: &["author_verified"],
    content: &["content"],
    posted_at: &["posted_at"],
    likes: &["likes", "metrics.likes"],
    replies: &["replies", "metrics.replies"],
    retweets: &["retweets", "metrics.retweets"],
    views: &["views", "metrics.views"],
    trending: &["is_trending", "trending"],
};

/// Free-form model output: snake_case, camelCase and nested author objects.
pub const TOOL_AUGMENTED_ALIASES: FieldAliases = FieldAliases {
    author_name: &["author_name", "authorName", "author.name", "name"],
    author_handle: &["author_handle", "authorHandle", "author.handle", "username", "handle"],
    verified: &[
        "author_verified",
        "authorVerified",
        "is_verified",
        "isVerified",
        "verified",
        "author.verified",
    ],
    content: &["content", "text"],
    posted_at: &["posted_at", "postedAt", "timestamp", "created_at"],
    likes: &["likes", "metrics.likes"],
    replies: &["replies", "metrics.replies"],
    retweets: &["retweets", "metrics.retweets"],
    views: &["views", "metrics.views"],
    trending: &["is_trending", "isTrending", "trending", "metrics.trending"],
};

/// Pulls the post array out of `{ "<field>": [...] }`.
pub fn items_under(payload: Value, field: &'static str) -> Result<Vec<Value>, ProviderError> {
    match payload {
        Value::Object(mut object) => match object.remove(field) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ProviderError::MissingField(field)),
        },
        _ => Err(ProviderError::MissingField(field)),
    }
}

/// Normalizes every object in `items`. Non-object entries are skipped; a
/// batch with nothing usable is an [`ProviderError::EmptyResult`].
pub fn normalize_posts(
    items: &[Value],
    aliases: &FieldAliases,
    source: SourceKind,
    now: DateTime<Utc>,
) -> Result<Vec<Post>, ProviderError> {
    let posts: Vec<Post> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| normalize_post(item, index, aliases, source, now))
        .collect();
    if posts.is_empty() {
        return Err(ProviderError::EmptyResult);
    }
    Ok(posts)
}

pub fn normalize_post(
    item: &Value,
    index: usize,
    aliases: &FieldAliases,
    source: SourceKind,
    now: DateTime<Utc>,
) -> Option<Post> {
    if !item.is_object() {
        return None;
    }

    let name = string_field(item, aliases.author_name).unwrap_or_default();
    let handle = string_field(item, aliases.author_handle).unwrap_or_default();
    let content = string_field(item, aliases.content).unwrap_or_default();
    let posted_at = string_field(item, aliases.posted_at)
        .map(|value| time_ago(&value, now))
        .unwrap_or_else(|| "just now".to_string());

    let metrics = Metrics {
        likes: count_field(item, aliases.likes),
        replies: count_field(item, aliases.replies),
        retweets: count_field(item, aliases.retweets),
        views: count_field(item, aliases.views),
    };
    let trending = flag_field(item, aliases.trending);
    let author = Author::from_handle(&name, &handle);
    let id = format!(
        "{}-{}-{:x}",
        source.id_prefix(),
        index,
        stable_hash64(&format!("{}:{}", author.handle, content))
    );

    Some(Post {
        id,
        author,
        content,
        posted_at,
        viral_potential: viral_potential(&metrics, trending),
        metrics,
        is_verified: flag_field(item, aliases.verified),
        is_saved: false,
    })
}

fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(item, |value, key| value.get(key))
        .filter(|value| !value.is_null())
}

fn string_field(item: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match lookup(item, alias) {
        Some(Value::String(value)) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    })
}

fn count_field(item: &Value, aliases: &[&str]) -> u64 {
    aliases
        .iter()
        .filter_map(|alias| lookup(item, alias).and_then(parse_count))
        .find(|count| *count > 0)
        .unwrap_or(0)
}

fn flag_field(item: &Value, aliases: &[&str]) -> bool {
    aliases.iter().any(|alias| match lookup(item, alias) {
        Some(Value::Bool(value)) => *value,
        Some(Value::String(value)) => matches!(
            value.trim().to_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        Some(Value::Number(value)) => value.as_f64().map(|n| n != 0.0).unwrap_or(false),
        _ => false,
    })
}

/// Reads a non-negative count from a JSON number or a display string such
/// as `"1,204"`, `"3.4K"` or `"1.2M"`.
pub fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_f64().and_then(non_negative_count),
        Value::String(text) => parse_count_text(text),
        _ => None,
    }
}

fn parse_count_text(text: &str) -> Option<u64> {
    let cleaned: String = text
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != ',' && *ch != '_')
        .collect::<String>()
        .to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    let (digits, multiplier) = match cleaned.chars().last() {
        Some('k') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        Some('m') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        Some('b') => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    digits
        .parse::<f64>()
        .ok()
        .and_then(|value| non_negative_count(value * multiplier))
}

fn non_negative_count(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 {
        Some(value.round() as u64)
    } else {
        None
    }
}
