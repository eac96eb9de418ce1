use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use crate::llm::LlmClient;
use crate::providers::normalize::{items_under, normalize_posts, STRUCTURED_ALIASES};
use crate::providers::{CandidateProvider, SourceKind};
use crate::{FilterCriteria, Post, ProviderError};

/// Web search through the responses API, answered in a strict JSON schema.
#[derive(Clone)]
pub struct StructuredSearchProvider {
    llm: Option<LlmClient>,
    model: String,
}

impl StructuredSearchProvider {
    pub fn new(llm: Option<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    fn request(&self, criteria: &FilterCriteria) -> Value {
        json!({
            "model": self.model,
            "tools": [{ "type": "web_search_preview" }],
            "input": format!(
                "Search the web for {}. Find the most engaging and trending posts on Twitter/X. \
                 For each post, extract the author name, username, post content, approximate timestamp, \
                 and engagement metrics (likes, replies, retweets, views if available).",
                criteria.search_query()
            ),
            "text": {
                "format": {
                    "name": "twitter_trends",
                    "type": "json_schema",
                    "schema": trends_schema(),
                    "strict": true
                }
            }
        })
    }
}

#[async_trait]
impl CandidateProvider for StructuredSearchProvider {
    fn source(&self) -> SourceKind {
        SourceKind::Structured
    }

    async fn fetch(&self, criteria: &FilterCriteria) -> Result<Vec<Post>, ProviderError> {
        let llm = self
            .llm
            .as_ref()
            .ok_or(ProviderError::NotConfigured("AIML_API_KEY"))?;

        debug!(query = %criteria.search_query(), "structured search");
        let body = llm.respond(&self.request(criteria)).await?;
        let text = body.text().ok_or(ProviderError::MissingField("output_text"))?;
        let payload: Value = serde_json::from_str(text.trim())?;
        let items = items_under(payload, "tweets")?;
        normalize_posts(&items, &STRUCTURED_ALIASES, SourceKind::Structured, Utc::now())
    }
}

fn trends_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tweets": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "author_name": { "type": "string" },
                        "author_handle": { "type": "string" },
                        "author_verified": { "type": "boolean" },
                        "content": { "type": "string" },
                        "posted_at": { "type": "string" },
                        "metrics": {
                            "type": "object",
                            "properties": {
                                "likes": { "type": "number" },
                                "replies": { "type": "number" },
                                "retweets": { "type": "number" },
                                "views": { "type": "number" },
                                "trending": { "type": "boolean" }
                            },
                            "required": ["likes", "replies", "retweets", "views", "trending"],
                            "additionalProperties": false
                        }
                    },
                    "required": ["author_name", "author_handle", "author_verified", "content", "posted_at", "metrics"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["tweets"],
        "additionalProperties": false
    })
}
