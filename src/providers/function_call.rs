use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use crate::llm::LlmClient;
use crate::providers::normalize::{items_under, normalize_posts, FUNCTION_CALL_ALIASES};
use crate::providers::{CandidateProvider, SourceKind};
use crate::{FilterCriteria, Post, ProviderError};

const FUNCTION_NAME: &str = "get_trending_tweets";

/// Web search through the responses API with a forced function call whose
/// arguments carry the posts.
#[derive(Clone)]
pub struct FunctionCallProvider {
    llm: Option<LlmClient>,
    model: String,
}

impl FunctionCallProvider {
    pub fn new(llm: Option<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    fn request(&self, criteria: &FilterCriteria) -> Value {
        json!({
            "model": self.model,
            "tools": [{ "type": "web_search_preview" }, trending_tweets_tool()],
            "tool_choice": { "type": "function", "name": FUNCTION_NAME },
            "input": format!(
                "Search the web for {}. Find the most engaging and trending posts on Twitter/X. \
                 For each post, extract the author information, content, timestamp, and engagement metrics.",
                criteria.search_query()
            )
        })
    }
}

#[async_trait]
impl CandidateProvider for FunctionCallProvider {
    fn source(&self) -> SourceKind {
        SourceKind::FunctionCall
    }

    async fn fetch(&self, criteria: &FilterCriteria) -> Result<Vec<Post>, ProviderError> {
        let llm = self
            .llm
            .as_ref()
            .ok_or(ProviderError::NotConfigured("AIML_API_KEY"))?;

        debug!(query = %criteria.search_query(), "function-call search");
        let body = llm.respond(&self.request(criteria)).await?;
        let arguments = body
            .function_arguments(FUNCTION_NAME)
            .ok_or(ProviderError::MissingField("function_call arguments"))?;
        let payload: Value = serde_json::from_str(arguments)?;
        let items = items_under(payload, "tweets")?;
        normalize_posts(&items, &FUNCTION_CALL_ALIASES, SourceKind::FunctionCall, Utc::now())
    }
}

fn trending_tweets_tool() -> Value {
    json!({
        "type": "function",
        "name": FUNCTION_NAME,
        "description": "Fetch trending tweets based on given criteria",
        "parameters": {
            "type": "object",
            "properties": {
                "tweets": {
                    "type": "array",
                    "description": "List of trending tweets",
                    "items": {
                        "type": "object",
                        "properties": {
                            "author_name": { "type": "string", "description": "Full name of the tweet author" },
                            "author_handle": { "type": "string", "description": "Twitter/X handle of the author (without @)" },
                            "author_verified": { "type": "boolean", "description": "Whether the author is verified" },
                            "content": { "type": "string", "description": "Content/text of the tweet" },
                            "posted_at": { "type": "string", "description": "Timestamp when the tweet was posted (ISO format or approximate like '2 hours ago')" },
                            "likes": { "type": "number", "description": "Number of likes on the tweet" },
                            "replies": { "type": "number", "description": "Number of replies on the tweet" },
                            "retweets": { "type": "number", "description": "Number of retweets" },
                            "views": { "type": "number", "description": "Number of views, if available" },
                            "is_trending": { "type": "boolean", "description": "Whether the tweet is trending" }
                        },
                        "required": [
                            "author_name", "author_handle", "author_verified", "content", "posted_at",
                            "likes", "replies", "retweets", "views", "is_trending"
                        ],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["tweets"],
            "additionalProperties": false
        },
        "strict": true
    })
}
