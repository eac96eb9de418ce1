use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tracing::debug;

use crate::config::ToolhouseConfig;
use crate::llm::{extract_delimited, post_bearer_json, ChatMessage, ChatRequest, LlmClient};
use crate::providers::normalize::{normalize_posts, TOOL_AUGMENTED_ALIASES};
use crate::providers::{CandidateProvider, SourceKind};
use crate::{FilterCriteria, Post, ProviderError};

/// Remote tool runner speaking the OpenAI tool-call format.
#[derive(Clone)]
pub struct ToolhouseClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    bundle: String,
}

#[derive(Debug, Deserialize)]
struct RunToolsResponse {
    content: ChatMessage,
}

impl ToolhouseClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        bundle: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| format!("failed to build toolhouse client: {}", err))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into(),
            bundle: bundle.into(),
        })
    }

    pub fn from_env(config: &ToolhouseConfig) -> Option<Self> {
        let api_key = env::var("TOOLHOUSE_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())?;
        match Self::new(
            config.api_base.clone(),
            api_key,
            config.bundle.clone(),
            config.timeout(),
        ) {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "toolhouse client disabled");
                None
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn envelope(&self) -> Value {
        json!({
            "provider": "openai",
            "metadata": { "id": "replyguy", "timezone": "0" },
            "bundle": self.bundle,
        })
    }

    /// Tool definitions to hand to the model.
    pub async fn get_tools(&self) -> Result<Vec<Value>, ProviderError> {
        post_bearer_json(&self.client, self.url("get_tools"), &self.api_key, &self.envelope()).await
    }

    /// Executes every tool call on `message`, returning one `tool` message per call.
    pub async fn run_tools(
        &self,
        message: &ChatMessage,
    ) -> Result<Vec<ChatMessage>, ProviderError> {
        let mut results = Vec::with_capacity(message.tool_calls.len());
        for call in &message.tool_calls {
            let mut body = self.envelope();
            body["content"] = call.clone();
            let response: RunToolsResponse =
                post_bearer_json(&self.client, self.url("run_tools"), &self.api_key, &body).await?;
            results.push(response.content);
        }
        Ok(results)
    }
}

/// Chat completion with remotely executed tools: one round to let the model
/// call tools, a second to read its answer. The answer is expected to hold
/// a JSON array of posts somewhere in its text.
#[derive(Clone)]
pub struct ToolAugmentedProvider {
    llm: Option<LlmClient>,
    tools: Option<ToolhouseClient>,
    model: String,
}

impl ToolAugmentedProvider {
    pub fn new(
        llm: Option<LlmClient>,
        tools: Option<ToolhouseClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            tools,
            model: model.into(),
        }
    }

    fn prompt(criteria: &FilterCriteria) -> String {
        format!(
            "Search the web for {}. Find the most engaging and trending posts on Twitter/X. \
             For each post, extract the author name, username, post content, approximate timestamp, \
             and engagement metrics (likes, replies, retweets, views if available). \
             Format the results as an array of JSON objects.",
            criteria.search_query()
        )
    }
}

#[async_trait]
impl CandidateProvider for ToolAugmentedProvider {
    fn source(&self) -> SourceKind {
        SourceKind::ToolAugmented
    }

    async fn fetch(&self, criteria: &FilterCriteria) -> Result<Vec<Post>, ProviderError> {
        let tools = self
            .tools
            .as_ref()
            .ok_or(ProviderError::NotConfigured("TOOLHOUSE_API_KEY"))?;
        let llm = self
            .llm
            .as_ref()
            .ok_or(ProviderError::NotConfigured("AIML_API_KEY"))?;

        let definitions = tools.get_tools().await?;
        debug!(tools = definitions.len(), "tool-augmented search");

        let mut request =
            ChatRequest::new(&self.model, vec![ChatMessage::user(Self::prompt(criteria))]);
        request.tools = definitions;

        let first = llm
            .chat(&request)
            .await?
            .into_first_message()
            .ok_or(ProviderError::MissingField("choices"))?;

        let answer = if first.tool_calls.is_empty() {
            first
        } else {
            let results = tools.run_tools(&first).await?;
            request.messages.push(first);
            request.messages.extend(results);
            llm.chat(&request)
                .await?
                .into_first_message()
                .ok_or(ProviderError::MissingField("choices"))?
        };

        let content = answer
            .text()
            .ok_or(ProviderError::MissingField("message content"))?;
        let json_text = extract_delimited(content, '[', ']').unwrap_or(content);
        let items = match serde_json::from_str::<Value>(json_text)? {
            Value::Array(items) => items,
            _ => return Err(ProviderError::EmptyResult),
        };
        normalize_posts(&items, &TOOL_AUGMENTED_ALIASES, SourceKind::ToolAugmented, Utc::now())
    }
}
