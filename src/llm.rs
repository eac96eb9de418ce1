use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::ProviderError;

/// Client for an OpenAI-compatible API (chat completions and responses).
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl LlmClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| format!("failed to build llm client: {}", err))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into(),
        })
    }

    pub fn from_env(config: &LlmConfig) -> Option<Self> {
        let api_key = env::var("AIML_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())?;
        match Self::new(config.api_base.clone(), api_key, config.timeout()) {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "llm client disabled");
                None
            }
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.post_json("chat/completions", request).await
    }

    pub async fn respond(&self, request: &Value) -> Result<ResponsesBody, ProviderError> {
        self.post_json("responses", request).await
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_base.trim_end_matches('/'), path);
        post_bearer_json(&self.client, url, &self.api_key, body).await
    }
}

/// POSTs `body` with a bearer token and decodes the JSON answer. Non-2xx
/// statuses surface as [`ProviderError::Status`] with the response text.
pub(crate) async fn post_bearer_json<B, R>(
    client: &reqwest::Client,
    url: String,
    token: &str,
    body: &B,
) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            detail: detail.trim().to_string(),
        });
    }

    let payload = response.text().await?;
    Ok(serde_json::from_str(&payload)?)
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatResponse {
    pub fn into_first_message(self) -> Option<ChatMessage> {
        self.choices.into_iter().next().map(|choice| choice.message)
    }
}

/// Subset of a responses-API body: the flattened `output_text` some
/// gateways add, and the raw output items.
#[derive(Debug, Deserialize)]
pub struct ResponsesBody {
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ResponsesBody {
    pub fn text(&self) -> Option<String> {
        if let Some(text) = self.output_text.as_deref() {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }

        let joined: String = self
            .output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect();
        if joined.trim().is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    pub fn function_arguments(&self, name: &str) -> Option<&str> {
        self.output
            .iter()
            .find(|item| item.kind == "function_call" && item.name.as_deref() == Some(name))
            .and_then(|item| item.arguments.as_deref())
            .filter(|arguments| !arguments.trim().is_empty())
    }
}

/// Slice from the first `open` to the last `close`, inclusive.
pub fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if start >= end {
        return None;
    }
    Some(&text[start..=end])
}
