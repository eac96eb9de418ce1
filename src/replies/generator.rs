use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::llm::{ChatMessage, ChatRequest, LlmClient};
use crate::replies::prompts::{replies_prompt, SYSTEM_PROMPT};
use crate::replies::{parse_replies, ReplyRequest};
use crate::ReplyOption;

#[derive(Clone)]
pub struct ReplyGenerator {
    llm: Option<LlmClient>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ReplyGenerator {
    pub fn new(llm: Option<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: 0.9,
            max_tokens: 300,
        }
    }

    pub fn from_config(llm: Option<LlmClient>, config: &LlmConfig) -> Self {
        Self {
            llm,
            model: config.reply_model.clone(),
            temperature: config.reply_temperature,
            max_tokens: config.reply_max_tokens,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// Drafts reply options for one post. An answer that does not split
    /// cleanly degrades to fewer options; only the call itself can fail.
    pub async fn generate(&self, request: &ReplyRequest) -> Result<Vec<ReplyOption>, String> {
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| "AIML_API_KEY is not configured".to_string())?;

        let mut chat = ChatRequest::new(
            &self.model,
            vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(replies_prompt(
                    &request.tweet_content,
                    &request.tweet_author,
                    request.context(),
                )),
            ],
        );
        chat.temperature = Some(self.temperature);
        chat.max_tokens = Some(self.max_tokens);

        let response = llm
            .chat(&chat)
            .await
            .map_err(|err| format!("reply generation failed: {}", err))?;
        let content = response
            .into_first_message()
            .and_then(|message| message.content)
            .unwrap_or_default();
        debug!(chars = content.len(), "reply draft received");

        let replies = parse_replies(&content);
        info!(author = %request.tweet_author, count = replies.len(), "replies generated");
        Ok(replies)
    }
}
