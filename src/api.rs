use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use replyguy::{Post, ReplyOption, ReplyRequest, SourceKind};

pub type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetsQuery {
    pub method: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetsResponse {
    pub tweets: Vec<Post>,
    pub source: SourceKind,
    pub request_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRepliesRequest {
    pub tweet_content: Option<String>,
    pub tweet_author: Option<String>,
    pub tweet_context: Option<String>,
}

impl GenerateRepliesRequest {
    pub fn into_request(self) -> Result<ReplyRequest, String> {
        let content = self.tweet_content.filter(|value| !value.trim().is_empty());
        let author = self.tweet_author.filter(|value| !value.trim().is_empty());
        match (content, author) {
            (Some(content), Some(author)) => Ok(ReplyRequest {
                tweet_content: content,
                tweet_author: author,
                tweet_context: self.tweet_context,
            }),
            _ => Err("Missing required fields: tweetContent and tweetAuthor".to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RepliesResponse {
    pub replies: Vec<ReplyOption>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReplyRequest {
    #[serde(default)]
    pub tweet_id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SavedListResponse {
    pub saved: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub struct SavedChangeResponse {
    pub id: String,
    pub saved: bool,
}
