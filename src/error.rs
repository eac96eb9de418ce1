use thiserror::Error;

/// Why a candidate provider produced nothing usable. Every variant is
/// recoverable: the chain logs it and moves on to the next provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not configured: {0} is not set")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream error {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("payload missing {0}")]
    MissingField(&'static str),

    #[error("payload contained no posts")]
    EmptyResult,
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::MalformedPayload(err.to_string())
    }
}
