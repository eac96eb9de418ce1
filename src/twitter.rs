use serde::Serialize;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Platform credentials. Only presence is checked; delivery is simulated.
#[derive(Debug, Clone, Default)]
pub struct TwitterCredentials {
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_secret: Option<String>,
}

impl TwitterCredentials {
    pub fn from_env() -> Self {
        Self {
            bearer_token: secret("TWITTER_BEARER_TOKEN").map(decode_bearer),
            api_key: secret("TWITTER_API_KEY"),
            api_secret: secret("TWITTER_API_SECRET"),
            access_token: secret("TWITTER_ACCESS_TOKEN"),
            access_secret: secret("TWITTER_ACCESS_SECRET"),
        }
    }

    /// Bearer token, API key and API secret are all present.
    pub fn is_configured(&self) -> bool {
        self.bearer_token.is_some() && self.api_key.is_some() && self.api_secret.is_some()
    }
}

fn secret(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn decode_bearer(value: String) -> String {
    if value.contains('%') {
        match urlencoding::decode(&value) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => value,
        }
    } else {
        value
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Twitter credentials not configured")]
    NotConfigured,
    #[error("Missing required parameters")]
    MissingParameters,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub success: bool,
    pub message: String,
}

/// Posts replies on the platform. Currently a stub: after the checks pass
/// it waits `delay` and reports success without calling out.
#[derive(Debug, Clone)]
pub struct ReplySender {
    credentials: TwitterCredentials,
    delay: Duration,
}

impl ReplySender {
    pub fn new(credentials: TwitterCredentials, delay: Duration) -> Self {
        Self { credentials, delay }
    }

    pub async fn send(&self, tweet_id: &str, text: &str) -> Result<DeliveryReceipt, DeliveryError> {
        if !self.credentials.is_configured() {
            return Err(DeliveryError::NotConfigured);
        }
        if tweet_id.trim().is_empty() || text.trim().is_empty() {
            return Err(DeliveryError::MissingParameters);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let user_context =
            self.credentials.access_token.is_some() && self.credentials.access_secret.is_some();
        info!(
            tweet_id,
            chars = text.chars().count(),
            user_context,
            "reply delivered (simulated)"
        );
        Ok(DeliveryReceipt {
            success: true,
            message: "Reply sent successfully".to_string(),
        })
    }
}
