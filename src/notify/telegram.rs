//! Telegram Bot API channel broadcasts.

use super::ChatSender;
use crate::error::NotifyError;
use crate::http::client;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    api_base: String,
    token: String,
    channel: String,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            channel: channel.into(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl ChatSender for TelegramClient {
    #[instrument(level = "info", skip_all, fields(channel = %self.channel))]
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        );
        let response = client()
            .post(&endpoint)
            .json(&json!({
                "chat_id": self.channel,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let accepted = status.is_success()
            && serde_json::from_str::<ApiResponse>(&body).is_ok_and(|r| r.ok);
        if !accepted {
            let body = serde_json::from_str::<ApiResponse>(&body)
                .ok()
                .and_then(|r| r.description)
                .unwrap_or(body);
            return Err(NotifyError::Rejected { status, body });
        }

        info!(chars = text.chars().count(), "Telegram message sent");
        Ok(())
    }
}
