//! Outbound notifications.
//!
//! Two channels, both optional and both non-fatal:
//!
//! | Channel | When | Module |
//! |---------|------|--------|
//! | Push (FCM topic) | after each successful publish | [`fcm`] |
//! | Chat (Telegram channel) | once per run, if anything was published | [`telegram`] |
//!
//! Send failures are logged and never affect the article's outcome.

pub mod fcm;
pub mod telegram;

use crate::error::NotifyError;
use crate::models::PublishedArticleId;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{error, info, instrument, warn};

const FALLBACK_PUSH_TITLE: &str = "Current Affairs Update";
const FALLBACK_PUSH_BODY: &str = "New update available.";
const DIGEST_EMOJIS: [&str; 3] = ["📌", "🌟", "💡"];
const DIGEST_FOOTER: &str =
    "\n\n📱 **Download our App**: [Link]\n📣 **Join Telegram**: [https://t.me/gujtest]";

/// A topic-addressed push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub data: BTreeMap<String, String>,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, message: &PushMessage) -> Result<String, NotifyError>;
}

#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Build the push message for a freshly published article.
pub fn article_message(
    title: &str,
    summary: Option<&str>,
    image_url: Option<String>,
    post_id: Option<PublishedArticleId>,
) -> PushMessage {
    let title = match title.trim() {
        "" => FALLBACK_PUSH_TITLE.to_string(),
        t => truncate_chars(t, 100).to_string(),
    };
    let body = match summary.map(str::trim) {
        Some(s) if !s.is_empty() => truncate_chars(s, 200).to_string(),
        _ => FALLBACK_PUSH_BODY.to_string(),
    };

    let mut data = BTreeMap::new();
    data.insert(
        "id".to_string(),
        rand::rng().random_range(1000..=9999).to_string(),
    );
    data.insert("title".to_string(), title.clone());
    data.insert("message".to_string(), body.clone());
    if let Some(url) = &image_url {
        data.insert("image".to_string(), url.clone());
    }
    if let Some(id) = post_id {
        data.insert("post_id".to_string(), id.to_string());
    }

    PushMessage {
        title,
        body,
        image_url,
        data,
    }
}

/// Markdown digest listing every title published in the run.
pub fn digest_text(date: NaiveDate, titles: &[String]) -> String {
    let mut message = format!(
        "🌟 **{} - Current Affairs in Gujarati** 🌟\n\nHere are the latest updates:\n",
        date.format("%d %B %Y")
    );
    for (i, title) in titles.iter().enumerate().map(|(i, t)| (i + 1, t)) {
        // writing into a String cannot fail
        let _ = write!(message, "\n{} **{}**", DIGEST_EMOJIS[i % 3], title);
    }
    message.push_str(DIGEST_FOOTER);
    message
}

/// Fan-out to whichever channels are configured.
pub struct Notifier {
    push: Option<Box<dyn PushSender>>,
    chat: Option<Box<dyn ChatSender>>,
    image_base_url: String,
}

impl Notifier {
    pub fn new(
        push: Option<Box<dyn PushSender>>,
        chat: Option<Box<dyn ChatSender>>,
        image_base_url: impl Into<String>,
    ) -> Self {
        Self {
            push,
            chat,
            image_base_url: image_base_url.into(),
        }
    }

    fn image_url(&self, image_name: Option<&str>) -> Option<String> {
        image_name.map(|name| format!("{}/{}", self.image_base_url.trim_end_matches('/'), name))
    }

    /// Push a notification for one published article. Returns whether it was
    /// delivered.
    #[instrument(level = "info", skip_all, fields(post_id = id))]
    pub async fn article_published(
        &self,
        title: &str,
        summary: Option<&str>,
        image_name: Option<&str>,
        id: PublishedArticleId,
    ) -> bool {
        let Some(push) = &self.push else {
            return false;
        };

        let message = article_message(title, summary, self.image_url(image_name), Some(id));
        match push.send(&message).await {
            Ok(response) => {
                info!(%response, "Push notification sent");
                true
            }
            Err(e) => {
                error!(error = %e, "Push notification failed");
                false
            }
        }
    }

    /// Broadcast the end-of-run digest. Nothing is sent for an empty run.
    #[instrument(level = "info", skip_all, fields(count = titles.len()))]
    pub async fn digest(&self, date: NaiveDate, titles: &[String]) -> bool {
        if titles.is_empty() {
            warn!("No article titles to send in digest");
            return false;
        }
        let Some(chat) = &self.chat else {
            return false;
        };

        match chat.send(&digest_text(date, titles)).await {
            Ok(()) => {
                info!("Digest broadcast sent");
                true
            }
            Err(e) => {
                error!(error = %e, "Digest broadcast failed");
                false
            }
        }
    }
}
