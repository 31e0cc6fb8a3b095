//! Text translation with curated phrase substitution and a run-scoped cache.
//!
//! [`Translator::translate`] never fails: a backend error is logged and the
//! untranslated input is returned instead, so a translation outage degrades
//! output quality without aborting any article.
//!
//! Order of operations:
//! 1. empty/whitespace input is returned untouched
//! 2. each configured source phrase is replaced by its curated target
//! 3. the cache is consulted by exact string
//! 4. on a miss the backend is called once and the result cached

use crate::config::Phrase;
use crate::error::TranslateError;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// A machine translation service.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

/// Google Translate's public `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    endpoint: String,
    target_lang: String,
}

const GOOGLE_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

impl GoogleTranslate {
    pub fn new(target_lang: impl Into<String>) -> Self {
        Self::with_endpoint(GOOGLE_TRANSLATE_ENDPOINT, target_lang)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            target_lang: target_lang.into(),
        }
    }

    fn request_url(&self, text: &str) -> String {
        format!(
            "{}?client=gtx&sl=auto&tl={}&dt=t&q={}",
            self.endpoint,
            urlencoding::encode(&self.target_lang),
            urlencoding::encode(text)
        )
    }
}

/// The response is `[[["translated", "source", ...], ...], ...]`; the
/// translation is the concatenation of every segment's first element.
fn parse_google_payload(payload: &Value) -> Result<String, TranslateError> {
    let segments = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Payload("missing segment list".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::Payload("no translated segments".to_string()));
    }
    Ok(translated)
}

#[async_trait]
impl TranslationBackend for GoogleTranslate {
    #[instrument(level = "debug", skip_all, fields(tl = %self.target_lang))]
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let response = crate::http::client()
            .get(self.request_url(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status));
        }

        let payload: Value = response.json().await?;
        parse_google_payload(&payload)
    }
}

/// Phrase substitution + cache in front of a [`TranslationBackend`].
///
/// The cache lives as long as the translator, which is owned by the run
/// context; it is never evicted. A backend failure caches the untranslated
/// text, so a given input reaches the backend at most once per run.
pub struct Translator {
    backend: Box<dyn TranslationBackend>,
    phrases: Vec<Phrase>,
    cache: HashMap<String, String>,
}

impl Translator {
    pub fn new(backend: Box<dyn TranslationBackend>, phrases: Vec<Phrase>) -> Self {
        Self {
            backend,
            phrases,
            cache: HashMap::new(),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn substitute(&self, text: &str) -> String {
        self.phrases
            .iter()
            .fold(text.to_string(), |acc, phrase| {
                if acc.contains(&phrase.source) {
                    acc.replace(&phrase.source, &phrase.target)
                } else {
                    acc
                }
            })
    }

    #[instrument(level = "debug", skip_all, fields(len = text.len()))]
    pub async fn translate(&mut self, text: &str) -> String {
        if text.trim().is_empty() {
            debug!("Empty text received for translation, returning as-is");
            return text.to_string();
        }

        let substituted = self.substitute(text);

        if let Some(hit) = self.cache.get(&substituted) {
            debug!(text = %truncate_for_log(&substituted, 50), "Using cached translation");
            return hit.clone();
        }

        match self.backend.translate(&substituted).await {
            Ok(translated) => {
                debug!(
                    from = %truncate_for_log(&substituted, 50),
                    to = %truncate_for_log(&translated, 50),
                    "Translated"
                );
                self.cache.insert(substituted, translated.clone());
                translated
            }
            Err(e) => {
                warn!(error = %e, "Translation error, returning untranslated text");
                self.cache.insert(substituted, text.to_string());
                text.to_string()
            }
        }
    }
}
