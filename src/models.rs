//! Data models for scraped articles and their published representation.
//!
//! - [`ContentBlock`]: one classified unit of article text
//! - [`Article`]: a fully extracted and translated article, ready to publish
//! - [`NewsRecord`]: the row inserted into the content store
//! - [`ArticleOutcome`] / [`RunSummary`]: per-article and per-run results

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Render kind of a [`ContentBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading,
    Paragraph,
    SubHeading,
    MinorHeading,
    ListItem,
}

impl BlockKind {
    /// Map a container child's tag name to a block kind. `ul` is handled by
    /// the extractor since it expands into several list items.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "p" => Some(Self::Paragraph),
            "h2" => Some(Self::SubHeading),
            "h4" => Some(Self::MinorHeading),
            _ => None,
        }
    }
}

/// One classified unit of article text. The text is trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub kind: BlockKind,
    pub text: String,
}

impl ContentBlock {
    /// Build a block, returning `None` when the trimmed text is empty.
    pub fn new(kind: BlockKind, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(Self {
                kind,
                text: text.to_string(),
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// An article after extraction, translation, and classification.
///
/// `blocks[0]` is always the heading block carrying the combined
/// `"<title> - <translated_title>"` text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// The article URL; the ledger key.
    pub source_url: String,
    pub title: String,
    pub translated_title: String,
    pub blocks: Vec<ContentBlock>,
    /// Uploaded image filename, if the featured image made it to the file store.
    pub image_ref: Option<String>,
    pub category_id: i64,
    /// Translated first paragraph, used as the notification body.
    pub summary: Option<String>,
}

impl Article {
    /// Title as stored and broadcast: original and translation side by side.
    pub fn combined_title(&self) -> String {
        combine_titles(&self.title, &self.translated_title)
    }

    /// Space-joined text of every paragraph block.
    pub fn description(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Paragraph)
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn combine_titles(original: &str, translated: &str) -> String {
    format!("{} - {}", original, translated)
}

/// Row inserted into `tbl_news`. This system only ever inserts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRecord {
    pub category_id: i64,
    pub title: String,
    pub html_body: String,
    pub image_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub status: i32,
}

/// Auto-increment id assigned by the content store.
pub type PublishedArticleId = u64;

/// Result of pushing one URL through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Published { title: String },
    /// Already in the ledger, or excluded before any work.
    Skipped,
    Failed,
}

impl ArticleOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Aggregated counts for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub published_titles: Vec<String>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: ArticleOutcome) {
        match outcome {
            ArticleOutcome::Published { title } => self.published_titles.push(title),
            ArticleOutcome::Skipped => self.skipped += 1,
            ArticleOutcome::Failed => self.failed += 1,
        }
    }
}
