//! Article publishing into the relational content store.
//!
//! [`Publisher::publish`] renders the block sequence to HTML, validates the
//! title, and inserts one `tbl_news` row under the shared [`RetryPolicy`].
//! Only transient storage errors are retried. A failed publish leaves the
//! dedup ledger untouched so the next run retries the whole article.
//!
//! # Row Layout
//!
//! | Column | Value |
//! |--------|-------|
//! | `cat_id` | classified category id |
//! | `news_title` | `"<title> - <translated title>"` |
//! | `news_date`, `last_update` | local insert time |
//! | `news_description` | rendered HTML document |
//! | `news_image` | uploaded image filename or `NULL` |
//! | `news_status` | `1` (published) |
//! | `content_type` | `"Post"` |
//! | `view_count` | `0` |

use crate::error::{PublishError, StoreError};
use crate::models::{Article, NewsRecord, PublishedArticleId};
use crate::outputs::html::render_document;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::Local;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::time::Duration;
use tracing::{error, info, instrument};

const STATUS_PUBLISHED: i32 = 1;
const CONTENT_TYPE_POST: &str = "Post";

/// Insert-only sink for published articles.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert(&self, record: &NewsRecord) -> Result<PublishedArticleId, StoreError>;
}

#[derive(Debug, Clone)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Open the pool; the first connection is established eagerly so that an
    /// unreachable database fails the run at startup.
    #[instrument(level = "info", skip_all, fields(host = %config.host, db = %config.database))]
    pub async fn connect(config: &MySqlConfig) -> Result<Self, sqlx::Error> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .test_before_acquire(true)
            .connect_with(options)
            .await?;
        info!("Database connection successful");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

#[async_trait]
impl ArticleStore for MySqlStore {
    async fn insert(&self, record: &NewsRecord) -> Result<PublishedArticleId, StoreError> {
        let result = sqlx::query(
            "INSERT INTO tbl_news (cat_id, news_title, news_date, news_description, news_image, \
             news_status, video_url, video_id, content_type, size, view_count, last_update) \
             VALUES (?, ?, ?, ?, ?, ?, '', '', ?, '', 0, ?)",
        )
        .bind(record.category_id)
        .bind(&record.title)
        .bind(record.created_at)
        .bind(&record.html_body)
        .bind(record.image_path.as_deref())
        .bind(record.status)
        .bind(CONTENT_TYPE_POST)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }
}

pub struct Publisher {
    store: Box<dyn ArticleStore>,
    policy: RetryPolicy,
    lang: String,
}

impl Publisher {
    pub fn new(store: Box<dyn ArticleStore>, policy: RetryPolicy, lang: impl Into<String>) -> Self {
        Self {
            store,
            policy,
            lang: lang.into(),
        }
    }

    /// Build the row for `article` without touching the store.
    pub fn prepare(&self, article: &Article) -> Result<NewsRecord, PublishError> {
        if article.title.trim().is_empty() {
            error!(url = %article.source_url, "Cannot insert news with empty title");
            return Err(PublishError::EmptyTitle);
        }

        Ok(NewsRecord {
            category_id: article.category_id,
            title: article.combined_title(),
            html_body: render_document(&article.blocks, &self.lang),
            image_path: article.image_ref.clone(),
            created_at: Local::now().naive_local(),
            status: STATUS_PUBLISHED,
        })
    }

    #[instrument(level = "info", skip_all, fields(url = %article.source_url, cat_id = article.category_id))]
    pub async fn publish(&self, article: &Article) -> Result<PublishedArticleId, PublishError> {
        let record = self.prepare(article)?;

        let id = self
            .policy
            .run("article insert", || self.store.insert(&record), StoreError::is_transient)
            .await?;

        info!(id, title = %record.title, "News inserted successfully");
        Ok(id)
    }
}
