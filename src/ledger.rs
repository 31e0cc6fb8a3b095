//! At-most-once bookkeeping for ingested article URLs.
//!
//! The ledger is append-only: a URL is recorded once its article has been
//! published, and presence of the URL is the only "already ingested" test.
//! [`DedupLedger`] fails open: when the backing store is unreachable, `has`
//! reports "not found" so the article is re-processed rather than dropped.
//!
//! `has` followed later by `record` is not atomic. That is sound only because
//! the pipeline runs a single worker.

use crate::error::LedgerError;
use async_trait::async_trait;
use mongodb::bson::{self, doc};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// One ingested URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub url: String,
    pub scraped_at: bson::DateTime,
}

impl LedgerEntry {
    pub fn now(url: &str) -> Self {
        Self {
            url: url.to_string(),
            scraped_at: bson::DateTime::now(),
        }
    }
}

/// Storage behind the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn contains(&self, url: &str) -> Result<bool, LedgerError>;
    async fn insert(&self, entry: LedgerEntry) -> Result<(), LedgerError>;
}

/// MongoDB collection of `{url, scraped_at}` documents.
#[derive(Clone)]
pub struct MongoLedger {
    client: Client,
    collection: Collection<LedgerEntry>,
}

impl MongoLedger {
    /// Connect and ping; failing here is a run-level failure.
    #[instrument(level = "info", skip_all, fields(%database, %collection))]
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, LedgerError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;
        info!("MongoDB connection successful");
        Ok(Self {
            collection: db.collection(collection),
            client,
        })
    }

    pub async fn close(self) {
        self.client.shutdown().await;
        info!("MongoDB connection closed");
    }
}

#[async_trait]
impl LedgerStore for MongoLedger {
    async fn contains(&self, url: &str) -> Result<bool, LedgerError> {
        let found = self.collection.find_one(doc! { "url": url }).await?;
        Ok(found.is_some())
    }

    async fn insert(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.collection.insert_one(entry).await?;
        Ok(())
    }
}

/// Fail-open facade used by the pipeline.
pub struct DedupLedger {
    store: Box<dyn LedgerStore>,
}

impl DedupLedger {
    pub fn new(store: Box<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Whether `url` was already ingested. Store errors count as "no".
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn has(&self, url: &str) -> bool {
        match self.store.contains(url).await {
            Ok(found) => found,
            Err(e) => {
                error!(error = %e, "Error checking URL in ledger; treating as not ingested");
                false
            }
        }
    }

    /// Record `url` as ingested. Call only after a successful publish.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn record(&self, url: &str) {
        match self.store.insert(LedgerEntry::now(url)).await {
            Ok(()) => debug!("Logged URL to ledger"),
            Err(e) => error!(error = %e, "Error logging URL to ledger"),
        }
    }
}
