//! # Current Affairs Ingest
//!
//! A batch ingestion pipeline that scrapes current-affairs articles from
//! GKToday, translates them into Gujarati, and publishes them to a news app
//! backend, ingesting every article at most once.
//!
//! ## Features
//!
//! - Indexes a bounded range of listing pages and skips known non-article URLs
//! - Extracts typed content blocks with ordered selector fallbacks
//! - Translates through a phrase table and a per-run cache
//! - Re-encodes the featured image to PNG and uploads it over FTP
//! - Infers a category and inserts the rendered HTML into MySQL
//! - Records every published URL in a MongoDB ledger
//! - Sends an FCM push per article and a Telegram digest per run
//!
//! ## Usage
//!
//! ```sh
//! current_affairs_ingest --pages 3 --tables ./tables.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: discover article URLs from the listing pages
//! 2. **Processing**: one article at a time, extract → translate → media →
//!    classify → publish → ledger → push
//! 3. **Digest**: broadcast the titles published during the run

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classify;
mod cli;
mod config;
mod error;
mod http;
mod ledger;
mod media;
mod models;
mod notify;
mod outputs;
mod pipeline;
mod publish;
mod retry;
mod scrapers;
mod translate;
mod utils;

use classify::CategoryTable;
use cli::Cli;
use config::Tables;
use ledger::{DedupLedger, MongoLedger};
use media::{FtpConfig, FtpFileStore, MediaHandler};
use notify::fcm::{FcmClient, ServiceAccount};
use notify::telegram::TelegramClient;
use notify::{ChatSender, Notifier, PushSender};
use pipeline::{Pipeline, RunContext, SourceConfig};
use publish::{MySqlConfig, MySqlStore, Publisher};
use retry::RetryPolicy;
use translate::{GoogleTranslate, Translator};

/// Build the FCM sender, or `None` when credentials are missing or unusable.
async fn push_sender(args: &Cli) -> Option<Box<dyn PushSender>> {
    let account = match (
        &args.firebase_service_account,
        &args.firebase_service_account_path,
    ) {
        (Some(raw), _) => ServiceAccount::from_json(raw),
        (None, Some(path)) => ServiceAccount::load(path).await,
        (None, None) => {
            warn!("Firebase credentials not configured; push notifications disabled");
            return None;
        }
    };

    match account.and_then(|account| FcmClient::new(account, &args.fcm_topic)) {
        Ok(client) => {
            info!(topic = %args.fcm_topic, "Firebase initialized");
            Some(Box::new(client))
        }
        Err(e) => {
            warn!(error = %e, "Firebase initialization failed; push notifications disabled");
            None
        }
    }
}

fn chat_sender(args: &Cli) -> Option<Box<dyn ChatSender>> {
    match (&args.telegram_bot_token, &args.telegram_channel) {
        (Some(token), Some(channel)) => {
            info!(%channel, "Telegram digest enabled");
            Some(Box::new(TelegramClient::new(token, channel)))
        }
        _ => {
            warn!("Telegram bot token or channel not configured; digest disabled");
            None
        }
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("current_affairs_ingest starting up");

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env loaded"),
    }

    // Parse CLI
    let args = Cli::parse();
    debug!(base_url = %args.base_url, pages = args.pages, "Parsed CLI arguments");

    // ---- Tables ----
    let tables = match &args.tables {
        Some(path) => Tables::load(path).await.inspect_err(|e| {
            error!(%path, error = %e, "Failed to load tables file");
        })?,
        None => Tables::default(),
    };
    let exclude = tables.url_filter()?;

    // ---- Required stores; either failing aborts the run ----
    let mysql = MySqlStore::connect(&MySqlConfig {
        host: args.db_host.clone(),
        port: args.db_port,
        user: args.db_user.clone(),
        password: args.db_password.clone(),
        database: args.db_name.clone(),
    })
    .await
    .inspect_err(|e| error!(error = %e, "Database connection failed"))?;

    let mongo = match MongoLedger::connect(&args.mongo_uri, &args.mongo_db, &args.mongo_collection).await {
        Ok(mongo) => mongo,
        Err(e) => {
            error!(error = %e, "MongoDB connection failed");
            mysql.close().await;
            return Err(e.into());
        }
    };

    // ---- Optional channels ----
    let notifier = Notifier::new(
        push_sender(&args).await,
        chat_sender(&args),
        args.image_base_url.clone(),
    );

    let policy = RetryPolicy::default();
    let pipeline = Pipeline::new(
        SourceConfig {
            base_url: args.base_url.clone(),
            pages: args.pages,
            pacing: Duration::from_secs(args.pacing_secs),
        },
        exclude,
        MediaHandler::new(
            Box::new(FtpFileStore::new(FtpConfig {
                host: args.ftp_host.clone(),
                port: args.ftp_port,
                user: args.ftp_user.clone(),
                password: args.ftp_password.clone(),
                upload_path: args.ftp_upload_path.clone(),
            })),
            policy,
        ),
        Publisher::new(Box::new(mysql.clone()), policy, args.target_lang.clone()),
        DedupLedger::new(Box::new(mongo.clone())),
        notifier,
    );

    let mut ctx = RunContext::new(
        Translator::new(
            Box::new(GoogleTranslate::new(args.target_lang.clone())),
            tables.phrases.clone(),
        ),
        CategoryTable::from_tables(&tables),
    );

    // ---- Run; Ctrl-C stops between articles, never inside one ----
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted by user; finishing the current article");
            shutdown_tx.send_replace(true);
        }
    });

    let summary = pipeline.run(&mut ctx, shutdown_rx).await;
    debug!(?summary, "Run summary");

    drop(pipeline);
    mysql.close().await;
    mongo.close().await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
