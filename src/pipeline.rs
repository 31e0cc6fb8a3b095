//! Run orchestration.
//!
//! One run walks `Discover → {ForEachUrl: Skip | Process} → Aggregate → Notify`.
//! Articles are processed strictly one at a time in discovery order, with a
//! fixed pacing delay between articles that did network work.
//!
//! Per-article failures end in [`ArticleOutcome::Failed`] and never abort the
//! batch. The ledger is written only after a successful publish.

use crate::classify::CategoryTable;
use crate::config::UrlFilter;
use crate::http::fetch_html;
use crate::ledger::DedupLedger;
use crate::media::MediaHandler;
use crate::models::{Article, ArticleOutcome, BlockKind, ContentBlock, RunSummary, combine_titles};
use crate::notify::Notifier;
use crate::publish::Publisher;
use crate::scrapers::{article, listing};
use crate::translate::Translator;
use chrono::Local;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// State that lives exactly as long as one run: the translation cache (inside
/// the translator) and the category table.
pub struct RunContext {
    pub translator: Translator,
    pub categories: CategoryTable,
}

impl RunContext {
    pub fn new(translator: Translator, categories: CategoryTable) -> Self {
        Self {
            translator,
            categories,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub pages: u32,
    pub pacing: Duration,
}

pub struct Pipeline {
    source: SourceConfig,
    exclude: UrlFilter,
    media: MediaHandler,
    publisher: Publisher,
    ledger: DedupLedger,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(
        source: SourceConfig,
        exclude: UrlFilter,
        media: MediaHandler,
        publisher: Publisher,
        ledger: DedupLedger,
        notifier: Notifier,
    ) -> Self {
        Self {
            source,
            exclude,
            media,
            publisher,
            ledger,
            notifier,
        }
    }

    /// Run one batch and return its summary. The digest goes out only when at
    /// least one article was published.
    ///
    /// `shutdown` is checked between articles, never inside one: once it flips
    /// to `true` the in-flight article still runs through publish and ledger
    /// record, and the remaining URLs are left for the next run.
    #[instrument(level = "info", skip_all, fields(base_url = %self.source.base_url, pages = self.source.pages))]
    pub async fn run(&self, ctx: &mut RunContext, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let started = Instant::now();
        let urls = listing::index_articles(&self.source.base_url, self.source.pages).await;

        let mut summary = RunSummary {
            discovered: urls.len(),
            ..RunSummary::default()
        };

        for (i, url) in urls.iter().enumerate() {
            if *shutdown.borrow() {
                warn!(remaining = urls.len() - i, "Shutdown requested; stopping before next article");
                break;
            }
            if self.exclude.is_excluded(url) {
                info!(%url, "Skipping excluded URL");
                summary.record(ArticleOutcome::Skipped);
                continue;
            }

            let outcome = self.process_article(ctx, url).await;
            debug!(%url, published = outcome.succeeded(), "Article finished");
            let did_work = outcome != ArticleOutcome::Skipped;
            summary.record(outcome);

            if did_work && i + 1 < urls.len() && !self.source.pacing.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.source.pacing) => {}
                    Ok(()) = shutdown.changed() => {}
                }
            }
        }

        self.notifier
            .digest(Local::now().date_naive(), &summary.published_titles)
            .await;

        info!(
            discovered = summary.discovered,
            skipped = summary.skipped,
            published = summary.published_titles.len(),
            failed = summary.failed,
            translations_cached = ctx.translator.cached_entries(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Run complete"
        );
        summary
    }

    /// Push one URL through extract → translate → media → classify → publish
    /// → ledger → push notification.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn process_article(&self, ctx: &mut RunContext, url: &str) -> ArticleOutcome {
        if self.ledger.has(url).await {
            info!("URL already scraped, skipping");
            return ArticleOutcome::Skipped;
        }

        let html = match fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, "Failed to fetch article");
                return ArticleOutcome::Failed;
            }
        };

        let page = match article::extract(&html, url) {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, "Article structure not recognized; discarding");
                return ArticleOutcome::Failed;
            }
        };

        let translated_title = ctx.translator.translate(&page.title).await;

        let mut blocks = Vec::with_capacity(page.blocks.len() + 1);
        blocks.extend(ContentBlock::new(
            BlockKind::Heading,
            &combine_titles(&page.title, &translated_title),
        ));
        for block in &page.blocks {
            let text = ctx.translator.translate(&block.text).await;
            blocks.extend(ContentBlock::new(block.kind, &text));
        }

        let summary = match &page.first_paragraph {
            Some(paragraph) => Some(ctx.translator.translate(paragraph).await),
            None => None,
        };

        let image_ref = match &page.image_url {
            Some(image_url) => match self.media.process(image_url).await {
                Ok(filename) => Some(filename),
                Err(_) => {
                    warn!("Continuing without featured image");
                    None
                }
            },
            None => None,
        };

        let mut article = Article {
            source_url: url.to_string(),
            title: page.title,
            translated_title,
            blocks,
            image_ref,
            category_id: ctx.categories.default_id(),
            summary,
        };
        article.category_id = ctx.categories.classify(&article.description());

        let id = match self.publisher.publish(&article).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "Publish failed; URL left unrecorded for the next run");
                return ArticleOutcome::Failed;
            }
        };

        self.ledger.record(url).await;

        let title = article.combined_title();
        self.notifier
            .article_published(&title, article.summary.as_deref(), article.image_ref.as_deref(), id)
            .await;

        info!(id, %title, category_id = article.category_id, "Article ingested");
        ArticleOutcome::Published { title }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryTerm, Tables};
    use crate::ledger::tests::MemoryLedger;
    use crate::media::tests::{RecordingStore, png_with_alpha};
    use crate::notify::tests::{RecordingChat, RecordingPush};
    use crate::error::StoreError;
    use crate::models::{NewsRecord, PublishedArticleId};
    use crate::publish::ArticleStore;
    use crate::publish::tests::MemoryStore;
    use async_trait::async_trait;
    use crate::retry::RetryPolicy;
    use crate::translate::tests::BracketBackend;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        server: MockServer,
        store: MemoryStore,
        ledger: MemoryLedger,
        files: RecordingStore,
        push: RecordingPush,
        chat: RecordingChat,
    }

    impl Harness {
        async fn start() -> Self {
            Self {
                server: MockServer::start().await,
                store: MemoryStore::default(),
                ledger: MemoryLedger::default(),
                files: RecordingStore::default(),
                push: RecordingPush::default(),
                chat: RecordingChat::default(),
            }
        }

        fn url(&self, route: &str) -> String {
            format!("{}{}", self.server.uri(), route)
        }

        async fn mount_listing(&self, routes: &[&str]) {
            let body: String = routes
                .iter()
                .map(|r| format!(r#"<h1 id="list"><a href="{}">x</a></h1>"#, self.url(r)))
                .collect();
            Mock::given(method("GET"))
                .and(path("/"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(format!("<html><body>{body}</body></html>")),
                )
                .mount(&self.server)
                .await;
        }

        async fn mount_page(&self, route: &str, html: String, expected_hits: u64) {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string(html))
                .expect(expected_hits)
                .mount(&self.server)
                .await;
        }

        fn pipeline(&self) -> Pipeline {
            self.pipeline_with(Box::new(self.store.clone()), Duration::ZERO)
        }

        fn pipeline_with(&self, store: Box<dyn ArticleStore>, pacing: Duration) -> Pipeline {
            let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5));
            Pipeline::new(
                SourceConfig {
                    base_url: self.url("/"),
                    pages: 1,
                    pacing,
                },
                Tables::default().url_filter().unwrap(),
                MediaHandler::new(Box::new(self.files.clone()), policy),
                Publisher::new(store, policy, "gu"),
                DedupLedger::new(Box::new(self.ledger.clone())),
                Notifier::new(
                    Some(Box::new(self.push.clone())),
                    Some(Box::new(self.chat.clone())),
                    "https://img.test/upload",
                ),
            )
        }
    }

    /// A shutdown receiver that never fires.
    fn running() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    /// Signals shutdown as soon as a row has been stored, i.e. while the
    /// article is between its insert and its ledger record.
    struct InterruptingStore {
        inner: MemoryStore,
        shutdown: watch::Sender<bool>,
    }

    #[async_trait]
    impl ArticleStore for InterruptingStore {
        async fn insert(&self, record: &NewsRecord) -> Result<PublishedArticleId, StoreError> {
            let id = self.inner.insert(record).await?;
            self.shutdown.send_replace(true);
            Ok(id)
        }
    }

    fn context() -> RunContext {
        RunContext::new(
            Translator::new(Box::new(BracketBackend::default()), vec![]),
            CategoryTable::new(
                vec![CategoryTerm {
                    term: "ECON".to_string(),
                    id: 15,
                }],
                1,
            ),
        )
    }

    fn article_html(title: &str, image_src: Option<&str>) -> String {
        let image = image_src
            .map(|src| format!(r#"<div class="featured_image"><img src="{src}"></div>"#))
            .unwrap_or_default();
        format!(
            r#"<html><body>{image}
            <div class="inside_post column content_width">
              <h1 id="list">{title}</h1>
              <p>ECON growth slows</p>
              <ul><li>Point</li></ul>
            </div></body></html>"#
        )
    }

    #[tokio::test]
    async fn test_full_run_publishes_records_and_notifies() {
        let h = Harness::start().await;
        h.mount_listing(&["/a/", "/daily-current-affairs-quiz-may/", "/b/", "/a/"])
            .await;
        h.mount_page("/a/", article_html("Alpha", Some("/img.png")), 1).await;
        h.mount_page("/b/", article_html("Beta", None), 1).await;
        h.mount_page("/daily-current-affairs-quiz-may/", String::new(), 0)
            .await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_with_alpha()))
            .mount(&h.server)
            .await;

        let summary = h.pipeline().run(&mut context(), running()).await;

        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            summary.published_titles,
            vec!["Alpha - [Alpha]".to_string(), "Beta - [Beta]".to_string()]
        );

        let records = h.store.records.lock().unwrap().clone();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category_id, 15);
        assert!(records[0].image_path.is_some());
        assert!(records[1].image_path.is_none());
        assert!(records[0].html_body.contains(">[ECON growth slows]</p>"));

        assert_eq!(h.ledger.urls(), vec![h.url("/a/"), h.url("/b/")]);
        assert_eq!(h.files.uploads.lock().unwrap().len(), 1);

        let pushes = h.push.sent.lock().unwrap();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[0].body, "[ECON growth slows]");
        assert_eq!(pushes[0].data["post_id"], "1");
        assert!(
            pushes[0]
                .image_url
                .as_deref()
                .is_some_and(|u| u.starts_with("https://img.test/upload/news_"))
        );

        let digests = h.chat.sent.lock().unwrap();
        assert_eq!(digests.len(), 1);
        assert!(digests[0].contains("**Alpha - [Alpha]**"));
        assert!(digests[0].contains("**Beta - [Beta]**"));
    }

    #[tokio::test]
    async fn test_ledger_hit_does_no_extraction_work() {
        let mut h = Harness::start().await;
        let seen = h.url("/a/");
        h.ledger = MemoryLedger::with_urls(&[seen.as_str()]);
        h.mount_listing(&["/a/"]).await;
        h.mount_page("/a/", article_html("Alpha", None), 0).await;

        let summary = h.pipeline().run(&mut context(), running()).await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(*h.ledger.lookups.lock().unwrap(), vec![h.url("/a/")]);
        assert_eq!(*h.store.attempts.lock().unwrap(), 0);
        assert!(h.chat.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_container_discards_article() {
        let h = Harness::start().await;
        h.mount_listing(&["/a/"]).await;
        h.mount_page(
            "/a/",
            "<html><body><h1>Orphan heading</h1><p>text</p></body></html>".to_string(),
            1,
        )
        .await;

        let summary = h.pipeline().run(&mut context(), running()).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(*h.store.attempts.lock().unwrap(), 0);
        assert!(h.ledger.urls().is_empty());
        assert!(h.push.sent.lock().unwrap().is_empty());
        assert!(h.chat.sent.lock().unwrap().is_empty(), "zero successes send no digest");
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_ledger_untouched() {
        let mut h = Harness::start().await;
        h.store = MemoryStore {
            permanent: true,
            ..MemoryStore::default()
        };
        h.mount_listing(&["/a/"]).await;
        h.mount_page("/a/", article_html("Alpha", None), 1).await;

        let summary = h.pipeline().run(&mut context(), running()).await;

        assert_eq!(summary.failed, 1);
        assert!(h.ledger.urls().is_empty());
        assert!(h.push.sent.lock().unwrap().is_empty());
        assert!(h.chat.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_failure_still_publishes_without_image() {
        let h = Harness::start().await;
        h.mount_listing(&["/a/"]).await;
        h.mount_page("/a/", article_html("Alpha", Some("/broken.jpg")), 1)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&h.server)
            .await;

        let mut ctx = context();
        let outcome = h.pipeline().process_article(&mut ctx, &h.url("/a/")).await;

        assert!(outcome.succeeded());
        let records = h.store.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].image_path.is_none());
        assert!(h.files.uploads.lock().unwrap().is_empty());
        assert_eq!(h.ledger.urls(), vec![h.url("/a/")]);
        assert!(h.push.sent.lock().unwrap()[0].image_url.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_mid_article_still_records_ledger() {
        let h = Harness::start().await;
        h.mount_listing(&["/a/", "/b/"]).await;
        h.mount_page("/a/", article_html("Alpha", None), 1).await;
        h.mount_page("/b/", article_html("Beta", None), 0).await;

        let (tx, rx) = watch::channel(false);
        let store = InterruptingStore {
            inner: h.store.clone(),
            shutdown: tx,
        };
        let summary = h
            .pipeline_with(Box::new(store), Duration::ZERO)
            .run(&mut context(), rx)
            .await;

        assert_eq!(summary.published_titles, vec!["Alpha - [Alpha]".to_string()]);
        assert_eq!(h.store.records.lock().unwrap().len(), 1);
        // every stored row has its ledger entry
        assert_eq!(h.ledger.urls(), vec![h.url("/a/")]);
        assert_eq!(h.push.sent.lock().unwrap().len(), 1);
        assert_eq!(h.chat.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pacing_only_follows_processed_articles() {
        let pacing = Duration::from_millis(400);
        let mut h = Harness::start().await;
        let seen = h.url("/b/");
        h.ledger = MemoryLedger::with_urls(&[seen.as_str()]);
        h.mount_listing(&["/a/", "/daily-current-affairs-quiz-june/", "/b/", "/c/"])
            .await;
        h.mount_page("/a/", article_html("Alpha", None), 1).await;
        h.mount_page("/b/", article_html("Beta", None), 0).await;
        h.mount_page("/c/", article_html("Gamma", None), 1).await;

        let pipeline = h.pipeline_with(Box::new(h.store.clone()), pacing);
        let started = Instant::now();
        let summary = pipeline.run(&mut context(), running()).await;
        let elapsed = started.elapsed();

        assert_eq!(summary.published_titles.len(), 2);
        assert_eq!(summary.skipped, 2);
        // one pause after "a"; none after the excluded URL, the ledger hit, or the last URL
        assert!(elapsed >= pacing, "elapsed {elapsed:?}");
        assert!(elapsed < pacing * 2, "elapsed {elapsed:?}");
    }
}
