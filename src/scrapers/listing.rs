//! Listing-page indexer.
//!
//! Page 1 is the base URL itself; page `n > 1` lives at `<base>page/<n>/`.
//! A listing page that fails to load is logged and skipped.

use crate::http::fetch_html;
use crate::utils::resolve_url;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument};

static LIST_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1#list").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// URL of listing page `page` (1-based).
pub fn page_url(base_url: &str, page: u32) -> String {
    if page <= 1 {
        base_url.to_string()
    } else {
        let base = base_url.trim_end_matches('/');
        format!("{base}/page/{page}/")
    }
}

/// Extract article links from one listing page, in document order.
pub fn parse_listing(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LIST_HEADING)
        .filter_map(|h1| h1.select(&LINK).next())
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_url(page_url, href))
        .collect()
}

/// Index `pages` listing pages and return candidate article URLs in
/// discovery order, without duplicates.
#[instrument(level = "info", skip_all, fields(%base_url, pages))]
pub async fn index_articles(base_url: &str, pages: u32) -> Vec<String> {
    let per_page: Vec<Vec<String>> = stream::iter(1..=pages)
        .then(|page| async move {
            let url = page_url(base_url, page);
            match fetch_html(&url).await {
                Ok(html) => {
                    let links = parse_listing(&html, &url);
                    info!(page, count = links.len(), "Indexed listing page");
                    links
                }
                Err(e) => {
                    error!(page, %url, error = %e, "Listing page fetch failed; skipping");
                    Vec::new()
                }
            }
        })
        .collect()
        .await;

    let urls: Vec<String> = per_page.into_iter().flatten().unique().collect();
    info!(count = urls.len(), "Indexed article URLs");
    debug!(urls = ?urls, "Candidate URLs");
    urls
}
