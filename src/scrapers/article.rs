//! Article page extraction.
//!
//! The content container and the heading are located with ordered selector
//! chains; the first link in a chain that matches wins. Failing either chain
//! is a structural error and the article is discarded.
//!
//! Blocks come from the container's immediate element children in document
//! order:
//!
//! | Child | Block(s) |
//! |-------|----------|
//! | `p` | [`BlockKind::Paragraph`] |
//! | `h2` | [`BlockKind::SubHeading`] |
//! | `h4` | [`BlockKind::MinorHeading`] |
//! | `ul` | one [`BlockKind::ListItem`] per `li` |
//!
//! Children carrying a denylisted class are skipped, as are children whose
//! trimmed text is empty. Text is returned untranslated.

use crate::error::ExtractionError;
use crate::models::{BlockKind, ContentBlock};
use crate::utils::resolve_url;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

/// Where a heading selector is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Container,
    Document,
}

struct Link {
    scope: Scope,
    selector: Selector,
}

impl Link {
    fn new(scope: Scope, css: &str) -> Self {
        Self {
            scope,
            selector: Selector::parse(css).unwrap(),
        }
    }
}

static CONTAINER_CHAIN: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["div.inside_post.column.content_width", "article", "div.content"]
        .iter()
        .map(|css| Selector::parse(css).unwrap())
        .collect()
});

static HEADING_CHAIN: Lazy<Vec<Link>> = Lazy::new(|| {
    vec![
        Link::new(Scope::Container, "h1#list"),
        Link::new(Scope::Container, "h1"),
        Link::new(Scope::Document, "title"),
    ]
});

static FIRST_PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static LIST_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static FEATURED_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.featured_image img[src]").unwrap());

const SKIPPED_CLASSES: [&str; 2] = ["sharethis-inline-share-buttons", "prenext"];

/// Untranslated content of one article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: String,
    /// Body blocks in render order, excluding the heading.
    pub blocks: Vec<ContentBlock>,
    /// First `p` anywhere in the container, for the notification summary.
    pub first_paragraph: Option<String>,
    /// Absolute URL of the featured image.
    pub image_url: Option<String>,
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn is_skipped(el: &ElementRef<'_>) -> bool {
    el.value()
        .classes()
        .any(|class| SKIPPED_CLASSES.contains(&class))
}

fn find_container<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
    CONTAINER_CHAIN
        .iter()
        .find_map(|selector| document.select(selector).next())
}

fn find_heading<'a>(document: &'a Html, container: &ElementRef<'a>) -> Option<String> {
    HEADING_CHAIN.iter().find_map(|link| {
        let mut candidates = match link.scope {
            Scope::Container => container.select(&link.selector),
            Scope::Document => document.root_element().select(&link.selector),
        };
        candidates
            .next()
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty())
    })
}

fn collect_blocks(container: &ElementRef<'_>) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();

    for child in container.children().filter_map(ElementRef::wrap) {
        if is_skipped(&child) {
            continue;
        }

        let tag = child.value().name();
        if tag == "ul" {
            blocks.extend(
                child
                    .select(&LIST_ITEM)
                    .filter_map(|li| ContentBlock::new(BlockKind::ListItem, &element_text(&li))),
            );
        } else if let Some(kind) = BlockKind::from_tag(tag) {
            blocks.extend(ContentBlock::new(kind, &element_text(&child)));
        }
    }

    blocks
}

/// Extract heading, blocks, summary paragraph, and image from an article page.
#[instrument(level = "debug", skip_all, fields(%page_url))]
pub fn extract(html: &str, page_url: &str) -> Result<ExtractedPage, ExtractionError> {
    let document = Html::parse_document(html);

    let container = find_container(&document).ok_or(ExtractionError::NoContainer)?;
    let title = find_heading(&document, &container).ok_or(ExtractionError::NoHeading)?;

    let first_paragraph = container
        .select(&FIRST_PARAGRAPH)
        .map(|p| element_text(&p))
        .find(|text| !text.is_empty());

    let image_url = document
        .select(&FEATURED_IMAGE)
        .filter_map(|img| img.value().attr("src"))
        .find_map(|src| resolve_url(page_url, src));

    let blocks = collect_blocks(&container);
    debug!(blocks = blocks.len(), has_image = image_url.is_some(), "Extracted article");

    Ok(ExtractedPage {
        title,
        blocks,
        first_paragraph,
        image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://www.gktoday.in/some-article/";

    const ARTICLE: &str = r#"
        <html><head><title>Page Title | GKToday</title></head><body>
          <div class="featured_image"><img src="/wp-content/uploads/pic.jpg"></div>
          <div class="inside_post column content_width">
            <h1 id="list">India Launches Satellite</h1>
            <p>  First paragraph.  </p>
            <div class="sharethis-inline-share-buttons"><p>Share me</p></div>
            <h2>Background</h2>
            <p>   </p>
            <ul><li>Point one</li><li>  </li><li>Point two</li></ul>
            <h4>Key facts</h4>
            <div>ignored wrapper</div>
            <p>Second paragraph.</p>
            <div class="prenext"><a href="/prev">Prev</a></div>
          </div>
        </body></html>
    "#;

    fn kinds(blocks: &[ContentBlock]) -> Vec<BlockKind> {
        blocks.iter().map(|b| b.kind).collect()
    }

    #[test]
    fn test_extract_full_article() {
        let page = extract(ARTICLE, PAGE_URL).unwrap();

        assert_eq!(page.title, "India Launches Satellite");
        assert_eq!(page.first_paragraph.as_deref(), Some("First paragraph."));
        assert_eq!(
            page.image_url.as_deref(),
            Some("https://www.gktoday.in/wp-content/uploads/pic.jpg")
        );
        assert_eq!(
            kinds(&page.blocks),
            vec![
                BlockKind::Paragraph,
                BlockKind::SubHeading,
                BlockKind::ListItem,
                BlockKind::ListItem,
                BlockKind::MinorHeading,
                BlockKind::Paragraph,
            ]
        );
        assert_eq!(page.blocks[0].text, "First paragraph.");
        assert_eq!(page.blocks[3].text, "Point two");
        assert!(page.blocks.iter().all(|b| !b.text.contains("Share me")));
        assert!(page.blocks.iter().all(ContentBlock::is_valid));
    }

    #[test]
    fn test_no_container() {
        let html = "<html><head><title>T</title></head><body><div class='sidebar'><p>x</p></div></body></html>";
        assert_eq!(extract(html, PAGE_URL), Err(ExtractionError::NoContainer));
    }

    #[test]
    fn test_container_fallback_to_article_tag() {
        let html = "<html><body><article><h1>Plain heading</h1><p>Body</p></article></body></html>";
        let page = extract(html, PAGE_URL).unwrap();
        assert_eq!(page.title, "Plain heading");
        assert_eq!(kinds(&page.blocks), vec![BlockKind::Paragraph]);
        assert_eq!(page.image_url, None);
    }

    #[test]
    fn test_heading_falls_back_to_page_title() {
        let html = "<html><head><title>From Title Tag</title></head><body><div class='content'><p>Body</p></div></body></html>";
        let page = extract(html, PAGE_URL).unwrap();
        assert_eq!(page.title, "From Title Tag");
    }

    #[test]
    fn test_no_heading() {
        let html = "<html><body><div class='content'><p>Body only</p></div></body></html>";
        assert_eq!(extract(html, PAGE_URL), Err(ExtractionError::NoHeading));
    }

    #[test]
    fn test_first_paragraph_may_be_nested() {
        let html = "<html><body><article><h1>H</h1><div><p>Nested intro</p></div></article></body></html>";
        let page = extract(html, PAGE_URL).unwrap();
        assert_eq!(page.first_paragraph.as_deref(), Some("Nested intro"));
        // nested p is not an immediate child, so it is not a block
        assert!(page.blocks.is_empty());
    }
}
