//! HTML document rendering for the content store.

use crate::models::{BlockKind, ContentBlock};
use crate::utils::truncate_chars;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;
use tracing::{debug, instrument};

const SITE_HEADER: &str = "કરંટ અફેર ગુજરાતી";
const TITLE_SUFFIX: &str = "અમારુ એપ ગુજરાતનુ એકમાત્ર એપ છે જે દરરોજ કેટેગરી પ્રમાણે અને પ્ર્શ્નો સહિત એટલુ કરંટ અફેર ફ્રીમા આપે છે.";
const FONT_HREF: &str = "https://fonts.googleapis.com/css2?family=Hind+Vadodara:wght@300;400;500;600;700&display=swap";
const FALLBACK_TITLE: &str = "Article";

const STYLESHEET: &str = r#"<style>
body { font-family: 'Hind Vadodara', sans-serif; color: #34495e; line-height: 1.8; margin: 0; }
.header { background: linear-gradient(90deg, #2c3e50, #e74c3c); color: #fff; padding: 3rem 1rem; text-align: center; }
.news-content { max-width: 900px; margin: 3rem auto; padding: 2rem; background: #fff; border-radius: 15px; }
.news-title { font-size: 2.8rem; color: #2c3e50; text-align: center; margin-bottom: 2rem; }
.news-subheading { font-size: 1.8rem; color: #2c3e50; margin: 2rem 0 1rem; }
.news-minor-heading { font-size: 1.3rem; color: #2c3e50; margin: 1.5rem 0 0.5rem; }
.news-paragraph { font-size: 1.2rem; margin: 1.5rem 0; padding: 1rem; background: #ecf0f1; border-radius: 10px; text-align: justify; }
.news-list-item { font-size: 1.1rem; margin: 1rem 0; padding: 1.5rem 1.5rem 1.5rem 3rem; background: #dfe6e9; border-radius: 12px; }
@media (max-width: 768px) { .news-content { margin: 1.5rem; padding: 1.5rem; } .news-title { font-size: 2rem; } }
</style>"#;

fn element_for(kind: BlockKind) -> (&'static str, &'static str) {
    match kind {
        BlockKind::Heading => ("h1", "news-title"),
        BlockKind::Paragraph => ("p", "news-paragraph"),
        BlockKind::SubHeading => ("h2", "news-subheading"),
        BlockKind::MinorHeading => ("h4", "news-minor-heading"),
        BlockKind::ListItem => ("div", "news-list-item"),
    }
}

/// Text for `<title>`: the first heading or paragraph, capped at 100 chars,
/// followed by the app tagline.
fn document_title(blocks: &[ContentBlock]) -> String {
    let lead = blocks
        .iter()
        .filter(|b| b.is_valid())
        .find(|b| matches!(b.kind, BlockKind::Heading | BlockKind::Paragraph))
        .map(|b| b.text.trim())
        .unwrap_or(FALLBACK_TITLE);
    format!("{}{}", truncate_chars(lead, 100), TITLE_SUFFIX)
}

/// Render `blocks` into a complete HTML page. Blocks with blank text are
/// dropped; `&`, `<` and `>` in text are escaped, everything else is kept
/// verbatim.
#[instrument(level = "debug", skip_all, fields(blocks = blocks.len()))]
pub fn render_document(blocks: &[ContentBlock], lang: &str) -> String {
    let mut html = String::with_capacity(4096);

    // writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n\
         <link href=\"{font}\" rel=\"stylesheet\">\n{css}\n</head>\n<body>\n\
         <header class=\"header\"><h1>{header}</h1></header>\n\
         <article class=\"news-content\">\n",
        lang = encode_double_quoted_attribute(lang),
        title = encode_text(&document_title(blocks)),
        font = FONT_HREF.replace('&', "&amp;"),
        css = STYLESHEET,
        header = SITE_HEADER,
    );

    let mut rendered = 0usize;
    for block in blocks {
        if !block.is_valid() {
            debug!(kind = ?block.kind, "Skipping empty block");
            continue;
        }
        let (tag, class) = element_for(block.kind);
        let _ = writeln!(
            html,
            "<{tag} class=\"{class}\">{}</{tag}>",
            encode_text(block.text.trim())
        );
        rendered += 1;
    }

    html.push_str("</article>\n</body>\n</html>\n");
    debug!(rendered, bytes = html.len(), "Rendered document");
    html
}
