//! Source-site scraping.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Indexing** ([`listing`]): walk a bounded range of listing pages and
//!    collect candidate article URLs
//! 2. **Extraction** ([`article`]): turn one article page into an ordered
//!    sequence of typed content blocks
//!
//! Both phases rely on the source's stable markup:
//!
//! | Marker | Used for |
//! |--------|----------|
//! | `h1#list a[href]` | article links on listing pages |
//! | `div.inside_post.column.content_width` / `article` / `div.content` | content container |
//! | `h1#list` / `h1` / `title` | article heading |
//! | `div.featured_image img[src]` | featured image |
//! | `.sharethis-inline-share-buttons`, `.prenext` | skipped widgets |

pub mod article;
pub mod listing;
