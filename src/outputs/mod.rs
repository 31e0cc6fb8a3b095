//! Output generation for published articles.
//!
//! # Submodules
//!
//! - [`html`]: renders an ordered block sequence into the single HTML document
//!   stored as the article body
//!
//! # Document Structure
//!
//! ```text
//! <html lang="gu">
//! ├── <head>   title, meta, stylesheet
//! └── <body>
//!     ├── <header class="header">
//!     └── <article class="news-content">
//!         ├── <h1 class="news-title">          Heading
//!         ├── <p class="news-paragraph">       Paragraph
//!         ├── <h2 class="news-subheading">     SubHeading
//!         ├── <h4 class="news-minor-heading">  MinorHeading
//!         └── <div class="news-list-item">     ListItem
//! ```

pub mod html;
