//! Static lookup tables driving translation and classification.
//!
//! The built-in tables target GKToday's English category names and their
//! curated Gujarati equivalents. A YAML file passed with `--tables` replaces
//! any table it names:
//!
//! ```yaml
//! phrases:
//!   - source: "Sports Current Affairs"
//!     target: "રમતગમત વર્તમાન બાબતો"
//! categories:
//!   - term: "રમતગમત વર્તમાન બાબતો"
//!     id: 22
//! default_category: 1
//! exclude_patterns:
//!   - "daily-current-affairs-quiz"
//! ```

use regex::RegexSet;
use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// A curated literal substitution applied before machine translation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Phrase {
    pub source: String,
    pub target: String,
}

/// A category term (in the target language) and its store id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryTerm {
    pub term: String,
    pub id: i64,
}

/// All tables, in priority order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub phrases: Vec<Phrase>,
    pub categories: Vec<CategoryTerm>,
    pub default_category: i64,
    pub exclude_patterns: Vec<String>,
}

const DEFAULT_CATEGORY_ID: i64 = 1;

// (English listing category, curated Gujarati term, store id)
const BUILTIN_CATEGORIES: [(&str, &str, i64); 14] = [
    ("Science & Technology Current Affairs", "વિજ્ઞાન અને ટેકનોલોજી વર્તમાન બાબતો", 12),
    ("Defence Current Affairs", "સંરક્ષણ વર્તમાન બાબતો", 13),
    ("Legal & Constitution Current Affairs", "કાનૂની અને બંધારણ વર્તમાન બાબતો", 14),
    ("Environment Current Affairs", "પર્યાવરણ વર્તમાન બાબતો", 15),
    ("Government Schemes Current Affairs", "સરકારી યોજનાઓ વર્તમાન બાબતો", 16),
    ("Economy & Banking Current Affairs", "અર્થતંત્ર અને બેંકિંગ વર્તમાન બાબતો", 17),
    ("International / World Current Affairs", "આંતરરાષ્ટ્રીય / વિશ્વ વર્તમાન બાબતો", 18),
    ("Summits & Conferences", "સમિટ અને પરિષદો", 19),
    ("Important Days & Events Current Affairs", "મહત્વપૂર્ણ દિવસો અને ઘટનાઓ વર્તમાન બાબતો", 20),
    ("Reports & Indices Current Affairs", "અહેવાલો અને સૂચકાંકો વર્તમાન બાબતો", 21),
    ("Sports Current Affairs", "રમતગમત વર્તમાન બાબતો", 22),
    ("Awards, Honours & Persons in News", "સમાચારમાં પુરસ્કારો, સન્માનો અને વ્યક્તિઓ", 23),
    ("Agriculture Current Affairs", "કૃષિ વર્તમાન બાબતો", 24),
    ("Art & Culture Current Affairs", "કલા અને સંસ્કૃતિ વર્તમાન બાબતો", 25),
];

// Known machine-translation variant of the science category.
const LEGACY_CATEGORY_TERMS: [(&str, i64); 1] = [("વિજ્ and ાન અને તકનીકી વર્તમાન બાબતો", 12)];

impl Default for Tables {
    fn default() -> Self {
        let phrases = BUILTIN_CATEGORIES
            .iter()
            .map(|(source, target, _)| Phrase {
                source: source.to_string(),
                target: target.to_string(),
            })
            .collect();

        let categories = BUILTIN_CATEGORIES
            .iter()
            .map(|(_, term, id)| (*term, *id))
            .chain(LEGACY_CATEGORY_TERMS)
            .map(|(term, id)| CategoryTerm {
                term: term.to_string(),
                id,
            })
            .collect();

        Self {
            phrases,
            categories,
            default_category: DEFAULT_CATEGORY_ID,
            exclude_patterns: vec!["daily-current-affairs-quiz".to_string()],
        }
    }
}

impl Tables {
    /// Parse tables from YAML; sections absent from the document keep their
    /// built-in values.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let yaml = tokio::fs::read_to_string(path.as_ref()).await?;
        let tables = Self::from_yaml(&yaml)?;
        info!(
            phrases = tables.phrases.len(),
            categories = tables.categories.len(),
            exclude_patterns = tables.exclude_patterns.len(),
            "Loaded tables"
        );
        Ok(tables)
    }

    /// Compile the exclusion patterns.
    pub fn url_filter(&self) -> Result<UrlFilter, regex::Error> {
        Ok(UrlFilter {
            patterns: RegexSet::new(&self.exclude_patterns)?,
        })
    }
}

/// Rejects candidate URLs that are known not to be articles.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    patterns: RegexSet,
}

impl UrlFilter {
    pub fn is_excluded(&self, url: &str) -> bool {
        self.patterns.is_match(url)
    }
}
