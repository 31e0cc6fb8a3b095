//! Category inference by substring match against an ordered term table.

use crate::config::{CategoryTerm, Tables};
use tracing::debug;

/// Ordered `(term, id)` pairs; earlier entries win ties.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    terms: Vec<CategoryTerm>,
    default_id: i64,
}

impl CategoryTable {
    pub fn new(terms: Vec<CategoryTerm>, default_id: i64) -> Self {
        Self { terms, default_id }
    }

    pub fn from_tables(tables: &Tables) -> Self {
        Self::new(tables.categories.clone(), tables.default_category)
    }

    pub fn default_id(&self) -> i64 {
        self.default_id
    }

    /// Id of the first term contained in `description`, else the default.
    pub fn classify(&self, description: &str) -> i64 {
        let hit = self
            .terms
            .iter()
            .find(|c| !c.term.is_empty() && description.contains(&c.term));

        match hit {
            Some(c) => {
                debug!(term = %c.term, id = c.id, "Matched category");
                c.id
            }
            None => self.default_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CategoryTable {
        CategoryTable::new(
            vec![
                CategoryTerm { term: "sports".to_string(), id: 22 },
                CategoryTerm { term: "economy".to_string(), id: 17 },
                CategoryTerm { term: String::new(), id: 99 },
            ],
            1,
        )
    }

    #[test]
    fn test_first_match_in_table_order_wins() {
        // "economy" appears first in the text, but "sports" is earlier in the table
        assert_eq!(table().classify("economy news and sports results"), 22);
    }

    #[test]
    fn test_no_match_returns_default() {
        assert_eq!(table().classify("weather report"), 1);
        assert_eq!(table().classify(""), 1);
    }

    #[test]
    fn test_classification_is_stable() {
        let t = table();
        let d = "the economy grew";
        assert_eq!(t.classify(d), 17);
        assert_eq!(t.classify(d), t.classify(d));
    }

    #[test]
    fn test_builtin_table() {
        let t = CategoryTable::from_tables(&Tables::default());
        assert_eq!(t.classify("આજના રમતગમત વર્તમાન બાબતો સમાચાર"), 22);
        assert_eq!(t.classify("વિજ્ and ાન અને તકનીકી વર્તમાન બાબતો"), 12);
        assert_eq!(t.default_id(), 1);
    }
}
