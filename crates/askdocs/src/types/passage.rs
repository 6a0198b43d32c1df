//! Retrieved passages

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A retrieved document fragment with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Identifier assigned by the retrieval service
    pub id: String,
    /// Text content of the fragment
    pub text: String,
    /// Relevance score (higher is more relevant)
    pub score: f32,
    /// Reference to the source document (URI or path)
    pub source: String,
}

impl Passage {
    /// Create a new passage
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        score: f32,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            score,
            source: source.into(),
        }
    }

    /// Descending relevance order. NaN scores sort last.
    pub fn cmp_relevance(a: &Passage, b: &Passage) -> Ordering {
        match (a.score.is_nan(), b.score.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        }
    }

    /// Sort passages by relevance descending, keeping retrieval order for ties
    pub fn sort_by_relevance(passages: &mut [Passage]) {
        // slice::sort_by is stable
        passages.sort_by(Self::cmp_relevance);
    }

    /// Last path segment of the source, used as a display title
    pub fn display_title(&self) -> &str {
        self.source
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut passages = vec![
            Passage::new("a", "", 0.5, ""),
            Passage::new("b", "", 0.9, ""),
            Passage::new("c", "", 0.5, ""),
            Passage::new("d", "", f32::NAN, ""),
            Passage::new("e", "", 0.7, ""),
        ];
        Passage::sort_by_relevance(&mut passages);

        let ids: Vec<&str> = passages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "e", "a", "c", "d"]);
    }

    #[test]
    fn test_display_title() {
        let p = Passage::new("1", "", 1.0, "s3://docs/policies/refunds.pdf");
        assert_eq!(p.display_title(), "refunds.pdf");

        let p = Passage::new("1", "", 1.0, "handbook");
        assert_eq!(p.display_title(), "handbook");
    }
}
