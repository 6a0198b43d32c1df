//! Referenced documents for cited passages

use crate::config::ReferenceConfig;
use crate::types::{Passage, ReferencedDocument};

/// Build display references for the cited passage IDs, in citation order.
///
/// IDs with no matching passage are skipped.
pub fn build_references(
    passages: &[Passage],
    cited_ids: &[String],
    config: &ReferenceConfig,
) -> Vec<ReferencedDocument> {
    cited_ids
        .iter()
        .filter_map(|id| passages.iter().find(|p| &p.id == id))
        .map(|passage| ReferencedDocument {
            id: passage.id.clone(),
            source: passage.source.clone(),
            display_title: passage.display_title().to_string(),
            doc_url: document_url(&passage.source, config),
            score: passage.score,
        })
        .collect()
}

/// Public URL for a source, rewriting the configured prefix
fn document_url(source: &str, config: &ReferenceConfig) -> Option<String> {
    let prefix = config.source_prefix.as_deref()?;
    let base = config.document_base_url.as_deref()?;
    source
        .strip_prefix(prefix)
        .map(|rest| format!("{}{}", base, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passages() -> Vec<Passage> {
        vec![
            Passage::new("p1", "a", 0.9, "s3://ep-docs/rules/rules-of-procedure.pdf"),
            Passage::new("p2", "b", 0.6, "https://example.org/faq/"),
        ]
    }

    #[test]
    fn test_references_follow_citation_order() {
        let cited = vec!["p2".to_string(), "p1".to_string(), "missing".to_string()];
        let refs = build_references(&passages(), &cited, &ReferenceConfig::default());

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].id, "p2");
        assert_eq!(refs[0].display_title, "faq");
        assert_eq!(refs[1].display_title, "rules-of-procedure.pdf");
        assert!(refs[1].doc_url.is_none());
    }

    #[test]
    fn test_doc_url_prefix_rewrite() {
        let config = ReferenceConfig {
            source_prefix: Some("s3://ep-docs/".to_string()),
            document_base_url: Some("https://docs.example.org/".to_string()),
        };
        let cited = vec!["p1".to_string(), "p2".to_string()];
        let refs = build_references(&passages(), &cited, &config);

        assert_eq!(
            refs[0].doc_url.as_deref(),
            Some("https://docs.example.org/rules/rules-of-procedure.pdf")
        );
        // Sources outside the prefix get no URL
        assert!(refs[1].doc_url.is_none());
    }
}
