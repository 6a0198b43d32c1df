//! Prompt templates and assembly

use serde::{Deserialize, Serialize};

use super::context::format_context;
use crate::error::{Error, Result};
use crate::types::Passage;

/// Slot replaced by the question text
pub const QUESTION_SLOT: &str = "{question}";
/// Slot replaced by the rendered passages
pub const PASSAGES_SLOT: &str = "{passages}";
/// Optional slot replaced by caller instructions
pub const INSTRUCTIONS_SLOT: &str = "{instructions}";

const DEFAULT_SYSTEM: &str = "You are a document-grounded assistant. \
Answer ONLY with information explicitly stated in the documents you are given. \
If the documents do not contain the answer, say that the information is not available \
in the provided documents. Never use external knowledge.";

const DEFAULT_BODY: &str = r#"Here are the documents retrieved for the question:
{passages}

Answer the question using only these documents. Cite each document you rely on
by its document_id in square brackets, for example [1].
{instructions}

Question: {question}"#;

/// Instruction template for the generation prompt
///
/// `body` must contain `{question}` and `{passages}`; `{instructions}` is optional.
/// Fields left out of a config file take their defaults; `system = ""` disables
/// the system text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    /// System text forwarded alongside the prompt
    pub system: Option<String>,
    /// Prompt body with placeholder slots
    pub body: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: Some(DEFAULT_SYSTEM.to_string()),
            body: DEFAULT_BODY.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Create a template with no system text
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            system: None,
            body: body.into(),
        }
    }

    /// Set the system text
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// System text to send, `None` when unset or empty
    pub fn system_text(&self) -> Option<&str> {
        self.system.as_deref().filter(|s| !s.is_empty())
    }

    /// Check that the required slots are present
    pub fn validate(&self) -> Result<()> {
        for slot in [QUESTION_SLOT, PASSAGES_SLOT] {
            if !self.body.contains(slot) {
                return Err(Error::template(format!("template is missing the {} slot", slot)));
            }
        }
        Ok(())
    }

    /// Substitute every slot in one left-to-right pass.
    ///
    /// Substituted text is never scanned again, so braces inside the question
    /// or a passage come through untouched.
    fn render(&self, question: &str, passages: &str, instructions: &str) -> String {
        let slots = [
            (QUESTION_SLOT, question),
            (PASSAGES_SLOT, passages),
            (INSTRUCTIONS_SLOT, instructions),
        ];

        let mut out = String::with_capacity(
            self.body.len() + question.len() + passages.len() + instructions.len(),
        );
        let mut rest = self.body.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];

            match slots.iter().find(|(slot, _)| tail.starts_with(slot)) {
                Some((slot, value)) => {
                    out.push_str(value);
                    rest = &tail[slot.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);

        out
    }
}

/// An assembled prompt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
    system: Option<String>,
    passage_ids: Vec<String>,
    dropped_ids: Vec<String>,
}

impl Prompt {
    /// Prompt text sent to the model
    pub fn text(&self) -> &str {
        &self.text
    }

    /// System text, if the template has one
    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    /// IDs of the passages embedded in the prompt, in prompt order
    pub fn passage_ids(&self) -> &[String] {
        &self.passage_ids
    }

    /// IDs of the passages dropped to respect the size limit
    pub fn dropped_ids(&self) -> &[String] {
        &self.dropped_ids
    }

    pub fn is_truncated(&self) -> bool {
        !self.dropped_ids.is_empty()
    }

    /// Prompt length in characters, system text included
    pub fn char_len(&self) -> usize {
        self.text.chars().count() + self.system.as_deref().map_or(0, |s| s.chars().count())
    }
}

/// Builds prompts from a query, retrieved passages and a template
#[derive(Debug, Clone, Copy)]
pub struct PromptAssembler {
    max_prompt_chars: usize,
}

impl PromptAssembler {
    /// Create an assembler with a prompt size limit in characters
    pub fn new(max_prompt_chars: usize) -> Self {
        Self { max_prompt_chars }
    }

    pub fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    /// Assemble a prompt.
    ///
    /// Passages are rendered in the order given. While the prompt, system text
    /// included, exceeds the size limit, the lowest-scoring remaining passage is dropped (the later
    /// one on ties). The query itself is never dropped, so a prompt may still
    /// exceed the limit once every passage is gone.
    pub fn assemble(
        &self,
        query: &str,
        passages: &[Passage],
        template: &PromptTemplate,
        instructions: Option<&str>,
    ) -> Result<Prompt> {
        template.validate()?;

        let instructions = instructions.unwrap_or_default();
        let system = template.system_text();
        let system_len = system.map_or(0, |s| s.chars().count());
        let mut kept: Vec<&Passage> = passages.iter().collect();
        let mut dropped: Vec<String> = Vec::new();

        let text = loop {
            let context = format_context(kept.iter().copied());
            let text = template.render(query, &context, instructions);

            if text.chars().count() + system_len <= self.max_prompt_chars || kept.is_empty() {
                break text;
            }

            let lowest = kept
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| Passage::cmp_relevance(a, b))
                .map(|(i, _)| i);

            match lowest {
                Some(i) => dropped.push(kept.remove(i).id.clone()),
                None => break text,
            }
        };

        if !dropped.is_empty() {
            tracing::info!(
                dropped = ?dropped,
                kept = kept.len(),
                max_prompt_chars = self.max_prompt_chars,
                "Prompt truncated to fit size limit"
            );
        }

        let char_len = text.chars().count() + system_len;
        if char_len > self.max_prompt_chars {
            tracing::warn!(
                "Prompt is {} chars without passages, above the {} char limit",
                char_len,
                self.max_prompt_chars
            );
        }

        Ok(Prompt {
            text,
            system: system.map(str::to_string),
            passage_ids: kept.iter().map(|p| p.id.clone()).collect(),
            dropped_ids: dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn passages(scores: &[f32]) -> Vec<Passage> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Passage::new(
                    format!("p{}", i),
                    format!("Excerpt number {} with some text.", i),
                    *s,
                    format!("s3://docs/doc{}.pdf", i),
                )
            })
            .collect()
    }

    #[test]
    fn test_default_template_is_valid() {
        assert!(PromptTemplate::default().validate().is_ok());
        assert!(PromptTemplate::default().system.is_some());
    }

    #[test]
    fn test_missing_slots_rejected() {
        let no_passages = PromptTemplate::new("Question: {question}");
        assert!(matches!(no_passages.validate(), Err(Error::Template(_))));

        let no_question = PromptTemplate::new("Context: {passages}");
        assert!(matches!(no_question.validate(), Err(Error::Template(_))));

        let result = PromptAssembler::new(1000).assemble("q", &[], &no_passages, None);
        assert!(matches!(result, Err(Error::Template(_))));
    }

    #[test]
    fn test_passages_embedded_in_given_order() {
        let passages = passages(&[0.9, 0.7, 0.4]);
        let prompt = PromptAssembler::new(10_000)
            .assemble("What is the refund policy?", &passages, &PromptTemplate::default(), None)
            .unwrap();

        let text = prompt.text();
        let first = text.find("Excerpt number 0").unwrap();
        let second = text.find("Excerpt number 1").unwrap();
        let third = text.find("Excerpt number 2").unwrap();
        assert!(first < second && second < third);
        assert!(text.contains("What is the refund policy?"));
        assert_eq!(prompt.passage_ids(), &["p0", "p1", "p2"]);
        assert!(!prompt.is_truncated());
    }

    #[test]
    fn test_no_passages_gives_passage_free_prompt() {
        let template = PromptTemplate::new("Context:[{passages}] Q: {question}");
        let prompt = PromptAssembler::new(1000)
            .assemble("Is it open on Sunday?", &[], &template, None)
            .unwrap();

        assert_eq!(prompt.text(), "Context:[] Q: Is it open on Sunday?");
        assert!(prompt.passage_ids().is_empty());
        assert!(prompt.system().is_none());
    }

    #[test]
    fn test_single_pass_substitution() {
        let template = PromptTemplate::new("{instructions}|{passages}|{question}|{unknown}");
        let question = "What does {passages} mean?";
        let prompt = PromptAssembler::new(10_000)
            .assemble(question, &[], &template, Some("Answer in {question} style"))
            .unwrap();

        assert_eq!(
            prompt.text(),
            "Answer in {question} style||What does {passages} mean?|{unknown}"
        );
    }

    #[test]
    fn test_instructions_slot_empty_when_absent() {
        let template = PromptTemplate::new("[{instructions}] {passages} {question}");
        let prompt = PromptAssembler::new(100)
            .assemble("q", &[], &template, None)
            .unwrap();
        assert_eq!(prompt.text(), "[]  q");
    }

    #[test]
    fn test_truncation_drops_lowest_scores_first() {
        let passages = passages(&[0.9, 0.2, 0.7, 0.4]);
        let template = PromptTemplate::new("{passages}\n{question}");
        // Room for exactly the two best passages
        let best = vec![passages[0].clone(), passages[2].clone()];
        let limit = PromptAssembler::new(usize::MAX)
            .assemble("q", &best, &template, None)
            .unwrap()
            .char_len();

        let prompt = PromptAssembler::new(limit)
            .assemble("q", &passages, &template, None)
            .unwrap();

        assert!(prompt.char_len() <= limit);
        assert_eq!(prompt.dropped_ids(), &["p1", "p3"]);
        assert_eq!(prompt.passage_ids(), &["p0", "p2"]);
    }

    #[test]
    fn test_system_text_counts_toward_limit() {
        let passages = passages(&[0.9, 0.5]);
        let plain = PromptTemplate::new("{passages}\n{question}");
        let body_len = PromptAssembler::new(usize::MAX)
            .assemble("q", &passages[..1], &plain, None)
            .unwrap()
            .char_len();

        // Limit fits one passage plus the system text, not two
        let system = "S".repeat(500);
        let template = plain.with_system(system.clone());
        let limit = body_len + system.len();
        let prompt = PromptAssembler::new(limit)
            .assemble("q", &passages, &template, None)
            .unwrap();

        assert_eq!(prompt.passage_ids(), &["p0"]);
        assert_eq!(prompt.dropped_ids(), &["p1"]);
        assert_eq!(prompt.char_len(), limit);
        assert_eq!(prompt.system(), Some(system.as_str()));
    }

    #[test]
    fn test_empty_system_text_is_omitted() {
        let template = PromptTemplate::new("{passages}{question}").with_system("");
        let prompt = PromptAssembler::new(100)
            .assemble("q", &[], &template, None)
            .unwrap();
        assert!(prompt.system().is_none());
        assert_eq!(prompt.char_len(), 1);

        let parsed: PromptTemplate = toml::from_str("system = \"\"\nbody = \"{passages}{question}\"").unwrap();
        assert!(parsed.system_text().is_none());

        let body_only: PromptTemplate = toml::from_str("body = \"{passages}{question}\"").unwrap();
        assert!(body_only.system_text().is_some());
    }

    #[test]
    fn test_query_survives_tiny_limit() {
        let passages = passages(&[0.9, 0.8]);
        let question = "A question longer than the limit itself";
        let prompt = PromptAssembler::new(5)
            .assemble(question, &passages, &PromptTemplate::default(), None)
            .unwrap();

        assert!(prompt.text().contains(question));
        assert!(prompt.passage_ids().is_empty());
        assert_eq!(prompt.dropped_ids().len(), 2);
    }

    proptest! {
        #[test]
        fn prop_assembly_is_deterministic(
            scores in proptest::collection::vec(0.0f32..1.0, 0..8),
            query in "[a-zA-Z ?{}]{1,40}",
            limit in 50usize..2000,
        ) {
            let mut passages = passages(&scores);
            Passage::sort_by_relevance(&mut passages);
            let assembler = PromptAssembler::new(limit);
            let template = PromptTemplate::default();

            let a = assembler.assemble(&query, &passages, &template, None).unwrap();
            let b = assembler.assemble(&query, &passages, &template, None).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_truncation_keeps_highest_scores_in_order(
            scores in proptest::collection::vec(0.0f32..1.0, 1..8),
            limit in 50usize..600,
        ) {
            let mut passages = passages(&scores);
            Passage::sort_by_relevance(&mut passages);
            let template = PromptTemplate::new("{passages}{question}");

            let prompt = PromptAssembler::new(limit)
                .assemble("q", &passages, &template, None)
                .unwrap();

            // Sorted input: kept passages are exactly a prefix, in order
            let kept = prompt.passage_ids().len();
            let expected: Vec<String> = passages[..kept].iter().map(|p| p.id.clone()).collect();
            prop_assert_eq!(prompt.passage_ids(), expected.as_slice());
            prop_assert_eq!(kept + prompt.dropped_ids().len(), passages.len());
            prop_assert!(prompt.text().contains('q'));
        }
    }
}
