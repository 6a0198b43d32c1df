//! Passage context rendering
//!
//! Passages are rendered as an XML-style `<documents>` block, numbered from 1
//! in the order given. Documents are referenced by that number in answers.

use crate::types::Passage;

/// Render passages into the text that fills the `{passages}` slot.
///
/// Returns an empty string when there are no passages.
pub fn format_context<'a, I>(passages: I) -> String
where
    I: IntoIterator<Item = &'a Passage>,
{
    let mut context = String::new();

    for (i, passage) in passages.into_iter().enumerate() {
        if i == 0 {
            context.push_str("<documents>");
        }
        context.push_str("<document>");
        context.push_str(&format!("<document_id>{}</document_id>", i + 1));
        context.push_str(&format!("<source>{}</source>", sanitize(&passage.source)));
        context.push_str(&format!(
            "<document_excerpt>{}</document_excerpt>",
            sanitize(&passage.text)
        ));
        context.push_str("</document>");
    }

    if !context.is_empty() {
        context.push_str("</documents>");
    }

    context
}

/// Strip control characters (newline and tab survive) and characters that
/// break the quoting of downstream JSON request templates.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .map(|c| match c {
            '"' => '\'',
            '\\' => '/',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        assert_eq!(format_context(&[] as &[Passage]), "");
    }

    #[test]
    fn test_documents_numbered_in_order() {
        let passages = vec![
            Passage::new("a", "First excerpt.", 0.9, "s3://docs/a.pdf"),
            Passage::new("b", "Second excerpt.", 0.5, "s3://docs/b.pdf"),
        ];

        let context = format_context(&passages);
        assert_eq!(
            context,
            "<documents>\
             <document><document_id>1</document_id><source>s3://docs/a.pdf</source>\
             <document_excerpt>First excerpt.</document_excerpt></document>\
             <document><document_id>2</document_id><source>s3://docs/b.pdf</source>\
             <document_excerpt>Second excerpt.</document_excerpt></document>\
             </documents>"
        );
    }

    #[test]
    fn test_excerpt_sanitized() {
        let passages = vec![Passage::new(
            "a",
            "He said \"C:\\temp\"\u{0}\u{7}\nnext\tline",
            0.9,
            "s3://docs/a.pdf",
        )];

        let context = format_context(&passages);
        assert!(context.contains("He said 'C:/temp'\nnext\tline"));
        assert!(!context.contains('\u{0}'));
        assert!(!context.contains('"'));
    }
}
