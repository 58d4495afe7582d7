//! Markup-stripping tokenizer for HTML-flavored fields
//!
//! `HtmlStripTokenizer` reduces its input to the text nodes of the parsed HTML
//! fragment, separated by spaces, and hands the result to tantivy's
//! `SimpleTokenizer`. Offsets of the produced tokens refer to the stripped text.

use scraper::Html;
use tantivy::tokenizer::{SimpleTokenizer, Tokenizer};

#[derive(Clone, Default)]
pub struct HtmlStripTokenizer {
    buffer: String,
    inner: SimpleTokenizer,
}

impl Tokenizer for HtmlStripTokenizer {
    type TokenStream<'a> = <SimpleTokenizer as Tokenizer>::TokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        let Self { buffer, inner } = self;
        buffer.clear();
        strip_markup_into(text, buffer);
        inner.token_stream(buffer.as_str())
    }
}

/// Append the text content of an HTML fragment to `out`
///
/// Entities are decoded; element boundaries become a single space so that
/// `<p>one</p><p>two</p>` yields two words.
pub fn strip_markup_into(html: &str, out: &mut String) {
    if !html.contains(['<', '&']) {
        out.push_str(html);
        return;
    }

    let fragment = Html::parse_fragment(html);
    for text in fragment.root_element().text() {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(text);
    }
}

/// Text content of an HTML fragment
#[must_use]
pub fn strip_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    strip_markup_into(html, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::tokenizer::TokenStream;

    fn tokens(text: &str) -> Vec<String> {
        let mut tokenizer = HtmlStripTokenizer::default();
        let mut stream = tokenizer.token_stream(text);
        let mut out = Vec::new();
        while stream.advance() {
            out.push(stream.token().text.clone());
        }
        out
    }

    #[test]
    fn test_strip_markup_keeps_text_nodes() {
        assert_eq!(
            strip_markup("<p>Budget <b>Meeting</b></p><p>Agenda</p>"),
            "Budget Meeting Agenda"
        );
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        assert_eq!(strip_markup("Fish &amp; Chips"), "Fish & Chips");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(strip_markup("no markup here"), "no markup here");
    }

    #[test]
    fn test_tags_and_attributes_are_not_tokens() {
        let tokens = tokens(r#"<a href="https://example.org/review">annual</a> <em>report</em>"#);
        assert_eq!(tokens, ["annual", "report"]);
    }

    #[test]
    fn test_adjacent_elements_do_not_merge_words() {
        assert_eq!(tokens("<li>one</li><li>two</li>"), ["one", "two"]);
    }
}
