//! Resolution of inline `[doc<id>]` tokens into a stable reference list
//!
//! Generated answer text embeds citation references as bracketed tokens.
//! Resolution rewrites each known token into a superscript marker (`^N^`)
//! and produces the list of referenced citations numbered by order of
//! first appearance, de-duplicated by citation id.

use crate::types::{Citation, StreamError};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Default character class for citation ids inside a token: anything up to
/// the closing bracket. The exact id grammar is backend-dependent, so it is
/// kept configurable rather than guessed stricter than the wire produces.
const DEFAULT_TOKEN_PATTERN: &str = r"\[doc([^\[\]]+?)\]";

/// Result of resolving an answer: rewritten text plus the referenced
/// citations in first-appearance order, each tagged with its `reindex_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAnswer {
    pub text: String,
    pub citations: Vec<Citation>,
}

pub struct CitationResolver {
    token: Regex,
}

impl Default for CitationResolver {
    fn default() -> Self {
        // The default pattern is known valid.
        Self::with_pattern(DEFAULT_TOKEN_PATTERN).unwrap()
    }
}

impl CitationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver with a custom token pattern. The pattern must have
    /// exactly one capture group yielding the citation id.
    pub fn with_pattern(pattern: &str) -> Result<Self, StreamError> {
        let token = Regex::new(pattern)
            .map_err(|err| StreamError::Transport(format!("invalid citation pattern: {err}")))?;
        // captures_len counts the implicit whole-match group.
        if token.captures_len() != 2 {
            return Err(StreamError::Transport(
                "citation pattern must have exactly one capture group for the id".to_string(),
            ));
        }
        Ok(Self { token })
    }

    /// Rewrite citation tokens in `answer` and collect the referenced
    /// citations.
    ///
    /// Numbering starts at 1 and follows first appearance in the text, not
    /// the order of the supplied citation set. Tokens whose id matches no
    /// supplied citation are left verbatim. Already-resolved text contains
    /// no tokens, so resolution is idempotent.
    pub fn resolve(&self, answer: &str, citations: &[Citation]) -> ResolvedAnswer {
        let mut order: HashMap<&str, u32> = HashMap::new();
        let mut resolved: Vec<Citation> = Vec::new();
        let mut text = String::with_capacity(answer.len());
        let mut last_end = 0;

        for caps in self.token.captures_iter(answer) {
            let token = caps.get(0).unwrap();
            let id = caps.get(1).unwrap().as_str();

            let Some(citation) = citations.iter().find(|c| c.id == id) else {
                // Unknown id: keep the token verbatim, assign no number.
                continue;
            };

            let sequence = match order.get(id) {
                Some(&seen) => seen,
                None => {
                    let next = order.len() as u32 + 1;
                    order.insert(id, next);
                    let mut tagged = citation.clone();
                    tagged.reindex_id = Some(next);
                    resolved.push(tagged);
                    next
                }
            };

            text.push_str(&answer[last_end..token.start()]);
            text.push_str(&format!("^{sequence}^"));
            last_end = token.end();
        }
        text.push_str(&answer[last_end..]);

        debug!(
            referenced = resolved.len(),
            supplied = citations.len(),
            "citations resolved"
        );
        ResolvedAnswer {
            text,
            citations: resolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(id: &str) -> Citation {
        Citation {
            id: id.to_string(),
            title: Some(format!("Document {id}")),
            filepath: Some(format!("docs/{id}.md")),
            url: None,
            content: format!("content of {id}"),
            metadata: None,
            chunk_id: Some("0".to_string()),
            reindex_id: None,
        }
    }

    #[test]
    fn duplicate_tokens_share_one_number_and_one_entry() {
        let resolver = CitationResolver::new();
        let result = resolver.resolve("[doc1] and [doc1].", &[citation("1")]);

        assert_eq!(result.text, "^1^ and ^1^.");
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].reindex_id, Some(1));
    }

    #[test]
    fn unknown_id_passes_through_verbatim() {
        let resolver = CitationResolver::new();
        let result = resolver.resolve("[doc1] and [doc99].", &[citation("1")]);

        assert_eq!(result.text, "^1^ and [doc99].");
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].id, "1");
    }

    #[test]
    fn numbering_follows_first_appearance_not_input_order() {
        let resolver = CitationResolver::new();
        let citations = [citation("1"), citation("2"), citation("3")];
        let result = resolver.resolve("see [doc3], then [doc1], then [doc3]", &citations);

        assert_eq!(result.text, "see ^1^, then ^2^, then ^1^");
        let ids: Vec<&str> = result.citations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(result.citations[0].reindex_id, Some(1));
        assert_eq!(result.citations[1].reindex_id, Some(2));
    }

    #[test]
    fn unreferenced_citations_are_dropped() {
        let resolver = CitationResolver::new();
        let citations = [citation("1"), citation("2")];
        let result = resolver.resolve("only [doc2] here", &citations);

        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].id, "2");
    }

    #[test]
    fn resolution_is_idempotent() {
        let resolver = CitationResolver::new();
        let citations = [citation("1"), citation("2")];
        let first = resolver.resolve("[doc1], [doc2] and [doc1]", &citations);
        let second = resolver.resolve(&first.text, &first.citations);

        assert_eq!(second.text, first.text);
        assert!(second.citations.is_empty());
    }

    #[test]
    fn empty_answer_yields_empty_result() {
        let resolver = CitationResolver::new();
        let result = resolver.resolve("", &[citation("1")]);
        assert_eq!(result.text, "");
        assert!(result.citations.is_empty());
    }

    #[test]
    fn adjacent_tokens_without_separator_both_resolve() {
        let resolver = CitationResolver::new();
        let citations = [citation("1"), citation("2")];
        let result = resolver.resolve("[doc1][doc2]", &citations);

        assert_eq!(result.text, "^1^^2^");
        assert_eq!(result.citations.len(), 2);
    }

    #[test]
    fn surrounding_whitespace_is_preserved() {
        let resolver = CitationResolver::new();
        let result = resolver.resolve("before [doc1] after", &[citation("1")]);
        assert_eq!(result.text, "before ^1^ after");
    }

    #[test]
    fn non_citation_brackets_are_untouched() {
        let resolver = CitationResolver::new();
        let result = resolver.resolve("a [link](url) and [note]", &[citation("1")]);
        assert_eq!(result.text, "a [link](url) and [note]");
        assert!(result.citations.is_empty());
    }

    #[test]
    fn custom_pattern_restricts_id_grammar() {
        let resolver = CitationResolver::with_pattern(r"\[doc(\d+)\]").unwrap();
        let result = resolver.resolve("[doc1] [docX]", &[citation("1"), citation("X")]);

        assert_eq!(result.text, "^1^ [docX]");
        assert_eq!(result.citations.len(), 1);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(CitationResolver::with_pattern(r"\[doc(").is_err());
    }

    #[test]
    fn pattern_without_id_group_is_rejected() {
        // Valid regex, but no way to extract the id: must fail at
        // construction, not panic during resolve.
        assert!(CitationResolver::with_pattern(r"\[doc[^\]]+\]").is_err());
        assert!(CitationResolver::with_pattern(r"\[doc(\w+)-(\d+)\]").is_err());
    }
}
