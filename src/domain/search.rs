// src/domain/search.rs
//! Web-search query syntax shared by every full-text search.
//!
//! Whitespace-separated words are AND-ed, `"quoted text"` is a phrase, a bare
//! `or` between words starts an alternative, and a leading `-` excludes a
//! word or phrase from every alternative.

/// Characters that would glue tokens together; replaced by spaces before tokenizing.
const TOKEN_BREAKERS: [char; 2] = ['/', '.'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    Word(String),
    Phrase(Vec<String>),
}

impl SearchTerm {
    fn from_tokens(mut tokens: Vec<String>) -> Option<Self> {
        match tokens.len() {
            0 => None,
            1 => tokens.pop().map(SearchTerm::Word),
            _ => Some(SearchTerm::Phrase(tokens)),
        }
    }

    /// Whether this term occurs in an already tokenized document.
    pub fn matches(&self, document: &[String]) -> bool {
        match self {
            SearchTerm::Word(word) => document.iter().any(|t| t == word),
            SearchTerm::Phrase(words) => document
                .windows(words.len())
                .any(|window| window == words.as_slice()),
        }
    }

    /// Quoted FTS5 string for this term.
    pub fn to_fts5(&self) -> String {
        match self {
            SearchTerm::Word(word) => format!("\"{}\"", word.replace('"', "\"\"")),
            SearchTerm::Phrase(words) => format!("\"{}\"", words.join(" ").replace('"', "\"\"")),
        }
    }
}

/// Parsed web-search query: a disjunction of conjunctions, minus exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WebSearchQuery {
    pub alternatives: Vec<Vec<SearchTerm>>,
    pub excluded: Vec<SearchTerm>,
}

/// Replaces token-gluing characters with spaces.
pub fn full_text_normalize(text: &str) -> String {
    text.chars()
        .map(|c| if TOKEN_BREAKERS.contains(&c) { ' ' } else { c })
        .collect()
}

/// Lowercased alphanumeric runs, the same split the FTS5 `unicode61` tokenizer makes.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl WebSearchQuery {
    pub fn parse(input: &str) -> Self {
        let text = full_text_normalize(input);
        let chars: Vec<char> = text.chars().collect();

        let mut query = WebSearchQuery::default();
        let mut current: Vec<SearchTerm> = Vec::new();
        let mut negate = false;
        let mut pending_or = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                negate = false;
                i += 1;
                continue;
            }
            if c == '-' {
                negate = true;
                i += 1;
                continue;
            }

            let (raw, quoted) = if c == '"' {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != '"' {
                    end += 1;
                }
                i = end + 1;
                (chars[start..end.min(chars.len())].iter().collect::<String>(), true)
            } else {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '"' {
                    i += 1;
                }
                (chars[start..i].iter().collect::<String>(), false)
            };

            if !quoted && !negate && raw.eq_ignore_ascii_case("or") {
                pending_or = !current.is_empty();
                continue;
            }

            let Some(term) = SearchTerm::from_tokens(tokenize(&raw)) else {
                negate = false;
                continue;
            };

            if negate {
                query.excluded.push(term);
            } else {
                if pending_or {
                    query.alternatives.push(std::mem::take(&mut current));
                }
                current.push(term);
            }
            negate = false;
            pending_or = false;
        }

        if !current.is_empty() {
            query.alternatives.push(current);
        }
        query
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty() && self.excluded.is_empty()
    }

    /// Evaluates the query against a document's full-text string.
    pub fn matches(&self, document: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let tokens = tokenize(&full_text_normalize(document));
        let included = self.alternatives.is_empty()
            || self
                .alternatives
                .iter()
                .any(|group| group.iter().all(|term| term.matches(&tokens)));
        included && !self.excluded.iter().any(|term| term.matches(&tokens))
    }

    /// FTS5 expression selecting rows that satisfy any alternative.
    pub fn fts5_include(&self) -> Option<String> {
        if self.alternatives.is_empty() {
            return None;
        }
        let groups: Vec<String> = self
            .alternatives
            .iter()
            .map(|group| {
                let terms: Vec<String> = group.iter().map(SearchTerm::to_fts5).collect();
                format!("({})", terms.join(" AND "))
            })
            .collect();
        Some(groups.join(" OR "))
    }

    /// FTS5 expression selecting rows to exclude.
    pub fn fts5_exclude(&self) -> Option<String> {
        if self.excluded.is_empty() {
            return None;
        }
        let terms: Vec<String> = self.excluded.iter().map(SearchTerm::to_fts5).collect();
        Some(terms.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str) -> SearchTerm {
        SearchTerm::Word(w.to_string())
    }

    #[test]
    fn given_plain_words_when_parsed_then_single_conjunction() {
        let q = WebSearchQuery::parse("Rust  async");
        assert_eq!(q.alternatives, vec![vec![word("rust"), word("async")]]);
        assert!(q.excluded.is_empty());
    }

    #[test]
    fn given_quotes_or_and_negation_when_parsed_then_structured() {
        let q = WebSearchQuery::parse(r#""static site" generator or blog -wordpress"#);

        assert_eq!(
            q.alternatives,
            vec![
                vec![
                    SearchTerm::Phrase(vec!["static".into(), "site".into()]),
                    word("generator")
                ],
                vec![word("blog")],
            ]
        );
        assert_eq!(q.excluded, vec![word("wordpress")]);
    }

    #[test]
    fn given_slash_and_dot_when_parsed_then_split_into_words() {
        let q = WebSearchQuery::parse("feed/atom example.org");
        assert_eq!(
            q.alternatives,
            vec![vec![word("feed"), word("atom"), word("example"), word("org")]]
        );
    }

    #[test]
    fn given_documents_when_matched_then_and_phrase_not_semantics() {
        let q = WebSearchQuery::parse(r#"rust "error handling" -anyhow"#);

        assert!(q.matches("Rust: error handling with thiserror"));
        assert!(!q.matches("Rust: handling error cases"));
        assert!(!q.matches("Rust error handling with anyhow"));
        assert!(!q.matches("Go error handling"));
    }

    #[test]
    fn given_negation_only_when_matched_then_excludes() {
        let q = WebSearchQuery::parse("-draft");
        assert!(q.matches("final post"));
        assert!(!q.matches("draft post"));
    }

    #[test]
    fn given_empty_input_when_matched_then_nothing() {
        let q = WebSearchQuery::parse("   \"\"  - ");
        assert!(q.is_empty());
        assert!(!q.matches("anything"));
    }

    #[test]
    fn given_query_when_rendered_for_fts5_then_quoted_terms() {
        let q = WebSearchQuery::parse(r#"a "b c" or d -e -"f g""#);

        assert_eq!(
            q.fts5_include().unwrap(),
            r#"("a" AND "b c") OR ("d")"#
        );
        assert_eq!(q.fts5_exclude().unwrap(), r#""e" OR "f g""#);
    }
}
