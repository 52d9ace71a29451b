//! In-page text search.
//!
//! Case-insensitive substring matching over rendered lines, with a cursor
//! that cycles through the matches.

use crate::document::Document;

/// Queries shorter than this only run when submitted explicitly.
pub const MIN_INCREMENTAL_QUERY: usize = 2;

/// Rendered line indices containing `query`, ignoring case.
pub fn find_matches(document: &Document, query: &str) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    document
        .lines()
        .iter()
        .enumerate()
        .filter(|(_, line)| line.content().to_lowercase().contains(&needle))
        .map(|(idx, _)| idx)
        .collect()
}

/// An active search: the query being typed and where its matches are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    query: String,
    matches: Vec<usize>,
    current: Option<usize>,
    /// The prompt is open and receiving keystrokes
    editing: bool,
}

impl SearchState {
    /// Open the prompt with an empty query.
    pub fn start() -> Self {
        Self {
            editing: true,
            ..Self::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub const fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    /// One-based position of the current match and the match count.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current.map(|idx| (idx + 1, self.matches.len()))
    }

    /// Line of the current match.
    pub fn current_line(&self) -> Option<usize> {
        self.current.and_then(|idx| self.matches.get(idx).copied())
    }

    /// Replace the query and recompute matches.
    ///
    /// Short queries clear the matches until `submit` forces them. Returns
    /// the line of the first match when there is one.
    pub fn set_query(&mut self, document: &Document, query: String, submit: bool) -> Option<usize> {
        self.query = query;
        if !submit && self.query.trim().chars().count() < MIN_INCREMENTAL_QUERY {
            self.matches.clear();
            self.current = None;
            return None;
        }
        self.refresh(document)
    }

    /// Recompute matches against a re-rendered document, keeping the cursor
    /// in range.
    pub fn refresh(&mut self, document: &Document) -> Option<usize> {
        self.matches = find_matches(document, &self.query);
        self.current = if self.matches.is_empty() {
            None
        } else {
            Some(self.current.unwrap_or(0).min(self.matches.len() - 1))
        };
        self.current_line()
    }

    /// Close the prompt, keeping the matches for navigation.
    pub fn finish_editing(&mut self) {
        self.editing = false;
    }

    /// Advance to the next match, wrapping around.
    pub fn next_match(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = Some(self.current.map_or(0, |idx| (idx + 1) % self.matches.len()));
        self.current_line()
    }

    /// Step back to the previous match, wrapping around.
    pub fn prev_match(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = Some(match self.current {
            Some(0) | None => self.matches.len() - 1,
            Some(idx) => idx - 1,
        });
        self.current_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse("# Alpha\n\nbeta GAMMA\n\nGamma ray\n\ndelta\n")
    }

    #[test]
    fn test_find_matches_ignores_case() {
        let doc = doc();
        let matches = find_matches(&doc, "gamma");
        assert_eq!(matches.len(), 2);
        assert!(find_matches(&doc, "   ").is_empty());
    }

    #[test]
    fn test_short_query_waits_for_submit() {
        let doc = doc();
        let mut search = SearchState::start();
        assert_eq!(search.set_query(&doc, "a".to_string(), false), None);
        assert!(search.matches().is_empty());
        assert!(search.set_query(&doc, "a".to_string(), true).is_some());
        assert!(!search.matches().is_empty());
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let doc = doc();
        let mut search = SearchState::start();
        let first = search.set_query(&doc, "gamma".to_string(), false).unwrap();
        assert_eq!(search.position(), Some((1, 2)));
        let second = search.next_match().unwrap();
        assert!(second > first);
        assert_eq!(search.next_match(), Some(first));
        assert_eq!(search.prev_match(), Some(second));
        assert_eq!(search.position(), Some((2, 2)));
    }

    #[test]
    fn test_no_matches_has_no_position() {
        let doc = doc();
        let mut search = SearchState::start();
        search.set_query(&doc, "zeta".to_string(), true);
        assert_eq!(search.position(), None);
        assert_eq!(search.next_match(), None);
        assert_eq!(search.prev_match(), None);
    }
}
