//! In-document search.
//!
//! Occurrences are counted within single text nodes of the rendered document,
//! the same way the page marks them. A query spanning an element boundary is
//! not found.

use serde::{Deserialize, Serialize};

/// Independent toggles of the search bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    /// Continue at the other end once the last occurrence was passed.
    pub wrap: bool,
    /// Mark every occurrence, not only the active one.
    pub highlight_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

/// The active occurrence of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Index of the active occurrence, starting at 0.
    pub ordinal: usize,
    pub total: usize,
    pub highlight_all: bool,
}

/// Byte offsets of the non-overlapping occurrences of `query` in `text`.
pub fn occurrences(text: &str, query: &str, case_sensitive: bool) -> Vec<usize> {
    if query.is_empty() {
        return Vec::new();
    }
    if case_sensitive {
        text.match_indices(query).map(|(i, _)| i).collect()
    } else {
        text.to_lowercase()
            .match_indices(&query.to_lowercase())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Number of occurrences of `query` over all `segments`.
pub fn count_occurrences<S: AsRef<str>>(segments: &[S], query: &str, case_sensitive: bool) -> usize {
    segments
        .iter()
        .map(|segment| occurrences(segment.as_ref(), query, case_sensitive).len())
        .sum()
}

/// Search state kept between steps.
#[derive(Debug, Clone, Default)]
pub struct Search {
    query: String,
    case_sensitive: bool,
    current: Option<usize>,
}

impl Search {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Forgets the active occurrence.
    pub fn clear(&mut self) {
        self.query.clear();
        self.current = None;
    }

    /// Moves to the next or previous occurrence of `query` in `segments`.
    ///
    /// A different query or case sensitivity starts over from the respective
    /// end. Without wrapping, stepping past the last occurrence yields `None`
    /// and keeps the active occurrence where it was.
    pub fn step<S: AsRef<str>>(
        &mut self,
        segments: &[S],
        query: &str,
        options: SearchOptions,
        direction: Direction,
    ) -> Option<SearchHit> {
        if query.is_empty() {
            self.clear();
            return None;
        }

        if self.query != query || self.case_sensitive != options.case_sensitive {
            self.query = query.to_string();
            self.case_sensitive = options.case_sensitive;
            self.current = None;
        }

        let total = count_occurrences(segments, query, options.case_sensitive);
        if total == 0 {
            self.current = None;
            return None;
        }

        // The document may have shrunk since the last step.
        let current = self.current.filter(|&i| i < total);

        let next = match (direction, current) {
            (Direction::Forward, None) => 0,
            (Direction::Forward, Some(i)) if i + 1 < total => i + 1,
            (Direction::Forward, Some(_)) if options.wrap => 0,
            (Direction::Backward, None) => total - 1,
            (Direction::Backward, Some(i)) if i > 0 => i - 1,
            (Direction::Backward, Some(_)) if options.wrap => total - 1,
            _ => return None,
        };

        self.current = Some(next);

        Some(SearchHit {
            ordinal: next,
            total,
            highlight_all: options.highlight_all,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &[&str] = &["Alpha beta alpha gamma ALPHA"];

    fn ordinal(hit: Option<SearchHit>) -> Option<usize> {
        hit.map(|hit| hit.ordinal)
    }

    #[test]
    fn test_occurrences() {
        assert_eq!(occurrences(TEXT[0], "alpha", true), vec![11]);
        assert_eq!(occurrences(TEXT[0], "alpha", false).len(), 3);
        assert!(occurrences(TEXT[0], "", false).is_empty());
        assert_eq!(occurrences("aaaa", "aa", true).len(), 2);
    }

    #[test]
    fn test_occurrences_stay_within_segments() {
        // `<p><em>foo</em> bar</p><p>foo bar</p>`
        let segments = ["foo", " bar", "foo bar"];
        assert_eq!(count_occurrences(&segments, "foo bar", false), 1);
        assert_eq!(count_occurrences(&segments, "foo", false), 2);

        let mut search = Search::new();
        let hit = search
            .step(&segments, "foo bar", SearchOptions::default(), Direction::Forward)
            .unwrap();
        assert_eq!(hit.ordinal, 0);
        assert_eq!(hit.total, 1);
    }

    #[test]
    fn test_step_without_wrap() {
        let mut search = Search::new();
        let options = SearchOptions::default();

        let hit = search.step(TEXT, "alpha", options, Direction::Forward).unwrap();
        assert_eq!(hit.ordinal, 0);
        assert_eq!(hit.total, 3);

        assert_eq!(ordinal(search.step(TEXT, "alpha", options, Direction::Forward)), Some(1));
        assert_eq!(ordinal(search.step(TEXT, "alpha", options, Direction::Forward)), Some(2));
        assert_eq!(search.step(TEXT, "alpha", options, Direction::Forward), None);

        // Still on the last occurrence.
        assert_eq!(ordinal(search.step(TEXT, "alpha", options, Direction::Backward)), Some(1));
    }

    #[test]
    fn test_step_with_wrap() {
        let mut search = Search::new();
        let options = SearchOptions {
            wrap: true,
            ..Default::default()
        };

        assert_eq!(ordinal(search.step(TEXT, "alpha", options, Direction::Backward)), Some(2));
        assert_eq!(ordinal(search.step(TEXT, "alpha", options, Direction::Forward)), Some(0));
        assert_eq!(ordinal(search.step(TEXT, "alpha", options, Direction::Backward)), Some(2));
    }

    #[test]
    fn test_new_query_restarts() {
        let mut search = Search::new();
        let options = SearchOptions::default();

        search.step(TEXT, "alpha", options, Direction::Forward);
        search.step(TEXT, "alpha", options, Direction::Forward);
        assert_eq!(ordinal(search.step(TEXT, "a", options, Direction::Forward)), Some(0));

        let case_sensitive = SearchOptions {
            case_sensitive: true,
            ..options
        };
        let hit = search.step(TEXT, "a", case_sensitive, Direction::Forward).unwrap();
        assert_eq!(hit.ordinal, 0);
        assert_eq!(hit.total, count_occurrences(TEXT, "a", true));
    }

    #[test]
    fn test_no_match_and_empty_query() {
        let mut search = Search::new();
        let options = SearchOptions {
            highlight_all: true,
            ..Default::default()
        };

        assert_eq!(search.step(TEXT, "delta", options, Direction::Forward), None);

        let hit = search.step(TEXT, "beta", options, Direction::Forward).unwrap();
        assert!(hit.highlight_all);

        assert_eq!(search.step(TEXT, "", options, Direction::Forward), None);
        assert_eq!(search.query(), "");
    }
}
