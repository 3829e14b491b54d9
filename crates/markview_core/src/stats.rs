//! Document statistics over the rendered text.
//!
//! Counting is a heuristic: a fixed set of punctuation and quotation glyphs is
//! stripped before splitting on whitespace, which is good enough for a status
//! line but not a linguistically correct tokenizer.

use crate::html::Document;
use serde::{Deserialize, Serialize};

/// Apostrophes are removed so that `don't` counts as one word.
const REMOVED: &[char] = &['\'', '’'];

/// Glyphs acting as word separators.
const SEPARATORS: &[&str] = &[
    "\"", "…", "...", "!", "?", "¡", "¿", "/", "\\", "*", ",", "‘", "”", "“", "„", "«", "»", "—",
    "&", "\n",
];

/// Document statistics for display in the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub words: usize,
    /// Character count with newlines removed.
    pub characters: usize,
    pub lines: usize,
    /// Estimated reading time in minutes (based on 200 words per minute)
    pub reading_minutes: usize,
}

impl DocumentStats {
    /// Calculates the statistics of the plain text a reader sees.
    ///
    /// # Example
    ///
    /// ```
    /// use markview_core::DocumentStats;
    ///
    /// let stats = DocumentStats::from_text("He said, \"don't stop.\"");
    /// assert_eq!(stats.words, 4);
    /// assert_eq!(stats.lines, 1);
    /// ```
    pub fn from_text(text: &str) -> Self {
        let mut stripped: String = text.chars().filter(|c| !REMOVED.contains(c)).collect();
        for separator in SEPARATORS {
            stripped = stripped.replace(separator, " ");
        }
        let words = stripped.split_whitespace().count();

        let characters = text.chars().filter(|c| *c != '\n').count();
        let lines = text.split('\n').count();

        Self {
            words,
            characters,
            lines,
            reading_minutes: words.div_ceil(200),
        }
    }

    /// Calculates the statistics of rendered HTML.
    pub fn from_html(html: &str) -> Self {
        Self::from_text(&Document::parse(html).plain_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_heuristic() {
        let stats = DocumentStats::from_text(r#"He said, "don't stop.""#);
        assert_eq!(stats.words, 4);
    }

    #[test]
    fn test_separators_split_words() {
        let stats = DocumentStats::from_text("either/or «quoted»—dash and…more");
        // either, or, quoted, dash, and, more
        assert_eq!(stats.words, 6);

        let stats = DocumentStats::from_text("¡Hola! ¿Qué tal? *** , & ...");
        assert_eq!(stats.words, 3);
    }

    #[test]
    fn test_characters_and_lines() {
        let stats = DocumentStats::from_text("ab\ncd\n");
        assert_eq!(stats.characters, 4);
        assert_eq!(stats.lines, 3);
    }

    #[test]
    fn test_empty_text() {
        let stats = DocumentStats::from_text("");
        assert_eq!(stats.words, 0);
        assert_eq!(stats.characters, 0);
        assert_eq!(stats.lines, 1);
        assert_eq!(stats.reading_minutes, 0);
    }

    #[test]
    fn test_reading_time() {
        // 450 words should be ~3 minutes (450/200 = 2.25, rounded up)
        let content = vec!["word"; 450].join(" ");
        assert_eq!(DocumentStats::from_text(&content).reading_minutes, 3);
    }

    #[test]
    fn test_from_html() {
        let stats = DocumentStats::from_html("<h1>Title</h1>\n<p>Hello <em>big</em> world.</p>\n");
        assert_eq!(stats.words, 4);
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.characters, "TitleHello big world.".chars().count());
    }

    #[test]
    fn test_from_html_decodes_references() {
        let stats = DocumentStats::from_html("<p>caf&eacute; costs &euro;5</p>");
        assert_eq!(stats.characters, "café costs €5".chars().count());
        assert_eq!(stats.words, 3);
    }
}
