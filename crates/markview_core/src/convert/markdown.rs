//! Markdown to HTML conversion.
//!
//! GitHub Flavored Markdown extensions (tables, strikethrough, task lists,
//! footnotes) are enabled and every heading gets an `id` so that `#anchor`
//! links inside the document work.

use super::{ConvertError, Converter};
use crate::document::Format;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;

/// Converts heading text to a URL-safe slug following GitHub's convention.
///
/// # Example
///
/// ```
/// use markview_core::convert::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("API Reference (v2)"), "api-reference-v2");
/// ```
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '_' {
                Some(c)
            } else if c == ' ' || c == '-' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        // Collapse multiple hyphens into one
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Markdown converter backed by pulldown-cmark.
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    options: Options,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { options }
    }
}

impl MarkdownConverter {
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }

    /// Render markdown content to HTML.
    pub fn to_html(&self, markdown_content: &str) -> String {
        let events: Vec<Event> = Parser::new_ext(markdown_content, self.options).collect();

        let mut processed_events = Vec::with_capacity(events.len());
        // Slugs seen so far, duplicates get a numeric suffix like on GitHub.
        let mut seen_slugs: HashMap<String, usize> = HashMap::new();

        for (i, event) in events.iter().enumerate() {
            match event {
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) => {
                    let id = match id {
                        Some(id) => id.clone(),
                        None => {
                            let heading_text = collect_heading_text(&events[i + 1..]);
                            let slug = slugify(&heading_text);
                            let count = seen_slugs.entry(slug.clone()).or_insert(0);
                            let unique = if *count == 0 {
                                slug
                            } else {
                                format!("{slug}-{count}")
                            };
                            *count += 1;
                            CowStr::from(unique)
                        }
                    };

                    processed_events.push(Event::Start(Tag::Heading {
                        level: *level,
                        id: Some(id),
                        classes: classes.clone(),
                        attrs: attrs.clone(),
                    }));
                }
                _ => processed_events.push(event.clone()),
            }
        }

        let mut html_output = String::with_capacity(markdown_content.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html_output, processed_events.into_iter());
        html_output
    }
}

/// Collect the text of a heading, `events` starts right after its start tag.
fn collect_heading_text(events: &[Event]) -> String {
    let mut heading_text = String::new();
    for event in events {
        match event {
            Event::Text(text) | Event::Code(text) => heading_text.push_str(text),
            Event::End(TagEnd::Heading(_)) => break,
            _ => {}
        }
    }
    heading_text
}

impl Converter for MarkdownConverter {
    fn format(&self) -> Format {
        Format::Markdown
    }

    fn convert(&self, source: &str) -> Result<String, ConvertError> {
        Ok(self.to_html(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_rendering() {
        let html = MarkdownConverter::default().to_html("# Hello\n\nWorld");
        assert!(html.contains("<h1"));
        assert!(html.contains("Hello"));
        assert!(html.contains("<p>World</p>"));
    }

    #[test]
    fn test_heading_ids() {
        let html = MarkdownConverter::default().to_html("# Test `Heading`");
        assert!(html.contains(r#"id="test-heading""#));
    }

    #[test]
    fn test_duplicate_heading_ids() {
        let html = MarkdownConverter::default().to_html("# Intro\n\n## Intro\n\n### Intro");
        assert!(html.contains(r#"id="intro""#));
        assert!(html.contains(r#"id="intro-1""#));
        assert!(html.contains(r#"id="intro-2""#));
    }

    #[test]
    fn test_explicit_heading_id_is_kept() {
        let html = MarkdownConverter::default().to_html("# Custom {#my-id}");
        assert!(html.contains(r#"id="my-id""#));
    }

    #[test]
    fn test_gfm_extensions() {
        let html = MarkdownConverter::default().to_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Test-123"), "test-123");
        assert_eq!(slugify("foo_bar"), "foo_bar");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
    }
}
