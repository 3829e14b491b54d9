//! Viewer state machine.
//!
//! The viewer starts `Idle` and moves to `Displaying` on the first successful
//! conversion. Every later conversion replaces the document wholesale. Failed
//! deliveries surface as an error message while the last document stays.

use crate::html::Document;
use crate::search::{Direction, Search, SearchHit, SearchOptions};
use crate::stats::DocumentStats;
use crate::toc::{toc_of, TocEntry};
use crate::watcher::Delivery;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Scroll position and content height reported by the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_y: i64,
    pub content_height: i64,
}

/// Computes the scroll offset after the content height changed.
///
/// The distance to the bottom of the document is kept, which keeps the view
/// steady while text is appended above or below. A view at the top stays at
/// the top.
///
/// # Example
///
/// ```
/// use markview_core::{preserve_scroll, Viewport};
///
/// let prev = Viewport { scroll_y: 300, content_height: 2000 };
/// assert_eq!(preserve_scroll(prev, 2100), 400);
/// ```
pub fn preserve_scroll(prev: Viewport, new_height: i64) -> i64 {
    if prev.scroll_y > 0 {
        prev.scroll_y - (prev.content_height - new_height)
    } else {
        0
    }
}

/// A converted document together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Increases by one with every conversion.
    pub revision: u64,
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub stats: DocumentStats,
    pub plain_text: String,
    /// Visible text nodes, the unit search occurrences are counted in.
    pub text_nodes: Vec<String>,
}

impl RenderedDocument {
    pub fn new(revision: u64, html: String) -> Self {
        let document = Document::parse(&html);
        let plain_text = document.plain_text();
        let text_nodes = document
            .text_nodes()
            .into_iter()
            .map(ToOwned::to_owned)
            .collect();

        Self {
            revision,
            toc: toc_of(&document),
            stats: DocumentStats::from_text(&plain_text),
            plain_text,
            text_nodes,
            html,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum ViewerState {
    #[default]
    Idle,
    Displaying(Arc<RenderedDocument>),
}

/// What the page has to show after a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    Document(Arc<RenderedDocument>),
    Error { message: String },
}

#[derive(Debug)]
pub struct Viewer {
    source: PathBuf,
    state: ViewerState,
    revision: u64,
    error: Option<String>,
    viewport: Option<Viewport>,
    search: Search,
}

impl Viewer {
    pub fn new(source: PathBuf) -> Self {
        Self {
            source,
            state: ViewerState::Idle,
            revision: 0,
            error: None,
            viewport: None,
            search: Search::new(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory relative links of the document resolve against.
    pub fn base_dir(&self) -> &Path {
        match self.source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Window title, the file name of the source.
    pub fn title(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn document(&self) -> Option<&Arc<RenderedDocument>> {
        match &self.state {
            ViewerState::Idle => None,
            ViewerState::Displaying(document) => Some(document),
        }
    }

    /// The message of the last failed delivery, cleared by the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn apply(&mut self, delivery: Delivery) -> ViewUpdate {
        let message = match delivery {
            Delivery::Rendered { html } => {
                self.revision += 1;
                let document = Arc::new(RenderedDocument::new(self.revision, html));
                self.state = ViewerState::Displaying(document.clone());
                self.error = None;
                return ViewUpdate::Document(document);
            }
            Delivery::Failed { message } => format!("Conversion failed: {message}"),
            Delivery::Missing { message } => {
                format!("{} is not readable: {message}", self.source.display())
            }
            Delivery::Unavailable { format } => {
                format!("No converter available for {format} files")
            }
        };

        self.error = Some(message.clone());
        ViewUpdate::Error { message }
    }

    /// Remembers the viewport right before a new document is applied.
    pub fn report_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    /// Returns the scroll offset for the freshly applied document.
    pub fn rendered(&mut self, content_height: i64) -> Option<i64> {
        self.viewport
            .take()
            .map(|prev| preserve_scroll(prev, content_height))
    }

    /// Steps the search over the displayed document.
    pub fn find(
        &mut self,
        query: &str,
        options: SearchOptions,
        direction: Direction,
    ) -> Option<SearchHit> {
        let ViewerState::Displaying(document) = &self.state else {
            return None;
        };
        self.search
            .step(&document.text_nodes, query, options, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Format;

    #[test]
    fn test_preserve_scroll() {
        let prev = Viewport {
            scroll_y: 500,
            content_height: 3000,
        };
        assert_eq!(preserve_scroll(prev, 2800), 300);
        assert_eq!(preserve_scroll(prev, 3000), 500);

        let top = Viewport {
            scroll_y: 0,
            content_height: 3000,
        };
        assert_eq!(preserve_scroll(top, 5000), 0);
    }

    #[test]
    fn test_state_transitions() {
        let mut viewer = Viewer::new(PathBuf::from("/tmp/notes/README.md"));
        assert!(matches!(viewer.state(), ViewerState::Idle));
        assert_eq!(viewer.title(), "README.md");
        assert_eq!(viewer.base_dir(), Path::new("/tmp/notes"));

        let update = viewer.apply(Delivery::Failed {
            message: "boom".into(),
        });
        assert!(matches!(update, ViewUpdate::Error { .. }));
        assert!(matches!(viewer.state(), ViewerState::Idle));

        let update = viewer.apply(Delivery::Rendered {
            html: "<h1>A</h1><p>one two</p>".into(),
        });
        let ViewUpdate::Document(first) = update else {
            panic!("Expected a document");
        };
        assert_eq!(first.revision, 1);
        assert_eq!(first.stats.words, 3);
        assert_eq!(first.toc.len(), 1);
        assert!(viewer.error().is_none());

        viewer.apply(Delivery::Missing {
            message: "gone".into(),
        });
        assert!(viewer.error().is_some_and(|e| e.contains("gone")));
        // The last document stays on display.
        assert_eq!(viewer.document().map(|d| d.revision), Some(1));

        viewer.apply(Delivery::Rendered {
            html: "<p>replaced</p>".into(),
        });
        let document = viewer.document().unwrap();
        assert_eq!(document.revision, 2);
        assert_eq!(document.plain_text, "replaced");
        assert!(viewer.error().is_none());
    }

    #[test]
    fn test_unavailable_message() {
        let mut viewer = Viewer::new(PathBuf::from("index.rst"));
        assert_eq!(viewer.base_dir(), Path::new("."));
        let update = viewer.apply(Delivery::Unavailable {
            format: Format::Rst,
        });
        assert_eq!(
            update,
            ViewUpdate::Error {
                message: "No converter available for rst files".into()
            }
        );
    }

    #[test]
    fn test_scroll_round_trip() {
        let mut viewer = Viewer::new(PathBuf::from("a.md"));
        assert_eq!(viewer.rendered(100), None);

        viewer.report_viewport(Viewport {
            scroll_y: 200,
            content_height: 1000,
        });
        assert_eq!(viewer.rendered(1200), Some(400));
        assert_eq!(viewer.rendered(1200), None);
    }

    #[test]
    fn test_find_requires_document() {
        let mut viewer = Viewer::new(PathBuf::from("a.md"));
        let options = SearchOptions::default();
        assert!(viewer.find("x", options, Direction::Forward).is_none());

        viewer.apply(Delivery::Rendered {
            html: "<p>x y x</p>".into(),
        });
        let hit = viewer.find("x", options, Direction::Forward).unwrap();
        assert_eq!((hit.ordinal, hit.total), (0, 2));
    }

    #[test]
    fn test_find_counts_within_text_nodes() {
        let mut viewer = Viewer::new(PathBuf::from("a.md"));
        viewer.apply(Delivery::Rendered {
            html: "<p><em>foo</em> bar</p><p>foo bar</p>".into(),
        });

        let options = SearchOptions::default();
        let hit = viewer.find("foo bar", options, Direction::Forward).unwrap();
        assert_eq!((hit.ordinal, hit.total), (0, 1));
        assert!(viewer.find("foo bar", options, Direction::Forward).is_none());
    }
}
