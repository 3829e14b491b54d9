//! Messages exchanged with the page over the WebSocket.

use markview_core::{DocumentStats, RenderedDocument, SearchHit, TocEntry};
use serde::{Deserialize, Serialize};

/// Server to page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Replace the displayed document.
    Update {
        revision: u64,
        html: String,
        toc: Vec<TocEntry>,
        stats: DocumentStats,
        title: String,
        base: String,
    },
    /// Show or, with `None`, hide the error banner.
    Error { message: Option<String> },
    /// Scroll the document to the vertical offset `y`.
    Scroll { y: i64 },
    /// Switch the document stylesheet.
    Style { name: String, href: String },
    /// Highlight a search result, `None` clears the highlight.
    Search {
        query: String,
        hit: Option<SearchHit>,
    },
    /// The stylesheets available for selection.
    Themes { themes: Vec<ThemeInfo>, active: String },
}

impl ServerMessage {
    pub fn update(document: &RenderedDocument, title: &str, base: &str) -> Self {
        Self::Update {
            revision: document.revision,
            html: document.html.clone(),
            toc: document.toc.clone(),
            stats: document.stats.clone(),
            title: title.to_string(),
            base: base.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeInfo {
    pub name: String,
    pub href: String,
    /// Digit of the `Ctrl+<digit>` shortcut.
    pub shortcut: Option<u8>,
}

/// Page to server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The viewport right before an update is applied.
    Viewport { scroll_y: i64, content_height: i64 },
    /// The content height after an update was applied.
    Rendered { content_height: i64 },
    Find {
        query: String,
        #[serde(default)]
        case_sensitive: bool,
        #[serde(default)]
        wrap: bool,
        #[serde(default)]
        highlight_all: bool,
        #[serde(default)]
        backwards: bool,
    },
    SelectStyle { name: String },
}
