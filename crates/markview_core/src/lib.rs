//! Core library of markview.
//!
//! This crate turns a markup file into HTML and keeps doing so while the file
//! changes, then derives what the viewer shows next to the document.
//!
//! # Modules
//!
//! - [`document`] - Format names and the extension to format mapping
//! - [`convert`] - Conversion capabilities (markdown, rst, textile, creole, pandoc)
//! - [`resolver`] - Picks a usable converter for a file
//! - [`watcher`] - Background file watching and delivery of rendered HTML
//! - [`html`] - HTML5 element tree and plain-text projection of rendered HTML
//! - [`toc`] - Table of contents extraction from rendered HTML
//! - [`stats`] - Word, character and line statistics
//! - [`search`] - In-document search stepping
//! - [`viewer`] - Viewer state machine and scroll preservation

pub mod convert;
pub mod document;
pub mod html;
pub mod resolver;
pub mod search;
pub mod stats;
pub mod toc;
pub mod viewer;
pub mod watcher;

// Re-export commonly used types at crate root
pub use convert::{ConvertError, Converter, ConverterRegistry};
pub use document::{Format, FormatMapping};
pub use resolver::{Resolution, ResolvedConverter, Resolver};
pub use search::{Direction, Search, SearchHit, SearchOptions};
pub use stats::DocumentStats;
pub use toc::{extract_toc, TocEntry};
pub use viewer::{preserve_scroll, RenderedDocument, ViewUpdate, Viewer, ViewerState, Viewport};
pub use watcher::{Delivery, FileWatcher, WatchError, WatchHandle, WatcherConfig};
