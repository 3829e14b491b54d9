//! Conversion of markup text into HTML.
//!
//! Every in-process capability implements [`Converter`] and is registered in a
//! [`ConverterRegistry`]. The registry is assembled at startup, a format without
//! an entry simply has no in-process converter in this build.
//!
//! The pandoc command line converter lives in [`pandoc`] and works on files
//! rather than text.

mod creole;
mod markdown;
pub mod pandoc;
mod rst;
mod textile;

pub use creole::CreoleConverter;
pub use markdown::{slugify, MarkdownConverter};
pub use pandoc::PandocConverter;
pub use rst::RstConverter;
pub use textile::TextileConverter;

use crate::document::Format;
use std::collections::HashMap;
use std::process::ExitStatus;
use std::sync::Arc;

/// Error type for conversion operations.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// I/O error while reading the source or running a process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source file or process output is not valid UTF-8.
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The markup could not be converted.
    #[error("failed to convert {format}: {message}")]
    Markup { format: Format, message: String },

    /// External converter exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Process {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// An in-process conversion capability.
pub trait Converter: Send + Sync {
    /// The format this converter reads.
    fn format(&self) -> Format;

    /// Convert markup text into an HTML fragment.
    ///
    /// Must be deterministic: the same input always yields the same output.
    fn convert(&self, source: &str) -> Result<String, ConvertError>;
}

/// The set of in-process converters available in this build.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<Format, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// Registry with every converter bundled in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(MarkdownConverter::default());
        registry.register(RstConverter);
        registry.register(TextileConverter);
        registry.register(CreoleConverter);
        registry
    }

    /// Registers `converter` for its format, replacing any previous entry.
    pub fn register(&mut self, converter: impl Converter + 'static) {
        self.converters.insert(converter.format(), Arc::new(converter));
    }

    pub fn get(&self, format: &Format) -> Option<Arc<dyn Converter>> {
        self.converters.get(format).cloned()
    }

    pub fn formats(&self) -> impl Iterator<Item = &Format> {
        self.converters.keys()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.converters.keys()).finish()
    }
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
