//! Format detection.
//!
//! This module provides the [`Format`] enum naming a markup dialect and the
//! [`FormatMapping`] that decides which format applies to a file, built by
//! inverting the `[formats]` table of the settings.

use markview_config::{FormatTable, Settings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A named markup dialect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Format {
    Markdown,
    /// reStructuredText.
    Rst,
    Textile,
    Creole,
    /// Any other format name registered in the settings, only pandoc may
    /// be able to read it.
    Other(String),
}

impl Format {
    /// All formats with a dedicated variant.
    pub const KNOWN: &'static [Format] = &[Self::Markdown, Self::Rst, Self::Textile, Self::Creole];

    /// Parses a format name as written in the settings (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use markview_core::Format;
    ///
    /// assert_eq!(Format::from_name("markdown"), Format::Markdown);
    /// assert_eq!(Format::from_name("RST"), Format::Rst);
    /// assert_eq!(Format::from_name("org"), Format::Other("org".into()));
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "markdown" => Self::Markdown,
            "rst" => Self::Rst,
            "textile" => Self::Textile,
            "creole" => Self::Creole,
            other => Self::Other(other.to_string()),
        }
    }

    /// Get the name of this format as used in the settings.
    pub fn name(&self) -> &str {
        match self {
            Self::Markdown => "markdown",
            Self::Rst => "rst",
            Self::Textile => "textile",
            Self::Creole => "creole",
            Self::Other(name) => name,
        }
    }

    /// Formats which are never handed to pandoc.
    pub fn is_in_process_only(&self) -> bool {
        matches!(self, Self::Creole)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for Format {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.name().to_string()
    }
}

/// Extension to format lookup.
#[derive(Debug, Clone)]
pub struct FormatMapping {
    by_extension: HashMap<String, Format>,
    default_format: Format,
}

impl FormatMapping {
    /// Inverts a `format -> "ext1 ext2"` table.
    ///
    /// Extensions are matched case-insensitively. When several formats list
    /// the same extension, the one registered last wins.
    pub fn new(formats: &FormatTable, default_format: Format) -> Self {
        let by_extension = formats
            .iter()
            .flat_map(|(format, extensions)| {
                let format = Format::from_name(format);
                extensions
                    .split_whitespace()
                    .map(move |ext| (ext.trim_start_matches('.').to_lowercase(), format.clone()))
            })
            .collect();

        Self {
            by_extension,
            default_format,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.formats,
            Format::from_name(&settings.no_extension),
        )
    }

    /// Returns the format registered for `ext`, if any.
    pub fn lookup(&self, ext: &str) -> Option<&Format> {
        self.by_extension.get(&ext.to_lowercase())
    }

    /// Detect the format of a file from its extension.
    ///
    /// The extension is whatever follows the last `.` of the file name, so the
    /// dotfile `.md` counts as markdown. Files with a missing or unregistered
    /// extension get the default format.
    pub fn format_for(&self, path: &Path) -> Format {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rsplit_once('.'))
            .and_then(|(_, ext)| self.lookup(ext))
            .cloned()
            .unwrap_or_else(|| self.default_format.clone())
    }

    pub fn default_format(&self) -> &Format {
        &self.default_format
    }

    /// Get all registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<_> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}
