//! Converter resolution.
//!
//! [`Resolver::resolve`] decides which format applies to a file and whether a
//! converter for it is usable right now. Pandoc is preferred when enabled and
//! can be started, otherwise the in-process registry is consulted. Nothing is
//! cached, every call probes again.

use crate::convert::{ConvertError, Converter, ConverterRegistry, PandocConverter};
use crate::document::{Format, FormatMapping};
use markview_config::Settings;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// How a file of some format gets converted.
#[derive(Clone)]
pub enum Resolution {
    /// Through the pandoc command line.
    External(PandocConverter),
    /// Through an in-process converter.
    InProcess(Arc<dyn Converter>),
    /// No converter is usable for the format.
    Unavailable,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External(pandoc) => f.debug_tuple("External").field(pandoc).finish(),
            Self::InProcess(converter) => f
                .debug_tuple("InProcess")
                .field(&converter.format())
                .finish(),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// A format paired with the way to convert it.
#[derive(Debug, Clone)]
pub struct ResolvedConverter {
    pub format: Format,
    pub resolution: Resolution,
}

impl ResolvedConverter {
    pub fn is_available(&self) -> bool {
        !matches!(self.resolution, Resolution::Unavailable)
    }

    /// Converts the file at `path` into HTML.
    ///
    /// In-process converters read the file as UTF-8 text, pandoc reads the
    /// file itself.
    pub fn convert_file(&self, path: &Path) -> Result<String, ConvertError> {
        match &self.resolution {
            Resolution::External(pandoc) => pandoc.convert_file(path),
            Resolution::InProcess(converter) => {
                let bytes = std::fs::read(path)?;
                let text = String::from_utf8(bytes)?;
                converter.convert(&text)
            }
            Resolution::Unavailable => Err(ConvertError::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("no converter available for {}", self.format),
            ))),
        }
    }
}

/// Maps files to usable converters.
#[derive(Debug, Clone)]
pub struct Resolver {
    mapping: FormatMapping,
    registry: ConverterRegistry,
    /// Present when pandoc is preferred.
    pandoc: Option<Arc<Settings>>,
}

impl Resolver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            mapping: FormatMapping::from_settings(settings),
            registry: ConverterRegistry::builtin(),
            pandoc: settings.via_pandoc.then(|| Arc::new(settings.clone())),
        }
    }

    /// Replaces the in-process converters.
    pub fn with_registry(mut self, registry: ConverterRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn mapping(&self) -> &FormatMapping {
        &self.mapping
    }

    pub fn format_for(&self, path: &Path) -> Format {
        self.mapping.format_for(path)
    }

    /// Resolves the converter for `path`.
    pub fn resolve(&self, path: &Path) -> ResolvedConverter {
        let format = self.format_for(path);

        if let Some(settings) = self.pandoc.as_ref().filter(|_| !format.is_in_process_only()) {
            let program = settings.pandoc_path.as_str();

            match PandocConverter::probe(program) {
                Ok(()) => {
                    tracing::debug!(%format, program, "Resolved converter via pandoc");
                    return ResolvedConverter {
                        resolution: Resolution::External(PandocConverter::from_settings(
                            settings, &format,
                        )),
                        format,
                    };
                }
                Err(err) => {
                    tracing::debug!(
                        ?err,
                        program,
                        "pandoc can not be invoked, falling back to in-process conversion"
                    );
                }
            }
        }

        let resolution = match self.registry.get(&format) {
            Some(converter) => Resolution::InProcess(converter),
            None => {
                tracing::warn!(%format, path = %path.display(), "No converter available");
                Resolution::Unavailable
            }
        };

        ResolvedConverter { format, resolution }
    }
}
