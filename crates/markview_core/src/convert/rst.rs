//! reStructuredText to HTML conversion.

use super::{ConvertError, Converter};
use crate::document::Format;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Debug, Clone, Copy, Default)]
pub struct RstConverter;

impl Converter for RstConverter {
    fn format(&self) -> Format {
        Format::Rst
    }

    /// Renders the body only, without the surrounding `<html>` document.
    fn convert(&self, source: &str) -> Result<String, ConvertError> {
        let failed = |message: String| ConvertError::Markup {
            format: Format::Rst,
            message,
        };

        let document = rst_parser::parse(source).map_err(|err| failed(err.to_string()))?;

        let mut body = Vec::new();
        // The renderer panics on a few node kinds it does not support yet.
        catch_unwind(AssertUnwindSafe(|| {
            rst_renderer::render_html(&document, &mut body, false)
        }))
        .map_err(|_| failed("unsupported document structure".into()))?
        .map_err(|err| failed(err.to_string()))?;

        Ok(String::from_utf8(body)?)
    }
}
