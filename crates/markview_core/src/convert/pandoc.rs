//! The pandoc command line converter.

use super::ConvertError;
use crate::document::Format;
use markview_config::Settings;
use std::path::Path;
use std::process::{Command, Stdio};

/// Invocation of pandoc for one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PandocConverter {
    program: String,
    from: String,
    args: Vec<String>,
}

impl PandocConverter {
    pub fn new(program: impl Into<String>, from: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            from: from.into(),
            args,
        }
    }

    /// Builds the converter for `format` from the pandoc settings.
    ///
    /// Markdown is read with the `pandoc_markdown` token, other formats with
    /// their own name.
    pub fn from_settings(settings: &Settings, format: &Format) -> Self {
        let from = match format {
            Format::Markdown => settings.pandoc_markdown.clone(),
            other => other.name().to_string(),
        };
        Self::new(settings.pandoc_path.clone(), from, settings.pandoc_args())
    }

    /// Checks that the pandoc executable can be invoked at all.
    ///
    /// Only a failure to start the process counts, the exit status of
    /// `pandoc -v` is irrelevant.
    pub fn probe(program: &str) -> std::io::Result<()> {
        Command::new(program)
            .arg("-v")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The input format token passed via `--from`.
    pub fn from_format(&self) -> &str {
        &self.from
    }

    /// `<program> --from=<format> <args...> <file>`
    pub fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("--from={}", self.from))
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Converts the file at `path`, blocking until pandoc exits.
    pub fn convert_file(&self, path: &Path) -> Result<String, ConvertError> {
        let output = self.command(path).output()?;

        if !output.status.success() {
            return Err(ConvertError::Process {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_uses_markdown_token() {
        let settings = Settings {
            pandoc_path: "/opt/pandoc".into(),
            pandoc_markdown: "gfm".into(),
            pandoc_args: "--to=html5 --mathjax".into(),
            ..Default::default()
        };

        let markdown = PandocConverter::from_settings(&settings, &Format::Markdown);
        assert_eq!(markdown.program(), "/opt/pandoc");
        assert_eq!(markdown.from_format(), "gfm");

        let rst = PandocConverter::from_settings(&settings, &Format::Rst);
        assert_eq!(rst.from_format(), "rst");
    }

    #[test]
    fn test_command_line() {
        let converter = PandocConverter::new("pandoc", "rst", vec!["--to=html5".into()]);
        let cmd = converter.command(Path::new("/tmp/index.rst"));
        assert_eq!(cmd.get_program(), "pandoc");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["--from=rst", "--to=html5", "/tmp/index.rst"]);
    }

    #[test]
    fn test_probe_missing_program() {
        assert!(PandocConverter::probe("/nonexistent/markview-pandoc").is_err());
    }

    #[test]
    fn test_convert_with_missing_program() {
        let converter = PandocConverter::new("/nonexistent/markview-pandoc", "markdown", vec![]);
        let err = converter.convert_file(Path::new("README.md")).unwrap_err();
        assert!(matches!(err, ConvertError::Io(_)));
    }
}
