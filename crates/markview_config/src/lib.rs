//! Settings of markview.
//!
//! [`Settings`] is loaded exactly once on startup via [`load_settings`] and then
//! handed to every component that needs it as a read-only value. It is never
//! written back to disk.

mod formats;

pub use formats::FormatTable;

use dirs::Dirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings shipped with the binary, used when no user override exists.
pub const BUNDLED_SETTINGS: &str = include_str!("../settings.toml");

/// Lower bound of `poll_interval_ms`, shorter intervals keep the watcher busy.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Specify the log file path.
    pub log_file: Option<String>,

    /// Specify the max log level.
    pub max_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            max_level: "debug".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the preview server binds to.
    pub host: String,

    /// Port of the preview server, 0 picks a free one.
    pub port: u16,

    /// Open the preview in the default browser once the server is up.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            open_browser: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Format name to space-separated file extensions.
    pub formats: FormatTable,

    /// Format applied to files with an unknown or missing extension.
    pub no_extension: String,

    /// Prefer pandoc over the in-process converters.
    pub via_pandoc: bool,

    /// Path of the pandoc executable.
    pub pandoc_path: String,

    /// Input format token passed to pandoc for markdown files.
    pub pandoc_markdown: String,

    /// Extra arguments passed to pandoc, split on whitespace.
    pub pandoc_args: String,

    /// File name of the default stylesheet.
    pub style: String,

    /// Allow plugin content in the rendered document.
    pub plugins: bool,

    /// Interval of the polling fallback of the file watcher.
    pub poll_interval_ms: u64,

    /// Directory holding the selectable stylesheets.
    ///
    /// Defaults to `stylesheets/` in the user config directory.
    pub stylesheet_dir: Option<PathBuf>,

    /// Log configuration.
    pub log: LogConfig,

    /// Preview server configuration.
    pub server: ServerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            formats: FormatTable::from_iter([
                ("markdown", "md markdown mdown mkd mkdn txt"),
                ("rst", "rst rest"),
                ("textile", "textile"),
                ("creole", "creole wiki"),
            ]),
            no_extension: "markdown".into(),
            via_pandoc: false,
            pandoc_path: "pandoc".into(),
            pandoc_markdown: "markdown".into(),
            pandoc_args: "--to=html5".into(),
            style: "default.css".into(),
            plugins: false,
            poll_interval_ms: 500,
            stylesheet_dir: None,
            log: LogConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let mut settings: Self = toml::from_str(contents)?;
        if settings.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            tracing::warn!(
                poll_interval_ms = settings.poll_interval_ms,
                "Poll interval too short, using {MIN_POLL_INTERVAL_MS}ms"
            );
            settings.poll_interval_ms = MIN_POLL_INTERVAL_MS;
        }
        Ok(settings)
    }

    /// Settings compiled into the binary.
    pub fn bundled() -> Self {
        Self::from_toml_str(BUNDLED_SETTINGS).unwrap_or_default()
    }

    pub fn pandoc_args(&self) -> Vec<String> {
        self.pandoc_args
            .split_whitespace()
            .map(ToOwned::to_owned)
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn stylesheet_dir(&self) -> Option<PathBuf> {
        self.stylesheet_dir
            .clone()
            .or_else(Dirs::user_stylesheet_dir)
    }
}

/// Where the effective settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// File given on the command line.
    Explicit(PathBuf),
    /// Override in the user config directory.
    User(PathBuf),
    /// Defaults compiled into the binary.
    Bundled,
}

#[derive(Debug)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub source: SettingsSource,
    /// Error of a settings file that was found but could not be used, the
    /// bundled settings are in effect then.
    pub maybe_error: Option<SettingsError>,
}

fn read_settings_file(path: &Path) -> Result<Settings, SettingsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Settings::from_toml_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the settings on startup.
///
/// An explicitly specified file takes precedence, then the user override if
/// it exists, then the bundled defaults.
pub fn load_settings(specified_settings_file: Option<PathBuf>) -> LoadedSettings {
    load_settings_from(specified_settings_file, Dirs::user_settings_file())
}

fn load_settings_from(
    specified_settings_file: Option<PathBuf>,
    user_settings_file: Option<PathBuf>,
) -> LoadedSettings {
    let candidate = specified_settings_file
        .map(|path| (SettingsSource::Explicit(path.clone()), path))
        .or_else(|| {
            user_settings_file
                .filter(|path| path.is_file())
                .map(|path| (SettingsSource::User(path.clone()), path))
        });

    let Some((source, path)) = candidate else {
        return LoadedSettings {
            settings: Settings::bundled(),
            source: SettingsSource::Bundled,
            maybe_error: None,
        };
    };

    match read_settings_file(&path) {
        Ok(settings) => {
            tracing::debug!(path = %path.display(), "Loaded settings");
            LoadedSettings {
                settings,
                source,
                maybe_error: None,
            }
        }
        Err(err) => {
            tracing::warn!(%err, "Falling back to the bundled settings");
            LoadedSettings {
                settings: Settings::bundled(),
                source: SettingsSource::Bundled,
                maybe_error: Some(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_settings_match_default() {
        let bundled =
            Settings::from_toml_str(BUNDLED_SETTINGS).expect("Failed to parse bundled settings");
        assert_eq!(bundled, Settings::default());
    }

    #[test]
    fn test_load_settings() {
        let toml_content = r#"
          no_extension = "rst"
          via_pandoc = true
          pandoc_args = "--to=html5 --mathjax"
          plugins = true

          [formats]
          markdown = "md"
          creole = "wiki"

          [log]
          max_level = "trace"
          log_file = "/tmp/markview.log"
"#;
        let settings = Settings::from_toml_str(toml_content).expect("Failed to parse settings");

        assert_eq!(
            settings,
            Settings {
                formats: FormatTable::from_iter([("markdown", "md"), ("creole", "wiki")]),
                no_extension: "rst".to_string(),
                via_pandoc: true,
                pandoc_args: "--to=html5 --mathjax".to_string(),
                plugins: true,
                log: LogConfig {
                    log_file: Some("/tmp/markview.log".to_string()),
                    max_level: "trace".to_string(),
                },
                ..Default::default()
            }
        );
        assert_eq!(settings.pandoc_args(), vec!["--to=html5", "--mathjax"]);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(Settings::from_toml_str("no_such_key = 1").is_err());
    }

    #[test]
    fn test_load_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let user_file = dir.path().join("settings.toml");
        let explicit_file = dir.path().join("explicit.toml");
        std::fs::write(&user_file, "style = \"user.css\"").unwrap();
        std::fs::write(&explicit_file, "style = \"explicit.css\"").unwrap();

        let loaded = load_settings_from(Some(explicit_file.clone()), Some(user_file.clone()));
        assert_eq!(loaded.source, SettingsSource::Explicit(explicit_file));
        assert_eq!(loaded.settings.style, "explicit.css");

        let loaded = load_settings_from(None, Some(user_file.clone()));
        assert_eq!(loaded.source, SettingsSource::User(user_file));
        assert_eq!(loaded.settings.style, "user.css");

        let loaded = load_settings_from(None, Some(dir.path().join("missing.toml")));
        assert_eq!(loaded.source, SettingsSource::Bundled);
        assert!(loaded.maybe_error.is_none());
    }

    #[test]
    fn test_invalid_user_settings_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let user_file = dir.path().join("settings.toml");
        std::fs::write(&user_file, "via_pandoc = \"maybe\"").unwrap();

        let loaded = load_settings_from(None, Some(user_file));
        assert_eq!(loaded.source, SettingsSource::Bundled);
        assert_eq!(loaded.settings, Settings::default());
        assert!(matches!(
            loaded.maybe_error,
            Some(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        let settings = Settings::from_toml_str("poll_interval_ms = 0").unwrap();
        assert_eq!(settings.poll_interval_ms, MIN_POLL_INTERVAL_MS);

        let settings = Settings {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.poll_interval(),
            Duration::from_millis(MIN_POLL_INTERVAL_MS)
        );
        assert_eq!(Settings::default().poll_interval(), Duration::from_millis(500));
    }
}
