use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::OnceLock;

pub struct Dirs;

impl Dirs {
    /// Project directory specifically for markview.
    ///
    /// Returns `None` when no home directory can be determined, in which case
    /// only the bundled defaults are available.
    pub fn project() -> Option<&'static ProjectDirs> {
        static CELL: OnceLock<Option<ProjectDirs>> = OnceLock::new();

        CELL.get_or_init(|| ProjectDirs::from("org", "markview", "MarkView"))
            .as_ref()
    }

    /// Location of the user settings override.
    ///
    /// Linux: ~/.config/markview/settings.toml
    /// macOS: ~/Library/Application\ Support/org.markview.MarkView/settings.toml
    /// Windows: ~\AppData\Roaming\markview\MarkView\config\settings.toml
    pub fn user_settings_file() -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Directory searched for user-provided stylesheets.
    pub fn user_stylesheet_dir() -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.config_dir().join("stylesheets"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_settings_file_name() {
        if let Some(path) = Dirs::user_settings_file() {
            assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("settings.toml"));
        }
    }
}
