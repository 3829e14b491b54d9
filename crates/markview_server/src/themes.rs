//! Stylesheets the document can be displayed with.

use crate::protocol::ThemeInfo;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};

/// Name of the stylesheet compiled into the binary.
pub const DEFAULT_THEME: &str = "default.css";

const DEFAULT_THEME_CSS: &str = include_str!("../themes/default.css");

/// Characters escaped in stylesheet URLs.
const NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

/// Number of themes reachable through `Ctrl+1` to `Ctrl+9`.
const MAX_SHORTCUTS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ThemeSource {
    Builtin(&'static str),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    source: ThemeSource,
}

impl Theme {
    pub async fn load(&self) -> std::io::Result<String> {
        match &self.source {
            ThemeSource::Builtin(css) => Ok((*css).to_string()),
            ThemeSource::File(path) => tokio::fs::read_to_string(path).await,
        }
    }
}

/// The `*.css` files of the stylesheet directory plus the built-in default,
/// sorted by name.
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    themes: Vec<Theme>,
}

impl Default for ThemeCatalog {
    fn default() -> Self {
        Self {
            themes: vec![Theme {
                name: DEFAULT_THEME.to_string(),
                source: ThemeSource::Builtin(DEFAULT_THEME_CSS),
            }],
        }
    }
}

impl ThemeCatalog {
    /// Lists the stylesheets in `dir`.
    ///
    /// A file named like the built-in default replaces it. A missing directory
    /// leaves only the built-in default.
    pub fn discover(dir: Option<&Path>) -> Self {
        let mut catalog = Self::default();

        let Some(dir) = dir else {
            return catalog;
        };

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(?err, dir = %dir.display(), "No stylesheet directory");
                return catalog;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let is_css = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("css"));
            if !is_css || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let theme = Theme {
                name: name.to_string(),
                source: ThemeSource::File(path.clone()),
            };
            match catalog.themes.iter_mut().find(|t| t.name == theme.name) {
                Some(existing) => *existing = theme,
                None => catalog.themes.push(theme),
            }
        }

        catalog.themes.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(count = catalog.themes.len(), dir = %dir.display(), "Discovered stylesheets");

        catalog
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|theme| theme.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.iter().find(|theme| theme.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The theme to start with: `preferred` if known, the built-in default
    /// otherwise.
    pub fn initial(&self, preferred: &str) -> String {
        if self.contains(preferred) {
            preferred.to_string()
        } else {
            tracing::warn!(preferred, "Unknown stylesheet, using {DEFAULT_THEME}");
            DEFAULT_THEME.to_string()
        }
    }

    /// Shortcut digit of `name`, the first nine themes have one.
    pub fn shortcut(&self, name: &str) -> Option<u8> {
        self.themes
            .iter()
            .take(MAX_SHORTCUTS)
            .position(|theme| theme.name == name)
            .map(|idx| idx as u8 + 1)
    }

    pub fn infos(&self) -> Vec<ThemeInfo> {
        self.themes
            .iter()
            .map(|theme| ThemeInfo {
                name: theme.name.clone(),
                href: href(&theme.name),
                shortcut: self.shortcut(&theme.name),
            })
            .collect()
    }
}

/// URL path the stylesheet `name` is served under.
pub fn href(name: &str) -> String {
    format!("/themes/{}", utf8_percent_encode(name, NAME_ENCODE_SET))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_only() {
        let catalog = ThemeCatalog::discover(None);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec![DEFAULT_THEME]);
        assert_eq!(catalog.initial("missing.css"), DEFAULT_THEME);

        let catalog = ThemeCatalog::discover(Some(Path::new("/nonexistent/markview-styles")));
        assert_eq!(catalog.names().count(), 1);
    }

    #[tokio::test]
    async fn test_discover_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["solarized.css", "dark.css", "notes.txt", "default.css"] {
            std::fs::write(dir.path().join(name), format!("/* {name} */")).unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.css")).unwrap();

        let catalog = ThemeCatalog::discover(Some(dir.path()));
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["dark.css", "default.css", "solarized.css"]
        );
        assert_eq!(catalog.initial("dark.css"), "dark.css");

        // The file overrides the built-in stylesheet.
        let css = catalog.get(DEFAULT_THEME).unwrap().load().await.unwrap();
        assert_eq!(css, "/* default.css */");
    }

    #[test]
    fn test_shortcuts() {
        let dir = tempfile::tempdir().unwrap();
        for idx in 0..11 {
            std::fs::write(dir.path().join(format!("theme{idx:02}.css")), "").unwrap();
        }

        let catalog = ThemeCatalog::discover(Some(dir.path()));
        // default.css sorts before theme00.css.
        assert_eq!(catalog.shortcut(DEFAULT_THEME), Some(1));
        assert_eq!(catalog.shortcut("theme00.css"), Some(2));
        assert_eq!(catalog.shortcut("theme07.css"), Some(9));
        assert_eq!(catalog.shortcut("theme08.css"), None);

        let infos = catalog.infos();
        assert_eq!(infos.len(), 12);
        assert_eq!(infos[1].href, "/themes/theme00.css");
        assert_eq!(href("my theme.css"), "/themes/my%20theme.css");
    }
}
