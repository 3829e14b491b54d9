//! Embedded web assets of the viewer page.

use markview_core::convert::escape_html;

/// HTML template with placeholders for title, CSS and JS.
pub const HTML_TEMPLATE: &str = include_str!("../js/index.html");

/// Layout of the page around the document.
pub const STYLES_CSS: &str = include_str!("../js/styles.css");

pub const APP_JS: &str = include_str!("../js/app.js");

pub struct Assets;

impl Assets {
    /// Build the complete HTML page with inlined CSS and JS.
    ///
    /// This replaces the placeholders in the template:
    /// - `__TITLE__` -> escaped window title
    /// - `__THEME_HREF__` -> URL of the initial document stylesheet
    /// - `/*__STYLES_CSS__*/` -> styles.css content
    /// - `/*__APP_JS__*/` -> app.js content
    pub fn build_html(title: &str, theme_href: &str) -> String {
        HTML_TEMPLATE
            .replace("__TITLE__", &escape_html(title))
            .replace("__THEME_HREF__", &escape_html(theme_href))
            .replace("/*__STYLES_CSS__*/", STYLES_CSS)
            .replace("/*__APP_JS__*/", APP_JS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_html() {
        let html = Assets::build_html("a<b>.md", "/themes/dark.css");
        assert!(html.contains("<title>a&lt;b&gt;.md</title>"));
        assert!(html.contains(r#"href="/themes/dark.css""#));
        assert!(!html.contains("__STYLES_CSS__"));
        assert!(!html.contains("__APP_JS__"));
        assert!(html.contains("new WebSocket"));
    }
}
