//! Textile to HTML conversion.
//!
//! Blocks are separated by blank lines and may carry a signature such as
//! `h2.`, `bq.` or `bc.`. Lists and tables are recognised from their first
//! line. Block and span attributes like `p(class).` are not supported.

use super::{escape_html, ConvertError, Converter};
use crate::document::Format;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, Default)]
pub struct TextileConverter;

impl Converter for TextileConverter {
    fn format(&self) -> Format {
        Format::Textile
    }

    fn convert(&self, source: &str) -> Result<String, ConvertError> {
        Ok(to_html(source))
    }
}

static SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(h[1-6]|p|bq|bc|pre)\.\s+(.*)$").unwrap());

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[*#]+\s").unwrap());

/// Spans whose content is not scanned for phrase modifiers.
static ATOM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"@(?P<code>[^@\n]+)@|"(?P<label>[^"\n]+)":(?P<href>[^\s<>"]*[^\s<>".,;:!?)])|!(?P<src>[^\s!()]+)(?:\((?P<alt>[^)]*)\))?!"#,
    )
    .unwrap()
});

struct Phrase {
    pattern: Regex,
    tag: &'static str,
}

impl Phrase {
    fn new(marker: &str, tag: &'static str) -> Self {
        let marker = regex::escape(marker);
        // The shortest span wins, `*a* *b*` is two phrases.
        let pattern = format!(r"(^|[^\w]){marker}(\S(?:[^\n]*?\S)??){marker}");
        Self {
            pattern: Regex::new(&pattern).unwrap(),
            tag,
        }
    }

    fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures| {
                let closes_word = caps
                    .get(0)
                    .and_then(|m| text[m.end()..].chars().next())
                    .map_or(true, |c| !c.is_alphanumeric());
                if !closes_word {
                    return caps[0].to_string();
                }
                format!("{}<{tag}>{}</{tag}>", &caps[1], &caps[2], tag = self.tag)
            })
            .into_owned()
    }
}

/// Doubled markers come first so that `**` is not read as two `*`.
static PHRASES: Lazy<Vec<Phrase>> = Lazy::new(|| {
    vec![
        Phrase::new("**", "b"),
        Phrase::new("__", "i"),
        Phrase::new("??", "cite"),
        Phrase::new("*", "strong"),
        Phrase::new("_", "em"),
        Phrase::new("-", "del"),
        Phrase::new("+", "ins"),
        Phrase::new("^", "sup"),
        Phrase::new("~", "sub"),
    ]
});

/// Render textile content to HTML.
pub fn to_html(source: &str) -> String {
    let mut out = String::new();
    let mut block: Vec<&str> = Vec::new();

    for line in source.lines() {
        if line.trim().is_empty() {
            render_block(&block, &mut out);
            block.clear();
        } else {
            block.push(line.trim_end());
        }
    }
    render_block(&block, &mut out);

    out
}

fn render_block(lines: &[&str], out: &mut String) {
    let Some(first) = lines.first() else {
        return;
    };

    if let Some(caps) = SIGNATURE.captures(first) {
        let mut body = vec![caps.get(2).map_or("", |m| m.as_str())];
        body.extend_from_slice(&lines[1..]);

        match &caps[1] {
            "bc" => {
                out.push_str("<pre><code>");
                out.push_str(&escape_html(&body.join("\n")));
                out.push_str("</code></pre>\n");
            }
            "pre" => {
                out.push_str("<pre>");
                out.push_str(&escape_html(&body.join("\n")));
                out.push_str("</pre>\n");
            }
            "bq" => {
                out.push_str("<blockquote>\n<p>");
                out.push_str(&inline_lines(&body));
                out.push_str("</p>\n</blockquote>\n");
            }
            "p" => {
                out.push_str("<p>");
                out.push_str(&inline_lines(&body));
                out.push_str("</p>\n");
            }
            heading => {
                out.push_str(&format!("<{heading}>{}</{heading}>\n", inline_lines(&body)));
            }
        }
        return;
    }

    if LIST_ITEM.is_match(first) {
        list(lines, out);
        return;
    }

    if first.starts_with('|') {
        table(lines, out);
        return;
    }

    out.push_str("<p>");
    out.push_str(&inline_lines(lines));
    out.push_str("</p>\n");
}

/// Single newlines inside a block are kept as line breaks.
fn inline_lines(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| inline(line.trim()))
        .collect::<Vec<_>>()
        .join("<br />\n")
}

fn list(lines: &[&str], out: &mut String) {
    let mut open: Vec<&'static str> = Vec::new();

    fn close(out: &mut String, open: &mut Vec<&'static str>) {
        if let Some(tag) = open.pop() {
            out.push_str("</li></");
            out.push_str(tag);
            out.push('>');
        }
    }

    for line in lines {
        if !LIST_ITEM.is_match(line) {
            // Continuation of the current item.
            out.push(' ');
            out.push_str(&inline(line.trim()));
            continue;
        }

        let depth = line.chars().take_while(|c| matches!(c, '*' | '#')).count();
        let tag = if line[..depth].ends_with('#') { "ol" } else { "ul" };

        while open.len() > depth {
            close(out, &mut open);
        }
        if open.len() == depth {
            if open.last() == Some(&tag) {
                out.push_str("</li>");
            } else {
                close(out, &mut open);
            }
        }
        while open.len() < depth {
            open.push(tag);
            out.push('<');
            out.push_str(tag);
            out.push('>');
        }

        out.push_str("<li>");
        out.push_str(&inline(line[depth..].trim()));
    }

    while !open.is_empty() {
        close(out, &mut open);
    }
    out.push('\n');
}

fn table(lines: &[&str], out: &mut String) {
    out.push_str("<table>\n");
    for line in lines {
        let row = line.trim();
        let row = row.strip_prefix('|').unwrap_or(row);
        let row = row.strip_suffix('|').unwrap_or(row);

        out.push_str("<tr>");
        for cell in row.split('|') {
            let (tag, content) = match cell.strip_prefix("_.") {
                Some(header) => ("th", header),
                None => ("td", cell),
            };
            out.push_str(&format!("<{tag}>{}</{tag}>", inline(content.trim())));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

fn phrases(text: &str) -> String {
    PHRASES
        .iter()
        .fold(escape_html(text), |text, phrase| phrase.apply(&text))
}

/// Render inline textile markup.
fn inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in ATOM.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&phrases(&text[last..whole.start()]));
        last = whole.end();

        if let Some(code) = caps.name("code") {
            out.push_str("<code>");
            out.push_str(&escape_html(code.as_str()));
            out.push_str("</code>");
        } else if let (Some(label), Some(href)) = (caps.name("label"), caps.name("href")) {
            out.push_str(&format!(
                "<a href=\"{}\">{}</a>",
                escape_html(href.as_str()),
                phrases(label.as_str())
            ));
        } else if let Some(src) = caps.name("src") {
            let alt = caps.name("alt").map_or("", |m| m.as_str());
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\" />",
                escape_html(src.as_str()),
                escape_html(alt)
            ));
        }
    }
    out.push_str(&phrases(&text[last..]));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        assert_eq!(
            to_html("h1. Title\n\nSome *strong* and _em_ text.\n\nh3. Sub"),
            "<h1>Title</h1>\n<p>Some <strong>strong</strong> and <em>em</em> text.</p>\n<h3>Sub</h3>\n"
        );
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(to_html("one\ntwo"), "<p>one<br />\ntwo</p>\n");
    }

    #[test]
    fn test_phrase_modifiers() {
        assert_eq!(
            inline("**b** __i__ ??c?? -d- +e+ ^f^ ~g~"),
            "<b>b</b> <i>i</i> <cite>c</cite> <del>d</del> <ins>e</ins> <sup>f</sup> <sub>g</sub>"
        );
        // Markers inside words are text.
        assert_eq!(inline("well-known snake_case_name"), "well-known snake_case_name");
        assert_eq!(inline("*a* *b*"), "<strong>a</strong> <strong>b</strong>");
    }

    #[test]
    fn test_links_images_and_code() {
        assert_eq!(
            inline(r#"See "the *docs*":other.textile."#),
            r#"See <a href="other.textile">the <strong>docs</strong></a>."#
        );
        assert_eq!(
            inline("!img.png(Alt)! and @a < *b*@"),
            r#"<img src="img.png" alt="Alt" /> and <code>a &lt; *b*</code>"#
        );
    }

    #[test]
    fn test_blocks() {
        assert_eq!(
            to_html("bq. quoted\n\nbc. a < b\nc"),
            "<blockquote>\n<p>quoted</p>\n</blockquote>\n<pre><code>a &lt; b\nc</code></pre>\n"
        );
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            to_html("* a\n** b\n* c\n# d"),
            "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul><ol><li>d</li></ol>\n"
        );
    }

    #[test]
    fn test_table() {
        assert_eq!(
            to_html("|_. A|_. B|\n|1|2|"),
            "<table>\n<tr><th>A</th><th>B</th></tr>\n<tr><td>1</td><td>2</td></tr>\n</table>\n"
        );
    }
}
