//! WikiCreole 1.0 to HTML conversion.
//!
//! Block elements are recognised line by line, inline markup is handled by a
//! small scanner. Unclosed inline markup is closed at the end of its block.

use super::{escape_html, ConvertError, Converter};
use crate::document::Format;

#[derive(Debug, Clone, Copy, Default)]
pub struct CreoleConverter;

impl Converter for CreoleConverter {
    fn format(&self) -> Format {
        Format::Creole
    }

    fn convert(&self, source: &str) -> Result<String, ConvertError> {
        Ok(to_html(source))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Unordered => "ul",
            Self::Ordered => "ol",
        }
    }
}

#[derive(Default)]
struct Writer {
    out: String,
    paragraph: Vec<String>,
    lists: Vec<ListKind>,
    table_open: bool,
}

impl Writer {
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join(" ");
        self.paragraph.clear();
        self.out.push_str("<p>");
        self.out.push_str(&inline(&text));
        self.out.push_str("</p>\n");
    }

    fn close_lists(&mut self) {
        while let Some(kind) = self.lists.pop() {
            self.out.push_str("</li></");
            self.out.push_str(kind.tag());
            self.out.push('>');
            if self.lists.is_empty() {
                self.out.push('\n');
            }
        }
    }

    fn close_table(&mut self) {
        if self.table_open {
            self.out.push_str("</table>\n");
            self.table_open = false;
        }
    }

    fn flush_all(&mut self) {
        self.flush_paragraph();
        self.close_lists();
        self.close_table();
    }

    fn open_list(&mut self, kind: ListKind) {
        self.lists.push(kind);
        self.out.push('<');
        self.out.push_str(kind.tag());
        self.out.push('>');
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.lists.pop() {
            self.out.push_str("</li></");
            self.out.push_str(kind.tag());
            self.out.push('>');
        }
    }

    fn list_item(&mut self, depth: usize, kind: ListKind, text: &str) {
        self.flush_paragraph();
        self.close_table();

        while self.lists.len() > depth {
            self.close_list();
        }
        if self.lists.len() == depth {
            if self.lists.last() == Some(&kind) {
                self.out.push_str("</li>");
            } else {
                self.close_list();
                self.open_list(kind);
            }
        }
        while self.lists.len() < depth {
            self.open_list(kind);
        }

        self.out.push_str("<li>");
        self.out.push_str(&inline(text));
    }

    fn table_row(&mut self, line: &str) {
        self.flush_paragraph();
        self.close_lists();
        if !self.table_open {
            self.out.push_str("<table>\n");
            self.table_open = true;
        }

        let row = line.trim();
        let row = row.strip_prefix('|').unwrap_or(row);
        let row = row.strip_suffix('|').unwrap_or(row);

        self.out.push_str("<tr>");
        for cell in split_cells(row) {
            let (tag, content) = match cell.strip_prefix('=') {
                Some(header) => ("th", header),
                None => ("td", cell),
            };
            self.out.push('<');
            self.out.push_str(tag);
            self.out.push('>');
            self.out.push_str(&inline(content.trim()));
            self.out.push_str("</");
            self.out.push_str(tag);
            self.out.push('>');
        }
        self.out.push_str("</tr>\n");
    }
}

/// Render creole content to HTML.
pub fn to_html(source: &str) -> String {
    let mut writer = Writer::default();
    let mut lines = source.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            writer.flush_all();
            continue;
        }

        if trimmed == "{{{" {
            writer.flush_all();
            let mut preformatted = Vec::new();
            for line in lines.by_ref() {
                if line.trim_end() == "}}}" {
                    break;
                }
                // A leading space protects a literal `}}}` line.
                let line = if line.starts_with(" }}}") { &line[1..] } else { line };
                preformatted.push(escape_html(line));
            }
            writer.out.push_str("<pre>");
            writer.out.push_str(&preformatted.join("\n"));
            writer.out.push_str("</pre>\n");
            continue;
        }

        if let Some((level, text)) = parse_heading(trimmed) {
            writer.flush_all();
            writer
                .out
                .push_str(&format!("<h{level}>{}</h{level}>\n", inline(text)));
            continue;
        }

        if trimmed.len() >= 4 && trimmed.chars().all(|c| c == '-') {
            writer.flush_all();
            writer.out.push_str("<hr />\n");
            continue;
        }

        if let Some((depth, kind, text)) = parse_list_item(trimmed, !writer.lists.is_empty()) {
            writer.list_item(depth, kind, text);
            continue;
        }

        if trimmed.starts_with('|') {
            writer.table_row(trimmed);
            continue;
        }

        if !writer.lists.is_empty() {
            // Continuation of the current list item.
            writer.out.push(' ');
            writer.out.push_str(&inline(trimmed));
            continue;
        }

        writer.close_table();
        writer.paragraph.push(trimmed.to_string());
    }

    writer.flush_all();
    writer.out
}

fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '=').count();
    if level == 0 {
        return None;
    }
    let text = line[level..].trim_end().trim_end_matches('=').trim();
    Some((level.min(6), text))
}

fn parse_list_item(line: &str, in_list: bool) -> Option<(usize, ListKind, &str)> {
    let marker = line.chars().next()?;
    let kind = match marker {
        '*' => ListKind::Unordered,
        '#' => ListKind::Ordered,
        _ => return None,
    };
    let markers = line
        .chars()
        .take_while(|c| *c == '*' || *c == '#')
        .count();
    let rest = &line[markers..];

    // `**bold**` at the start of a paragraph is not a list.
    if markers > 1 && !in_list && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let kind = match line[..markers].chars().last() {
        Some('#') => ListKind::Ordered,
        Some('*') => ListKind::Unordered,
        _ => kind,
    };

    Some((markers, kind, rest.trim()))
}

/// Splits a table row on `|`, ignoring separators inside links and images.
fn split_cells(row: &str) -> Vec<&str> {
    let mut cells = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let bytes = row.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' | b'{' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth += 1;
                i += 2;
                continue;
            }
            b']' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth = depth.saturating_sub(1);
                i += 2;
                continue;
            }
            b'|' if depth == 0 => {
                cells.push(&row[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    cells.push(&row[start..]);
    cells
}

const URL_SCHEMES: &[&str] = &["http://", "https://", "ftp://", "mailto:"];

fn url_len(text: &str) -> Option<usize> {
    if !URL_SCHEMES.iter().any(|scheme| text.starts_with(scheme)) {
        return None;
    }
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    let url = text[..end].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '"', '\'']);
    Some(url.len())
}

fn toggle(out: &mut String, open: &mut Vec<&'static str>, tag: &'static str) {
    if let Some(pos) = open.iter().rposition(|t| *t == tag) {
        while open.len() > pos {
            if let Some(t) = open.pop() {
                out.push_str("</");
                out.push_str(t);
                out.push('>');
            }
        }
    } else {
        open.push(tag);
        out.push('<');
        out.push_str(tag);
        out.push('>');
    }
}

/// Render inline creole markup.
fn inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&'static str> = Vec::new();
    let mut rest = text;
    let mut prev: Option<char> = None;

    while let Some(c) = rest.chars().next() {
        // Escape character.
        if let Some(after) = rest.strip_prefix('~') {
            match after.chars().next() {
                Some(next) if !next.is_whitespace() => {
                    out.push_str(&escape_html(&next.to_string()));
                    rest = &after[next.len_utf8()..];
                    prev = Some(next);
                }
                _ => {
                    out.push('~');
                    rest = after;
                    prev = Some('~');
                }
            }
            continue;
        }

        if let Some(after) = rest.strip_prefix("{{{") {
            if let Some(end) = after.find("}}}") {
                out.push_str("<tt>");
                out.push_str(&escape_html(&after[..end]));
                out.push_str("</tt>");
                rest = &after[end + 3..];
                prev = Some('}');
                continue;
            }
        }

        if let Some(after) = rest.strip_prefix("[[") {
            if let Some(end) = after.find("]]") {
                let inner = &after[..end];
                let (target, label) = match inner.split_once('|') {
                    Some((target, label)) => (target.trim(), Some(label.trim())),
                    None => (inner.trim(), None),
                };
                out.push_str(&format!("<a href=\"{}\">", escape_html(target)));
                match label {
                    Some(label) if !label.is_empty() => out.push_str(&inline(label)),
                    _ => out.push_str(&escape_html(target)),
                }
                out.push_str("</a>");
                rest = &after[end + 2..];
                prev = Some(']');
                continue;
            }
        }

        if let Some(after) = rest.strip_prefix("{{") {
            if let Some(end) = after.find("}}") {
                let inner = &after[..end];
                let (src, alt) = inner.split_once('|').unwrap_or((inner, ""));
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\" />",
                    escape_html(src.trim()),
                    escape_html(alt.trim())
                ));
                rest = &after[end + 2..];
                prev = Some('}');
                continue;
            }
        }

        if !prev.is_some_and(char::is_alphanumeric) {
            if let Some(len) = url_len(rest).filter(|len| *len > 0) {
                let url = escape_html(&rest[..len]);
                out.push_str(&format!("<a href=\"{url}\">{url}</a>"));
                rest = &rest[len..];
                prev = Some('/');
                continue;
            }
        }

        if let Some(after) = rest.strip_prefix("\\\\") {
            out.push_str("<br />");
            rest = after;
            prev = Some('\\');
            continue;
        }

        if let Some(after) = rest.strip_prefix("**") {
            toggle(&mut out, &mut open, "strong");
            rest = after;
            prev = Some('*');
            continue;
        }

        if let Some(after) = rest.strip_prefix("//") {
            toggle(&mut out, &mut open, "em");
            rest = after;
            prev = Some('/');
            continue;
        }

        out.push_str(&escape_html(&c.to_string()));
        rest = &rest[c.len_utf8()..];
        prev = Some(c);
    }

    while let Some(tag) = open.pop() {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    out
}
