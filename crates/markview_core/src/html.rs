//! The element tree of rendered HTML.
//!
//! Converter output is parsed as an HTML5 fragment in `body` context, which is
//! what the page does when it assigns the document to `innerHTML`. Implied end
//! tags, character references and misnested markup therefore come out the
//! same as in the browser.

use ego_tree::NodeRef;
use scraper::Html;

/// Elements not part of the visible text.
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "template", "title"];

/// Elements starting on a new line in the plain-text projection.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "div", "dl",
    "dt", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "html", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody",
    "tfoot", "thead", "tr", "ul",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Value of the `id` attribute.
    pub id: Option<String>,
    /// Index of this element among all elements in document order.
    pub position: usize,
    pub children: Vec<Node>,
}

impl Element {
    /// Returns the heading level for `h1`..`h6`.
    pub fn heading_level(&self) -> Option<u8> {
        match self.tag.as_bytes() {
            [b'h', level @ b'1'..=b'6'] => Some(level - b'0'),
            _ => None,
        }
    }

    /// Visible text of this element with whitespace collapsed.
    pub fn text(&self) -> String {
        let mut segments = Vec::new();
        collect_text(&self.children, &mut segments);
        segments.concat().split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn is_hidden(&self) -> bool {
        HIDDEN_ELEMENTS.contains(&self.tag.as_str())
    }
}

fn collect_text<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push(text),
            Node::Element(element) if element.is_hidden() => {}
            Node::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// A parsed HTML fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    /// Parses `html` into an element tree.
    pub fn parse(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        let mut position = 0usize;
        // The fragment is wrapped in a synthetic `html` element.
        let nodes = convert_children(*fragment.root_element(), &mut position);
        Self { nodes }
    }

    /// Iterates over all elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        let mut pending: Vec<&Node> = self.nodes.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(node) = pending.pop() {
                if let Node::Element(element) = node {
                    pending.extend(element.children.iter().rev());
                    return Some(element);
                }
            }
            None
        })
    }

    /// The visible text nodes in document order.
    ///
    /// These are the nodes the page walks when it marks search hits, so an
    /// occurrence counts only when it lies within a single node.
    pub fn text_nodes(&self) -> Vec<&str> {
        let mut segments = Vec::new();
        collect_text(&self.nodes, &mut segments);
        segments
    }

    /// The text a reader sees, roughly what a browser's `innerText` yields.
    pub fn plain_text(&self) -> String {
        let mut projection = TextProjection::default();
        projection.walk(&self.nodes, false);
        projection.finish()
    }
}

fn convert_children(parent: NodeRef<'_, scraper::Node>, position: &mut usize) -> Vec<Node> {
    let mut nodes = Vec::new();

    for child in parent.children() {
        match child.value() {
            scraper::Node::Text(text) => {
                let text: &str = text;
                // Adjacent text nodes are merged, as after `Node.normalize()`.
                if let Some(Node::Text(prev)) = nodes.last_mut() {
                    prev.push_str(text);
                } else {
                    nodes.push(Node::Text(text.to_string()));
                }
            }
            scraper::Node::Element(element) => {
                let mut converted = Element {
                    tag: element.name().to_string(),
                    id: element.id().map(ToOwned::to_owned),
                    position: *position,
                    children: Vec::new(),
                };
                *position += 1;
                converted.children = convert_children(child, position);
                nodes.push(Node::Element(converted));
            }
            // Comments, doctypes and processing instructions.
            _ => {}
        }
    }

    nodes
}

#[derive(Default)]
struct TextProjection {
    out: String,
}

impl TextProjection {
    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(trimmed);
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn push_text(&mut self, text: &str, preformatted: bool) {
        if preformatted {
            self.out.push_str(text);
            return;
        }
        let starts_with_space = text.starts_with(char::is_whitespace);
        let ends_with_space = text.ends_with(char::is_whitespace);
        let words: Vec<&str> = text.split_whitespace().collect();

        if words.is_empty() {
            if !text.is_empty() && !self.at_line_start() && !self.out.ends_with(' ') {
                self.out.push(' ');
            }
            return;
        }

        if starts_with_space && !self.at_line_start() && !self.out.ends_with(' ') {
            self.out.push(' ');
        }
        self.out.push_str(&words.join(" "));
        if ends_with_space {
            self.out.push(' ');
        }
    }

    fn walk(&mut self, nodes: &[Node], preformatted: bool) {
        for node in nodes {
            match node {
                Node::Text(text) => self.push_text(text, preformatted),
                Node::Element(element) => {
                    if element.is_hidden() {
                        continue;
                    }
                    let tag = element.tag.as_str();
                    match tag {
                        "br" => {
                            self.trim_trailing_spaces();
                            self.out.push('\n');
                        }
                        "td" | "th" => {
                            if !self.at_line_start() {
                                self.trim_trailing_spaces();
                                self.out.push('\t');
                            }
                            self.walk(&element.children, preformatted);
                        }
                        _ if BLOCK_ELEMENTS.contains(&tag) => {
                            self.line_break();
                            self.walk(&element.children, preformatted || tag == "pre");
                            self.line_break();
                        }
                        _ => self.walk(&element.children, preformatted),
                    }
                }
            }
        }
    }

    fn finish(self) -> String {
        self.out.trim_end().trim_start_matches('\n').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_level_tags(doc: &Document) -> Vec<&str> {
        doc.nodes
            .iter()
            .map(|n| match n {
                Node::Element(e) => e.tag.as_str(),
                Node::Text(_) => "#text",
            })
            .collect()
    }

    #[test]
    fn test_parse_tree() {
        let doc = Document::parse(r#"<h1 id="top">Title</h1><p>a <em>b</em></p><hr/><img src="x.png">"#);
        assert_eq!(top_level_tags(&doc), vec!["h1", "p", "hr", "img"]);

        let Node::Element(h1) = &doc.nodes[0] else {
            panic!("Expected an element");
        };
        assert_eq!(h1.id.as_deref(), Some("top"));
        assert_eq!(h1.heading_level(), Some(1));
        assert_eq!(h1.text(), "Title");

        let positions: Vec<_> = doc.elements().map(|e| (e.tag.as_str(), e.position)).collect();
        assert_eq!(
            positions,
            vec![("h1", 0), ("p", 1), ("em", 2), ("hr", 3), ("img", 4)]
        );
    }

    #[test]
    fn test_implied_end_tags() {
        let doc = Document::parse("<h1>A</h1><p>intro<h2>B</h2><h2>C</h2>");
        // The open paragraph is closed by the first h2.
        assert_eq!(top_level_tags(&doc), vec!["h1", "p", "h2", "h2"]);

        let doc = Document::parse("<ul><li>one<li>two</ul>");
        let items = doc.elements().filter(|e| e.tag == "li").count();
        assert_eq!(items, 2);
    }

    #[test]
    fn test_unbalanced_tags() {
        let doc = Document::parse("<div><p>one<p>two</div></span>three");
        assert_eq!(doc.plain_text(), "one\ntwo\nthree");
    }

    #[test]
    fn test_character_references() {
        let doc = Document::parse("<p>caf&eacute; costs &euro;5 &amp; &#x27;more&#39; &unknown;</p>");
        assert_eq!(doc.plain_text(), "café costs €5 & 'more' &unknown;");
    }

    #[test]
    fn test_plain_text_blocks() {
        let html = "<h1>Title</h1>\n<p>Some <strong>bold</strong>\ntext.</p>\n<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n";
        assert_eq!(
            Document::parse(html).plain_text(),
            "Title\nSome bold text.\none\ntwo"
        );
    }

    #[test]
    fn test_plain_text_skips_hidden_and_keeps_pre() {
        let html = "<style>p { color: red; }</style><pre><code>a  b\n  c</code></pre><p>x<br>y</p><script>if (a < b) {}</script>";
        assert_eq!(Document::parse(html).plain_text(), "a  b\n  c\nx\ny");
    }

    #[test]
    fn test_plain_text_table_cells() {
        let html = "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>";
        assert_eq!(Document::parse(html).plain_text(), "A\tB\n1\t2");
    }

    #[test]
    fn test_text_nodes() {
        let doc = Document::parse("<p><em>foo</em> bar</p><!-- note --><script>x</script><p>foo bar</p>");
        assert_eq!(doc.text_nodes(), vec!["foo", " bar", "foo bar"]);
    }
}
