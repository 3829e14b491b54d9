//! Table of contents of a rendered document.

use crate::html::{Document, Element, Node};
use serde::{Deserialize, Serialize};

/// A heading listed in the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level, 1 to 6.
    pub level: u8,
    pub text: String,
    /// Index among all headings of the document in document order.
    ///
    /// The page scrolls to the heading with this index when the entry is
    /// activated.
    pub ordinal: usize,
}

/// Extracts the table of contents from rendered HTML.
///
/// The start is the first heading of the lowest level among `h1`..`h5`. The
/// start heading and every following heading sibling in the same parent make
/// up the table of contents. Headings nested in other containers are not
/// collected.
pub fn extract_toc(html: &str) -> Vec<TocEntry> {
    let document = Document::parse(html);
    toc_of(&document)
}

pub(crate) fn toc_of(document: &Document) -> Vec<TocEntry> {
    let headings: Vec<&Element> = document
        .elements()
        .filter(|e| e.heading_level().is_some())
        .collect();

    let Some(min_level) = headings
        .iter()
        .filter_map(|e| e.heading_level())
        .filter(|level| *level <= 5)
        .min()
    else {
        return Vec::new();
    };

    let Some(start) = headings
        .iter()
        .find(|e| e.heading_level() == Some(min_level))
        .map(|e| e.position)
    else {
        return Vec::new();
    };

    let ordinal_of = |position: usize| headings.iter().position(|e| e.position == position);

    let Some(siblings) = find_siblings(&document.nodes, start) else {
        return Vec::new();
    };

    siblings
        .iter()
        .filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
        .skip_while(|element| element.position != start)
        .filter_map(|element| {
            let level = element.heading_level()?;
            Some(TocEntry {
                level,
                text: element.text(),
                ordinal: ordinal_of(element.position)?,
            })
        })
        .collect()
}

/// Returns the children list containing the element at `position`.
fn find_siblings(nodes: &[Node], position: usize) -> Option<&[Node]> {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.position == position {
                return Some(nodes);
            }
            if let Some(found) = find_siblings(&element.children, position) {
                return Some(found);
            }
        }
    }
    None
}
