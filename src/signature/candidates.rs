use std::collections::BTreeSet;

use crate::dom::dom_model::{Document, NodeId};

/// Attributes that mark an element as a possible region container.
pub const MARKER_ATTRIBUTES: &[&str] = &["role", "aria-label", "data-pagelet"];

/// Elements that could be an unknown distraction block: anything carrying a
/// marker attribute whose text or marker values mention a keyword.
///
/// The sequence is lazy and walks the document afresh on every call.
pub fn candidates_of<'a>(
    doc: &'a Document,
    keywords: &BTreeSet<String>,
) -> impl Iterator<Item = NodeId> + use<'a> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    doc.elements()
        .filter(move |node| is_candidate(doc, *node, &keywords))
}

fn is_candidate(doc: &Document, node: NodeId, keywords: &[String]) -> bool {
    let markers: Vec<String> = MARKER_ATTRIBUTES
        .iter()
        .filter_map(|a| doc.attribute(node, a))
        .map(str::to_lowercase)
        .collect();
    if markers.is_empty() || keywords.is_empty() {
        return false;
    }

    if markers
        .iter()
        .any(|m| keywords.iter().any(|k| m.contains(k.as_str())))
    {
        return true;
    }

    let text = doc.text_content(node).to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str()))
}
