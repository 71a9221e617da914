use crate::dom::dom_model::{Document, NodeId};
use crate::dom::selector::{is_plain_ident, quote_attr_value};

/// Standalone CSS fragments that would select `node`, most specific first:
/// id, then each class, then role, then aria-label. Duplicates are dropped.
pub fn generate_selectors(doc: &Document, node: NodeId) -> Vec<String> {
    let mut selectors: Vec<String> = Vec::new();

    if let Some(id) = doc.attribute(node, "id").map(str::trim).filter(|v| !v.is_empty()) {
        if is_plain_ident(id) {
            selectors.push(format!("#{id}"));
        } else {
            selectors.push(format!("[id={}]", quote_attr_value(id)));
        }
    }

    for class in doc.classes(node) {
        if is_plain_ident(class) {
            selectors.push(format!(".{class}"));
        } else {
            selectors.push(format!("[class~={}]", quote_attr_value(class)));
        }
    }

    for attr in ["role", "aria-label"] {
        if let Some(value) = doc.attribute(node, attr).filter(|v| !v.trim().is_empty()) {
            selectors.push(format!("[{attr}={}]", quote_attr_value(value)));
        }
    }

    let mut seen = std::collections::HashSet::new();
    selectors.retain(|s| seen.insert(s.clone()));
    selectors
}
