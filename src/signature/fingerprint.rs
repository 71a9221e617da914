use std::collections::BTreeMap;

use crate::dom::dom_model::{Document, NodeId};
use crate::signature::signature_model::{ChildShape, ElementSignature, SignatureRules};

/// Structural signature of `node` as the document stands right now.
pub fn signature_of(doc: &Document, node: NodeId, rules: &SignatureRules) -> ElementSignature {
    let mut attributes = BTreeMap::new();
    for name in &rules.attributes {
        if let Some(value) = doc.attribute(node, name) {
            if let Some(normalized) = normalize_attribute(name, value) {
                attributes.insert(name.clone(), normalized);
            }
        }
    }

    let children = doc
        .element_children(node)
        .iter()
        .map(|child| ChildShape {
            tag: doc.tag(*child).to_string(),
            classes: sorted_classes(doc.attribute(*child, "class").unwrap_or("")),
        })
        .collect();

    ElementSignature {
        tag: doc.tag(node).to_string(),
        attributes,
        children,
    }
}

fn normalize_attribute(name: &str, value: &str) -> Option<String> {
    match name {
        "class" => {
            let classes = sorted_classes(value);
            (!classes.is_empty()).then(|| classes.join(" "))
        }
        // FeedUnit_3 and FeedUnit_17 are the same kind of block.
        "data-pagelet" => Some(pagelet_prefix(value).to_string()),
        _ => Some(value.trim().to_string()),
    }
}

pub fn pagelet_prefix(value: &str) -> &str {
    value.trim().trim_end_matches(|c: char| c.is_ascii_digit())
}

fn sorted_classes(value: &str) -> Vec<String> {
    let mut classes: Vec<String> = value.split_whitespace().map(str::to_string).collect();
    classes.sort();
    classes.dedup();
    classes
}

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
