use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

/// Tag and sorted class list of one immediate child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChildShape {
    pub tag: String,
    pub classes: Vec<String>,
}

/// Content-independent structural fingerprint of an element.
///
/// Two elements with the same tag, the same interesting attributes and the
/// same child shape are structurally equivalent whatever their text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementSignature {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<ChildShape>,
}

impl ElementSignature {
    /// Canonical string form. Attribute names come out sorted, values are
    /// quoted, so equal signatures always produce equal keys.
    pub fn key(&self) -> String {
        let mut key = String::new();
        let _ = write!(key, "<{}", self.tag);
        for (name, value) in &self.attributes {
            let _ = write!(key, " {}={:?}", name, value);
        }
        key.push('>');
        for child in &self.children {
            let _ = write!(key, "[{}", child.tag);
            for class in &child.classes {
                let _ = write!(key, ".{}", class);
            }
            key.push(']');
        }
        key
    }

    /// Short stable identifier of the signature.
    pub fn digest(&self) -> String {
        crate::signature::fingerprint::text_fingerprint(&self.key())
    }
}

/// Which attributes take part in a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRules {
    pub attributes: Vec<String>,
}

impl Default for SignatureRules {
    fn default() -> Self {
        SignatureRules {
            attributes: vec![
                "role".into(),
                "aria-label".into(),
                "data-pagelet".into(),
                "class".into(),
            ],
        }
    }
}

impl SignatureRules {
    pub fn with_attributes(attributes: &[&str]) -> Self {
        SignatureRules {
            attributes: attributes.iter().map(|a| a.to_ascii_lowercase()).collect(),
        }
    }
}
