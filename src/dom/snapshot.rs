use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dom::dom_model::{Document, NodeId};

/// Serialized element tree used to build host pages offline.
///
/// ```yaml
/// tag: div
/// attributes: { role: feed }
/// children:
///   - { tag: div, text: "Friend post" }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

fn default_tag() -> String {
    "div".to_string()
}

/// Top-level snapshot: either a full `body` node or a bare list of its children.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PageSnapshot {
    Body(NodeSnapshot),
    Children(Vec<NodeSnapshot>),
}

impl NodeSnapshot {
    pub fn new(tag: &str) -> Self {
        NodeSnapshot {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: NodeSnapshot) -> Self {
        self.children.push(child);
        self
    }

    /// Build a document from this node. A `body` node becomes the root itself.
    pub fn into_document(self) -> Document {
        PageSnapshot::Body(self).into_document()
    }
}

impl PageSnapshot {
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        match self {
            PageSnapshot::Body(body) if body.tag.eq_ignore_ascii_case("body") => {
                fill(&mut doc, root, &body);
            }
            PageSnapshot::Body(node) => {
                build_into(&mut doc, root, &node);
            }
            PageSnapshot::Children(children) => {
                for child in &children {
                    build_into(&mut doc, root, child);
                }
            }
        }
        // Construction is not a host mutation.
        doc.take_records();
        doc
    }
}

/// Append `snapshot` (and its subtree) under `parent`.
pub fn build_into(doc: &mut Document, parent: NodeId, snapshot: &NodeSnapshot) -> NodeId {
    let id = doc.create_element(&snapshot.tag);
    doc.append_child(parent, id);
    fill(doc, id, snapshot);
    id
}

fn fill(doc: &mut Document, id: NodeId, snapshot: &NodeSnapshot) {
    for (name, value) in &snapshot.attributes {
        doc.set_attribute(id, name, value);
    }
    if let Some(text) = &snapshot.text {
        doc.set_text(id, text);
    }
    for child in &snapshot.children {
        build_into(doc, id, child);
    }
}

/// Parse a snapshot from JSON or YAML text (YAML is a superset of JSON).
pub fn parse_snapshot(content: &str) -> Result<Document, serde_yaml::Error> {
    let snapshot: PageSnapshot = serde_yaml::from_str(content)?;
    Ok(snapshot.into_document())
}

pub fn load_snapshot(path: &Path) -> Result<Document, SnapshotError> {
    let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_snapshot(&content).map_err(|source| SnapshotError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse snapshot '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}
