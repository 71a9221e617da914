use std::collections::BTreeMap;

use crate::dom::selector::{SelectorError, SelectorList};

/// Index of an element inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub display: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Node {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: None,
            display: None,
            parent: None,
            children: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes { name: String },
    CharacterData,
    Style,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

/// Element tree standing in for the host page DOM.
///
/// Nodes are never freed: `remove` detaches a subtree, after which
/// [`Document::is_connected`] reports false for every node in it.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    pending: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            nodes: vec![Node::new("body")],
            root: NodeId(0),
            pending: vec![],
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Create a detached element. It becomes part of the page once appended.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        // Appending an ancestor under its own descendant would create a cycle.
        if self.ancestors(parent).any(|a| a == child) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.record(parent, MutationKind::ChildList);
    }

    /// Create an element and append it to `parent` in one step.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        if let Some(parent) = self.detach(id) {
            self.record(parent, MutationKind::ChildList);
        }
    }

    fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(id.0)?.parent?;
        self.nodes[parent.0].children.retain(|c| *c != id);
        self.nodes[id.0].parent = None;
        Some(parent)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        if node.attributes.get(&name).map(String::as_str) == Some(value) {
            return;
        }
        node.attributes.insert(name.clone(), value.to_string());
        self.record(id, MutationKind::Attributes { name });
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        let removed = self
            .nodes
            .get_mut(id.0)
            .and_then(|n| n.attributes.remove(&name))
            .is_some();
        if removed {
            self.record(id, MutationKind::Attributes { name });
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.text = Some(text.to_string());
            self.record(id, MutationKind::CharacterData);
        }
    }

    /// Set or clear the inline `display` style. This is the only property the
    /// engine ever writes on host content.
    pub fn set_display(&mut self, id: NodeId, display: Option<&str>) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        let next = display.map(str::to_string);
        if node.display == next {
            return;
        }
        node.display = next;
        self.record(id, MutationKind::Style);
    }

    pub fn display(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.display.as_deref())
    }

    pub fn is_display_none(&self, id: NodeId) -> bool {
        self.display(id) == Some("none")
    }

    pub fn tag(&self, id: NodeId) -> &str {
        self.node(id).map(|n| n.tag.as_str()).unwrap_or("")
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .and_then(|n| n.attributes.get(&name.to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attribute(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn element_children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// True while the node is attached to the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Own text plus all descendant text, whitespace-joined.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        self.collect_text(id, &mut parts);
        parts.join(" ")
    }

    fn collect_text<'a>(&'a self, id: NodeId, out: &mut Vec<&'a str>) {
        let Some(node) = self.node(id) else {
            return;
        };
        if let Some(text) = node.text.as_deref() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed);
            }
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    /// Connected elements below `root`, in document (pre-)order, excluding the root itself.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.element_children(root).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// All connected elements below the document root.
    pub fn elements(&self) -> Descendants<'_> {
        self.descendants(self.root)
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        Ok(self.elements().find(|id| list.matches(self, *id)))
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        Ok(self.elements().filter(|id| list.matches(self, *id)).collect())
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        if self.is_connected(target) {
            self.pending.push(MutationRecord { target, kind });
        }
    }

    /// Drain mutation records accumulated since the last call.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.element_children(id).iter().rev().copied());
        Some(id)
    }
}
