//! The slice of a page's DOM that indicator mounting needs, and an in-memory
//! tree implementing it.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

pub trait Document {
    /// Elements attached to the document whose attribute `name` equals `value`,
    /// in document order.
    fn query_attribute(&self, name: &str, value: &str) -> Vec<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn text_content(&self, node: NodeId) -> String;

    fn next_element_sibling(&self, node: NodeId) -> Option<NodeId>;

    fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId>;

    fn create_element(&mut self, tag: &str, attributes: &[(&str, &str)]) -> NodeId;

    /// Moves `node` to sit immediately before `reference`.
    fn insert_before(&mut self, node: NodeId, reference: NodeId);

    fn remove(&mut self, node: NodeId);

    fn set_text_content(&mut self, node: NodeId, text: &str);
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed element tree rooted at a `body` element. Removed nodes stay in
/// the arena, detached.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Element>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            nodes: vec![Element::new("body")],
        }
    }

    pub fn body(&self) -> NodeId {
        NodeId(0)
    }

    pub fn append(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let node = self.create_element(tag, attributes);
        self.nodes[node.0].text = text.to_string();
        self.attach(node, parent, None);
        node
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.body() {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }

    fn attach(&mut self, node: NodeId, parent: NodeId, index: Option<usize>) {
        self.detach(node);
        let siblings = &mut self.nodes[parent.0].children;
        match index {
            Some(index) => siblings.insert(index, node),
            None => siblings.push(node),
        }
        self.nodes[node.0].parent = Some(parent);
    }

    fn sibling(&self, node: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let siblings = &self.nodes[parent.0].children;
        let index = siblings.iter().position(|child| *child == node)?;
        let target = index.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    fn collect(&self, node: NodeId, name: &str, value: &str, found: &mut Vec<NodeId>) {
        for &child in &self.nodes[node.0].children {
            if self.nodes[child.0].attributes.get(name).is_some_and(|v| v == value) {
                found.push(child);
            }
            self.collect(child, name, value, found);
        }
    }
}

impl Document for MemoryDocument {
    fn query_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect(self.body(), name, value, &mut found);
        found
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes[node.0].attributes.get(name).cloned()
    }

    fn text_content(&self, node: NodeId) -> String {
        let element = &self.nodes[node.0];
        let mut text = element.text.clone();
        for &child in &element.children {
            text.push_str(&self.text_content(child));
        }
        text
    }

    fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, 1)
    }

    fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, -1)
    }

    fn create_element(&mut self, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut element = Element::new(tag);
        for (name, value) in attributes {
            element
                .attributes
                .insert((*name).to_string(), (*value).to_string());
        }
        self.nodes.push(element);
        NodeId(self.nodes.len() - 1)
    }

    fn insert_before(&mut self, node: NodeId, reference: NodeId) {
        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        self.detach(node);
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|child| *child == reference);
        self.attach(node, parent, index);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.nodes[node.0].text = text.to_string();
    }
}
