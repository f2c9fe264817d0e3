//! Arena-allocated document tree.
//!
//! Used both for parsed source documents and for the MobiML output tree.
//! Nodes live in one vector and link to each other by index, so moving a
//! subtree between parents only rewires a handful of links.

use std::collections::HashMap;

use html5ever::{LocalName, Namespace, QualName, ns};

/// Index of a node in an [`ArenaDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for a missing link.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }

    fn to_option(self) -> Option<NodeId> {
        self.is_some().then_some(self)
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Cached `id` attribute for selector matching.
        id: Option<String>,
        /// Cached `class` tokens for selector matching.
        classes: Vec<String>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// An attribute in no namespace.
    pub fn new(local: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(local)),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena-based document tree.
#[derive(Debug, Clone)]
pub struct ArenaDom {
    nodes: Vec<Node>,
    document: NodeId,
    id_map: HashMap<String, NodeId>,
}

impl ArenaDom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
            id_map: HashMap::new(),
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let mut id = None;
        let mut classes = Vec::new();
        for attr in &attrs {
            match attr.name.local.as_ref() {
                "id" => id = Some(attr.value.clone()),
                "class" => classes = split_classes(&attr.value),
                _ => {}
            }
        }

        let node_id = self.alloc(Node::new(NodeData::Element {
            name,
            attrs,
            id: id.clone(),
            classes,
        }));
        if let Some(id) = id {
            self.id_map.entry(id).or_insert(node_id);
        }
        node_id
    }

    /// Create an XHTML element with no attributes.
    pub fn create_html_element(&mut self, local: &str) -> NodeId {
        self.create_element(QualName::new(None, ns!(html), LocalName::from(local)), vec![])
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text)))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype {
            name,
            public_id,
            system_id,
        }))
    }

    /// Append `child` as the last child of `parent`, detaching it first if
    /// it is already in the tree.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last;
        }
        if let Some(node) = self.get_mut(last) {
            node.next_sibling = child;
        }
        if let Some(node) = self.get_mut(parent) {
            if node.first_child.is_none() {
                node.first_child = child;
            }
            node.last_child = child;
        }
    }

    /// Insert `new_node` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        self.detach(new_node);
        let Some((parent, prev)) = self.get(sibling).map(|n| (n.parent, n.prev_sibling)) else {
            return;
        };

        if let Some(node) = self.get_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = sibling;
        }
        if let Some(node) = self.get_mut(sibling) {
            node.prev_sibling = new_node;
        }
        if prev.is_some() {
            if let Some(node) = self.get_mut(prev) {
                node.next_sibling = new_node;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.first_child = new_node;
        }
    }

    /// Unlink a node from its parent and siblings. Its own subtree stays
    /// attached to it.
    pub fn detach(&mut self, id: NodeId) {
        let Some((parent, prev, next)) = self
            .get(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        if let Some(node) = self.get_mut(prev) {
            node.next_sibling = next;
        } else if let Some(node) = self.get_mut(parent) {
            node.first_child = next;
        }
        if let Some(node) = self.get_mut(next) {
            node.prev_sibling = prev;
        } else if let Some(node) = self.get_mut(parent) {
            node.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Put `new_node` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new_node: NodeId) {
        if self.parent(old).is_none() {
            return;
        }
        self.insert_before(old, new_node);
        self.detach(old);
    }

    /// Append text, merging into a trailing text node when there is one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);
        if let Some(Node {
            data: NodeData::Text(existing),
            ..
        }) = self.get_mut(last)
        {
            existing.push_str(text);
            return;
        }

        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let Some(Node {
            data: NodeData::Element {
                attrs,
                id: cached_id,
                classes,
                ..
            },
            ..
        }) = self.get_mut(id)
        else {
            return;
        };

        match name {
            "id" => *cached_id = Some(value.clone()),
            "class" => *classes = split_classes(&value),
            _ => {}
        }
        match attrs.iter_mut().find(|a| a.name.local.as_ref() == name) {
            Some(attr) => attr.value = value.clone(),
            None => attrs.push(Attribute::new(name, value.clone())),
        }
        if name == "id" {
            self.id_map.entry(value).or_insert(id);
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<NodeId> {
        self.id_map.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the document node exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.to_option())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.to_option())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.to_option())
    }

    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        ChildrenIter {
            dom: self,
            current: self.get(parent).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Pre-order traversal of `root` and everything below it.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            dom: self,
            stack: vec![root],
        }
    }

    /// First element with the given local name, in document order.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.document)
            .find(|&id| self.element_name(id).is_some_and(|n| n.as_ref() == tag))
    }

    /// The root element of the document.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.document).find(|&id| self.is_element(id))
    }
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

fn split_classes(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

pub struct ChildrenIter<'a> {
    dom: &'a ArenaDom,
    current: NodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current.to_option()?;
        self.current = self.dom.get(id).map_or(NodeId::NONE, |n| n.next_sibling);
        Some(id)
    }
}

pub struct Descendants<'a> {
    dom: &'a ArenaDom,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(self.dom.children(id));
        self.stack[start..].reverse();
        Some(id)
    }
}

impl ArenaDom {
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    pub fn element_namespace(&self, id: NodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.as_str())
    }

    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { id, .. } => id.as_deref(),
            _ => None,
        })
    }

    pub fn element_classes(&self, id: NodeId) -> &[String] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Contents of a text node.
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of every text node below `id`.
    pub fn text_of(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|n| self.text_content(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> (ArenaDom, NodeId) {
        let mut dom = ArenaDom::new();
        let body = dom.create_html_element("body");
        let doc = dom.document();
        dom.append(doc, body);
        (dom, body)
    }

    #[test]
    fn test_create_elements() {
        let mut dom = ArenaDom::new();
        let div = dom.create_element(
            QualName::new(None, ns!(html), LocalName::from("div")),
            vec![Attribute::new("id", "main"), Attribute::new("class", "a b")],
        );
        let doc = dom.document();
        dom.append(doc, div);

        assert_eq!(dom.element_name(div).unwrap().as_ref(), "div");
        assert_eq!(dom.element_id(div), Some("main"));
        assert_eq!(dom.get_by_id("main"), Some(div));
        assert_eq!(dom.element_classes(div), ["a", "b"]);
        assert_eq!(dom.document_element(), Some(div));
    }

    #[test]
    fn test_append_and_insert_before() {
        let (mut dom, body) = build();
        let a = dom.create_html_element("p");
        let b = dom.create_html_element("p");
        let c = dom.create_html_element("hr");
        dom.append(body, a);
        dom.append(body, b);
        dom.insert_before(b, c);

        let children: Vec<_> = dom.children(body).collect();
        assert_eq!(children, [a, c, b]);
        assert_eq!(dom.parent(c), Some(body));
    }

    #[test]
    fn test_append_moves_between_parents() {
        let (mut dom, body) = build();
        let from = dom.create_html_element("p");
        let to = dom.create_html_element("small");
        dom.append(body, from);
        dom.append(body, to);
        dom.append_text(from, "moved");
        let text = dom.first_child(from).unwrap();

        dom.append(to, text);

        assert_eq!(dom.first_child(from), None);
        assert_eq!(dom.last_child(from), None);
        assert_eq!(dom.text_of(to), "moved");
    }

    #[test]
    fn test_detach_middle_child() {
        let (mut dom, body) = build();
        let ids: Vec<_> = (0..3)
            .map(|_| {
                let p = dom.create_html_element("p");
                dom.append(body, p);
                p
            })
            .collect();

        dom.detach(ids[1]);

        let children: Vec<_> = dom.children(body).collect();
        assert_eq!(children, [ids[0], ids[2]]);
        assert_eq!(dom.parent(ids[1]), None);
    }

    #[test]
    fn test_replace() {
        let (mut dom, body) = build();
        let p = dom.create_html_element("p");
        let tail = dom.create_html_element("p");
        dom.append(body, p);
        dom.append(body, tail);
        let br = dom.create_html_element("br");

        dom.replace(p, br);

        let children: Vec<_> = dom.children(body).collect();
        assert_eq!(children, [br, tail]);
    }

    #[test]
    fn test_set_attr_replaces_in_place() {
        let (mut dom, body) = build();
        dom.set_attr(body, "height", "0pt");
        dom.set_attr(body, "width", "0pt");
        dom.set_attr(body, "height", "1em");

        let attrs: Vec<_> = dom
            .attrs(body)
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.clone()))
            .collect();
        assert_eq!(
            attrs,
            [
                ("height".to_string(), "1em".to_string()),
                ("width".to_string(), "0pt".to_string())
            ]
        );
    }

    #[test]
    fn test_text_merging() {
        let (mut dom, body) = build();
        dom.append_text(body, "Hello, ");
        dom.append_text(body, "World!");

        let children: Vec<_> = dom.children(body).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(dom.text_content(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_clone_is_independent() {
        let (mut dom, body) = build();
        dom.append_text(body, "original");
        let copy = dom.clone();

        dom.append_text(body, " changed");

        assert_eq!(copy.text_of(body), "original");
        assert_eq!(dom.text_of(body), "original changed");
    }

    #[test]
    fn test_descendants_preorder() {
        let (mut dom, body) = build();
        let p = dom.create_html_element("p");
        let b = dom.create_html_element("b");
        let hr = dom.create_html_element("hr");
        dom.append(body, p);
        dom.append(p, b);
        dom.append(body, hr);

        let order: Vec<_> = dom.descendants(body).collect();
        assert_eq!(order, [body, p, b, hr]);
        assert_eq!(dom.find_by_tag("hr"), Some(hr));
    }
}
