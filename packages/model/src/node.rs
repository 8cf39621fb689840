//! # Node tree
//!
//! A document is a tree of [`Node`]s. Elements own an ordered list of
//! children; texts are leaves carrying a string and formatting properties.
//!
//! Children are stored behind `Arc` so that a new version of the tree can
//! share every subtree an edit did not touch. Use [`node_mut`] to get a
//! mutable handle on a node: it clones only the nodes along the path that are
//! shared with another snapshot.

use crate::iter::{Nodes, NodesOptions};
use crate::path::Path;
use crate::text::utf16_len;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Arbitrary typed properties of a node (formatting, element type, ...)
pub type Properties = serde_json::Map<String, Value>;

/// Property keys that belong to the tree structure itself
pub const RESERVED_KEYS: [&str; 2] = ["children", "text"];

/// Property used by schemas to tell elements apart
pub const TYPE_KEY: &str = "type";

/// Element or text node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

/// Node with ordered children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub children: Vec<Arc<Node>>,
    #[serde(flatten)]
    pub properties: Properties,
}

/// Leaf node carrying text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(flatten)]
    pub properties: Properties,
}

/// Which of the two node kinds a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Element,
    Text,
}

impl Element {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children: children.into_iter().map(Arc::new).collect(),
            properties: Properties::new(),
        }
    }

    /// Element with a `type` property
    pub fn typed(element_type: impl Into<String>, children: Vec<Node>) -> Self {
        Self::new(children).with_property(TYPE_KEY, Value::String(element_type.into()))
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn element_type(&self) -> Option<&str> {
        self.properties.get(TYPE_KEY).and_then(Value::as_str)
    }
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Length in UTF-16 code units
    pub fn len_utf16(&self) -> usize {
        utf16_len(&self.text)
    }

    /// Same formatting, regardless of content
    pub fn loose_eq(&self, other: &Text) -> bool {
        self.properties == other.properties
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

impl Node {
    pub fn element(children: Vec<Node>) -> Self {
        Node::Element(Element::new(children))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Element(_) => NodeKind::Element,
            Node::Text(_) => NodeKind::Text,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Node::Element(element) => &element.properties,
            Node::Text(text) => &text.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            Node::Element(element) => &mut element.properties,
            Node::Text(text) => &mut text.properties,
        }
    }

    /// Children of an element; empty for text
    pub fn children(&self) -> &[Arc<Node>] {
        match self {
            Node::Element(element) => &element.children,
            Node::Text(_) => &[],
        }
    }

    /// Size used by split/merge positions: UTF-16 length for text, child
    /// count for elements
    pub fn content_len(&self) -> usize {
        match self {
            Node::Element(element) => element.children.len(),
            Node::Text(text) => text.len_utf16(),
        }
    }

    pub fn element_type(&self) -> Option<&str> {
        self.as_element().and_then(Element::element_type)
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children().get(index).map(Arc::as_ref)
    }

    /// Descendant at `path` (the node itself for the root path)
    pub fn get(&self, path: &Path) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &index| node.child(index))
    }

    pub fn has(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    pub fn parent(&self, path: &Path) -> Option<&Node> {
        self.get(&path.parent()?)
    }

    /// Text leaf at `path`
    pub fn leaf(&self, path: &Path) -> Option<&Text> {
        self.get(path).and_then(Node::as_text)
    }

    /// Concatenated text content
    pub fn string(&self) -> String {
        match self {
            Node::Text(text) => text.text.clone(),
            Node::Element(_) => self.texts().map(|(text, _)| text.text.as_str()).collect(),
        }
    }

    /// Deepest first descendant of the node at `path`
    pub fn first(&self, path: &Path) -> Option<(&Node, Path)> {
        let mut node = self.get(path)?;
        let mut at = path.clone();
        while let Some(child) = node.child(0) {
            node = child;
            at = at.child(0);
        }
        Some((node, at))
    }

    /// Deepest last descendant of the node at `path`
    pub fn last(&self, path: &Path) -> Option<(&Node, Path)> {
        let mut node = self.get(path)?;
        let mut at = path.clone();
        while let Some(index) = node.children().len().checked_sub(1) {
            node = node.child(index)?;
            at = at.child(index);
        }
        Some((node, at))
    }

    /// Path of the first text leaf at or below `path`
    pub fn first_text_path(&self, path: &Path) -> Option<Path> {
        let node = self.get(path)?;
        node.texts().next().map(|(_, rel)| path.concat(&rel))
    }

    /// Nodes from the root down to `path`, root first, excluding the target
    pub fn ancestors(&self, path: &Path) -> Vec<(&Node, Path)> {
        path.ancestors()
            .into_iter()
            .filter_map(|at| self.get(&at).map(|node| (node, at)))
            .collect()
    }

    /// Nodes from the root down to `path`, root first, including the target
    pub fn levels(&self, path: &Path) -> Vec<(&Node, Path)> {
        path.levels()
            .into_iter()
            .filter_map(|at| self.get(&at).map(|node| (node, at)))
            .collect()
    }

    /// Closest node that contains both paths
    pub fn common(&self, path: &Path, other: &Path) -> Option<(&Node, Path)> {
        let at = path.common(other);
        self.get(&at).map(|node| (node, at))
    }

    /// Lazy depth-first walk, see [`NodesOptions`]
    pub fn nodes<'a>(&'a self, options: NodesOptions<'a>) -> Nodes<'a> {
        Nodes::new(self, options)
    }

    /// Every node below this one (the node itself excluded)
    pub fn descendants(&self) -> impl Iterator<Item = (&Node, Path)> + '_ {
        self.nodes(NodesOptions::default())
            .filter(|(_, path)| !path.is_root())
    }

    pub fn texts(&self) -> impl Iterator<Item = (&Text, Path)> + '_ {
        self.nodes(NodesOptions::default())
            .filter_map(|(node, path)| node.as_text().map(|text| (text, path)))
    }

    pub fn elements(&self) -> impl Iterator<Item = (&Element, Path)> + '_ {
        self.nodes(NodesOptions::default())
            .filter_map(|(node, path)| node.as_element().map(|element| (element, path)))
    }
}

/// Mutable access to the node at `path`, copying shared nodes on the way
/// down. Only the spine from `root` to the target is ever cloned.
pub fn node_mut<'a>(root: &'a mut Arc<Node>, path: &Path) -> Option<&'a mut Node> {
    let mut node = Arc::make_mut(root);
    for &index in path.iter() {
        node = match node {
            Node::Element(element) => Arc::make_mut(element.children.get_mut(index)?),
            Node::Text(_) => return None,
        };
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Node {
        Node::element(vec![
            Element::typed("paragraph", vec![Node::text("one"), Node::text("two")]).into(),
            Element::typed("paragraph", vec![Node::text("three")]).into(),
        ])
    }

    #[test]
    fn test_get_and_leaf() {
        let root = sample();
        assert!(root.get(&Path::root()).is_some());
        assert_eq!(root.leaf(&Path::from([0, 1])).map(|t| t.text.as_str()), Some("two"));
        assert!(root.leaf(&Path::from([0])).is_none());
        assert!(!root.has(&Path::from([2])));
        assert!(!root.has(&Path::from([0, 0, 0])));
        assert_eq!(root.string(), "onetwothree");
    }

    #[test]
    fn test_first_and_last() {
        let root = sample();
        assert_eq!(root.first(&Path::root()).map(|(_, p)| p), Some(Path::from([0, 0])));
        assert_eq!(root.last(&Path::root()).map(|(_, p)| p), Some(Path::from([1, 0])));
        assert_eq!(root.first_text_path(&Path::from([1])), Some(Path::from([1, 0])));
    }

    #[test]
    fn test_serde_shape() {
        let node: Node = serde_json::from_value(json!({
            "type": "paragraph",
            "children": [{ "text": "hi", "bold": true }]
        }))
        .unwrap();

        let element = node.as_element().unwrap();
        assert_eq!(element.element_type(), Some("paragraph"));
        let text = node.child(0).and_then(Node::as_text).unwrap();
        assert_eq!(text.properties.get("bold"), Some(&json!(true)));

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["children"][0]["text"], json!("hi"));
    }

    #[test]
    fn test_node_mut_copies_only_spine() {
        let mut root = Arc::new(sample());
        let before = Arc::clone(&root);

        if let Some(Node::Text(text)) = node_mut(&mut root, &Path::from([0, 0])) {
            text.text.push('!');
        }

        assert_eq!(before.string(), "onetwothree");
        assert_eq!(root.string(), "one!twothree");
        // Untouched subtree is still shared between versions
        assert!(Arc::ptr_eq(&before.children()[1], &root.children()[1]));
        assert!(!Arc::ptr_eq(&before.children()[0], &root.children()[0]));
    }
}
