// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A read-only tree of a rendered host page.

use std::collections::HashMap;
use std::num::NonZeroU32;

use crate::Error;

mod parse;
mod writer;

pub(crate) const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub(crate) const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub(crate) const XML_NAMESPACE_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A page tree container.
///
/// Contains only element and text nodes. Unlike `roxmltree::Document`
/// it owns its data, so it can be shared between the page and the commands
/// that inspect it later.
pub struct Document {
    nodes: Vec<NodeData>,
    links: HashMap<String, NodeId>,
}

impl Document {
    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> Node {
        self.get(NodeId::new(0))
    }

    /// Returns the root element.
    #[inline]
    pub fn root_element(&self) -> Node {
        // `unwrap` is safe, because `Document` is guarantee to have at least one element.
        self.root().first_element_child().unwrap()
    }

    /// Returns a node by its ID.
    ///
    /// Returns `None` when `id` belongs to a larger document.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        let d = self.nodes.get(id.get_usize())?;
        Some(Node { id, d, doc: self })
    }

    /// Returns an iterator over document's descendant nodes.
    #[inline]
    pub fn descendants(&self) -> Descendants {
        self.root().descendants()
    }

    /// Returns an element by its `id` attribute.
    #[inline]
    pub fn element_by_id(&self, id: &str) -> Option<Node> {
        let node_id = self.links.get(id)?;
        Some(self.get(*node_id))
    }

    /// Returns all elements matching a CSS selector, in document order.
    pub fn select_all(&self, selector: &str) -> Result<Vec<Node>, Error> {
        let selector = parse_selector(selector)?;
        Ok(self
            .descendants()
            .filter(|n| n.is_element() && n.matches(&selector))
            .collect())
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> Node {
        Node {
            id,
            d: &self.nodes[id.get_usize()],
            doc: self,
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "Document {{ nodes: {} }}", self.nodes.len())
    }
}

/// Parses a CSS selector.
pub fn parse_selector(text: &str) -> Result<simplecss::Selector, Error> {
    simplecss::Selector::parse(text).ok_or_else(|| Error::InvalidSelector(text.to_string()))
}

/// A node identifier inside a [`Document`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[inline]
    fn new(id: u32) -> Self {
        debug_assert!(id < core::u32::MAX);

        // We are using `NonZeroU32` to reduce overhead of `Option<NodeId>`.
        NodeId(NonZeroU32::new(id + 1).unwrap())
    }

    #[inline]
    fn get(self) -> u32 {
        self.0.get() - 1
    }

    #[inline]
    fn get_usize(self) -> usize {
        self.get() as usize
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(id: usize) -> Self {
        // We already checked that `id` is limited by u32::MAX.
        debug_assert!(id <= core::u32::MAX as usize);
        NodeId::new(id as u32)
    }
}

pub(crate) enum NodeKind {
    Root,
    Element {
        namespace: Option<String>,
        tag_name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

struct NodeData {
    parent: Option<NodeId>,
    next_sibling: Option<NodeId>,
    children: Option<(NodeId, NodeId)>,
    kind: NodeKind,
}

/// An attribute.
#[derive(Clone, PartialEq, Debug)]
pub struct Attribute {
    /// Attribute's namespace URI.
    pub namespace: Option<String>,
    /// Attribute's local name.
    pub name: String,
    /// Attribute's value.
    pub value: String,
}

/// A page node.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    id: NodeId,
    doc: &'a Document,
    d: &'a NodeData,
}

impl Eq for Node<'_> {}

impl PartialEq for Node<'_> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.doc, other.doc)
    }
}

impl<'a> Node<'a> {
    /// Returns node's ID inside the document.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Checks if the current node is an element.
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.d.kind, NodeKind::Element { .. })
    }

    /// Checks if the current node is a text.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.d.kind, NodeKind::Text(_))
    }

    /// Returns element's local tag name, unless the current node is text.
    #[inline]
    pub fn tag_name(&self) -> Option<&'a str> {
        match self.d.kind {
            NodeKind::Element { ref tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    /// Returns element's namespace URI.
    #[inline]
    pub fn namespace(&self) -> Option<&'a str> {
        match self.d.kind {
            NodeKind::Element { ref namespace, .. } => namespace.as_deref(),
            _ => None,
        }
    }

    /// Checks the local tag name.
    ///
    /// Case-insensitive, like HTML tag names are.
    #[inline]
    pub fn has_tag_name(&self, name: &str) -> bool {
        self.tag_name()
            .map(|n| n.eq_ignore_ascii_case(name))
            .unwrap_or(false)
    }

    /// Returns a list of all element's attributes.
    #[inline]
    pub fn attributes(&self) -> &'a [Attribute] {
        match self.d.kind {
            NodeKind::Element { ref attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns a value of an attribute without a namespace.
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns element's `id` attribute value.
    ///
    /// Returns an empty string otherwise.
    #[inline]
    pub fn element_id(&self) -> &'a str {
        self.attribute("id").unwrap_or("")
    }

    /// Returns node's text data.
    ///
    /// For text nodes returns its content. For elements returns the first child node text.
    #[inline]
    pub fn text(&self) -> &'a str {
        match self.d.kind {
            NodeKind::Element { .. } => match self.first_child() {
                Some(child) if child.is_text() => child.text(),
                _ => "",
            },
            NodeKind::Text(ref text) => text,
            _ => "",
        }
    }

    /// Returns a parent node.
    #[inline]
    pub fn parent(&self) -> Option<Self> {
        self.d.parent.map(|id| self.doc.get(id))
    }

    /// Returns the parent element.
    #[inline]
    pub fn parent_element(&self) -> Option<Self> {
        self.ancestors().skip(1).find(|n| n.is_element())
    }

    /// Returns the previous sibling element.
    pub fn prev_sibling_element(&self) -> Option<Self> {
        let parent = self.parent()?;
        let mut prev = None;
        for child in parent.children() {
            if child == *self {
                return prev;
            }

            if child.is_element() {
                prev = Some(child);
            }
        }

        None
    }

    /// Returns the next sibling.
    #[inline]
    pub fn next_sibling(&self) -> Option<Self> {
        self.d.next_sibling.map(|id| self.doc.get(id))
    }

    /// Returns the first child.
    #[inline]
    pub fn first_child(&self) -> Option<Self> {
        self.d.children.map(|(id, _)| self.doc.get(id))
    }

    /// Returns the first child element.
    #[inline]
    pub fn first_element_child(&self) -> Option<Self> {
        self.children().find(|n| n.is_element())
    }

    /// Returns the last child.
    #[inline]
    pub fn last_child(&self) -> Option<Self> {
        self.d.children.map(|(_, id)| self.doc.get(id))
    }

    /// Returns an iterator over ancestor nodes starting at this node.
    #[inline]
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors(Some(*self))
    }

    /// Returns an iterator over children nodes.
    #[inline]
    pub fn children(&self) -> Children<'a> {
        Children {
            front: self.first_child(),
            back: self.last_child(),
        }
    }

    #[inline]
    fn traverse(&self) -> Traverse<'a> {
        Traverse {
            root: *self,
            edge: None,
        }
    }

    /// Returns an iterator over this node and its descendants.
    #[inline]
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants(self.traverse())
    }

    /// Checks that the current element matches a selector.
    #[inline]
    pub fn matches(&self, selector: &simplecss::Selector) -> bool {
        self.is_element() && selector.matches(self)
    }

    /// Returns the closest element, starting at this one, that matches a selector.
    pub fn closest(&self, selector: &simplecss::Selector) -> Option<Self> {
        self.ancestors().find(|n| n.matches(selector))
    }

    /// Returns the first descendant element, not including this one, that matches a selector.
    pub fn query_selector(&self, selector: &simplecss::Selector) -> Option<Self> {
        self.descendants().skip(1).find(|n| n.matches(selector))
    }

    /// Serializes this node and its descendants.
    ///
    /// An `svg` root always gets an SVG namespace declaration,
    /// so the result can be loaded as a standalone image.
    pub fn to_markup(&self) -> String {
        writer::serialize(*self)
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self.d.kind {
            NodeKind::Root => write!(f, "Root"),
            NodeKind::Element {
                ref tag_name,
                ref attributes,
                ..
            } => {
                write!(
                    f,
                    "Element {{ tag_name: {:?}, attributes: {:?} }}",
                    tag_name, attributes
                )
            }
            NodeKind::Text(ref text) => write!(f, "Text({:?})", text),
        }
    }
}

impl simplecss::Element for Node<'_> {
    fn parent_element(&self) -> Option<Self> {
        Node::parent_element(self)
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        Node::prev_sibling_element(self)
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.has_tag_name(local_name)
    }

    fn attribute_matches(&self, local_name: &str, operator: simplecss::AttributeOperator) -> bool {
        match self.attribute(local_name) {
            Some(value) => operator.matches(value),
            None => false,
        }
    }

    fn pseudo_class_matches(&self, class: simplecss::PseudoClass) -> bool {
        match class {
            simplecss::PseudoClass::FirstChild => self.prev_sibling_element().is_none(),
            // A static page has no hover, focus or link state.
            _ => false,
        }
    }
}

/// An iterator over ancestor nodes.
#[derive(Clone, Debug)]
pub struct Ancestors<'a>(Option<Node<'a>>);

impl<'a> Iterator for Ancestors<'a> {
    type Item = Node<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.0.take();
        self.0 = node.as_ref().and_then(Node::parent);
        node
    }
}

/// An iterator over children nodes.
#[derive(Clone, Debug)]
pub struct Children<'a> {
    front: Option<Node<'a>>,
    back: Option<Node<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.front.take();
        if self.front == self.back {
            self.back = None;
        } else {
            self.front = node.as_ref().and_then(Node::next_sibling);
        }
        node
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Edge<'a> {
    Open(Node<'a>),
    Close(Node<'a>),
}

#[derive(Clone, Debug)]
struct Traverse<'a> {
    root: Node<'a>,
    edge: Option<Edge<'a>>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Edge<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.edge {
            Some(Edge::Open(node)) => {
                self.edge = Some(match node.first_child() {
                    Some(first_child) => Edge::Open(first_child),
                    None => Edge::Close(node),
                });
            }
            Some(Edge::Close(node)) => {
                if node == self.root {
                    self.edge = None;
                } else if let Some(next_sibling) = node.next_sibling() {
                    self.edge = Some(Edge::Open(next_sibling));
                } else {
                    self.edge = node.parent().map(Edge::Close);
                }
            }
            None => {
                self.edge = Some(Edge::Open(self.root));
            }
        }

        self.edge
    }
}

/// A descendants iterator.
#[derive(Clone, Debug)]
pub struct Descendants<'a>(Traverse<'a>);

impl<'a> Iterator for Descendants<'a> {
    type Item = Node<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for edge in &mut self.0 {
            if let Edge::Open(node) = edge {
                return Some(node);
            }
        }

        None
    }
}
