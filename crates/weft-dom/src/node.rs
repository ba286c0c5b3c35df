//! DOM Node
//!
//! Nodes link to their relatives through `NodeId`s instead of pointers, so
//! the whole tree lives in one arena and handles stay `Copy`.

use std::fmt;

use crate::{InternedString, Listener, NodeId};

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    /// Parent node (NONE if detached or root)
    pub parent: NodeId,
    /// First child
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    /// Previous sibling
    pub prev_sibling: NodeId,
    /// Next sibling
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    #[inline]
    pub fn is_comment(&self) -> bool {
        matches!(self.data, NodeData::Comment(_))
    }

    /// Whether this node may hold children
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.data, NodeData::Document | NodeData::Element(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment, used as an inert placeholder
    Comment(String),
}

/// Element-specific data
#[derive(Debug)]
pub struct ElementData {
    /// Tag name
    pub name: InternedString,
    /// Attributes in insertion order
    pub attrs: Vec<Attribute>,
    /// Event listeners, at most one per event name
    pub listeners: Vec<ListenerEntry>,
}

impl ElementData {
    pub fn new(name: InternedString) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: InternedString) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, overwriting an existing value
    pub fn set_attr(&mut self, name: InternedString, value: &str) {
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => {
                attr.value.clear();
                attr.value.push_str(value);
            }
            None => self.attrs.push(Attribute {
                name,
                value: value.to_string(),
            }),
        }
    }

    /// Remove an attribute, returning whether it was present
    pub fn remove_attr(&mut self, name: InternedString) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|a| a.name != name);
        self.attrs.len() != before
    }

    pub fn listener(&self, event: InternedString) -> Option<&Listener> {
        self.listeners
            .iter()
            .find(|l| l.event == event)
            .map(|l| &l.listener)
    }

    /// Install a listener, replacing any previous one for the same event
    pub fn set_listener(&mut self, event: InternedString, listener: Listener) {
        match self.listeners.iter_mut().find(|l| l.event == event) {
            Some(entry) => entry.listener = listener,
            None => self.listeners.push(ListenerEntry { event, listener }),
        }
    }

    pub fn remove_listener(&mut self, event: InternedString) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.event != event);
        self.listeners.len() != before
    }
}

/// Attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: InternedString,
    pub value: String,
}

/// Listener bound to an event name
pub struct ListenerEntry {
    pub event: InternedString,
    pub listener: Listener,
}

impl fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_overwrites() {
        let mut elem = ElementData::new(InternedString(3));
        elem.set_attr(InternedString(7), "a");
        elem.set_attr(InternedString(7), "b");
        assert_eq!(elem.attrs.len(), 1);
        assert_eq!(elem.get_attr(InternedString(7)), Some("b"));
    }

    #[test]
    fn test_remove_attr() {
        let mut elem = ElementData::new(InternedString(3));
        elem.set_attr(InternedString(7), "a");
        assert!(elem.remove_attr(InternedString(7)));
        assert!(!elem.remove_attr(InternedString(7)));
        assert_eq!(elem.get_attr(InternedString(7)), None);
    }

    #[test]
    fn test_node_kinds() {
        let text = Node::new(NodeData::Text("hi".into()));
        assert!(text.is_text());
        assert!(!text.is_container());
        assert_eq!(text.as_text(), Some("hi"));

        let comment = Node::new(NodeData::Comment(String::new()));
        assert!(comment.is_comment());
        assert!(Node::new(NodeData::Document).is_container());
    }
}
