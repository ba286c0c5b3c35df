//! Document - shared handle to the host tree
//!
//! A `Document` is cheap to clone; every clone points at the same
//! `DomTree`. Borrows are kept short so listener code can reach back into
//! the document while an event is being dispatched.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::{DomEvent, DomTree, NodeId};

/// Shared host document
#[derive(Clone)]
pub struct Document {
    tree: Rc<RefCell<DomTree>>,
}

impl Document {
    /// Create a document whose root holds a `<body>` element
    pub fn new() -> Self {
        Self::with_body_tag("body")
    }

    /// Create a document whose root holds a single element with the given tag
    pub fn with_body_tag(tag: &str) -> Self {
        let mut tree = DomTree::new();
        let body = tree.create_element(tag);
        if let Err(e) = tree.append_child(tree.root(), body) {
            tracing::warn!("Failed to attach <{}> to document root: {}", tag, e);
        }
        Self {
            tree: Rc::new(RefCell::new(tree)),
        }
    }

    /// Create a document with nothing below the document node
    pub fn empty() -> Self {
        Self {
            tree: Rc::new(RefCell::new(DomTree::new())),
        }
    }

    /// Borrow the tree
    pub fn tree(&self) -> Ref<'_, DomTree> {
        self.tree.borrow()
    }

    /// Borrow the tree mutably
    pub fn tree_mut(&self) -> RefMut<'_, DomTree> {
        self.tree.borrow_mut()
    }

    /// Borrow the tree mutably unless it is already borrowed
    pub fn try_tree_mut(&self) -> Option<RefMut<'_, DomTree>> {
        self.tree.try_borrow_mut().ok()
    }

    /// Whether two handles share one tree
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree)
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        self.tree().root()
    }

    /// First element child of the document node, or `NodeId::NONE`
    pub fn body(&self) -> NodeId {
        let tree = self.tree();
        let body = tree.element_children(tree.root()).next();
        body.unwrap_or(NodeId::NONE)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree().contains(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree().parent(id)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.tree().tag_name(id).map(str::to_string)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.tree().attribute(id, name).map(str::to_string)
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.tree().text_content(id)
    }

    /// All children, including text and comment nodes
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree().children(id).map(|(child, _)| child).collect()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree().element_children(id).collect()
    }

    /// Find the first element (in document order) with a matching `id` attribute
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let tree = self.tree();
        let mut stack = vec![tree.root()];
        while let Some(current) = stack.pop() {
            if tree.attribute(current, "id") == Some(id) {
                return Some(current);
            }
            let children: Vec<NodeId> = tree.children(current).map(|(c, _)| c).collect();
            stack.extend(children.into_iter().rev());
        }
        None
    }

    /// Dispatch an event to the listener installed on `target`.
    ///
    /// The listener is cloned out first so it runs with no borrow of the
    /// tree held. Returns whether a listener was found.
    pub fn dispatch_event(&self, event: &DomEvent) -> bool {
        let listener = self.tree().event_listener(event.target, &event.event_type);
        match listener {
            Some(listener) => {
                tracing::trace!("Dispatching '{}' to {:?}", event.event_type, event.target);
                listener(event);
                true
            }
            None => false,
        }
    }

    /// Dispatch a payload-free event
    pub fn dispatch(&self, target: NodeId, event_type: &str) -> bool {
        self.dispatch_event(&DomEvent::new(event_type, target))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree.try_borrow() {
            Ok(tree) => f
                .debug_struct("Document")
                .field("nodes", &tree.len())
                .finish(),
            Err(_) => f.debug_struct("Document").finish_non_exhaustive(),
        }
    }
}
