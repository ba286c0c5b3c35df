//! DOM Tree (generational arena)
//!
//! Freed slots are recycled through a free list. Each slot's generation is
//! bumped on free, so stale `NodeId`s resolve to nothing instead of to the
//! node that reused the slot.

use crate::node::{ElementData, NodeData};
use crate::{
    DomError, DomResult, Generation, InternedString, Listener, Node, NodeId, StringInterner,
};

#[derive(Debug)]
struct Slot {
    generation: Generation,
    node: Option<Node>,
}

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    interner: StringInterner,
    root: NodeId,
    live: usize,
}

impl DomTree {
    /// Create a tree holding only a document node
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            interner: StringInterner::new(),
            root: NodeId::NONE,
            live: 0,
        };
        tree.root = tree.alloc(NodeData::Document);
        tree
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    /// Whether the handle refers to a live node
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    /// Resolve an interned name
    pub fn resolve(&self, id: InternedString) -> &str {
        self.interner.get(id)
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound)
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound)
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node::new(data);
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: Generation::INITIAL,
            node: Some(node),
        });
        NodeId::new(index, Generation::INITIAL)
    }

    fn free(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return;
        };
        if slot.generation != id.generation() || slot.node.take().is_none() {
            return;
        }
        slot.generation = slot.generation.next();
        self.free_list.push(id.index());
        self.live -= 1;
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let name = self.interner.intern(tag);
        self.alloc(NodeData::Element(ElementData::new(name)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(NodeData::Text(content.to_string()))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.alloc(NodeData::Comment(data.to_string()))
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Parent of a node, if attached
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Check whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while current.is_valid() {
            if current == ancestor {
                return true;
            }
            current = match self.get(current) {
                Some(n) => n.parent,
                None => return false,
            };
        }
        false
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if !self.node(parent)?.is_container() {
            return Err(DomError::InvalidNodeType);
        }
        if matches!(self.node(child)?.data, NodeData::Document) {
            return Err(DomError::HierarchyRequest);
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        Ok(())
    }

    /// Unlink a node from its parent. The node stays alive.
    pub fn detach(&mut self, child: NodeId) -> DomResult<()> {
        let (parent, prev, next) = {
            let n = self.node(child)?;
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        if !parent.is_valid() {
            return Ok(());
        }

        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = next;
        } else {
            self.node_mut(parent)?.first_child = next;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = prev;
        } else {
            self.node_mut(parent)?.last_child = prev;
        }

        let n = self.node_mut(child)?;
        n.parent = NodeId::NONE;
        n.prev_sibling = NodeId::NONE;
        n.next_sibling = NodeId::NONE;
        Ok(())
    }

    /// Link an already detached node between `prev` and `next` under `parent`
    fn link(&mut self, parent: NodeId, child: NodeId, prev: NodeId, next: NodeId) -> DomResult<()> {
        {
            let c = self.node_mut(child)?;
            c.parent = parent;
            c.prev_sibling = prev;
            c.next_sibling = next;
        }
        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = child;
        } else {
            self.node_mut(parent)?.first_child = child;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = child;
        } else {
            self.node_mut(parent)?.last_child = child;
        }
        Ok(())
    }

    /// Append a child, moving it from its current parent if needed
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check_insertion(parent, child)?;
        self.detach(child)?;
        let last = self.node(parent)?.last_child;
        self.link(parent, child, last, NodeId::NONE)
    }

    /// Insert `child` before `reference`, or append when `reference` is `None`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let Some(reference) = reference else {
            return self.append_child(parent, child);
        };
        if self.node(reference)?.parent != parent {
            return Err(DomError::NotAChild);
        }
        if reference == child {
            return Ok(());
        }
        self.check_insertion(parent, child)?;
        self.detach(child)?;
        let prev = self.node(reference)?.prev_sibling;
        self.link(parent, child, prev, reference)
    }

    /// Put `new` in the place `old` occupies and detach `old`.
    ///
    /// A detached `old` leaves both nodes where they are.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> DomResult<()> {
        let parent = self.node(old)?.parent;
        self.node(new)?;
        if old == new || !parent.is_valid() {
            return Ok(());
        }
        self.insert_before(parent, new, Some(old))?;
        self.detach(old)
    }

    /// Detach a node and free it together with its whole subtree
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        if id == self.root {
            return Err(DomError::HierarchyRequest);
        }
        self.detach(id)?;
        self.free_subtree(id);
        Ok(())
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let mut child = match self.get(current) {
                Some(n) => n.first_child,
                None => continue,
            };
            while child.is_valid() {
                stack.push(child);
                child = self.get(child).map_or(NodeId::NONE, |n| n.next_sibling);
            }
            self.free(current);
        }
    }

    /// Remove and free every child of a node
    pub fn clear_children(&mut self, parent: NodeId) -> DomResult<()> {
        loop {
            let first = self.node(parent)?.first_child;
            if !first.is_valid() {
                return Ok(());
            }
            self.remove(first)?;
        }
    }

    /// Iterate over children
    pub fn children(&self, parent: NodeId) -> ChildIter<'_> {
        let first = self.get(parent).map_or(NodeId::NONE, |n| n.first_child);
        ChildIter {
            tree: self,
            current: first,
        }
    }

    /// Element children in document order
    pub fn element_children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent)
            .filter(|(_, node)| node.is_element())
            .map(|(id, _)| id)
    }

    // ------------------------------------------------------------------
    // Element data
    // ------------------------------------------------------------------

    /// Tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        let elem = self.get(id)?.as_element()?;
        Some(self.interner.get(elem.name))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let name = self.interner.lookup(name)?;
        self.get(id)?.as_element()?.get_attr(name)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let name = self.interner.intern(name);
        self.node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?
            .set_attr(name, value);
        Ok(())
    }

    /// Remove an attribute; removing an absent attribute is not an error
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        let name = self.interner.lookup(name);
        let elem = self
            .node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        if let Some(name) = name {
            elem.remove_attr(name);
        }
        Ok(())
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Comment(_) => {}
            NodeData::Document | NodeData::Element(_) => {
                for (child, _) in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Set text content.
    ///
    /// On elements this frees every child and, for non-empty text, appends a
    /// single text node. On text and comment nodes it overwrites the data.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                t.clear();
                t.push_str(text);
                return Ok(());
            }
            NodeData::Document | NodeData::Element(_) => {}
        }
        self.clear_children(id)?;
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Install a listener, replacing any previous one for the same event
    pub fn set_event_listener(&mut self, id: NodeId, event: &str, listener: Listener) -> DomResult<()> {
        let event = self.interner.intern(event);
        self.node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?
            .set_listener(event, listener);
        Ok(())
    }

    pub fn remove_event_listener(&mut self, id: NodeId, event: &str) -> DomResult<bool> {
        let event = self.interner.lookup(event);
        let elem = self
            .node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        Ok(match event {
            Some(event) => elem.remove_listener(event),
            None => false,
        })
    }

    /// Clone out the listener for an event
    pub fn event_listener(&self, id: NodeId, event: &str) -> Option<Listener> {
        let event = self.interner.lookup(event)?;
        self.get(id)?.as_element()?.listener(event).cloned()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node
pub struct ChildIter<'a> {
    tree: &'a DomTree,
    current: NodeId,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.current.is_valid() {
            return None;
        }
        let id = self.current;
        let node = self.tree.get(id)?;
        self.current = node.next_sibling;
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_ids(tree: &DomTree, parent: NodeId) -> Vec<NodeId> {
        tree.children(parent).map(|(id, _)| id).collect()
    }

    #[test]
    fn test_append_and_iterate() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let a = tree.create_element("div");
        let b = tree.create_text("hi");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();

        assert_eq!(child_ids(&tree, root), vec![a, b]);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_insert_before() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let a = tree.create_element("a");
        let c = tree.create_element("c");
        let b = tree.create_element("b");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, c).unwrap();
        tree.insert_before(root, b, Some(c)).unwrap();
        assert_eq!(child_ids(&tree, root), vec![a, b, c]);

        let d = tree.create_element("d");
        tree.insert_before(root, d, Some(a)).unwrap();
        assert_eq!(child_ids(&tree, root), vec![d, a, b, c]);
    }

    #[test]
    fn test_insert_before_wrong_parent() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let outer = tree.create_element("div");
        let inner = tree.create_element("span");
        let other = tree.create_element("p");
        tree.append_child(root, outer).unwrap();
        tree.append_child(outer, inner).unwrap();
        assert_eq!(
            tree.insert_before(root, other, Some(inner)),
            Err(DomError::NotAChild)
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = DomTree::new();
        let a = tree.create_element("div");
        let b = tree.create_element("div");
        tree.append_child(a, b).unwrap();
        assert_eq!(tree.append_child(b, a), Err(DomError::HierarchyRequest));
        assert_eq!(tree.append_child(a, a), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_text_cannot_have_children() {
        let mut tree = DomTree::new();
        let t = tree.create_text("x");
        let e = tree.create_element("b");
        assert_eq!(tree.append_child(t, e), Err(DomError::InvalidNodeType));
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        for n in [a, b, c] {
            tree.append_child(root, n).unwrap();
        }
        let x = tree.create_element("x");
        tree.replace_with(b, x).unwrap();

        assert_eq!(child_ids(&tree, root), vec![a, x, c]);
        assert!(tree.contains(b));
        assert_eq!(tree.parent(b), None);
    }

    #[test]
    fn test_replace_with_detached_is_noop() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.replace_with(a, b).unwrap();
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.parent(b), None);
    }

    #[test]
    fn test_remove_frees_subtree() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let outer = tree.create_element("div");
        let inner = tree.create_element("span");
        let text = tree.create_text("deep");
        tree.append_child(root, outer).unwrap();
        tree.append_child(outer, inner).unwrap();
        tree.append_child(inner, text).unwrap();

        tree.remove(outer).unwrap();
        assert!(!tree.contains(outer));
        assert!(!tree.contains(inner));
        assert!(!tree.contains(text));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.remove(outer), Err(DomError::NotFound));
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        tree.remove(a).unwrap();
        let b = tree.create_element("b");
        assert_eq!(a.index(), b.index());
        assert!(!tree.contains(a));
        assert_eq!(tree.tag_name(b), Some("b"));
        assert_eq!(tree.tag_name(a), None);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut tree = DomTree::new();
        let root = tree.root();
        assert_eq!(tree.remove(root), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_attributes() {
        let mut tree = DomTree::new();
        let e = tree.create_element("div");
        tree.set_attribute(e, "id", "main").unwrap();
        assert_eq!(tree.attribute(e, "id"), Some("main"));
        tree.remove_attribute(e, "id").unwrap();
        assert_eq!(tree.attribute(e, "id"), None);
        tree.remove_attribute(e, "never-set").unwrap();

        let t = tree.create_text("x");
        assert_eq!(tree.set_attribute(t, "id", "a"), Err(DomError::InvalidNodeType));
    }

    #[test]
    fn test_set_text_content_replaces_children() {
        let mut tree = DomTree::new();
        let e = tree.create_element("p");
        let child = tree.create_element("b");
        tree.append_child(e, child).unwrap();

        tree.set_text_content(e, "Hello").unwrap();
        assert!(!tree.contains(child));
        assert_eq!(tree.text_content(e), "Hello");
        assert_eq!(tree.children(e).count(), 1);

        tree.set_text_content(e, "").unwrap();
        assert_eq!(tree.children(e).count(), 0);
    }

    #[test]
    fn test_text_content_skips_comments() {
        let mut tree = DomTree::new();
        let e = tree.create_element("p");
        let a = tree.create_text("a");
        let c = tree.create_comment("ignored");
        let b = tree.create_text("b");
        for n in [a, c, b] {
            tree.append_child(e, n).unwrap();
        }
        assert_eq!(tree.text_content(e), "ab");
    }

    #[test]
    fn test_listener_replacement() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut tree = DomTree::new();
        let e = tree.create_element("button");
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        tree.set_event_listener(e, "click", Rc::new(move |_| h.set(h.get() + 1))).unwrap();
        let h = hits.clone();
        tree.set_event_listener(e, "click", Rc::new(move |_| h.set(h.get() + 10))).unwrap();

        let listener = tree.event_listener(e, "click").unwrap();
        listener(&crate::DomEvent::new("click", e));
        assert_eq!(hits.get(), 10);

        assert_eq!(tree.remove_event_listener(e, "click"), Ok(true));
        assert!(tree.event_listener(e, "click").is_none());
    }
}
