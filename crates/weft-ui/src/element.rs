//! Element nodes
//!
//! An [`Element`] owns one host node, its children and every binding that
//! writes to it. Events refer back to elements only through `Weak`
//! handles, so dropping an element is enough to retire its bindings.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use weft_dom::{Document, DomEvent, Listener, NodeId};
use weft_reactive::{Event, EventContext};

use crate::attribute::{AttrValue, AttributeName, AttributeSource, BindingSource, EventHandler};
use crate::binding::BindingHandle;
use crate::renderer::{self, Renderer};
use crate::{list, ElementDescriptor};

/// What happens to the host node when its element lets go of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyMode {
    /// Remove and free the node
    Remove,
    /// The node is borrowed; leave it where it is
    DoNotDestroy,
}

/// Live element bound to one host node
pub struct Element {
    document: Document,
    context: EventContext,
    handle: Cell<NodeId>,
    destroy_mode: Cell<DestroyMode>,
    children: RefCell<Vec<Rc<Element>>>,
    /// Attribute and list bindings; torn down on every replace
    bindings: RefCell<Vec<BindingHandle>>,
    /// Conditional re-render events; live as long as the element
    anchors: RefCell<Vec<BindingHandle>>,
    pub(crate) hosts_list: Cell<bool>,
    pub(crate) this: Weak<Element>,
}

impl Element {
    /// Wrap an existing host node
    pub fn from_handle(
        document: &Document,
        context: &EventContext,
        handle: NodeId,
        mode: DestroyMode,
    ) -> Rc<Self> {
        tracing::trace!("Element created for {:?}", handle);
        Rc::new_cyclic(|this| Self {
            document: document.clone(),
            context: context.clone(),
            handle: Cell::new(handle),
            destroy_mode: Cell::new(mode),
            children: RefCell::new(Vec::new()),
            bindings: RefCell::new(Vec::new()),
            anchors: RefCell::new(Vec::new()),
            hosts_list: Cell::new(false),
            this: this.clone(),
        })
    }

    /// Create a host element and apply a descriptor to it
    pub fn from_descriptor(
        document: &Document,
        context: &EventContext,
        descriptor: &ElementDescriptor,
    ) -> Rc<Self> {
        let handle = document.tree_mut().create_element(descriptor.tag());
        let element = Self::from_handle(document, context, handle, DestroyMode::Remove);
        element.setup(descriptor);
        element
    }

    #[inline]
    pub fn handle(&self) -> NodeId {
        self.handle.get()
    }

    #[inline]
    pub fn destroy_mode(&self) -> DestroyMode {
        self.destroy_mode.get()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// Whether the host node still exists
    pub fn is_alive(&self) -> bool {
        self.document.contains(self.handle())
    }

    pub fn tag_name(&self) -> Option<String> {
        self.document.tag_name(self.handle())
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.document.attribute(self.handle(), name)
    }

    pub fn text_content(&self) -> String {
        self.document.text_content(self.handle())
    }

    /// Number of registered attribute and list bindings
    pub fn binding_count(&self) -> usize {
        self.bindings.borrow().len()
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    fn setup(&self, descriptor: &ElementDescriptor) {
        for attribute in descriptor.attributes() {
            match &attribute.source {
                AttributeSource::Static(value) => self.write(&attribute.name, value),
                AttributeSource::Bound(source) => {
                    self.bind_attribute(attribute.name.clone(), Rc::clone(source));
                }
                AttributeSource::Listener(handler) => {
                    self.listen(&attribute.name.to_string(), Rc::clone(handler));
                }
            }
        }
        for child in descriptor.child_renderers() {
            self.append(child);
        }
    }

    fn unsetup(&self) {
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        for binding in &bindings {
            binding.unbind();
        }
        self.hosts_list.set(false);
    }

    /// Write a value to the host node
    pub(crate) fn write(&self, name: &AttributeName, value: &AttrValue) {
        let handle = self.handle();
        let result = {
            let mut tree = self.document.tree_mut();
            match (name, value) {
                (AttributeName::TextContent, value) => tree.set_text_content(handle, &value.to_text()),
                (AttributeName::Named(name), AttrValue::Text(text)) if !text.is_empty() => {
                    tree.set_attribute(handle, name, text)
                }
                (AttributeName::Named(name), AttrValue::Flag(true)) => tree.set_attribute(handle, name, ""),
                (AttributeName::Named(name), _) => tree.remove_attribute(handle, name),
            }
        };
        if let Err(e) = result {
            tracing::warn!("Failed to write {} on {:?}: {}", name, handle, e);
        }
    }

    /// Bind an attribute to a live source
    pub fn bind(&self, name: &str, source: impl BindingSource + 'static) -> BindingHandle {
        self.bind_attribute(AttributeName::from(name), Rc::new(source))
    }

    pub(crate) fn bind_attribute(
        &self,
        name: AttributeName,
        source: Rc<dyn BindingSource>,
    ) -> BindingHandle {
        assert!(
            self.is_alive(),
            "cannot bind `{}` on an element whose host node is gone",
            name
        );
        self.write(&name, &source.current());

        let target = self.this.clone();
        let alive = self.this.clone();
        let reader = Rc::clone(&source);
        let id = self.context.register_event(Event::with_liveness(
            move |_| match target.upgrade() {
                Some(element) => {
                    element.write(&name, &reader.current());
                    true
                }
                None => false,
            },
            move || alive.strong_count() > 0,
        ));

        let dependencies = source.dependencies();
        dependencies.attach_event(id);
        let binding = BindingHandle::new(self.context.clone(), id, dependencies);
        self.bindings.borrow_mut().push(binding.clone());
        binding
    }

    pub(crate) fn add_binding(&self, binding: BindingHandle) {
        self.bindings.borrow_mut().push(binding);
    }

    pub(crate) fn add_anchor(&self, anchor: BindingHandle) {
        self.anchors.borrow_mut().push(anchor);
    }

    /// Install a host listener that runs `handler` and then flushes
    pub fn listen(&self, event: &str, handler: EventHandler) {
        let context = self.context.clone();
        let listener: Listener = Rc::new(move |dom_event: &DomEvent| {
            handler(dom_event);
            context.execute_active_immediately();
        });
        let handle = self.handle();
        let result = self.document.tree_mut().set_event_listener(handle, event, listener);
        if let Err(e) = result {
            tracing::warn!("Failed to install `{}` listener on {:?}: {}", event, handle, e);
        }
    }

    // ========================================================================
    // Children
    // ========================================================================

    /// Append the output of a renderer
    pub fn append(&self, renderer: &Renderer) {
        match renderer {
            Renderer::Fragment(children) => {
                for child in children {
                    self.append(child);
                }
            }
            Renderer::List(list) => list::bind_list(self, list),
            other => {
                assert!(
                    !self.hosts_list.get(),
                    "cannot add children after a list renderer"
                );
                let child = renderer::build(&self.document, &self.context, other);
                self.attach_child(child, None);
            }
        }
    }

    /// Build a child and insert it at `index`
    pub fn insert(&self, index: usize, renderer: &Renderer) -> Rc<Element> {
        let child = renderer::build(&self.document, &self.context, &renderer.single_node());
        self.attach_child(Rc::clone(&child), Some(index));
        child
    }

    pub(crate) fn attach_child(&self, child: Rc<Element>, index: Option<usize>) {
        let mut children = self.children.borrow_mut();
        let index = index.unwrap_or(children.len());
        assert!(
            index <= children.len(),
            "child index {} out of range for {} children",
            index,
            children.len()
        );
        let reference = children.get(index).map(|c| c.handle());
        let result = self
            .document
            .tree_mut()
            .insert_before(self.handle(), child.handle(), reference);
        if let Err(e) = result {
            tracing::warn!("Failed to attach child {:?}: {}", child.handle(), e);
        }
        children.insert(index, child);
    }

    /// Remove the child at `index`
    pub fn erase(&self, index: usize) {
        let child = self.children.borrow_mut().remove(index);
        child.detach_host();
    }

    /// Remove the children in `range`
    pub fn erase_range(&self, range: Range<usize>) {
        let removed: Vec<Rc<Element>> = self.children.borrow_mut().drain(range).collect();
        for child in &removed {
            child.detach_host();
        }
    }

    pub fn clear_children(&self) {
        let removed = std::mem::take(&mut *self.children.borrow_mut());
        for child in &removed {
            child.detach_host();
        }
    }

    /// Rebuild the child at `index` from a renderer
    pub fn replace_child(&self, index: usize, renderer: &Renderer) -> Rc<Element> {
        let fresh = renderer::build(&self.document, &self.context, &renderer.single_node());
        let old = std::mem::replace(&mut self.children.borrow_mut()[index], Rc::clone(&fresh));
        if old.handle() == fresh.handle() {
            // both slot the same stable node
            old.disown();
        } else {
            let result = self.document.tree_mut().replace_with(old.handle(), fresh.handle());
            if let Err(e) = result {
                tracing::warn!("Failed to swap child {:?}: {}", old.handle(), e);
            }
        }
        drop(old);
        fresh
    }

    pub fn child(&self, index: usize) -> Option<Rc<Element>> {
        self.children.borrow().get(index).cloned()
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn children(&self) -> Vec<Rc<Element>> {
        self.children.borrow().clone()
    }

    // ========================================================================
    // Replacement
    // ========================================================================

    /// Rebuild this element in place from a renderer.
    ///
    /// Children and bindings are dropped and a new host node takes the old
    /// one's position. Conditional anchors survive.
    pub fn replace(&self, renderer: &Renderer) {
        let renderer = renderer.single_node();
        match &*renderer {
            Renderer::Stable(stable, content) => {
                let (target, previous) = stable.materialize(&self.document, &self.context, content);
                self.slot_for(&target);
                drop(previous);
            }
            other => {
                self.clear_children();
                self.unsetup();
                let handle = {
                    let mut tree = self.document.tree_mut();
                    match other {
                        Renderer::Element(descriptor) => tree.create_element(descriptor.tag()),
                        Renderer::Text(text) => tree.create_text(text),
                        _ => tree.create_comment(""),
                    }
                };
                self.swap_handle(handle, DestroyMode::Remove);
                if let Renderer::Element(descriptor) = other {
                    self.setup(descriptor);
                }
            }
        }
    }

    /// Take over the position of this element with `other`'s host node.
    ///
    /// `other` keeps ownership of its node.
    pub fn slot_for(&self, other: &Element) {
        self.clear_children();
        self.unsetup();
        self.swap_handle(other.handle(), DestroyMode::DoNotDestroy);
    }

    fn swap_handle(&self, handle: NodeId, mode: DestroyMode) {
        let old = self.handle.replace(handle);
        let old_mode = self.destroy_mode.replace(mode);
        if old == handle {
            return;
        }
        let mut tree = self.document.tree_mut();
        if let Err(e) = tree.replace_with(old, handle) {
            tracing::warn!("Failed to replace {:?} with {:?}: {}", old, handle, e);
        }
        if old_mode == DestroyMode::Remove {
            if let Err(e) = tree.remove(old) {
                tracing::trace!("Old node {:?} already gone: {}", old, e);
            }
        }
    }

    /// Take the host node off the page while the element may still be referenced
    fn detach_host(&self) {
        let handle = self.handle();
        if let Some(mut tree) = self.document.try_tree_mut() {
            if let Err(e) = tree.detach(handle) {
                tracing::trace!("Detaching {:?}: {}", handle, e);
            }
        }
    }

    /// Forget the host node without touching it
    fn disown(&self) {
        self.handle.set(NodeId::NONE);
    }
}

impl Drop for Element {
    fn drop(&mut self) {
        for anchor in self.anchors.get_mut().drain(..) {
            anchor.unbind();
        }
        for binding in self.bindings.get_mut().drain(..) {
            binding.unbind();
        }
        // Borrowed nodes must not be freed along with this subtree
        let children = std::mem::take(self.children.get_mut());
        for child in &children {
            if child.destroy_mode() == DestroyMode::DoNotDestroy {
                child.detach_host();
            }
        }
        drop(children);

        let handle = self.handle.get();
        if !handle.is_valid() || self.destroy_mode.get() == DestroyMode::DoNotDestroy {
            return;
        }
        let Some(mut tree) = self.document.try_tree_mut() else {
            tracing::warn!("Host tree busy, leaking node {:?}", handle);
            return;
        };
        if let Err(e) = tree.remove(handle) {
            tracing::trace!("Releasing {:?}: {}", handle, e);
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("handle", &self.handle.get())
            .field("destroy_mode", &self.destroy_mode.get())
            .field("children", &self.children.borrow().len())
            .field("bindings", &self.bindings.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::element as describe;
    use weft_reactive::Observed;

    fn setup() -> (Document, EventContext) {
        (Document::new(), EventContext::new())
    }

    fn mount(document: &Document, element: &Element) {
        let body = document.body();
        document
            .tree_mut()
            .append_child(body, element.handle())
            .unwrap();
    }

    #[test]
    fn test_static_attributes() {
        let (doc, ctx) = setup();
        let d = describe("input").attr("value", "x").attr("disabled", true).attr("hidden", false);
        let el = Element::from_descriptor(&doc, &ctx, &d);
        assert_eq!(el.attribute("value").as_deref(), Some("x"));
        assert_eq!(el.attribute("disabled").as_deref(), Some(""));
        assert_eq!(el.attribute("hidden"), None);
        assert_eq!(el.binding_count(), 0);
    }

    #[test]
    fn test_empty_string_removes_attribute() {
        let (doc, ctx) = setup();
        let title = Observed::new(&ctx, String::from("a"));
        let el = Element::from_descriptor(&doc, &ctx, &describe("div").attr("title", &title));
        assert_eq!(el.attribute("title").as_deref(), Some("a"));

        title.set(String::new());
        ctx.execute_active_immediately();
        assert_eq!(el.attribute("title"), None);
    }

    #[test]
    fn test_binding_dies_with_element() {
        let (doc, ctx) = setup();
        let value = Observed::new(&ctx, 1);
        let el = Element::from_descriptor(&doc, &ctx, &describe("span").text(&value));
        assert_eq!(ctx.event_count(), 1);
        drop(el);
        assert_eq!(ctx.event_count(), 0);
        value.set(2);
        ctx.execute_active_immediately();
    }

    #[test]
    fn test_imperative_bind_and_unbind() {
        let (doc, ctx) = setup();
        let value = Observed::new(&ctx, String::from("on"));
        let el = Element::from_descriptor(&doc, &ctx, &describe("div"));
        let binding = el.bind("data-state", value.clone());
        assert!(binding.is_bound());
        assert_eq!(el.attribute("data-state").as_deref(), Some("on"));

        binding.unbind();
        binding.unbind();
        assert!(!binding.is_bound());
        value.set(String::from("off"));
        ctx.execute_active_immediately();
        assert_eq!(el.attribute("data-state").as_deref(), Some("on"));
    }

    #[test]
    #[should_panic(expected = "host node is gone")]
    fn test_bind_on_dead_element_panics() {
        let (doc, ctx) = setup();
        let value = Observed::new(&ctx, 0);
        let el = Element::from_descriptor(&doc, &ctx, &describe("div"));
        doc.tree_mut().remove(el.handle()).unwrap();
        el.bind("x", value);
    }

    #[test]
    fn test_children_order_and_erase() {
        let (doc, ctx) = setup();
        let el = Element::from_descriptor(&doc, &ctx, &describe("ul").children(["a", "c"]));
        el.insert(1, &Renderer::text("b"));
        assert_eq!(el.text_content(), "abc");

        let removed = el.child(0).unwrap().handle();
        el.erase(0);
        assert_eq!(el.text_content(), "bc");
        assert!(!doc.contains(removed));

        el.clear_children();
        assert_eq!(el.child_count(), 0);
        assert_eq!(doc.children(el.handle()).len(), 0);
    }

    #[test]
    fn test_erase_detaches_even_when_referenced() {
        let (doc, ctx) = setup();
        let el = Element::from_descriptor(&doc, &ctx, &describe("div").child("x"));
        let kept = el.child(0).unwrap();
        el.erase(0);
        assert_eq!(doc.parent(kept.handle()), None);
        drop(kept);
        assert_eq!(el.text_content(), "");
    }

    #[test]
    fn test_replace_keeps_position() {
        let (doc, ctx) = setup();
        let el = Element::from_descriptor(&doc, &ctx, &describe("div").children(["a", "b", "c"]));
        mount(&doc, &el);
        let middle = el.child(1).unwrap();
        let old = middle.handle();
        middle.replace(&describe("em").text("B").into());
        assert_ne!(middle.handle(), old);
        assert!(!doc.contains(old));
        assert_eq!(doc.children(el.handle())[1], middle.handle());
        assert_eq!(el.text_content(), "aBc");
    }

    #[test]
    fn test_replace_child_rebuilds() {
        let (doc, ctx) = setup();
        let el = Element::from_descriptor(&doc, &ctx, &describe("div").children(["a", "b"]));
        let old = el.child(0).unwrap().handle();
        let fresh = el.replace_child(0, &Renderer::text("z"));
        assert!(!doc.contains(old));
        assert_eq!(doc.children(el.handle())[0], fresh.handle());
        assert_eq!(el.text_content(), "zb");
    }

    #[test]
    fn test_listener_flushes_after_handler() {
        let (doc, ctx) = setup();
        let count = Observed::new(&ctx, 0);
        let clicks = count.clone();
        let el = Element::from_descriptor(
            &doc,
            &ctx,
            &describe("button").text(&count).on("click", move |_| {
                clicks.update(|c| *c += 1);
                clicks.update(|c| *c += 1);
            }),
        );
        let before = ctx.flush_count();
        doc.dispatch(el.handle(), "click");
        assert_eq!(ctx.flush_count(), before + 1);
        assert_eq!(el.text_content(), "2");
    }

    #[test]
    fn test_drop_removes_host_node() {
        let (doc, ctx) = setup();
        let el = Element::from_descriptor(&doc, &ctx, &describe("div").child("t"));
        mount(&doc, &el);
        let handle = el.handle();
        drop(el);
        assert!(!doc.contains(handle));
        assert!(doc.children(doc.body()).is_empty());
    }

    #[test]
    fn test_slot_for_borrows_node() {
        let (doc, ctx) = setup();
        let owner = Element::from_descriptor(&doc, &ctx, &describe("section"));
        let parent = Element::from_descriptor(&doc, &ctx, &describe("div").child("placeholder"));
        let slot = parent.child(0).unwrap();
        slot.slot_for(&owner);
        assert_eq!(slot.handle(), owner.handle());
        assert_eq!(slot.destroy_mode(), DestroyMode::DoNotDestroy);
        assert_eq!(doc.children(parent.handle()), vec![owner.handle()]);

        drop(slot);
        drop(parent);
        assert!(doc.contains(owner.handle()));
        assert_eq!(doc.parent(owner.handle()), None);
    }
}
