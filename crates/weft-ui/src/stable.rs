//! Stable elements
//!
//! A [`StableElement`] keeps one rendered subtree alive across re-renders of
//! its parent. The first render builds it; later renders slot the same host
//! node back in, with its bindings and native identity intact. A stable
//! element is meant to be mounted in one place at a time.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use weft_dom::Document;
use weft_reactive::EventContext;

use crate::renderer::{self, Renderer};
use crate::{Element, ElementDescriptor};

#[derive(Default)]
struct StableInner {
    element: Option<Rc<Element>>,
    reset: bool,
}

/// Handle to a subtree that survives re-renders. Clones share the subtree.
#[derive(Clone, Default)]
pub struct StableElement {
    inner: Rc<RefCell<StableInner>>,
}

/// Renderer that builds `content` once and reuses it afterwards
pub fn stabilize(stable: &StableElement, content: impl Into<Renderer>) -> Renderer {
    Renderer::Stable(stable.clone(), Box::new(content.into()))
}

impl StableElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the subtree on its next render
    pub fn reset(&self) {
        self.inner.borrow_mut().reset = true;
    }

    /// Drop the subtree, taking it off the page
    pub fn destroy(&self) {
        let element = self.inner.borrow_mut().element.take();
        drop(element);
    }

    /// The current subtree, if built
    pub fn element(&self) -> Option<Rc<Element>> {
        self.inner.borrow().element.clone()
    }

    pub fn is_built(&self) -> bool {
        self.inner.borrow().element.is_some()
    }

    /// Subtree to slot in, building it if needed.
    ///
    /// When a new subtree replaces an old one, the old one is returned so the
    /// caller can drop it after the new node is in place.
    pub(crate) fn materialize(
        &self,
        document: &Document,
        context: &EventContext,
        content: &Renderer,
    ) -> (Rc<Element>, Option<Rc<Element>>) {
        let existing = {
            let inner = self.inner.borrow();
            if inner.reset { None } else { inner.element.clone() }
        };
        if let Some(element) = existing {
            if element.is_alive() {
                return (element, None);
            }
            tracing::debug!("Stable element lost its host node, rebuilding");
        }

        let content = match content {
            Renderer::Nil => Cow::Owned(Renderer::Element(ElementDescriptor::new("div"))),
            other => other.single_node(),
        };
        let built = renderer::build(document, context, &content);
        let previous = {
            let mut inner = self.inner.borrow_mut();
            inner.reset = false;
            inner.element.replace(Rc::clone(&built))
        };
        (built, previous)
    }
}

impl fmt::Debug for StableElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("StableElement")
            .field("element", &inner.element.as_ref().map(|e| e.handle()))
            .field("reset", &inner.reset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::element as describe;

    #[test]
    fn test_materialize_reuses_element() {
        let doc = Document::new();
        let ctx = EventContext::new();
        let stable = StableElement::new();
        let content: Renderer = describe("canvas").into();

        let (first, previous) = stable.materialize(&doc, &ctx, &content);
        assert!(previous.is_none());
        let (second, _) = stable.materialize(&doc, &ctx, &content);
        assert!(Rc::ptr_eq(&first, &second));
        assert!(stable.is_built());
    }

    #[test]
    fn test_nil_becomes_div() {
        let doc = Document::new();
        let ctx = EventContext::new();
        let stable = StableElement::new();
        let (element, _) = stable.materialize(&doc, &ctx, &Renderer::Nil);
        assert_eq!(element.tag_name().as_deref(), Some("div"));
    }

    #[test]
    fn test_reset_rebuilds() {
        let doc = Document::new();
        let ctx = EventContext::new();
        let stable = StableElement::new();
        let content: Renderer = describe("p").into();

        let (first, _) = stable.materialize(&doc, &ctx, &content);
        stable.reset();
        let (second, previous) = stable.materialize(&doc, &ctx, &content);
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(previous.is_some_and(|p| Rc::ptr_eq(&p, &first)));
    }

    #[test]
    fn test_destroy_frees_node() {
        let doc = Document::new();
        let ctx = EventContext::new();
        let stable = StableElement::new();
        let (element, _) = stable.materialize(&doc, &ctx, &describe("p").into());
        let handle = element.handle();
        drop(element);
        stable.destroy();
        assert!(!stable.is_built());
        assert!(!doc.contains(handle));
    }
}
