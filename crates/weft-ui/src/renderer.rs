//! Renderers
//!
//! A [`Renderer`] describes what goes in one position of the tree. Most
//! kinds produce exactly one host node. Fragments and lists produce a run of
//! nodes, so where a single node is required they are wrapped in a `div`.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use weft_dom::Document;
use weft_reactive::{DependencyToken, Event, EventContext, ModificationRange, ObservedVec};

use crate::binding::BindingHandle;
use crate::element::DestroyMode;
use crate::{Element, ElementDescriptor, StableElement};

/// Tag of the placeholder element a stable element is slotted into
pub(crate) const STABLE_SLOT_TAG: &str = "weft-stable-slot";

/// What to render at one position
#[derive(Debug, Clone)]
pub enum Renderer {
    Element(ElementDescriptor),
    Text(String),
    /// Children generated from an observed container
    List(ListRender),
    /// Content regenerated when its dependencies change
    Conditional(ConditionalRender),
    /// Content built once and reused across re-renders
    Stable(StableElement, Box<Renderer>),
    Fragment(Vec<Renderer>),
    /// Renders nothing visible; occupies a comment node
    Nil,
}

impl Renderer {
    pub fn text(text: impl Into<String>) -> Self {
        Renderer::Text(text.into())
    }

    pub fn fragment<R: Into<Renderer>>(children: impl IntoIterator<Item = R>) -> Self {
        Renderer::Fragment(children.into_iter().map(Into::into).collect())
    }

    /// Content produced by `generate`, re-run whenever `token` changes
    pub fn conditional(token: DependencyToken, generate: impl Fn() -> Renderer + 'static) -> Self {
        Renderer::Conditional(ConditionalRender {
            token,
            generate: Rc::new(generate),
        })
    }

    /// One child per item, patched incrementally as the container changes
    pub fn list<T: 'static>(
        items: &ObservedVec<T>,
        render: impl Fn(usize, &T) -> Renderer + 'static,
    ) -> Self {
        Renderer::List(ListRender {
            source: Rc::new(VecSource {
                items: items.clone(),
                render: Box::new(render),
            }),
        })
    }

    /// Whether this renderer produces exactly one host node
    pub fn is_single_node(&self) -> bool {
        !matches!(
            self,
            Renderer::Fragment(_) | Renderer::List(_) | Renderer::Conditional(_)
        )
    }

    /// This renderer, wrapped in a `div` when it does not produce one node.
    ///
    /// Conditionals are wrapped too: their slot is created by the parent.
    pub fn single_node(&self) -> Cow<'_, Renderer> {
        if self.is_single_node() {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(Renderer::Element(
                ElementDescriptor::new("div").child(self.clone()),
            ))
        }
    }
}

impl From<ElementDescriptor> for Renderer {
    fn from(descriptor: ElementDescriptor) -> Self {
        Renderer::Element(descriptor)
    }
}

impl From<&str> for Renderer {
    fn from(text: &str) -> Self {
        Renderer::Text(text.to_string())
    }
}

impl From<String> for Renderer {
    fn from(text: String) -> Self {
        Renderer::Text(text)
    }
}

impl From<Vec<Renderer>> for Renderer {
    fn from(children: Vec<Renderer>) -> Self {
        Renderer::Fragment(children)
    }
}

impl<T: Into<Renderer>> From<Option<T>> for Renderer {
    fn from(value: Option<T>) -> Self {
        value.map_or(Renderer::Nil, Into::into)
    }
}

/// Conditional content and the values it depends on
#[derive(Clone)]
pub struct ConditionalRender {
    pub(crate) token: DependencyToken,
    pub(crate) generate: Rc<dyn Fn() -> Renderer>,
}

impl fmt::Debug for ConditionalRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalRender")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Snapshot of a list source's pending ranges
#[derive(Debug, Clone)]
pub(crate) struct RangeSnapshot {
    pub full_rebuild: bool,
    pub clean: bool,
    pub epoch: u64,
    pub ranges: Vec<ModificationRange>,
}

/// Item source for a list renderer
pub(crate) trait ListSource {
    fn len(&self) -> usize;
    fn render_item(&self, index: usize) -> Renderer;
    fn snapshot(&self) -> RangeSnapshot;
    fn dependencies(&self) -> DependencyToken;
}

struct VecSource<T> {
    items: ObservedVec<T>,
    render: Box<dyn Fn(usize, &T) -> Renderer>,
}

impl<T: 'static> ListSource for VecSource<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    /// Item renderers must not mutate the container they render.
    fn render_item(&self, index: usize) -> Renderer {
        self.items.with(|items| (self.render)(index, &items[index]))
    }

    fn snapshot(&self) -> RangeSnapshot {
        let state = self.items.range_state();
        RangeSnapshot {
            full_rebuild: state.is_full_rebuild(),
            clean: state.is_clean(),
            epoch: state.epoch(),
            ranges: state.ranges(),
        }
    }

    fn dependencies(&self) -> DependencyToken {
        DependencyToken::from(&self.items)
    }
}

/// List renderer over an observed container
#[derive(Clone)]
pub struct ListRender {
    pub(crate) source: Rc<dyn ListSource>,
}

impl fmt::Debug for ListRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListRender")
            .field("len", &self.source.len())
            .finish()
    }
}

/// Build a detached element for one tree position
pub(crate) fn build(document: &Document, context: &EventContext, renderer: &Renderer) -> Rc<Element> {
    match renderer {
        Renderer::Element(descriptor) => Element::from_descriptor(document, context, descriptor),
        Renderer::Text(text) => {
            let handle = document.tree_mut().create_text(text);
            Element::from_handle(document, context, handle, DestroyMode::Remove)
        }
        Renderer::Nil => {
            let handle = document.tree_mut().create_comment("");
            Element::from_handle(document, context, handle, DestroyMode::Remove)
        }
        Renderer::Conditional(conditional) => build_conditional(document, context, conditional),
        Renderer::Stable(stable, content) => {
            let (target, previous) = stable.materialize(document, context, content);
            let handle = document.tree_mut().create_element(STABLE_SLOT_TAG);
            let slot = Element::from_handle(document, context, handle, DestroyMode::Remove);
            slot.slot_for(&target);
            drop(previous);
            slot
        }
        Renderer::Fragment(_) | Renderer::List(_) => {
            build(document, context, &renderer.single_node())
        }
    }
}

/// Build the slot for a conditional and anchor its re-render event on it
fn build_conditional(
    document: &Document,
    context: &EventContext,
    conditional: &ConditionalRender,
) -> Rc<Element> {
    let initial = (conditional.generate)();
    let slot = build(document, context, &initial.single_node());

    let target = Rc::downgrade(&slot);
    let alive = target.clone();
    let generate = Rc::clone(&conditional.generate);
    let id = context.register_event(Event::with_liveness(
        move |_| match target.upgrade() {
            Some(slot) => {
                slot.replace(&generate());
                true
            }
            None => false,
        },
        move || alive.strong_count() > 0,
    ));
    conditional.token.attach_event(id);
    slot.add_anchor(BindingHandle::new(context.clone(), id, conditional.token.clone()));
    slot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_node_wrapping() {
        let text = Renderer::text("a");
        assert!(matches!(text.single_node(), Cow::Borrowed(_)));

        let fragment = Renderer::fragment(["a", "b"]);
        match fragment.single_node().into_owned() {
            Renderer::Element(d) => {
                assert_eq!(d.tag(), "div");
                assert_eq!(d.child_renderers().len(), 1);
            }
            other => panic!("expected wrapper, got {other:?}"),
        }
    }

    #[test]
    fn test_option_into_renderer() {
        assert!(matches!(Renderer::from(None::<&str>), Renderer::Nil));
        assert!(matches!(Renderer::from(Some("x")), Renderer::Text(_)));
    }

    #[test]
    fn test_build_text_and_nil() {
        let doc = Document::new();
        let ctx = EventContext::new();
        let text = build(&doc, &ctx, &Renderer::text("hello"));
        assert_eq!(doc.text_content(text.handle()), "hello");

        let nil = build(&doc, &ctx, &Renderer::Nil);
        assert!(doc.tree().get(nil.handle()).is_some_and(|n| n.is_comment()));
    }
}
