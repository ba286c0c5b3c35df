//! List bindings
//!
//! A list renderer owns the tail of its parent's children, starting at the
//! child count the parent had when the list was bound. After each batch the
//! pending ranges of the source are replayed onto that tail. When the ranges
//! cannot be trusted (full rebuild, or already applied in this epoch) the
//! tail is rebuilt from scratch.

use std::cell::Cell;
use std::rc::Rc;

use weft_reactive::{Event, ModificationRange, RangeKind};

use crate::binding::BindingHandle;
use crate::renderer::{self, ListRender, ListSource};
use crate::Element;

struct ListState {
    offset: usize,
    /// Epoch whose ranges are already reflected in the children
    applied: Cell<Option<u64>>,
}

pub(crate) fn bind_list(element: &Element, list: &ListRender) {
    assert!(
        !element.hosts_list.get(),
        "an element can host at most one list renderer"
    );
    let source = Rc::clone(&list.source);
    let state = Rc::new(ListState {
        offset: element.child_count(),
        applied: Cell::new(None),
    });

    append_items(element, source.as_ref(), 0..source.len());
    element.hosts_list.set(true);

    let snapshot = source.snapshot();
    if !snapshot.clean {
        state.applied.set(Some(snapshot.epoch));
    }

    let target = element.this.clone();
    let alive = element.this.clone();
    let reader = Rc::clone(&source);
    let id = element.context().register_event(Event::with_liveness(
        move |_| match target.upgrade() {
            Some(element) => {
                update(&element, reader.as_ref(), &state);
                true
            }
            None => false,
        },
        move || alive.strong_count() > 0,
    ));

    let dependencies = source.dependencies();
    dependencies.attach_event(id);
    element.add_binding(BindingHandle::new(element.context().clone(), id, dependencies));
}

fn update(element: &Element, source: &dyn ListSource, state: &ListState) {
    let snapshot = source.snapshot();
    if snapshot.clean {
        return;
    }
    let incremental = !snapshot.full_rebuild && state.applied.get() != Some(snapshot.epoch);
    state.applied.set(Some(snapshot.epoch));

    if incremental {
        for range in &snapshot.ranges {
            apply(element, source, state.offset, range);
        }
        let expected = state.offset + source.len();
        if element.child_count() == expected {
            return;
        }
        tracing::warn!(
            "List children out of sync ({} != {}), rebuilding",
            element.child_count(),
            expected
        );
    }
    rebuild(element, source, state.offset);
}

fn apply(element: &Element, source: &dyn ListSource, offset: usize, range: &ModificationRange) {
    match range.kind {
        RangeKind::Modify => {
            for index in range.low..range.high {
                element.replace_child(offset + index, &source.render_item(index));
            }
        }
        RangeKind::Erase => element.erase_range(offset + range.low..offset + range.high),
        RangeKind::Insert => {
            for index in range.low..range.high {
                let child = renderer::build(
                    element.document(),
                    element.context(),
                    &source.render_item(index).single_node(),
                );
                element.attach_child(child, Some(offset + index));
            }
        }
    }
}

fn rebuild(element: &Element, source: &dyn ListSource, offset: usize) {
    tracing::debug!("Rebuilding list of {} items", source.len());
    let count = element.child_count();
    element.erase_range(offset.min(count)..count);
    append_items(element, source, 0..source.len());
}

fn append_items(element: &Element, source: &dyn ListSource, indices: std::ops::Range<usize>) {
    for index in indices {
        let child = renderer::build(
            element.document(),
            element.context(),
            &source.render_item(index).single_node(),
        );
        element.attach_child(child, None);
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::element as describe;
    use crate::{Element, Renderer};
    use weft_dom::Document;
    use weft_reactive::{EventContext, ObservedVec};

    fn render(doc: &Document, ctx: &EventContext, items: &ObservedVec<&'static str>) -> std::rc::Rc<Element> {
        Element::from_descriptor(
            doc,
            ctx,
            &describe("ul").child("head").child(Renderer::list(items, |_, item| {
                describe("li").text(*item).into()
            })),
        )
    }

    #[test]
    fn test_list_after_static_children() {
        let doc = Document::new();
        let ctx = EventContext::new();
        let items = ObservedVec::new(&ctx, vec!["a", "b"]);
        let ul = render(&doc, &ctx, &items);
        assert_eq!(ul.text_content(), "headab");

        items.push("c");
        items.remove(0);
        ctx.execute_active_immediately();
        assert_eq!(ul.text_content(), "headbc");
        assert_eq!(ul.child_count(), 3);
    }

    #[test]
    fn test_mutation_before_first_flush_is_not_applied_twice() {
        let doc = Document::new();
        let ctx = EventContext::new();
        let items = ObservedVec::new(&ctx, vec!["a"]);
        items.push("b");
        let ul = render(&doc, &ctx, &items);
        ctx.execute_active_immediately();
        assert_eq!(ul.text_content(), "headab");
        assert_eq!(ul.child_count(), 3);
    }

    #[test]
    #[should_panic(expected = "after a list renderer")]
    fn test_children_after_list_panic() {
        let doc = Document::new();
        let ctx = EventContext::new();
        let items = ObservedVec::new(&ctx, vec![1]);
        Element::from_descriptor(
            &doc,
            &ctx,
            &describe("ul")
                .child(Renderer::list(&items, |_, n| Renderer::text(n.to_string())))
                .child("tail"),
        );
    }
}
