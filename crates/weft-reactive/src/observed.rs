//! Observed values
//!
//! An observed value holds data plus the ids of events that depend on it.
//! Changing the value activates those events on the shared
//! [`EventContext`]; they run at the next flush.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::{EventContext, EventId};

/// Dependency-tracking surface shared by every observed value
pub trait ObservedBase {
    /// Attach a repeating event. Attaching twice is a no-op.
    fn attach_event(&self, id: EventId);

    /// Attach an event that is activated on the next change only
    fn attach_oneshot_event(&self, id: EventId);

    /// Detach an event. Detaching an unknown id is a no-op.
    fn detach_event(&self, id: EventId);

    fn attached_event_count(&self) -> usize;

    fn attached_oneshot_event_count(&self) -> usize;

    /// Activate every attached event.
    ///
    /// `force` marks the whole value as changed, which matters for
    /// containers that otherwise report fine-grained ranges.
    fn notify(&self, force: bool);
}

/// Conversion into a shareable dependency handle
pub trait AsDependency {
    fn as_dependency(&self) -> Rc<dyn ObservedBase>;
}

/// Attached event ids of one observed value
#[derive(Debug, Default)]
pub(crate) struct Attachments {
    events: RefCell<Vec<EventId>>,
    oneshot: RefCell<Vec<EventId>>,
}

impl Attachments {
    pub(crate) fn attach(&self, id: EventId) {
        let mut events = self.events.borrow_mut();
        if !events.contains(&id) {
            events.push(id);
        }
    }

    pub(crate) fn attach_oneshot(&self, id: EventId) {
        let mut oneshot = self.oneshot.borrow_mut();
        if !oneshot.contains(&id) {
            oneshot.push(id);
        }
    }

    pub(crate) fn detach(&self, id: EventId) {
        self.events.borrow_mut().retain(|e| *e != id);
        self.oneshot.borrow_mut().retain(|e| *e != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub(crate) fn oneshot_len(&self) -> usize {
        self.oneshot.borrow().len()
    }

    /// Activate everything attached, forgetting one-shots and dead ids
    pub(crate) fn notify(&self, ctx: &EventContext) {
        let oneshot = std::mem::take(&mut *self.oneshot.borrow_mut());
        for id in oneshot {
            ctx.activate_event(id);
        }

        let mut events = self.events.borrow_mut();
        let before = events.len();
        events.retain(|id| ctx.activate_event(*id).is_some());
        if events.len() != before {
            tracing::trace!("Dropped {} dead attachments", before - events.len());
        }
    }
}

struct ObservedInner<T> {
    ctx: EventContext,
    value: RefCell<T>,
    attachments: Attachments,
}

/// Shared observed value
///
/// Cloning yields another handle to the same value.
pub struct Observed<T> {
    inner: Rc<ObservedInner<T>>,
}

impl<T> Clone for Observed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Observed<T> {
    pub fn new(ctx: &EventContext, value: T) -> Self {
        Self {
            inner: Rc::new(ObservedInner {
                ctx: ctx.clone(),
                value: RefCell::new(value),
                attachments: Attachments::default(),
            }),
        }
    }

    /// Context this value notifies
    pub fn context(&self) -> &EventContext {
        &self.inner.ctx
    }

    /// Borrow the current value
    pub fn value(&self) -> Ref<'_, T> {
        self.inner.value.borrow()
    }

    /// Read the value through a closure
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value and activate dependents
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify(false);
    }

    /// Replace the value without activating anything
    pub fn set_without_update(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
    }

    /// Mutate in place and activate dependents
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.notify(false);
    }

    /// Mutable access; dependents are activated when the guard drops
    pub fn modify(&self) -> ModifyGuard<'_, T> {
        ModifyGuard::new(self.inner.value.borrow_mut(), self)
    }

    /// Whether two handles share one value
    pub fn ptr_eq(&self, other: &Observed<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Observed<T> {
    /// Clone out the current value
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: PartialEq> Observed<T> {
    /// Assign and notify only when the value differs.
    ///
    /// Returns whether the value changed.
    pub fn assign_if_changed(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify(false);
        true
    }
}

impl<T> ObservedBase for Observed<T> {
    fn attach_event(&self, id: EventId) {
        self.inner.attachments.attach(id);
    }

    fn attach_oneshot_event(&self, id: EventId) {
        self.inner.attachments.attach_oneshot(id);
    }

    fn detach_event(&self, id: EventId) {
        self.inner.attachments.detach(id);
    }

    fn attached_event_count(&self) -> usize {
        self.inner.attachments.len()
    }

    fn attached_oneshot_event_count(&self) -> usize {
        self.inner.attachments.oneshot_len()
    }

    fn notify(&self, _force: bool) {
        self.inner.attachments.notify(&self.inner.ctx);
    }
}

impl<T: 'static> AsDependency for Observed<T> {
    fn as_dependency(&self) -> Rc<dyn ObservedBase> {
        Rc::new(self.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Observed");
        match self.inner.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.field("attached", &self.inner.attachments.len()).finish()
    }
}

/// Mutable borrow of an observed value.
///
/// Dropping the guard releases the borrow, then notifies with `force`
/// set, so dependents see the whole value as changed.
pub struct ModifyGuard<'a, T> {
    value: Option<RefMut<'a, T>>,
    owner: &'a dyn ObservedBase,
}

impl<'a, T> ModifyGuard<'a, T> {
    pub(crate) fn new(value: RefMut<'a, T>, owner: &'a dyn ObservedBase) -> Self {
        Self {
            value: Some(value),
            owner,
        }
    }
}

impl<T> Deref for ModifyGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => unreachable!("modify guard used after release"),
        }
    }
}

impl<T> DerefMut for ModifyGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("modify guard used after release"),
        }
    }
}

impl<T> Drop for ModifyGuard<'_, T> {
    fn drop(&mut self) {
        drop(self.value.take());
        self.owner.notify(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Event;
    use std::cell::Cell;

    fn counting_event(ctx: &EventContext) -> (EventId, Rc<Cell<u32>>) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = ctx.register_event(Event::new(move |_| {
            h.set(h.get() + 1);
            true
        }));
        (id, hits)
    }

    #[test]
    fn test_set_activates_attached() {
        let ctx = EventContext::new();
        let value = Observed::new(&ctx, 1);
        let (id, hits) = counting_event(&ctx);
        value.attach_event(id);

        value.set(2);
        value.set(3);
        assert_eq!(hits.get(), 0);
        ctx.execute_active_immediately();
        assert_eq!(hits.get(), 1);
        assert_eq!(value.get(), 3);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let ctx = EventContext::new();
        let value = Observed::new(&ctx, ());
        let (id, _) = counting_event(&ctx);
        value.attach_event(id);
        value.attach_event(id);
        assert_eq!(value.attached_event_count(), 1);
        value.detach_event(id);
        value.detach_event(id);
        assert_eq!(value.attached_event_count(), 0);
    }

    #[test]
    fn test_assign_if_changed() {
        let ctx = EventContext::new();
        let value = Observed::new(&ctx, String::from("a"));
        let (id, hits) = counting_event(&ctx);
        value.attach_event(id);

        assert!(!value.assign_if_changed("a".to_string()));
        assert_eq!(ctx.pending_count(), 0);
        assert!(value.assign_if_changed("b".to_string()));
        ctx.execute_active_immediately();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_set_without_update() {
        let ctx = EventContext::new();
        let value = Observed::new(&ctx, 0);
        let (id, _) = counting_event(&ctx);
        value.attach_event(id);
        value.set_without_update(5);
        assert_eq!(ctx.pending_count(), 0);
        assert_eq!(*value.value(), 5);
    }

    #[test]
    fn test_modify_guard_notifies_on_drop() {
        let ctx = EventContext::new();
        let value = Observed::new(&ctx, vec![1, 2]);
        let (id, hits) = counting_event(&ctx);
        value.attach_event(id);

        {
            let mut guard = value.modify();
            guard.push(3);
            assert_eq!(ctx.pending_count(), 0);
        }
        assert_eq!(ctx.pending_count(), 1);
        ctx.execute_active_immediately();
        assert_eq!(hits.get(), 1);
        assert_eq!(value.with(|v| v.len()), 3);
    }

    #[test]
    fn test_oneshot_attachment_forgotten_after_notify() {
        let ctx = EventContext::new();
        let value = Observed::new(&ctx, 0);
        let (id, hits) = counting_event(&ctx);
        value.attach_oneshot_event(id);
        assert_eq!(value.attached_oneshot_event_count(), 1);

        value.set(1);
        assert_eq!(value.attached_oneshot_event_count(), 0);
        ctx.execute_active_immediately();
        value.set(2);
        ctx.execute_active_immediately();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_dead_ids_compacted_on_notify() {
        let ctx = EventContext::new();
        let value = Observed::new(&ctx, 0);
        let (id, _) = counting_event(&ctx);
        value.attach_event(id);
        ctx.unregister_event(id);

        value.set(1);
        assert_eq!(value.attached_event_count(), 0);
    }

    #[test]
    fn test_clones_share_value() {
        let ctx = EventContext::new();
        let a = Observed::new(&ctx, 1);
        let b = a.clone();
        b.set(7);
        assert_eq!(a.get(), 7);
        assert!(a.ptr_eq(&b));
    }
}
