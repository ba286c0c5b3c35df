//! Observed sequence container
//!
//! Every mutation records the affected index range and activates attached
//! events. Consumers read [`ObservedVec::ranges`] during the flush to patch
//! their output incrementally. An after-effect registered at construction
//! clears the ranges once the flush has delivered them.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use crate::observed::Attachments;
use crate::{
    AsDependency, Event, EventContext, EventId, InsertResult, ModificationRange, ModifyGuard,
    ObservedBase, RangeState, DEFAULT_RANGE_RETRIES,
};

struct ContainerInner<T> {
    ctx: EventContext,
    value: RefCell<Vec<T>>,
    attachments: Attachments,
    ranges: RefCell<RangeState>,
    max_retries: usize,
    after_effect: Cell<EventId>,
}

impl<T> ContainerInner<T> {
    fn notify(&self, force: bool) {
        if force {
            let len = self.value.borrow().len();
            self.ranges.borrow_mut().reset(len);
        }
        self.attachments.notify(&self.ctx);
    }

    fn record(&self, edit: ModificationRange) {
        let len = self.value.borrow().len();
        let outcome = self
            .ranges
            .borrow_mut()
            .reconcile(len, edit, self.max_retries);
        if outcome == InsertResult::Reset {
            tracing::trace!("Container edit {:?} fell back to full rebuild", edit);
        }
        self.attachments.notify(&self.ctx);
    }
}

impl<T> Drop for ContainerInner<T> {
    fn drop(&mut self) {
        self.ctx.unregister_after_effect(self.after_effect.get());
    }
}

/// Observed `Vec` with range tracking
pub struct ObservedVec<T> {
    inner: Rc<ContainerInner<T>>,
}

impl<T> Clone for ObservedVec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> ObservedVec<T> {
    pub fn new(ctx: &EventContext, values: Vec<T>) -> Self {
        Self::with_retry_budget(ctx, values, DEFAULT_RANGE_RETRIES)
    }

    /// Create a container allowing `max_retries` range retries per edit
    pub fn with_retry_budget(ctx: &EventContext, values: Vec<T>, max_retries: usize) -> Self {
        let inner = Rc::new(ContainerInner {
            ctx: ctx.clone(),
            ranges: RefCell::new(RangeState::new(values.len())),
            value: RefCell::new(values),
            attachments: Attachments::default(),
            max_retries,
            after_effect: Cell::new(EventId::INVALID),
        });

        let weak: Weak<ContainerInner<T>> = Rc::downgrade(&inner);
        let alive = weak.clone();
        let id = ctx.register_after_effect(Event::with_liveness(
            move |_| match weak.upgrade() {
                Some(inner) => {
                    let len = inner.value.borrow().len();
                    inner.ranges.borrow_mut().clear(len);
                    true
                }
                None => false,
            },
            move || alive.strong_count() > 0,
        ));
        inner.after_effect.set(id);

        Self { inner }
    }
}

impl<T> ObservedVec<T> {
    pub fn context(&self) -> &EventContext {
        &self.inner.ctx
    }

    /// Borrow the items
    pub fn value(&self) -> Ref<'_, Vec<T>> {
        self.inner.value.borrow()
    }

    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    pub fn len(&self) -> usize {
        self.inner.value.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.value.borrow().is_empty()
    }

    /// Borrow the pending range state
    pub fn range_state(&self) -> Ref<'_, RangeState> {
        self.inner.ranges.borrow()
    }

    /// Ranges recorded since the last flush
    pub fn ranges(&self) -> Vec<ModificationRange> {
        self.inner.ranges.borrow().ranges()
    }

    pub fn max_retries(&self) -> usize {
        self.inner.max_retries
    }

    pub fn push(&self, item: T) {
        let at = {
            let mut value = self.inner.value.borrow_mut();
            value.push(item);
            value.len() - 1
        };
        self.inner.record(ModificationRange::insert(at, at + 1));
    }

    pub fn pop(&self) -> Option<T> {
        let (item, len) = {
            let mut value = self.inner.value.borrow_mut();
            let item = value.pop();
            (item, value.len())
        };
        if item.is_some() {
            self.inner.record(ModificationRange::erase(len, len + 1));
        }
        item
    }

    /// Insert at `index`
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, item: T) {
        self.inner.value.borrow_mut().insert(index, item);
        self.inner.record(ModificationRange::insert(index, index + 1));
    }

    /// Insert several items starting at `index`
    pub fn insert_many(&self, index: usize, items: impl IntoIterator<Item = T>) {
        let added = {
            let mut value = self.inner.value.borrow_mut();
            let before = value.len();
            let tail = value.split_off(index);
            value.extend(items);
            let added = value.len() - index;
            value.extend(tail);
            debug_assert_eq!(value.len(), before + added);
            added
        };
        if added > 0 {
            self.inner.record(ModificationRange::insert(index, index + added));
        }
    }

    /// Remove the item at `index`
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn remove(&self, index: usize) -> T {
        let item = self.inner.value.borrow_mut().remove(index);
        self.inner.record(ModificationRange::erase(index, index + 1));
        item
    }

    /// Remove a range of items, returning them
    pub fn erase_range(&self, range: Range<usize>) -> Vec<T> {
        let removed: Vec<T> = self.inner.value.borrow_mut().drain(range.clone()).collect();
        if !removed.is_empty() {
            self.inner
                .record(ModificationRange::erase(range.start, range.start + removed.len()));
        }
        removed
    }

    /// Shorten to `len` items
    pub fn truncate(&self, len: usize) {
        let old = self.len();
        if len < old {
            self.erase_range(len..old);
        }
    }

    /// Remove every item. Consumers rebuild.
    pub fn clear(&self) {
        self.inner.value.borrow_mut().clear();
        self.inner.notify(true);
    }

    /// Replace all items. Consumers rebuild.
    pub fn set(&self, values: Vec<T>) {
        *self.inner.value.borrow_mut() = values;
        self.inner.notify(true);
    }

    /// Exchange contents with `other`. Consumers rebuild.
    pub fn swap_with(&self, other: &mut Vec<T>) {
        std::mem::swap(&mut *self.inner.value.borrow_mut(), other);
        self.inner.notify(true);
    }

    /// Mutate one item in place, recording it as modified.
    ///
    /// Returns `None` without notifying when `index` is out of bounds.
    pub fn with_mutable<R>(&self, index: usize, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = {
            let mut value = self.inner.value.borrow_mut();
            let item = value.get_mut(index)?;
            f(item)
        };
        self.inner.record(ModificationRange::modify(index, index + 1));
        Some(result)
    }

    /// Mutable access to the whole vector; consumers rebuild when the guard drops
    pub fn modify(&self) -> ModifyGuard<'_, Vec<T>> {
        ModifyGuard::new(self.inner.value.borrow_mut(), self)
    }

    pub fn ptr_eq(&self, other: &ObservedVec<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> ObservedVec<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.value.borrow().get(index).cloned()
    }

    /// Resize to `len`, filling with clones of `value`
    pub fn resize(&self, len: usize, value: T) {
        let old = self.len();
        match len.cmp(&old) {
            std::cmp::Ordering::Less => self.truncate(len),
            std::cmp::Ordering::Greater => {
                self.inner.value.borrow_mut().resize(len, value);
                self.inner.record(ModificationRange::insert(old, len));
            }
            std::cmp::Ordering::Equal => {}
        }
    }
}

impl<T> ObservedBase for ObservedVec<T> {
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

    fn notify(&self, force: bool) {
        self.inner.notify(force);
    }
}

impl<T: 'static> AsDependency for ObservedVec<T> {
    fn as_dependency(&self) -> Rc<dyn ObservedBase> {
        Rc::new(self.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ObservedVec");
        match self.inner.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.field("ranges", &*self.inner.ranges.borrow()).finish()
    }
}
