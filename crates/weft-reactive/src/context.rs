//! Event context
//!
//! Single-threaded scheduler shared by every observed value and binding of
//! one UI tree. Mutations only mark events pending; nothing runs until
//! [`EventContext::execute_active_immediately`] flushes the batch.
//!
//! During a flush no registry borrow is held while user code runs, so
//! callbacks may register, unregister and activate events freely. Events
//! activated mid-flush run in the same flush.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::{Event, EventId, EventRegistry};

struct ContextInner {
    events: RefCell<EventRegistry>,
    after_effects: RefCell<EventRegistry>,
    flushing: Cell<bool>,
    flushes: Cell<u64>,
}

/// Shared handle to an event scheduler
#[derive(Clone)]
pub struct EventContext {
    inner: Rc<ContextInner>,
}

/// Counts gathered while draining one registry
#[derive(Debug, Default, Clone, Copy)]
struct DrainStats {
    executed: usize,
    skipped: usize,
}

impl EventContext {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a context with room for `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                events: RefCell::new(EventRegistry::with_capacity(capacity)),
                after_effects: RefCell::new(EventRegistry::new()),
                flushing: Cell::new(false),
                flushes: Cell::new(0),
            }),
        }
    }

    /// Whether two handles share one scheduler
    pub fn ptr_eq(&self, other: &EventContext) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn register_event(&self, event: Event) -> EventId {
        self.inner.events.borrow_mut().register(event)
    }

    /// Register an event that is removed after its first execution
    pub fn register_oneshot(&self, callback: impl FnOnce() + 'static) -> EventId {
        self.register_event(Event::oneshot(callback))
    }

    /// Register an event that runs at the end of every flush
    pub fn register_after_effect(&self, event: Event) -> EventId {
        self.inner.after_effects.borrow_mut().register(event)
    }

    /// Remove an event. Returns whether it was registered.
    pub fn unregister_event(&self, id: EventId) -> bool {
        let (found, removed) = {
            let mut events = self.inner.events.borrow_mut();
            let found = events.contains(id);
            (found, events.unregister(id))
        };
        drop(removed);
        found
    }

    pub fn unregister_after_effect(&self, id: EventId) -> bool {
        let (found, removed) = {
            let mut effects = self.inner.after_effects.borrow_mut();
            let found = effects.contains(id);
            (found, effects.unregister(id))
        };
        drop(removed);
        found
    }

    pub fn is_registered(&self, id: EventId) -> bool {
        self.inner.events.borrow().contains(id)
    }

    /// Mark an event pending.
    ///
    /// Returns `None` if the event was removed, which tells the caller to
    /// forget the handle.
    pub fn activate_event(&self, id: EventId) -> Option<EventId> {
        self.inner.events.borrow_mut().activate(id)
    }

    /// Number of registered events
    pub fn event_count(&self) -> usize {
        self.inner.events.borrow().len()
    }

    pub fn after_effect_count(&self) -> usize {
        self.inner.after_effects.borrow().len()
    }

    /// Number of events waiting for the next flush
    pub fn pending_count(&self) -> usize {
        self.inner.events.borrow().pending_count()
    }

    /// Number of completed flushes
    pub fn flush_count(&self) -> u64 {
        self.inner.flushes.get()
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    /// Run every pending event, then every after-effect.
    ///
    /// A call made from inside a running callback returns immediately; the
    /// outer flush picks up whatever the callback activated.
    pub fn execute_active_immediately(&self) {
        if self.inner.flushing.replace(true) {
            return;
        }

        let events = drain(&self.inner.events);
        let removed = compact(&self.inner.events);

        self.inner.after_effects.borrow_mut().activate_all();
        let effects = drain(&self.inner.after_effects);
        let removed_effects = compact(&self.inner.after_effects);

        self.inner.flushing.set(false);
        let flush = self.inner.flushes.get() + 1;
        self.inner.flushes.set(flush);

        tracing::debug!(
            "Flush #{}: ran {} events ({} dead), {} after-effects, removed {}",
            flush,
            events.executed,
            events.skipped,
            effects.executed,
            removed + removed_effects
        );
    }

    /// Drop every registered event and after-effect
    pub fn clear(&self) {
        let events = std::mem::take(&mut *self.inner.events.borrow_mut());
        let effects = std::mem::take(&mut *self.inner.after_effects.borrow_mut());
        tracing::trace!(
            "Clearing event context ({} events, {} after-effects)",
            events.len(),
            effects.len()
        );
        drop(events);
        drop(effects);
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("flushes", &self.inner.flushes.get())
            .field("flushing", &self.inner.flushing.get())
            .finish_non_exhaustive()
    }
}

/// Execute pending events of one registry until none remain
fn drain(registry: &RefCell<EventRegistry>) -> DrainStats {
    let mut stats = DrainStats::default();
    loop {
        let next = registry.borrow_mut().pop_pending();
        let Some(id) = next else {
            break;
        };
        let taken = registry.borrow_mut().take_event(id);
        let Some(mut event) = taken else {
            continue;
        };

        if !event.is_alive() {
            stats.skipped += 1;
            let restored = registry.borrow_mut().restore_event(id, event);
            match restored {
                Ok(()) => registry.borrow_mut().retire(id),
                Err(event) => drop(event),
            }
            continue;
        }

        let keep = (event.callback)(id);
        stats.executed += 1;
        let once = event.once;

        let restored = registry.borrow_mut().restore_event(id, event);
        match restored {
            Ok(()) if !keep || once => registry.borrow_mut().retire(id),
            Ok(()) => {}
            // unregistered by its own callback; dropped here, outside the borrow
            Err(event) => drop(event),
        }
    }
    stats
}

/// Remove retired events, dropping them with no borrow held
fn compact(registry: &RefCell<EventRegistry>) -> usize {
    let removed = registry.borrow_mut().compact();
    let count = removed.len();
    drop(removed);
    count
}
