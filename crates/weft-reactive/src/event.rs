//! Events stored in an event registry

use std::fmt;

/// Generational event handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl EventId {
    /// Handle that never refers to a registered event
    pub const INVALID: EventId = EventId {
        index: u32::MAX,
        generation: u32::MAX,
    };

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Callback run when an active event is executed.
///
/// Returning `false` unregisters the event once the flush completes.
pub type EventCallback = Box<dyn FnMut(EventId) -> bool>;

/// Predicate consulted before each execution; a dead event is skipped and removed
pub type LivenessCheck = Box<dyn Fn() -> bool>;

/// Registered unit of work
pub struct Event {
    pub(crate) callback: EventCallback,
    pub(crate) is_alive: LivenessCheck,
    pub(crate) once: bool,
}

impl Event {
    /// Event that stays registered while its callback returns `true`
    pub fn new(callback: impl FnMut(EventId) -> bool + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            is_alive: Box::new(|| true),
            once: false,
        }
    }

    /// Event bound to the lifetime of some target
    pub fn with_liveness(
        callback: impl FnMut(EventId) -> bool + 'static,
        is_alive: impl Fn() -> bool + 'static,
    ) -> Self {
        Self {
            callback: Box::new(callback),
            is_alive: Box::new(is_alive),
            once: false,
        }
    }

    /// Event that is removed after its first execution
    pub fn oneshot(callback: impl FnOnce() + 'static) -> Self {
        let mut callback = Some(callback);
        Self {
            callback: Box::new(move |_| {
                if let Some(f) = callback.take() {
                    f();
                }
                false
            }),
            is_alive: Box::new(|| true),
            once: true,
        }
    }

    #[inline]
    pub fn is_oneshot(&self) -> bool {
        self.once
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        (self.is_alive)()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}
