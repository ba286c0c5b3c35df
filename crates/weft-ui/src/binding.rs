//! Teardown handles for registered bindings

use std::fmt;

use weft_reactive::{DependencyToken, EventContext, EventId};

/// Handle to one binding event and the values it is attached to.
///
/// Cloning shares the same binding. Unbinding is idempotent.
#[derive(Clone)]
pub struct BindingHandle {
    context: EventContext,
    id: EventId,
    dependencies: DependencyToken,
}

impl BindingHandle {
    pub(crate) fn new(context: EventContext, id: EventId, dependencies: DependencyToken) -> Self {
        Self {
            context,
            id,
            dependencies,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    /// Whether the binding event is still registered
    pub fn is_bound(&self) -> bool {
        self.context.is_registered(self.id)
    }

    /// Detach from every dependency and unregister the event
    pub fn unbind(&self) {
        self.dependencies.detach_event(self.id);
        self.context.unregister_event(self.id);
    }
}

impl fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandle")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}
