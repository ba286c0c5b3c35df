//! weft reactive core
//!
//! Event scheduling and dependency tracking:
//! - [`EventContext`]: registry of events with batched execution
//! - [`Observed`]: value that activates dependent events when changed
//! - [`ObservedVec`]: sequence that also records which index ranges changed
//! - [`DependencyToken`] / [`Combinator`]: several values as one dependency

mod container;
mod context;
mod dependency;
mod event;
mod observed;
mod range;
mod registry;

pub use container::ObservedVec;
pub use context::EventContext;
pub use dependency::{observe, Combinator, DependencyToken};
pub use event::{Event, EventCallback, EventId, LivenessCheck};
pub use observed::{AsDependency, ModifyGuard, Observed, ObservedBase};
pub use range::{
    InsertResult, ModificationRange, RangeKind, RangeState, DEFAULT_RANGE_RETRIES,
};
pub use registry::EventRegistry;
