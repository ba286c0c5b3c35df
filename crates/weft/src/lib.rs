//! weft
//!
//! Fine-grained reactive UI binding: observed values mark events active,
//! a flush runs every active event once, and each event updates exactly the
//! host nodes that depend on the changed values.
//!
//! # Example
//! ```rust,ignore
//! use weft::{element, Runtime};
//!
//! let runtime = Runtime::default();
//! let name = runtime.observed(String::from("world"));
//! runtime.render(element("h1").text(&name))?;
//!
//! name.set(String::from("weft"));
//! runtime.flush_pending_updates();
//! ```

pub use weft_reactive::{
    observe, Combinator, DependencyToken, Event, EventContext, EventId, ModificationRange,
    Observed, ObservedVec, RangeKind,
};
pub use weft_ui::{
    element, stabilize, AttrValue, BindingHandle, BindingSource, DestroyMode, Element,
    ElementDescriptor, Renderer, Runtime, RuntimeConfig, StableElement, UiError,
};

// Re-export sub-crates for advanced usage
pub use weft_dom as dom;
pub use weft_reactive as reactive;
pub use weft_ui as ui;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::debug!("weft {} tracing initialized", VERSION);
    }
}
