//! weft UI layer
//!
//! Element tree, attribute bindings and renderers on top of the host
//! document (`weft-dom`) and the event system (`weft-reactive`).
//!
//! # Example
//! ```rust,ignore
//! use weft_ui::{element, Runtime};
//!
//! let runtime = Runtime::default();
//! let count = runtime.observed(0);
//! runtime.render(element("span").text(&count))?;
//! count.set(1);
//! runtime.flush_pending_updates();
//! ```

mod attribute;
mod binding;
mod config;
mod descriptor;
mod element;
mod error;
mod list;
mod renderer;
mod runtime;
mod stable;

pub use attribute::{
    AttrValue, Attribute, AttributeName, AttributeSource, AttributeText, BindingSource,
    EventHandler, IntoAttributeSource,
};
pub use binding::BindingHandle;
pub use config::RuntimeConfig;
pub use descriptor::{element, ElementDescriptor};
pub use element::{DestroyMode, Element};
pub use error::UiError;
pub use renderer::{ConditionalRender, ListRender, Renderer};
pub use runtime::Runtime;
pub use stable::{stabilize, StableElement};
