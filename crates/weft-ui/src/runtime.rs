//! Runtime - Main entry point

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::{Document, DomError, DomEvent, NodeId};
use weft_reactive::{EventContext, Observed, ObservedVec};

use crate::attribute::BindingSource;
use crate::binding::BindingHandle;
use crate::renderer::{self, Renderer};
use crate::{Element, RuntimeConfig, UiError};

/// Owns the host document, the event context and the mounted roots
pub struct Runtime {
    config: RuntimeConfig,
    context: EventContext,
    document: Document,
    roots: RefCell<Vec<Rc<Element>>>,
}

impl Runtime {
    /// Create a runtime with the given configuration
    pub fn new(config: RuntimeConfig) -> Self {
        tracing::info!("weft runtime {} initialized", env!("CARGO_PKG_VERSION"));
        Self {
            context: EventContext::with_capacity(config.event_capacity),
            document: Document::with_body_tag(&config.root_tag),
            roots: RefCell::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// New observed value in this runtime's context
    pub fn observed<T>(&self, value: T) -> Observed<T> {
        Observed::new(&self.context, value)
    }

    /// New observed container using the configured retry budget
    pub fn observed_vec<T: 'static>(&self, values: Vec<T>) -> ObservedVec<T> {
        ObservedVec::with_retry_budget(&self.context, values, self.config.max_range_retries)
    }

    /// Render into the document body.
    ///
    /// A second call rebuilds the first root in place.
    pub fn render(&self, renderer: impl Into<Renderer>) -> Result<Rc<Element>, UiError> {
        let renderer = renderer.into();
        let existing = self.roots.borrow().first().cloned();
        if let Some(root) = existing {
            tracing::debug!("Re-rendering root {:?}", root.handle());
            root.replace(&renderer);
            return Ok(root);
        }

        let body = self.document.body();
        if !body.is_valid() {
            return Err(UiError::NoMountPoint);
        }
        self.render_into(body, renderer)
    }

    /// Render as the last child of `mount`
    pub fn render_into(
        &self,
        mount: NodeId,
        renderer: impl Into<Renderer>,
    ) -> Result<Rc<Element>, UiError> {
        if !self.document.contains(mount) {
            return Err(DomError::NotFound.into());
        }
        let renderer = renderer.into();
        let root = renderer::build(&self.document, &self.context, &renderer.single_node());
        let attached = self.document.tree_mut().append_child(mount, root.handle());
        attached?;
        tracing::info!("Mounted {:?} under {:?}", root.handle(), mount);
        self.roots.borrow_mut().push(Rc::clone(&root));
        Ok(root)
    }

    /// First mounted root
    pub fn root(&self) -> Option<Rc<Element>> {
        self.roots.borrow().first().cloned()
    }

    /// Bind an attribute of a mounted element to a live source
    pub fn bind(
        &self,
        element: &Element,
        name: &str,
        source: impl BindingSource + 'static,
    ) -> BindingHandle {
        element.bind(name, source)
    }

    /// Run every pending update
    pub fn flush_pending_updates(&self) {
        self.context.execute_active_immediately();
    }

    /// Fire a host event on a node. Returns whether a listener ran.
    pub fn dispatch(&self, target: NodeId, event_type: &str) -> bool {
        self.document.dispatch(target, event_type)
    }

    pub fn dispatch_event(&self, event: &DomEvent) -> bool {
        self.document.dispatch_event(event)
    }

    /// Drop every root and every registered event
    pub fn unmount(&self) {
        let roots = std::mem::take(&mut *self.roots.borrow_mut());
        if !roots.is_empty() {
            tracing::debug!("Unmounting {} root(s)", roots.len());
        }
        drop(roots);
        self.context.clear();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element;

    #[test]
    fn test_render_mounts_under_body() {
        let runtime = Runtime::default();
        let root = runtime.render(element("div").id("app")).unwrap();
        let body = runtime.document().body();
        assert_eq!(runtime.document().children(body), vec![root.handle()]);
        assert_eq!(runtime.document().get_element_by_id("app"), Some(root.handle()));
    }

    #[test]
    fn test_second_render_replaces_root() {
        let runtime = Runtime::default();
        let first = runtime.render(element("div")).unwrap();
        let old = first.handle();
        let second = runtime.render(element("main").text("hi")).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(!runtime.document().contains(old));
        assert_eq!(second.tag_name().as_deref(), Some("main"));
        assert_eq!(runtime.document().children(runtime.document().body()).len(), 1);
    }

    #[test]
    fn test_render_into_dead_mount_fails() {
        let runtime = Runtime::default();
        let result = runtime.render_into(NodeId::NONE, "x");
        assert!(matches!(result, Err(UiError::Dom(DomError::NotFound))));
    }

    #[test]
    fn test_custom_root_tag() {
        let runtime = Runtime::new(RuntimeConfig {
            root_tag: "main".to_string(),
            ..RuntimeConfig::default()
        });
        let body = runtime.document().body();
        assert_eq!(runtime.document().tag_name(body).as_deref(), Some("main"));
    }

    #[test]
    fn test_observed_vec_uses_configured_retries() {
        let runtime = Runtime::new(RuntimeConfig {
            max_range_retries: 0,
            ..RuntimeConfig::default()
        });
        let items = runtime.observed_vec(vec![1, 2, 3]);
        assert_eq!(items.max_retries(), 0);
    }

    #[test]
    fn test_unmount_clears_context() {
        let runtime = Runtime::default();
        let value = runtime.observed(1);
        runtime.render(element("p").text(&value)).unwrap();
        assert_eq!(runtime.context().event_count(), 1);
        runtime.unmount();
        assert_eq!(runtime.context().event_count(), 0);
        assert!(runtime.root().is_none());
    }
}
