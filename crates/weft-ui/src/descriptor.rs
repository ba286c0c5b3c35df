//! Element descriptors
//!
//! A descriptor is the declarative form of one element: tag, attributes and
//! child renderers. It owns no host state and can be rendered any number of
//! times.

use std::rc::Rc;

use weft_dom::DomEvent;

use crate::attribute::{Attribute, AttributeName, AttributeSource, IntoAttributeSource};
use crate::Renderer;

/// Declarative element
#[derive(Debug, Clone)]
pub struct ElementDescriptor {
    tag: String,
    attributes: Vec<Attribute>,
    children: Vec<Renderer>,
}

/// Start a descriptor for `tag`
pub fn element(tag: &str) -> ElementDescriptor {
    ElementDescriptor::new(tag)
}

impl ElementDescriptor {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute. `"textContent"` targets the element's text.
    pub fn attr(mut self, name: &str, value: impl IntoAttributeSource) -> Self {
        self.attributes.push(Attribute {
            name: AttributeName::from(name),
            source: value.into_source(),
        });
        self
    }

    pub fn id(self, value: impl IntoAttributeSource) -> Self {
        self.attr("id", value)
    }

    pub fn class(self, value: impl IntoAttributeSource) -> Self {
        self.attr("class", value)
    }

    /// Set the text content
    pub fn text(mut self, value: impl IntoAttributeSource) -> Self {
        self.attributes.push(Attribute {
            name: AttributeName::TextContent,
            source: value.into_source(),
        });
        self
    }

    /// Install a handler for a host event.
    ///
    /// Pending updates are flushed after the handler returns, so every
    /// mutation it makes lands in one batch.
    pub fn on(mut self, event: &str, handler: impl Fn(&DomEvent) + 'static) -> Self {
        self.attributes.push(Attribute {
            name: AttributeName::Named(event.to_string()),
            source: AttributeSource::Listener(Rc::new(handler)),
        });
        self
    }

    pub fn child(mut self, child: impl Into<Renderer>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<R: Into<Renderer>>(mut self, children: impl IntoIterator<Item = R>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn child_renderers(&self) -> &[Renderer] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrValue;

    #[test]
    fn test_builder_collects_attributes() {
        let d = element("button")
            .id("save")
            .class("primary")
            .text("Save")
            .on("click", |_| {});
        assert_eq!(d.tag(), "button");
        assert_eq!(d.attributes().len(), 4);
        assert_eq!(d.attributes()[2].name, AttributeName::TextContent);
        assert!(matches!(d.attributes()[3].source, AttributeSource::Listener(_)));
        assert!(matches!(
            &d.attributes()[0].source,
            AttributeSource::Static(AttrValue::Text(t)) if t == "save"
        ));
    }

    #[test]
    fn test_children_preserve_order() {
        let d = element("ul").children(["a", "b", "c"]);
        assert_eq!(d.child_renderers().len(), 3);
        assert!(matches!(&d.child_renderers()[1], Renderer::Text(t) if t == "b"));
    }
}
