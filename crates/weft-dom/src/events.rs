//! DOM Events
//!
//! Events delivered to listeners installed on host nodes.

use std::rc::Rc;

use crate::NodeId;

/// Event listener stored on an element
pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// DOM event
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    /// Event name ("click", "input", ...)
    pub event_type: String,
    /// Node the event was dispatched to
    pub target: NodeId,
    /// Payload carried by value-style events such as "input"
    pub value: Option<String>,
    pub timestamp: f64,
}

impl DomEvent {
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            value: None,
            timestamp: 0.0,
        }
    }

    /// Attach a value payload
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_with_value() {
        let event = DomEvent::new("input", NodeId::NONE).with_value("abc");
        assert_eq!(event.event_type, "input");
        assert_eq!(event.value.as_deref(), Some("abc"));
    }
}
