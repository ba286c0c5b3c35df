//! Runtime Configuration

use weft_reactive::DEFAULT_RANGE_RETRIES;

/// Runtime configuration options
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Range retries per container edit before falling back to a full rebuild
    pub max_range_retries: usize,

    /// Initial capacity of the event registry
    pub event_capacity: usize,

    /// Tag of the element the host document starts with
    pub root_tag: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_range_retries: DEFAULT_RANGE_RETRIES,
            event_capacity: 256,
            root_tag: "body".to_string(),
        }
    }
}
