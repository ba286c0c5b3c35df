//! weft DOM - host document
//!
//! Arena-backed node tree that the reactive layer renders into. Handles
//! are generational, so a handle to a destroyed node is detectably stale.

mod document;
mod error;
mod events;
mod generation;
mod interner;
mod node;
mod tree;

pub use document::Document;
pub use error::{DomError, DomResult};
pub use events::{DomEvent, Listener};
pub use generation::Generation;
pub use interner::{InternedString, StringInterner};
pub use node::{Attribute, ElementData, ListenerEntry, Node, NodeData};
pub use tree::{ChildIter, DomTree};

/// Node identifier (arena slot plus generation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: Generation,
}

impl NodeId {
    /// Invalid/null node ID
    pub const NONE: NodeId = NodeId {
        index: u32::MAX,
        generation: Generation::INITIAL,
    };

    pub(crate) const fn new(index: u32, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Check if this is a valid (non-null) ID
    #[inline]
    pub fn is_valid(self) -> bool {
        self.index != u32::MAX
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> Generation {
        self.generation
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NONE
    }
}
