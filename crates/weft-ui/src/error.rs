//! UI runtime errors

use weft_dom::DomError;

/// Errors surfaced while mounting a tree
#[derive(Debug, thiserror::Error)]
pub enum UiError {
    /// The host document has no element to render into
    #[error("host document has no mount point")]
    NoMountPoint,

    #[error("host document error: {0}")]
    Dom(#[from] DomError),
}
