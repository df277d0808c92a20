use crate::descriptor::OperationKind;
use thiserror::Error;

/// A transition or input the current state does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("An operation is already running")]
    Busy,

    #[error("No operation form is open")]
    NotInForm,

    #[error("{0} has no second file input")]
    NoSecondaryInput(OperationKind),

    #[error("{0} has no text input")]
    NoTextInput(OperationKind),

    #[error("No page preview is loaded")]
    NoPreview,

    #[error("Page {0} is not in the preview")]
    UnknownPage(u32),

    #[error("Cannot move page from position {from} to {to}")]
    InvalidMove { from: usize, to: usize },

    #[error("{0} does not support reordering pages")]
    ReorderUnavailable(OperationKind),
}
