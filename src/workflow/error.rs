use thiserror::Error;

use super::WorkflowState;
use crate::charts::EditError;

/// Field-level email problems. The two cases carry different messages so
/// the form can tell "missing" apart from "mistyped".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your email address")]
    Empty,
    #[error("Please enter a valid email address")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: WorkflowState,
    },

    #[error("a request is already pending ({0})")]
    Busy(WorkflowState),

    #[error("no email has been captured for this edit")]
    MissingIdentifier,

    #[error("Error loading saved values: {0}")]
    Lookup(String),

    #[error("Error saving custom values: {0}")]
    Save(String),
}
