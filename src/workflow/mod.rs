pub mod controller;
pub mod error;
pub mod state;

pub use controller::{EditWorkflow, WorkflowSnapshot, SAVE_SUCCESS_MESSAGE};
pub use error::{ValidationError, WorkflowError};
pub use state::{EditSession, WorkflowState};
