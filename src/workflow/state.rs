use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::WorkflowError;
use crate::{charts::ChartDataset, email::EmailAddress};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowState {
    Idle,
    EmailCapture,
    CheckingExisting,
    OverwriteConfirm,
    Editing,
    Saving,
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState::Idle
    }
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::EmailCapture => "capturing email",
            WorkflowState::CheckingExisting => "checking saved values",
            WorkflowState::OverwriteConfirm => "confirming overwrite",
            WorkflowState::Editing => "editing",
            WorkflowState::Saving => "saving",
        }
    }

    /// True while a store request is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowState::CheckingExisting | WorkflowState::Saving)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition table for one chart's edit flow. Holds no I/O; the controller
/// performs the lookup and upsert between the `begin_*` and
/// `resolve_*`/`complete_*`/`fail_*` calls.
#[derive(Debug, Clone)]
pub struct EditSession<D> {
    pub status: WorkflowState,
    pub email: Option<EmailAddress>,
    /// Canonical dataset, replaced only by a decline or a successful save.
    pub displayed: D,
    /// Working copy, present only while editing or saving.
    pub working: Option<D>,
    /// Saved record awaiting an overwrite decision.
    pub previous: Option<D>,
    /// Cancels the outstanding lookup or save. Set together with the busy
    /// state and cleared when that state is left.
    pub pending: Option<CancellationToken>,
}

impl<D: ChartDataset> EditSession<D> {
    pub fn new(displayed: D) -> Self {
        Self {
            status: WorkflowState::Idle,
            email: None,
            displayed,
            working: None,
            previous: None,
            pending: None,
        }
    }

    fn expect(&self, action: &'static str, expected: WorkflowState) -> Result<(), WorkflowError> {
        if self.status.is_busy() {
            return Err(WorkflowError::Busy(self.status));
        }
        if self.status != expected {
            return Err(WorkflowError::InvalidTransition {
                action,
                state: self.status,
            });
        }
        Ok(())
    }

    /// Idle -> EmailCapture. Repeating the request while the prompt is open
    /// is a no-op.
    pub fn open_email_capture(&mut self) -> Result<(), WorkflowError> {
        if self.status == WorkflowState::EmailCapture {
            return Ok(());
        }
        self.expect("start editing", WorkflowState::Idle)?;
        self.email = None;
        self.status = WorkflowState::EmailCapture;
        Ok(())
    }

    /// EmailCapture -> Idle when the prompt is dismissed.
    pub fn close_email_capture(&mut self) -> Result<(), WorkflowError> {
        self.expect("close the email prompt", WorkflowState::EmailCapture)?;
        self.email = None;
        self.status = WorkflowState::Idle;
        Ok(())
    }

    /// EmailCapture -> CheckingExisting. Invalid input leaves the state as is.
    pub fn begin_lookup(&mut self, input: &str) -> Result<EmailAddress, WorkflowError> {
        self.expect("submit an email", WorkflowState::EmailCapture)?;
        let email = EmailAddress::parse(input)?;
        self.email = Some(email.clone());
        self.status = WorkflowState::CheckingExisting;
        Ok(email)
    }

    /// CheckingExisting -> OverwriteConfirm when a non-empty record exists,
    /// otherwise straight to Editing with a copy of the displayed dataset.
    pub fn resolve_lookup(&mut self, existing: Option<D>) {
        match existing.filter(|data| !data.is_empty()) {
            Some(previous) => {
                self.previous = Some(previous);
                self.status = WorkflowState::OverwriteConfirm;
            }
            None => {
                self.working = Some(self.displayed.clone());
                self.status = WorkflowState::Editing;
            }
        }
    }

    /// CheckingExisting -> EmailCapture so the user can retry.
    pub fn fail_lookup(&mut self) {
        self.status = WorkflowState::EmailCapture;
    }

    /// OverwriteConfirm -> Editing, seeded from what is on screen rather
    /// than from the saved record.
    pub fn confirm_overwrite(&mut self) -> Result<(), WorkflowError> {
        self.expect("confirm overwrite", WorkflowState::OverwriteConfirm)?;
        self.previous = None;
        self.working = Some(self.displayed.clone());
        self.status = WorkflowState::Editing;
        Ok(())
    }

    /// OverwriteConfirm -> Idle; the saved record replaces the displayed one.
    pub fn decline_overwrite(&mut self) -> Result<(), WorkflowError> {
        self.expect("decline overwrite", WorkflowState::OverwriteConfirm)?;
        if let Some(previous) = self.previous.take() {
            self.displayed = previous;
        }
        self.working = None;
        self.status = WorkflowState::Idle;
        Ok(())
    }

    pub fn apply_edit(&mut self, edit: D::Edit) -> Result<(), WorkflowError> {
        self.expect("edit values", WorkflowState::Editing)?;
        let working = self.working.as_mut().ok_or(WorkflowError::InvalidTransition {
            action: "edit values",
            state: self.status,
        })?;
        working.apply_edit(edit)?;
        Ok(())
    }

    /// Editing -> Saving. Returns the key and the dataset to persist.
    pub fn begin_save(&mut self) -> Result<(EmailAddress, D), WorkflowError> {
        self.expect("save", WorkflowState::Editing)?;
        let email = self.email.clone().ok_or(WorkflowError::MissingIdentifier)?;
        let working = self.working.clone().ok_or(WorkflowError::InvalidTransition {
            action: "save",
            state: self.status,
        })?;
        self.status = WorkflowState::Saving;
        Ok((email, working))
    }

    /// Saving -> Idle; `committed` becomes the displayed dataset.
    pub fn complete_save(&mut self, committed: D) {
        self.displayed = committed;
        self.working = None;
        self.status = WorkflowState::Idle;
    }

    /// Saving -> Editing with the working copy kept for a retry.
    pub fn fail_save(&mut self) {
        self.status = WorkflowState::Editing;
    }

    /// Rolls a busy state back as if its request had failed:
    /// CheckingExisting -> EmailCapture, Saving -> Editing. Returns false
    /// when nothing was in flight.
    pub fn abandon_request(&mut self) -> bool {
        self.pending = None;
        match self.status {
            WorkflowState::CheckingExisting => {
                self.fail_lookup();
                true
            }
            WorkflowState::Saving => {
                self.fail_save();
                true
            }
            _ => false,
        }
    }

    /// Editing -> Idle, dropping the working copy.
    pub fn cancel_edit(&mut self) -> Result<(), WorkflowError> {
        self.expect("cancel editing", WorkflowState::Editing)?;
        self.working = None;
        self.status = WorkflowState::Idle;
        Ok(())
    }
}
