use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::{
    runtime::Handle,
    sync::{Mutex, OwnedMutexGuard},
    time,
};
use tokio_util::sync::CancellationToken;

use super::{EditSession, WorkflowError, WorkflowState};
use crate::{
    charts::{ChartDataset, ChartType, OverwritePreview},
    email::EmailAddress,
    log_debug, log_error, log_info, log_warn,
    notify::{NotificationLevel, Notifier},
    store::{CustomValueStore, StoredRecord},
};

const ENABLE_LOGS: bool = true;

pub const SAVE_SUCCESS_MESSAGE: &str = "Custom values saved successfully!";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot<D> {
    pub chart_type: ChartType,
    pub state: WorkflowState,
    pub busy: bool,
    pub email: Option<EmailAddress>,
    pub displayed: D,
    pub working: Option<D>,
    pub preview: Option<OverwritePreview>,
}

/// Drives the custom-value edit flow for one chart.
///
/// Cloning is cheap and every clone drives the same flow. The session lock is
/// released while the store is being called, so a second request arriving in
/// the meantime sees `CheckingExisting`/`Saving` and is rejected as busy.
#[derive(Clone)]
pub struct EditWorkflow<D: ChartDataset> {
    session: Arc<Mutex<EditSession<D>>>,
    store: Arc<dyn CustomValueStore>,
    notifier: Arc<dyn Notifier>,
    request_timeout: Duration,
}

impl<D: ChartDataset> EditWorkflow<D> {
    pub fn new(
        displayed: D,
        store: Arc<dyn CustomValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(EditSession::new(displayed))),
            store,
            notifier,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn chart_type(&self) -> ChartType {
        D::CHART_TYPE
    }

    pub async fn state(&self) -> WorkflowState {
        self.session.lock().await.status
    }

    pub async fn is_busy(&self) -> bool {
        self.session.lock().await.status.is_busy()
    }

    pub async fn displayed(&self) -> D {
        self.session.lock().await.displayed.clone()
    }

    pub async fn working_copy(&self) -> Option<D> {
        self.session.lock().await.working.clone()
    }

    pub async fn overwrite_preview(&self) -> Option<OverwritePreview> {
        self.session
            .lock()
            .await
            .previous
            .as_ref()
            .map(D::preview)
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot<D> {
        let guard = self.session.lock().await;
        WorkflowSnapshot {
            chart_type: D::CHART_TYPE,
            state: guard.status,
            busy: guard.status.is_busy(),
            email: guard.email.clone(),
            displayed: guard.displayed.clone(),
            working: guard.working.clone(),
            preview: guard.previous.as_ref().map(D::preview),
        }
    }

    /// "Edit values" pressed on the chart.
    pub async fn begin_edit(&self) -> Result<WorkflowState, WorkflowError> {
        self.transition(|session| session.open_email_capture()).await
    }

    pub async fn close_email_capture(&self) -> Result<WorkflowState, WorkflowError> {
        self.transition(|session| session.close_email_capture()).await
    }

    /// Validates `input`, then looks up any record already saved under it.
    ///
    /// Lands in `OverwriteConfirm` when one exists and in `Editing` when not.
    /// A failed lookup is never read as "nothing saved": it is reported and
    /// the flow goes back to `EmailCapture`.
    pub async fn submit_email(&self, input: &str) -> Result<WorkflowState, WorkflowError> {
        let (email, request) = {
            let mut session = self.session.lock().await;
            let email = session.begin_lookup(input)?;
            (email, self.begin_request(&mut session))
        };
        log_info!("Checking saved {} values for {}", D::CHART_TYPE, email);

        let lookup = self
            .bounded(&request.token, self.store.lookup(&email, D::CHART_TYPE))
            .await;

        let outcome = lookup.and_then(|record| match record {
            Some(record) => D::from_chart_data(record.chart_data)
                .map(Some)
                .ok_or_else(|| anyhow!("saved record has the wrong shape for {}", D::CHART_TYPE)),
            None => Ok(None),
        });

        let mut session = request.settle().await;
        match outcome {
            Ok(existing) => {
                session.resolve_lookup(existing);
                log_info!("{} workflow is now {}", D::CHART_TYPE, session.status);
                Ok(session.status)
            }
            Err(err) => {
                session.fail_lookup();
                drop(session);
                let message = format!("{err:#}");
                log_warn!("Lookup for {} failed: {}", email, message);
                let err = WorkflowError::Lookup(message);
                self.notifier.notify(&err.to_string(), NotificationLevel::Error);
                Err(err)
            }
        }
    }

    pub async fn confirm_overwrite(&self) -> Result<WorkflowState, WorkflowError> {
        self.transition(|session| session.confirm_overwrite()).await
    }

    /// Keeps the saved values: they replace what is currently displayed.
    pub async fn decline_overwrite(&self) -> Result<WorkflowState, WorkflowError> {
        self.transition(|session| session.decline_overwrite()).await
    }

    pub async fn edit(&self, edit: D::Edit) -> Result<(), WorkflowError> {
        log_debug!("Applying {:?} to {} working copy", edit, D::CHART_TYPE);
        self.session.lock().await.apply_edit(edit)
    }

    /// Persists the working copy. On success it becomes the displayed
    /// dataset; on failure the flow returns to `Editing` with the copy intact.
    pub async fn save(&self) -> Result<WorkflowState, WorkflowError> {
        let (email, committed, request) = {
            let mut session = self.session.lock().await;
            let (email, committed) = session.begin_save()?;
            (email, committed, self.begin_request(&mut session))
        };
        log_info!("Saving {} values for {}", D::CHART_TYPE, email);

        let record = StoredRecord::new(email, committed.clone().into_chart_data());
        let result = self
            .bounded(&request.token, self.store.upsert(record, &request.token))
            .await;

        let mut session = request.settle().await;
        match result {
            Ok(()) => {
                session.complete_save(committed);
                drop(session);
                self.notifier
                    .notify(SAVE_SUCCESS_MESSAGE, NotificationLevel::Success);
                Ok(WorkflowState::Idle)
            }
            Err(err) => {
                session.fail_save();
                drop(session);
                let message = format!("{err:#}");
                log_error!("Saving {} values failed: {}", D::CHART_TYPE, message);
                let err = WorkflowError::Save(message);
                self.notifier.notify(&err.to_string(), NotificationLevel::Error);
                Err(err)
            }
        }
    }

    pub async fn cancel_edit(&self) -> Result<WorkflowState, WorkflowError> {
        self.transition(|session| session.cancel_edit()).await
    }

    /// Aborts an outstanding lookup or save. The aborted call resolves as a
    /// failure and a cancelled save is never committed. Returns false when
    /// nothing was pending.
    pub async fn cancel_pending(&self) -> bool {
        match self.session.lock().await.pending.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn transition<F>(&self, apply: F) -> Result<WorkflowState, WorkflowError>
    where
        F: FnOnce(&mut EditSession<D>) -> Result<(), WorkflowError>,
    {
        let mut session = self.session.lock().await;
        apply(&mut session)?;
        log_info!("{} workflow is now {}", D::CHART_TYPE, session.status);
        Ok(session.status)
    }

    /// Arms the cancellation token in the same critical section that set
    /// the busy state.
    fn begin_request(&self, session: &mut EditSession<D>) -> InFlight<D> {
        let token = CancellationToken::new();
        session.pending = Some(token.clone());
        InFlight {
            session: self.session.clone(),
            token,
            settled: false,
        }
    }

    async fn bounded<T>(
        &self,
        token: &CancellationToken,
        request: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            _ = token.cancelled() => Err(anyhow!("request cancelled")),
            outcome = time::timeout(self.request_timeout, request) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    token.cancel();
                    Err(anyhow!(
                        "request timed out after {}ms",
                        self.request_timeout.as_millis()
                    ))
                }
            },
        }
    }
}

/// An outstanding lookup or save.
///
/// If the future driving the request is dropped before [`InFlight::settle`],
/// the request is cancelled and the busy state is rolled back, so the flow
/// never stays stuck in `CheckingExisting` or `Saving`.
struct InFlight<D: ChartDataset> {
    session: Arc<Mutex<EditSession<D>>>,
    token: CancellationToken,
    settled: bool,
}

impl<D: ChartDataset> InFlight<D> {
    /// Locks the session so the caller can apply the outcome.
    async fn settle(mut self) -> OwnedMutexGuard<EditSession<D>> {
        let mut session = self.session.clone().lock_owned().await;
        session.pending = None;
        self.settled = true;
        session
    }
}

impl<D: ChartDataset> Drop for InFlight<D> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.token.cancel();

        if let Ok(mut session) = self.session.try_lock() {
            if session.abandon_request() {
                log_warn!("{} request abandoned, back to {}", D::CHART_TYPE, session.status);
            }
            return;
        }

        let session = self.session.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let mut session = session.lock().await;
                    if session.abandon_request() {
                        log_warn!("{} request abandoned, back to {}", D::CHART_TYPE, session.status);
                    }
                });
            }
            Err(_) => log_error!("{} request abandoned outside a runtime", D::CHART_TYPE),
        }
    }
}
