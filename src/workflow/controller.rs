use super::form::{SubmissionForm, ValidationError};
use super::status::{resolve_submission_state, SubmissionState};
use crate::api::{ApiError, HrApi};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The server refused or could not be reached; local state is unchanged.
    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: ApiError,
    },
    /// Another session locked the documents first.
    #[error("Documents have already been submitted and cannot be modified.")]
    AlreadySubmitted,
}

/// One-way latch: once engaged it stays engaged for the controller's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionLock(bool);

impl SubmissionLock {
    pub fn engage(&mut self) {
        self.0 = true;
    }

    pub fn is_engaged(&self) -> bool {
        self.0
    }
}

/// Drives the employee's travel-document page: resolve, show, submit once.
pub struct SubmissionController<'a, A> {
    api: &'a A,
    state: SubmissionState,
    lock: SubmissionLock,
}

impl<'a, A: HrApi> SubmissionController<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            state: SubmissionState::Unknown,
            lock: SubmissionLock::default(),
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_engaged()
    }

    /// Apply a newly observed state without ever unlocking.
    fn observe(&mut self, next: SubmissionState) {
        let next = match next {
            SubmissionState::Submitted(record) => {
                self.lock.engage();
                SubmissionState::Submitted(record.or_else(|| self.state.record().cloned()))
            }
            _ if self.lock.is_engaged() => {
                SubmissionState::Submitted(next.record().or(self.state.record()).cloned())
            }
            other => other,
        };
        self.state = next;
    }

    pub async fn load(&mut self) -> &SubmissionState {
        let next = resolve_submission_state(self.api).await;
        self.observe(next);
        &self.state
    }

    /// Validate, re-check the lock against the server, then POST once.
    pub async fn submit(&mut self, mut form: SubmissionForm) -> Result<(), WorkflowError> {
        if self.lock.is_engaged() {
            return Err(WorkflowError::AlreadySubmitted);
        }
        let existing = self.state.record().cloned();
        if let Some(draft) = existing.as_ref() {
            form.prefill_from(draft);
        }
        let submission = form.validate(existing.as_ref())?;

        match self.api.submission_status().await {
            Ok(status) if status.is_submitted => {
                warn!("documents were submitted from another session");
                self.observe(SubmissionState::Submitted(None));
                return Err(WorkflowError::AlreadySubmitted);
            }
            Ok(_) => {}
            // Best effort: a failed re-check does not block the submission.
            Err(e) => warn!(error = %e, "could not verify submission status before submit"),
        }

        self.api
            .submit_travel_documents(&submission)
            .await
            .map_err(|source| WorkflowError::Api {
                message: source.user_message("Failed to submit travel documents"),
                source,
            })?;
        info!(
            attachments = submission.attachments().count(),
            "travel documents submitted"
        );

        let refreshed = match self.api.my_travel_documents().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "failed to refresh travel documents after submit");
                None
            }
        };
        self.observe(SubmissionState::Submitted(
            refreshed.or_else(|| Some(submission.to_record())),
        ));
        Ok(())
    }
}
