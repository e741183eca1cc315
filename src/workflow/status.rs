use crate::api::HrApi;
use crate::model::TravelDocumentRecord;
use tracing::{debug, warn};

/// Where the employee stands with their one-time submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionState {
    /// Status not confirmed yet; only a loading indicator is shown.
    #[default]
    Unknown,
    /// Locked. Carries the record for the read-only view when it could be fetched.
    Submitted(Option<TravelDocumentRecord>),
    /// Editable. Carries a saved draft to prefill from, if any.
    NotSubmitted(Option<TravelDocumentRecord>),
}

impl SubmissionState {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmissionState::Submitted(_))
    }

    pub fn record(&self) -> Option<&TravelDocumentRecord> {
        match self {
            SubmissionState::Unknown => None,
            SubmissionState::Submitted(r) | SubmissionState::NotSubmitted(r) => r.as_ref(),
        }
    }
}

async fn fetch_record<A: HrApi>(api: &A) -> Option<TravelDocumentRecord> {
    match api.my_travel_documents().await {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "failed to fetch travel documents");
            None
        }
    }
}

/// Ask the status endpoint, falling back to the full record when it fails.
///
/// Never returns `Unknown`. If both endpoints fail the result is `NotSubmitted(None)` so
/// a first submission is never blocked by a flaky server.
pub async fn resolve_submission_state<A: HrApi>(api: &A) -> SubmissionState {
    match api.submission_status().await {
        Ok(status) if status.is_submitted => {
            debug!("status endpoint reports submitted");
            SubmissionState::Submitted(fetch_record(api).await)
        }
        Ok(_) => SubmissionState::NotSubmitted(fetch_record(api).await),
        Err(e) => {
            warn!(error = %e, "status endpoint failed, checking full record instead");
            match api.my_travel_documents().await {
                Ok(Some(record)) if record.is_submitted => {
                    SubmissionState::Submitted(Some(record))
                }
                Ok(record) => SubmissionState::NotSubmitted(record),
                Err(e) => {
                    warn!(error = %e, "fallback document check failed, assuming not submitted");
                    SubmissionState::NotSubmitted(None)
                }
            }
        }
    }
}
