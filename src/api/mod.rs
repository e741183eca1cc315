//! HR API surface used by the travel-document workflow.
//!
//! `HrApi` is the seam between workflow logic and the wire: `HttpClient` talks to the
//! real server, tests use an in-memory fake.

mod client;
#[cfg(test)]
pub(crate) mod fake;

pub use client::{ClientConfig, HttpClient};

use crate::model::{
    AdminDocumentPage, AdminDocumentQuery, LeaveBalance, LeaveRequest, LoginRequest,
    LoginResponse, Notification, NotificationRequest, SubmissionStatus, TravelDocumentRecord,
    TravelDocumentSubmission,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(
        "server returned {status}{}",
        .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    Status { status: u16, message: Option<String> },
    #[error("invalid request url {0}")]
    Url(String),
}

impl ApiError {
    /// Message to show the user: what the server said, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait HrApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    async fn submission_status(&self) -> Result<SubmissionStatus, ApiError>;

    /// The caller's own record; `None` when nothing was saved yet.
    async fn my_travel_documents(&self) -> Result<Option<TravelDocumentRecord>, ApiError>;

    async fn submit_travel_documents(
        &self,
        submission: &TravelDocumentSubmission,
    ) -> Result<(), ApiError>;

    async fn admin_travel_documents(
        &self,
        query: &AdminDocumentQuery,
    ) -> Result<AdminDocumentPage, ApiError>;

    async fn expiring_document_count(&self) -> Result<u64, ApiError>;

    async fn unread_notification_count(&self) -> Result<u64, ApiError>;

    async fn create_admin_notification(
        &self,
        notification: &NotificationRequest,
    ) -> Result<(), ApiError>;

    async fn admin_notifications(&self) -> Result<Vec<Notification>, ApiError>;

    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError>;

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError>;

    async fn leave_balance(&self) -> Result<LeaveBalance, ApiError>;

    async fn apply_leave(&self, request: &LeaveRequest) -> Result<(), ApiError>;
}

/// Turn a server-relative upload path into an absolute URL on the API's origin.
pub fn asset_url(api_base: &str, path: &str) -> String {
    if path.starts_with("http") {
        return path.to_string();
    }
    let origin = api_base.trim_end_matches('/');
    let origin = origin.strip_suffix("/api").unwrap_or(origin);
    format!("{origin}{path}")
}
