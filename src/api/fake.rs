use super::{ApiError, HrApi};
use crate::model::{
    AdminDocumentPage, AdminDocumentQuery, LeaveBalance, LeaveRequest, LoginRequest,
    LoginResponse, Notification, NotificationRequest, Pagination, SubmissionStatus,
    TravelDocumentRecord, TravelDocumentSubmission,
};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Scriptable server state. `*_fails` flags make the matching endpoint return a 500.
#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub submitted: bool,
    pub status_fails: bool,
    pub record: Option<TravelDocumentRecord>,
    pub record_fails: bool,
    pub submit_fails: bool,
    pub submissions: Vec<TravelDocumentSubmission>,
    pub status_calls: usize,
    pub record_calls: usize,

    pub documents: Vec<TravelDocumentRecord>,
    pub listing_fails: bool,
    pub listing_queries: Vec<AdminDocumentQuery>,
    pub notifications: Vec<NotificationRequest>,
    pub notification_fails: bool,
    pub inbox: Vec<Notification>,

    pub expiring_count: u64,
    pub unread_count: u64,
    pub counts_fail: bool,
    /// Held before answering either counter, with the lock released.
    pub count_delay: Duration,

    pub balance: Option<LeaveBalance>,
    pub leaves: Vec<LeaveRequest>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

fn server_error(message: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        message: Some(message.to_string()),
    }
}

impl FakeApi {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    async fn counter(&self, read: impl Fn(&FakeState) -> u64) -> Result<u64, ApiError> {
        let delay = self.state().count_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let s = self.state();
        if s.counts_fail {
            return Err(server_error("count unavailable"));
        }
        Ok(read(&s))
    }
}

impl HrApi for FakeApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        if request.password != "secret" {
            return Err(ApiError::Status {
                status: 401,
                message: Some("Invalid credentials".into()),
            });
        }
        Ok(LoginResponse {
            token: "tok".into(),
            id: "u1".into(),
            username: request.username.clone(),
            role: "admin".into(),
        })
    }

    async fn submission_status(&self) -> Result<SubmissionStatus, ApiError> {
        let mut s = self.state();
        s.status_calls += 1;
        if s.status_fails {
            return Err(server_error("status unavailable"));
        }
        Ok(SubmissionStatus {
            is_submitted: s.submitted,
        })
    }

    async fn my_travel_documents(&self) -> Result<Option<TravelDocumentRecord>, ApiError> {
        let mut s = self.state();
        s.record_calls += 1;
        if s.record_fails {
            return Err(server_error("record unavailable"));
        }
        Ok(s.record.clone())
    }

    async fn submit_travel_documents(
        &self,
        submission: &TravelDocumentSubmission,
    ) -> Result<(), ApiError> {
        let mut s = self.state();
        if s.submit_fails {
            return Err(ApiError::Status {
                status: 400,
                message: Some("Upload rejected".into()),
            });
        }
        s.submissions.push(submission.clone());
        s.submitted = true;
        let mut record = submission.to_record();
        record.passport_image_url = Some("/uploads/passport.jpg".into());
        record.visa_image_url = Some("/uploads/visa.jpg".into());
        s.record = Some(record);
        Ok(())
    }

    async fn admin_travel_documents(
        &self,
        query: &AdminDocumentQuery,
    ) -> Result<AdminDocumentPage, ApiError> {
        let mut s = self.state();
        s.listing_queries.push(query.clone());
        if s.listing_fails {
            return Err(server_error("listing unavailable"));
        }
        let total = s.documents.len();
        // Without a limit the whole set comes back as a single page.
        let limit = query.limit.map_or(total.max(1), |l| l.max(1) as usize);
        let page = query.page.unwrap_or(1).max(1) as usize;
        let documents = s
            .documents
            .iter()
            .skip((page - 1) * limit)
            .take(limit)
            .cloned()
            .collect();
        Ok(AdminDocumentPage {
            documents,
            pagination: Pagination {
                pages: total.div_ceil(limit).max(1) as u32,
                page: Some(page as u32),
                total: Some(total as u64),
            },
        })
    }

    async fn expiring_document_count(&self) -> Result<u64, ApiError> {
        self.counter(|s| s.expiring_count).await
    }

    async fn unread_notification_count(&self) -> Result<u64, ApiError> {
        self.counter(|s| s.unread_count).await
    }

    async fn create_admin_notification(
        &self,
        notification: &NotificationRequest,
    ) -> Result<(), ApiError> {
        let mut s = self.state();
        if s.notification_fails {
            return Err(server_error("notification store down"));
        }
        s.notifications.push(notification.clone());
        Ok(())
    }

    async fn admin_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        Ok(self.state().inbox.clone())
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        let mut s = self.state();
        let Some(n) = s.inbox.iter_mut().find(|n| n.id == id) else {
            return Err(ApiError::Status {
                status: 404,
                message: Some("Notification not found".into()),
            });
        };
        n.is_read = true;
        s.unread_count = s.unread_count.saturating_sub(1);
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        let mut s = self.state();
        s.inbox.iter_mut().for_each(|n| n.is_read = true);
        s.unread_count = 0;
        Ok(())
    }

    async fn leave_balance(&self) -> Result<LeaveBalance, ApiError> {
        self.state()
            .balance
            .ok_or_else(|| server_error("no balance"))
    }

    async fn apply_leave(&self, request: &LeaveRequest) -> Result<(), ApiError> {
        self.state().leaves.push(request.clone());
        Ok(())
    }
}
