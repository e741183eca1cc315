use super::{ApiError, HrApi};
use crate::model::{
    AdminDocumentPage, AdminDocumentQuery, Attachment, CountResponse, LeaveBalance, LeaveRequest,
    LoginRequest, LoginResponse, Notification, NotificationRequest, SubmissionStatus,
    TravelDocumentRecord, TravelDocumentSubmission,
};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

/// Error bodies look like `{ "message": "..." }`.
#[derive(Debug, Deserialize)]
struct ServerMessage {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|_| ApiError::Url(raw))
    }

    fn authorize(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.token.as_deref() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    async fn send(&self, rb: RequestBuilder) -> Result<Response, ApiError> {
        let resp = self.authorize(rb).send().await?;
        let status = resp.status();
        debug!(url = %resp.url(), status = status.as_u16(), "api response");
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<ServerMessage>()
            .await
            .ok()
            .and_then(|m| m.message);
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let rb = self.http.get(self.url(path)?).query(query);
        Ok(self.send(rb).await?.json::<T>().await?)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ApiError> {
        let rb = self.http.post(self.url(path)?).json(body);
        self.send(rb).await
    }

    async fn put(&self, path: &str) -> Result<Response, ApiError> {
        let rb = self.http.put(self.url(path)?);
        self.send(rb).await
    }
}

/// One named entry of the multipart submission body.
#[derive(Debug, PartialEq)]
enum FormEntry<'a> {
    Text(String),
    File(&'a Attachment),
}

/// The six document fields, the submit flag, then one part per attached scan.
fn submission_entries(
    submission: &TravelDocumentSubmission,
) -> Vec<(&'static str, FormEntry<'_>)> {
    let mut entries: Vec<(&'static str, FormEntry<'_>)> = submission
        .fields
        .pairs()
        .into_iter()
        .map(|(name, value)| (name, FormEntry::Text(value.to_string())))
        .collect();
    entries.push(("isSubmitted", FormEntry::Text("true".into())));
    for attachment in submission.attachments() {
        entries.push((attachment.kind.image_field(), FormEntry::File(attachment)));
    }
    entries
}

fn submission_form(submission: &TravelDocumentSubmission) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (name, entry) in submission_entries(submission) {
        form = match entry {
            FormEntry::Text(value) => form.text(name, value),
            FormEntry::File(attachment) => {
                let part = Part::bytes(attachment.bytes.to_vec())
                    .file_name(attachment.file_name.clone())
                    .mime_str(&attachment.mime)?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}

impl HrApi for HttpClient {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        Ok(self.post_json("auth/login", request).await?.json().await?)
    }

    async fn submission_status(&self) -> Result<SubmissionStatus, ApiError> {
        self.get_json("employees/travel-documents/status", &[]).await
    }

    async fn my_travel_documents(&self) -> Result<Option<TravelDocumentRecord>, ApiError> {
        self.get_json("employees/travel-documents", &[]).await
    }

    async fn submit_travel_documents(
        &self,
        submission: &TravelDocumentSubmission,
    ) -> Result<(), ApiError> {
        let form = submission_form(submission)?;
        let rb = self
            .http
            .post(self.url("employees/travel-documents")?)
            .multipart(form);
        self.send(rb).await?;
        Ok(())
    }

    async fn admin_travel_documents(
        &self,
        query: &AdminDocumentQuery,
    ) -> Result<AdminDocumentPage, ApiError> {
        self.get_json("admin/travel-documents", &query.to_pairs()).await
    }

    async fn expiring_document_count(&self) -> Result<u64, ApiError> {
        let resp: CountResponse = self
            .get_json("admin/travel-documents/expiring-count", &[])
            .await?;
        Ok(resp.count)
    }

    async fn unread_notification_count(&self) -> Result<u64, ApiError> {
        let resp: CountResponse = self.get_json("notifications/unread-count", &[]).await?;
        Ok(resp.count)
    }

    async fn create_admin_notification(
        &self,
        notification: &NotificationRequest,
    ) -> Result<(), ApiError> {
        self.post_json("notifications/admin", notification).await?;
        Ok(())
    }

    async fn admin_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get_json("notifications/admin", &[]).await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        self.put(&format!("notifications/{id}/read")).await?;
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.put("notifications/mark-all-read").await?;
        Ok(())
    }

    async fn leave_balance(&self) -> Result<LeaveBalance, ApiError> {
        self.get_json("leave/my-balance", &[]).await
    }

    async fn apply_leave(&self, request: &LeaveRequest) -> Result<(), ApiError> {
        self.post_json("leave", request).await?;
        Ok(())
    }
}
