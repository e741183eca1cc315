use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::Date;

/// The two travel documents tracked per employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Passport,
    Visa,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Passport, DocumentKind::Visa];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Passport => "passport",
            DocumentKind::Visa => "visa",
        }
    }

    /// Multipart field name used for this document's scan.
    pub fn image_field(self) -> &'static str {
        match self {
            DocumentKind::Passport => "passportImage",
            DocumentKind::Visa => "visaImage",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Employee as populated by the admin endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl EmployeeSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// `employeeId` is a bare id on employee endpoints and a populated object on admin ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmployeeRef {
    Populated(EmployeeSummary),
    Id(String),
}

impl EmployeeRef {
    pub fn id(&self) -> &str {
        match self {
            EmployeeRef::Populated(e) => &e.id,
            EmployeeRef::Id(id) => id,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            EmployeeRef::Populated(e) => {
                let name = e.full_name();
                if name.is_empty() {
                    e.id.clone()
                } else {
                    name
                }
            }
            EmployeeRef::Id(id) => id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelDocumentRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<EmployeeRef>,
    #[serde(default)]
    pub full_name_as_per_documents: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub passport_number: String,
    #[serde(default)]
    pub passport_expiry_date: Option<String>,
    #[serde(default)]
    pub visa_number: String,
    #[serde(default)]
    pub visa_expiry_date: Option<String>,
    #[serde(default)]
    pub passport_image_url: Option<String>,
    #[serde(default)]
    pub visa_image_url: Option<String>,
    #[serde(default)]
    pub is_submitted: bool,
}

impl TravelDocumentRecord {
    pub fn expiry_raw(&self, kind: DocumentKind) -> Option<&str> {
        match kind {
            DocumentKind::Passport => self.passport_expiry_date.as_deref(),
            DocumentKind::Visa => self.visa_expiry_date.as_deref(),
        }
    }

    pub fn expiry_date(&self, kind: DocumentKind) -> Option<Date> {
        self.expiry_raw(kind).and_then(crate::expiry::parse_wire_date)
    }

    pub fn image_url(&self, kind: DocumentKind) -> Option<&str> {
        match kind {
            DocumentKind::Passport => self.passport_image_url.as_deref(),
            DocumentKind::Visa => self.visa_image_url.as_deref(),
        }
    }

    pub fn document_number(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Passport => &self.passport_number,
            DocumentKind::Visa => &self.visa_number,
        }
    }

    pub fn employee_name(&self) -> String {
        self.employee_id
            .as_ref()
            .map(EmployeeRef::display_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.full_name_as_per_documents.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    #[serde(default)]
    pub is_submitted: bool,
}

/// Text part of a travel-document submission, in wire field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    pub full_name_as_per_documents: String,
    pub date_of_birth: String,
    pub passport_number: String,
    pub passport_expiry_date: String,
    pub visa_number: String,
    pub visa_expiry_date: String,
}

impl DocumentFields {
    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("fullNameAsPerDocuments", self.full_name_as_per_documents.as_str()),
            ("dateOfBirth", self.date_of_birth.as_str()),
            ("passportNumber", self.passport_number.as_str()),
            ("passportExpiryDate", self.passport_expiry_date.as_str()),
            ("visaNumber", self.visa_number.as_str()),
            ("visaExpiryDate", self.visa_expiry_date.as_str()),
        ]
    }
}

/// A scanned document image or PDF that already passed client-side checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub kind: DocumentKind,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TravelDocumentSubmission {
    pub fields: DocumentFields,
    pub passport_image: Option<Attachment>,
    pub visa_image: Option<Attachment>,
}

impl TravelDocumentSubmission {
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.passport_image.iter().chain(self.visa_image.iter())
    }

    /// Best local view of what the server stored, used when the refresh after submit fails.
    pub fn to_record(&self) -> TravelDocumentRecord {
        TravelDocumentRecord {
            full_name_as_per_documents: self.fields.full_name_as_per_documents.clone(),
            date_of_birth: Some(self.fields.date_of_birth.clone()),
            passport_number: self.fields.passport_number.clone(),
            passport_expiry_date: Some(self.fields.passport_expiry_date.clone()),
            visa_number: self.fields.visa_number.clone(),
            visa_expiry_date: Some(self.fields.visa_expiry_date.clone()),
            is_submitted: true,
            ..Default::default()
        }
    }
}

/// Value of the `expiryStatus` filter on the admin listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExpiryStatusFilter {
    #[default]
    All,
    Expired,
    ExpiringSoon,
    Approaching,
    Valid,
}

impl ExpiryStatusFilter {
    pub fn as_query_str(self) -> &'static str {
        match self {
            ExpiryStatusFilter::All => "all",
            ExpiryStatusFilter::Expired => "expired",
            ExpiryStatusFilter::ExpiringSoon => "expiring-soon",
            ExpiryStatusFilter::Approaching => "approaching",
            ExpiryStatusFilter::Valid => "valid",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminDocumentQuery {
    pub expiry_status: Option<ExpiryStatusFilter>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AdminDocumentQuery {
    /// One page of the unfiltered listing, as walked by the expiry scan.
    pub fn all_documents_page(page: u32, limit: u32) -> Self {
        Self {
            expiry_status: Some(ExpiryStatusFilter::All),
            search: None,
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(status) = self.expiry_status {
            pairs.push(("expiryStatus", status.as_query_str().to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "one")]
    pub pages: u32,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminDocumentPage {
    #[serde(default)]
    pub documents: Vec<TravelDocumentRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CountResponse {
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMetadata {
    pub document_type: DocumentKind,
    pub expiry_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub employee_id: String,
    pub metadata: NotificationMetadata,
}

/// Entry of the admin notification inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub employee_id: Option<EmployeeRef>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    #[serde(default)]
    pub total_leaves: f64,
    #[serde(default)]
    pub used_leaves: f64,
    #[serde(default)]
    pub remaining_leaves: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub start_date: String,
    pub end_date: String,
    pub number_of_days: u32,
    pub leave_type: String,
    pub reason: String,
}

/// Transient on-screen alert for a document about to expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryAlert {
    pub kind: DocumentKind,
    pub document_id: String,
    pub employee_name: String,
    pub days_remaining: i64,
}

impl ExpiryAlert {
    pub fn to_message(&self) -> String {
        let unit = if self.days_remaining == 1 { "day" } else { "days" };
        format!(
            "Critical document expiry alert: {}'s {} expires in {} {}!",
            self.employee_name, self.kind, self.days_remaining, unit
        )
    }
}

/// Events emitted by the watch controller for the output layer.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Alert(ExpiryAlert),
    Badges(crate::badge::BadgeSnapshot),
    Info(InfoEvent),
}

#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    NotificationCreated {
        employee: String,
        kind: DocumentKind,
    },
    ScanFailed(String),
}

impl InfoEvent {
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::NotificationCreated { employee, kind } => {
                format!("Created expiry notification for {employee}'s {kind}")
            }
            InfoEvent::ScanFailed(err) => {
                format!("Error checking for critical expiring documents: {err}")
            }
        }
    }
}
