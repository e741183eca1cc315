//! Text rendering for CLI output.
//!
//! Builds human-readable lines for the employee view, the admin listing and scan
//! results. Nothing here performs I/O.

use crate::api::asset_url;
use crate::expiry::{days_until, format_short_date, parse_wire_date, status_badge};
use crate::model::{
    AdminDocumentPage, DocumentKind, EmployeeRef, Notification, TravelDocumentRecord,
};
use crate::notifications::InboxView;
use crate::scanner::ScanReport;
use crate::workflow::SubmissionState;
use time::Date;

fn date_or_dash(raw: Option<&str>) -> String {
    match raw {
        Some(r) => parse_wire_date(r)
            .map(crate::expiry::format_wire_date)
            .unwrap_or_else(|| r.to_string()),
        None => "-".into(),
    }
}

fn record_lines(record: &TravelDocumentRecord, api_base: &str) -> Vec<String> {
    let mut lines = vec![
        "Passport details".to_string(),
        format!(
            "  Full name (as per documents): {}",
            record.full_name_as_per_documents
        ),
        format!(
            "  Date of birth: {}",
            date_or_dash(record.date_of_birth.as_deref())
        ),
        format!("  Passport number: {}", record.passport_number),
        format!(
            "  Passport expiry date: {}",
            date_or_dash(record.passport_expiry_date.as_deref())
        ),
    ];
    if let Some(url) = record.image_url(DocumentKind::Passport) {
        lines.push(format!("  Passport image: {}", asset_url(api_base, url)));
    }
    lines.push("Visa details".to_string());
    lines.push(format!("  Visa number: {}", record.visa_number));
    lines.push(format!(
        "  Visa expiry date: {}",
        date_or_dash(record.visa_expiry_date.as_deref())
    ));
    if let Some(url) = record.image_url(DocumentKind::Visa) {
        lines.push(format!("  Visa image: {}", asset_url(api_base, url)));
    }
    lines
}

pub(crate) fn submission_lines(state: &SubmissionState, api_base: &str) -> Vec<String> {
    match state {
        SubmissionState::Unknown => vec!["Loading your document status...".into()],
        SubmissionState::Submitted(record) => {
            let mut lines = vec![
                "Your travel documents have been submitted and cannot be modified.".to_string(),
                "If you need to make changes to your submitted documents, please contact HR."
                    .to_string(),
            ];
            if let Some(record) = record {
                lines.extend(record_lines(record, api_base));
            }
            lines
        }
        SubmissionState::NotSubmitted(draft) => {
            let mut lines = vec![
                "Please provide your passport and visa details as they appear on your documents."
                    .to_string(),
            ];
            if let Some(draft) = draft {
                lines.push("Saved draft:".to_string());
                lines.extend(record_lines(draft, api_base));
            }
            lines.push(
                "Submit once with `travel-docs submit`; documents lock after submission.".into(),
            );
            lines
        }
    }
}

fn expiry_cell(record: &TravelDocumentRecord, kind: DocumentKind, today: Date) -> String {
    match record.expiry_date(kind) {
        Some(expiry) => format!(
            "Expires: {} [{}]",
            format_short_date(expiry),
            status_badge(days_until(expiry, today))
        ),
        None => "Expires: - [no date]".to_string(),
    }
}

pub(crate) fn listing_lines(
    page: &AdminDocumentPage,
    current_page: u32,
    today: Date,
) -> Vec<String> {
    if page.documents.is_empty() {
        return vec!["No travel documents found.".into()];
    }
    let mut lines = Vec::new();
    for doc in &page.documents {
        let contact = match doc.employee_id.as_ref() {
            Some(EmployeeRef::Populated(e)) => e
                .email
                .as_deref()
                .map(|m| format!(" <{m}>"))
                .unwrap_or_default(),
            _ => String::new(),
        };
        lines.push(format!("{}{}", doc.employee_name(), contact));
        for kind in DocumentKind::ALL {
            let label = match kind {
                DocumentKind::Passport => "Passport",
                DocumentKind::Visa => "Visa",
            };
            lines.push(format!(
                "  {label} {}: {}",
                doc.document_number(kind),
                expiry_cell(doc, kind, today)
            ));
        }
    }
    lines.push(format!(
        "Page {} of {}",
        current_page,
        page.pagination.pages.max(1)
    ));
    lines
}

pub(crate) fn scan_lines(report: &ScanReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Scanned {} records: {} new alerts, {} expired documents",
        report.scanned,
        report.alerts.len(),
        report.expired
    )];
    for n in &report.notified {
        lines.push(format!(
            "Notification created for {}'s {} (document {})",
            n.employee_name, n.kind, n.document_id
        ));
    }
    if report.notification_failures > 0 {
        lines.push(format!(
            "{} notifications could not be created",
            report.notification_failures
        ));
    }
    if report.evicted > 0 {
        lines.push(format!(
            "Forgot {} earlier alerts for documents no longer listed",
            report.evicted
        ));
    }
    lines
}

fn age_label(created_at: Option<&str>, today: Date) -> String {
    match created_at.and_then(parse_wire_date) {
        Some(created) => match days_until(today, created) {
            d if d <= 0 => "today".to_string(),
            1 => "1 day ago".to_string(),
            d => format!("{d} days ago"),
        },
        None => "-".to_string(),
    }
}

fn notification_line(n: &Notification, today: Date) -> String {
    let marker = if n.is_read { ' ' } else { '*' };
    let sender = n
        .employee_id
        .as_ref()
        .map(|e| format!("{}: ", e.display_name()))
        .unwrap_or_default();
    format!(
        "{marker} [{}] {sender}{} ({}) id={}",
        n.kind,
        n.message,
        age_label(n.created_at.as_deref(), today),
        n.id
    )
}

pub(crate) fn inbox_lines(view: &InboxView, today: Date) -> Vec<String> {
    if view.notifications.is_empty() {
        return vec!["No notifications to display".into()];
    }
    let mut lines = vec![format!(
        "Activity notifications: {} unread",
        view.unread()
    )];
    lines.extend(view.notifications.iter().map(|n| notification_line(n, today)));
    lines
}
