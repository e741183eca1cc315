//! Expiry alert scanner.
//!
//! Each scan fetches every travel-document record, raises one transient alert per
//! (kind, document, day-count) inside the alert window, and asks the server to store a
//! notification on the day a document hits exactly [`NOTIFY_AT_DAYS`].

mod ledger;

pub use ledger::{AlertKey, AlertLedger};

use crate::api::{ApiError, HrApi};
use crate::expiry::{days_until, format_long_date};
use crate::model::{
    AdminDocumentQuery, DocumentKind, ExpiryAlert, NotificationMetadata, NotificationRequest,
    TravelDocumentRecord,
};
use std::collections::HashSet;
use time::Date;
use tracing::{debug, info, warn};

/// Alerts fire while `0 <= days_remaining <= ALERT_WINDOW_DAYS`.
pub const ALERT_WINDOW_DAYS: i64 = 10;
/// Server notifications are requested only on this exact day-count.
pub const NOTIFY_AT_DAYS: i64 = 10;
/// Page size used while walking the admin listing.
pub const SCAN_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifiedDocument {
    pub document_id: String,
    pub employee_name: String,
    pub kind: DocumentKind,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub scanned: usize,
    pub alerts: Vec<ExpiryAlert>,
    pub notified: Vec<NotifiedDocument>,
    pub notification_failures: usize,
    pub expired: usize,
    pub evicted: usize,
}

#[derive(Debug, Default)]
pub struct ExpiryScanner {
    ledger: AlertLedger,
}

fn notification_for(
    doc: &TravelDocumentRecord,
    kind: DocumentKind,
    expiry: Date,
) -> Option<NotificationRequest> {
    let employee = doc.employee_id.as_ref()?;
    let message = format!(
        "{}'s {} will expire in {} days on {}.",
        doc.employee_name(),
        kind,
        NOTIFY_AT_DAYS,
        format_long_date(expiry)
    );
    Some(NotificationRequest {
        kind: "document".into(),
        message,
        employee_id: employee.id().to_string(),
        metadata: NotificationMetadata {
            document_type: kind,
            expiry_date: doc.expiry_raw(kind).unwrap_or_default().to_string(),
        },
    })
}

/// Walk the listing until the server's page count is reached or a page comes back empty.
async fn fetch_all_documents<A: HrApi>(api: &A) -> Result<Vec<TravelDocumentRecord>, ApiError> {
    let mut documents = Vec::new();
    let mut page = 1;
    loop {
        let resp = api
            .admin_travel_documents(&AdminDocumentQuery::all_documents_page(page, SCAN_PAGE_SIZE))
            .await?;
        let fetched = resp.documents.len();
        documents.extend(resp.documents);
        if fetched == 0 || page >= resp.pagination.pages {
            break;
        }
        page += 1;
    }
    debug!(pages = page, documents = documents.len(), "fetched travel documents");
    Ok(documents)
}

impl ExpiryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &AlertLedger {
        &self.ledger
    }

    /// Fetch all records and evaluate them against `today`.
    ///
    /// Only the listing fetch can fail the scan; notification failures are counted and
    /// logged.
    pub async fn scan<A: HrApi>(&mut self, api: &A, today: Date) -> Result<ScanReport, ApiError> {
        let documents = fetch_all_documents(api).await?;
        Ok(self.evaluate(api, &documents, today).await)
    }

    async fn evaluate<A: HrApi>(
        &mut self,
        api: &A,
        documents: &[TravelDocumentRecord],
        today: Date,
    ) -> ScanReport {
        let mut report = ScanReport {
            scanned: documents.len(),
            ..Default::default()
        };
        let mut due: Vec<(&TravelDocumentRecord, DocumentKind, Date)> = Vec::new();

        for doc in documents {
            let Some(id) = doc.id.as_deref() else {
                debug!("skipping travel document without id");
                continue;
            };
            for kind in DocumentKind::ALL {
                let Some(expiry) = doc.expiry_date(kind) else {
                    continue;
                };
                let days = days_until(expiry, today);
                if days < 0 {
                    report.expired += 1;
                    continue;
                }
                if days <= ALERT_WINDOW_DAYS {
                    let key = AlertKey {
                        kind,
                        document_id: id.to_string(),
                        days_remaining: days,
                    };
                    if self.ledger.insert(key) {
                        report.alerts.push(ExpiryAlert {
                            kind,
                            document_id: id.to_string(),
                            employee_name: doc.employee_name(),
                            days_remaining: days,
                        });
                        // Piggybacks on the ledger so rescans never repeat the request.
                        if days == NOTIFY_AT_DAYS {
                            due.push((doc, kind, expiry));
                        }
                    }
                }
            }
        }

        for (doc, kind, expiry) in due {
            let Some(notification) = notification_for(doc, kind, expiry) else {
                warn!(%kind, "document has no employee reference, skipping notification");
                continue;
            };
            match api.create_admin_notification(&notification).await {
                Ok(()) => {
                    info!(
                        employee = %notification.employee_id,
                        %kind,
                        "expiry notification created"
                    );
                    report.notified.push(NotifiedDocument {
                        document_id: doc.id.clone().unwrap_or_default(),
                        employee_name: doc.employee_name(),
                        kind,
                    });
                }
                Err(e) => {
                    warn!(error = %e, %kind, "failed to create expiry notification");
                    report.notification_failures += 1;
                }
            }
        }

        let live: HashSet<&str> = documents.iter().filter_map(|d| d.id.as_deref()).collect();
        report.evicted = self.ledger.retain_documents(&live);
        if report.evicted > 0 {
            debug!(evicted = report.evicted, "dropped alert history of removed documents");
        }
        report
    }
}
