//! Sidebar badge counters.
//!
//! The expiring-documents badge stays hidden once the admin has looked at the listing,
//! until the server-side count changes. Seen-state lives in the session so it is created
//! at login and dropped at logout.

use crate::api::HrApi;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeState {
    /// Expiring count at the moment the admin last opened the listing.
    #[serde(default)]
    pub seen_expiring_count: Option<u64>,
    /// When that happened (RFC 3339).
    #[serde(default)]
    pub last_viewed_at: Option<String>,
    /// Most recent count reported by a poll.
    #[serde(default)]
    pub latest_expiring_count: Option<u64>,
}

impl BadgeState {
    pub fn observe_expiring(&mut self, count: u64) {
        self.latest_expiring_count = Some(count);
    }

    /// The admin opened the listing while `count` documents were expiring.
    pub fn mark_viewed(&mut self, count: u64, now: String) {
        self.latest_expiring_count = Some(count);
        if count == 0 {
            return;
        }
        self.seen_expiring_count = Some(count);
        self.last_viewed_at = Some(now);
    }

    /// Shown while something is expiring and the count differs from the one last viewed.
    pub fn show_expiring_badge(&self, count: u64) -> bool {
        count > 0 && self.seen_expiring_count != Some(count)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeSnapshot {
    pub expiring: Option<u64>,
    pub unread: Option<u64>,
    pub show_expiring: bool,
}

impl BadgeSnapshot {
    pub fn to_message(&self) -> String {
        let expiring = match self.expiring {
            Some(n) if self.show_expiring => format!("{n} (new)"),
            Some(n) => n.to_string(),
            None => "-".into(),
        };
        let unread = self
            .unread
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".into());
        format!("Expiring documents: {expiring} | Unread notifications: {unread}")
    }
}

/// Poll both counters once. A failed counter is reported as `None` and leaves the
/// seen-state untouched.
pub async fn poll_badges<A: HrApi>(api: &A, state: &mut BadgeState) -> BadgeSnapshot {
    let unread = match api.unread_notification_count().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(error = %e, "failed to fetch notification count");
            None
        }
    };
    let expiring = match api.expiring_document_count().await {
        Ok(n) => {
            state.observe_expiring(n);
            Some(n)
        }
        Err(e) => {
            warn!(error = %e, "failed to fetch expiring documents count");
            None
        }
    };
    BadgeSnapshot {
        expiring,
        unread,
        show_expiring: expiring.is_some_and(|n| state.show_expiring_badge(n)),
    }
}
