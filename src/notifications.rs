//! Admin notification inbox: list entries and mark them read.

use crate::api::{ApiError, HrApi};
use crate::model::Notification;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxAction {
    List,
    MarkRead(String),
    MarkAllRead,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct InboxError {
    message: String,
    #[source]
    source: ApiError,
}

impl InboxError {
    fn wrap(fallback: &str) -> impl FnOnce(ApiError) -> InboxError + '_ {
        move |source| InboxError {
            message: source.user_message(fallback),
            source,
        }
    }
}

/// Inbox contents after an action, with the confirmation to show for it.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxView {
    pub confirmation: Option<&'static str>,
    pub notifications: Vec<Notification>,
}

impl InboxView {
    pub fn unread(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }
}

/// Apply `action`, then re-read the inbox so the view reflects the server.
pub async fn run_inbox_action<A: HrApi>(
    api: &A,
    action: &InboxAction,
) -> Result<InboxView, InboxError> {
    let confirmation = match action {
        InboxAction::List => None,
        InboxAction::MarkRead(id) => {
            api.mark_notification_read(id)
                .await
                .map_err(InboxError::wrap("Failed to update notification"))?;
            info!(%id, "notification marked read");
            Some("Notification marked as read")
        }
        InboxAction::MarkAllRead => {
            api.mark_all_notifications_read()
                .await
                .map_err(InboxError::wrap("Failed to update notifications"))?;
            info!("all notifications marked read");
            Some("All notifications marked as read")
        }
    };
    let notifications = api
        .admin_notifications()
        .await
        .map_err(InboxError::wrap("Failed to load notifications"))?;
    Ok(InboxView {
        confirmation,
        notifications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, FakeState};

    fn entry(id: &str, read: bool) -> Notification {
        Notification {
            id: id.into(),
            kind: "document".into(),
            message: format!("message {id}"),
            employee_id: None,
            is_read: read,
            created_at: None,
        }
    }

    fn inbox() -> FakeApi {
        FakeApi::new(FakeState {
            inbox: vec![entry("n1", false), entry("n2", false), entry("n3", true)],
            unread_count: 2,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn listing_leaves_entries_untouched() {
        let api = inbox();
        let view = run_inbox_action(&api, &InboxAction::List).await.unwrap();
        assert!(view.confirmation.is_none());
        assert_eq!(view.notifications.len(), 3);
        assert_eq!(view.unread(), 2);
    }

    #[tokio::test]
    async fn marking_one_read_updates_the_unread_counter() {
        let api = inbox();
        let view = run_inbox_action(&api, &InboxAction::MarkRead("n2".into()))
            .await
            .unwrap();
        assert_eq!(view.confirmation, Some("Notification marked as read"));
        assert_eq!(view.unread(), 1);
        assert!(view.notifications.iter().any(|n| n.id == "n2" && n.is_read));
        assert_eq!(api.unread_notification_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn marking_all_read_clears_the_badge() {
        let api = inbox();
        let view = run_inbox_action(&api, &InboxAction::MarkAllRead)
            .await
            .unwrap();
        assert_eq!(view.unread(), 0);
        assert_eq!(api.unread_notification_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_id_reports_server_message() {
        let api = inbox();
        let err = run_inbox_action(&api, &InboxAction::MarkRead("nope".into()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Notification not found");
        assert_eq!(api.state().unread_count, 2);
    }
}
