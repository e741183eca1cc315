//! Authenticated session persisted between invocations.
//!
//! The file holds the bearer token, who is logged in, and the badge seen-state. It is
//! written by `login`, updated by badge polling and listing views, and deleted by
//! `logout`.

use crate::api::HrApi;
use crate::badge::BadgeState;
use crate::model::{LoginRequest, SessionUser};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    #[serde(default)]
    pub badge: BadgeState,
}

impl Session {
    pub fn new(token: String, user: SessionUser) -> Self {
        Self {
            token,
            user,
            badge: BadgeState::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

/// Default session file under the user's config directory.
pub fn default_session_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no config directory for this platform")?;
    Ok(base.join("travel-docs-cli").join("session.json"))
}

impl SessionStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("parse session file {}", self.path.display()))?;
        Ok(Some(session))
    }

    /// Load the session or fail with a hint to log in.
    pub fn require(&self) -> Result<Session> {
        self.load()?
            .context("not logged in; run `travel-docs login` first")
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(session)?;
        std::fs::write(&tmp, body).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

    /// Remove the session file; returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }

    /// Load, mutate and write back the badge state of the current session.
    pub fn update_badge(&self, f: impl FnOnce(&mut BadgeState)) -> Result<()> {
        let mut session = self.require()?;
        f(&mut session.badge);
        self.save(&session)
    }
}

/// Authenticate and replace whatever session was stored. A failed login leaves the
/// stored session alone.
pub async fn log_in<A: HrApi>(
    api: &A,
    store: &SessionStore,
    request: &LoginRequest,
) -> Result<Session> {
    let resp = api
        .login(request)
        .await
        .map_err(|e| anyhow!(e.user_message("Failed to login")))?;
    let session = Session::new(
        resp.token,
        SessionUser {
            id: resp.id,
            username: resp.username,
            role: resp.role,
        },
    );
    store.save(&session)?;
    info!(user = %session.user.username, path = %store.path().display(), "logged in");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            id: "u1".into(),
            username: "hr-admin".into(),
            role: "admin".into(),
        }
    }

    #[test]
    fn missing_file_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        assert!(store.load().unwrap().is_none());
        assert!(store.require().is_err());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn save_then_load_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("nested").join("session.json"));
        let session = Session::new("tok".into(), user());
        store.save(&session).unwrap();

        assert_eq!(store.load().unwrap(), Some(session));
        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn badge_state_lives_and_dies_with_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        store.save(&Session::new("tok".into(), user())).unwrap();

        store
            .update_badge(|b| b.mark_viewed(3, "2026-10-19T09:00:00Z".into()))
            .unwrap();
        assert_eq!(store.require().unwrap().badge.seen_expiring_count, Some(3));

        store.clear().unwrap();
        store.save(&Session::new("tok2".into(), user())).unwrap();
        assert_eq!(store.require().unwrap().badge, BadgeState::default());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SessionStore::at(path).load().is_err());
    }

    #[tokio::test]
    async fn login_stores_fresh_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        let mut stale = Session::new("old".into(), user());
        stale.badge.mark_viewed(4, "2026-10-18T09:00:00Z".into());
        store.save(&stale).unwrap();

        let api = crate::api::fake::FakeApi::default();
        let session = log_in(
            &api,
            &store,
            &LoginRequest {
                username: "hr-admin".into(),
                password: "secret".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(session.token, "tok");
        assert!(session.user.is_admin());
        assert_eq!(store.require().unwrap(), session);
        assert_eq!(session.badge, BadgeState::default());
    }

    #[tokio::test]
    async fn rejected_login_keeps_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        let previous = Session::new("old".into(), user());
        store.save(&previous).unwrap();

        let api = crate::api::fake::FakeApi::default();
        let err = log_in(
            &api,
            &store,
            &LoginRequest {
                username: "hr-admin".into(),
                password: "wrong".into(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(store.require().unwrap(), previous);
    }

    #[test]
    fn update_badge_requires_login() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        assert!(store.update_badge(|b| b.observe_expiring(1)).is_err());
    }
}
