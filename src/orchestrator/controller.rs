//! Watch-mode lifecycle controller.
//!
//! Owns the badge poll timer and the expiry scan timer, and emits events for the
//! presentation layer. Both timers are dropped when the shutdown future resolves.

use crate::api::HrApi;
use crate::badge::{poll_badges, BadgeState};
use crate::expiry;
use crate::model::{InfoEvent, WatchEvent};
use crate::scanner::ExpiryScanner;
use crate::session::SessionStore;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub(crate) struct WatchConfig {
    pub poll_interval: Duration,
    /// `None` scans once at start only.
    pub scan_interval: Option<Duration>,
}

async fn scan_once<A: HrApi>(
    api: &A,
    scanner: &mut ExpiryScanner,
    event_tx: &UnboundedSender<WatchEvent>,
) {
    match scanner.scan(api, expiry::today()).await {
        Ok(report) => {
            for alert in report.alerts {
                let _ = event_tx.send(WatchEvent::Alert(alert));
            }
            for n in report.notified {
                let _ = event_tx.send(WatchEvent::Info(InfoEvent::NotificationCreated {
                    employee: n.employee_name,
                    kind: n.kind,
                }));
            }
        }
        Err(e) => {
            warn!(error = %e, "expiry scan failed");
            let _ = event_tx.send(WatchEvent::Info(InfoEvent::ScanFailed(e.to_string())));
        }
    }
}

async fn poll_once<A: HrApi>(
    api: &A,
    store: &SessionStore,
    event_tx: &UnboundedSender<WatchEvent>,
) {
    // Re-read each time: another invocation may have marked the listing as viewed.
    let mut badge = match store.load() {
        Ok(Some(session)) => session.badge,
        Ok(None) => BadgeState::default(),
        Err(e) => {
            warn!(error = %e, "could not read session, badge state starts fresh");
            BadgeState::default()
        }
    };
    let snapshot = poll_badges(api, &mut badge).await;
    if let Some(count) = snapshot.expiring {
        if let Err(e) = store.update_badge(|b| b.observe_expiring(count)) {
            warn!(error = %e, "could not persist badge state");
        }
    }
    let _ = event_tx.send(WatchEvent::Badges(snapshot));
}

/// Drive `work` to completion unless `shutdown` fires first; true means stop.
async fn until_shutdown<F>(work: impl Future<Output = ()>, shutdown: &mut Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = shutdown.as_mut() => true,
        _ = work => false,
    }
}

fn stopped(event_tx: &UnboundedSender<WatchEvent>) {
    info!("watch stopped");
    let _ = event_tx.send(WatchEvent::Info(InfoEvent::Message("Stopping…".into())));
}

/// Run polling and scanning until `shutdown` resolves. In-flight requests are abandoned
/// when it does.
pub(crate) async fn run_watch<A, F>(
    api: &A,
    store: &SessionStore,
    cfg: WatchConfig,
    event_tx: UnboundedSender<WatchEvent>,
    shutdown: F,
) where
    A: HrApi,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut scanner = ExpiryScanner::new();
    if until_shutdown(scan_once(api, &mut scanner, &event_tx), &mut shutdown).await {
        stopped(&event_tx);
        return;
    }

    let mut poll = tokio::time::interval(cfg.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rescan = cfg.scan_interval.map(|every| {
        let mut i = tokio::time::interval_at(Instant::now() + every, every);
        i.set_missed_tick_behavior(MissedTickBehavior::Delay);
        i
    });

    loop {
        let stop = tokio::select! {
            _ = &mut shutdown => true,
            _ = poll.tick() => {
                until_shutdown(poll_once(api, store, &event_tx), &mut shutdown).await
            }
            _ = async {
                match rescan.as_mut() {
                    Some(i) => {
                        i.tick().await;
                    }
                    None => futures::future::pending::<()>().await,
                }
            } => {
                until_shutdown(scan_once(api, &mut scanner, &event_tx), &mut shutdown).await
            }
        };
        if stop {
            stopped(&event_tx);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, FakeState};
    use crate::expiry::format_wire_date;
    use crate::model::{EmployeeRef, SessionUser, TravelDocumentRecord};
    use crate::session::Session;
    use tokio::sync::mpsc;

    fn expiring_doc() -> TravelDocumentRecord {
        TravelDocumentRecord {
            id: Some("d1".into()),
            employee_id: Some(EmployeeRef::Id("e1".into())),
            passport_expiry_date: Some(format_wire_date(
                expiry::today() + time::Duration::days(3),
            )),
            ..Default::default()
        }
    }

    fn logged_in_store(dir: &tempfile::TempDir) -> SessionStore {
        let store = SessionStore::at(dir.path().join("session.json"));
        store
            .save(&Session::new(
                "tok".into(),
                SessionUser {
                    id: "u1".into(),
                    username: "admin".into(),
                    role: "admin".into(),
                },
            ))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn rescans_do_not_repeat_alerts() {
        let api = FakeApi::new(FakeState {
            documents: vec![expiring_doc()],
            expiring_count: 1,
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let store = logged_in_store(&dir);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cfg = WatchConfig {
            poll_interval: Duration::from_millis(20),
            scan_interval: Some(Duration::from_millis(10)),
        };

        run_watch(&api, &store, cfg, tx, tokio::time::sleep(Duration::from_millis(80))).await;

        let mut alerts = 0;
        let mut badges = 0;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                WatchEvent::Alert(_) => alerts += 1,
                WatchEvent::Badges(_) => badges += 1,
                WatchEvent::Info(_) => {}
            }
        }
        assert_eq!(alerts, 1);
        assert!(badges >= 1);
        assert!(api.state().listing_queries.len() >= 2);
        assert_eq!(
            store.require().unwrap().badge.latest_expiring_count,
            Some(1)
        );
    }

    #[tokio::test]
    async fn scan_runs_once_without_interval() {
        let api = FakeApi::default();
        let dir = tempfile::tempdir().unwrap();
        let store = logged_in_store(&dir);
        let (tx, _rx) = mpsc::unbounded_channel();
        let cfg = WatchConfig {
            poll_interval: Duration::from_secs(60),
            scan_interval: None,
        };

        run_watch(&api, &store, cfg, tx, tokio::time::sleep(Duration::from_millis(30))).await;
        assert_eq!(api.state().listing_queries.len(), 1);
    }

    #[tokio::test]
    async fn shutdown_abandons_a_slow_poll() {
        let api = FakeApi::new(FakeState {
            count_delay: Duration::from_secs(30),
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let store = logged_in_store(&dir);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cfg = WatchConfig {
            poll_interval: Duration::from_secs(60),
            scan_interval: None,
        };

        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            run_watch(&api, &store, cfg, tx, tokio::time::sleep(Duration::from_millis(50))),
        )
        .await;

        assert!(finished.is_ok(), "watch kept waiting on the in-flight poll");
        let mut saw_badges = false;
        while let Ok(ev) = rx.try_recv() {
            saw_badges |= matches!(ev, WatchEvent::Badges(_));
        }
        assert!(!saw_badges);
    }

    #[tokio::test]
    async fn failed_scan_is_reported_not_fatal() {
        let api = FakeApi::new(FakeState {
            listing_fails: true,
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let store = logged_in_store(&dir);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cfg = WatchConfig {
            poll_interval: Duration::from_secs(60),
            scan_interval: None,
        };

        run_watch(&api, &store, cfg, tx, tokio::time::sleep(Duration::from_millis(20))).await;
        let first = rx.try_recv().unwrap();
        assert!(matches!(first, WatchEvent::Info(InfoEvent::ScanFailed(_))));
    }
}
