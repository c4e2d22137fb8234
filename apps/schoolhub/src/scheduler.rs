//! # Notification Poller
//!
//! Background task that delivers scheduled notifications once they fall
//! due. It shares the school with the HTTP handlers and only holds the
//! write lock for the length of one dispatch pass.

use chrono::Utc;
use schoolhub_core::School;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running poller.
pub struct Poller {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Signal the task to stop and wait for it to finish its current pass.
    pub async fn stop(self) {
        // A send error means the task already exited.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(event = "poller_join_failed", error = %e, "Notification poller panicked");
        }
    }
}

/// Run one dispatch pass against the shared school.
pub async fn dispatch_once(school: &RwLock<School>) {
    let mut school = school.write().await;
    match school.dispatch_due(Utc::now()) {
        Ok(report) if report.is_empty() => {
            tracing::trace!("No notifications due");
        }
        Ok(report) => {
            tracing::info!(
                event = "notifications_dispatched",
                notifications = report.sent.len(),
                deliveries = report.deliveries,
                "Delivered scheduled notifications"
            );
        }
        Err(e) => {
            tracing::error!(event = "dispatch_failed", error = %e, "Notification dispatch failed");
        }
    }
}

/// Start the poller. The first pass runs immediately.
pub fn spawn_poller(school: Arc<RwLock<School>>, period: Duration) -> Poller {
    let (shutdown, mut stopped) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(period_secs = period.as_secs(), "Notification poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => dispatch_once(&school).await,
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Notification poller stopped");
    });

    Poller { shutdown, handle }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use schoolhub_core::{
        Audience, Employee, EmployeeRole, Notification, Record, RecordId,
    };

    fn school_with_pending() -> (School, RecordId) {
        let mut school = School::new();
        school
            .insert(Employee {
                employee_no: "E1".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Byron".to_string(),
                role: EmployeeRole::Teacher,
                email: "ada@school.test".to_string(),
                phone: "555".to_string(),
                joined_on: chrono::NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
                active: true,
            })
            .unwrap();
        // Stored directly so nothing is sent at publish time.
        let now = Utc::now();
        let Record { id, .. } = school
            .insert(Notification {
                title: "Staff meeting".to_string(),
                body: "Room 4".to_string(),
                audience: Audience::AllEmployees,
                created_by: None,
                created_at: now - ChronoDuration::minutes(5),
                scheduled_for: Some(now - ChronoDuration::minutes(1)),
                sent_at: None,
                recipient_count: 0,
            })
            .unwrap();
        (school, id)
    }

    #[tokio::test]
    async fn dispatch_once_sends_due_notifications() {
        let (school, id) = school_with_pending();
        let school = RwLock::new(school);

        dispatch_once(&school).await;

        let sent = school.read().await.get::<Notification>(id).unwrap();
        assert!(sent.data.sent_at.is_some());
        assert_eq!(sent.data.recipient_count, 1);
    }

    #[tokio::test]
    async fn poller_delivers_and_stops() {
        let (school, id) = school_with_pending();
        let school = Arc::new(RwLock::new(school));
        let poller = spawn_poller(Arc::clone(&school), Duration::from_millis(20));

        let mut delivered = false;
        for _ in 0..100 {
            if school.read().await.get::<Notification>(id).unwrap().data.sent_at.is_some() {
                delivered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        poller.stop().await;

        assert!(delivered);
    }
}
