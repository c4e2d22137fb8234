//! # Notify Module
//!
//! Notification publishing, scheduled dispatch and member inboxes.
//!
//! ## Delivery
//!
//! A notification is sent exactly once. Sending resolves its `Audience` to
//! concrete members, writes one `Delivery` per member and stamps `sent_at`
//! on the notification, all in one batch. A notification whose `sent_at`
//! is set is never due again, which makes `dispatch_due` idempotent.

use crate::model::{Audience, Delivery, Employee, Notification, SchoolClass, Student};
use crate::school::encode;
use crate::storage::WriteBatch;
use crate::{Document, Member, Record, RecordId, School, SchoolError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Notifications sent in this pass, in id order.
    pub sent: Vec<RecordId>,
    /// Deliveries written across all of them.
    pub deliveries: u64,
}

impl DispatchReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

/// A delivery joined with the notification it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxItem {
    pub delivery_id: RecordId,
    pub notification_id: RecordId,
    pub title: String,
    pub body: String,
    pub delivered_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

fn member_count(members: &BTreeSet<Member>) -> u32 {
    u32::try_from(members.len()).unwrap_or(u32::MAX)
}

impl School {
    /// Fail with `NotFound` unless the member exists.
    pub(crate) fn ensure_member(&self, member: Member) -> Result<(), SchoolError> {
        let reference = member.reference();
        if self.exists(reference)? {
            Ok(())
        } else {
            Err(SchoolError::not_found(reference.collection, reference.id))
        }
    }

    /// The members an audience addresses right now, students first.
    pub fn resolve_audience(&self, audience: Audience) -> Result<BTreeSet<Member>, SchoolError> {
        let mut members = BTreeSet::new();
        let students = |school: &Self, members: &mut BTreeSet<Member>| -> Result<(), SchoolError> {
            for s in school.list_where::<Student>(|s| s.active)? {
                members.insert(Member::Student(s.id));
            }
            Ok(())
        };
        let employees = |school: &Self, members: &mut BTreeSet<Member>| -> Result<(), SchoolError> {
            for e in school.list_where::<Employee>(|e| e.active)? {
                members.insert(Member::Employee(e.id));
            }
            Ok(())
        };

        match audience {
            Audience::Everyone => {
                students(self, &mut members)?;
                employees(self, &mut members)?;
            }
            Audience::AllStudents => students(self, &mut members)?,
            Audience::AllEmployees => employees(self, &mut members)?,
            Audience::Role(role) => {
                for e in self.list_where::<Employee>(|e| e.active && e.role == role)? {
                    members.insert(Member::Employee(e.id));
                }
            }
            Audience::Class(class_id) => {
                self.get::<SchoolClass>(class_id)?;
                for s in self.list_where::<Student>(|s| s.active && s.class_id == Some(class_id))? {
                    members.insert(Member::Student(s.id));
                }
            }
            Audience::Student(id) => {
                self.get::<Student>(id)?;
                members.insert(Member::Student(id));
            }
            Audience::Employee(id) => {
                self.get::<Employee>(id)?;
                members.insert(Member::Employee(id));
            }
        }
        Ok(members)
    }

    /// Write the deliveries of one notification and mark it sent.
    fn send_notification(
        &mut self,
        id: RecordId,
        mut notification: Notification,
        now: DateTime<Utc>,
    ) -> Result<(Record<Notification>, u32), SchoolError> {
        let members = self.resolve_audience(notification.audience)?;
        let mut batch = WriteBatch::new();
        for member in &members {
            let delivery = Delivery {
                notification_id: id,
                member: *member,
                delivered_at: now,
                read_at: None,
            };
            batch.insert(Delivery::COLLECTION, encode(&delivery)?);
        }
        let count = member_count(&members);
        notification.sent_at = Some(now);
        notification.recipient_count = count;
        batch.put(Notification::COLLECTION, id, encode(&notification)?);
        self.commit(batch)?;
        Ok((Record::new(id, notification), count))
    }

    /// Store a notification, sending it at once unless scheduled later.
    ///
    /// Any `sent_at` or `recipient_count` supplied by the caller is ignored.
    pub fn publish_notification(
        &mut self,
        mut notification: Notification,
        now: DateTime<Utc>,
    ) -> Result<Record<Notification>, SchoolError> {
        notification.sent_at = None;
        notification.recipient_count = 0;
        let stored = self.insert(notification)?;
        if stored.data.is_due(now) {
            let (sent, _) = self.send_notification(stored.id, stored.data, now)?;
            return Ok(sent);
        }
        Ok(stored)
    }

    /// Send every unsent notification whose time has come.
    ///
    /// Each notification goes out in its own batch, so a failure leaves
    /// earlier ones sent and later ones pending for the next pass.
    pub fn dispatch_due(&mut self, now: DateTime<Utc>) -> Result<DispatchReport, SchoolError> {
        let due = self.list_where::<Notification>(|n| n.is_due(now))?;
        let mut report = DispatchReport::default();
        for notification in due {
            let (sent, count) = self.send_notification(notification.id, notification.data, now)?;
            report.sent.push(sent.id);
            report.deliveries = report.deliveries.saturating_add(u64::from(count));
        }
        Ok(report)
    }

    /// Edit a notification that has not gone out yet.
    pub fn revise_notification(
        &mut self,
        id: RecordId,
        mut notification: Notification,
        now: DateTime<Utc>,
    ) -> Result<Record<Notification>, SchoolError> {
        let current = self.get::<Notification>(id)?;
        if let Some(sent_at) = current.data.sent_at {
            return Err(SchoolError::Conflict(format!(
                "notification {} was already sent at {}",
                id, sent_at
            )));
        }
        notification.sent_at = None;
        notification.recipient_count = 0;
        let stored = self.replace(id, notification)?;
        if stored.data.is_due(now) {
            let (sent, _) = self.send_notification(id, stored.data, now)?;
            return Ok(sent);
        }
        Ok(stored)
    }

    /// A member's notifications, newest first.
    pub fn inbox(&self, member: Member, unread_only: bool) -> Result<Vec<InboxItem>, SchoolError> {
        self.ensure_member(member)?;
        let mut deliveries = self.list_where::<Delivery>(|d| {
            d.member == member && (!unread_only || d.read_at.is_none())
        })?;
        deliveries.sort_by(|a, b| {
            b.data
                .delivered_at
                .cmp(&a.data.delivered_at)
                .then(b.id.cmp(&a.id))
        });

        let mut items = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            let notification = self.get::<Notification>(delivery.data.notification_id)?;
            items.push(InboxItem {
                delivery_id: delivery.id,
                notification_id: notification.id,
                title: notification.data.title,
                body: notification.data.body,
                delivered_at: delivery.data.delivered_at,
                read_at: delivery.data.read_at,
            });
        }
        Ok(items)
    }

    /// Mark a delivery read on behalf of its addressee.
    ///
    /// Reading twice keeps the first `read_at`.
    pub fn mark_delivery_read(
        &mut self,
        id: RecordId,
        member: Member,
        now: DateTime<Utc>,
    ) -> Result<Record<Delivery>, SchoolError> {
        let mut delivery = self.get::<Delivery>(id)?;
        if delivery.data.member != member {
            return Err(SchoolError::PermissionDenied(format!(
                "delivery {} is not addressed to {}",
                id, member
            )));
        }
        if delivery.data.read_at.is_some() {
            return Ok(delivery);
        }
        delivery.data.read_at = Some(now);
        self.replace(id, delivery.data)
    }

    /// Number of unread notifications of a member.
    pub fn unread_count(&self, member: Member) -> Result<usize, SchoolError> {
        self.ensure_member(member)?;
        Ok(self
            .list_where::<Delivery>(|d| d.member == member && d.read_at.is_none())?
            .len())
    }
}
