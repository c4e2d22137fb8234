//! Notifications, their audiences, and per-member inbox deliveries.
//!
//! A notification is addressed to an `Audience`. When it is sent, the
//! audience is resolved to concrete members and one `Delivery` is written
//! per member; the delivery is what shows up in a member's inbox.

use super::require_text;
use crate::primitives::{MAX_BODY_LENGTH, MAX_TITLE_LENGTH};
use crate::{Collection, Document, EmployeeRole, Member, RecordId, Reference, SchoolError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Every active student and employee.
    Everyone,
    AllStudents,
    AllEmployees,
    /// Active employees holding a role.
    Role(EmployeeRole),
    /// Active students of a class.
    Class(RecordId),
    Student(RecordId),
    Employee(RecordId),
}

impl Audience {
    fn reference(self) -> Option<Reference> {
        match self {
            Self::Class(id) => Some(Reference::new(Collection::Classes, id)),
            Self::Student(id) => Some(Member::Student(id).reference()),
            Self::Employee(id) => Some(Member::Employee(id).reference()),
            Self::Everyone | Self::AllStudents | Self::AllEmployees | Self::Role(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub audience: Audience,
    #[serde(default)]
    pub created_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    /// Delivery time; `None` means "as soon as published".
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Set once deliveries have been written. Never cleared.
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recipient_count: u32,
}

impl Notification {
    /// Whether the notification should be delivered at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.sent_at.is_none() && self.scheduled_for.is_none_or(|at| at <= now)
    }
}

impl Document for Notification {
    const COLLECTION: Collection = Collection::Notifications;

    fn validate(&self) -> Result<(), SchoolError> {
        require_text("title", &self.title, MAX_TITLE_LENGTH)?;
        require_text("body", &self.body, MAX_BODY_LENGTH)
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs: Vec<Reference> = self.audience.reference().into_iter().collect();
        if let Some(author) = self.created_by {
            refs.push(Reference::new(Collection::Employees, author));
        }
        refs
    }
}

/// One notification in one member's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub notification_id: RecordId,
    pub member: Member,
    pub delivered_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Document for Delivery {
    const COLLECTION: Collection = Collection::Deliveries;

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::new(Collection::Notifications, self.notification_id),
            self.member.reference(),
        ]
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.notification_id, self.member))
    }
}
