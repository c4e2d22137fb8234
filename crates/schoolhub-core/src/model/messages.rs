//! Direct messages between school members.

use super::{check_length, require_text};
use crate::primitives::{MAX_BODY_LENGTH, MAX_TITLE_LENGTH};
use crate::{Collection, Document, Member, Reference, SchoolError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Member,
    pub recipient: Member,
    #[serde(default)]
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Whether `member` is the sender or the recipient.
    #[must_use]
    pub fn involves(&self, member: Member) -> bool {
        self.sender == member || self.recipient == member
    }
}

impl Document for Message {
    const COLLECTION: Collection = Collection::Messages;

    fn validate(&self) -> Result<(), SchoolError> {
        if self.sender == self.recipient {
            return Err(SchoolError::Validation(
                "cannot send a message to oneself".to_string(),
            ));
        }
        check_length("subject", &self.subject, MAX_TITLE_LENGTH)?;
        require_text("body", &self.body, MAX_BODY_LENGTH)
    }

    fn references(&self) -> Vec<Reference> {
        vec![self.sender.reference(), self.recipient.reference()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordId;

    #[test]
    fn self_addressed_message_rejected() {
        let me = Member::Employee(RecordId(1));
        let message = Message {
            sender: me,
            recipient: me,
            subject: String::new(),
            body: "note to self".to_string(),
            sent_at: DateTime::<Utc>::default(),
            read_at: None,
        };
        assert!(message.validate().is_err());
        assert!(message.involves(me));
        assert!(!message.involves(Member::Student(RecordId(1))));
    }
}
