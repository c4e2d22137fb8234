//! # Messaging Module
//!
//! Direct messages between members.

use crate::model::Message;
use crate::{Member, Record, RecordId, School, SchoolError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of a mailbox to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Folder {
    #[default]
    Inbox,
    Sent,
}

fn newest_first(messages: &mut [Record<Message>]) {
    messages.sort_by(|a, b| b.data.sent_at.cmp(&a.data.sent_at).then(b.id.cmp(&a.id)));
}

impl School {
    /// Send a message from one member to another.
    pub fn send_message(
        &mut self,
        sender: Member,
        recipient: Member,
        subject: String,
        body: String,
        now: DateTime<Utc>,
    ) -> Result<Record<Message>, SchoolError> {
        self.ensure_member(sender)?;
        self.ensure_member(recipient)?;
        self.insert(Message {
            sender,
            recipient,
            subject,
            body,
            sent_at: now,
            read_at: None,
        })
    }

    /// Messages received (or sent) by a member, newest first.
    pub fn mailbox(&self, member: Member, folder: Folder) -> Result<Vec<Record<Message>>, SchoolError> {
        self.ensure_member(member)?;
        let mut messages = self.list_where::<Message>(|m| match folder {
            Folder::Inbox => m.recipient == member,
            Folder::Sent => m.sender == member,
        })?;
        newest_first(&mut messages);
        Ok(messages)
    }

    /// Messages exchanged between two members, oldest first.
    pub fn conversation(&self, a: Member, b: Member) -> Result<Vec<Record<Message>>, SchoolError> {
        self.ensure_member(a)?;
        self.ensure_member(b)?;
        let mut messages = self.list_where::<Message>(|m| {
            (m.sender == a && m.recipient == b) || (m.sender == b && m.recipient == a)
        })?;
        messages.sort_by(|x, y| x.data.sent_at.cmp(&y.data.sent_at).then(x.id.cmp(&y.id)));
        Ok(messages)
    }

    /// Mark a message read. Only its recipient may do so.
    pub fn mark_message_read(
        &mut self,
        id: RecordId,
        reader: Member,
        now: DateTime<Utc>,
    ) -> Result<Record<Message>, SchoolError> {
        let mut message = self.get::<Message>(id)?;
        if message.data.recipient != reader {
            return Err(SchoolError::PermissionDenied(format!(
                "message {} is not addressed to {}",
                id, reader
            )));
        }
        if message.data.read_at.is_some() {
            return Ok(message);
        }
        message.data.read_at = Some(now);
        self.replace(id, message.data)
    }
}
