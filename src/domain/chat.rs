use std::{cmp::Reverse, collections::BTreeMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    ids::{ChatId, UserId},
    live_collection::LiveDocument,
};

/// Per-participant unread counters of one chat.
///
/// Holds exactly one entry per participant; counters never go below zero and
/// ids outside the pair are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnreadCounts(BTreeMap<UserId, u32>);

impl UnreadCounts {
    pub fn for_pair(first: &UserId, second: &UserId) -> Self {
        Self(BTreeMap::from([(first.clone(), 0), (second.clone(), 0)]))
    }

    pub fn get(&self, participant: &UserId) -> Option<u32> {
        self.0.get(participant).copied()
    }

    pub fn increment(&mut self, participant: &UserId, by: u32) -> bool {
        match self.0.get_mut(participant) {
            Some(count) => {
                *count = count.saturating_add(by);
                true
            }
            None => false,
        }
    }

    pub fn set(&mut self, participant: &UserId, value: u32) -> bool {
        match self.0.get_mut(participant) {
            Some(count) => {
                *count = value;
                true
            }
            None => false,
        }
    }

    /// Adds a zero entry for a participant that is missing one.
    fn ensure(&mut self, participant: &UserId) {
        self.0.entry(participant.clone()).or_insert(0);
    }

}

/// Chat record as stored in the `chats` collection, keyed by [`ChatId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(skip_serializing)]
    pub id: ChatId,
    pub participants: [UserId; 2],
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub unread_count: UnreadCounts,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Builds the record written when a chat is first opened.
    pub fn seed(id: ChatId, now: DateTime<Utc>) -> Self {
        let (first, second) = id.participants();
        Self {
            unread_count: UnreadCounts::for_pair(&first, &second),
            participants: [first, second],
            id,
            last_message: None,
            last_message_time: None,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        match &self.participants {
            [first, second] if first == user => Some(second),
            [first, second] if second == user => Some(first),
            _ => None,
        }
    }

    pub fn unread_for(&self, user: &UserId) -> u32 {
        self.unread_count.get(user).unwrap_or(0)
    }

    /// Merge-on-create: keeps every existing field and only fills in unread
    /// entries that are missing for a participant.
    pub fn merge_seed(&mut self, seed: &Chat) {
        for participant in &seed.participants {
            self.unread_count.ensure(participant);
        }
    }

    /// Applies one field operation. `server_time` is the store-assigned
    /// timestamp of the write the operation belongs to.
    pub fn apply(&mut self, op: &ChatFieldOp, server_time: DateTime<Utc>) -> Result<(), ChatFieldError> {
        match op {
            ChatFieldOp::IncrementUnread { participant, by } => {
                if !self.unread_count.increment(participant, *by) {
                    return Err(ChatFieldError::NotAParticipant(participant.clone()));
                }
            }
            ChatFieldOp::SetUnread { participant, value } => {
                if !self.unread_count.set(participant, *value) {
                    return Err(ChatFieldError::NotAParticipant(participant.clone()));
                }
            }
            ChatFieldOp::SetLastMessage { preview } => {
                self.last_message = Some(preview.clone());
                self.last_message_time = Some(server_time);
            }
            ChatFieldOp::ClearLastMessageUpTo { cutoff } => {
                // A summary written after the cutoff belongs to a message the
                // clear never saw.
                if self.last_message_time.is_some_and(|time| time > *cutoff) {
                    return Ok(());
                }
                self.last_message = None;
                self.last_message_time = None;
            }
        }

        self.updated_at = server_time;
        Ok(())
    }

    /// Checks an operation without applying it.
    pub fn check(&self, op: &ChatFieldOp) -> Result<(), ChatFieldError> {
        match op {
            ChatFieldOp::IncrementUnread { participant, .. }
            | ChatFieldOp::SetUnread { participant, .. }
                if self.unread_count.get(participant).is_none() =>
            {
                Err(ChatFieldError::NotAParticipant(participant.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Field-level write against a chat record. Counter changes are relative
/// (`IncrementUnread`) or absolute (`SetUnread`); neither is computed from a
/// client-side read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatFieldOp {
    IncrementUnread { participant: UserId, by: u32 },
    SetUnread { participant: UserId, value: u32 },
    SetLastMessage { preview: String },
    /// Clears the summary unless it describes a message newer than `cutoff`.
    ClearLastMessageUpTo { cutoff: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatFieldError {
    #[error("{0} is not a participant of this chat")]
    NotAParticipant(UserId),
}

impl LiveDocument for Chat {
    type Key = ChatId;
    type SortKey = (Reverse<Option<DateTime<Utc>>>, Reverse<DateTime<Utc>>);

    fn key(&self) -> &Self::Key {
        &self.id
    }

    /// Most recent conversation first; chats without messages go last.
    fn sort_key(&self) -> Self::SortKey {
        (Reverse(self.last_message_time), Reverse(self.updated_at))
    }
}
