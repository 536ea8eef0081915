use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator used when joining two participant ids into a chat id.
/// User ids are rejected if they contain it, so a chat id always splits back
/// into exactly two participants.
pub const CHAT_ID_SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidId {
    #[error("id must not be empty")]
    Empty,
    #[error("id must not contain the chat id separator")]
    ContainsSeparator,
    #[error("chat id must join exactly two participant ids")]
    MalformedChatId,
}

/// Stable identity handed out by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidId::Empty);
        }
        if raw.contains(CHAT_ID_SEPARATOR) {
            return Err(InvalidId::ContainsSeparator);
        }

        Ok(Self(raw))
    }
}

impl TryFrom<String> for UserId {
    type Error = InvalidId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical key of a one-to-one chat. Only constructed through
/// [`crate::domain::chat_identity::derive_chat_id`] or by parsing a stored key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChatId(String);

impl ChatId {
    pub(crate) fn from_sorted(first: &UserId, second: &UserId) -> Self {
        Self(format!("{first}{CHAT_ID_SEPARATOR}{second}"))
    }

    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidId> {
        let raw = raw.into();
        let mut parts = raw.split(CHAT_ID_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) if !a.is_empty() && !b.is_empty() && a < b => Ok(Self(raw)),
            _ => Err(InvalidId::MalformedChatId),
        }
    }

    /// Returns the two participant ids encoded in the key, in sorted order.
    pub fn participants(&self) -> (UserId, UserId) {
        let (first, second) = self
            .0
            .split_once(CHAT_ID_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""));
        (UserId(first.to_owned()), UserId(second.to_owned()))
    }

    pub fn involves(&self, user: &UserId) -> bool {
        let (first, second) = self.participants();
        &first == user || &second == user
    }
}

impl TryFrom<String> for ChatId {
    type Error = InvalidId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ChatId> for String {
    fn from(value: ChatId) -> Self {
        value.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
