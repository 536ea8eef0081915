//! Contracts this core requires from its external collaborators: the
//! document store, the auth provider and the notification sink.

use std::sync::{mpsc::Receiver, Arc};

use chrono::{DateTime, Utc};

use crate::domain::{
    chat::{Chat, ChatFieldOp},
    ids::{ChatId, MessageId, UserId},
    message::{Message, NewMessage},
    user::{ProfileUpdate, User},
};

use super::subscription::Subscription;

/// Transport-level failure reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("document store is unavailable")]
    Unavailable,
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("write rejected by the store: {code}")]
    Rejected { code: String },
}

/// One operation inside an atomic [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    AddMessage(NewMessage),
    DeleteMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },
    MarkRead {
        chat_id: ChatId,
        message_id: MessageId,
    },
    UpdateChat {
        chat_id: ChatId,
        ops: Vec<ChatFieldOp>,
    },
}

/// Writes committed all together or not at all. Every operation in a batch
/// shares one server timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, op: WriteOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub server_time: DateTime<Utc>,
    pub added: Vec<Message>,
}

pub trait DocumentStore {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// Create-or-merge of a user's profile fields. Presence is untouched.
    fn merge_user(&self, id: &UserId, profile: &ProfileUpdate) -> Result<(), StoreError>;

    /// Sets `isOnline` and stamps `lastSeen` with the server time.
    fn set_presence(&self, id: &UserId, is_online: bool) -> Result<(), StoreError>;

    fn get_chat(&self, id: &ChatId) -> Result<Option<Chat>, StoreError>;

    /// Create-or-merge: inserts `seed` when the chat does not exist and never
    /// overwrites fields of an existing record.
    fn merge_chat(&self, seed: Chat) -> Result<(), StoreError>;

    fn update_chat(&self, id: &ChatId, ops: Vec<ChatFieldOp>) -> Result<(), StoreError>;

    /// One-shot read of a chat's message log, oldest first.
    fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError>;

    fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome, StoreError>;

    fn subscribe_users(&self) -> Result<Subscription<User>, StoreError>;

    fn subscribe_chats(&self, participant: &UserId) -> Result<Subscription<Chat>, StoreError>;

    fn subscribe_messages(&self, chat_id: &ChatId) -> Result<Subscription<Message>, StoreError>;
}

macro_rules! forward_document_store {
    ($($wrapper:ty),+) => {$(
        impl<T: DocumentStore + ?Sized> DocumentStore for $wrapper {
            fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
                (**self).get_user(id)
            }

            fn merge_user(&self, id: &UserId, profile: &ProfileUpdate) -> Result<(), StoreError> {
                (**self).merge_user(id, profile)
            }

            fn set_presence(&self, id: &UserId, is_online: bool) -> Result<(), StoreError> {
                (**self).set_presence(id, is_online)
            }

            fn get_chat(&self, id: &ChatId) -> Result<Option<Chat>, StoreError> {
                (**self).get_chat(id)
            }

            fn merge_chat(&self, seed: Chat) -> Result<(), StoreError> {
                (**self).merge_chat(seed)
            }

            fn update_chat(&self, id: &ChatId, ops: Vec<ChatFieldOp>) -> Result<(), StoreError> {
                (**self).update_chat(id, ops)
            }

            fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
                (**self).list_messages(chat_id)
            }

            fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome, StoreError> {
                (**self).commit(batch)
            }

            fn subscribe_users(&self) -> Result<Subscription<User>, StoreError> {
                (**self).subscribe_users()
            }

            fn subscribe_chats(&self, participant: &UserId) -> Result<Subscription<Chat>, StoreError> {
                (**self).subscribe_chats(participant)
            }

            fn subscribe_messages(&self, chat_id: &ChatId) -> Result<Subscription<Message>, StoreError> {
                (**self).subscribe_messages(chat_id)
            }
        }
    )+};
}

forward_document_store!(&T, Arc<T>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(AuthUser),
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account already exists for this email")]
    EmailInUse,
    #[error("auth provider is unavailable")]
    Unavailable,
}

pub trait AuthProvider {
    fn current_user(&self) -> Option<AuthUser>;
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
    fn sign_out(&self) -> Result<(), AuthError>;

    /// Feed of auth state transitions, starting with the current state.
    fn auth_state_changes(&self) -> Receiver<AuthState>;
}

/// Best-effort OS notification sink.
pub trait Notifier {
    /// Asks for permission; `false` only disables notifications.
    fn request_permission(&mut self) -> bool;
    fn notify(&self, title: &str, body: &str);
}
