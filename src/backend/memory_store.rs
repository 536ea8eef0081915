use std::{
    collections::BTreeMap,
    sync::{mpsc, Arc, Mutex, MutexGuard, Weak},
};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    domain::{
        chat::{Chat, ChatFieldOp},
        ids::{ChatId, MessageId, UserId},
        live_collection::{Change, LiveDocument},
        message::Message,
        user::{ProfileUpdate, User},
    },
    usecases::{
        contracts::{CommitOutcome, DocumentStore, StoreError, WriteBatch, WriteOp},
        subscription::{Subscription, SubscriptionId},
    },
};

const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";

/// In-process document store with live queries.
///
/// Cloning shares the same underlying collections, the way several clients
/// would share one remote backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    users: BTreeMap<UserId, User>,
    chats: BTreeMap<ChatId, Chat>,
    messages: BTreeMap<ChatId, BTreeMap<MessageId, Message>>,
    last_server_time: Option<DateTime<Utc>>,
    next_subscription_id: u64,
    user_listeners: Vec<Listener<(), User>>,
    chat_listeners: Vec<Listener<UserId, Chat>>,
    message_listeners: Vec<Listener<ChatId, Message>>,
    #[cfg(test)]
    pending_faults: Vec<FaultTarget>,
    #[cfg(test)]
    after_list: Vec<WriteBatch>,
}

struct Listener<S, T: LiveDocument> {
    id: SubscriptionId,
    scope: S,
    tx: mpsc::Sender<Change<T>>,
}

/// Store operation that an injected fault applies to.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTarget {
    Commit,
    UpdateChat,
    MergeChat,
    SetPresence,
    Subscribe,
    List,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live message-log subscriptions across all chats.
    pub fn active_message_subscriptions(&self) -> usize {
        self.inner
            .lock()
            .map(|state| state.message_listeners.len())
            .unwrap_or_default()
    }

    /// Makes the next call to `target` fail with [`StoreError::Unavailable`].
    #[cfg(test)]
    pub fn fail_next(&self, target: FaultTarget) {
        if let Ok(mut state) = self.inner.lock() {
            state.pending_faults.push(target);
        }
    }

    /// Commits `batch` right after the next message listing is taken, as a
    /// write racing with the reader would land.
    #[cfg(test)]
    pub fn commit_after_next_list(&self, batch: WriteBatch) {
        if let Ok(mut state) = self.inner.lock() {
            state.after_list.push(batch);
        }
    }

    #[cfg(test)]
    pub fn messages_of(&self, chat_id: &ChatId) -> Vec<Message> {
        self.inner
            .lock()
            .map(|state| state.sorted_log(chat_id))
            .unwrap_or_default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.inner.lock().map_err(|_| {
            tracing::error!(code = "STORE_LOCK_POISONED", "memory store lock poisoned");
            StoreError::Unavailable
        })
    }

    fn detach(weak: Weak<Mutex<StoreState>>, id: SubscriptionId) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if let Ok(mut state) = inner.lock() {
            state.user_listeners.retain(|listener| listener.id != id);
            state.chat_listeners.retain(|listener| listener.id != id);
            state.message_listeners.retain(|listener| listener.id != id);
        };
    }

    fn subscription<T: LiveDocument>(
        &self,
        id: SubscriptionId,
        rx: mpsc::Receiver<Change<T>>,
    ) -> Subscription<T> {
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(id, rx, move || Self::detach(weak, id))
    }
}

impl StoreState {
    #[cfg(test)]
    fn take_fault(&mut self, target: FaultTarget) -> Result<(), StoreError> {
        match self.pending_faults.iter().position(|fault| *fault == target) {
            Some(index) => {
                self.pending_faults.remove(index);
                Err(StoreError::Unavailable)
            }
            None => Ok(()),
        }
    }

    /// Validates every operation, then applies them all under one server
    /// timestamp.
    fn commit_batch(&mut self, batch: WriteBatch) -> Result<CommitOutcome, StoreError> {
        for op in batch.ops() {
            self.validate(op)?;
        }

        let server_time = self.next_server_time();
        let mut added = Vec::new();
        for op in batch.into_ops() {
            self.apply(op, server_time, &mut added);
        }

        Ok(CommitOutcome { server_time, added })
    }

    fn sorted_log(&self, chat_id: &ChatId) -> Vec<Message> {
        let mut messages: Vec<_> = self
            .messages
            .get(chat_id)
            .map(|log| log.values().cloned().collect())
            .unwrap_or_default();
        messages.sort_by_key(LiveDocument::sort_key);
        messages
    }

    /// Server clock, strictly increasing across all writes.
    fn next_server_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamped = match self.last_server_time {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_server_time = Some(stamped);
        stamped
    }

    fn next_subscription_id(&mut self) -> SubscriptionId {
        self.next_subscription_id += 1;
        SubscriptionId(self.next_subscription_id)
    }

    fn publish_user(&mut self, change: Change<User>) {
        self.user_listeners
            .retain(|listener| listener.tx.send(change.clone()).is_ok());
    }

    fn publish_chat(&mut self, change: Change<Chat>) {
        let (Change::Added(chat) | Change::Modified(chat)) = &change else {
            return;
        };
        let participants = chat.participants.clone();
        self.chat_listeners.retain(|listener| {
            !participants.contains(&listener.scope) || listener.tx.send(change.clone()).is_ok()
        });
    }

    fn publish_message(&mut self, chat_id: &ChatId, change: Change<Message>) {
        tracing::trace!(chat_id = %chat_id, change = change.kind_label(), "message change published");
        self.message_listeners.retain(|listener| {
            &listener.scope != chat_id || listener.tx.send(change.clone()).is_ok()
        });
    }

    fn validate(&self, op: &WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::AddMessage(message) => {
                if message.sender_id == message.receiver_id
                    || !message.chat_id.involves(&message.sender_id)
                    || !message.chat_id.involves(&message.receiver_id)
                {
                    return Err(StoreError::Rejected {
                        code: PERMISSION_DENIED.to_owned(),
                    });
                }
                Ok(())
            }
            WriteOp::DeleteMessage { .. } => Ok(()),
            WriteOp::MarkRead {
                chat_id,
                message_id,
            } => self
                .messages
                .get(chat_id)
                .and_then(|log| log.get(message_id))
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(format!("chats/{chat_id}/messages/{message_id}"))),
            WriteOp::UpdateChat { chat_id, ops } => {
                let chat = self
                    .chats
                    .get(chat_id)
                    .ok_or_else(|| StoreError::NotFound(format!("chats/{chat_id}")))?;
                for op in ops {
                    chat.check(op).map_err(|_| StoreError::Rejected {
                        code: INVALID_ARGUMENT.to_owned(),
                    })?;
                }
                Ok(())
            }
        }
    }

    fn apply(&mut self, op: WriteOp, server_time: DateTime<Utc>, added: &mut Vec<Message>) {
        match op {
            WriteOp::AddMessage(new_message) => {
                let id = MessageId::new(Uuid::new_v4().simple().to_string());
                let message = new_message.into_message(id.clone(), server_time);
                let chat_id = message.chat_id.clone();
                self.messages
                    .entry(chat_id.clone())
                    .or_default()
                    .insert(id, message.clone());
                added.push(message.clone());
                self.publish_message(&chat_id, Change::Added(message));
            }
            WriteOp::DeleteMessage {
                chat_id,
                message_id,
            } => {
                let removed = self
                    .messages
                    .get_mut(&chat_id)
                    .and_then(|log| log.remove(&message_id));
                if removed.is_some() {
                    self.publish_message(&chat_id, Change::Removed(message_id));
                }
            }
            WriteOp::MarkRead {
                chat_id,
                message_id,
            } => {
                let Some(message) = self
                    .messages
                    .get_mut(&chat_id)
                    .and_then(|log| log.get_mut(&message_id))
                else {
                    return;
                };
                if message.mark_read() {
                    let snapshot = message.clone();
                    self.publish_message(&chat_id, Change::Modified(snapshot));
                }
            }
            WriteOp::UpdateChat { chat_id, ops } => {
                let Some(chat) = self.chats.get_mut(&chat_id) else {
                    return;
                };
                for op in &ops {
                    if let Err(error) = chat.apply(op, server_time) {
                        tracing::warn!(chat_id = %chat_id, error = %error, "validated chat op failed to apply");
                    }
                }
                let snapshot = chat.clone();
                self.publish_chat(Change::Modified(snapshot));
            }
        }
    }
}

impl DocumentStore for MemoryStore {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state()?.users.get(id).cloned())
    }

    fn merge_user(&self, id: &UserId, profile: &ProfileUpdate) -> Result<(), StoreError> {
        let mut state = self.state()?;

        let change = match state.users.get_mut(id) {
            Some(user) => {
                user.username = profile.username.clone();
                if let Some(email) = &profile.email {
                    user.email = Some(email.clone());
                }
                if let Some(image) = &profile.profile_image {
                    user.profile_image = Some(image.clone());
                }
                Change::Modified(user.clone())
            }
            None => {
                let mut user = User::new(id.clone(), profile.username.clone());
                user.email = profile.email.clone();
                user.profile_image = profile.profile_image.clone();
                state.users.insert(id.clone(), user.clone());
                Change::Added(user)
            }
        };

        state.publish_user(change);
        Ok(())
    }

    fn set_presence(&self, id: &UserId, is_online: bool) -> Result<(), StoreError> {
        let mut state = self.state()?;
        #[cfg(test)]
        state.take_fault(FaultTarget::SetPresence)?;

        let now = state.next_server_time();
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("users/{id}")))?;
        user.is_online = is_online;
        user.last_seen = Some(now);
        let snapshot = user.clone();

        state.publish_user(Change::Modified(snapshot));
        Ok(())
    }

    fn get_chat(&self, id: &ChatId) -> Result<Option<Chat>, StoreError> {
        Ok(self.state()?.chats.get(id).cloned())
    }

    fn merge_chat(&self, seed: Chat) -> Result<(), StoreError> {
        let mut state = self.state()?;
        #[cfg(test)]
        state.take_fault(FaultTarget::MergeChat)?;

        let change = match state.chats.get_mut(&seed.id) {
            Some(existing) => {
                let before = existing.clone();
                existing.merge_seed(&seed);
                if *existing == before {
                    return Ok(());
                }
                Change::Modified(existing.clone())
            }
            None => {
                state.chats.insert(seed.id.clone(), seed.clone());
                Change::Added(seed)
            }
        };

        state.publish_chat(change);
        Ok(())
    }

    fn update_chat(&self, id: &ChatId, ops: Vec<ChatFieldOp>) -> Result<(), StoreError> {
        let mut state = self.state()?;
        #[cfg(test)]
        state.take_fault(FaultTarget::UpdateChat)?;

        let op = WriteOp::UpdateChat {
            chat_id: id.clone(),
            ops,
        };
        state.validate(&op)?;
        let now = state.next_server_time();
        state.apply(op, now, &mut Vec::new());
        Ok(())
    }

    fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
        let mut state = self.state()?;
        #[cfg(test)]
        state.take_fault(FaultTarget::List)?;

        let listed = state.sorted_log(chat_id);

        #[cfg(test)]
        for batch in std::mem::take(&mut state.after_list) {
            state.commit_batch(batch)?;
        }

        Ok(listed)
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome, StoreError> {
        let mut state = self.state()?;
        #[cfg(test)]
        state.take_fault(FaultTarget::Commit)?;

        state.commit_batch(batch)
    }

    fn subscribe_users(&self) -> Result<Subscription<User>, StoreError> {
        let mut state = self.state()?;
        #[cfg(test)]
        state.take_fault(FaultTarget::Subscribe)?;

        let id = state.next_subscription_id();
        let (tx, rx) = mpsc::channel();
        for user in state.users.values() {
            let _ = tx.send(Change::Added(user.clone()));
        }
        state.user_listeners.push(Listener { id, scope: (), tx });
        drop(state);

        Ok(self.subscription(id, rx))
    }

    fn subscribe_chats(&self, participant: &UserId) -> Result<Subscription<Chat>, StoreError> {
        let mut state = self.state()?;
        #[cfg(test)]
        state.take_fault(FaultTarget::Subscribe)?;

        let id = state.next_subscription_id();
        let (tx, rx) = mpsc::channel();
        for chat in state.chats.values().filter(|chat| chat.is_participant(participant)) {
            let _ = tx.send(Change::Added(chat.clone()));
        }
        state.chat_listeners.push(Listener {
            id,
            scope: participant.clone(),
            tx,
        });
        drop(state);

        Ok(self.subscription(id, rx))
    }

    fn subscribe_messages(&self, chat_id: &ChatId) -> Result<Subscription<Message>, StoreError> {
        let mut state = self.state()?;
        #[cfg(test)]
        state.take_fault(FaultTarget::Subscribe)?;

        let id = state.next_subscription_id();
        let (tx, rx) = mpsc::channel();
        for message in state.sorted_log(chat_id) {
            let _ = tx.send(Change::Added(message));
        }
        state.message_listeners.push(Listener {
            id,
            scope: chat_id.clone(),
            tx,
        });
        drop(state);

        tracing::debug!(chat_id = %chat_id, subscription_id = id.0, "message subscription opened");
        Ok(self.subscription(id, rx))
    }
}
