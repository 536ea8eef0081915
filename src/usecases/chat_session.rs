//! Chat session controller: owns the open chat, its single live message
//! subscription and every write the session user makes into a chat.

use chrono::Utc;

use crate::domain::{
    chat::{Chat, ChatFieldOp},
    chat_identity::derive_chat_id,
    ids::{ChatId, UserId},
    message::{Message, MessageKind},
    open_chat_state::OpenChatState,
};

use super::{
    contracts::{DocumentStore, StoreError, WriteBatch, WriteOp},
    error::{ChatError, StateError, ValidationError},
    send_message::{send_message, OutgoingContent, SendMessageCommand},
    subscription::Subscription,
};

/// The authenticated user this controller acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearChatOutcome {
    pub deleted: usize,
}

pub struct ChatSessionController<S> {
    store: S,
    session: Option<SessionUser>,
    open_chat: OpenChatState,
    subscription: Option<Subscription<Message>>,
}

impl<S: DocumentStore> ChatSessionController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            session: None,
            open_chat: OpenChatState::default(),
            subscription: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Binds the controller to `user`. A previous session is ended first.
    pub fn start_session(&mut self, user: SessionUser) {
        if self.session.is_some() {
            self.end_session();
        }
        tracing::info!(user_id = %user.id, "chat session started");
        self.session = Some(user);
    }

    pub fn session_user(&self) -> Option<&SessionUser> {
        self.session.as_ref()
    }

    pub fn state(&self) -> &OpenChatState {
        &self.open_chat
    }

    pub fn open_chat_id(&self) -> Option<&ChatId> {
        self.open_chat.chat_id()
    }

    /// Opens the one-to-one chat with `peer`.
    ///
    /// The previous message subscription is cancelled before anything else
    /// happens, so at most one is ever active. The chat record is created
    /// with merge semantics and the session user's own unread entry is reset
    /// to zero.
    pub fn open_chat(&mut self, peer: &UserId) -> Result<ChatId, ChatError> {
        let me = self.require_session("open_chat")?.id.clone();
        let chat_id = derive_chat_id(&me, peer).map_err(ValidationError::from)?;

        self.cancel_subscription();
        self.open_chat.set_opening(peer.clone());

        match self.establish(&me, &chat_id) {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.open_chat.set_open(chat_id.clone());
                let loaded = self.poll();
                tracing::info!(chat_id = %chat_id, messages = loaded, "chat opened");
                Ok(chat_id)
            }
            Err(error) => {
                self.open_chat.close();
                tracing::warn!(
                    code = "OPEN_CHAT_FAILED",
                    chat_id = %chat_id,
                    error = %error,
                    "failed to open chat"
                );
                Err(error.into())
            }
        }
    }

    fn establish(&self, me: &UserId, chat_id: &ChatId) -> Result<Subscription<Message>, StoreError> {
        self.store.merge_chat(Chat::seed(chat_id.clone(), Utc::now()))?;
        self.store.update_chat(
            chat_id,
            vec![ChatFieldOp::SetUnread {
                participant: me.clone(),
                value: 0,
            }],
        )?;
        self.store.subscribe_messages(chat_id)
    }

    /// Applies every pending change of the open chat's log. Returns how many
    /// changes altered the local view.
    pub fn poll(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_mut() else {
            return 0;
        };
        let changes = subscription.drain();
        if changes.is_empty() {
            return 0;
        }
        self.open_chat.apply_changes(changes)
    }

    pub fn send_text(&mut self, text: &str) -> Result<Message, ChatError> {
        self.send(OutgoingContent::Text(text.to_owned()))
    }

    /// Sends the reference returned by the external upload widget.
    pub fn handle_media_upload_success(
        &mut self,
        url: &str,
        kind: Option<MessageKind>,
    ) -> Result<Message, ChatError> {
        self.send(OutgoingContent::Media {
            url: url.to_owned(),
            kind,
        })
    }

    pub fn send(&mut self, content: OutgoingContent) -> Result<Message, ChatError> {
        let me = self.require_session("send_message")?.id.clone();
        let (chat_id, peer) = self.require_open_chat("send_message")?;

        let message = send_message(
            &self.store,
            SendMessageCommand {
                chat_id,
                sender_id: me,
                receiver_id: peer,
                content,
            },
        )?;
        self.poll();
        Ok(message)
    }

    /// Deletes the listed message log of `chat_id` and clears the chat
    /// summary in one batch. Unread counters are left alone. The summary
    /// clear is bounded by the newest deleted message, so a message that
    /// lands after the listing keeps both its log entry and its summary.
    pub fn clear_chat(&mut self, chat_id: &ChatId) -> Result<ClearChatOutcome, ChatError> {
        let me = self.require_session("clear_chat")?;
        if !chat_id.involves(&me.id) {
            tracing::warn!(code = "STATE_ERROR", chat_id = %chat_id, op = "clear_chat", "not a participant");
            return Err(StateError::NotAParticipant.into());
        }

        let deleted = self.delete_log(chat_id).inspect_err(|error| {
            tracing::warn!(
                code = "CLEAR_CHAT_FAILED",
                chat_id = %chat_id,
                error = %error,
                "failed to clear chat"
            );
        })?;

        if self.open_chat.chat_id() == Some(chat_id) {
            self.poll();
        }
        tracing::info!(chat_id = %chat_id, deleted, "chat cleared");
        Ok(ClearChatOutcome { deleted })
    }

    fn delete_log(&self, chat_id: &ChatId) -> Result<usize, StoreError> {
        let messages = self.store.list_messages(chat_id)?;
        let Some(cutoff) = messages.iter().map(|message| message.timestamp).max() else {
            return Ok(0);
        };

        let mut batch = WriteBatch::new();
        for message in messages {
            batch.push(WriteOp::DeleteMessage {
                chat_id: chat_id.clone(),
                message_id: message.id,
            });
        }
        let deleted = batch.len();
        batch.push(WriteOp::UpdateChat {
            chat_id: chat_id.clone(),
            ops: vec![ChatFieldOp::ClearLastMessageUpTo { cutoff }],
        });
        self.store.commit(batch)?;
        Ok(deleted)
    }

    /// Marks every unread incoming message of the open chat as read.
    pub fn mark_read(&mut self) -> Result<usize, ChatError> {
        let me = self.require_session("mark_read")?.id.clone();
        let (chat_id, _) = self.require_open_chat("mark_read")?;

        let mut batch = WriteBatch::new();
        for message in self.open_chat.unread_incoming(&me) {
            batch.push(WriteOp::MarkRead {
                chat_id: chat_id.clone(),
                message_id: message.id.clone(),
            });
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let marked = batch.len();
        self.store.commit(batch).inspect_err(|error| {
            tracing::warn!(
                code = "MARK_READ_FAILED",
                chat_id = %chat_id,
                error = %error,
                "failed to mark messages read"
            );
        })?;
        self.poll();
        Ok(marked)
    }

    /// Closes the open chat and forgets the session user. Persisted state is
    /// not touched.
    pub fn end_session(&mut self) {
        self.cancel_subscription();
        self.open_chat.close();
        if let Some(user) = self.session.take() {
            tracing::info!(user_id = %user.id, "chat session ended");
        }
    }

    fn cancel_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    fn require_session(&self, op: &'static str) -> Result<&SessionUser, StateError> {
        self.session.as_ref().ok_or_else(|| {
            tracing::warn!(code = "STATE_ERROR", op, "no active session user");
            StateError::NoSessionUser
        })
    }

    fn require_open_chat(&self, op: &'static str) -> Result<(ChatId, UserId), StateError> {
        match (self.open_chat.chat_id(), self.open_chat.peer()) {
            (Some(chat_id), Some(peer)) => Ok((chat_id.clone(), peer.clone())),
            _ => {
                tracing::warn!(code = "STATE_ERROR", op, "no chat is open");
                Err(StateError::NoOpenChat)
            }
        }
    }
}
