use chrono::{DateTime, Utc};

use super::{
    chat::Chat,
    ids::{ChatId, UserId},
    live_collection::{Change, LiveCollection},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

/// Inbox row for one chat, seen from the session user's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub chat_id: ChatId,
    pub peer: UserId,
    pub unread_count: u32,
    pub last_message_preview: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
}

/// An unread counter that went up for a chat, as observed by the inbox feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadBump {
    pub chat_id: ChatId,
    pub peer: UserId,
    pub unread_count: u32,
    pub last_message_preview: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatListState {
    me: UserId,
    ui_state: ChatListUiState,
    chats: LiveCollection<Chat>,
}

impl ChatListState {
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            ui_state: ChatListUiState::Loading,
            chats: LiveCollection::default(),
        }
    }

    pub fn ui_state(&self) -> ChatListUiState {
        self.ui_state.clone()
    }

    pub fn summaries(&self) -> Vec<ChatSummary> {
        self.chats
            .iter()
            .filter_map(|chat| self.summarize(chat))
            .collect()
    }

    pub fn unread_for(&self, chat_id: &ChatId) -> Option<u32> {
        self.chats.get(chat_id).map(|chat| chat.unread_for(&self.me))
    }

    /// Applies inbox changes and returns every chat whose unread counter for
    /// the session user increased.
    pub fn apply_changes(&mut self, changes: Vec<Change<Chat>>) -> Vec<UnreadBump> {
        let mut bumps = Vec::new();

        for change in changes {
            if let Change::Added(chat) | Change::Modified(chat) = &change {
                let before = self.unread_for(&chat.id).unwrap_or(0);
                let after = chat.unread_for(&self.me);
                if after > before {
                    if let Some(peer) = chat.peer_of(&self.me) {
                        bumps.push(UnreadBump {
                            chat_id: chat.id.clone(),
                            peer: peer.clone(),
                            unread_count: after,
                            last_message_preview: chat.last_message.clone(),
                        });
                    }
                }
            }
            self.chats.apply(change);
        }

        self.ui_state = if self.chats.is_empty() {
            ChatListUiState::Empty
        } else {
            ChatListUiState::Ready
        };
        bumps
    }

    pub fn set_error(&mut self) {
        self.ui_state = ChatListUiState::Error;
        self.chats.clear();
    }

    fn summarize(&self, chat: &Chat) -> Option<ChatSummary> {
        let peer = chat.peer_of(&self.me)?;
        Some(ChatSummary {
            chat_id: chat.id.clone(),
            peer: peer.clone(),
            unread_count: chat.unread_for(&self.me),
            last_message_preview: chat.last_message.clone(),
            last_message_time: chat.last_message_time,
        })
    }
}
