use super::{
    ids::{ChatId, UserId},
    live_collection::{Change, LiveCollection},
    message::Message,
};

/// Lifecycle of the chat view owned by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPhase {
    Closed,
    Opening { peer: UserId },
    Open { chat_id: ChatId, peer: UserId },
}

#[derive(Debug, Clone)]
pub struct OpenChatState {
    phase: ChatPhase,
    messages: LiveCollection<Message>,
}

impl Default for OpenChatState {
    fn default() -> Self {
        Self {
            phase: ChatPhase::Closed,
            messages: LiveCollection::default(),
        }
    }
}

impl OpenChatState {
    pub fn phase(&self) -> &ChatPhase {
        &self.phase
    }

    pub fn chat_id(&self) -> Option<&ChatId> {
        match &self.phase {
            ChatPhase::Open { chat_id, .. } => Some(chat_id),
            _ => None,
        }
    }

    pub fn peer(&self) -> Option<&UserId> {
        match &self.phase {
            ChatPhase::Opening { peer } | ChatPhase::Open { peer, .. } => Some(peer),
            ChatPhase::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, ChatPhase::Open { .. })
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Enters `Opening` and drops the previous chat's messages.
    pub fn set_opening(&mut self, peer: UserId) {
        self.phase = ChatPhase::Opening { peer };
        self.messages.clear();
    }

    pub fn set_open(&mut self, chat_id: ChatId) {
        let peer = match std::mem::replace(&mut self.phase, ChatPhase::Closed) {
            ChatPhase::Opening { peer } | ChatPhase::Open { peer, .. } => peer,
            ChatPhase::Closed => {
                tracing::warn!(chat_id = %chat_id, "set_open called without a pending open");
                return;
            }
        };
        self.phase = ChatPhase::Open { chat_id, peer };
    }

    pub fn close(&mut self) {
        self.phase = ChatPhase::Closed;
        self.messages.clear();
    }

    /// Applies live changes to the message log. Changes are dropped unless a
    /// chat is open.
    pub fn apply_changes(&mut self, changes: Vec<Change<Message>>) -> usize {
        if !self.is_open() {
            return 0;
        }
        self.messages.apply_all(changes)
    }

    /// Incoming messages addressed to `me` that are still unread.
    pub fn unread_incoming<'a>(&'a self, me: &'a UserId) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages
            .iter()
            .filter(move |message| &message.receiver_id == me && !message.read)
    }
}
