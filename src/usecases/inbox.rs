//! Live inbox of the session user's chats, with new-message notifications.

use crate::domain::{
    chat::Chat,
    chat_list_state::{ChatListState, UnreadBump},
    ids::{ChatId, UserId},
};

use super::{
    contracts::{DocumentStore, Notifier},
    subscription::Subscription,
};

pub struct InboxFeed {
    state: ChatListState,
    subscription: Option<Subscription<Chat>>,
}

impl InboxFeed {
    pub fn start(store: &dyn DocumentStore, me: UserId) -> Self {
        let mut state = ChatListState::new(me.clone());
        let subscription = match store.subscribe_chats(&me) {
            Ok(subscription) => Some(subscription),
            Err(error) => {
                tracing::warn!(
                    code = "INBOX_SUBSCRIBE_FAILED",
                    user_id = %me,
                    error = %error,
                    "failed to subscribe to chats"
                );
                state.set_error();
                None
            }
        };

        let mut feed = Self { state, subscription };
        // The snapshot is history, not news.
        feed.poll(None);
        feed
    }

    /// Applies pending chat changes. Returns the unread bumps that should be
    /// announced, leaving out `open_chat`, which the user is already looking
    /// at.
    pub fn poll(&mut self, open_chat: Option<&ChatId>) -> Vec<UnreadBump> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Vec::new();
        };
        let changes = subscription.drain();
        self.state
            .apply_changes(changes)
            .into_iter()
            .filter(|bump| Some(&bump.chat_id) != open_chat)
            .collect()
    }

    /// Polls and forwards every announceable bump to `notifier`.
    pub fn poll_and_notify(
        &mut self,
        open_chat: Option<&ChatId>,
        notifier: &dyn Notifier,
        peer_name: impl Fn(&UserId) -> String,
    ) -> usize {
        let bumps = self.poll(open_chat);
        for bump in &bumps {
            let title = format!("New message from {}", peer_name(&bump.peer));
            let body = bump
                .last_message_preview
                .clone()
                .unwrap_or_else(|| format!("{} unread", bump.unread_count));
            notifier.notify(&title, &body);
        }
        bumps.len()
    }

    pub fn state(&self) -> &ChatListState {
        &self.state
    }

    pub fn stop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
