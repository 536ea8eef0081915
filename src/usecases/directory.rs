use crate::domain::{directory_state::DirectoryState, ids::UserId, user::User};

use super::{contracts::DocumentStore, subscription::Subscription};

/// Live user directory for one session.
pub struct DirectoryFeed {
    state: DirectoryState,
    subscription: Option<Subscription<User>>,
}

impl DirectoryFeed {
    /// Subscribes to the `users` collection. A failed subscription leaves the
    /// feed in the error state rather than failing the session.
    pub fn start(store: &dyn DocumentStore, me: UserId) -> Self {
        let mut state = DirectoryState::new(me);
        let subscription = match store.subscribe_users() {
            Ok(subscription) => Some(subscription),
            Err(error) => {
                tracing::warn!(
                    code = "DIRECTORY_SUBSCRIBE_FAILED",
                    error = %error,
                    "failed to subscribe to user directory"
                );
                state.set_error();
                None
            }
        };

        let mut feed = Self {
            state,
            subscription,
        };
        feed.poll();
        feed
    }

    pub fn poll(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_mut() else {
            return 0;
        };
        let changes = subscription.drain();
        if changes.is_empty() {
            return 0;
        }
        self.state.apply_changes(changes)
    }

    pub fn state(&self) -> &DirectoryState {
        &self.state
    }

    pub fn is_live(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    pub fn stop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::memory_store::{FaultTarget, MemoryStore},
        domain::directory_state::DirectoryUiState,
        test_support::{register, uid},
    };

    fn names(feed: &DirectoryFeed) -> Vec<String> {
        feed.state()
            .others()
            .map(|user| user.username.clone())
            .collect()
    }

    #[test]
    fn loads_snapshot_without_self() {
        let store = MemoryStore::new();
        for name in ["carol", "alice", "bob"] {
            register(&store, name);
        }

        let feed = DirectoryFeed::start(&store, uid("alice"));

        assert_eq!(names(&feed), vec!["bob", "carol"]);
        assert_eq!(feed.state().ui_state(), DirectoryUiState::Ready);
    }

    #[test]
    fn picks_up_new_users_and_presence_changes() {
        let store = MemoryStore::new();
        register(&store, "alice");
        let mut feed = DirectoryFeed::start(&store, uid("alice"));
        assert_eq!(feed.state().ui_state(), DirectoryUiState::Empty);

        register(&store, "bob");
        store.set_presence(&uid("bob"), true).expect("presence");
        feed.poll();

        assert_eq!(names(&feed), vec!["bob"]);
        assert!(feed.state().get(&uid("bob")).expect("bob listed").is_online);
    }

    #[test]
    fn subscribe_failure_shows_error_state() {
        let store = MemoryStore::new();
        store.fail_next(FaultTarget::Subscribe);

        let feed = DirectoryFeed::start(&store, uid("alice"));

        assert_eq!(feed.state().ui_state(), DirectoryUiState::Error);
        assert!(!feed.is_live());
    }

    #[test]
    fn stop_ignores_later_changes() {
        let store = MemoryStore::new();
        register(&store, "alice");
        let mut feed = DirectoryFeed::start(&store, uid("alice"));

        feed.stop();
        register(&store, "bob");
        feed.poll();

        assert!(names(&feed).is_empty());
    }
}
