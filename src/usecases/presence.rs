//! Online/offline presence of the session user.

use std::time::Duration;

use crate::domain::ids::UserId;

use super::contracts::{DocumentStore, StoreError};

/// Result of the best-effort offline write made on process exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitFlush {
    Flushed,
    Failed(StoreError),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct PresenceTracker<S> {
    store: S,
}

impl<S: DocumentStore> PresenceTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Writes `isOnline` and stamps `lastSeen`. Failures are logged and
    /// returned; nothing is retried.
    pub fn set_online(&self, user: &UserId, online: bool) -> Result<(), StoreError> {
        match self.store.set_presence(user, online) {
            Ok(()) => {
                tracing::debug!(user_id = %user, online, "presence updated");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    code = "PRESENCE_UPDATE_FAILED",
                    user_id = %user,
                    online,
                    error = %error,
                    "failed to update presence"
                );
                Err(error)
            }
        }
    }
}

impl<S> PresenceTracker<S>
where
    S: DocumentStore + Clone + Send + 'static,
{
    /// Fire-and-forget offline write bounded by `timeout`. A write that does
    /// not finish in time is abandoned, which can leave the user shown as
    /// online.
    pub async fn go_offline_on_exit(&self, user: &UserId, timeout: Duration) -> ExitFlush {
        let tracker = self.clone();
        let user = user.clone();
        let write = tokio::task::spawn_blocking(move || tracker.set_online(&user, false));

        match tokio::time::timeout(timeout, write).await {
            Ok(Ok(Ok(()))) => ExitFlush::Flushed,
            Ok(Ok(Err(error))) => ExitFlush::Failed(error),
            Ok(Err(join_error)) => {
                tracing::warn!(
                    code = "PRESENCE_FLUSH_ABORTED",
                    error = %join_error,
                    "offline presence task did not complete"
                );
                ExitFlush::Failed(StoreError::Unavailable)
            }
            Err(_) => {
                tracing::warn!(
                    code = "PRESENCE_FLUSH_TIMEOUT",
                    timeout_ms = timeout.as_millis() as u64,
                    "offline presence was not flushed before exit"
                );
                ExitFlush::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        backend::memory_store::FaultTarget,
        domain::{
            chat::{Chat, ChatFieldOp},
            ids::ChatId,
            message::Message,
            user::{ProfileUpdate, User},
        },
        test_support::{seeded_pair, uid},
        usecases::{
            contracts::{CommitOutcome, WriteBatch},
            subscription::Subscription,
        },
    };

    #[test]
    fn set_online_updates_flag_and_last_seen() {
        let store = seeded_pair();
        let tracker = PresenceTracker::new(store.clone());

        tracker.set_online(&uid("alice"), true).expect("online");
        let online = store.get_user(&uid("alice")).expect("get").expect("exists");
        tracker.set_online(&uid("alice"), false).expect("offline");
        let offline = store.get_user(&uid("alice")).expect("get").expect("exists");

        assert!(online.is_online);
        assert!(!offline.is_online);
        assert!(offline.last_seen > online.last_seen);
    }

    #[test]
    fn set_online_reports_store_failure() {
        let store = seeded_pair();
        store.fail_next(FaultTarget::SetPresence);
        let tracker = PresenceTracker::new(store);

        assert_eq!(
            tracker.set_online(&uid("alice"), true),
            Err(StoreError::Unavailable)
        );
    }

    #[tokio::test]
    async fn exit_flush_writes_offline() {
        let store = seeded_pair();
        let tracker = PresenceTracker::new(store.clone());
        tracker.set_online(&uid("alice"), true).expect("online");

        let flush = tracker
            .go_offline_on_exit(&uid("alice"), Duration::from_secs(5))
            .await;

        assert_eq!(flush, ExitFlush::Flushed);
        assert!(!store.get_user(&uid("alice")).expect("get").expect("exists").is_online);
    }

    /// Store whose presence writes take longer than any exit budget.
    #[derive(Clone, Default)]
    struct SlowPresenceStore {
        writes: Arc<Mutex<Vec<bool>>>,
    }

    impl DocumentStore for SlowPresenceStore {
        fn get_user(&self, _id: &UserId) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        fn merge_user(&self, _id: &UserId, _profile: &ProfileUpdate) -> Result<(), StoreError> {
            Ok(())
        }

        fn set_presence(&self, _id: &UserId, is_online: bool) -> Result<(), StoreError> {
            std::thread::sleep(Duration::from_millis(200));
            self.writes.lock().expect("writes lock").push(is_online);
            Ok(())
        }

        fn get_chat(&self, _id: &ChatId) -> Result<Option<Chat>, StoreError> {
            Ok(None)
        }

        fn merge_chat(&self, _seed: Chat) -> Result<(), StoreError> {
            Ok(())
        }

        fn update_chat(&self, _id: &ChatId, _ops: Vec<ChatFieldOp>) -> Result<(), StoreError> {
            Ok(())
        }

        fn list_messages(&self, _chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
            Ok(Vec::new())
        }

        fn commit(&self, _batch: WriteBatch) -> Result<CommitOutcome, StoreError> {
            Err(StoreError::Unavailable)
        }

        fn subscribe_users(&self) -> Result<Subscription<User>, StoreError> {
            Err(StoreError::Unavailable)
        }

        fn subscribe_chats(&self, _participant: &UserId) -> Result<Subscription<Chat>, StoreError> {
            Err(StoreError::Unavailable)
        }

        fn subscribe_messages(&self, _chat_id: &ChatId) -> Result<Subscription<Message>, StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    #[tokio::test]
    async fn exit_flush_gives_up_after_timeout() {
        let store = SlowPresenceStore::default();
        let tracker = PresenceTracker::new(store.clone());

        let flush = tracker
            .go_offline_on_exit(&uid("alice"), Duration::from_millis(10))
            .await;

        assert_eq!(flush, ExitFlush::TimedOut);
    }
}
