use std::sync::mpsc::{Receiver, TryRecvError};

use crate::domain::live_collection::{Change, LiveDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

type CancelFn = Box<dyn FnOnce() + Send>;

/// Handle to one live query.
///
/// Events are pulled with [`Subscription::drain`]. Cancelling is idempotent
/// and detaches the receiver first, so nothing from a cancelled subscription
/// can be observed afterwards. Dropping the handle cancels it.
pub struct Subscription<T: LiveDocument> {
    id: SubscriptionId,
    events: Option<Receiver<Change<T>>>,
    on_cancel: Option<CancelFn>,
}

impl<T: LiveDocument> Subscription<T> {
    pub fn new(
        id: SubscriptionId,
        events: Receiver<Change<T>>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            id,
            events: Some(events),
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.events.is_some()
    }

    /// Takes every event received so far, in receipt order.
    pub fn drain(&mut self) -> Vec<Change<T>> {
        let Some(events) = self.events.as_ref() else {
            return Vec::new();
        };

        let mut drained = Vec::new();
        let closed = loop {
            match events.try_recv() {
                Ok(change) => drained.push(change),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };

        if closed {
            tracing::debug!(
                subscription_id = self.id.0,
                "subscription feed closed by the store"
            );
            self.events = None;
        }
        drained
    }

    pub fn cancel(&mut self) {
        self.events = None;
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
            tracing::debug!(subscription_id = self.id.0, "subscription cancelled");
        }
    }
}

impl<T: LiveDocument> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T: LiveDocument> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    };

    use super::*;
    use crate::domain::ids::UserId;
    use crate::domain::user::User;

    fn user(id: &str) -> User {
        User::new(UserId::parse(id).expect("valid id"), id)
    }

    #[test]
    fn drain_returns_events_in_receipt_order() {
        let (tx, rx) = mpsc::channel();
        let mut subscription = Subscription::new(SubscriptionId(1), rx, || {});

        tx.send(Change::Added(user("a"))).expect("receiver alive");
        tx.send(Change::Removed(UserId::parse("a").expect("valid"))).expect("receiver alive");

        let kinds: Vec<_> = subscription.drain().iter().map(Change::kind_label).collect();
        assert_eq!(kinds, vec!["added", "removed"]);
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn cancel_is_idempotent_and_stops_delivery() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cancels);
        let (tx, rx) = mpsc::channel();
        let mut subscription = Subscription::new(SubscriptionId(7), rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tx.send(Change::Added(user("a"))).expect("receiver alive");

        subscription.cancel();
        subscription.cancel();

        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(!subscription.is_active());
        assert!(subscription.drain().is_empty());
        assert!(tx.send(Change::Added(user("b"))).is_err());
    }

    #[test]
    fn drop_cancels() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cancels);
        let (_tx, rx) = mpsc::channel::<Change<User>>();

        drop(Subscription::new(SubscriptionId(2), rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }
}
