use super::{AuthEvents, Identity};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedSender};

/// Fan-out of auth-state transitions to every subscriber, replaying the current
/// state on subscribe.
#[derive(Debug, Default)]
pub(crate) struct AuthStateBroadcaster {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    current: Option<Identity>,
    listeners: Vec<UnboundedSender<Option<Identity>>>,
}

impl AuthStateBroadcaster {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> AuthEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(inner.current.clone());
        inner.listeners.push(tx);
        rx
    }

    pub(crate) fn publish(&self, identity: Option<Identity>) {
        let mut inner = self.lock();
        inner.current.clone_from(&identity);
        inner
            .listeners
            .retain(|listener| listener.send(identity.clone()).is_ok());
    }

    /// Swaps in a refreshed record for the signed-in user without notifying
    /// anyone. Ignored when nobody, or another user, is signed in.
    pub(crate) fn replace_current(&self, identity: Identity) {
        let mut inner = self.lock();
        if inner
            .current
            .as_ref()
            .is_some_and(|current| current.uid == identity.uid)
        {
            inner.current = Some(identity);
        }
    }

    pub(crate) fn current(&self) -> Option<Identity> {
        self.lock().current.clone()
    }

    pub(crate) fn listener_count(&self) -> usize {
        let mut inner = self.lock();
        inner.listeners.retain(|listener| !listener.is_closed());
        inner.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_replays_current_state() {
        let broadcaster = AuthStateBroadcaster::default();
        broadcaster.publish(Some(Identity::new("u1")));

        let mut events = broadcaster.subscribe();
        assert_eq!(events.recv().await, Some(Some(Identity::new("u1"))));
    }

    #[tokio::test]
    async fn publish_reaches_every_listener() {
        let broadcaster = AuthStateBroadcaster::default();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(first.recv().await, Some(None));
        assert_eq!(second.recv().await, Some(None));

        broadcaster.publish(Some(Identity::new("u2")));
        assert_eq!(first.recv().await, Some(Some(Identity::new("u2"))));
        assert_eq!(second.recv().await, Some(Some(Identity::new("u2"))));
    }

    #[tokio::test]
    async fn replace_current_is_silent_and_replayed() {
        let broadcaster = AuthStateBroadcaster::default();
        broadcaster.publish(Some(Identity::new("u1")));
        let mut existing = broadcaster.subscribe();
        assert_eq!(existing.recv().await, Some(Some(Identity::new("u1"))));

        let renamed = Identity::new("u1").with_display_name("Alice");
        broadcaster.replace_current(renamed.clone());
        assert!(existing.try_recv().is_err());
        assert_eq!(broadcaster.current(), Some(renamed.clone()));

        let mut late = broadcaster.subscribe();
        assert_eq!(late.recv().await, Some(Some(renamed)));

        broadcaster.replace_current(Identity::new("u2"));
        assert_eq!(broadcaster.current().map(|i| i.uid), Some("u1".to_string()));
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let broadcaster = AuthStateBroadcaster::default();
        let kept = broadcaster.subscribe();
        drop(broadcaster.subscribe());
        assert_eq!(broadcaster.listener_count(), 1);
        drop(kept);
        assert_eq!(broadcaster.listener_count(), 0);
    }
}
