//! Push-driven connectivity monitor
//!
//! [`ManualConnectivity`] holds the last reachability value reported by the
//! host platform (or a test) and fans transitions out to subscribers.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::traits::{ConnectivityMonitor, ConnectivityStatus};

/// Connectivity monitor whose status is set explicitly
///
/// Platform glue calls [`set_online`](Self::set_online) when the OS reports
/// a reachability change. Subscribers are only woken on actual transitions.
#[derive(Debug)]
pub struct ManualConnectivity {
    tx: watch::Sender<ConnectivityStatus>,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(ConnectivityStatus { online });
        Self { tx }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Report a reachability value; returns whether it was a transition
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|status| {
            if status.online == online {
                false
            } else {
                status.online = online;
                true
            }
        });
        if changed {
            debug!(online, "Connectivity changed");
        }
        changed
    }

    pub fn is_online(&self) -> bool {
        self.tx.borrow().online
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::online()
    }
}

#[async_trait]
impl ConnectivityMonitor for ManualConnectivity {
    async fn current_status(&self) -> ConnectivityStatus {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_status_tracks_updates() {
        let monitor = ManualConnectivity::offline();
        assert!(!monitor.current_status().await.online);

        assert!(monitor.set_online(true));
        assert!(monitor.current_status().await.online);
    }

    #[tokio::test]
    async fn test_subscribers_see_only_transitions() {
        let monitor = ManualConnectivity::offline();
        let mut rx = monitor.subscribe();

        assert!(!monitor.set_online(false));
        assert!(!rx.has_changed().unwrap());

        assert!(monitor.set_online(true));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().online);
    }

    #[test]
    fn test_dropped_subscriber_does_not_block_updates() {
        let monitor = ManualConnectivity::online();
        drop(monitor.subscribe());

        assert!(monitor.set_online(false));
        assert!(!monitor.is_online());
        assert_eq!(
            tokio_test::block_on(monitor.current_status()),
            ConnectivityStatus::OFFLINE
        );
    }
}
