//! Background trigger task
//!
//! Runs one sync on start (when a user is known) and one on every
//! transition into the online state. Connectivity is still followed while
//! a sync runs; a change seen then is answered with a follow-up sync once
//! the running one finishes. There is no periodic polling.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use jot_core::ConnectivityStatus;

use crate::engine::SyncEngine;
use crate::report::SyncTrigger;

/// Handle to the running trigger task; aborts the task when dropped
#[derive(Debug)]
pub struct AutoSync {
    handle: JoinHandle<()>,
}

impl AutoSync {
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the task now
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) fn spawn(engine: SyncEngine, rx: watch::Receiver<ConnectivityStatus>) -> AutoSync {
    AutoSync {
        handle: tokio::spawn(run(engine, rx)),
    }
}

async fn run(engine: SyncEngine, mut rx: watch::Receiver<ConnectivityStatus>) {
    let config = engine.config().clone();
    let has_user = engine.user().is_some();
    let online = rx.borrow_and_update().online;
    engine.set_online(online);
    info!(online, "Auto-sync started");

    let mut next = (config.sync_on_start && has_user).then_some(SyncTrigger::Startup);
    loop {
        if let Some(trigger) = next.take()
            && sync_watching(&engine, &mut rx, trigger).await
        {
            // Connectivity moved while syncing; the offline stretch may
            // already be over, so treat the current state as a fresh edge
            if rx.borrow().online && config.sync_on_reconnect && has_user {
                next = Some(SyncTrigger::Reconnect);
                continue;
            }
        }

        if rx.changed().await.is_err() {
            break;
        }
        let online = rx.borrow_and_update().online;
        engine.set_online(online);

        // Subscribers only wake on transitions, so a wake-up that reads
        // online follows an offline period even if it never showed here
        if online && config.sync_on_reconnect && has_user {
            next = Some(SyncTrigger::Reconnect);
        }
    }

    debug!("Connectivity monitor closed, auto-sync stopped");
}

/// Run one sync while following the monitor; returns whether it changed
async fn sync_watching(
    engine: &SyncEngine,
    rx: &mut watch::Receiver<ConnectivityStatus>,
    trigger: SyncTrigger,
) -> bool {
    let sync = sync_once(engine, trigger);
    tokio::pin!(sync);

    let mut changed = false;
    let mut monitor_open = true;
    loop {
        tokio::select! {
            () = &mut sync => return changed,
            result = rx.changed(), if monitor_open => match result {
                Ok(()) => {
                    let online = rx.borrow_and_update().online;
                    engine.set_online(online);
                    changed = true;
                }
                Err(_) => monitor_open = false,
            },
        }
    }
}

async fn sync_once(engine: &SyncEngine, trigger: SyncTrigger) {
    match engine.sync_now(trigger).await {
        Ok(report) if report.has_failures() => {
            debug!(%trigger, failures = report.remote_errors().len(), "Automatic sync left failures for retry");
        }
        Ok(_) => {}
        Err(e) => warn!(%trigger, error = %e, "Automatic sync failed"),
    }
}
