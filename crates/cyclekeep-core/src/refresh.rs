use crate::manager::Manager;
use cyclekeep_remote::RemoteResourceClient;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically refreshes a manager's balances on the current tokio runtime.
///
/// The first cycle runs immediately. The background task is aborted when the
/// driver is stopped or dropped, so every exit path cancels the timer.
/// Readings already in flight at that point are discarded with the task.
pub struct RefreshDriver {
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl RefreshDriver {
    pub fn start<C>(manager: Manager<C>, period: Duration) -> Self
    where
        C: RemoteResourceClient + 'static,
    {
        let period = period.max(MIN_REFRESH_INTERVAL);
        debug!("starting balance refresh every {period:?}");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let applied = manager.refresh_quota().await;
                trace!("refresh cycle applied {applied} readings");
            }
        });
        Self {
            handle: Some(handle),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("stopping balance refresh");
            handle.abort();
        }
    }
}

impl Drop for RefreshDriver {
    fn drop(&mut self) {
        self.abort();
    }
}
