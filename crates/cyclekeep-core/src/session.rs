use crate::manager::Manager;
use crate::refresh::RefreshDriver;
use crate::state::StateKind;
use cyclekeep_remote::RemoteResourceClient;
use serde_json::Value;
use std::time::Duration;

/// Owner of a manager and its refresh timer.
///
/// The timer runs only while the manager is initialized. Loading a new blob
/// restarts it, logging out stops it, and dropping the session cancels it.
pub struct Session<C> {
    manager: Manager<C>,
    period: Duration,
    driver: Option<RefreshDriver>,
}

impl<C: RemoteResourceClient + 'static> Session<C> {
    pub fn new(manager: Manager<C>, period: Duration) -> Self {
        Self {
            manager,
            period,
            driver: None,
        }
    }

    pub fn manager(&self) -> &Manager<C> {
        &self.manager
    }

    /// Boot `blob` and restart the refresh timer for the new identity.
    pub fn load(&mut self, blob: &Value) -> StateKind {
        self.stop_refresh();
        let kind = self.manager.boot(blob);
        if kind == StateKind::Initialized {
            self.driver = Some(RefreshDriver::start(self.manager.clone(), self.period));
        }
        kind
    }

    pub fn log_out(&mut self) {
        self.stop_refresh();
        self.manager.log_out();
    }

    pub fn is_refreshing(&self) -> bool {
        self.driver.as_ref().is_some_and(RefreshDriver::is_running)
    }

    fn stop_refresh(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.stop();
        }
    }
}
