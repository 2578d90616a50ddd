use crate::{AccountStatus, CreateResourceReply, RemoteError, RemoteResourceClient};
use async_trait::async_trait;
use cyclekeep_schema::{CallerHandle, ResourceId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Holds a scripted call open until released.
pub struct Gate {
    tx: oneshot::Sender<()>,
}

impl Gate {
    pub fn release(self) {
        let _ = self.tx.send(());
    }
}

#[derive(Default)]
struct MockState {
    quotas: HashMap<ResourceId, Result<u64, RemoteError>>,
    quota_gates: HashMap<ResourceId, oneshot::Receiver<()>>,
    create_replies: VecDeque<Result<CreateResourceReply, RemoteError>>,
    create_gate: Option<oneshot::Receiver<()>>,
    account: Option<AccountStatus>,
    create_calls: usize,
    quota_calls: Vec<ResourceId>,
}

/// In-memory remote service for tests and offline use.
///
/// Balance reads answer from a per-resource table (unknown ids are
/// `NotFound`). Create calls pop scripted replies and otherwise succeed with
/// a generated id. Gates hold individual calls open so tests can decide the
/// order in which concurrent calls resolve.
#[derive(Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock remote lock poisoned")
    }

    pub fn set_quota(&self, id: impl Into<ResourceId>, cycles: u64) {
        self.lock().quotas.insert(id.into(), Ok(cycles));
    }

    pub fn fail_quota(&self, id: impl Into<ResourceId>, message: &str) {
        self.lock()
            .quotas
            .insert(id.into(), Err(RemoteError::Http(message.to_owned())));
    }

    /// Hold the next balance read of `id` until the returned gate is released.
    pub fn gate_quota(&self, id: impl Into<ResourceId>) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.lock().quota_gates.insert(id.into(), rx);
        Gate { tx }
    }

    pub fn push_create_reply(&self, reply: CreateResourceReply) {
        self.lock().create_replies.push_back(Ok(reply));
    }

    pub fn fail_next_create(&self, message: &str) {
        self.lock()
            .create_replies
            .push_back(Err(RemoteError::Http(message.to_owned())));
    }

    /// Hold the next create call until the returned gate is released.
    pub fn gate_create(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.lock().create_gate = Some(rx);
        Gate { tx }
    }

    pub fn set_account_status(&self, status: AccountStatus) {
        self.lock().account = Some(status);
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn quota_calls(&self) -> Vec<ResourceId> {
        self.lock().quota_calls.clone()
    }
}

#[async_trait]
impl RemoteResourceClient for MockRemote {
    async fn create_resource(
        &self,
        _caller: &CallerHandle,
    ) -> Result<CreateResourceReply, RemoteError> {
        let gate = {
            let mut state = self.lock();
            state.create_calls += 1;
            state.create_gate.take()
        };
        if let Some(rx) = gate {
            let _ = rx.await;
        }

        let mut state = self.lock();
        let n = state.create_calls;
        state
            .create_replies
            .pop_front()
            .unwrap_or_else(|| Ok(CreateResourceReply::created(format!("mock-{n}"))))
    }

    async fn read_resource_quota(&self, resource_id: &ResourceId) -> Result<u64, RemoteError> {
        let gate = {
            let mut state = self.lock();
            state.quota_calls.push(resource_id.clone());
            state.quota_gates.remove(resource_id)
        };
        if let Some(rx) = gate {
            let _ = rx.await;
        }

        self.lock()
            .quotas
            .get(resource_id)
            .cloned()
            .unwrap_or_else(|| Err(RemoteError::NotFound(resource_id.to_string())))
    }

    async fn read_account_status(
        &self,
        caller: &CallerHandle,
    ) -> Result<AccountStatus, RemoteError> {
        self.lock()
            .account
            .ok_or_else(|| RemoteError::NotFound(format!("account {}", caller.account())))
    }
}
