use crate::lifecycle::Event;
use crate::state::{Identity, ManagerState, ReadModel, StateCell, StateKind};
use crate::CoreError;
use cyclekeep_remote::{AccountStatus, RemoteResourceClient};
use cyclekeep_schema::{
    describe_json_type, generate_key_pair, resolve_identity, validate_manager, AccountId, KeyPair,
    ResourceId, ResourceView, SerializedManager,
};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a create command ended. The manager state has already been updated
/// by the time this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The manager was not initialized; nothing was sent.
    Skipped,
    Created(ResourceView),
    Rejected(String),
    Failed(String),
}

/// Build the state a blob boots into.
///
/// The blob is validated before anything else looks at it. Empty key
/// strings mean "no identity yet", whatever the resource list holds.
pub fn boot_state(blob: &Value) -> ManagerState {
    let profile = match validate_manager(blob) {
        Ok(profile) => profile,
        Err(e) => {
            warn!("profile rejected: {e}");
            return ManagerState::Errored {
                error: format!("{e} : {} : {blob}", describe_json_type(blob)),
            };
        }
    };

    if !profile.has_keys() {
        return ManagerState::Uninitialized;
    }

    let key_pair = KeyPair::new(profile.public_key, profile.private_key);
    match resolve_identity(&key_pair) {
        Ok(resolved) => ManagerState::Initialized {
            identity: Identity {
                caller: resolved.caller,
                account: resolved.account,
                key_pair,
            },
            resources: profile.resources.iter().map(ResourceView::from).collect(),
            error: String::new(),
            creating: false,
        },
        Err(e) => {
            warn!("profile identity rejected: {e}");
            ManagerState::Errored {
                error: e.to_string(),
            }
        }
    }
}

/// A fresh profile with a new identity and no resources. Feed it back
/// through [`Manager::boot`] to use it.
pub fn new_identity() -> Result<SerializedManager, CoreError> {
    let key_pair = generate_key_pair()?;
    Ok(SerializedManager {
        resources: Vec::new(),
        public_key: key_pair.public_key,
        private_key: key_pair.private_key,
    })
}

/// Owns the manager state and talks to the remote service on its behalf.
///
/// Clones share both the state and the client, so a background refresh and
/// foreground commands all act on the same live state.
#[derive(Debug)]
pub struct Manager<C> {
    client: Arc<C>,
    state: StateCell,
}

impl<C> Clone for Manager<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            state: self.state.clone(),
        }
    }
}

impl<C: RemoteResourceClient + 'static> Manager<C> {
    pub fn new(client: C) -> Self {
        Self::with_shared_client(Arc::new(client))
    }

    pub fn with_shared_client(client: Arc<C>) -> Self {
        Self {
            client,
            state: StateCell::default(),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Replace the current state with whatever `blob` boots into.
    pub fn boot(&self, blob: &Value) -> StateKind {
        let kind = self.state.replace(boot_state(blob));
        info!("manager booted into {kind} state");
        kind
    }

    pub async fn create_resource(&self, nickname: &str) -> CreateOutcome {
        let Some(caller) = self.state.with(|s| s.identity().map(|i| i.caller.clone())) else {
            debug!("create ignored: manager not initialized");
            return CreateOutcome::Skipped;
        };
        self.state.apply(Event::CreateStarted);
        let mut in_flight = CreateInFlight {
            state: &self.state,
            account: Some(caller.account().clone()),
        };

        debug!("creating resource {nickname} for {}", caller.account());
        let outcome = self
            .client
            .create_resource(&caller)
            .await
            .map_err(|e| e.to_string());

        let result = match &outcome {
            Ok(reply) if reply.success => CreateOutcome::Created(ResourceView::pending(
                nickname,
                reply.resource_id.clone().unwrap_or_default(),
            )),
            Ok(reply) => CreateOutcome::Rejected(reply.message.clone()),
            Err(e) => {
                warn!("create request failed: {e}");
                CreateOutcome::Failed(e.clone())
            }
        };

        in_flight.account = None;
        self.state.apply(Event::CreateSettled {
            account: caller.account().clone(),
            nickname: nickname.to_owned(),
            outcome,
        });
        result
    }

    /// Run one refresh cycle: read every known resource's balance
    /// concurrently and apply each reading as soon as it arrives.
    ///
    /// Returns how many readings were applied.
    pub async fn refresh_quota(&self) -> usize {
        let ids: Vec<ResourceId> = self
            .state
            .with(|s| s.resources().iter().map(|r| r.id.clone()).collect());
        if ids.is_empty() {
            return 0;
        }
        debug!("refreshing {} resource balances", ids.len());

        let mut reads: FuturesUnordered<_> = ids
            .into_iter()
            .map(|id| {
                let client = Arc::clone(&self.client);
                async move {
                    let outcome = client.read_resource_quota(&id).await;
                    (id, outcome)
                }
            })
            .collect();

        let mut applied = 0;
        while let Some((id, outcome)) = reads.next().await {
            let outcome = outcome.map_err(|e| {
                warn!("balance read failed for {id}: {e}");
                format!("could not read cycles for {id}: {e}")
            });
            self.state.apply(Event::QuotaRead { id, outcome });
            applied += 1;
        }
        applied
    }

    pub async fn account_status(&self) -> Result<AccountStatus, CoreError> {
        let caller = self
            .state
            .with(|s| s.identity().map(|i| i.caller.clone()))
            .ok_or(CoreError::NotInitialized)?;
        debug!("reading account status for {}", caller.account());
        Ok(self.client.read_account_status(&caller).await?)
    }

    pub fn export(&self) -> Result<SerializedManager, CoreError> {
        self.state.with(ManagerState::export)
    }

    /// Generate a fresh identity profile. Does not touch the current state.
    pub fn new_identity(&self) -> Result<SerializedManager, CoreError> {
        new_identity()
    }

    pub fn log_out(&self) {
        self.state.apply(Event::LoggedOut);
    }

    pub fn read_model(&self) -> ReadModel {
        self.state.with(ManagerState::read_model)
    }

    pub fn state(&self) -> ManagerState {
        self.state.snapshot()
    }

    pub fn kind(&self) -> StateKind {
        self.state.with(ManagerState::kind)
    }
}

/// Clears the `creating` flag if a create future is dropped mid-request.
struct CreateInFlight<'a> {
    state: &'a StateCell,
    account: Option<AccountId>,
}

impl Drop for CreateInFlight<'_> {
    fn drop(&mut self) {
        if let Some(account) = self.account.take() {
            self.state.apply(Event::CreateAbandoned { account });
        }
    }
}
