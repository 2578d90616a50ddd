use crate::CoreError;
use cyclekeep_schema::{AccountId, CallerHandle, KeyPair, ResourceView, SerializedManager};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything an initialized manager knows about who it is.
#[derive(Debug, Clone)]
pub struct Identity {
    pub caller: CallerHandle,
    pub account: AccountId,
    /// Raw strings, kept so the identity can be exported unchanged.
    pub key_pair: KeyPair,
}

#[derive(Debug, Clone, Default)]
pub enum ManagerState {
    #[default]
    Uninitialized,
    Initialized {
        identity: Identity,
        resources: Vec<ResourceView>,
        error: String,
        creating: bool,
    },
    Errored {
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Uninitialized,
    Initialized,
    Errored,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::Uninitialized => write!(f, "uninitialized"),
            StateKind::Initialized => write!(f, "initialized"),
            StateKind::Errored => write!(f, "errored"),
        }
    }
}

impl ManagerState {
    pub fn kind(&self) -> StateKind {
        match self {
            ManagerState::Uninitialized => StateKind::Uninitialized,
            ManagerState::Initialized { .. } => StateKind::Initialized,
            ManagerState::Errored { .. } => StateKind::Errored,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ManagerState::Initialized { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn resources(&self) -> &[ResourceView] {
        match self {
            ManagerState::Initialized { resources, .. } => resources,
            _ => &[],
        }
    }

    pub fn error(&self) -> &str {
        match self {
            ManagerState::Initialized { error, .. } | ManagerState::Errored { error } => error,
            ManagerState::Uninitialized => "",
        }
    }

    pub fn is_creating(&self) -> bool {
        matches!(self, ManagerState::Initialized { creating: true, .. })
    }

    /// Collapse to the persisted form.
    ///
    /// An uninitialized manager exports the empty profile; an errored one
    /// has nothing trustworthy to export and fails with its message.
    pub fn export(&self) -> Result<SerializedManager, CoreError> {
        match self {
            ManagerState::Initialized {
                identity,
                resources,
                ..
            } => Ok(SerializedManager {
                resources: resources.iter().map(ResourceView::to_record).collect(),
                public_key: identity.key_pair.public_key.clone(),
                private_key: identity.key_pair.private_key.clone(),
            }),
            ManagerState::Uninitialized => Ok(SerializedManager::empty()),
            ManagerState::Errored { error } => Err(CoreError::Errored(error.clone())),
        }
    }

    pub fn read_model(&self) -> ReadModel {
        ReadModel {
            state: self.kind(),
            error: self.error().to_owned(),
            creating: self.is_creating(),
            account_id: self
                .identity()
                .map(|i| i.account.to_string())
                .unwrap_or_default(),
            resources: self.resources().to_vec(),
        }
    }
}

/// What a presentation layer gets to see. Resources are keyed by `id`;
/// positions are not stable across refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadModel {
    pub state: StateKind,
    pub error: String,
    pub creating: bool,
    pub account_id: String,
    pub resources: Vec<ResourceView>,
}

/// Shared home of the live [`ManagerState`].
///
/// Every mutation replaces the whole state under the lock. The lock is
/// never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct StateCell {
    inner: Arc<Mutex<ManagerState>>,
}

impl StateCell {
    pub fn new(state: ManagerState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.inner.lock().expect("manager state lock poisoned")
    }

    pub fn snapshot(&self) -> ManagerState {
        self.lock().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&ManagerState) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }

    pub fn replace(&self, next: ManagerState) -> StateKind {
        let kind = next.kind();
        *self.lock() = next;
        kind
    }

    /// Fold one event into whatever state is current right now.
    pub fn apply(&self, event: crate::Event) -> StateKind {
        let mut guard = self.lock();
        let current = std::mem::take(&mut *guard);
        *guard = current.apply(event);
        guard.kind()
    }
}
