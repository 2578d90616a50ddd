use crate::types::ResourceId;
use serde::{Deserialize, Serialize};

/// The persisted and exchanged form of a manager: its resources plus the
/// key-pair strings it authenticates with.
///
/// A profile with either key string empty is an uninitialized profile,
/// whatever its resource list says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedManager {
    #[serde(alias = "canisters")]
    pub resources: Vec<ResourceRecord>,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

impl SerializedManager {
    /// The empty profile: no identity, no resources.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_keys(&self) -> bool {
        !self.public_key.is_empty() && !self.private_key.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Plain structs of strings and integers always serialize.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Last known cycle balance of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    #[serde(alias = "remainingCycles")]
    pub remaining: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub nickname: String,
    pub id: ResourceId,
    #[serde(default, alias = "remainingCyclesInfo")]
    pub quota: Quota,
}

impl ResourceRecord {
    pub fn new(nickname: impl Into<String>, id: impl Into<ResourceId>, remaining: u64) -> Self {
        Self {
            nickname: nickname.into(),
            id: id.into(),
            quota: Quota { remaining },
        }
    }

    pub fn remaining_quota(&self) -> u64 {
        self.quota.remaining
    }

    /// Project into the in-memory view. No quota has been read yet, so the
    /// view starts out loading.
    pub fn to_view(&self) -> ResourceView {
        ResourceView {
            nickname: self.nickname.clone(),
            id: self.id.clone(),
            remaining_quota: self.quota.remaining,
            loading: true,
            error: String::new(),
        }
    }
}

/// A [`ResourceRecord`] plus transient refresh status. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceView {
    pub nickname: String,
    pub id: ResourceId,
    pub remaining_quota: u64,
    pub loading: bool,
    pub error: String,
}

impl ResourceView {
    /// A freshly created resource whose balance has not been read yet.
    pub fn pending(nickname: impl Into<String>, id: impl Into<ResourceId>) -> Self {
        Self {
            nickname: nickname.into(),
            id: id.into(),
            remaining_quota: 0,
            loading: true,
            error: String::new(),
        }
    }

    /// Drop the status fields.
    pub fn to_record(&self) -> ResourceRecord {
        ResourceRecord::new(self.nickname.clone(), self.id.clone(), self.remaining_quota)
    }
}

impl From<&ResourceRecord> for ResourceView {
    fn from(record: &ResourceRecord) -> Self {
        record.to_view()
    }
}

impl From<&ResourceView> for ResourceRecord {
    fn from(view: &ResourceView) -> Self {
        view.to_record()
    }
}
