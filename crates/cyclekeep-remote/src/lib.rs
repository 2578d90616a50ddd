//! Remote resource service access for Cyclekeep.
//!
//! This crate defines the [`RemoteResourceClient`] contract the manager talks
//! to (create a resource, read a resource's cycle balance, read the caller's
//! account status), an HTTP implementation authenticated by the caller's
//! Ed25519 identity, configuration for the remote endpoints, and a scriptable
//! in-memory client for tests.

pub mod config;
pub mod http;
pub mod mock;

pub use config::RemoteConfig;
pub use http::HttpClient;
pub use mock::MockRemote;

use async_trait::async_trait;
use cyclekeep_schema::{CallerHandle, ResourceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol version sent as `X-Cyclekeep-Protocol` header on all HTTP requests.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        RemoteError::Io(e.to_string())
    }
}

/// Reply to a resource creation request. `success = false` is a business
/// rejection (e.g. the account allowance is exhausted), not a transport error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResourceReply {
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
    #[serde(default)]
    pub message: String,
    pub success: bool,
}

impl CreateResourceReply {
    pub fn created(id: impl Into<ResourceId>) -> Self {
        Self {
            resource_id: Some(id.into()),
            message: String::new(),
            success: true,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            resource_id: None,
            message: message.into(),
            success: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub resource_count: u64,
    pub remaining_quota: u64,
}

/// Operations the manager needs from the remote service.
///
/// Calls are independent: callers must not assume any ordering between
/// them, and implementations never retry.
#[async_trait]
pub trait RemoteResourceClient: Send + Sync {
    /// Ask the service to create a resource owned by `caller`. At most once.
    async fn create_resource(
        &self,
        caller: &CallerHandle,
    ) -> Result<CreateResourceReply, RemoteError>;

    /// Read the remaining cycle balance of a resource.
    async fn read_resource_quota(&self, resource_id: &ResourceId) -> Result<u64, RemoteError>;

    /// Read how many resources `caller` owns and what allowance is left.
    async fn read_account_status(
        &self,
        caller: &CallerHandle,
    ) -> Result<AccountStatus, RemoteError>;
}
