//! Core state machine for Cyclekeep.
//!
//! This crate owns the manager: a closed [`ManagerState`] that is booted from
//! an untrusted profile blob, mutated by user commands and by background
//! balance refreshes, and exported back to a profile. All changes go through
//! the pure transition function in [`lifecycle`]; async results are folded in
//! one by one against the live state held in a [`StateCell`]. The
//! [`RefreshDriver`] and [`Session`] provide the periodic refresh with scoped
//! cancellation.

pub mod lifecycle;
pub mod manager;
pub mod refresh;
pub mod session;
pub mod state;

pub use lifecycle::Event;
pub use manager::{boot_state, new_identity, CreateOutcome, Manager};
pub use refresh::{RefreshDriver, DEFAULT_REFRESH_INTERVAL};
pub use session::Session;
pub use state::{Identity, ManagerState, ReadModel, StateCell, StateKind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("profile validation failed: {0}")]
    Validation(#[from] cyclekeep_schema::ValidationError),
    #[error("identity error: {0}")]
    Identity(#[from] cyclekeep_schema::IdentityError),
    #[error("key generation failed: {0}")]
    KeyGen(#[from] cyclekeep_schema::KeyGenError),
    #[error("remote error: {0}")]
    Remote(#[from] cyclekeep_remote::RemoteError),
    #[error("manager is not initialized")]
    NotInitialized,
    #[error("manager is in an error state: {0}")]
    Errored(String),
}
