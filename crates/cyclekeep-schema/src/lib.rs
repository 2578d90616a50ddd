//! Profile data model, schema validation, and identity for Cyclekeep.
//!
//! This crate defines the persisted profile (`SerializedManager`) and its
//! resource records, the in-memory `ResourceView` projection, the structural
//! validator that gates every untrusted blob (`validate_manager`), and the
//! Ed25519 key-pair service that turns stored keys into a caller identity and
//! a deterministic account reference.

pub mod identity;
pub mod profile;
pub mod types;
pub mod validate;

pub use identity::{
    account_id_for, generate_key_pair, resolve_identity, verify_signature, CallerHandle,
    IdentityError, KeyGenError, KeyPair, ResolvedIdentity,
};
pub use profile::{Quota, ResourceRecord, ResourceView, SerializedManager};
pub use types::{AccountId, ResourceId};
pub use validate::{
    describe_json_type, manager_schema, validate_manager, Field, Shape, ValidationError,
};
