//! Identity and role-key resolution.
//!
//! The engine never writes identity state. It reads the current user record
//! through an [`IdentitySource`] and turns it into the role key that
//! partitions the bootstrap cache:
//! - explicit keys passed by the caller
//! - the user's `role` (string or object)
//! - legacy identity fields kept by older call sites
//! - a fixed default partition

mod identity;
mod role_key;

pub use identity::{AnonymousIdentity, IdentitySource, StaticIdentity, StorageIdentity};
pub use role_key::{role_from_identity, RoleKeyResolver, DEFAULT_ROLE_KEY};
