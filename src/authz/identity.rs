use std::sync::RwLock;

use serde_json::Value;

/// Read-only view of the signed-in user, as kept by the session layer.
pub trait IdentitySource: Send + Sync {
    /// The current user record, or `None` when nobody is signed in or the
    /// stored record cannot be read.
    fn current_user(&self) -> Option<Value>;
}

/// No signed-in user; every lookup falls through to the default role.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentitySource for AnonymousIdentity {
    fn current_user(&self) -> Option<Value> {
        None
    }
}

#[derive(Debug, Default)]
struct Slots {
    session: Option<String>,
    local: Option<String>,
}

/// Identity backed by raw JSON strings from a session-scoped slot and a
/// longer-lived local slot, read in that order. Malformed JSON in one slot
/// falls through to the next.
#[derive(Debug, Default)]
pub struct StorageIdentity {
    slots: RwLock<Slots>,
}

impl StorageIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, raw: impl Into<String>) -> Self {
        self.set_session(Some(raw.into()));
        self
    }

    pub fn with_local(self, raw: impl Into<String>) -> Self {
        self.set_local(Some(raw.into()));
        self
    }

    pub fn set_session(&self, raw: Option<String>) {
        let mut slots = self.slots.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.session = raw;
    }

    pub fn set_local(&self, raw: Option<String>) {
        let mut slots = self.slots.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.local = raw;
    }
}

impl IdentitySource for StorageIdentity {
    fn current_user(&self) -> Option<Value> {
        let slots = self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let user = [slots.session.as_deref(), slots.local.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|raw| match serde_json::from_str::<Value>(raw) {
                Ok(value) if value.is_object() => Some(value),
                Ok(_) => None,
                Err(err) => {
                    tracing::debug!(error = %err, "ignoring malformed stored user record");
                    None
                }
            });
        user
    }
}

/// Fixed identity, mostly for tests and tools.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<Value>);

impl IdentitySource for StaticIdentity {
    fn current_user(&self) -> Option<Value> {
        self.0.clone()
    }
}
