use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::BootstrapData;

pub const BOOTSTRAP_UPDATED: &str = "bootstrap.updated";

#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: &'static str, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            occurred_at: Utc::now(),
            payload,
        }
    }
}

/// Payload of `bootstrap.updated`. `data` is a private copy: receivers can
/// do what they like with it without touching the cache.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapUpdated {
    pub role_key: String,
    pub data: BootstrapData,
}

pub type BootstrapEvent = DomainEvent<BootstrapUpdated>;

/// Broadcast channel for cache updates, so independent consumers can
/// refresh without polling.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BootstrapEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BootstrapEvent> {
        self.tx.subscribe()
    }

    /// Fire and forget; having no subscribers is not an error.
    pub fn publish_updated(&self, role_key: &str, data: &BootstrapData) {
        let event = DomainEvent::new(
            BOOTSTRAP_UPDATED,
            BootstrapUpdated {
                role_key: role_key.to_string(),
                data: data.clone(),
            },
        );
        if self.tx.send(event).is_err() {
            tracing::debug!(role_key = %role_key, "no subscribers for bootstrap update");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
