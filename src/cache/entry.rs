use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::BootstrapData;

pub(crate) type FlightResult = AppResult<Arc<BootstrapData>>;

/// Handle on a fetch running in its own task, shared by every caller that
/// asks for the same role while it is pending. Dropping a handle never
/// cancels the fetch.
#[derive(Clone)]
pub(crate) struct Flight {
    pub id: Uuid,
    result: watch::Receiver<Option<FlightResult>>,
}

impl Flight {
    pub fn start() -> (Self, watch::Sender<Option<FlightResult>>) {
        let (tx, rx) = watch::channel(None);
        (
            Self {
                id: Uuid::new_v4(),
                result: rx,
            },
            tx,
        )
    }

    pub async fn wait(mut self) -> FlightResult {
        let result = match self.result.wait_for(Option::is_some).await {
            Ok(result) => result.clone(),
            Err(_) => None,
        };
        result.unwrap_or_else(|| Err(AppError::internal("bootstrap fetch ended without a result")))
    }
}

pub(crate) struct CacheEntry {
    pub role_key: String,
    pub data: Option<Arc<BootstrapData>>,
    pub etag: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub in_flight: Option<Flight>,
}

impl CacheEntry {
    pub fn new(role_key: &str) -> Self {
        Self {
            role_key: role_key.to_string(),
            data: None,
            etag: None,
            last_fetched_at: None,
            in_flight: None,
        }
    }

    pub fn owns_flight(&self, flight: Uuid) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|current| current.id == flight)
    }

    pub fn info(&self) -> EntryInfo {
        EntryInfo {
            role_key: self.role_key.clone(),
            has_data: self.data.is_some(),
            etag: self.etag.clone(),
            last_fetched_at: self.last_fetched_at,
            in_flight: self.in_flight.is_some(),
        }
    }
}

/// Read-only view of a cache entry's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub role_key: String,
    pub has_data: bool,
    pub etag: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub in_flight: bool,
}
