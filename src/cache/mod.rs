//! Per-role bootstrap cache with single-flight fetches.

mod entry;
mod transport;

pub use entry::EntryInfo;
pub use transport::{
    BaseUrlResolver, BootstrapRequest, BootstrapResponse, BootstrapTransport, HttpTransport,
    UrlResolver,
};

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::authz::{IdentitySource, RoleKeyResolver};
use crate::config::BootstrapConfig;
use crate::errors::{AppError, AppResult};
use crate::events::{BootstrapEvent, EventBus};
use crate::models::{BootstrapData, Column, Feature, MenuNode};
use crate::normalize::normalize_bootstrap;
use crate::query::QueryEngine;
use crate::utils::{normalize_key, utc_now};
use entry::{CacheEntry, Flight, FlightResult};

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit role key; wins over any identity.
    pub role_key: Option<String>,
    /// Identity record to derive the role from instead of the identity source.
    pub identity: Option<Value>,
    /// Skip the cache, still revalidating with the stored ETag.
    pub force: bool,
    /// Skip the cache and the ETag; always a full transfer.
    pub force_refresh: bool,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_role(mut self, role_key: impl Into<String>) -> Self {
        self.role_key = Some(role_key.into());
        self
    }

    pub fn with_identity(mut self, identity: Value) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

enum Fetched {
    Fresh(Arc<BootstrapData>, Option<String>),
    NotModified,
}

struct Inner {
    transport: Arc<dyn BootstrapTransport>,
    resolver: RoleKeyResolver,
    entries: DashMap<String, CacheEntry>,
    events: EventBus,
}

/// Explicitly constructed, cheaply cloneable cache handle. Clones share
/// state.
#[derive(Clone)]
pub struct BootstrapCache {
    inner: Arc<Inner>,
}

impl BootstrapCache {
    pub fn new(transport: Arc<dyn BootstrapTransport>, resolver: RoleKeyResolver) -> Self {
        Self::with_event_bus(transport, resolver, EventBus::default())
    }

    pub fn with_event_bus(
        transport: Arc<dyn BootstrapTransport>,
        resolver: RoleKeyResolver,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                resolver,
                entries: DashMap::new(),
                events,
            }),
        }
    }

    /// HTTP transport, resolver and event bus wired from configuration.
    pub fn from_config(config: &BootstrapConfig, identity: Arc<dyn IdentitySource>) -> AppResult<Self> {
        let transport = HttpTransport::from_config(config)?;
        tracing::debug!(url = %transport.url(), "bootstrap transport configured");
        let resolver = RoleKeyResolver::new(identity).with_default_key(&config.default_role);
        Ok(Self::with_event_bus(
            Arc::new(transport),
            resolver,
            EventBus::new(config.event_capacity),
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BootstrapEvent> {
        self.inner.events.subscribe()
    }

    pub fn resolve_role(&self, role_key: Option<&str>) -> String {
        self.inner.resolver.resolve(role_key)
    }

    pub async fn load_bootstrap(&self, options: LoadOptions) -> AppResult<Arc<BootstrapData>> {
        let role_key = self
            .inner
            .resolver
            .resolve_with(options.role_key.as_deref(), options.identity.as_ref());

        // The entry guard must be released before awaiting.
        let flight = {
            let mut entry = self
                .inner
                .entries
                .entry(role_key.clone())
                .or_insert_with(|| CacheEntry::new(&role_key));

            if let Some(flight) = entry.in_flight.clone() {
                tracing::debug!(role_key = %role_key, "joining in-flight bootstrap fetch");
                flight
            } else {
                if !options.force && !options.force_refresh {
                    if let Some(data) = &entry.data {
                        tracing::debug!(role_key = %role_key, "bootstrap cache hit");
                        return Ok(data.clone());
                    }
                }
                let etag = if options.force_refresh {
                    None
                } else {
                    entry.etag.clone()
                };
                let (flight, tx) = Flight::start();
                entry.in_flight = Some(flight.clone());

                // Runs to completion even if every caller stops waiting.
                let cache = self.clone();
                let (key, id) = (role_key.clone(), flight.id);
                tokio::spawn(async move {
                    let result = cache.fetch(&key, etag, id).await;
                    let _ = tx.send(Some(result));
                });
                flight
            }
        };

        flight.wait().await
    }

    async fn fetch(&self, role_key: &str, etag: Option<String>, flight: Uuid) -> FlightResult {
        let request = BootstrapRequest {
            role_key: role_key.to_string(),
            if_none_match: etag,
        };
        tracing::info!(
            role_key = %role_key,
            conditional = request.if_none_match.is_some(),
            "fetching bootstrap"
        );

        let outcome = self
            .inner
            .transport
            .fetch(&request)
            .await
            .map(|response| match response {
                BootstrapResponse::Modified { body, etag } => {
                    Fetched::Fresh(Arc::new(normalize_bootstrap(&body)), etag)
                }
                BootstrapResponse::NotModified => Fetched::NotModified,
            });

        let Some(mut entry) = self
            .inner
            .entries
            .get_mut(role_key)
            .filter(|entry| entry.owns_flight(flight))
        else {
            // Cleared while the request was out: hand the result to the
            // waiting callers but do not repopulate the cache.
            tracing::debug!(role_key = %role_key, "bootstrap entry cleared during fetch");
            return match outcome {
                Ok(Fetched::Fresh(data, _)) => Ok(data),
                Ok(Fetched::NotModified) => Err(AppError::protocol(
                    "not modified response for a cleared cache entry",
                )),
                Err(err) => Err(err),
            };
        };
        entry.in_flight = None;

        match outcome {
            Ok(Fetched::NotModified) => match entry.data.clone() {
                Some(data) => {
                    entry.last_fetched_at = Some(utc_now());
                    tracing::debug!(role_key = %role_key, "bootstrap not modified");
                    Ok(data)
                }
                None => Err(AppError::protocol(
                    "not modified response without a cached snapshot",
                )),
            },
            Ok(Fetched::Fresh(data, etag)) => {
                entry.data = Some(data.clone());
                entry.etag = etag;
                entry.last_fetched_at = Some(utc_now());
                drop(entry);
                self.inner.events.publish_updated(role_key, &data);
                Ok(data)
            }
            Err(err) => match entry.data.clone() {
                Some(stale) => {
                    tracing::warn!(
                        role_key = %role_key,
                        error = %err,
                        kind = err.kind(),
                        "bootstrap refresh failed, serving cached snapshot"
                    );
                    Ok(stale)
                }
                None => {
                    tracing::warn!(role_key = %role_key, error = %err, "bootstrap fetch failed");
                    Err(err)
                }
            },
        }
    }

    /// Current snapshot for a role, without fetching.
    pub fn snapshot(&self, role_key: Option<&str>) -> Option<Arc<BootstrapData>> {
        let role_key = self.resolve_role(role_key);
        self.inner
            .entries
            .get(&role_key)
            .and_then(|entry| entry.data.clone())
    }

    pub fn query(&self, role_key: Option<&str>) -> QueryEngine {
        QueryEngine::new(self.snapshot(role_key))
    }

    pub fn entry_info(&self, role_key: Option<&str>) -> Option<EntryInfo> {
        let role_key = self.resolve_role(role_key);
        self.inner.entries.get(&role_key).map(|entry| entry.info())
    }

    pub fn get_menu(&self, role_key: Option<&str>) -> Vec<MenuNode> {
        self.query(role_key).menu()
    }

    pub fn get_features_for_module(&self, module: &str, role_key: Option<&str>) -> Vec<Feature> {
        self.query(role_key)
            .features_for_module(module)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_feature(&self, module: &str, code: &str, role_key: Option<&str>) -> Option<Feature> {
        self.query(role_key).find_feature(module, code).cloned()
    }

    pub fn is_feature_enabled(
        &self,
        module: &str,
        code: &str,
        scope: Option<&str>,
        role_key: Option<&str>,
    ) -> bool {
        self.query(role_key).is_feature_enabled(module, code, scope)
    }

    pub fn get_columns(&self, module: &str, table: &str, role_key: Option<&str>) -> Vec<Column> {
        self.query(role_key).columns(module, table)
    }

    pub fn get_column(
        &self,
        module: &str,
        table: &str,
        code: &str,
        role_key: Option<&str>,
    ) -> Option<Column> {
        self.query(role_key).column(module, table, code)
    }

    /// Drops one role's entry, or every entry when `role_key` is `None`.
    pub fn clear_cache(&self, role_key: Option<&str>) {
        match role_key {
            Some(role_key) => {
                let role_key = normalize_key(role_key);
                self.inner.entries.remove(&role_key);
                tracing::debug!(role_key = %role_key, "bootstrap cache entry cleared");
            }
            None => {
                self.inner.entries.clear();
                tracing::debug!("bootstrap cache cleared");
            }
        }
    }
}
