//! Client factory for backing stores.
//!
//! The host creates a new client for every operation. The [`Provider`] keeps
//! one response cache per store identity alive between those clients, so a
//! cache outlives any single request without a process-global map.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheRegistry, CacheStore};
use crate::client::ApiClient;
use crate::config::{ClientConfig, StoreConfig};
use crate::error::{SecretsError, SecretsResult};
use crate::service::{SecretsCache, SecretsService};
use crate::types::SecretsResponse;

#[derive(Debug, Default)]
pub struct Provider {
    caches: CacheRegistry<SecretsResponse>,
}

impl Provider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service for `store`, configured from the environment.
    ///
    /// `store_id` must be stable for the lifetime of the backing store (a
    /// UID, not a name that can be reused).
    pub fn new_client(
        &self,
        store_id: &str,
        store: &StoreConfig,
        token: &str,
    ) -> SecretsResult<SecretsService> {
        self.new_client_with_config(store_id, store, token, ClientConfig::from_env())
    }

    pub fn new_client_with_config(
        &self,
        store_id: &str,
        store: &StoreConfig,
        token: &str,
        config: ClientConfig,
    ) -> SecretsResult<SecretsService> {
        if token.is_empty() {
            return Err(SecretsError::Config {
                message: "authentication token is empty".to_string(),
            });
        }

        let cache = self.cache_for_store(store_id, store);
        let client = ApiClient::new(token, config)?;

        Ok(SecretsService::new(client, cache, store.clone()))
    }

    /// Shared cache of a store, if one was ever created.
    pub fn cache(&self, store_id: &str) -> Option<Arc<SecretsCache>> {
        self.caches.get(store_id)
    }

    fn cache_for_store(&self, store_id: &str, store: &StoreConfig) -> Arc<SecretsCache> {
        let settings = match store.cache.as_ref().filter(|c| c.enabled()) {
            Some(settings) => settings,
            None => return Arc::new(CacheStore::new()),
        };

        let cache = self.caches.get_or_create(store_id);
        cache.enable();
        if let Some(ttl) = settings.ttl {
            cache.set_ttl(Duration::from_secs(ttl));
        }
        debug!(store_id, ttl_secs = cache.ttl().as_secs(), "response caching enabled");

        cache
    }
}
