//! Cache-aware secrets service.
//!
//! Ties [`ApiClient`] and [`CacheStore`] together:
//!
//! - an entry younger than its TTL is served without contacting the remote;
//! - an expired entry is revalidated with `if-none-match`, and a 304 returns
//!   the cached payload untouched (no cache write, so `last_checked_at` is not
//!   reset and the next call revalidates again);
//! - a 200 replaces the entry.
//!
//! Pushes read the current values first (always revalidating, never from a
//! fresh-but-unchecked entry) and only send what differs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheStore};
use crate::client::{ApiClient, Download};
use crate::config::StoreConfig;
use crate::error::{SecretsError, SecretsResult};
use crate::types::{
    Change, PushOutcome, SecretResponse, Secrets, SecretsRequest, SecretsResponse,
    UpdateSecretsRequest,
};

/// Cache of download responses.
pub type SecretsCache = CacheStore<SecretsResponse>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    /// Serve an unexpired entry without a request.
    ServeFresh,
    /// Always ask the remote, conditionally if an entry exists.
    Revalidate,
}

/// Secrets operations against one backing store.
#[derive(Debug, Clone)]
pub struct SecretsService {
    client: ApiClient,
    cache: Arc<SecretsCache>,
    store: StoreConfig,
}

impl SecretsService {
    pub fn new(client: ApiClient, cache: Arc<SecretsCache>, store: StoreConfig) -> Self {
        Self {
            client,
            cache,
            store,
        }
    }

    /// Service with a private, disabled cache.
    pub fn uncached(client: ApiClient, store: StoreConfig) -> Self {
        Self::new(client, Arc::new(CacheStore::new()), store)
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &Arc<SecretsCache> {
        &self.cache
    }

    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Check the token with the authentication probe.
    pub async fn validate(&self) -> SecretsResult<()> {
        self.client.authenticate().await
    }

    /// One secret from the bound project/config.
    pub async fn get_secret(&self, name: &str) -> SecretsResult<SecretResponse> {
        self.get_secret_in(name, &self.store.project, &self.store.config)
            .await
    }

    /// One secret by name. Absent names are [`SecretsError::NotFound`].
    pub async fn get_secret_in(
        &self,
        name: &str,
        project: &str,
        config: &str,
    ) -> SecretsResult<SecretResponse> {
        let request = SecretsRequest::new(project, config).with_secret_names([name]);
        let response = self.get_secrets(&request).await?;

        match response.get(name) {
            Some(value) => Ok(SecretResponse {
                name: name.to_string(),
                value: value.to_string(),
            }),
            None => Err(SecretsError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Everything in the bound store, with its transformer and format.
    pub async fn get_all_secrets(&self) -> SecretsResult<SecretsResponse> {
        let mut request = SecretsRequest::new(&self.store.project, &self.store.config);
        request.name_transformer = self.store.name_transformer;
        request.format = self.store.format;
        self.get_secrets(&request).await
    }

    /// Download secrets through the cache.
    pub async fn get_secrets(&self, request: &SecretsRequest) -> SecretsResult<SecretsResponse> {
        self.fetch(request, Freshness::ServeFresh).await
    }

    async fn fetch(
        &self,
        request: &SecretsRequest,
        freshness: Freshness,
    ) -> SecretsResult<SecretsResponse> {
        let key = CacheKey::for_request(self.client.token(), request);
        let cached = self.cache.read(&key);

        if let Some(entry) = &cached {
            if freshness == Freshness::ServeFresh && !entry.is_expired() {
                debug!(cache_key = %key, "cache hit");
                return Ok(entry.data.clone());
            }
        }

        // A caller-held ETag only stands in when there is nothing cached.
        let if_none_match = match &cached {
            Some(entry) => entry.conditional_etag(),
            None => request.etag.as_deref(),
        };
        debug!(
            cache_key = %key,
            cached = cached.is_some(),
            etag = ?if_none_match,
            "fetching secrets"
        );

        match self.client.download_secrets(request, if_none_match).await? {
            Download::NotModified => match cached {
                Some(entry) => {
                    debug!(cache_key = %key, etag = ?entry.etag, "not modified, skipping cache update");
                    Ok(entry.data)
                }
                None => Ok(SecretsResponse {
                    etag: request.etag.clone(),
                    not_modified: true,
                    ..Default::default()
                }),
            },
            Download::Fetched { body, etag } => {
                let response = decode_response(request, body, etag)?;
                self.cache
                    .write(key, response.etag.clone(), Utc::now(), response.clone());
                Ok(response)
            }
        }
    }

    /// Push only the values that differ from the remote.
    ///
    /// Empty `project`/`config` fall back to the bound store. Dropped from
    /// the push: secrets whose value already matches, set-changes that
    /// would not change anything, deletes of names that do not exist. No
    /// request is sent when nothing remains.
    pub async fn update_secrets(
        &self,
        mut request: UpdateSecretsRequest,
    ) -> SecretsResult<PushOutcome> {
        if request.project.is_empty() {
            request.project = self.store.project.clone();
        }
        if request.config.is_empty() {
            request.config = self.store.config.clone();
        }

        let current = self
            .fetch(
                &SecretsRequest::new(&request.project, &request.config),
                Freshness::Revalidate,
            )
            .await?
            .secrets
            .unwrap_or_default();

        request.secrets.retain(|name, value| {
            let unchanged = current.get(name).map(String::as_str) == Some(value.as_str());
            if unchanged {
                debug!(secret = %name, "skipping secret push, value hasn't changed");
            }
            !unchanged
        });
        request.change_requests.retain(|change| {
            let noop = is_noop_change(change, &current);
            if noop {
                debug!(secret = %change.name, "skipping change request, nothing to change");
            }
            !noop
        });

        if request.is_empty() {
            debug!(project = %request.project, config = %request.config, "nothing to push");
            return Ok(PushOutcome::Unchanged);
        }

        let mut keys: Vec<String> = request.secrets.keys().cloned().collect();
        keys.extend(request.change_requests.iter().map(|c| c.name.clone()));

        info!(
            project = %request.project,
            config = %request.config,
            count = keys.len(),
            "performing secret push"
        );
        self.client.push_secrets(&request).await?;

        Ok(PushOutcome::Pushed { keys })
    }

    /// Delete secrets from the bound store.
    pub async fn delete_secrets<I, S>(&self, names: I) -> SecretsResult<PushOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = UpdateSecretsRequest::new(&self.store.project, &self.store.config);
        request.change_requests = names.into_iter().map(Change::delete).collect();
        self.update_secrets(request).await
    }
}

fn is_noop_change(change: &Change, current: &Secrets) -> bool {
    if change.should_delete {
        return !current.contains_key(&change.original_name);
    }
    change.name == change.original_name
        && change.value.is_some()
        && current.get(&change.name) == change.value.as_ref()
}

fn decode_response(
    request: &SecretsRequest,
    body: Vec<u8>,
    etag: Option<String>,
) -> SecretsResult<SecretsResponse> {
    // Non-JSON formats are opaque.
    if request.wants_raw_body() {
        return Ok(SecretsResponse {
            secrets: None,
            body,
            etag,
            not_modified: false,
        });
    }

    let secrets: Secrets = serde_json::from_slice(&body)
        .map_err(|e| SecretsError::decode("unable to decode secrets payload", e))?;

    Ok(SecretsResponse {
        secrets: Some(secrets),
        body,
        etag,
        not_modified: false,
    })
}
