//! Cache-aware client for the Doppler secrets API.
//!
//! This crate provides:
//!
//! - HTTP client for the secrets API with token (Basic) auth
//! - In-memory response cache with per-entry TTL and ETag revalidation
//! - Diff-based pushes that only send values which actually changed
//! - A client factory that keeps one cache per backing store
//!
//! # Quick Start
//!
//! ```no_run
//! use doppler_secrets::{Provider, StoreConfig};
//!
//! # async fn example() -> doppler_secrets::SecretsResult<()> {
//! let provider = Provider::new();
//! let store = StoreConfig::new("backend", "prd").with_cache(Some(30));
//!
//! let service = provider.new_client("store-uid", &store, "dp.st.xxxx")?;
//! let secret = service.get_secret("DATABASE_URL").await?;
//! println!("{} has {} bytes", secret.name, secret.value.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Caching
//!
//! Caching is off unless the store enables it. With caching on, a response
//! younger than the TTL is served without a request; an older one is
//! revalidated with `if-none-match` and a 304 returns the cached payload.
//! Nothing is persisted; the cache lives as long as the [`Provider`].
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `DOPPLER_BASE_URL` | API base URL (default: `https://api.doppler.com`) |
//! | `DOPPLER_VERIFY_TLS` | `false` disables certificate verification (default: `true`) |

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod service;
pub mod types;

// Re-export main types
pub use cache::{CacheEntry, CacheKey, CacheRegistry, CacheStore, DEFAULT_TTL};
pub use client::{ApiClient, Download};
pub use config::{CacheSettings, ClientConfig, StoreConfig, USER_AGENT};
pub use error::{SecretsError, SecretsResult};
pub use provider::Provider;
pub use service::{SecretsCache, SecretsService};
pub use types::{
    Change, NameTransformer, PushOutcome, SecretResponse, Secrets, SecretsFormat, SecretsRequest,
    SecretsResponse, UpdateSecretsRequest,
};
