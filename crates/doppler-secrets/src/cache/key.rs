//! Cache key derivation.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::SecretsRequest;

/// Key of one cached response shape.
///
/// Readable `project:config:` prefix followed by a SHA-256 over every field
/// that changes the response, the token included. The token never appears in
/// the clear.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(token: &str, request: &SecretsRequest) -> Self {
        let mut names: Vec<&str> = request.secret_names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();

        let mut hasher = Sha256::new();
        // Length-prefixed fields so that no two tuples share an encoding.
        for field in [
            token,
            request.project.as_str(),
            request.config.as_str(),
            request.name_transformer.map(|t| t.as_str()).unwrap_or(""),
            request.format.map(|f| f.as_str()).unwrap_or(""),
        ] {
            update_field(&mut hasher, field);
        }
        hasher.update((names.len() as u64).to_be_bytes());
        for name in names {
            update_field(&mut hasher, name);
        }

        Self(format!(
            "{}:{}:{:x}",
            request.project,
            request.config,
            hasher.finalize()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field.as_bytes());
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
