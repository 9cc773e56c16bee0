//! Request and response types for the secrets API.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SecretsError;

/// Secret name to value.
pub type Secrets = BTreeMap<String, String>;

/// Name transform applied by the remote before returning secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameTransformer {
    UpperCamel,
    Camel,
    LowerSnake,
    TfVar,
    DotnetEnv,
    LowerKebab,
}

impl NameTransformer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpperCamel => "upper-camel",
            Self::Camel => "camel",
            Self::LowerSnake => "lower-snake",
            Self::TfVar => "tf-var",
            Self::DotnetEnv => "dotnet-env",
            Self::LowerKebab => "lower-kebab",
        }
    }
}

impl fmt::Display for NameTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameTransformer {
    type Err = SecretsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upper-camel" => Ok(Self::UpperCamel),
            "camel" => Ok(Self::Camel),
            "lower-snake" => Ok(Self::LowerSnake),
            "tf-var" => Ok(Self::TfVar),
            "dotnet-env" => Ok(Self::DotnetEnv),
            "lower-kebab" => Ok(Self::LowerKebab),
            other => Err(SecretsError::Config {
                message: format!("unknown name transformer: {}", other),
            }),
        }
    }
}

/// Download format. Anything but `Json` is returned as an opaque body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretsFormat {
    Json,
    DotnetJson,
    Env,
    Yaml,
    Docker,
}

impl SecretsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::DotnetJson => "dotnet-json",
            Self::Env => "env",
            Self::Yaml => "yaml",
            Self::Docker => "docker",
        }
    }

    /// Whether the body decodes into a flat [`Secrets`] map.
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

impl fmt::Display for SecretsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretsFormat {
    type Err = SecretsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "dotnet-json" => Ok(Self::DotnetJson),
            "env" => Ok(Self::Env),
            "yaml" => Ok(Self::Yaml),
            "docker" => Ok(Self::Docker),
            other => Err(SecretsError::Config {
                message: format!("unknown secrets format: {}", other),
            }),
        }
    }
}

/// Download request for a project/config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretsRequest {
    pub project: String,
    pub config: String,
    pub name_transformer: Option<NameTransformer>,
    pub format: Option<SecretsFormat>,

    /// Names to fetch. Empty means all secrets.
    pub secret_names: Vec<String>,

    /// ETag the caller already holds. Only used when there is no cache entry.
    pub etag: Option<String>,
}

impl SecretsRequest {
    pub fn new(project: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            config: config.into(),
            ..Default::default()
        }
    }

    pub fn with_secret_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secret_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_name_transformer(mut self, transformer: NameTransformer) -> Self {
        self.name_transformer = Some(transformer);
        self
    }

    pub fn with_format(mut self, format: SecretsFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// True when the body must be kept as opaque bytes.
    pub fn wants_raw_body(&self) -> bool {
        self.format.map(|f| !f.is_json()).unwrap_or(false)
    }

    /// Query parameters for the download endpoint. Empty fields are omitted.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if !self.project.is_empty() {
            params.push(("project", self.project.clone()));
        }
        if !self.config.is_empty() {
            params.push(("config", self.config.clone()));
        }
        if !self.secret_names.is_empty() {
            params.push(("secrets", self.secret_names.join(",")));
        }
        if let Some(transformer) = self.name_transformer {
            params.push(("name_transformer", transformer.as_str().to_string()));
        }
        if let Some(format) = self.format {
            params.push(("format", format.as_str().to_string()));
        }

        params
    }
}

/// Downloaded secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretsResponse {
    /// Decoded secrets. `None` for non-JSON formats.
    pub secrets: Option<Secrets>,

    /// Response body as received.
    pub body: Vec<u8>,

    /// ETag of the response.
    pub etag: Option<String>,

    /// Set when the remote answered 304 to a caller-supplied ETag and
    /// there was no cached payload to return.
    pub not_modified: bool,
}

impl SecretsResponse {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.secrets
            .as_ref()
            .and_then(|s| s.get(name))
            .map(String::as_str)
    }
}

/// A single secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretResponse {
    pub name: String,
    pub value: String,
}

/// One secret mutation inside a push request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub name: String,

    #[serde(rename = "originalName")]
    pub original_name: String,

    /// `None` serializes as `null`.
    pub value: Option<String>,

    #[serde(rename = "shouldDelete", default, skip_serializing_if = "is_false")]
    pub should_delete: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Change {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            original_name: name.clone(),
            name,
            value: Some(value.into()),
            should_delete: false,
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            original_name: name.clone(),
            name,
            value: None,
            should_delete: true,
        }
    }
}

/// Body of `POST /v3/configs/config/secrets`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSecretsRequest {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: Secrets,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub change_requests: Vec<Change>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config: String,
}

impl UpdateSecretsRequest {
    pub fn new(project: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            config: config.into(),
            ..Default::default()
        }
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    pub fn with_change(mut self, change: Change) -> Self {
        self.change_requests.push(change);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty() && self.change_requests.is_empty()
    }
}

/// Result of a diff-based push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Nothing differed from the remote; no request was sent.
    Unchanged,

    /// Keys that were sent.
    Pushed { keys: Vec<String> },
}

/// Error body returned by the API for status >= 400.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub messages: Vec<String>,

    #[serde(default)]
    pub success: bool,
}
