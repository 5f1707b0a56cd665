//! Process configuration, read from the environment once at startup and
//! treated as read-only thereafter.

use std::path::PathBuf;

use crate::retry::RetryPolicy;

/// `JJCIMS_DB_TYPE` selects the backend.
pub const ENV_DB_TYPE: &str = "JJCIMS_DB_TYPE";
/// `JJCIMS_API_URL` points the remote backend at its API.
pub const ENV_API_URL: &str = "JJCIMS_API_URL";
/// `JJCIMS_DB` overrides the database artifact path.
pub const ENV_DB_PATH: &str = "JJCIMS_DB";
/// `JJCIMS_FERNET_KEY` carries the base64 32-byte credential key.
pub const ENV_FERNET_KEY: &str = "JJCIMS_FERNET_KEY";

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Which connector backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// `access`: the single-file database at the resolved path.
    #[default]
    LocalFile,
    /// `mysql`: the deployment whose database sits behind the HTTP API.
    RemoteApi,
}

impl BackendKind {
    /// Parse a `JJCIMS_DB_TYPE` value (case-insensitive). Unknown values
    /// fall back to the local file backend.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "mysql" => BackendKind::RemoteApi,
            "access" => BackendKind::LocalFile,
            "" => BackendKind::LocalFile,
            other => {
                tracing::warn!(value = other, "unknown {ENV_DB_TYPE}, defaulting to access");
                BackendKind::LocalFile
            }
        }
    }
}

/// Startup configuration for the core.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub api_url: String,
    pub db_path: Option<PathBuf>,
    /// Base64 32-byte symmetric key for stored credentials.
    pub fernet_key: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            api_url: DEFAULT_API_URL.to_string(),
            db_path: None,
            fernet_key: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        let backend = std::env::var(ENV_DB_TYPE)
            .map(|v| BackendKind::parse(&v))
            .unwrap_or_default();
        let api_url = std::env::var(ENV_API_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let db_path = std::env::var(ENV_DB_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let fernet_key = std::env::var(ENV_FERNET_KEY)
            .ok()
            .filter(|v| !v.trim().is_empty());

        Self {
            backend,
            api_url,
            db_path,
            fernet_key,
            retry: RetryPolicy::default(),
        }
    }
}
