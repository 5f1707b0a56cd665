//! `jjcims-store` — pluggable storage connectors for JJCIMS.
//!
//! One trait, three backends: the local single-file database, the remote
//! HTTP API, and an in-memory store for tests and development. Connector
//! calls are synchronous and blocking; no storage handle survives between
//! calls, so a store value can be shared freely across worker threads.

pub mod config;
pub mod error;
pub mod local;
pub mod memory;
pub mod paths;
pub mod remote;
pub mod retry;
mod store;

pub use config::{BackendKind, Config};
pub use error::{StoreError, StoreResult};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use paths::{DB_FILE_NAME, resolve_database_path};
pub use remote::RemoteStore;
pub use retry::RetryPolicy;
pub use store::Store;

/// Open the backend selected by configuration.
pub fn open_store(config: &Config) -> StoreResult<Box<dyn Store>> {
    match config.backend {
        BackendKind::LocalFile => {
            let path = resolve_database_path(config.db_path.as_deref());
            Ok(Box::new(LocalStore::open(path, config.retry)?))
        }
        BackendKind::RemoteApi => {
            Ok(Box::new(RemoteStore::new(&config.api_url, config.retry)?))
        }
    }
}
