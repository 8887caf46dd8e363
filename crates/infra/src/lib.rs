//! Infrastructure layer: configuration and the storage engine backends.

pub mod config;
pub mod storage;


pub use config::{BackendKind, ConfigError, DatabaseConfig, Environment, StorageConfig};
pub use storage::{FileStorage, RelationalStorage, build_engine, open_engine, open_from_env};
