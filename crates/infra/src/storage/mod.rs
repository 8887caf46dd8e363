//! Storage engine implementations and backend selection.
//!
//! Exactly one engine exists per process; [`open_engine`] builds the one the
//! configuration names and opens it. Entity code receives it as
//! `&mut dyn StorageEngine`.

pub mod file;
pub mod relational;

use hbnb_core::{StorageEngine, StoreError, StoreResult};
use tracing::info;

use crate::config::{BackendKind, StorageConfig};

pub use file::FileStorage;
pub use relational::RelationalStorage;

/// Build the configured backend without opening it.
pub fn build_engine(config: &StorageConfig) -> StoreResult<Box<dyn StorageEngine>> {
    let engine: Box<dyn StorageEngine> = match config.backend {
        BackendKind::File => Box::new(FileStorage::new(config.file_path.clone())),
        BackendKind::Relational => Box::new(RelationalStorage::new(
            config.database.clone(),
            config.environment,
        )?),
    };
    Ok(engine)
}

/// Build the configured backend and `reload` it, ready for use.
pub fn open_engine(config: &StorageConfig) -> StoreResult<Box<dyn StorageEngine>> {
    let mut engine = build_engine(config)?;
    engine.reload()?;
    info!(backend = ?config.backend, "storage engine ready");
    Ok(engine)
}

/// Read configuration from the environment and open the engine it selects.
pub fn open_from_env() -> StoreResult<Box<dyn StorageEngine>> {
    let config = StorageConfig::from_env().map_err(|e| StoreError::resource(e.to_string()))?;
    open_engine(&config)
}
