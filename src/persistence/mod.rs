use crate::EstimateWorkspace;
use crate::node_validation::ValidationError;
use serde_json::Error as SerdeJsonError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid estimate: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Somewhere an estimate can be saved to and restored from.
pub trait EstimateStore {
    fn save_estimate(&self, workspace: &EstimateWorkspace) -> PersistenceResult<()>;
    /// Restores into `workspace`. `Ok(false)` when nothing has been stored yet.
    fn load_estimate(&self, workspace: &mut EstimateWorkspace) -> PersistenceResult<bool>;
}

pub mod file;

pub use file::{
    JsonFileStore, load_estimate_from_json, save_estimate_to_json, save_line_items_to_csv,
    write_line_items_csv,
};
