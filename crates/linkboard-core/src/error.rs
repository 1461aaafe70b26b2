//! Error taxonomy for the scene graph engine.
//!
//! Everything here is recoverable: structural inconsistencies are healed by
//! pruning, invalid property values are rejected with the prior value kept,
//! and unresolvable records are skipped during import. Nothing in this crate
//! aborts the process.

use thiserror::Error;

/// Errors surfaced by scene graph operations.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A dangling node/port/link reference was attempted. Resolved by
    /// pruning, never fatal.
    #[error("dangling reference: {0}")]
    Structural(String),

    /// A property value outside its allowed domain. The prior value is
    /// retained.
    #[error("invalid value for '{key}': {reason}")]
    Validation { key: String, reason: String },

    /// A record referencing an unresolvable id during import. The record is
    /// skipped and import continues.
    #[error("cannot decode record {record}: {reason}")]
    Decode { record: String, reason: String },

    /// A mutation was attempted from outside the single mutation path, e.g.
    /// while a history replay is in progress. The caller must re-route
    /// through the deferred effect queue.
    #[error("mutation outside the editor mutation path")]
    ConcurrencyGuard,

    /// A named project document does not exist in the backing store.
    #[error("project not found: {0}")]
    NotFound(String),

    /// Backend project store failure, reported as-is and not retried.
    #[error("project store: {0}")]
    Store(String),
}

/// Result type for scene graph operations.
pub type SceneResult<T> = Result<T, SceneError>;

impl SceneError {
    /// Shorthand for a validation failure on a named property key.
    pub fn validation(key: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
