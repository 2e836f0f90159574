//! Sync error taxonomy.
//!
//! Three categories: configuration errors (setup mistakes, surfaced
//! immediately and never retried), object/accessor errors (wrapped with the
//! type and field involved, never swallowed), and identity errors (fatal for
//! the enclosing object's merge; the surrounding transactional batch must be
//! treated as failed). Nothing is retried inside the core; retry policy
//! belongs to the execution layer.

use thiserror::Error;

use stagesync_object::{Guid, ObjectError, TypeKey};

/// Errors that can occur during synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Setup mistake: unresolvable sync-request configuration, filter or
    /// boundary referencing an unknown type/field, mismatched merge inputs.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is misconfigured.
        message: String,
    },

    /// Object framework failure (registry lookup, accessor invocation).
    #[error("object error: {0}")]
    Object(#[from] ObjectError),

    /// Durable-identity violation: a guid that cannot be located where one
    /// is required, or duplicate logical keys under the fail policy.
    #[error("identity error for {type_key} [{guid}]: {message}")]
    Identity {
        /// Type of the offending object.
        type_key: TypeKey,
        /// Guid involved.
        guid: Guid,
        /// What went wrong.
        message: String,
    },

    /// Lookup against an environment found nothing.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of thing looked up.
        entity: String,
        /// Identifier used.
        id: String,
    },

    /// A transactional batch failed as a whole; no entry was applied.
    #[error("batch '{batch}' failed: {message}")]
    Batch {
        /// Batch name.
        batch: String,
        /// First failure inside the batch.
        message: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Details.
        message: String,
    },
}

impl SyncError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an identity error.
    pub fn identity(type_key: TypeKey, guid: Guid, message: impl Into<String>) -> Self {
        Self::Identity {
            type_key,
            guid,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a batch failure error.
    pub fn batch(batch: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Batch {
            batch: batch.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error indicates a setup mistake.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration { .. } => true,
            Self::Object(inner) => inner.is_configuration(),
            _ => false,
        }
    }

    /// Check if this error is an identity violation.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity { .. })
    }

    /// Check if this error is retryable. The core retries nothing; any
    /// retry policy belongs to the execution layer driving batch replay.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
