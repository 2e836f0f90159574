//! Object framework error types.

use thiserror::Error;

use crate::ids::{FieldId, TypeKey};

/// Errors raised by the object framework: registry lookups, descriptor
/// construction, and erased accessor invocation.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// No descriptor registered for the given type.
    #[error("unknown type: {type_key}")]
    UnknownType {
        /// Type that could not be resolved.
        type_key: TypeKey,
    },

    /// A descriptor for the type is already registered.
    #[error("type already registered: {type_key}")]
    DuplicateType {
        /// Type registered twice.
        type_key: TypeKey,
    },

    /// A filter or configuration referenced a field the type does not have.
    #[error("unknown field '{field}' on type {type_key}")]
    UnknownField {
        /// Owning type.
        type_key: TypeKey,
        /// Field that could not be resolved.
        field: FieldId,
    },

    /// A field was registered twice on the same descriptor level.
    #[error("duplicate field '{field}' on type {type_key}")]
    DuplicateField {
        /// Owning type.
        type_key: TypeKey,
        /// Field registered twice.
        field: FieldId,
    },

    /// A basic attribute has a getter but no conventional setter; such an
    /// attribute cannot be merged.
    #[error("accessor '{accessor}' on type {type_key} has no setter by naming convention")]
    MissingSetter {
        /// Owning type.
        type_key: TypeKey,
        /// Getter-style accessor name that yielded no setter.
        accessor: String,
    },

    /// The type has no guid accessor but one was required.
    #[error("type {type_key} cannot be qualified by guid")]
    MissingGuid {
        /// Type without a guid accessor.
        type_key: TypeKey,
    },

    /// An erased accessor invocation failed. Wraps downcast and value
    /// conversion failures with the type and field involved.
    #[error("accessor failure on {type_key}.{field}: {message}")]
    Accessor {
        /// Owning type.
        type_key: TypeKey,
        /// Field whose accessor failed.
        field: FieldId,
        /// Underlying failure.
        message: String,
    },
}

impl ObjectError {
    /// Create an unknown-type error.
    pub fn unknown_type(type_key: TypeKey) -> Self {
        Self::UnknownType { type_key }
    }

    /// Create an unknown-field error.
    pub fn unknown_field(type_key: TypeKey, field: FieldId) -> Self {
        Self::UnknownField { type_key, field }
    }

    /// Create an accessor-failure error.
    pub fn accessor(type_key: TypeKey, field: FieldId, message: impl Into<String>) -> Self {
        Self::Accessor {
            type_key,
            field,
            message: message.into(),
        }
    }

    /// Check whether this error indicates a setup mistake rather than a
    /// runtime accessor failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Accessor { .. })
    }
}

/// Result type for object framework operations.
pub type ObjectResult<T> = Result<T, ObjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_type_and_field() {
        let err = ObjectError::accessor(
            TypeKey::new("catalog.product"),
            FieldId::new("code"),
            "expected Product",
        );
        let text = err.to_string();
        assert!(text.contains("catalog.product"));
        assert!(text.contains("code"));
        assert!(text.contains("expected Product"));
    }

    #[test]
    fn test_is_configuration() {
        assert!(ObjectError::unknown_type(TypeKey::new("x")).is_configuration());
        assert!(ObjectError::MissingGuid {
            type_key: TypeKey::new("x")
        }
        .is_configuration());
        assert!(!ObjectError::accessor(TypeKey::new("x"), FieldId::new("y"), "boom").is_configuration());
    }
}
