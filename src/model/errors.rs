//! Model error types
//!
//! Validation errors (raised by `instantiate`):
//! - FM_MISSING_REQUIRED_FIELD
//! - FM_TYPE_MISMATCH
//! - FM_EXTRA_FIELD
//! - FM_MULTIPLE_ERRORS
//!
//! Definition errors (raised while building or registering a model):
//! - FM_DUPLICATE_FIELD, FM_CONFLICTING_DEFAULTS, FM_UNKNOWN_FACTORY,
//!   FM_INVALID_TYPE, FM_MALFORMED_DEFINITION, FM_UNKNOWN_MODEL,
//!   FM_MODEL_IMMUTABLE, FM_UNKNOWN_FIELD
//!
//! Errors from a definition file are wrapped in `DefinitionFile`, which names
//! the file and keeps the inner error's code.

use serde_json::Value;
use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while defining models and resolving instances
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    // ==================
    // Validation Errors
    // ==================

    /// A required field was absent from the input
    #[error("field '{field}' is required but was not supplied")]
    MissingRequiredField { field: String },

    /// A supplied value does not satisfy the declared type and no coercion applies
    #[error("field '{field}': expected {expected}, got {received}")]
    TypeMismatch {
        field: String,
        expected: String,
        received: Value,
    },

    /// Input key not claimed by any field while extra keys are forbidden
    #[error("key '{key}' is not declared on model '{model}'")]
    ExtraField { model: String, key: String },

    /// Every error found in collect-all mode, in declaration order
    #[error("{} validation errors: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<ModelError>),

    // ==================
    // Definition Errors
    // ==================

    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error("field '{0}' declares both a default and a default factory")]
    ConflictingDefaults(String),

    #[error("field '{field}' references unknown default factory '{factory}'")]
    UnknownFactory { field: String, factory: String },

    #[error("invalid type expression '{expr}': {reason}")]
    InvalidType { expr: String, reason: String },

    #[error("malformed model definition '{origin}': {reason}")]
    MalformedDefinition { origin: String, reason: String },

    /// A definition error raised while loading a file; reports the inner code
    #[error("in '{origin}': {source}")]
    DefinitionFile {
        origin: String,
        source: Box<ModelError>,
    },

    // ==================
    // Registry / Access Errors
    // ==================

    #[error("model '{0}' not found")]
    UnknownModel(String),

    #[error("model '{0}' is already registered and cannot be replaced")]
    ModelImmutable(String),

    #[error("model '{model}' has no field '{field}'")]
    UnknownField { model: String, field: String },
}

impl ModelError {
    /// Creates a missing required field error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
        }
    }

    /// Creates a type mismatch error
    pub fn mismatch(field: impl Into<String>, expected: impl Into<String>, received: &Value) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            received: received.clone(),
        }
    }

    pub fn invalid_type(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidType {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDefinition {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequiredField { .. } => "FM_MISSING_REQUIRED_FIELD",
            Self::TypeMismatch { .. } => "FM_TYPE_MISMATCH",
            Self::ExtraField { .. } => "FM_EXTRA_FIELD",
            Self::Multiple(_) => "FM_MULTIPLE_ERRORS",
            Self::DuplicateField(_) => "FM_DUPLICATE_FIELD",
            Self::ConflictingDefaults(_) => "FM_CONFLICTING_DEFAULTS",
            Self::UnknownFactory { .. } => "FM_UNKNOWN_FACTORY",
            Self::InvalidType { .. } => "FM_INVALID_TYPE",
            Self::MalformedDefinition { .. } => "FM_MALFORMED_DEFINITION",
            Self::DefinitionFile { source, .. } => source.code(),
            Self::UnknownModel(_) => "FM_UNKNOWN_MODEL",
            Self::ModelImmutable(_) => "FM_MODEL_IMMUTABLE",
            Self::UnknownField { .. } => "FM_UNKNOWN_FIELD",
        }
    }

    /// Returns true for errors caused by instance input rather than by the model definition
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredField { .. }
                | Self::TypeMismatch { .. }
                | Self::ExtraField { .. }
                | Self::Multiple(_)
        )
    }

    /// Returns the field (or input key) this error is about, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field } | Self::TypeMismatch { field, .. } => {
                Some(field.as_str())
            }
            Self::ExtraField { key, .. } => Some(key.as_str()),
            Self::DuplicateField(field) | Self::ConflictingDefaults(field) => Some(field.as_str()),
            Self::UnknownFactory { field, .. } | Self::UnknownField { field, .. } => {
                Some(field.as_str())
            }
            Self::DefinitionFile { source, .. } => source.field(),
            _ => None,
        }
    }
}

fn join_messages(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
