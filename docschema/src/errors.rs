use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Whether an [`SchemaError::InvalidField`] reports fields that are missing a value or fields the
/// schema does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIssue {
    /// Required fields were left empty.
    Missing,
    /// Keys were supplied that the (strict) schema does not declare.
    Extra,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing => write!(f, "missing required field(s)"),
            FieldIssue::Extra => write!(f, "field(s) not declared in schema"),
        }
    }
}

/// Top-level error type returned by schema declaration, validation and document operations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema itself is malformed. Raised while a document type is being declared.
    #[error("{field}: invalid field definition: {message}")]
    InvalidDefinition { field: String, message: String },

    /// A supplied or defaulted value failed coercion, range, required-ness or choice checks.
    #[error("{field}: {message} (got {value})")]
    InvalidValue {
        field: String,
        value: Box<Value>,
        message: String,
    },

    /// Unschematized keys on a strict document, or required fields left empty.
    #[error("{document}: {issue}: {}", fields.join(", "))]
    InvalidField {
        document: String,
        fields: Vec<String>,
        issue: FieldIssue,
    },

    /// Attribute lookup miss on a document.
    #[error("{name}: attribute not found")]
    NotFound { name: String },
}

impl SchemaError {
    pub fn definition(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, value: Value, message: impl Into<String>) -> Self {
        let error = Self::InvalidValue {
            field: field.into(),
            value: Box::new(value),
            message: message.into(),
        };
        log::trace!("validation failed: {error}");
        error
    }

    /// Convenience helper for schema-validate hooks that found required fields still empty.
    pub fn missing_fields<I, S>(document: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::InvalidField {
            document: document.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            issue: FieldIssue::Missing,
        }
    }

    pub fn extra_fields<I, S>(document: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::InvalidField {
            document: document.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            issue: FieldIssue::Extra,
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Name of the offending field, when the error is about a single field.
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaError::InvalidDefinition { field, .. } | SchemaError::InvalidValue { field, .. } => Some(field),
            SchemaError::NotFound { name } => Some(name),
            SchemaError::InvalidField { .. } => None,
        }
    }

    /// Offending field names of an [`SchemaError::InvalidField`]; empty for other variants.
    pub fn fields(&self) -> &[String] {
        match self {
            SchemaError::InvalidField { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn is_invalid_value(&self) -> bool {
        matches!(self, SchemaError::InvalidValue { .. })
    }

    pub fn is_invalid_definition(&self) -> bool {
        matches!(self, SchemaError::InvalidDefinition { .. })
    }

    pub fn is_invalid_field(&self) -> bool {
        matches!(self, SchemaError::InvalidField { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaError::NotFound { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type SchemaResult<T> = Result<T, SchemaError>;
