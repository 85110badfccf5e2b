//! # Error Types
//!
//! Structured error types for takeoff_core. A single unit of work (one element
//! instance, one BOQ group) that fails produces one of these; the pipeline then
//! records it as a message and keeps going with the rest of the batch.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::errors::{CalcError, CalcResult};
//!
//! fn validate_thickness(thickness_m: f64) -> CalcResult<()> {
//!     if thickness_m <= 0.0 {
//!         return Err(CalcError::InvalidInput {
//!             field: "thickness".to_string(),
//!             value: thickness_m.to_string(),
//!             reason: "Thickness must be positive".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for takeoff_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for takeoff and BOQ operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (non-positive dimension, unknown bar size, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A grid label could not be resolved on the given axis
    #[error("Grid line '{label}' not found on axis {axis}")]
    GridLabelNotFound { axis: String, label: String },

    /// A level label could not be resolved
    #[error("Level '{label}' not found")]
    LevelNotFound { label: String },

    /// Geometry resolved but is unusable (zero span, inverted levels, ...)
    #[error("Invalid geometry for {subject}: {reason}")]
    InvalidGeometry { subject: String, reason: String },

    /// Element instance references a template that does not exist
    #[error("Template not found: {template_id}")]
    TemplateNotFound { template_id: String },

    /// A resolved pay item is absent from the catalog
    #[error("DPWH item '{item_number}' not found in catalog")]
    CatalogItemNotFound { item_number: String },

    /// Request payload has the wrong shape and was rejected before computing
    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// Calculation could not be completed
    #[error("Calculation failed: {calculation_type} - {reason}")]
    CalculationFailed {
        calculation_type: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create a GridLabelNotFound error
    pub fn grid_label_not_found(axis: impl Into<String>, label: impl Into<String>) -> Self {
        CalcError::GridLabelNotFound {
            axis: axis.into(),
            label: label.into(),
        }
    }

    /// Create a LevelNotFound error
    pub fn level_not_found(label: impl Into<String>) -> Self {
        CalcError::LevelNotFound {
            label: label.into(),
        }
    }

    /// Create an InvalidGeometry error
    pub fn invalid_geometry(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidGeometry {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Create a TemplateNotFound error
    pub fn template_not_found(template_id: impl Into<String>) -> Self {
        CalcError::TemplateNotFound {
            template_id: template_id.into(),
        }
    }

    /// Create a CatalogItemNotFound error
    pub fn catalog_item_not_found(item_number: impl Into<String>) -> Self {
        CalcError::CatalogItemNotFound {
            item_number: item_number.into(),
        }
    }

    /// Create a MalformedRequest error
    pub fn malformed_request(reason: impl Into<String>) -> Self {
        CalcError::MalformedRequest {
            reason: reason.into(),
        }
    }

    /// Create a CalculationFailed error
    pub fn calculation_failed(calculation_type: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::CalculationFailed {
            calculation_type: calculation_type.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Geometry failures are the ones a user fixes by editing grids or levels
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            CalcError::GridLabelNotFound { .. }
                | CalcError::LevelNotFound { .. }
                | CalcError::InvalidGeometry { .. }
        )
    }

    /// Errors that may clear on retry (another user holds the file)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::GridLabelNotFound { .. } => "GRID_LABEL_NOT_FOUND",
            CalcError::LevelNotFound { .. } => "LEVEL_NOT_FOUND",
            CalcError::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            CalcError::TemplateNotFound { .. } => "TEMPLATE_NOT_FOUND",
            CalcError::CatalogItemNotFound { .. } => "CATALOG_ITEM_NOT_FOUND",
            CalcError::MalformedRequest { .. } => "MALFORMED_REQUEST",
            CalcError::CalculationFailed { .. } => "CALCULATION_FAILED",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
