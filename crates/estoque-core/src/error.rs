//! # Error Types
//!
//! Domain-specific error types for estoque-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  estoque-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  estoque-client errors (separate crate)                                │
//! │  ├── ClientError        - HTTP / cache / storage failures              │
//! │  ├── PostalLookupError  - CEP lookup outcomes                          │
//! │  └── ExportError        - Document generation failures                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → UI presentation     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, field, code)
//! 3. Errors are enum variants, never String
//! 4. Errors are `Clone`: the query cache keeps the last one next to stale data

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Selling more units than the product has in stock.
    ///
    /// ## User Workflow
    /// ```text
    /// New sale: 5 × "Café 500g"
    ///      │
    ///      ▼
    /// Check stock: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "CAF-500", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Form shows: "Estoque insuficiente"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A sale must contain at least one item.
    #[error("Sale has no items")]
    EmptySale,

    /// An export needs at least one column.
    #[error("Export '{title}' has no columns")]
    NoColumns { title: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any network call happens, shown inline next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (postal code with the wrong digit count, bad e-mail).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "CAF-500".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for CAF-500: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::InvalidFormat {
            field: "cep".to_string(),
            reason: "must contain exactly 8 digits".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cep has invalid format: must contain exactly 8 digits"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
