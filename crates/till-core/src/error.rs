//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Lifecycle and settlement failures              │
//! │  │   ├── InvalidState      wrong lifecycle state (closed drawer, ...)  │
//! │  │   ├── NoDigitalChange   overpaid with no cash to give change from   │
//! │  │   └── Underpayment      tendered total short of amount due          │
//! │  └── ValidationError  - Malformed or out-of-range input                │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Register errors (in app)                                              │
//! │  └── ApiError         - What front ends see (serialized)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is raised before any state is mutated: operations validate
//! first and commit second.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Operation attempted in the wrong lifecycle state.
    ///
    /// ## When This Occurs
    /// - Registering a transaction while the drawer is closed
    /// - Opening a drawer that is already open
    /// - Transferring a table into an occupied table
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Overpayment present but no cash tender to return it from.
    ///
    /// ## User Workflow
    /// ```text
    /// Total due: 120.00
    /// Tendered:  CREDIT 130.00
    ///      │
    ///      ▼
    /// NoDigitalChange { surplus: 10.00, cash_tendered: 0.00 }
    ///      │
    ///      ▼
    /// UI: "Change can only be given from cash"
    /// ```
    #[error("Surplus of {surplus} cannot be returned as change (cash tendered: {cash_tendered})")]
    NoDigitalChange { surplus: Money, cash_tendered: Money },

    /// Tendered total is short of the amount due.
    #[error("Tendered {tendered} is short of {due} due (missing {shortfall})")]
    Underpayment {
        due: Money,
        tendered: Money,
        shortfall: Money,
    },

    /// Table configuration or session not found.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Cart line index out of range.
    #[error("Cart line {index} not found (cart has {len} lines)")]
    LineNotFound { index: usize, len: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidState error.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        CoreError::InvalidState(reason.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., phone number with too few digits).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two tables with the same number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Input is well-formed but violates a business rule.
    #[error("{0}")]
    Rule(String),
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates a Rule error.
    pub fn rule(message: impl Into<String>) -> Self {
        ValidationError::Rule(message.into())
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
