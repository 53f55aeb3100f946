//! # Validation Module
//!
//! Input validation utilities for Till POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end                                                    │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Register commands / core operations                          │
//! │  └── THIS MODULE: business rule validation, before any mutation        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE constraints                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{normalize_customer_key, validate_responsible};
//!
//! assert_eq!(validate_responsible("  Ana ").unwrap(), "Ana");
//! assert_eq!(normalize_customer_key("(11) 98765-4321").unwrap(), "11987654321");
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT, MAX_CART_ITEMS, MAX_EXTRAS_PER_LINE, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates the operator responsible for a drawer or movement.
///
/// ## Rules
/// - Must not be blank
/// - At most 100 characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_responsible(name: &str) -> ValidationResult<String> {
    required_trimmed("responsible", name, 100)
}

/// Validates a table display label ("3", "Terrace 2", ...).
///
/// ## Returns
/// The trimmed label.
pub fn validate_table_number(number: &str) -> ValidationResult<String> {
    required_trimmed("table number", number, 20)
}

/// Validates a table identifier.
pub fn validate_table_id(id: &str) -> ValidationResult<String> {
    required_trimmed("table id", id, 64)
}

/// Validates a cart line product name.
pub fn validate_item_name(name: &str) -> ValidationResult<String> {
    required_trimmed("item name", name, 200)
}

/// Normalises a phone-number-like customer key to its digits.
///
/// ## Rules
/// - Punctuation and spaces are dropped
/// - 8 to 15 digits must remain (E.164 upper bound)
///
/// ## Example
/// ```rust
/// use till_core::validation::normalize_customer_key;
///
/// assert_eq!(normalize_customer_key("+55 11 98765-4321").unwrap(), "5511987654321");
/// assert!(normalize_customer_key("123").is_err());
/// ```
pub fn normalize_customer_key(phone: &str) -> ValidationResult<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(ValidationError::required("customer phone"));
    }

    if !(8..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "customer phone".to_string(),
            reason: "must contain between 8 and 15 digits".to_string(),
        });
    }

    Ok(digits)
}

fn required_trimmed(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a tender or movement amount.
///
/// ## Rules
/// - Must be strictly positive; the ledger never records zero or negative
///   method amounts
/// - Must not exceed MAX_AMOUNT
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    check_upper_bound(field, amount)
}

/// Validates an amount that may be zero (prices, discounts, counted cash).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_AMOUNT
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    check_upper_bound(field, amount)
}

fn check_upper_bound(field: &str, amount: Money) -> ValidationResult<()> {
    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT.cents(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size (number of lines) before adding another line.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    validate_line_count(current_items + 1)
}

/// Validates the number of lines of a whole cart or table session.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates the number of extras chosen for one line.
pub fn validate_extras_count(extras: usize) -> ValidationResult<()> {
    if extras > MAX_EXTRAS_PER_LINE {
        return Err(ValidationError::OutOfRange {
            field: "extras".to_string(),
            min: 0,
            max: MAX_EXTRAS_PER_LINE as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
