//! # Validation Module
//!
//! Input validation for the storefront ledger.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Chat front-end                                                │
//! │  └── Button-driven input, mostly well-formed                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: shopfront-db operations                                       │
//! │  └── THIS MODULE: ranges and limits, checked before any write           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (stock >= 0), CHECK (quantity >= 1)                          │
//! │  ├── UNIQUE (products.name), UNIQUE (orders.order_number)               │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopfront_core::validation::{validate_product_name, validate_quantity};
//!
//! assert!(validate_product_name("Green tea").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY, MAX_PRICE, MAX_PRODUCT_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PRODUCT_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  User taps "+1"                                                         │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(1) ← THIS FUNCTION                                   │
/// │       │                                                                 │
/// │       ├── qty < 1?   → INVALID_ARGUMENT                                 │
/// │       ├── qty > 999? → INVALID_ARGUMENT                                 │
/// │       │                                                                 │
/// │       └── OK → stock check, then upsert the cart line                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    validate_range("quantity", qty, 1, MAX_ITEM_QUANTITY)
}

/// Validates a unit price. Zero is allowed, anything above `MAX_PRICE` is not.
pub fn validate_price(price: i64) -> ValidationResult<()> {
    validate_range("price", price, 0, MAX_PRICE)
}

/// Validates an absolute stock level.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    validate_range("stock", stock, 0, i64::MAX)
}

/// Validates a discount percentage.
///
/// ## Example
/// ```rust
/// use shopfront_core::validation::validate_percent;
///
/// assert!(validate_percent(0).is_ok());
/// assert!(validate_percent(100).is_ok());
/// assert!(validate_percent(101).is_err());
/// ```
pub fn validate_percent(percent: i64) -> ValidationResult<()> {
    validate_range("discount_percent", percent, 0, 100)
}

fn validate_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more distinct product fits in a cart.
///
/// ## Rules
/// - A cart holds at most MAX_CART_LINES (100) distinct products
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::LimitReached {
            field: "cart".to_string(),
            max: MAX_CART_LINES,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Green tea 100g").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(200)).is_ok());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert_eq!(
            validate_quantity(1000),
            Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: 999,
                value: 1000,
            })
        );
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(1099).is_ok());
        assert!(validate_price(-100).is_err());
        assert!(validate_price(MAX_PRICE).is_ok());
        assert!(validate_price(MAX_PRICE + 1).is_err());
        assert!(validate_price(i64::MAX / 2).is_err());

        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
    }

    #[test]
    fn test_validate_percent() {
        assert!(validate_percent(0).is_ok());
        assert!(validate_percent(50).is_ok());
        assert!(validate_percent(100).is_ok());
        assert!(validate_percent(-5).is_err());
        assert!(validate_percent(101).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_LINES - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_LINES).is_err());
    }
}
