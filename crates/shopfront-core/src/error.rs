//! # Error Types
//!
//! Domain-specific error types for shopfront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopfront-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                        │
//! │  ├── ValidationError  - Out-of-range input (InvalidArgument)            │
//! │  └── ErrorCode        - What the front-end switches on                  │
//! │                                                                         │
//! │  shopfront-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, wraps CoreError               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ErrorCode → Front-end    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::OrderStatus;
use crate::{ProductId, UserId};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A stock decrement (or a cart request) exceeds what is available.
    ///
    /// ## When This Occurs
    /// - `StockLedger::adjust` with a delta that would drive stock below zero
    /// - Adding to a cart beyond the product's current stock
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// Checkout was attempted with nothing in the cart.
    #[error("Cart of user {user_id} is empty")]
    EmptyCart { user_id: UserId },

    /// Checkout-time re-validation found a line the shelf can no longer cover.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: 3 × product 7 (added when stock was 5)
    ///      │
    ///      ▼
    /// Another user checks out 4 × product 7  → stock 1
    ///      │
    ///      ▼
    /// Checkout re-reads stock: 1 < 3
    ///      │
    ///      ▼
    /// OutOfStock { product_id: 7, available: 1, requested: 3 }
    /// ```
    #[error("Product {product_id} is out of stock: available {available}, requested {requested}")]
    OutOfStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// Requested order status change is not an edge of the state machine.
    #[error("Order {order_number} is {from}, cannot move to {to}")]
    InvalidStatusTransition {
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Input validation failed.
    #[error("Invalid argument: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the front-end error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::EmptyCart { .. } => ErrorCode::EmptyCart,
            CoreError::OutOfStock { .. } => ErrorCode::OutOfStock,
            CoreError::InvalidStatusTransition { .. } => ErrorCode::InvalidStatusTransition,
            CoreError::Validation(_) => ErrorCode::InvalidArgument,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant surfaces to the front-end as `INVALID_ARGUMENT`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        value: i64,
    },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Computed amount does not fit in a 64-bit integer.
    #[error("{field} is too large")]
    Overflow { field: String },

    /// Collection limit reached.
    #[error("{field} cannot hold more than {max} entries")]
    LimitReached { field: String, max: usize },
}

// =============================================================================
// Error Code
// =============================================================================

/// Machine-readable error codes for the front-end.
///
/// ## Usage in the front-end
/// ```text
/// match code {
///     OUT_OF_STOCK  => "Sorry, only N left"
///     EMPTY_CART    => "Your cart is empty"
///     UNAVAILABLE   => "Try again in a moment"
///     ...
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, order or bonus missing.
    NotFound,
    /// Out-of-range quantity, price or percentage.
    InvalidArgument,
    /// A decrement would go negative.
    InsufficientStock,
    /// Checkout with no cart lines.
    EmptyCart,
    /// Checkout-time re-validation failure.
    OutOfStock,
    /// Order-number minting exceeded its retry bound.
    GenerationExhausted,
    /// Duplicate product name or raced duplicate order number.
    ConstraintViolation,
    /// Checkout transaction aborted and rolled back.
    OrderCreationFailed,
    /// Order status change not allowed.
    InvalidStatusTransition,
    /// Storage temporarily unavailable; the caller may retry.
    Unavailable,
    /// Anything else.
    Internal,
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::OutOfStock {
            product_id: 7,
            available: 1,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Product 7 is out of stock: available 1, requested 3"
        );

        let err = CoreError::InvalidStatusTransition {
            order_number: "ORD-1".to_string(),
            from: OrderStatus::Paid,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Order ORD-1 is paid, cannot move to cancelled");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::OutOfStock).unwrap();
        assert_eq!(json, "\"OUT_OF_STOCK\"");

        let json = serde_json::to_string(&ErrorCode::GenerationExhausted).unwrap();
        assert_eq!(json, "\"GENERATION_EXHAUSTED\"");
    }
}
