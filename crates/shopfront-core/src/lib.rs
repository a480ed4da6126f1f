//! # shopfront-core: Pure Domain Logic for the Storefront Ledger
//!
//! This crate holds everything about the storefront that can be decided
//! without touching storage: the record types, money arithmetic, discount
//! pricing, input validation and the error taxonomy the front-end renders.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Shopfront Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Chat front-end (external collaborator)             │   │
//! │  │   catalogue ──► cart +/- ──► checkout ──► admin confirms paid   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed calls / typed errors             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shopfront-db (storage + checkout)               │   │
//! │  │   StockLedger  CartStore  BonusLedger  Orders  Checkout         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ shopfront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│   │   │
//! │  │   │  Product  │  │   Money   │  │   Quote   │  │   rules   │   │   │
//! │  │   │   Order   │  │ percent   │  │ snapshots │  │   checks  │   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records (Product, CartLine, Bonus, Order, OrderLine)
//! - [`money`] - Integer money with floor-rounded percentage discounts
//! - [`pricing`] - Order totals and line snapshots
//! - [`validation`] - Range checks for quantities, prices and percentages
//! - [`error`] - Domain errors and front-end error codes
//!
//! ## Example Usage
//!
//! ```rust
//! use shopfront_core::money::Money;
//! use shopfront_core::types::DiscountPercent;
//!
//! let total = Money::new(300);
//! let discount = DiscountPercent::new(10).unwrap();
//!
//! // final = total - floor(total * pct / 100)
//! assert_eq!(total.apply_discount(discount).amount(), 270);
//! ```

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ErrorCode, ValidationError};
pub use money::Money;
pub use pricing::{PricedLine, Quote};
pub use types::*;

/// Opaque user key handed over by the front-end.
pub type UserId = i64;

/// Product primary key.
pub type ProductId = i64;

/// Maximum quantity of a single product in one cart.
///
/// Guards against a mistyped `1000` instead of `10` reaching the ledger.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of distinct products in one cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum unit price a product may carry.
///
/// `MAX_PRICE × MAX_ITEM_QUANTITY × MAX_CART_LINES` stays well inside `i64`.
pub const MAX_PRICE: i64 = 1_000_000_000_000;

/// Maximum length of a product name, in characters.
pub const MAX_PRODUCT_NAME_LEN: usize = 200;

/// Default bound on order-number minting attempts before giving up.
pub const DEFAULT_ORDER_NUMBER_ATTEMPTS: u32 = 100;

/// Default percentage for the one-time welcome bonus.
pub const DEFAULT_WELCOME_BONUS_PERCENT: i64 = 10;
