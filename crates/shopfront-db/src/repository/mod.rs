//! # Repository Module
//!
//! Database repositories for the storefront ledger.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Who Writes What                                  │
//! │                                                                         │
//! │  ProductRepository   products (name, price)                             │
//! │  StockLedger         products.stock (conditional deltas)                │
//! │  CartStore           cart_lines            (reads stock, never writes)  │
//! │  BonusLedger         bonuses, user_settings                             │
//! │  OrderRepository     orders.status, cancel/delete                       │
//! │  CheckoutCoordinator orders + order_lines + stock + bonuses + carts     │
//! │                      in ONE transaction                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository takes the pool. The `*_in` helpers take a
//! `&mut SqliteConnection` so that checkout and cancellation can run them on
//! their own open transaction.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalogue CRUD
//! - [`StockLedger`](stock::StockLedger) - Available quantities
//! - [`CartStore`](cart::CartStore) - Per-user carts
//! - [`BonusLedger`](bonus::BonusLedger) - Discount grants
//! - [`OrderRepository`](order::OrderRepository) - Orders and status changes
//! - [`OrderNumberGenerator`](order_number::OrderNumberGenerator) - Unique order numbers
//! - [`CheckoutCoordinator`](checkout::CheckoutCoordinator) - The atomic checkout

pub mod bonus;
pub mod cart;
pub mod checkout;
pub mod order;
pub mod order_number;
pub mod product;
pub mod stock;
