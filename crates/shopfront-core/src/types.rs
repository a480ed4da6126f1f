//! # Domain Types
//!
//! Records persisted by the storefront ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    CartLine     │   │     Bonus       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  product_id     │   │  user_id        │       │
//! │  │  name (unique)  │   │  user_id        │   │  discount_pct   │       │
//! │  │  price, stock   │   │  quantity ≥ 1   │   │  is_active      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderLine     │   │  OrderStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  order_number   │◄──│  order_id       │   │  Pending        │       │
//! │  │  total / final  │   │  name snapshot  │   │  Paid      (T)  │       │
//! │  │  status         │   │  price snapshot │   │  Cancelled (T)  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! An `OrderLine` copies the product's name and unit price at commit time.
//! Later price edits or product deletion never reach it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{ProductId, UserId};

// =============================================================================
// Discount Percent
// =============================================================================

/// A discount percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(try_from = "i64", into = "i64")]
pub struct DiscountPercent(i64);

impl DiscountPercent {
    /// No discount.
    pub const ZERO: DiscountPercent = DiscountPercent(0);

    /// Creates a percentage, rejecting values outside `[0, 100]`.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if !(0..=100).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: "discount_percent".to_string(),
                min: 0,
                max: 100,
                value,
            });
        }
        Ok(DiscountPercent(value))
    }

    /// Returns the raw percentage.
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for DiscountPercent {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        DiscountPercent::new(value)
    }
}

impl From<DiscountPercent> for i64 {
    fn from(pct: DiscountPercent) -> Self {
        pct.0
    }
}

impl fmt::Display for DiscountPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product on the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,

    /// Display name; unique across the catalogue.
    pub name: String,

    pub description: Option<String>,

    /// Unit price.
    pub price: Money,

    /// Units not yet committed to any order. Never negative.
    pub stock: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks if `quantity` units could be taken from the shelf right now.
    pub fn can_supply(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: i64, stock: i64) -> Self {
        NewProduct {
            name: name.into(),
            description: None,
            price: Money::new(price),
            stock,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A user's uncommitted desired quantity of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

/// A cart line joined with the product's current attributes.
///
/// Price and stock here are live values, not snapshots: the cart is
/// re-priced every time it is read, and at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub stock: i64,
    pub quantity: i64,
}

impl CartItem {
    /// Unit price × quantity, `None` if it overflows.
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }

    /// Whether the shelf still covers this line.
    pub fn in_stock(&self) -> bool {
        self.quantity <= self.stock
    }
}

// =============================================================================
// Bonus
// =============================================================================

/// A percentage discount grant for one future order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bonus {
    pub id: i64,
    pub user_id: UserId,
    pub discount_percent: DiscountPercent,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of a committed order.
///
/// ```text
///            ┌──────► Paid       (terminal)
///  Pending ──┤
///            └──────► Cancelled  (terminal)
/// ```
///
/// Payment is verified out of band; an authorized actor moves the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created by checkout, awaiting payment confirmation.
    #[default]
    Pending,
    /// Payment confirmed.
    Paid,
    /// Cancelled by an admin.
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// `Paid` and `Cancelled` accept no further transitions.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Checks whether `self → next` is an edge of the state machine.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid) | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["pending".into(), "paid".into(), "cancelled".into()],
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A committed order.
///
/// Invariant: `final_price = total_price − floor(total_price × discount_percent / 100)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Externally visible, globally unique identifier.
    pub order_number: String,
    pub user_id: UserId,
    pub total_price: Money,
    pub discount_percent: DiscountPercent,
    pub final_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable line-item snapshot of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    /// Source product, cleared if the product is later deleted.
    pub product_id: Option<ProductId>,
    /// Product name at time of checkout (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price at time of checkout (frozen).
    pub price_per_item: Money,
    pub subtotal: Money,
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl OrderDetails {
    /// Sum of line subtotals; equals `order.total_price` for every committed order.
    pub fn lines_total(&self) -> Money {
        self.lines.iter().map(|l| l.subtotal).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
