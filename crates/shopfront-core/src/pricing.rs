//! # Pricing
//!
//! Turns live cart items into an order quote: per-line subtotals, the total,
//! the applied discount and the final price.
//!
//! ## Checkout Pricing Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart items (live price + live stock)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  check_availability()  ── first line with qty > stock ──► OutOfStock    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Quote::compute(items, discount)                                        │
//! │       total_price    = Σ unit_price × quantity                          │
//! │       final_price    = total − floor(total × pct / 100)                 │
//! │       lines          = snapshots written as order lines                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartItem, DiscountPercent};
use crate::ProductId;

/// One priced line, ready to be frozen into an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl TryFrom<&CartItem> for PricedLine {
    type Error = CoreError;

    fn try_from(item: &CartItem) -> CoreResult<Self> {
        let subtotal = item.subtotal().ok_or_else(|| overflow("subtotal"))?;

        Ok(PricedLine {
            product_id: item.product_id,
            product_name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal,
        })
    }
}

fn overflow(field: &str) -> CoreError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
    .into()
}

/// Priced cart: what an order would be committed with right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub total_price: Money,
    pub discount_percent: DiscountPercent,
    pub final_price: Money,
}

impl Quote {
    /// Prices `items` and applies `discount`.
    ///
    /// ## Invariants
    /// - `Σ lines.subtotal == total_price`
    /// - `final_price == total_price − floor(total_price × discount / 100)`
    /// - `0 ≤ final_price ≤ total_price`
    ///
    /// Fails with `Validation(Overflow)` if a subtotal or the total does not
    /// fit in an `i64`.
    pub fn compute(items: &[CartItem], discount: DiscountPercent) -> CoreResult<Quote> {
        let lines = items
            .iter()
            .map(PricedLine::try_from)
            .collect::<CoreResult<Vec<_>>>()?;

        let total_price = lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.subtotal))
            .ok_or_else(|| overflow("total_price"))?;

        Ok(Quote {
            final_price: total_price.apply_discount(discount),
            total_price,
            discount_percent: discount,
            lines,
        })
    }

    /// Amount taken off by the discount.
    pub fn discount_amount(&self) -> Money {
        self.total_price - self.final_price
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Fails with `OutOfStock` naming the first line the shelf cannot cover.
pub fn check_availability(items: &[CartItem]) -> CoreResult<()> {
    match items.iter().find(|item| !item.in_stock()) {
        Some(item) => Err(CoreError::OutOfStock {
            product_id: item.product_id,
            available: item.stock,
            requested: item.quantity,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: ProductId, price: i64, stock: i64, quantity: i64) -> CartItem {
        CartItem {
            product_id,
            name: format!("Product {}", product_id),
            unit_price: Money::new(price),
            stock,
            quantity,
        }
    }

    #[test]
    fn test_quote_without_discount() {
        let quote = Quote::compute(&[item(1, 100, 5, 3)], DiscountPercent::ZERO).unwrap();

        assert_eq!(quote.total_price.amount(), 300);
        assert_eq!(quote.final_price.amount(), 300);
        assert!(quote.discount_amount().is_zero());
    }

    #[test]
    fn test_quote_with_discount() {
        let items = [item(1, 100, 5, 3), item(2, 45, 10, 1)];
        let quote = Quote::compute(&items, DiscountPercent::new(10).unwrap()).unwrap();

        // 300 + 45 = 345, floor(34.5) = 34 off
        assert_eq!(quote.total_price.amount(), 345);
        assert_eq!(quote.final_price.amount(), 311);
        assert_eq!(quote.line_count(), 2);
        assert_eq!(quote.total_quantity(), 4);

        let lines_total: Money = quote.lines.iter().map(|l| l.subtotal).sum();
        assert_eq!(lines_total, quote.total_price);
    }

    #[test]
    fn test_empty_quote() {
        let quote = Quote::compute(&[], DiscountPercent::new(50).unwrap()).unwrap();
        assert!(quote.is_empty());
        assert!(quote.total_price.is_zero());
        assert!(quote.final_price.is_zero());
    }

    #[test]
    fn test_quote_overflow_is_an_error() {
        let err = Quote::compute(&[item(1, i64::MAX / 2, 5, 3)], DiscountPercent::ZERO).unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation(ValidationError::Overflow {
                field: "subtotal".to_string(),
            })
        );

        let items = [item(1, i64::MAX / 2, 5, 1), item(2, i64::MAX / 2, 5, 1), item(3, 10, 5, 1)];
        let err = Quote::compute(&items, DiscountPercent::ZERO).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_check_availability_names_first_short_line() {
        let items = [item(1, 100, 5, 5), item(2, 10, 1, 2), item(3, 10, 0, 1)];

        let err = check_availability(&items).unwrap_err();
        assert_eq!(
            err,
            CoreError::OutOfStock {
                product_id: 2,
                available: 1,
                requested: 2,
            }
        );

        assert!(check_availability(&items[..1]).is_ok());
    }
}
