//! Order validation and pricing.
//!
//! Clients name products and quantities only. Names, images and unit prices
//! are read from the catalog when the order is placed, and the totals below
//! are computed from those catalog prices.

use std::collections::HashSet;

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{validate_money, MAX_PRICE};
use crate::CoreError;

/// Upper bound on the quantity of a single order line.
pub const MAX_LINE_AMOUNT: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Failed,
    Paid,
    Delivered,
    Canceled,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Failed => "failed",
            OrderStatus::Paid => "paid",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "failed" => Ok(OrderStatus::Failed),
            "paid" => Ok(OrderStatus::Paid),
            "delivered" => Ok(OrderStatus::Delivered),
            "canceled" => Ok(OrderStatus::Canceled),
            other => Err(CoreError::InvalidOrderStatus(other.to_string())),
        }
    }
}

/// One cart line as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderItemDraft {
    pub product: i64,
    pub amount: i64,
}

/// A checkout request as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderDraft {
    pub items: Vec<OrderItemDraft>,
    pub tax: Decimal,
    pub shipping_fee: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: i64,
    pub amount: i32,
}

/// A validated checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub lines: Vec<OrderLine>,
    pub tax: Decimal,
    pub shipping_fee: Decimal,
}

impl OrderDraft {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidField`] for an empty cart, a quantity
    /// outside `1..=MAX_LINE_AMOUNT`, a product listed twice, or a negative
    /// or oversized tax or shipping fee.
    pub fn validate(self) -> Result<OrderRequest, CoreError> {
        if self.items.is_empty() {
            return Err(CoreError::InvalidField {
                field: "items",
                reason: "must contain at least one product".to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(self.items.len());
        let mut lines = Vec::with_capacity(self.items.len());
        for item in self.items {
            if !seen.insert(item.product) {
                return Err(CoreError::InvalidField {
                    field: "items",
                    reason: format!("lists product {} more than once", item.product),
                });
            }
            let amount = i32::try_from(item.amount)
                .ok()
                .filter(|a| (1..=MAX_LINE_AMOUNT).contains(&i64::from(*a)))
                .ok_or_else(|| CoreError::InvalidField {
                    field: "amount",
                    reason: format!("must be 1-{MAX_LINE_AMOUNT}, got {}", item.amount),
                })?;
            lines.push(OrderLine {
                product_id: item.product,
                amount,
            });
        }

        Ok(OrderRequest {
            lines,
            tax: validate_money("tax", self.tax)?,
            shipping_fee: validate_money("shipping_fee", self.shipping_fee)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub total: Decimal,
}

/// Sum `price * amount` over `lines`, then add tax and shipping.
///
/// # Errors
///
/// Returns [`CoreError::InvalidField`] on `total` when the result does not
/// fit a `NUMERIC(12,2)` column.
pub fn order_totals<I>(lines: I, tax: Decimal, shipping_fee: Decimal) -> Result<OrderTotals, CoreError>
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let too_large = || CoreError::InvalidField {
        field: "total",
        reason: format!("must be at most {MAX_PRICE}"),
    };

    let subtotal = lines.into_iter().try_fold(Decimal::ZERO, |acc, (price, amount)| {
        price
            .checked_mul(Decimal::from(amount))
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(too_large)
    })?;
    let total = subtotal
        .checked_add(tax)
        .and_then(|t| t.checked_add(shipping_fee))
        .ok_or_else(too_large)?;

    if total > MAX_PRICE {
        return Err(too_large());
    }
    Ok(OrderTotals { subtotal, total })
}

/// Stand-in for a payment provider's client secret.
#[must_use]
pub fn generate_client_secret() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("pi_secret_{hex}")
}
