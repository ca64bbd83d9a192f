//! # Order Rules
//!
//! Totals, payments, manual status changes and deletion guard for orders.
//!
//! Every function that touches an amount returns all three figures together
//! so that `balance_due = total_amount - amount_paid` is recomputed, never
//! patched.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{NewOrderLine, Order, OrderStatus};
use crate::validation::validate_payment_amount;

/// The three amounts on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub total_amount: Money,
    pub amount_paid: Money,
    pub balance_due: Money,
}

impl OrderTotals {
    fn new(total_amount: Money, amount_paid: Money) -> Self {
        Self {
            total_amount,
            amount_paid,
            balance_due: total_amount - amount_paid,
        }
    }
}

/// Line total for one order line, floored at zero.
///
/// A `quantity × unitPriceCents` that does not fit in an `i64` is a
/// validation error on `unitPriceCents`.
pub fn line_total(line: &NewOrderLine) -> CoreResult<Money> {
    Money::from_cents(line.unit_price_cents)
        .checked_line_total(line.quantity, Money::from_cents(line.discount_cents))
        .ok_or_else(|| amount_too_large("unitPriceCents"))
}

fn amount_too_large(field: &str) -> CoreError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "amount is too large".to_string(),
    }
    .into()
}

/// Totals for a new order with an optional deposit.
///
/// ```rust
/// use clinic_core::order::compute_totals;
/// use clinic_core::types::NewOrderLine;
///
/// let lines = vec![NewOrderLine {
///     stock_item_id: "s".into(),
///     quantity: 2,
///     unit_price_cents: 4500,
///     discount_cents: 1000,
/// }];
/// let totals = compute_totals(&lines, 3000).unwrap();
/// assert_eq!(totals.balance_due.cents(), 5000);
/// ```
pub fn compute_totals(lines: &[NewOrderLine], deposit_cents: i64) -> CoreResult<OrderTotals> {
    let mut total = Money::zero();
    for line in lines {
        total = total
            .checked_add(line_total(line)?)
            .ok_or_else(|| amount_too_large("items"))?;
    }
    let paid = Money::from_cents(deposit_cents);

    if paid.is_negative() {
        return Err(CoreError::InvalidPayment {
            reason: "deposit cannot be negative".to_string(),
        });
    }
    if paid > total {
        return Err(CoreError::InvalidPayment {
            reason: format!("deposit {paid} exceeds order total {total}"),
        });
    }

    Ok(OrderTotals::new(total, paid))
}

/// Totals after recording a payment of `amount_cents`.
pub fn apply_payment(order: &Order, amount_cents: i64) -> CoreResult<OrderTotals> {
    validate_payment_amount(amount_cents)?;

    if order.status == OrderStatus::Cancelled {
        return Err(CoreError::InvalidOrderState {
            order_number: order.order_number.clone(),
            status: order.status,
        });
    }

    let amount = Money::from_cents(amount_cents);
    if amount > order.balance_due() {
        return Err(CoreError::InvalidPayment {
            reason: format!(
                "payment {amount} exceeds balance due {} on {}",
                order.balance_due(),
                order.order_number
            ),
        });
    }

    Ok(OrderTotals::new(
        order.total_amount(),
        order.amount_paid() + amount,
    ))
}

/// Manual status change through the status endpoint.
pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> CoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidStatusTransition { from, to })
    }
}

/// An order with issuances that are not returned cannot be deleted.
pub fn ensure_deletable(order: &Order, active_issuances: i64) -> CoreResult<()> {
    if active_issuances > 0 {
        return Err(CoreError::HasIssuances {
            order_number: order.order_number.clone(),
            count: active_issuances,
        });
    }
    Ok(())
}

/// Body of `POST /api/orders/{id}/payments`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount_cents: i64,
}

/// Body of `PATCH /api/orders/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn line(qty: i64, price: i64, discount: i64) -> NewOrderLine {
        NewOrderLine {
            stock_item_id: "s-1".to_string(),
            quantity: qty,
            unit_price_cents: price,
            discount_cents: discount,
        }
    }

    fn order(total: i64, paid: i64, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: "o-1".to_string(),
            order_number: "ORD-20261019-0001".to_string(),
            customer_name: "Jane Doe".to_string(),
            customer_phone: None,
            total_amount_cents: total,
            amount_paid_cents: paid,
            balance_due_cents: total - paid,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_compute_totals() {
        let totals = compute_totals(&[line(2, 1000, 0), line(1, 500, 100)], 0).unwrap();
        assert_eq!(totals.total_amount.cents(), 2400);
        assert_eq!(totals.balance_due.cents(), 2400);
    }

    #[test]
    fn test_discount_larger_than_line_is_free() {
        let totals = compute_totals(&[line(1, 500, 900)], 0).unwrap();
        assert!(totals.total_amount.is_zero());
    }

    #[test]
    fn test_line_overflow_is_validation_error() {
        let err = compute_totals(&[line(3, i64::MAX / 2, 0)], 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ref v) if v.field() == "unitPriceCents"
        ));
    }

    #[test]
    fn test_total_overflow_is_validation_error() {
        let half = line(1, i64::MAX / 2 + 1, 0);
        let err = compute_totals(&[half.clone(), half], 0).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref v) if v.field() == "items"));
    }

    #[test]
    fn test_deposit_cannot_exceed_total() {
        assert!(matches!(
            compute_totals(&[line(1, 500, 0)], 600),
            Err(CoreError::InvalidPayment { .. })
        ));
    }

    #[test]
    fn test_apply_payment_keeps_balance_consistent() {
        let o = order(9000, 2000, OrderStatus::Processing);
        let totals = apply_payment(&o, 3000).unwrap();
        assert_eq!(totals.amount_paid.cents(), 5000);
        assert_eq!(totals.balance_due.cents(), 4000);
        assert_eq!(
            totals.balance_due,
            totals.total_amount - totals.amount_paid
        );
    }

    #[test]
    fn test_overpayment_rejected() {
        let o = order(9000, 8000, OrderStatus::Ready);
        assert!(apply_payment(&o, 1001).is_err());
        assert!(apply_payment(&o, 1000).is_ok());
        assert!(matches!(
            apply_payment(&o, 0),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_ensure_transition() {
        assert!(ensure_transition(OrderStatus::Ready, OrderStatus::Delivered).is_ok());
        assert!(matches!(
            ensure_transition(OrderStatus::Cancelled, OrderStatus::Pending),
            Err(CoreError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_ensure_deletable() {
        let o = order(100, 0, OrderStatus::Pending);
        assert!(ensure_deletable(&o, 0).is_ok());
        assert!(matches!(
            ensure_deletable(&o, 2),
            Err(CoreError::HasIssuances { count: 2, .. })
        ));
    }
}
