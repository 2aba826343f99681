use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money;
use crate::errors::ServiceError;

/// Display label used when an order's member no longer resolves
pub const UNKNOWN_USER: &str = "unknown user";
/// Display label used when an item's product no longer resolves
pub const UNKNOWN_PRODUCT: &str = "unknown product";

/// Lifecycle of an order. Only `Pending` orders count as debt.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaymentNotified,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Cancelled)
    }

    /// Transition table used when strict transitions are enabled.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            _ if self == next => true,
            (Pending, PaymentNotified) | (Pending, Confirmed) => true,
            (PaymentNotified, Confirmed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_initiated_at: Option<DateTime<Utc>>,
    pub payment_notified_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// A fresh order: pending, no lifecycle timestamps.
    pub fn pending(user_id: Uuid, total_amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            total_amount,
            status: OrderStatus::Pending,
            payment_initiated_at: None,
            payment_notified_at: None,
            confirmed_at: None,
            created_at: now,
        }
    }

    /// Moves to `next`. The timestamp tied to a status is written only the
    /// first time that status is reached; re-entering it keeps the original.
    pub fn apply_status(&mut self, next: OrderStatus, now: DateTime<Utc>) {
        self.status = next;
        match next {
            OrderStatus::PaymentNotified => {
                self.payment_notified_at.get_or_insert(now);
            }
            OrderStatus::Confirmed => {
                self.confirmed_at.get_or_insert(now);
            }
            OrderStatus::Pending | OrderStatus::Cancelled => {}
        }
    }

    /// Returns false when the payment was already initiated.
    pub fn mark_payment_initiated(&mut self, now: DateTime<Utc>) -> bool {
        if self.payment_initiated_at.is_some() {
            return false;
        }
        self.payment_initiated_at = Some(now);
        true
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    /// Price snapshot taken when the order was placed
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub variant: Option<String>,
}

impl OrderItem {
    pub fn from_line(order_id: Uuid, line: &CartLine) -> Result<Self, ServiceError> {
        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total_price: line.line_total()?,
            variant: line.variant.clone(),
        })
    }
}

/// An order together with the items it owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// One cart entry submitted by a member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub variant: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> Result<Decimal, ServiceError> {
        money::times(self.unit_price, self.quantity)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub items: Vec<CartLine>,
    /// Required for manual debts (no items); must match the item sum otherwise
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    /// Current catalog name, not a snapshot
    pub product_name: String,
}

/// An order joined with product names and its member, for display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemView>,
    pub user_name: String,
    pub user_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use strum::IntoEnumIterator;

    #[test]
    fn new_order_is_pending_without_timestamps() {
        let order = Order::pending(Uuid::new_v4(), dec!(9.00), Utc::now());
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.payment_initiated_at.is_none());
        assert!(order.payment_notified_at.is_none());
        assert!(order.confirmed_at.is_none());
    }

    #[test]
    fn status_timestamps_are_set_once() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);
        let mut order = Order::pending(Uuid::new_v4(), dec!(1), t0);

        order.apply_status(OrderStatus::PaymentNotified, t0);
        order.apply_status(OrderStatus::PaymentNotified, t1);
        assert_eq!(order.payment_notified_at, Some(t0));

        order.apply_status(OrderStatus::Confirmed, t1);
        order.apply_status(OrderStatus::Pending, t1);
        order.apply_status(OrderStatus::Confirmed, t1 + Duration::minutes(1));
        assert_eq!(order.confirmed_at, Some(t1));
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn strict_transition_table() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(PaymentNotified));
        assert!(Pending.can_transition_to(Confirmed));
        assert!(PaymentNotified.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(PaymentNotified.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!PaymentNotified.can_transition_to(Pending));
        for status in OrderStatus::iter() {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(OrderStatus::PaymentNotified.to_string(), "payment_notified");
        assert_eq!(
            "payment_notified".parse::<OrderStatus>().unwrap(),
            OrderStatus::PaymentNotified
        );
        assert_eq!(
            serde_json::to_value(OrderStatus::Confirmed).unwrap(),
            serde_json::json!("confirmed")
        );
    }

    #[test]
    fn line_total_multiplies_quantity() {
        let line = CartLine {
            product_id: Uuid::new_v4(),
            quantity: 2,
            unit_price: dec!(4.50),
            variant: None,
        };
        assert_eq!(line.line_total().unwrap(), dec!(9.00));
    }

    #[test]
    fn line_total_refuses_to_overflow() {
        let line = CartLine {
            product_id: Uuid::new_v4(),
            quantity: u32::MAX,
            unit_price: Decimal::MAX,
            variant: None,
        };
        assert!(matches!(
            line.line_total(),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(OrderItem::from_line(Uuid::new_v4(), &line).is_err());
    }
}
