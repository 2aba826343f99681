use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::product::validate_price;
use crate::models::{
    money, CartLine, CreateOrderRequest, Order, OrderItem, OrderItemView, OrderRecord,
    OrderStatus, OrderView, Product, Profile, Stock, UNKNOWN_PRODUCT, UNKNOWN_USER,
};
use crate::services::stock::{StockChange, StockConsumption, StockPolicy};
use crate::store::Store;

/// Whether status changes must follow [`OrderStatus::can_transition_to`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any status may be set from any other; the caller is trusted.
    #[default]
    Permissive,
    /// Only forward moves, cancellation of open orders, and no-op re-entry.
    Strict,
}

/// Result of "pay my order": the order and where to pay it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub order: OrderView,
    pub payment_url: Option<String>,
}

/// Order engine: creation from a cart and status lifecycle.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    event_sender: Option<Arc<EventSender>>,
    stock_policy: StockPolicy,
    transition_policy: TransitionPolicy,
    payment_url: Option<String>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(store: Arc<dyn Store>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            store,
            event_sender,
            stock_policy: StockPolicy::default(),
            transition_policy: TransitionPolicy::default(),
            payment_url: None,
        }
    }

    pub fn with_stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }

    pub fn with_transition_policy(mut self, policy: TransitionPolicy) -> Self {
        self.transition_policy = policy;
        self
    }

    pub fn with_payment_url(mut self, payment_url: Option<String>) -> Self {
        self.payment_url = payment_url;
        self
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.publish(event).await;
        }
    }

    async fn publish_stock_changes(&self, changes: &[StockChange]) {
        for change in changes {
            if change.clamped() {
                self.publish(Event::StockClamped {
                    product_id: change.product_id,
                    variant: change.variant.clone(),
                    shortfall: change.shortfall,
                })
                .await;
            }
            if change.depleted() {
                self.publish(Event::StockDepleted {
                    product_id: change.product_id,
                    variant: change.variant.clone(),
                })
                .await;
            }
        }
    }

    /// Checks one cart line against the current catalog.
    fn validate_line(line: &CartLine, product: &Product) -> Result<(), ServiceError> {
        if line.quantity == 0 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for {} must be at least 1",
                product.name
            )));
        }
        validate_price(line.unit_price)?;
        if let Some(variant) = &line.variant {
            match &product.stock {
                Stock::Variants { .. } if product.stock.variant(variant).is_some() => {}
                Stock::Variants { .. } => {
                    return Err(ServiceError::ValidationError(format!(
                        "{} has no variant named {}",
                        product.name, variant
                    )))
                }
                _ => {
                    return Err(ServiceError::ValidationError(format!(
                        "{} does not offer variants",
                        product.name
                    )))
                }
            }
        }
        Ok(())
    }

    /// Places an order from a cart.
    ///
    /// Unit prices are the caller's snapshot and are not re-read from the
    /// catalog. An empty cart records a manual debt of `total_amount`.
    /// Stock is consumed in the same unit of work that persists the order.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, item_count = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderView, ServiceError> {
        self.store.get_profile(request.user_id).await?;

        for line in &request.items {
            let product = self.store.get_product(line.product_id).await?;
            Self::validate_line(line, &product)?;
        }

        let line_totals = request
            .items
            .iter()
            .map(CartLine::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        let computed = money::sum(line_totals)?;
        if computed > money::MAX_AMOUNT {
            return Err(ServiceError::ValidationError(format!(
                "Order total {} exceeds the maximum of {}",
                computed,
                money::MAX_AMOUNT
            )));
        }
        let total_amount = if request.items.is_empty() {
            let total = request.total_amount.ok_or_else(|| {
                ServiceError::ValidationError(
                    "total_amount is required for an order without items".to_string(),
                )
            })?;
            validate_price(total)?;
            total
        } else {
            match request.total_amount {
                Some(supplied) if supplied != computed => {
                    return Err(ServiceError::ValidationError(format!(
                        "total_amount {} does not match the item total {}",
                        supplied, computed
                    )));
                }
                _ => computed,
            }
        };

        let order = Order::pending(request.user_id, total_amount, Utc::now());
        let items = request
            .items
            .iter()
            .map(|line| OrderItem::from_line(order.id, line))
            .collect::<Result<Vec<_>, _>>()?;
        let consumption: Vec<StockConsumption> = items.iter().map(StockConsumption::from).collect();

        let (record, changes) = self
            .store
            .commit_order(OrderRecord { order, items }, consumption, self.stock_policy)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %request.user_id, "Failed to commit order");
                e
            })?;

        info!(
            order_id = %record.order.id,
            user_id = %record.order.user_id,
            total = %money::format_amount(record.order.total_amount),
            "Order created successfully"
        );

        self.publish(Event::OrderCreated {
            order_id: record.order.id,
            user_id: record.order.user_id,
            total_amount: record.order.total_amount,
            item_count: record.items.len(),
        })
        .await;
        self.publish_stock_changes(&changes).await;

        self.view(record).await
    }

    /// Sets the order status, stamping the matching timestamp the first
    /// time the status is reached.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn advance_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderView, ServiceError> {
        let record = self.store.get_order(order_id).await?;
        let order = self.transition(record.order, next).await?;
        self.view(OrderRecord {
            order,
            items: record.items,
        })
        .await
    }

    async fn transition(&self, mut order: Order, next: OrderStatus) -> Result<Order, ServiceError> {
        let previous = order.status;
        if self.transition_policy == TransitionPolicy::Strict && !previous.can_transition_to(next) {
            warn!(order_id = %order.id, from = %previous, to = %next, "Rejected status transition");
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot move order from {} to {}",
                previous, next
            )));
        }

        let before = order.clone();
        order.apply_status(next, Utc::now());
        if order == before {
            return Ok(order);
        }

        let order = self.store.update_order(order).await?;
        if previous != next {
            info!(order_id = %order.id, from = %previous, to = %next, "Order status changed");
            self.publish(Event::OrderStatusChanged {
                order_id: order.id,
                old_status: previous,
                new_status: next,
            })
            .await;
        }
        Ok(order)
    }

    /// The member announces an external payment.
    pub async fn notify_payment(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        self.advance_status(order_id, OrderStatus::PaymentNotified)
            .await
    }

    /// An administrator confirms the payment was received.
    pub async fn confirm_order(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        self.advance_status(order_id, OrderStatus::Confirmed).await
    }

    pub async fn cancel_order(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        self.advance_status(order_id, OrderStatus::Cancelled).await
    }

    /// Stamps `payment_initiated_at` once and hands back the payment link.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn initiate_payment(&self, order_id: Uuid) -> Result<PaymentIntent, ServiceError> {
        let mut record = self.store.get_order(order_id).await?;
        if record.order.mark_payment_initiated(Utc::now()) {
            record.order = self.store.update_order(record.order).await?;
            info!(order_id = %order_id, "Payment initiated");
            self.publish(Event::PaymentInitiated { order_id }).await;
        }
        if self.payment_url.is_none() {
            warn!(order_id = %order_id, "No payment link configured");
        }

        Ok(PaymentIntent {
            order: self.view(record).await?,
            payment_url: self.payment_url.clone(),
        })
    }

    /// "I paid my debt": every pending order of the member becomes
    /// payment-notified. Returns the orders that moved.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn notify_payment_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        self.store.get_profile(user_id).await?;

        let mut moved = Vec::new();
        for record in self.store.list_orders(Some(user_id)).await? {
            if record.order.status != OrderStatus::Pending {
                continue;
            }
            let order = self
                .transition(record.order, OrderStatus::PaymentNotified)
                .await?;
            moved.push(OrderRecord {
                order,
                items: record.items,
            });
        }

        info!(user_id = %user_id, count = moved.len(), "Member notified payment");
        self.join(moved).await
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        let record = self.store.get_order(order_id).await?;
        self.view(record).await
    }

    /// All orders, or one member's, newest first with display joins.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<OrderView>, ServiceError> {
        if let Some(uid) = user_id {
            self.store.get_profile(uid).await?;
        }
        let records = self.store.list_orders(user_id).await?;
        self.join(records).await
    }

    pub async fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        self.list_orders(Some(user_id)).await
    }

    async fn view(&self, record: OrderRecord) -> Result<OrderView, ServiceError> {
        let mut views = self.join(vec![record]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::InternalError("order view lost during join".to_string()))
    }

    /// Best-effort joins: missing members or products get placeholder labels.
    async fn join(&self, records: Vec<OrderRecord>) -> Result<Vec<OrderView>, ServiceError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let profiles: HashMap<Uuid, Profile> = self
            .store
            .list_profiles()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let product_names: HashMap<Uuid, String> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| join_order(record, &profiles, &product_names))
            .collect())
    }
}

fn join_order(
    record: OrderRecord,
    profiles: &HashMap<Uuid, Profile>,
    product_names: &HashMap<Uuid, String>,
) -> OrderView {
    let order_id = record.order.id;
    let items = record
        .items
        .into_iter()
        .map(|item| {
            let product_name = match product_names.get(&item.product_id) {
                Some(name) => name.clone(),
                None => {
                    warn!(%order_id, product_id = %item.product_id, "Order item references an unknown product");
                    UNKNOWN_PRODUCT.to_string()
                }
            };
            OrderItemView { item, product_name }
        })
        .collect();

    let (user_name, user_email) = match profiles.get(&record.order.user_id) {
        Some(profile) => (profile.display_name().to_string(), Some(profile.email.clone())),
        None => {
            warn!(%order_id, user_id = %record.order.user_id, "Order references an unknown member");
            (UNKNOWN_USER.to_string(), None)
        }
    };

    OrderView {
        order: record.order,
        items,
        user_name,
        user_email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, StockVariant};
    use crate::store::{Dataset, MemoryStore};
    use assert_matches::assert_matches;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Fixture {
        orders: OrderService,
        store: Arc<MemoryStore>,
        member: Profile,
        harira: Product,
        shirt: Product,
    }

    fn fixture() -> Fixture {
        let member = Profile {
            id: Uuid::new_v4(),
            email: "marie@popotte.fr".into(),
            full_name: "Marie Dupont".into(),
            username: "marie".into(),
            role: Role::User,
            created_at: Utc::now(),
        };
        let harira = Product {
            id: Uuid::new_v4(),
            name: "Harira".into(),
            description: None,
            price: dec!(4.50),
            category_id: None,
            image_url: None,
            is_available: true,
            display_order: 1,
            stock: Stock::Simple { stock_quantity: 2 },
            created_at: Utc::now(),
        };
        let shirt = Product {
            id: Uuid::new_v4(),
            name: "T-shirt".into(),
            stock: Stock::Variants {
                stock_variants: vec![StockVariant {
                    name: "M".into(),
                    quantity: 3,
                }],
            },
            ..harira.clone()
        };
        let store = Arc::new(MemoryStore::in_memory(Dataset {
            profiles: vec![member.clone()],
            products: vec![harira.clone(), shirt.clone()],
            ..Default::default()
        }));
        Fixture {
            orders: OrderService::new(store.clone(), None),
            store,
            member,
            harira,
            shirt,
        }
    }

    fn line(product: &Product, quantity: u32, variant: Option<&str>) -> CartLine {
        CartLine {
            product_id: product.id,
            quantity,
            unit_price: product.price,
            variant: variant.map(str::to_string),
        }
    }

    fn cart(user_id: Uuid, items: Vec<CartLine>) -> CreateOrderRequest {
        CreateOrderRequest {
            user_id,
            items,
            total_amount: None,
        }
    }

    #[tokio::test]
    async fn harira_order_totals_and_starts_pending() {
        let f = fixture();
        let view = f
            .orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 2, None)]))
            .await
            .unwrap();

        assert_eq!(view.order.total_amount, dec!(9.00));
        assert_eq!(view.order.status, OrderStatus::Pending);
        assert!(view.order.payment_initiated_at.is_none());
        assert!(view.order.payment_notified_at.is_none());
        assert!(view.order.confirmed_at.is_none());
        assert_eq!(view.user_name, "Marie Dupont");
        assert_eq!(view.items[0].product_name, "Harira");
    }

    #[tokio::test]
    async fn over_consumption_clamps_to_zero() {
        let f = fixture();
        f.orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 3, None)]))
            .await
            .unwrap();

        let stored = f.store.get_product(f.harira.id).await.unwrap();
        assert_eq!(stored.stock, Stock::Simple { stock_quantity: 0 });
    }

    #[tokio::test]
    async fn reject_policy_refuses_over_consumption() {
        let f = fixture();
        let orders = f.orders.clone().with_stock_policy(StockPolicy::Reject);

        let result = orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 3, None)]))
            .await;

        assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
        assert!(f.store.list_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_debt_uses_supplied_total() {
        let f = fixture();
        let mut request = cart(f.member.id, vec![]);
        request.total_amount = Some(dec!(15.00));

        let view = f.orders.create_order(request).await.unwrap();

        assert_eq!(view.order.total_amount, dec!(15.00));
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn manual_debt_without_total_is_rejected() {
        let f = fixture();
        let result = f.orders.create_order(cart(f.member.id, vec![])).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn oversized_amounts_are_rejected_without_side_effects() {
        let f = fixture();
        let huge = CartLine {
            unit_price: Decimal::from_str_exact("79228162514264337593543950.33").unwrap(),
            ..line(&f.harira, 4_000_000_000, None)
        };
        let result = f.orders.create_order(cart(f.member.id, vec![huge])).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));

        // Each price fits a column but the order total does not.
        let priciest = CartLine {
            unit_price: money::MAX_AMOUNT,
            ..line(&f.harira, 4_000_000_000, None)
        };
        let result = f.orders.create_order(cart(f.member.id, vec![priciest])).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));

        let mut debt = cart(f.member.id, vec![]);
        debt.total_amount = Some(money::MAX_AMOUNT + dec!(0.01));
        assert_matches!(
            f.orders.create_order(debt).await,
            Err(ServiceError::ValidationError(_))
        );

        assert!(f.store.list_orders(None).await.unwrap().is_empty());
        assert_eq!(
            f.store.get_product(f.harira.id).await.unwrap().stock,
            Stock::Simple { stock_quantity: 2 }
        );
    }

    #[tokio::test]
    async fn mismatched_total_is_rejected() {
        let f = fixture();
        let mut request = cart(f.member.id, vec![line(&f.harira, 1, None)]);
        request.total_amount = Some(dec!(1.00));
        let result = f.orders.create_order(request).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn unknown_references_are_not_found() {
        let f = fixture();
        let ghost = Product {
            id: Uuid::new_v4(),
            ..f.harira.clone()
        };
        assert_matches!(
            f.orders
                .create_order(cart(Uuid::new_v4(), vec![line(&f.harira, 1, None)]))
                .await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            f.orders
                .create_order(cart(f.member.id, vec![line(&ghost, 1, None)]))
                .await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            f.orders.confirm_order(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn line_validation() {
        let f = fixture();
        assert_matches!(
            f.orders
                .create_order(cart(f.member.id, vec![line(&f.harira, 0, None)]))
                .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            f.orders
                .create_order(cart(f.member.id, vec![line(&f.shirt, 1, Some("XL"))]))
                .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            f.orders
                .create_order(cart(f.member.id, vec![line(&f.harira, 1, Some("M"))]))
                .await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn payment_notified_timestamp_is_set_once() {
        let f = fixture();
        let created = f
            .orders
            .create_order(cart(f.member.id, vec![line(&f.shirt, 1, Some("M"))]))
            .await
            .unwrap();

        let first = f.orders.notify_payment(created.order.id).await.unwrap();
        let second = f.orders.notify_payment(created.order.id).await.unwrap();

        assert!(first.order.payment_notified_at.is_some());
        assert_eq!(first.order.payment_notified_at, second.order.payment_notified_at);
    }

    #[tokio::test]
    async fn permissive_policy_allows_backward_moves() {
        let f = fixture();
        let created = f
            .orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 1, None)]))
            .await
            .unwrap();
        let confirmed = f.orders.confirm_order(created.order.id).await.unwrap();

        let reopened = f
            .orders
            .advance_status(created.order.id, OrderStatus::Pending)
            .await
            .unwrap();

        assert_eq!(reopened.order.status, OrderStatus::Pending);
        assert_eq!(reopened.order.confirmed_at, confirmed.order.confirmed_at);
    }

    #[tokio::test]
    async fn strict_policy_rejects_backward_moves() {
        let f = fixture();
        let orders = f
            .orders
            .clone()
            .with_transition_policy(TransitionPolicy::Strict);
        let created = orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 1, None)]))
            .await
            .unwrap();
        orders.confirm_order(created.order.id).await.unwrap();

        assert_matches!(
            orders.cancel_order(created.order.id).await,
            Err(ServiceError::InvalidStatus(_))
        );
        assert_matches!(
            orders
                .advance_status(created.order.id, OrderStatus::Pending)
                .await,
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[tokio::test]
    async fn initiate_payment_stamps_once_and_returns_link() {
        let f = fixture();
        let orders = f
            .orders
            .clone()
            .with_payment_url(Some("https://pay.example.org/popotte".into()));
        let created = orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 1, None)]))
            .await
            .unwrap();

        let first = orders.initiate_payment(created.order.id).await.unwrap();
        let second = orders.initiate_payment(created.order.id).await.unwrap();

        assert_eq!(first.payment_url.as_deref(), Some("https://pay.example.org/popotte"));
        assert!(first.order.order.payment_initiated_at.is_some());
        assert_eq!(
            first.order.order.payment_initiated_at,
            second.order.order.payment_initiated_at
        );
        assert_eq!(second.order.order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn notify_for_user_moves_only_pending_orders() {
        let f = fixture();
        let a = f
            .orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 1, None)]))
            .await
            .unwrap();
        let b = f
            .orders
            .create_order(cart(f.member.id, vec![line(&f.shirt, 1, Some("M"))]))
            .await
            .unwrap();
        f.orders.confirm_order(a.order.id).await.unwrap();

        let moved = f.orders.notify_payment_for_user(f.member.id).await.unwrap();

        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].order.id, b.order.id);
        assert_eq!(moved[0].order.status, OrderStatus::PaymentNotified);
    }

    #[tokio::test]
    async fn deleted_product_shows_placeholder_name() {
        let f = fixture();
        let created = f
            .orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 1, None)]))
            .await
            .unwrap();
        f.store.delete_product(f.harira.id).await.unwrap();

        let view = f.orders.get_order(created.order.id).await.unwrap();
        assert_eq!(view.items[0].product_name, UNKNOWN_PRODUCT);
        assert_eq!(view.items[0].item.unit_price, dec!(4.50));
    }

    #[tokio::test]
    async fn events_are_published_on_creation() {
        let f = fixture();
        let (sender, mut rx) = EventSender::channel(16);
        let orders = OrderService::new(f.store.clone(), Some(Arc::new(sender)));

        let created = orders
            .create_order(cart(f.member.id, vec![line(&f.harira, 2, None)]))
            .await
            .unwrap();

        assert_matches!(
            rx.recv().await,
            Some(Event::OrderCreated { order_id, item_count: 1, .. }) if order_id == created.order.id
        );
        assert_matches!(
            rx.recv().await,
            Some(Event::StockDepleted { product_id, .. }) if product_id == f.harira.id
        );
    }

    #[tokio::test]
    async fn listing_unknown_member_is_not_found() {
        let f = fixture();
        assert_matches!(
            f.orders.list_user_orders(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
    }
}
