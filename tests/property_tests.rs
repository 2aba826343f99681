//! Property checks over the pure parts of the engine.

mod common;

use chrono::{Duration, Utc};
use common::{category, product, simple, variants};
use popotte::models::{CartLine, Order, OrderItem, OrderStatus, Stock};
use popotte::services::debts::outstanding_balance;
use popotte::services::stock::apply_consumption;
use popotte::services::{StockConsumption, StockPolicy};
use popotte::store::Dataset;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn cents() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|c| Decimal::new(c, 2))
}

fn status() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::PaymentNotified),
        Just(OrderStatus::Confirmed),
        Just(OrderStatus::Cancelled),
    ]
}

fn counters(stock: &Stock) -> Vec<u32> {
    match stock {
        Stock::Untracked => vec![],
        Stock::Simple { stock_quantity } => vec![*stock_quantity],
        Stock::Variants { stock_variants } => stock_variants.iter().map(|v| v.quantity).collect(),
    }
}

proptest! {
    #[test]
    fn order_total_equals_sum_of_items(lines in prop::collection::vec((1u32..20, cents()), 0..10)) {
        let order_id = Uuid::new_v4();
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|(quantity, unit_price)| {
                OrderItem::from_line(order_id, &CartLine {
                    product_id: Uuid::new_v4(),
                    quantity: *quantity,
                    unit_price: *unit_price,
                    variant: None,
                })
                .unwrap()
            })
            .collect();

        let total: Decimal = items.iter().map(|i| i.total_price).sum();
        let expected: Decimal = lines
            .iter()
            .map(|(q, p)| *p * Decimal::from(*q))
            .sum();
        prop_assert_eq!(total, expected);
        for item in &items {
            prop_assert_eq!(item.total_price, item.unit_price * Decimal::from(item.quantity));
        }
    }

    #[test]
    fn over_consumption_clamps_each_counter_at_zero(
        start in 0u32..10,
        small in 0u32..10,
        large in 0u32..10,
        demands in prop::collection::vec((0usize..3, 1u32..15, prop::option::of(0usize..3)), 0..20),
    ) {
        let mut products = vec![
            product("Harira", Decimal::ONE, simple(start)),
            product("T-shirt", Decimal::ONE, variants(&[("S", small), ("L", large)])),
            product("Couscous", Decimal::ONE, Stock::Untracked),
        ];
        let names = ["S", "L", "XXL"];
        let consumption: Vec<StockConsumption> = demands
            .iter()
            .map(|(idx, quantity, variant)| StockConsumption {
                product_id: products[*idx].id,
                quantity: *quantity,
                variant: variant.map(|v| names[v].to_string()),
            })
            .collect();

        // Total demand per counter. A simple counter takes every line,
        // a variant counter only lines naming it; the rest is ignored.
        let mut simple_demand = 0u32;
        let mut variant_demand = [0u32; 2];
        for (idx, quantity, variant) in &demands {
            match (*idx, *variant) {
                (0, _) => simple_demand += quantity,
                (1, Some(v)) if v < 2 => variant_demand[v] += quantity,
                _ => {}
            }
        }

        apply_consumption(&mut products, &consumption, StockPolicy::Clamp).unwrap();

        prop_assert_eq!(counters(&products[0].stock), vec![start.saturating_sub(simple_demand)]);
        prop_assert_eq!(
            counters(&products[1].stock),
            vec![
                small.saturating_sub(variant_demand[0]),
                large.saturating_sub(variant_demand[1]),
            ]
        );
        prop_assert_eq!(&products[2].stock, &Stock::Untracked);
    }

    #[test]
    fn status_timestamps_are_set_once(steps in prop::collection::vec(status(), 1..12)) {
        let start = Utc::now();
        let mut order = Order::pending(Uuid::new_v4(), Decimal::ONE, start);
        let mut notified = None;
        let mut confirmed = None;

        for (i, next) in steps.into_iter().enumerate() {
            order.apply_status(next, start + Duration::seconds(i as i64 + 1));
            prop_assert_eq!(order.status, next);
            if notified.is_none() {
                notified = order.payment_notified_at;
            }
            if confirmed.is_none() {
                confirmed = order.confirmed_at;
            }
            prop_assert_eq!(order.payment_notified_at, notified);
            prop_assert_eq!(order.confirmed_at, confirmed);
        }
    }

    #[test]
    fn balance_is_the_sum_of_pending_orders(
        entries in prop::collection::vec((any::<bool>(), cents(), status()), 0..20),
        extra in cents(),
    ) {
        let me = Uuid::new_v4();
        let someone = Uuid::new_v4();
        let now = Utc::now();
        let mut orders: Vec<Order> = entries
            .iter()
            .map(|(mine, amount, status)| {
                let mut order = Order::pending(if *mine { me } else { someone }, *amount, now);
                order.apply_status(*status, now);
                order
            })
            .collect();

        let expected: Decimal = orders
            .iter()
            .filter(|o| o.user_id == me && o.status == OrderStatus::Pending)
            .map(|o| o.total_amount)
            .sum();
        let balance = outstanding_balance(&orders, me).unwrap();
        prop_assert_eq!(balance, expected);

        let mut confirmed = Order::pending(me, extra, now);
        confirmed.apply_status(OrderStatus::Confirmed, now);
        orders.push(confirmed);
        prop_assert_eq!(outstanding_balance(&orders, me).unwrap(), balance);

        orders.push(Order::pending(me, extra, now));
        prop_assert_eq!(outstanding_balance(&orders, me).unwrap(), balance + extra);
    }

    #[test]
    fn category_swap_is_its_own_inverse(
        orders in prop::collection::btree_set(0i32..1000, 2..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut data = Dataset::default();
        for (i, display_order) in orders.iter().enumerate() {
            data.insert_category(category(&format!("Catégorie {}", i), *display_order)).unwrap();
        }
        let sorted = data.categories_sorted();
        let idx = pick.index(sorted.len() - 1);
        let (a, b) = (sorted[idx].id, sorted[idx + 1].id);

        data.swap_category_order(a, b).unwrap();
        let swapped = data.categories_sorted();
        prop_assert_eq!(swapped[idx].id, b);
        prop_assert_eq!(swapped[idx + 1].id, a);

        data.swap_category_order(b, a).unwrap();
        prop_assert_eq!(data.categories_sorted(), sorted);
    }
}
