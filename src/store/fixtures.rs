//! Seed data for fresh memory and local stores.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::Dataset;
use crate::models::category::slugify;
use crate::models::news::derive_excerpt;
use crate::models::{Category, NewsPost, Product, Profile, Role, Stock, StockVariant};

fn category(name: &str, display_order: i32, age_minutes: i64) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slugify(name),
        display_order,
        created_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

fn product(
    name: &str,
    description: &str,
    price: Decimal,
    category: Option<&Category>,
    display_order: i32,
    stock: Stock,
) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: Some(description.to_string()),
        price,
        category_id: category.map(|c| c.id),
        image_url: None,
        is_available: true,
        display_order,
        stock,
        created_at: Utc::now() - Duration::minutes(30),
    }
}

fn profile(email: &str, full_name: &str, username: &str, role: Role) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        email: email.to_string(),
        full_name: full_name.to_string(),
        username: username.to_string(),
        role,
        created_at: Utc::now() - Duration::days(30),
    }
}

/// Catalog, two members and a couple of news posts. No orders.
pub fn dataset() -> Dataset {
    let plats = category("Plats", 1, 60);
    let boissons = category("Boissons", 2, 59);
    let desserts = category("Desserts", 3, 58);

    let products = vec![
        product(
            "Harira",
            "Soupe traditionnelle aux lentilles et pois chiches",
            dec!(4.50),
            Some(&plats),
            1,
            Stock::Simple { stock_quantity: 20 },
        ),
        product(
            "Couscous",
            "Semoule, légumes et pois chiches",
            dec!(8.00),
            Some(&plats),
            2,
            Stock::Untracked,
        ),
        product(
            "Thé à la menthe",
            "Servi chaud",
            dec!(1.50),
            Some(&boissons),
            1,
            Stock::Untracked,
        ),
        product(
            "Jus d'orange",
            "Pressé le matin",
            dec!(2.00),
            Some(&boissons),
            2,
            Stock::Simple { stock_quantity: 12 },
        ),
        product(
            "Makrout",
            "Gâteau de semoule aux dattes",
            dec!(1.00),
            Some(&desserts),
            1,
            Stock::Simple { stock_quantity: 30 },
        ),
        product(
            "T-shirt Popotte",
            "Coton bio, logo brodé",
            dec!(12.00),
            None,
            1,
            Stock::Variants {
                stock_variants: vec![
                    StockVariant {
                        name: "S".to_string(),
                        quantity: 5,
                    },
                    StockVariant {
                        name: "M".to_string(),
                        quantity: 8,
                    },
                    StockVariant {
                        name: "L".to_string(),
                        quantity: 3,
                    },
                ],
            },
        ),
    ];

    let admin = profile(
        "admin@popotte.fr",
        "Admin Popotte",
        "popottier",
        Role::Admin,
    );
    let member = profile("marie@popotte.fr", "Marie Dupont", "marie", Role::User);

    let welcome = "Bienvenue sur la nouvelle application de la Popotte ! Vous pouvez désormais \
                   commander en ligne, suivre vos dettes et les régler en un clic. Les popottiers \
                   confirment les paiements chaque semaine.";
    let news = vec![
        NewsPost {
            id: Uuid::new_v4(),
            title: "Bienvenue".to_string(),
            content: welcome.to_string(),
            excerpt: Some(derive_excerpt(welcome)),
            image_url: None,
            author_id: Some(admin.id),
            published: true,
            created_at: Utc::now() - Duration::days(2),
        },
        NewsPost {
            id: Uuid::new_v4(),
            title: "Soirée couscous".to_string(),
            content: "Date à confirmer.".to_string(),
            excerpt: None,
            image_url: None,
            author_id: Some(admin.id),
            published: false,
            created_at: Utc::now() - Duration::days(1),
        },
    ];

    Dataset {
        categories: vec![plats, boissons, desserts],
        products,
        profiles: vec![admin, member],
        orders: Vec::new(),
        order_items: Vec::new(),
        news,
    }
}
