mod common;

use assert_matches::assert_matches;
use common::{category, product, simple, Backend, TestStore};
use popotte::errors::ServiceError;
use popotte::models::{CategoryPatch, Direction, NewCategory, NewProduct, StockMode, StockVariant};
use popotte::store::Dataset;
use rstest::rstest;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn seeded() -> Dataset {
    Dataset {
        categories: vec![
            category("Plats", 10),
            category("Boissons", 20),
            category("Desserts", 40),
        ],
        ..Default::default()
    }
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::local(Backend::Local)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn reorder_down_then_up_restores_the_ordering(#[case] backend: Backend) {
    let t = TestStore::open(backend, seeded()).await;
    let catalog = t.catalog();
    let before = catalog.list_categories().await.unwrap();
    let first = before[0].id;

    let moved = catalog.reorder_category(first, Direction::Down).await.unwrap();
    assert_eq!(moved[1].id, first);
    assert_eq!(moved[1].display_order, 20);
    assert_eq!(moved[0].display_order, 10);

    let restored = catalog.reorder_category(first, Direction::Up).await.unwrap();
    let ids = |cats: &[popotte::models::Category]| cats.iter().map(|c| (c.id, c.display_order)).collect::<Vec<_>>();
    assert_eq!(ids(&restored), ids(&before));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn reorder_past_the_edges_is_a_no_op(#[case] backend: Backend) {
    let t = TestStore::open(backend, seeded()).await;
    let catalog = t.catalog();
    let before = catalog.list_categories().await.unwrap();

    let top = catalog
        .reorder_category(before[0].id, Direction::Up)
        .await
        .unwrap();
    let bottom = catalog
        .reorder_category(before[2].id, Direction::Down)
        .await
        .unwrap();

    assert_eq!(top, before);
    assert_eq!(bottom, before);
    assert_matches!(
        catalog.reorder_category(Uuid::new_v4(), Direction::Up).await,
        Err(ServiceError::NotFound(_))
    );
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::local(Backend::Local)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn renaming_recomputes_the_slug(#[case] backend: Backend) {
    let t = TestStore::open(backend, seeded()).await;
    let catalog = t.catalog();
    let plats = catalog.list_categories().await.unwrap()[0].clone();

    let renamed = catalog
        .update_category(
            plats.id,
            CategoryPatch {
                name: Some("  Plats du Jour ".into()),
                display_order: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(renamed.name, "Plats du Jour");
    assert_eq!(renamed.slug, "plats-du-jour");
    assert_eq!(catalog.get_category(plats.id).await.unwrap().slug, "plats-du-jour");
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn new_categories_go_last(#[case] backend: Backend) {
    let t = TestStore::open(backend, seeded()).await;
    let catalog = t.catalog();

    let created = catalog
        .create_category(NewCategory {
            name: "Épicerie".into(),
            slug: None,
            display_order: None,
        })
        .await
        .unwrap();

    assert_eq!(created.display_order, 41);
    assert_eq!(created.slug, "épicerie");
    assert_matches!(
        catalog
            .create_category(NewCategory {
                name: "boissons".into(),
                slug: None,
                display_order: None,
            })
            .await,
        Err(ServiceError::Conflict(_))
    );
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::local(Backend::Local)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn product_listing_joins_category_names(#[case] backend: Backend) {
    let data = seeded();
    let boissons = data.categories[1].clone();
    let mut the = product("Thé à la menthe", dec!(1.50), simple(4));
    the.category_id = Some(boissons.id);
    let mut jus = product("Jus d'orange", dec!(2.00), simple(0));
    jus.category_id = Some(boissons.id);
    jus.is_available = false;
    let shirt = product("T-shirt", dec!(12.00), simple(1));
    let t = TestStore::open(
        backend,
        Dataset {
            products: vec![the.clone(), jus.clone(), shirt.clone()],
            ..data
        },
    )
    .await;
    let catalog = t.catalog();

    let all = catalog.list_products(false).await.unwrap();
    let names: Vec<&str> = all.iter().map(|v| v.product.name.as_str()).collect();
    assert_eq!(names, vec!["Jus d'orange", "T-shirt", "Thé à la menthe"]);
    assert_eq!(all[0].category_name.as_deref(), Some("Boissons"));
    assert_eq!(all[1].category_name, None);

    let available = catalog.list_products(true).await.unwrap();
    assert_eq!(available.len(), 2);
    assert!(available.iter().all(|v| v.product.is_available));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn product_validation(#[case] backend: Backend) {
    let t = TestStore::open(backend, seeded()).await;
    let catalog = t.catalog();
    let base = NewProduct {
        name: "Makrout".into(),
        description: None,
        price: dec!(1.00),
        category_id: None,
        image_url: None,
        is_available: true,
        display_order: None,
        stock_mode: StockMode::Simple,
        stock_quantity: Some(10),
        stock_variants: None,
    };

    assert_matches!(
        catalog
            .create_product(NewProduct {
                price: dec!(-1.00),
                ..base.clone()
            })
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        catalog
            .create_product(NewProduct {
                price: dec!(1.005),
                ..base.clone()
            })
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        catalog
            .create_product(NewProduct {
                category_id: Some(Uuid::new_v4()),
                ..base.clone()
            })
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        catalog
            .create_product(NewProduct {
                stock_mode: StockMode::Variants,
                stock_quantity: None,
                stock_variants: Some(vec![
                    StockVariant {
                        name: "M".into(),
                        quantity: 1
                    },
                    StockVariant {
                        name: "M".into(),
                        quantity: 2
                    },
                ]),
                ..base.clone()
            })
            .await,
        Err(ServiceError::ValidationError(_))
    );

    let created = catalog.create_product(base).await.unwrap();
    assert_eq!(created.stock, simple(10));
    assert_eq!(created.display_order, 1);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::local(Backend::Local)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn deleting_a_category_keeps_its_products(#[case] backend: Backend) {
    let data = seeded();
    let plats = data.categories[0].clone();
    let mut harira = product("Harira", dec!(4.50), simple(4));
    harira.category_id = Some(plats.id);
    let t = TestStore::open(
        backend,
        Dataset {
            products: vec![harira.clone()],
            ..data
        },
    )
    .await;
    let catalog = t.catalog();

    catalog.delete_category(plats.id).await.unwrap();

    let view = catalog.get_product(harira.id).await.unwrap();
    assert_eq!(view.product.category_id, None);
    assert_eq!(view.category_name, None);
    assert_matches!(
        catalog.get_category(plats.id).await,
        Err(ServiceError::NotFound(_))
    );
}
