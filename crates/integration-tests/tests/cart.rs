//! Cart persistence, hydration and checkout through the full client.

#![allow(clippy::unwrap_used)]

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tableside_client::api::types::{CheckoutDetails, OrderCreateRequest};
use tableside_client::http::{Method, StatusCode};
use tableside_client::storage::keys;
use tableside_client::{CartStore, KeyValueStore, MemoryStore};
use tableside_core::{DishId, Money, OrderStatus};
use tableside_integration_tests::{FakeBackend, client_for, dish_json, stored_session};

fn money(raw: &str) -> Money {
    Money::new(Decimal::from_str(raw).unwrap())
}

fn menu(backend: &FakeBackend) {
    backend.route_public(
        Method::GET,
        "/dishes",
        StatusCode::OK,
        json!([
            dish_json(1, "Goulash", "2490"),
            dish_json(2, "Lángos", "990.50"),
            dish_json(3, "Chef's surprise", "n/a"),
        ]),
    );
}

#[tokio::test]
async fn cart_survives_a_restart_and_rehydrates() {
    let backend = FakeBackend::new();
    menu(&backend);
    let session = MemoryStore::new();

    {
        let client = client_for(&backend, Arc::new(MemoryStore::new()));
        let cart = CartStore::restore(Arc::new(session.clone()));
        let dishes = client.dishes().await.unwrap();
        let goulash = dishes.iter().find(|d| d.id == DishId::new(1)).unwrap();
        let langos = dishes.iter().find(|d| d.id == DishId::new(2)).unwrap();
        assert!(cart.add(goulash, None, 2));
        assert!(cart.add(langos, None, 1));
    }

    // Identifiers and quantities only.
    let stored: serde_json::Value =
        serde_json::from_str(&session.get(keys::SHOPPING_CART).unwrap().unwrap()).unwrap();
    assert_eq!(
        stored,
        json!([{"dishId": 1, "quantity": 2}, {"dishId": 2, "quantity": 1}])
    );

    let client = client_for(&backend, Arc::new(MemoryStore::new()));
    let cart = CartStore::load(Arc::new(session.clone()), &client);
    assert_eq!(cart.total_items(), 3);
    cart.wait_hydrated().await;

    let lines = cart.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.dish.is_some()));
    assert_eq!(cart.total_price(), money("5970.50"));
    assert_eq!(backend.calls_to("/dishes").len(), 2);
}

#[tokio::test]
async fn variant_lines_keep_their_price_across_a_restart() {
    let backend = FakeBackend::new();
    menu(&backend);
    backend.route_public(
        Method::GET,
        "/dish-variants/dish/1",
        StatusCode::OK,
        json!([
            {"id": 7, "dish_id": 1, "detail": "large", "price": "3490"},
            {"id": 8, "dish_id": 1, "detail": "small", "price": "1990"},
        ]),
    );
    let session = MemoryStore::new();

    let before = {
        let client = client_for(&backend, Arc::new(MemoryStore::new()));
        let cart = CartStore::restore(Arc::new(session.clone()));
        let goulash = client.dish(DishId::new(1)).await.unwrap();
        let variants = client.variants_for_dish(DishId::new(1)).await.unwrap();
        let large = variants.iter().find(|v| v.detail == "large").unwrap();
        assert!(cart.add(&goulash, Some(large), 2));
        cart.total_price()
    };
    assert_eq!(before, money("6980"));

    let client = client_for(&backend, Arc::new(MemoryStore::new()));
    let cart = CartStore::load(Arc::new(session), &client);
    cart.wait_hydrated().await;

    assert_eq!(cart.total_price(), before);
    let line = cart.lines().into_iter().next().unwrap();
    assert_eq!(line.unit_price(), Some(money("3490")));
}

#[tokio::test]
async fn unpriced_dishes_are_refused() {
    let backend = FakeBackend::new();
    menu(&backend);
    let client = client_for(&backend, Arc::new(MemoryStore::new()));
    let session = MemoryStore::new();
    let cart = CartStore::restore(Arc::new(session.clone()));

    let surprise = client.dish(DishId::new(3)).await.unwrap();
    assert!(surprise.price.is_none());

    assert!(!cart.add(&surprise, None, 1));
    assert!(cart.is_empty());
    assert!(!session.contains(keys::SHOPPING_CART));
}

#[tokio::test]
async fn catalog_outage_leaves_placeholder_lines() {
    let backend = FakeBackend::new();
    backend.route_public(
        Method::GET,
        "/dishes",
        StatusCode::SERVICE_UNAVAILABLE,
        json!({"detail": "maintenance"}),
    );
    let session = MemoryStore::new();
    session
        .set(keys::SHOPPING_CART, r#"[{"dishId": 1, "quantity": 2}]"#)
        .unwrap();

    let client = client_for(&backend, Arc::new(MemoryStore::new()));
    let cart = CartStore::load(Arc::new(session.clone()), &client);
    cart.wait_hydrated().await;

    let lines = cart.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines.first().unwrap().dish.is_none());
    assert_eq!(cart.total_items(), 2);
    assert_eq!(cart.total_price(), Money::ZERO);
    assert_eq!(cart.checkout_items().len(), 1);
}

#[tokio::test]
async fn corrupt_stored_cart_starts_empty() {
    let backend = FakeBackend::new();
    let session = MemoryStore::new();
    session.set(keys::SHOPPING_CART, "{not json").unwrap();

    let client = client_for(&backend, Arc::new(MemoryStore::new()));
    let cart = CartStore::load(Arc::new(session), &client);
    cart.wait_hydrated().await;

    assert!(cart.is_empty());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn checkout_with_an_expired_token_refreshes_and_submits_once() {
    let backend = FakeBackend::new();
    menu(&backend);
    backend.route(
        Method::POST,
        "/api/orders/create/",
        StatusCode::CREATED,
        json!({
            "id": 41,
            "order_number": "TS-0041",
            "status": "pending",
            "original_price": "5970.50",
            "discount_amount": "0",
            "delivery_fee": "500",
            "total_price": "6470.50",
        }),
    );
    let pair = backend.issue_session();
    let client = client_for(&backend, Arc::new(stored_session(&pair)));
    backend.expire_access();

    let cart = CartStore::restore(Arc::new(MemoryStore::new()));
    let dishes = client.dishes().await.unwrap();
    for dish in dishes.iter().filter(|d| d.is_orderable()) {
        assert!(cart.add(dish, None, 1));
    }
    assert!(cart.increment(DishId::new(1), None));

    let details = CheckoutDetails {
        delivery_name: "Anna Kovács".to_string(),
        delivery_phone: "+36301234567".to_string(),
        delivery_address: "Fő utca 1".to_string(),
        delivery_city: "Budapest".to_string(),
        delivery_zip: "1011".to_string(),
        coupon_code: Some("  ".to_string()),
        ..CheckoutDetails::default()
    };
    let order = client
        .create_order(&OrderCreateRequest::new(details, cart.checkout_items()))
        .await
        .unwrap();
    cart.clear();

    assert_eq!(order.order_number, "TS-0041");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_price, money("6470.50"));
    assert!(cart.is_empty());
    assert_eq!(backend.refresh_count(), 1);

    let submitted = backend.calls_to("/api/orders/create/");
    assert_eq!(submitted.len(), 2);
    let body = submitted.last().unwrap().body.clone().unwrap();
    assert_eq!(
        body["items"],
        json!([
            {"dish": 1, "dish_variant": null, "quantity": 2},
            {"dish": 2, "dish_variant": null, "quantity": 1},
        ])
    );
    assert!(body.get("coupon_code").is_none());
    assert_eq!(body["delivery_type"], "delivery");
    assert_eq!(body["payment_method"], "cash_on_delivery");
}
