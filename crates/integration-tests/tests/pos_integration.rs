//! Catalog sync and order relay against a fake POS system.
//!
//! Run with: cargo test -p miniapp-integration-tests

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use miniapp_core::{Catalog, OrderStatus, Price};
use miniapp_integration_tests::{
    FakePos, ORG_ID, TestContext, default_init_data, unreachable_addr,
};
use miniapp_storefront::services::RelayOutcome;

async fn next_outcome(outcomes: &mut broadcast::Receiver<RelayOutcome>) -> RelayOutcome {
    tokio::time::timeout(Duration::from_secs(10), outcomes.recv())
        .await
        .expect("No relay outcome within 10s")
        .expect("Relay outcome channel closed")
}

fn product_prices(catalog: &Catalog) -> Vec<(&str, String)> {
    catalog
        .products
        .iter()
        .map(|p| (p.id.as_str(), p.price.to_string()))
        .collect()
}

// ============================================================================
// Catalog sync
// ============================================================================

#[tokio::test]
async fn test_sync_merges_nomenclature_and_price_list() {
    let pos = FakePos::new();
    let ctx = TestContext::with_pos(pos.spawn().await).await;

    let (synced, catalog) = ctx.state.catalog().sync_or_fallback().await;
    assert!(synced);

    // Deleted and unpriced products are dropped; menu flags are ignored.
    assert_eq!(
        product_prices(&catalog),
        [
            ("margherita", "499".to_string()),
            ("pepperoni", "590".to_string()),
            ("lemonade", "149.5".to_string()),
        ]
    );
    assert!(catalog.products.iter().all(|p| p.price.is_positive()));

    let categories: Vec<(&str, &str)> = catalog
        .categories
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();
    assert_eq!(categories, [("g-pizza", "Пицца"), ("g-drinks", "Напитки")]);

    assert_eq!(ctx.store.catalog().await, catalog);
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let pos = FakePos::new();
    let ctx = TestContext::with_pos(pos.spawn().await).await;

    let first = ctx.state.catalog().sync().await.unwrap();
    let second = ctx.state.catalog().sync().await.unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_access_token_is_cached_between_calls() {
    let pos = FakePos::new();
    let ctx = TestContext::with_pos(pos.spawn().await).await;

    ctx.state.catalog().sync().await.unwrap();
    ctx.state.catalog().sync().await.unwrap();
    assert_eq!(pos.token_requests(), 1);
}

#[tokio::test]
async fn test_named_price_list_policy() {
    let pos = FakePos::new();
    let addr = pos.spawn().await;
    let ctx = TestContext::build(Some(addr), &[("POS_PRICE_LIST", "ДОСТАВКА")]).await;

    let catalog = ctx.state.catalog().sync().await.unwrap();
    let prices = product_prices(&catalog);
    assert!(prices.contains(&("pepperoni", "650".to_string())));
    assert!(prices.contains(&("lemonade", "160".to_string())));
}

#[tokio::test]
async fn test_no_price_lists_prices_from_size_prices() {
    let pos = FakePos::new();
    pos.set_pricelists(json!({"pricelists": []}));
    let ctx = TestContext::with_pos(pos.spawn().await).await;

    let catalog = ctx.state.catalog().sync().await.unwrap();
    assert_eq!(product_prices(&catalog), [("margherita", "499".to_string())]);
}

#[tokio::test]
async fn test_missing_price_list_items_prices_from_size_prices() {
    let pos = FakePos::new();
    pos.set_pricelists(json!({"pricelists": [{"id": "pl-gone", "name": "Архив"}]}));
    let ctx = TestContext::with_pos(pos.spawn().await).await;

    // The live nomenclature still wins over the static fallback.
    let (synced, catalog) = ctx.state.catalog().sync_or_fallback().await;
    assert!(synced);
    assert_eq!(product_prices(&catalog), [("margherita", "499".to_string())]);
    assert_eq!(ctx.store.catalog().await, catalog);
}

#[tokio::test]
async fn test_price_list_outage_keeps_live_menu() {
    let pos = FakePos::new();
    pos.fail_pricelists(true);
    let ctx = TestContext::with_pos(pos.spawn().await).await;

    let (synced, catalog) = ctx.state.catalog().sync_or_fallback().await;
    assert!(synced);
    assert_eq!(product_prices(&catalog), [("margherita", "499".to_string())]);

    let (_, menu) = ctx.get("/api/menu").await;
    assert_eq!(menu["products"][0]["id"], "margherita");
}

#[tokio::test]
async fn test_failed_sync_leaves_store_untouched() {
    let pos = FakePos::new();
    let ctx = TestContext::with_pos(pos.spawn().await).await;
    let good = ctx.state.catalog().sync().await.unwrap();

    pos.set_nomenclature(json!({"products": "not a list"}));
    assert!(ctx.state.catalog().sync().await.is_none());
    assert_eq!(ctx.store.catalog().await, good);
}

#[tokio::test]
async fn test_unreachable_pos_serves_fallback() {
    let ctx = TestContext::with_pos(unreachable_addr().await).await;

    let (synced, catalog) = ctx.state.catalog().sync_or_fallback().await;
    assert!(!synced);
    assert_eq!(catalog, Catalog::fallback());

    let (_, body) = ctx.post("/api/bootstrap", json!({})).await;
    let fallback = serde_json::to_value(Catalog::fallback()).unwrap();
    assert_eq!(body["products"], fallback["products"]);
    assert_eq!(body["categories"], fallback["categories"]);
}

#[tokio::test]
async fn test_menu_sync_endpoint() {
    let pos = FakePos::new();
    let ctx = TestContext::with_pos(pos.spawn().await).await;

    let (status, body) = ctx.post("/api/debug/menu-sync", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"synced": true, "categories": 2, "products": 3}));

    let (_, menu) = ctx.get("/api/menu").await;
    assert_eq!(menu["products"][0]["name"], "Маргарита");
    assert_eq!(menu["products"][0]["categoryName"], "Пицца");
}

#[tokio::test]
async fn test_checkout_prices_against_synced_menu() {
    let pos = FakePos::new();
    let ctx = TestContext::with_pos(pos.spawn().await).await;
    ctx.state.catalog().sync().await.unwrap();

    let (_, body) = ctx
        .post(
            "/api/orders",
            json!({
                "initData": default_init_data(),
                "items": [{"id": "lemonade", "qty": 2}, {"id": "margherita", "qty": 1}],
                "delivery": {"method": "courier", "zone": "zone2"}
            }),
        )
        .await;
    // 149.5 * 2 + 499 + 200
    assert_eq!(body["ok"], true);
    assert_eq!(body["total"].as_f64(), Some(998.0));

    // Fallback products are not on a synced menu.
    let (_, body) = ctx
        .post(
            "/api/orders",
            json!({"initData": default_init_data(), "items": [{"id": "p1"}]}),
        )
        .await;
    assert_eq!(body["error"], "Товар не найден: p1");
}

#[tokio::test]
async fn test_pos_raw_summary() {
    let pos = FakePos::new();
    let ctx = TestContext::with_pos(pos.spawn().await).await;

    let (status, body) = ctx.get("/api/debug/pos-raw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groupsCount"], 2);
    assert_eq!(body["categoriesCount"], 0);
    assert_eq!(body["productsCount"], 5);
    assert_eq!(
        body["products"][3],
        json!({"id": "retired", "name": "Снято с меню", "parentGroup": "g-pizza", "isDeleted": true})
    );
}

#[tokio::test]
async fn test_pos_raw_offline_reports_error() {
    let ctx = TestContext::offline().await;
    let (status, body) = ctx.get("/api/debug/pos-raw").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_string());
}

// ============================================================================
// Order relay
// ============================================================================

#[tokio::test]
async fn test_relay_success_flags_order() {
    let pos = FakePos::new();
    let ctx = TestContext::with_pos(pos.spawn().await).await;
    let mut outcomes = ctx.state.relay().subscribe();

    let (_, body) = ctx
        .post(
            "/api/orders",
            json!({
                "initData": default_init_data(),
                "items": [{"id": "p1", "qty": 2}, {"id": "p3", "qty": "1"}],
                "delivery": {"method": "courier", "zone": "zone1"}
            }),
        )
        .await;
    assert_eq!(body["ok"], true);

    let outcome = next_outcome(&mut outcomes).await;
    assert!(matches!(
        outcome,
        RelayOutcome::Sent { ref pos_order_id, .. } if pos_order_id.as_deref() == Some("pos-1")
    ));

    let order = ctx.store.recent_orders(1).await.pop().unwrap();
    assert!(order.pos_sent);
    assert_eq!(order.status, OrderStatus::Sent);
    assert_eq!(order.total, Price::from_units(950));

    let deliveries = pos.deliveries();
    let delivery: &Value = deliveries.first().unwrap();
    assert_eq!(delivery["organizationId"], ORG_ID);
    assert_eq!(delivery["order"]["phone"], "+79990001122");
    assert_eq!(delivery["order"]["customer"]["name"], "Vlad Kolesnikov");
    assert_eq!(delivery["order"]["customer"]["id"], "279058397");
    assert_eq!(
        delivery["order"]["items"],
        json!([
            {"productId": "p1", "amount": 2},
            {"productId": "p3", "amount": 1}
        ])
    );
}

#[tokio::test]
async fn test_relay_failure_leaves_order_intact() {
    let pos = FakePos::new();
    pos.fail_deliveries(true);
    let ctx = TestContext::with_pos(pos.spawn().await).await;
    let mut outcomes = ctx.state.relay().subscribe();

    let (status, body) = ctx
        .post(
            "/api/orders",
            json!({"initData": default_init_data(), "items": [{"id": "p2"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let outcome = next_outcome(&mut outcomes).await;
    assert!(matches!(outcome, RelayOutcome::Failed { .. }));

    let order = ctx.store.recent_orders(1).await.pop().unwrap();
    assert!(!order.pos_sent);
    assert_eq!(order.status, OrderStatus::Created);
    assert!(pos.deliveries().is_empty());

    let (_, failures) = ctx.get("/api/debug/relay-failures").await;
    let failures = failures["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["outcome"], "failed");
    assert_eq!(failures[0]["order_id"], json!(order.id.as_str()));
}

#[tokio::test]
async fn test_unreachable_pos_does_not_block_checkout() {
    let ctx = TestContext::with_pos(unreachable_addr().await).await;
    let mut outcomes = ctx.state.relay().subscribe();

    let (_, body) = ctx
        .post(
            "/api/orders",
            json!({"initData": default_init_data(), "items": [{"id": "p1"}]}),
        )
        .await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["total"].as_f64(), Some(350.0));

    // Without a token the relay gives up before calling the POS system.
    let outcome = next_outcome(&mut outcomes).await;
    assert!(matches!(outcome, RelayOutcome::Skipped { .. }));
    assert!(!ctx.store.recent_orders(1).await.pop().unwrap().pos_sent);
}
