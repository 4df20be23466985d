mod common;

use axum::http::{Method, StatusCode};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde_json::json;

use konveksi_api::entities::{
    order::{self, Entity as OrderEntity},
    order_history::{self, Entity as HistoryEntity},
};

use common::{read_json, sample_order_payload, TestApp};

async fn create_order_with_status(app: &TestApp, number: &str, status: &str) {
    let mut payload = sample_order_payload(number);
    payload["current_status"] = json!(status);
    let response = app
        .request(Method::POST, "/api/v1/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn load_order(app: &TestApp, number: &str) -> order::Model {
    OrderEntity::find()
        .filter(order::Column::OrderNumber.eq(number))
        .one(&*app.state.db)
        .await
        .expect("query order")
        .expect("order should exist")
}

#[tokio::test]
async fn patch_to_completed_updates_status_and_appends_titled_history() {
    let app = TestApp::new().await;
    create_order_with_status(&app, "INV-202501-5001", "packing").await;

    let response = app
        .request(
            Method::PATCH,
            "/api/v1/orders/INV-202501-5001/status",
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body, json!({"ok": true}));

    let saved = load_order(&app, "INV-202501-5001").await;
    assert_eq!(saved.current_status, "completed");

    let newest = HistoryEntity::find()
        .filter(order_history::Column::OrderId.eq(saved.id))
        .order_by_desc(order_history::Column::CreatedAt)
        .one(&*app.state.db)
        .await
        .expect("query history")
        .expect("history entry exists");
    assert_eq!(newest.title, "Pesanan Selesai");
    assert_eq!(newest.status, "completed");
    assert_eq!(newest.description, "Status diubah ke: completed");
}

#[tokio::test]
async fn patch_accepts_status_case_insensitively_and_description_override() {
    let app = TestApp::new().await;
    create_order_with_status(&app, "INV-202501-5002", "pending").await;

    let response = app
        .request(
            Method::PATCH,
            "/api/v1/orders/INV-202501-5002/status",
            Some(json!({"status": "CONFIRMED", "description": "DP diterima via transfer"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let saved = load_order(&app, "INV-202501-5002").await;
    assert_eq!(saved.current_status, "confirmed");

    let newest = HistoryEntity::find()
        .filter(order_history::Column::OrderId.eq(saved.id))
        .order_by_desc(order_history::Column::CreatedAt)
        .one(&*app.state.db)
        .await
        .expect("query history")
        .expect("history entry exists");
    assert_eq!(newest.title, "DP Masuk / Pesanan Dikonfirmasi");
    assert_eq!(newest.description, "DP diterima via transfer");
}

#[tokio::test]
async fn patch_outside_allow_list_rejects_without_any_write() {
    let app = TestApp::new().await;
    create_order_with_status(&app, "INV-202501-5003", "packing").await;
    let history_before = HistoryEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count history");

    let response = app
        .request(
            Method::PATCH,
            "/api/v1/orders/INV-202501-5003/status",
            Some(json!({"status": "archived"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body, json!({"error": "Invalid status"}));

    let saved = load_order(&app, "INV-202501-5003").await;
    assert_eq!(saved.current_status, "packing");
    let history_after = HistoryEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count history");
    assert_eq!(history_before, history_after);

    // Empty status fails the same check.
    let response = app
        .request(
            Method::PATCH,
            "/api/v1/orders/INV-202501-5003/status",
            Some(json!({"status": ""})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_on_unknown_order_returns_not_found_without_writes() {
    let app = TestApp::new().await;
    let history_before = HistoryEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count history");

    let response = app
        .request(
            Method::PATCH,
            "/api/v1/orders/INV-TIDAK-ADA/status",
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body, json!({"error": "Order not found"}));

    let history_after = HistoryEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count history");
    assert_eq!(history_before, history_after);
}

#[tokio::test]
async fn pay_off_settles_the_balance_exactly_once() {
    let app = TestApp::new().await;
    create_order_with_status(&app, "INV-202501-6001", "production").await;

    let before = load_order(&app, "INV-202501-6001").await;
    assert_eq!(before.dp_amount, 50_000);
    assert_eq!(before.remaining_balance, 80_000);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/INV-202501-6001/pay-off",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["dp_amount"], 130_000);
    assert_eq!(body["data"]["remaining_balance"], 0);
    assert_eq!(body["data"]["is_settled"], true);

    let after = load_order(&app, "INV-202501-6001").await;
    assert_eq!(after.dp_amount, before.dp_amount + before.remaining_balance);
    assert_eq!(after.remaining_balance, 0);
    assert_eq!(after.grand_total, before.grand_total);

    let newest = HistoryEntity::find()
        .filter(order_history::Column::OrderId.eq(after.id))
        .order_by_desc(order_history::Column::CreatedAt)
        .one(&*app.state.db)
        .await
        .expect("query history")
        .expect("history entry exists");
    assert_eq!(newest.title, "Pelunasan Pembayaran");
    assert!(newest.description.contains("Rp 130.000"));

    // Settled orders are a no-op: nothing changes, nothing is logged.
    let history_count = HistoryEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count history");
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/INV-202501-6001/pay-off",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let unchanged = load_order(&app, "INV-202501-6001").await;
    assert_eq!(unchanged.dp_amount, 130_000);
    assert_eq!(
        HistoryEntity::find()
            .count(&*app.state.db)
            .await
            .expect("count history"),
        history_count
    );
}

#[tokio::test]
async fn tracking_masks_phone_and_returns_history_newest_first() {
    let app = TestApp::new().await;
    create_order_with_status(&app, "INV-202501-7001", "pending").await;

    // Walk the order forward so the trail has several entries.
    for status in ["confirmed", "cutting"] {
        let response = app
            .request(
                Method::PATCH,
                "/api/v1/orders/INV-202501-7001/status",
                Some(json!({ "status": status })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .request(Method::GET, "/api/v1/tracking/INV-202501-7001", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let data = &body["data"];

    assert_eq!(data["client_phone_masked"], "0812****789");
    assert_eq!(data["current_status"], "cutting");
    assert_eq!(data["status_label"], "Proses Potong");
    assert_eq!(data["progress_percent"], 50.0);
    assert_eq!(data["is_settled"], false);

    let history = data["history"].as_array().expect("history array");
    assert_eq!(history.len(), 3);
    assert_eq!(history.first().unwrap()["status"], "cutting");
    assert_eq!(history.last().unwrap()["title"], "Pesanan Dibuat");
}

#[tokio::test]
async fn tracking_falls_back_to_id_lookup_for_id_shaped_references() {
    let app = TestApp::new().await;
    create_order_with_status(&app, "INV-202501-7002", "pending").await;
    let saved = load_order(&app, "INV-202501-7002").await;

    let response = app
        .request(Method::GET, &format!("/api/v1/tracking/{}", saved.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["order_number"], "INV-202501-7002");

    let response = app
        .request(Method::GET, "/api/v1/tracking/INV-TIDAK-ADA", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body, json!({"error": "Pesanan tidak ditemukan."}));
}
