mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Datelike;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{test_state, token_for, MemoryStore};
use ortis_api::app;
use ortis_core::identity::{ROLE_ADMIN, ROLE_MED, ROLE_REGISTRY, ROLE_WAREHOUSE, ROLE_WORKSHOP};
use ortis_order::{OrderStatus, TransitionPolicy};
use ortis_warehouse::StockStatus;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn case_draft(last: &str, first: &str, middle: &str, group: &str) -> Value {
    json!({
        "pin": "12345678901234",
        "last_name": last,
        "first_name": first,
        "middle_name": middle,
        "sex": "M",
        "birth_date": "2000-06-15",
        "address_registration": "г. Бишкек, ул. Ленина 1",
        "disability_group": group
    })
}

fn order_draft(case_id: &str) -> Value {
    json!({
        "case_id": case_id,
        "order_type": "PROSTHESIS",
        "workshop": "PROSTHESIS",
        "amount": "120.50",
        "item_name": "Протез голени",
        "spec": {"side": "left"}
    })
}

/// Create a case and an order through the API, returning their ids
async fn seed_case_and_order(app: &Router) -> (String, String) {
    let registry = token_for(&[ROLE_REGISTRY]);
    let med = token_for(&[ROLE_MED]);

    let (status, case) = send(
        app,
        "POST",
        "/v1/cases",
        Some(&registry),
        Some(case_draft("Иванов", "Иван", "Иванович", "II")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let case_id = case["id"].as_str().unwrap().to_string();

    let (status, order) = send(
        app,
        "POST",
        "/v1/orders",
        Some(&med),
        Some(order_draft(&case_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = order["id"].as_str().unwrap().to_string();

    (case_id, order_id)
}

/// Create an invoice for the order and a warehouse entry under it
async fn seed_entry(app: &Router, order_id: &str) -> (String, String) {
    let workshop = token_for(&[ROLE_WORKSHOP]);
    let warehouse = token_for(&[ROLE_WAREHOUSE]);

    let (status, invoice) = send(
        app,
        "POST",
        "/v1/invoices",
        Some(&workshop),
        Some(json!({
            "order_id": order_id,
            "date": "2026-08-07",
            "sender_workshop": "PROSTHESIS"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let (status, entry) = send(
        app,
        "POST",
        "/v1/warehouse/entries",
        Some(&warehouse),
        Some(json!({
            "invoice_id": invoice_id,
            "order_id": order_id,
            "product_name": "Протез голени",
            "serial_number": "SN-0042"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let entry_id = entry["id"].as_str().unwrap().to_string();

    (invoice_id, entry_id)
}

fn permissive() -> (Router, MemoryStore) {
    let (state, store) = test_state(TransitionPolicy::Permissive);
    (app(state), store)
}

fn guarded() -> (Router, MemoryStore) {
    let (state, store) = test_state(TransitionPolicy::Guarded);
    (app(state), store)
}

// ============================================================================
// Authentication & authorization
// ============================================================================

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let (app, _) = permissive();

    let (status, _) = send(&app, "GET", "/v1/cases", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/v1/cases", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_matrix_with_admin_bypass() {
    let (app, _) = permissive();

    // Warehouse staff cannot touch the case registry
    let warehouse = token_for(&[ROLE_WAREHOUSE]);
    let (status, _) = send(&app, "GET", "/v1/cases", Some(&warehouse), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Registry staff can
    let registry = token_for(&[ROLE_REGISTRY]);
    let (status, _) = send(&app, "GET", "/v1/cases", Some(&registry), None).await;
    assert_eq!(status, StatusCode::OK);

    // ADMIN bypasses the required-role set everywhere
    let admin = token_for(&[ROLE_ADMIN]);
    let (status, _) = send(&app, "GET", "/v1/cases", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/v1/warehouse/entries", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Case registry
// ============================================================================

#[tokio::test]
async fn test_case_numbering_and_derived_fields() {
    let (app, _) = permissive();
    let registry = token_for(&[ROLE_REGISTRY]);
    let year = chrono::Utc::now().year();

    let (status, first) = send(
        &app,
        "POST",
        "/v1/cases",
        Some(&registry),
        Some(case_draft("Иванов", "Иван", "Иванович", "II")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["number"], format!("{year}-0001"));
    assert_eq!(first["full_name"], "Иванов Иван Иванович");
    assert_eq!(first["pin"], "12345678901234");

    let (status, second) = send(
        &app,
        "POST",
        "/v1/cases",
        Some(&registry),
        Some(case_draft("Петров", "Пётр", "", "NONE")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["number"], format!("{year}-0002"));
    assert_eq!(second["full_name"], "Петров Пётр");

    // Free-text search over names
    let (status, found) = send(
        &app,
        "GET",
        "/v1/cases?search=%D0%98%D0%B2%D0%B0%D0%BD%D0%BE%D0%B2",
        Some(&registry),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, stats) = send(&app, "GET", "/v1/cases/statistics", Some(&registry), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["with_disability"], 1);
    assert_eq!(stats["without_disability"], 1);
}

#[tokio::test]
async fn test_missing_required_fields_rejected() {
    let (app, _) = permissive();
    let registry = token_for(&[ROLE_REGISTRY]);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/cases",
        Some(&registry),
        Some(case_draft("", "Иван", "", "NONE")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("last_name"));
}

#[tokio::test]
async fn test_malformed_existing_number_falls_back_to_one() {
    let (app, store) = permissive();
    let registry = token_for(&[ROLE_REGISTRY]);
    let year = chrono::Utc::now().year();

    store.seed_case_with_number(&format!("{year}-XXXX"));

    let (status, case) = send(
        &app,
        "POST",
        "/v1/cases",
        Some(&registry),
        Some(case_draft("Иванов", "Иван", "", "NONE")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(case["number"], format!("{year}-0001"));
}

// ============================================================================
// Order ledger
// ============================================================================

#[tokio::test]
async fn test_order_creation_and_status_operation() {
    let (app, _) = permissive();
    let med = token_for(&[ROLE_MED]);
    let year = chrono::Utc::now().year();

    let (_, order_id) = seed_case_and_order(&app).await;

    let (status, order) = send(
        &app,
        "GET",
        &format!("/v1/orders/{order_id}"),
        Some(&med),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["order_number"], format!("ORD-{year}-0001"));
    assert_eq!(order["status"], "DRAFT");
    assert_eq!(order["patient_name"], "Иванов Иван Иванович");
    assert_eq!(order["patient_pin"], "12345678901234");
    assert_eq!(order["amount"], "120.50");

    let (status, order) = send(
        &app,
        "POST",
        &format!("/v1/orders/{order_id}/status"),
        Some(&med),
        Some(json!({"event": "START_WORK"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "IN_WORK");
}

#[tokio::test]
async fn test_order_for_unknown_case_rejected() {
    let (app, _) = permissive();
    let med = token_for(&[ROLE_MED]);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/orders",
        Some(&med),
        Some(order_draft(&Uuid::new_v4().to_string())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Invoice ledger
// ============================================================================

#[tokio::test]
async fn test_invoice_creation_transfers_order() {
    let (app, store) = permissive();
    let workshop = token_for(&[ROLE_WORKSHOP]);
    let year = chrono::Utc::now().year();

    let (_, order_id) = seed_case_and_order(&app).await;
    let order_uuid = Uuid::parse_str(&order_id).unwrap();
    let before = store.order_snapshot(order_uuid).unwrap();
    assert_eq!(before.status, OrderStatus::Draft);

    // The order is still a draft; the permissive policy transfers it
    // anyway, exactly like the historical behavior.
    let (status, invoice) = send(
        &app,
        "POST",
        "/v1/invoices",
        Some(&workshop),
        Some(json!({
            "order_id": order_id,
            "date": "2026-08-07",
            "sender_workshop": "PROSTHESIS",
            "comment": "Передача на склад"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["invoice_number"], format!("INV-{year}-0001"));
    assert_eq!(invoice["order_number"], format!("ORD-{year}-0001"));
    assert_eq!(invoice["receiver"], "WAREHOUSE");
    assert_eq!(invoice["status"], "ON_ISSUE");
    assert_eq!(invoice["patient_name"], "Иванов Иван Иванович");

    // Status moved, everything else untouched
    let after = store.order_snapshot(order_uuid).unwrap();
    assert_eq!(after.status, OrderStatus::TransferredToWarehouse);
    assert_eq!(after.amount, before.amount);
    assert_eq!(after.item_name, before.item_name);
    assert_eq!(after.order_number, before.order_number);
    assert_eq!(after.spec, before.spec);
}

#[tokio::test]
async fn test_guarded_policy_refuses_premature_transfer() {
    let (app, store) = guarded();
    let med = token_for(&[ROLE_MED]);
    let workshop = token_for(&[ROLE_WORKSHOP]);

    let (_, order_id) = seed_case_and_order(&app).await;
    let order_uuid = Uuid::parse_str(&order_id).unwrap();

    let invoice_draft = json!({
        "order_id": order_id,
        "date": "2026-08-07",
        "sender_workshop": "PROSTHESIS"
    });

    // DRAFT order cannot be invoiced under the guarded policy
    let (status, _) = send(
        &app,
        "POST",
        "/v1/invoices",
        Some(&workshop),
        Some(invoice_draft.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(store.order_status(order_uuid), Some(OrderStatus::Draft));

    let (status, invoices) = send(&app, "GET", "/v1/invoices", Some(&workshop), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(invoices.as_array().unwrap().is_empty());

    // Walk the legal chain, then the transfer succeeds
    for event in ["START_WORK", "SCHEDULE_FITTING", "MARK_READY"] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/orders/{order_id}/status"),
            Some(&med),
            Some(json!({"event": event})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(
        &app,
        "POST",
        "/v1/invoices",
        Some(&workshop),
        Some(invoice_draft),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        store.order_status(order_uuid),
        Some(OrderStatus::TransferredToWarehouse)
    );
}

#[tokio::test]
async fn test_guarded_policy_refuses_illegal_status_event() {
    let (app, _) = guarded();
    let med = token_for(&[ROLE_MED]);

    let (_, order_id) = seed_case_and_order(&app).await;

    // A draft cannot jump straight to issued
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/orders/{order_id}/status"),
        Some(&med),
        Some(json!({"event": "ISSUE"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// Warehouse ledger
// ============================================================================

#[tokio::test]
async fn test_issue_marks_entry_and_order_issued() {
    let (app, store) = permissive();
    let warehouse = token_for(&[ROLE_WAREHOUSE]);

    let (_, order_id) = seed_case_and_order(&app).await;
    let (_, entry_id) = seed_entry(&app, &order_id).await;
    let order_uuid = Uuid::parse_str(&order_id).unwrap();
    let entry_uuid = Uuid::parse_str(&entry_id).unwrap();

    assert_eq!(store.entry_status(entry_uuid), Some(StockStatus::OnStock));

    let (status, issue) = send(
        &app,
        "POST",
        "/v1/warehouse/issues",
        Some(&warehouse),
        Some(json!({
            "warehouse_entry_id": entry_id,
            "receiver_name": "Иванов Иван Иванович",
            "document_ref": "ID 1234567"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issue["product_name"], "Протез голени");
    assert_eq!(issue["receiver_name"], "Иванов Иван Иванович");

    assert_eq!(store.entry_status(entry_uuid), Some(StockStatus::Issued));
    assert_eq!(store.order_status(order_uuid), Some(OrderStatus::Issued));
}

#[tokio::test]
async fn test_guarded_policy_prevents_double_issue() {
    let (app, store) = guarded();
    let med = token_for(&[ROLE_MED]);
    let warehouse = token_for(&[ROLE_WAREHOUSE]);

    let (_, order_id) = seed_case_and_order(&app).await;
    for event in ["START_WORK", "SCHEDULE_FITTING", "MARK_READY"] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/orders/{order_id}/status"),
            Some(&med),
            Some(json!({"event": event})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, entry_id) = seed_entry(&app, &order_id).await;
    let entry_uuid = Uuid::parse_str(&entry_id).unwrap();

    let issue_draft = json!({
        "warehouse_entry_id": entry_id,
        "receiver_name": "Иванов Иван Иванович"
    });

    let (status, _) = send(
        &app,
        "POST",
        "/v1/warehouse/issues",
        Some(&warehouse),
        Some(issue_draft.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(store.entry_status(entry_uuid), Some(StockStatus::Issued));

    // The item is already gone
    let (status, _) = send(
        &app,
        "POST",
        "/v1/warehouse/issues",
        Some(&warehouse),
        Some(issue_draft),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// Users & login
// ============================================================================

#[tokio::test]
async fn test_login_flow() {
    let (app, _) = permissive();
    let admin = token_for(&[ROLE_ADMIN]);

    let user_draft = json!({
        "username": "registry1",
        "password": "correct-horse-battery",
        "full_name": "Асанова Айгуль",
        "roles": ["REGISTRY"]
    });

    let (status, user) = send(&app, "POST", "/v1/users", Some(&admin), Some(user_draft.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "registry1");
    assert!(user.get("password_digest").is_none());

    // Duplicate usernames are refused
    let (status, _) = send(&app, "POST", "/v1/users", Some(&admin), Some(user_draft)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Wrong password fails closed
    let (status, _) = send(
        &app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"username": "registry1", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = send(
        &app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"username": "registry1", "password": "correct-horse-battery"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();

    // The issued token carries the REGISTRY capability
    let (status, _) = send(&app, "GET", "/v1/cases", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, me) = send(&app, "GET", "/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "registry1");
    assert_eq!(me["roles"], json!(["REGISTRY"]));
}

// ============================================================================
// Dictionaries
// ============================================================================

#[tokio::test]
async fn test_dictionary_crud_and_permissions() {
    let (app, _) = permissive();
    let med = token_for(&[ROLE_MED]);
    let admin = token_for(&[ROLE_ADMIN]);

    let workshop_entry = json!({
        "code": "PROSTHESIS",
        "name": "Протезный цех"
    });

    // Writes are ADMIN-only
    let (status, _) = send(
        &app,
        "POST",
        "/v1/dictionaries/workshop",
        Some(&med),
        Some(workshop_entry.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, entry) = send(
        &app,
        "POST",
        "/v1/dictionaries/workshop",
        Some(&admin),
        Some(workshop_entry),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let entry_id = entry["id"].as_str().unwrap().to_string();

    // Reads are open to any authenticated user
    let (status, entries) = send(&app, "GET", "/v1/dictionaries/workshop", Some(&med), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["code"], "PROSTHESIS");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/v1/dictionaries/workshop/{entry_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Unknown dictionary kinds are 404
    let (status, _) = send(&app, "GET", "/v1/dictionaries/colors", Some(&med), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
