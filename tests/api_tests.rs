//! End-to-end tests of the HTTP API against the in-memory store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use expense_ledger::{
    app::{AppState, build_router},
    identity::JwtVerifier,
    store::MemoryLedgerStore,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn app() -> Router {
    build_router(AppState {
        store: Arc::new(MemoryLedgerStore::new()),
        verifier: Arc::new(JwtVerifier::with_secret(SECRET)),
        expose_error_details: false,
    })
}

fn token_for(user: &str) -> String {
    let claims = json!({
        "sub": user,
        "email": format!("{user}@example.com"),
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// A test client bound to one user.
struct Client {
    app: Router,
    token: String,
}

impl Client {
    fn new(app: &Router, user: &str) -> Self {
        Self {
            app: app.clone(),
            token: token_for(user),
        }
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.app, Method::GET, uri, Some(&self.token), None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.app, Method::POST, uri, Some(&self.token), Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.app, Method::PUT, uri, Some(&self.token), Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.app, Method::DELETE, uri, Some(&self.token), None).await
    }

    async fn balance(&self) -> (f64, f64) {
        let (_, body) = self.get("/api/balance").await;
        (
            body["cashAmount"].as_f64().unwrap(),
            body["onlineAmount"].as_f64().unwrap(),
        )
    }

    async fn add_expense(&self, amount: f64, kind: &str, category: &str, description: &str) -> String {
        let (status, body) = self
            .post(
                "/api/expense",
                json!({
                    "amount": amount,
                    "type": kind,
                    "category": category,
                    "description": description,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn missing_token_is_401_and_bad_token_is_403() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/expenses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "No token provided" }));

    let (status, body) = send(&app, Method::GET, "/api/expenses", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Invalid or expired token" }));
}

#[tokio::test]
async fn expired_token_is_403() {
    let app = app();
    let claims = json!({ "sub": "user-1", "exp": (Utc::now() - Duration::hours(1)).timestamp() });
    let expired = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let (status, _) = send(&app, Method::GET, "/api/balance", Some(&expired), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expense_amount_bounds() {
    let app = app();
    let client = Client::new(&app, "user-1");

    for amount in [10000.01, -0.01] {
        let (status, body) = client
            .post(
                "/api/expense",
                json!({ "amount": amount, "type": "cash", "category": "Food" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        assert!(body["error"].is_string());
    }

    let (status, body) = client
        .post(
            "/api/expense",
            json!({ "amount": "10000", "type": "cash", "category": "Food" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Expense added");
    assert_eq!(body["expense"]["amount"], json!(10000.0));
    assert_eq!(body["id"], body["expense"]["id"]);
}

#[tokio::test]
async fn balance_defaults_to_zero_and_requires_both_fields() {
    let app = app();
    let client = Client::new(&app, "user-1");

    assert_eq!(client.balance().await, (0.0, 0.0));

    let (status, body) = client
        .post("/api/balance", json!({ "cashAmount": 100 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Both cashAmount and onlineAmount are required");

    let (status, body) = client
        .post("/api/balance", json!({ "cashAmount": 0, "onlineAmount": "25.5" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Balance updated");
    assert_eq!(client.balance().await, (0.0, 25.5));
}

#[tokio::test]
async fn expenses_move_the_matching_balance_field() {
    let app = app();
    let client = Client::new(&app, "user-1");
    client
        .post("/api/balance", json!({ "cashAmount": 500, "onlineAmount": 500 }))
        .await;

    client.add_expense(12.5, "cash", "Food", "lunch").await;
    assert_eq!(client.balance().await, (487.5, 500.0));

    client.add_expense(40.0, "online", "Bills", "phone").await;
    assert_eq!(client.balance().await, (487.5, 460.0));
}

#[tokio::test]
async fn edit_moves_amount_between_fields() {
    let app = app();
    let client = Client::new(&app, "user-1");
    client
        .post("/api/balance", json!({ "cashAmount": 100, "onlineAmount": 100 }))
        .await;
    let id = client.add_expense(50.0, "cash", "Food", "dinner").await;
    let (cash_before, online_before) = client.balance().await;

    let (status, body) = client
        .put(
            &format!("/api/expense/{id}"),
            json!({ "amount": 30, "type": "online", "category": "Food", "description": "dinner" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Expense updated");
    assert_eq!(body["expense"]["type"], "online");
    let (cash_after, online_after) = client.balance().await;
    assert_eq!(cash_after - cash_before, 50.0);
    assert_eq!(online_after - online_before, -30.0);
}

#[tokio::test]
async fn delete_refunds_and_unknown_ids_are_404() {
    let app = app();
    let client = Client::new(&app, "user-1");
    client
        .post("/api/balance", json!({ "cashAmount": 100, "onlineAmount": 0 }))
        .await;
    let id = client.add_expense(20.0, "cash", "Food", "").await;
    assert_eq!(client.balance().await.0, 80.0);

    let (status, body) = client.delete(&format!("/api/expenses/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Expense deleted" }));
    assert_eq!(client.balance().await.0, 100.0);

    let (status, body) = client.delete(&format!("/api/expense/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Expense not found" }));

    let (status, _) = client
        .put("/api/expense/not-a-uuid", json!({ "amount": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn extreme_balances_are_rejected_without_partial_writes() {
    let app = app();
    let client = Client::new(&app, "user-1");

    let (status, _) = client
        .post(
            "/api/balance",
            json!({ "cashAmount": "-79228162514264337593543950335", "onlineAmount": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client
        .post(
            "/api/balance",
            json!({ "cashAmount": "-1000000000000000", "onlineAmount": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client
        .post("/api/expense", json!({ "amount": 5, "type": "cash", "category": "Food" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Balance would exceed the allowed range");

    let (_, expenses) = client.get("/api/expenses").await;
    assert_eq!(expenses, json!([]));
    assert_eq!(client.balance().await, (-1e15, 0.0));

    // The other field is unaffected
    client.add_expense(5.0, "online", "Food", "").await;
    assert_eq!(client.balance().await, (-1e15, -5.0));
}

#[tokio::test]
async fn users_cannot_touch_each_others_ledgers() {
    let app = app();
    let alice = Client::new(&app, "alice");
    let bob = Client::new(&app, "bob");
    let id = alice.add_expense(5.0, "cash", "Food", "bagel").await;

    let (_, listed) = bob.get("/api/expenses").await;
    assert_eq!(listed, json!([]));

    let (status, _) = bob
        .put(&format!("/api/expense/{id}"), json!({ "amount": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = bob.delete(&format!("/api/expense/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = alice.get("/api/expenses").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_filters_by_category_and_search() {
    let app = app();
    let client = Client::new(&app, "user-1");
    client.add_expense(3.0, "cash", "Food", "Morning COFFEE").await;
    client.add_expense(8.0, "cash", "Food", "sandwich").await;
    client.add_expense(4.0, "online", "Work", "coffee beans").await;

    let (status, body) = client
        .get("/api/expenses?category=Food&search=coffee")
        .await;

    assert_eq!(status, StatusCode::OK);
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["description"], "Morning COFFEE");

    // The singular mount lists too; blank filters are ignored
    let (_, all) = client.get("/api/expense?category=&search=").await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn budget_upsert_keeps_id() {
    let app = app();
    let client = Client::new(&app, "user-1");

    let (status, first) = client
        .post(
            "/api/budgets",
            json!({ "category": "Food", "limitAmount": 100, "period": "monthly" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Budget created");

    let (_, second) = client
        .post(
            "/api/budgets",
            json!({ "category": "Food", "limitAmount": 250, "period": "monthly" }),
        )
        .await;
    assert_eq!(second["message"], "Budget updated");
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["budget"]["limitAmount"], json!(250.0));

    let (_, budgets) = client.get("/api/budgets").await;
    assert_eq!(budgets.as_array().unwrap().len(), 1);

    let (status, _) = client
        .post(
            "/api/budgets",
            json!({ "category": "Food", "limitAmount": 100, "period": "yearly" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = first["id"].as_str().unwrap();
    let (status, body) = client.delete(&format!("/api/budgets/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Budget deleted" }));
    let (status, _) = client.delete("/api/budgets/whatever").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn budget_check_reports_warning_then_danger() {
    let app = app();
    let client = Client::new(&app, "user-1");
    client
        .post(
            "/api/budgets",
            json!({ "category": "Food", "limitAmount": 100, "period": "monthly" }),
        )
        .await;

    client.add_expense(90.0, "cash", "Food", "groceries").await;
    let (status, alerts) = client.get("/api/stats/budget/check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    assert_eq!(alerts[0]["severity"], "warning");
    assert_eq!(alerts[0]["percentage"], 90);
    assert_eq!(alerts[0]["period"], "monthly");

    client.add_expense(10.0, "cash", "Food", "snacks").await;
    let (_, alerts) = client.get("/api/stats/budget/check").await;
    assert_eq!(alerts[0]["severity"], "danger");
    assert_eq!(alerts[0]["percentage"], 100);
}

#[tokio::test]
async fn budget_check_survives_a_vanishingly_small_limit() {
    let app = app();
    let client = Client::new(&app, "user-1");
    let (status, _) = client
        .post(
            "/api/budgets",
            json!({
                "category": "Food",
                "limitAmount": "0.0000000000000000000000000001",
                "period": "monthly",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    client.add_expense(10000.0, "cash", "Food", "").await;

    let (status, alerts) = client.get("/api/stats/budget/check").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(alerts[0]["severity"], "danger");
    assert_eq!(alerts[0]["percentage"], json!(i64::MAX));
}

#[tokio::test]
async fn recurring_create_list_apply_delete() {
    let app = app();
    let client = Client::new(&app, "user-1");

    let (status, created) = client
        .post(
            "/api/recurring",
            json!({
                "amount": 9.99,
                "type": "online",
                "category": "Subscriptions",
                "description": "music",
                "frequency": "monthly"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["message"], "Recurring expense created");
    assert_eq!(created["recurring"]["active"], true);
    let next_due: chrono::DateTime<Utc> = created["recurring"]["nextDue"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(next_due > Utc::now() + Duration::days(27));

    // Nothing is due yet
    let (status, applied) = client.post("/api/recurring/apply", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        applied,
        json!({ "message": "Applied 0 recurring expense(s)", "applied": [] })
    );
    let (_, expenses) = client.get("/api/expenses").await;
    assert_eq!(expenses, json!([]));

    let (status, body) = client
        .post(
            "/api/recurring",
            json!({ "amount": 5, "type": "cash", "category": "Gym", "frequency": "hourly" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid frequency");

    let id = created["id"].as_str().unwrap();
    let (status, body) = client.delete(&format!("/api/recurring/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Recurring expense deleted" }));
    let (_, listed) = client.get("/api/recurring").await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn stats_shape_and_trends() {
    let app = app();
    let client = Client::new(&app, "user-1");
    let now = Utc::now();
    let early = now - Duration::days(20);
    let late = now - Duration::days(5);

    for (date, amount) in [(early, 4.0), (late, 6.0), (late, 1.5)] {
        let (status, _) = client
            .post(
                "/api/expense",
                json!({
                    "amount": amount,
                    "type": "cash",
                    "category": "Food",
                    "date": date.to_rfc3339(),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, stats) = client.get("/api/stats").await;

    assert_eq!(status, StatusCode::OK);
    for key in ["today", "week", "month", "byCategory", "byType", "trends", "prediction"] {
        assert!(stats.get(key).is_some(), "missing {key}");
    }
    assert_eq!(stats["byCategory"]["Food"], json!(11.5));
    assert_eq!(stats["byType"]["cash"], json!(11.5));

    let trends = stats["trends"].as_array().unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0]["date"], early.format("%Y-%m-%d").to_string());
    assert_eq!(trends[1]["date"], late.format("%Y-%m-%d").to_string());
    assert_eq!(trends[1]["amount"], json!(7.5));
}

#[tokio::test]
async fn profile_roundtrip() {
    let app = app();
    let client = Client::new(&app, "user-1");

    let (status, body) = client.get("/api/profile").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Profile not found" }));

    let (status, body) = client
        .post("/api/profile", json!({ "name": "Sam", "email": "sam@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated");

    let (_, profile) = client.get("/api/profile").await;
    assert_eq!(profile["name"], "Sam");
    assert_eq!(profile["email"], "sam@example.com");
    assert!(profile["updatedAt"].is_string());

    // Without an e-mail in the body, the token's claim is used
    let other = Client::new(&app, "user-2");
    let (_, body) = other.post("/api/profile", json!({ "name": "Ri" })).await;
    assert_eq!(body["profile"]["email"], "user-2@example.com");
}

#[tokio::test]
async fn malformed_json_is_a_400_with_error_body() {
    let app = app();
    let token = token_for("user-1");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/expense")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}
