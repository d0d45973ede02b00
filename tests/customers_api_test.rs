mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;

use common::{response_json, TestApp};

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn create_customer_defaults_balance_to_zero() {
    let app = TestApp::new().await;

    let payload = json!({
        "name": "Emily Davis",
        "parent_contact": "emily.davis@example.com",
        "class": "Grade 5"
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/customers", Some(payload))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let response_data = response_json(response).await;
    let data = &response_data["data"];
    assert_eq!(data["name"], "Emily Davis");
    assert_eq!(data["balance"], "0");
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn search_matches_names_case_insensitively() {
    let app = TestApp::new().await;

    app.seed_customer("Emily Davis", dec!(30.00)).await;
    app.seed_customer("Michael Smith", dec!(15.75)).await;
    app.seed_customer("emily wong", dec!(5.00)).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/customers?search=EMILY", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response_data = response_json(response).await;
    let data = &response_data["data"];
    assert_eq!(data["total"], 2);
    let items = data["items"].as_array().cloned().unwrap_or_default();
    assert!(items.iter().all(|item| item["name"]
        .as_str()
        .map(|name| name.to_lowercase().contains("emily"))
        .unwrap_or(false)));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn top_up_increments_balance() {
    let app = TestApp::new().await;

    let customer_id = app.seed_customer("Sophia Brown", dec!(10.00)).await;

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/customers/{}/topup", customer_id),
            Some(json!({ "amount": "15.50" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response_data = response_json(response).await;
    assert_eq!(response_data["data"]["balance"], "25.50");
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn top_up_rejects_non_positive_amounts() {
    let app = TestApp::new().await;

    let customer_id = app.seed_customer("Alice Johnson", dec!(25.50)).await;

    for amount in ["0.00", "-3.00"] {
        let response = app
            .request_authenticated(
                Method::POST,
                &format!("/api/v1/customers/{}/topup", customer_id),
                Some(json!({ "amount": amount })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // Balance untouched by the rejected attempts
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/customers/{}", customer_id),
            None,
        )
        .await;
    let response_data = response_json(response).await;
    assert_eq!(response_data["data"]["balance"], "25.50");
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn update_changes_contact_fields_only() {
    let app = TestApp::new().await;

    let customer_id = app.seed_customer("James Wilson", dec!(40.20)).await;

    let payload = json!({
        "parent_contact": "guardian@example.com",
        "class": "Grade 3"
    });

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/customers/{}", customer_id),
            Some(payload),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response_data = response_json(response).await;
    let data = &response_data["data"];
    assert_eq!(data["parent_contact"], "guardian@example.com");
    assert_eq!(data["class"], "Grade 3");
    assert_eq!(data["balance"], "40.20");
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn delete_removes_customer() {
    let app = TestApp::new().await;

    let customer_id = app.seed_customer("Noah Miller", dec!(5.00)).await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/customers/{}", customer_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/customers/{}", customer_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
