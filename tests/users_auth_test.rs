mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{response_json, TestApp};

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn login_returns_token_pair_for_seeded_admin() {
    let app = TestApp::new().await;

    let payload = json!({
        "email": "admin@canteen.test",
        "password": "admin-password-123"
    });

    let response = app
        .request_anonymous(Method::POST, "/auth/login", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn login_rejects_wrong_password() {
    let app = TestApp::new().await;

    let payload = json!({
        "email": "admin@canteen.test",
        "password": "not-the-password"
    });

    let response = app
        .request_anonymous(Method::POST, "/auth/login", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn refresh_rotates_the_token_pair() {
    let app = TestApp::new().await;

    let login = app
        .request_anonymous(
            Method::POST,
            "/auth/login",
            Some(json!({
                "email": "admin@canteen.test",
                "password": "admin-password-123"
            })),
        )
        .await;
    let tokens = response_json(login).await;
    let refresh_token = tokens["refresh_token"].as_str().expect("refresh token");

    let response = app
        .request_anonymous(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let rotated = response_json(response).await;
    assert!(rotated["access_token"].as_str().is_some());

    // The presented refresh token was invalidated by the rotation
    let replay = app
        .request_anonymous(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn admin_creates_and_lists_users() {
    let app = TestApp::new().await;

    let payload = json!({
        "name": "Jane Smith",
        "email": "jane@canteen.test",
        "password": "staff-password-123",
        "role": "staff"
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/users", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = response_json(response).await;
    assert_eq!(created["email"], "jane@canteen.test");
    assert_eq!(created["role"], "staff");

    let response = app
        .request_authenticated(Method::GET, "/api/v1/users", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = response_json(response).await;
    assert_eq!(listed["total"], 2);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn duplicate_email_conflicts() {
    let app = TestApp::new().await;

    let payload = json!({
        "name": "Duplicate Admin",
        "email": "admin@canteen.test",
        "password": "another-password-123"
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/users", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn staff_cannot_manage_users() {
    let app = TestApp::new().await;

    // Seed a staff account and sign in as them
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Will Davis",
                "email": "will@canteen.test",
                "password": "staff-password-123",
                "role": "staff"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let login = app
        .request_anonymous(
            Method::POST,
            "/auth/login",
            Some(json!({
                "email": "will@canteen.test",
                "password": "staff-password-123"
            })),
        )
        .await;
    let tokens = response_json(login).await;
    let staff_token = tokens["access_token"].as_str().expect("staff token");

    let response = app
        .request_with_token(Method::GET, "/api/v1/users", None, Some(staff_token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_with_token(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Sneaky",
                "email": "sneaky@canteen.test",
                "password": "sneaky-password-123"
            })),
            Some(staff_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn staff_can_place_orders_but_not_delete_them() {
    let app = TestApp::new().await;

    // Staff account via admin
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Jane Smith",
                "email": "jane@canteen.test",
                "password": "staff-password-123",
                "role": "staff"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let login = app
        .request_anonymous(
            Method::POST,
            "/auth/login",
            Some(json!({
                "email": "jane@canteen.test",
                "password": "staff-password-123"
            })),
        )
        .await;
    let tokens = response_json(login).await;
    let staff_token = tokens["access_token"].as_str().expect("staff token");

    let meal_id = app
        .seed_meal("Vegetarian Pizza", rust_decimal_macros::dec!(9.00), &[])
        .await;
    let customer_id = app
        .seed_customer("Emily Davis", rust_decimal_macros::dec!(30.00))
        .await;

    let response = app
        .request_with_token(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id.to_string(),
                "payment_method": "balance",
                "items": [ { "meal_id": meal_id.to_string(), "quantity": 1 } ]
            })),
            Some(staff_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let placed = response_json(response).await;
    let order_id = placed["data"]["id"].as_str().expect("order id").to_string();

    let response = app
        .request_with_token(
            Method::DELETE,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(staff_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn change_password_requires_current_password() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Jane Smith",
                "email": "jane@canteen.test",
                "password": "staff-password-123",
                "role": "staff"
            })),
        )
        .await;
    let created = response_json(response).await;
    let user_id = created["id"].as_str().expect("user id").to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/users/{}/change-password", user_id),
            Some(json!({
                "current_password": "wrong-password",
                "new_password": "replacement-pass-456"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/users/{}/change-password", user_id),
            Some(json!({
                "current_password": "staff-password-123",
                "new_password": "replacement-pass-456"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // New password works for login
    let login = app
        .request_anonymous(
            Method::POST,
            "/auth/login",
            Some(json!({
                "email": "jane@canteen.test",
                "password": "replacement-pass-456"
            })),
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
}
