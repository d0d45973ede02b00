mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;

use common::{response_json, TestApp};

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn create_meal_with_tags() {
    let app = TestApp::new().await;

    let payload = json!({
        "name": "Vegetarian Pizza",
        "price": "9.00",
        "tags": ["Vegetarian", "Vegetarian", " DairyFree "]
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/meals", Some(payload))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let response_data = response_json(response).await;
    let data = &response_data["data"];
    assert_eq!(data["name"], "Vegetarian Pizza");
    assert_eq!(data["price"], "9.00");
    assert_eq!(data["is_active"], true);

    // Tags deduplicated and trimmed
    let tags = data["tags"].as_array().cloned().unwrap_or_default();
    assert_eq!(tags.len(), 2);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn create_meal_rejects_non_positive_price() {
    let app = TestApp::new().await;

    let payload = json!({
        "name": "Free Lunch",
        "price": "0.00"
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/meals", Some(payload))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn list_meals_filters_by_tag() {
    let app = TestApp::new().await;

    app.seed_meal("Vegetarian Pizza", dec!(9.00), &["Vegetarian"]).await;
    app.seed_meal("Beef Tacos", dec!(12.99), &["DairyFree"]).await;
    app.seed_meal("Lentil Curry", dec!(8.50), &["Vegan", "Vegetarian"]).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/meals?tag=Vegetarian", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response_data = response_json(response).await;
    let data = &response_data["data"];
    assert_eq!(data["total"], 2);
    let items = data["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item["tags"]
        .as_array()
        .map(|tags| tags.iter().any(|t| t == "Vegetarian"))
        .unwrap_or(false)));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn tag_catalogue_lists_distinct_names() {
    let app = TestApp::new().await;

    app.seed_meal("Vegetarian Pizza", dec!(9.00), &["Vegetarian"]).await;
    app.seed_meal("Lentil Curry", dec!(8.50), &["Vegan", "Vegetarian"]).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/meals/tags", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response_data = response_json(response).await;
    let mut tags: Vec<String> = response_data["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|t| t.as_str().map(str::to_string))
        .collect();
    tags.sort();
    assert_eq!(tags, vec!["Vegan".to_string(), "Vegetarian".to_string()]);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn update_meal_replaces_tags() {
    let app = TestApp::new().await;

    let meal_id = app
        .seed_meal("Grilled Salmon", dec!(10.75), &["GlutenFree"])
        .await;

    let payload = json!({
        "price": "11.25",
        "tags": ["DairyFree"]
    });

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/meals/{}", meal_id),
            Some(payload),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response_data = response_json(response).await;
    let data = &response_data["data"];
    assert_eq!(data["price"], "11.25");
    assert_eq!(
        data["tags"].as_array().cloned().unwrap_or_default(),
        vec![serde_json::Value::String("DairyFree".to_string())]
    );
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn status_toggle_hides_meal_from_active_listing() {
    let app = TestApp::new().await;

    let meal_id = app.seed_meal("Beef Tacos", dec!(12.99), &[]).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/meals/{}/status", meal_id),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/meals?active=true", None)
        .await;
    let response_data = response_json(response).await;
    assert_eq!(response_data["data"]["total"], 0);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/meals?active=false", None)
        .await;
    let response_data = response_json(response).await;
    assert_eq!(response_data["data"]["total"], 1);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn delete_meal_removes_it_and_its_tags() {
    let app = TestApp::new().await;

    let meal_id = app
        .seed_meal("Spaghetti Carbonara", dec!(10.75), &["GlutenFree"])
        .await;

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/meals/{}", meal_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/meals/{}", meal_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/meals/tags", None)
        .await;
    let response_data = response_json(response).await;
    assert!(response_data["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .is_empty());
}
