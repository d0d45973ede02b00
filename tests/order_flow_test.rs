mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

use canteen_api::entities::{
    customer::Entity as CustomerEntity,
    order::{self, Entity as OrderEntity},
    order_item::{Column as OrderItemColumn, Entity as OrderItemEntity},
};

use common::{response_json, TestApp};

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn balance_order_debits_customer_atomically() {
    let app = TestApp::new().await;

    let meal_id = app.seed_meal("Vegetarian Pizza", dec!(9.00), &["Vegetarian"]).await;
    let customer_id = app.seed_customer("Emily Davis", dec!(30.00)).await;

    let payload = json!({
        "customer_id": customer_id.to_string(),
        "payment_method": "balance",
        "items": [
            { "meal_id": meal_id.to_string(), "quantity": 2 }
        ]
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/orders", Some(payload))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let response_data = response_json(response).await;
    assert!(response_data["success"].as_bool().unwrap_or(false));
    let data = &response_data["data"];
    assert_eq!(data["customer_id"], customer_id.to_string());
    assert_eq!(data["total_amount"], "18.00");
    assert_eq!(data["payment_method"], "balance");
    assert_eq!(data["items"].as_array().map(|a| a.len()).unwrap_or(0), 1);

    // The debit happened in the same transaction as the insert
    let account = CustomerEntity::find_by_id(customer_id)
        .one(&*app.state.db)
        .await
        .expect("query customer")
        .expect("customer should exist");
    assert_eq!(account.balance, dec!(12.00));

    let saved_order = OrderEntity::find()
        .filter(order::Column::CustomerId.eq(customer_id))
        .one(&*app.state.db)
        .await
        .expect("query order")
        .expect("order should exist");
    assert_eq!(saved_order.total_amount, dec!(18.00));

    let items = OrderItemEntity::find()
        .filter(OrderItemColumn::OrderId.eq(saved_order.id))
        .all(&*app.state.db)
        .await
        .expect("query order items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_price, dec!(9.00));
    assert_eq!(items[0].meal_name, "Vegetarian Pizza");
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn insufficient_balance_rejects_and_persists_nothing() {
    let app = TestApp::new().await;

    let meal_id = app.seed_meal("Grilled Salmon", dec!(10.75), &[]).await;
    let customer_id = app.seed_customer("Sophia Brown", dec!(10.00)).await;

    let payload = json!({
        "customer_id": customer_id.to_string(),
        "payment_method": "balance",
        "items": [
            { "meal_id": meal_id.to_string(), "quantity": 2 }
        ]
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/orders", Some(payload))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Balance untouched, no order or items written
    let account = CustomerEntity::find_by_id(customer_id)
        .one(&*app.state.db)
        .await
        .expect("query customer")
        .expect("customer should exist");
    assert_eq!(account.balance, dec!(10.00));

    let orders = OrderEntity::find()
        .filter(order::Column::CustomerId.eq(customer_id))
        .all(&*app.state.db)
        .await
        .expect("query orders");
    assert!(orders.is_empty());
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn cash_order_leaves_balance_untouched() {
    let app = TestApp::new().await;

    let meal_id = app.seed_meal("Beef Tacos", dec!(12.99), &[]).await;
    let customer_id = app.seed_customer("Michael Smith", dec!(5.00)).await;

    let payload = json!({
        "customer_id": customer_id.to_string(),
        "payment_method": "cash",
        "items": [
            { "meal_id": meal_id.to_string(), "quantity": 3 }
        ]
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/orders", Some(payload))
        .await;

    // Cash covers totals above the stored balance
    assert_eq!(response.status(), StatusCode::CREATED);

    let account = CustomerEntity::find_by_id(customer_id)
        .one(&*app.state.db)
        .await
        .expect("query customer")
        .expect("customer should exist");
    assert_eq!(account.balance, dec!(5.00));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn tampered_unit_price_is_rejected() {
    let app = TestApp::new().await;

    let meal_id = app.seed_meal("Spaghetti Carbonara", dec!(10.75), &[]).await;
    let customer_id = app.seed_customer("Alice Johnson", dec!(40.20)).await;

    let payload = json!({
        "customer_id": customer_id.to_string(),
        "payment_method": "balance",
        "items": [
            { "meal_id": meal_id.to_string(), "quantity": 1, "unit_price": "0.01" }
        ]
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/orders", Some(payload))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn unknown_meal_is_rejected() {
    let app = TestApp::new().await;
    let customer_id = app.seed_customer("James Wilson", dec!(40.20)).await;

    let payload = json!({
        "customer_id": customer_id.to_string(),
        "payment_method": "cash",
        "items": [
            { "meal_id": Uuid::new_v4().to_string(), "quantity": 1 }
        ]
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/orders", Some(payload))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn inactive_meal_cannot_be_ordered() {
    let app = TestApp::new().await;

    let meal_id = app.seed_meal("Lentil Curry", dec!(8.50), &["Vegan"]).await;
    app.state
        .services
        .meals
        .set_meal_status(meal_id, false)
        .await
        .expect("deactivate meal");
    let customer_id = app.seed_customer("Noah Miller", dec!(20.00)).await;

    let payload = json!({
        "customer_id": customer_id.to_string(),
        "payment_method": "cash",
        "items": [
            { "meal_id": meal_id.to_string(), "quantity": 1 }
        ]
    });

    let response = app
        .request_authenticated(Method::POST, "/api/v1/orders", Some(payload))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn list_orders_filters_by_customer_search() {
    let app = TestApp::new().await;

    let meal_id = app.seed_meal("Vegetarian Pizza", dec!(9.00), &[]).await;
    let emily = app.seed_customer("Emily Davis", dec!(100.00)).await;
    let noah = app.seed_customer("Noah Miller", dec!(100.00)).await;

    for customer_id in [emily, noah, noah] {
        let payload = json!({
            "customer_id": customer_id.to_string(),
            "payment_method": "balance",
            "items": [ { "meal_id": meal_id.to_string(), "quantity": 1 } ]
        });
        let response = app
            .request_authenticated(Method::POST, "/api/v1/orders", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request_authenticated(Method::GET, "/api/v1/orders?search=noah&limit=10", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response_data = response_json(response).await;
    let data = &response_data["data"];
    assert_eq!(data["total"], 2);
    let items = data["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .all(|item| item["customer_name"].as_str() == Some("Noah Miller")));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn get_order_returns_items_with_snapshots() {
    let app = TestApp::new().await;

    let meal_id = app.seed_meal("Chicken Caesar Salad", dec!(10.75), &[]).await;
    let customer_id = app.seed_customer("Emily Davis", dec!(50.00)).await;

    let payload = json!({
        "customer_id": customer_id.to_string(),
        "payment_method": "balance",
        "items": [ { "meal_id": meal_id.to_string(), "quantity": 2 } ]
    });
    let response = app
        .request_authenticated(Method::POST, "/api/v1/orders", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    let order_id = created["data"]["id"].as_str().expect("order id").to_string();

    // Rename the meal after placement; the order must keep the snapshot
    app.state
        .services
        .meals
        .update_meal(
            meal_id,
            canteen_api::services::meals::UpdateMealInput {
                name: Some("Caesar Salad v2".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("rename meal");

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response_data = response_json(response).await;
    let items = response_data["data"]["items"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["meal_name"], "Chicken Caesar Salad");
    assert_eq!(items[0]["total_price"], "21.50");

    let total: Decimal = response_data["data"]["total_amount"]
        .as_str()
        .expect("total as string")
        .parse()
        .expect("decimal total");
    assert_eq!(total, dec!(21.50));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn anonymous_requests_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_anonymous(Method::GET, "/api/v1/orders", None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
