//! Canteen API Library
//!
//! This crate provides the core functionality for the Canteen API
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// API routes with permission gating per group
pub fn api_v1_routes() -> Router<AppState> {
    let meals_read = Router::new()
        .route("/meals", get(handlers::meals::list_meals))
        .route("/meals/tags", get(handlers::meals::list_meal_tags))
        .route("/meals/:id", get(handlers::meals::get_meal))
        .with_permission(perm::MEALS_READ);

    let meals_manage = Router::new()
        .route("/meals", axum::routing::post(handlers::meals::create_meal))
        .route(
            "/meals/:id",
            axum::routing::put(handlers::meals::update_meal),
        )
        .route(
            "/meals/:id/status",
            axum::routing::put(handlers::meals::update_meal_status),
        )
        .route(
            "/meals/:id",
            axum::routing::delete(handlers::meals::delete_meal),
        )
        .with_permission(perm::MEALS_MANAGE);

    let customers_read = Router::new()
        .route("/customers", get(handlers::customers::list_customers))
        .route("/customers/:id", get(handlers::customers::get_customer))
        .with_permission(perm::CUSTOMERS_READ);

    let customers_write = Router::new()
        .route(
            "/customers",
            axum::routing::post(handlers::customers::create_customer),
        )
        .route(
            "/customers/:id",
            axum::routing::put(handlers::customers::update_customer),
        )
        .route(
            "/customers/:id",
            axum::routing::delete(handlers::customers::delete_customer),
        )
        .with_permission(perm::CUSTOMERS_UPDATE);

    let customers_topup = Router::new()
        .route(
            "/customers/:id/topup",
            axum::routing::post(handlers::customers::top_up_balance),
        )
        .with_permission(perm::CUSTOMERS_TOPUP);

    let orders_read = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/items", get(handlers::orders::get_order_items))
        .with_permission(perm::ORDERS_READ);

    let orders_create = Router::new()
        .route(
            "/orders",
            axum::routing::post(handlers::orders::create_order),
        )
        .with_permission(perm::ORDERS_CREATE);

    let orders_delete = Router::new()
        .route(
            "/orders/:id",
            axum::routing::delete(handlers::orders::delete_order),
        )
        .with_permission(perm::ORDERS_DELETE);

    // User administration: handlers enforce admin/self rules themselves
    let users = Router::new()
        .route("/users", axum::routing::post(handlers::users::create_user))
        .route("/users", get(handlers::users::list_users))
        .route("/users/profile", get(handlers::users::get_current_user))
        .route("/users/:id", get(handlers::users::get_user))
        .route("/users/:id", axum::routing::put(handlers::users::update_user))
        .route(
            "/users/:id",
            axum::routing::delete(handlers::users::delete_user),
        )
        .route(
            "/users/:id/change-password",
            axum::routing::post(handlers::users::change_password),
        )
        .with_auth();

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Catalogue API (auth + permissions)
        .merge(meals_read)
        .merge(meals_manage)
        // Customers API (auth + permissions)
        .merge(customers_read)
        .merge(customers_write)
        .merge(customers_topup)
        // Orders API (auth + permissions)
        .merge(orders_read)
        .merge(orders_create)
        .merge(orders_delete)
        // User administration (auth; per-handler authorization)
        .merge(users)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "canteen-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    // Check database connectivity
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }
}
