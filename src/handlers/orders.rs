use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::consts as perm;
use crate::entities::order::PaymentMethod;
use crate::entities::order_item;
use crate::services::orders::{
    self as svc_orders, OrderListFilter, PlaceOrderItem, PlaceOrderRequest,
};
use crate::{auth::AuthUser, errors::ServiceError, ApiResponse, AppState, PaginatedResponse};

// Order DTOs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderItem {
    pub id: String,
    pub meal_id: String,
    pub meal_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,

    pub payment_method: PaymentMethod,

    #[validate(length(min = 1, message = "An order requires at least one item"))]
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderItem {
    pub meal_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    /// Optional cross-check against the catalogue price
    pub unit_price: Option<Decimal>,
}

/// Query parameters accepted by the order listing
#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Case-insensitive customer-name search
    pub search: Option<String>,
    pub customer_id: Option<Uuid>,
    /// Calendar day (YYYY-MM-DD) the order was placed on
    pub date: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

fn map_order_item_model(model: &order_item::Model) -> OrderItem {
    OrderItem {
        id: model.id.to_string(),
        meal_id: model.meal_id.to_string(),
        meal_name: model.meal_name.clone(),
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
    }
}

fn map_service_order(
    order: &svc_orders::OrderResponse,
    items: Option<&[order_item::Model]>,
) -> OrderResponse {
    let mapped_items = items
        .map(|models| models.iter().map(map_order_item_model).collect())
        .unwrap_or_else(Vec::new);

    OrderResponse {
        id: order.id.to_string(),
        customer_id: order.customer_id.to_string(),
        customer_name: order.customer_name.clone(),
        placed_at: order.placed_at,
        total_amount: order.total_amount,
        payment_method: order.payment_method,
        items: mapped_items,
    }
}

fn collect_validation_errors(validation_errors: &validator::ValidationErrors) -> Vec<String> {
    validation_errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field = field.clone();
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect()
}

/// List orders with pagination and filtering
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Get a paginated list of orders, newest first, with optional filtering",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("search" = Option<String>, Query, description = "Case-insensitive customer-name search"),
        ("customer_id" = Option<String>, Query, description = "Filter by customer ID"),
        ("date" = Option<String>, Query, description = "Filter by placement day (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<PaginatedResponse<OrderResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request parameters", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    if !auth_user.has_permission(perm::ORDERS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read orders".to_string(),
        ));
    }

    let placed_on = query
        .date
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ServiceError::ValidationError("date must use the YYYY-MM-DD format".to_string())
            })
        })
        .transpose()?;

    let filter = OrderListFilter {
        customer_id: query.customer_id,
        customer_search: query.search.clone(),
        placed_on,
    };

    let svc = state.services.orders.clone();
    let result = svc.list_orders(filter, query.page, query.limit).await?;
    let total_pages = result.total.div_ceil(query.limit.max(1));
    let items: Vec<OrderResponse> = result
        .orders
        .iter()
        .map(|order| map_service_order(order, None))
        .collect();
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total: result.total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Place a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    description = "Place a new order; a balance payment debits the customer atomically",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed successfully", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient balance", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    if !auth_user.has_permission(perm::ORDERS_CREATE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to create orders".to_string(),
        ));
    }

    if let Err(validation_errors) = request.validate() {
        let errors = collect_validation_errors(&validation_errors);
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::validation_errors(errors)),
        ));
    }

    let items: Vec<PlaceOrderItem> = request
        .items
        .iter()
        .map(|item| PlaceOrderItem {
            meal_id: item.meal_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();

    let (order_model, item_models) = state
        .services
        .orders
        .place_order(PlaceOrderRequest {
            customer_id: request.customer_id,
            payment_method: request.payment_method,
            items,
        })
        .await?;

    // Re-fetch through the service so the response carries the customer name
    let order = state
        .services
        .orders
        .get_order(order_model.id)
        .await?
        .ok_or_else(|| ServiceError::InternalError("Placed order vanished".to_string()))?;
    let api_order = map_service_order(&order, Some(item_models.as_slice()));
    Ok((StatusCode::CREATED, Json(ApiResponse::success(api_order))))
}

/// Get order by ID
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Get an order by its ID, items included",
    params(
        ("id" = String, Path, description = "Order ID"),
    ),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::ORDERS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read orders".to_string(),
        ));
    }
    let svc = state.services.orders.clone();
    match svc.get_order(id).await? {
        Some(order) => {
            let items = svc.get_order_items(order.id).await?;
            let response = map_service_order(&order, Some(items.as_slice()));
            Ok(Json(ApiResponse::success(response)))
        }
        None => Err(ServiceError::NotFound(format!(
            "Order with ID {} not found",
            id
        ))),
    }
}

/// Get order items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/items",
    summary = "Get order items",
    description = "Get all items for a specific order",
    params(
        ("id" = String, Path, description = "Order ID"),
    ),
    responses(
        (status = 200, description = "Order items retrieved successfully", body = ApiResponse<Vec<OrderItem>>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderItem>>>, ServiceError> {
    if !auth_user.has_permission(perm::ORDERS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read orders".to_string(),
        ));
    }

    let svc = state.services.orders.clone();
    if svc.get_order(id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "Order with ID {} not found",
            id
        )));
    }
    let items = svc.get_order_items(id).await?;
    let mapped: Vec<OrderItem> = items.iter().map(map_order_item_model).collect();
    Ok(Json(ApiResponse::success(mapped)))
}

/// Delete order
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    summary = "Delete order",
    description = "Delete an order by its ID",
    params(
        ("id" = String, Path, description = "Order ID"),
    ),
    responses(
        (status = 204, description = "Order deleted successfully"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    if !auth_user.has_permission(perm::ORDERS_DELETE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to delete orders".to_string(),
        ));
    }

    state.services.orders.delete_order(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
