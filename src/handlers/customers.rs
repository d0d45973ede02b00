use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::consts as perm;
use crate::entities::customer;
use crate::services::customers::{CreateCustomerInput, UpdateCustomerInput};
use crate::{auth::AuthUser, errors::ServiceError, ApiResponse, AppState, PaginatedResponse};

// Customer DTOs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCustomerRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Customer name must be between 1 and 100 characters"
    ))]
    pub name: String,

    pub parent_contact: Option<String>,
    pub class: Option<String>,
    /// Opening balance; defaults to zero
    pub balance: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateCustomerRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Customer name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,

    pub parent_contact: Option<String>,
    pub class: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TopUpRequest {
    /// Strictly positive amount added to the stored balance
    pub amount: Decimal,
}

/// Query parameters accepted by the customer listing
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Case-insensitive name search
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

fn map_customer(model: &customer::Model) -> CustomerResponse {
    CustomerResponse {
        id: model.id.to_string(),
        name: model.name.clone(),
        parent_contact: model.parent_contact.clone(),
        class: model.class.clone(),
        balance: model.balance,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// List customers with pagination and search
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    summary = "List customers",
    description = "Get a paginated list of customers with optional name search",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("search" = Option<String>, Query, description = "Case-insensitive name search"),
    ),
    responses(
        (status = 200, description = "Customers retrieved successfully", body = ApiResponse<PaginatedResponse<CustomerResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<CustomerResponse>>>, ServiceError> {
    if !auth_user.has_permission(perm::CUSTOMERS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read customers".to_string(),
        ));
    }

    let svc = state.services.customers.clone();
    let result = svc
        .list_customers(query.search.as_deref(), query.page, query.limit)
        .await?;
    let total_pages = result.total.div_ceil(query.limit.max(1));
    let items: Vec<CustomerResponse> = result.customers.iter().map(map_customer).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total: result.total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Get customer by ID
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    summary = "Get customer",
    description = "Get a customer by its ID",
    params(
        ("id" = String, Path, description = "Customer ID"),
    ),
    responses(
        (status = 200, description = "Customer retrieved successfully", body = ApiResponse<CustomerResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<CustomerResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::CUSTOMERS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read customers".to_string(),
        ));
    }

    match state.services.customers.get_customer(id).await? {
        Some(model) => Ok(Json(ApiResponse::success(map_customer(&model)))),
        None => Err(ServiceError::NotFound(format!(
            "Customer with ID {} not found",
            id
        ))),
    }
}

/// Create a new customer
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    summary = "Create customer",
    description = "Create a customer account",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created successfully", body = ApiResponse<CustomerResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_customer(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CustomerResponse>>), ServiceError> {
    if !auth_user.has_permission(perm::CUSTOMERS_UPDATE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to manage customers".to_string(),
        ));
    }

    request.validate()?;

    let model = state
        .services
        .customers
        .create_customer(CreateCustomerInput {
            name: request.name,
            parent_contact: request.parent_contact,
            class: request.class,
            balance: request.balance,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_customer(&model))),
    ))
}

/// Update a customer
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    summary = "Update customer",
    description = "Update customer contact fields; balances change via top-up and orders only",
    params(
        ("id" = String, Path, description = "Customer ID"),
    ),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Customer updated successfully", body = ApiResponse<CustomerResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<Json<ApiResponse<CustomerResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::CUSTOMERS_UPDATE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to manage customers".to_string(),
        ));
    }

    request.validate()?;

    let model = state
        .services
        .customers
        .update_customer(
            id,
            UpdateCustomerInput {
                name: request.name,
                parent_contact: request.parent_contact,
                class: request.class,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(map_customer(&model))))
}

/// Top up a customer balance
#[utoipa::path(
    post,
    path = "/api/v1/customers/{id}/topup",
    summary = "Top up balance",
    description = "Add a strictly positive amount to the customer's stored balance",
    params(
        ("id" = String, Path, description = "Customer ID"),
    ),
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Balance topped up successfully", body = ApiResponse<CustomerResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn top_up_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<TopUpRequest>,
) -> Result<Json<ApiResponse<CustomerResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::CUSTOMERS_TOPUP) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to top up balances".to_string(),
        ));
    }

    let model = state
        .services
        .customers
        .top_up_balance(id, request.amount)
        .await?;

    Ok(Json(ApiResponse::success(map_customer(&model))))
}

/// Delete a customer
#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    summary = "Delete customer",
    description = "Remove a customer account",
    params(
        ("id" = String, Path, description = "Customer ID"),
    ),
    responses(
        (status = 204, description = "Customer deleted successfully"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    if !auth_user.has_permission(perm::CUSTOMERS_UPDATE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to manage customers".to_string(),
        ));
    }

    state.services.customers.delete_customer(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
