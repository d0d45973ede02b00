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
use crate::entities::{meal, meal_tag};
use crate::services::meals::{CreateMealInput, MealListFilter, UpdateMealInput};
use crate::{auth::AuthUser, errors::ServiceError, ApiResponse, AppState, PaginatedResponse};

// Meal DTOs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MealResponse {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateMealRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Meal name must be between 1 and 100 characters"
    ))]
    pub name: String,

    pub price: Decimal,

    pub photo_url: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateMealRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Meal name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,

    pub price: Option<Decimal>,
    pub photo_url: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the meal's tags when present
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateMealStatusRequest {
    pub is_active: bool,
}

/// Query parameters accepted by the meal listing
#[derive(Debug, Deserialize, ToSchema)]
pub struct MealListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Only meals carrying this tag
    pub tag: Option<String>,
    /// Only meals with the given active flag
    pub active: Option<bool>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

fn map_meal(model: &meal::Model, tags: &[meal_tag::Model]) -> MealResponse {
    MealResponse {
        id: model.id.to_string(),
        name: model.name.clone(),
        price: model.price,
        photo_url: model.photo_url.clone(),
        is_active: model.is_active,
        tags: tags.iter().map(|tag| tag.name.clone()).collect(),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// List meals with pagination and filtering
#[utoipa::path(
    get,
    path = "/api/v1/meals",
    summary = "List meals",
    description = "Get a paginated list of meals with tags embedded",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("tag" = Option<String>, Query, description = "Only meals carrying this tag"),
        ("active" = Option<bool>, Query, description = "Only meals with the given active flag"),
    ),
    responses(
        (status = 200, description = "Meals retrieved successfully", body = ApiResponse<PaginatedResponse<MealResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_meals(
    State(state): State<AppState>,
    Query(query): Query<MealListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<MealResponse>>>, ServiceError> {
    if !auth_user.has_permission(perm::MEALS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read the catalogue".to_string(),
        ));
    }

    let filter = MealListFilter {
        tag: query.tag.clone(),
        active: query.active,
    };

    let svc = state.services.meals.clone();
    let result = svc.list_meals(filter, query.page, query.limit).await?;
    let total_pages = result.total.div_ceil(query.limit.max(1));
    let items: Vec<MealResponse> = result
        .meals
        .iter()
        .map(|(model, tags)| map_meal(model, tags))
        .collect();
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total: result.total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// List distinct tag names
#[utoipa::path(
    get,
    path = "/api/v1/meals/tags",
    summary = "List meal tags",
    description = "Get the distinct tag names across the catalogue",
    responses(
        (status = 200, description = "Tags retrieved successfully", body = ApiResponse<Vec<String>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_meal_tags(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<String>>>, ServiceError> {
    if !auth_user.has_permission(perm::MEALS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read the catalogue".to_string(),
        ));
    }

    let tags = state.services.meals.list_tag_names().await?;
    Ok(Json(ApiResponse::success(tags)))
}

/// Get meal by ID
#[utoipa::path(
    get,
    path = "/api/v1/meals/{id}",
    summary = "Get meal",
    description = "Get a meal by its ID, tags included",
    params(
        ("id" = String, Path, description = "Meal ID"),
    ),
    responses(
        (status = 200, description = "Meal retrieved successfully", body = ApiResponse<MealResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<MealResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::MEALS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read the catalogue".to_string(),
        ));
    }

    match state.services.meals.get_meal(id).await? {
        Some((model, tags)) => Ok(Json(ApiResponse::success(map_meal(&model, &tags)))),
        None => Err(ServiceError::NotFound(format!(
            "Meal with ID {} not found",
            id
        ))),
    }
}

/// Create a new meal
#[utoipa::path(
    post,
    path = "/api/v1/meals",
    summary = "Create meal",
    description = "Add a meal to the catalogue with its tags",
    request_body = CreateMealRequest,
    responses(
        (status = 201, description = "Meal created successfully", body = ApiResponse<MealResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_meal(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateMealRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MealResponse>>), ServiceError> {
    if !auth_user.has_permission(perm::MEALS_MANAGE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to manage the catalogue".to_string(),
        ));
    }

    request.validate()?;

    let (model, tags) = state
        .services
        .meals
        .create_meal(CreateMealInput {
            name: request.name,
            price: request.price,
            photo_url: request.photo_url,
            tags: request.tags,
            is_active: request.is_active,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_meal(&model, &tags))),
    ))
}

/// Update a meal
#[utoipa::path(
    put,
    path = "/api/v1/meals/{id}",
    summary = "Update meal",
    description = "Update catalogue fields; a supplied tag list replaces the old tags",
    params(
        ("id" = String, Path, description = "Meal ID"),
    ),
    request_body = UpdateMealRequest,
    responses(
        (status = 200, description = "Meal updated successfully", body = ApiResponse<MealResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateMealRequest>,
) -> Result<Json<ApiResponse<MealResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::MEALS_MANAGE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to manage the catalogue".to_string(),
        ));
    }

    request.validate()?;

    let (model, tags) = state
        .services
        .meals
        .update_meal(
            id,
            UpdateMealInput {
                name: request.name,
                price: request.price,
                photo_url: request.photo_url,
                is_active: request.is_active,
                tags: request.tags,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(map_meal(&model, &tags))))
}

/// Toggle meal availability
#[utoipa::path(
    put,
    path = "/api/v1/meals/{id}/status",
    summary = "Update meal status",
    description = "Toggle whether a meal can be ordered",
    params(
        ("id" = String, Path, description = "Meal ID"),
    ),
    request_body = UpdateMealStatusRequest,
    responses(
        (status = 200, description = "Meal status updated successfully", body = ApiResponse<MealResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_meal_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateMealStatusRequest>,
) -> Result<Json<ApiResponse<MealResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::MEALS_MANAGE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to manage the catalogue".to_string(),
        ));
    }

    let svc = state.services.meals.clone();
    let model = svc.set_meal_status(id, request.is_active).await?;
    let tags = svc
        .get_meal(model.id)
        .await?
        .map(|(_, tags)| tags)
        .unwrap_or_default();

    Ok(Json(ApiResponse::success(map_meal(&model, &tags))))
}

/// Delete a meal
#[utoipa::path(
    delete,
    path = "/api/v1/meals/{id}",
    summary = "Delete meal",
    description = "Remove a meal and its tags from the catalogue",
    params(
        ("id" = String, Path, description = "Meal ID"),
    ),
    responses(
        (status = 204, description = "Meal deleted successfully"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    if !auth_user.has_permission(perm::MEALS_MANAGE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to manage the catalogue".to_string(),
        ));
    }

    state.services.meals.delete_meal(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
