use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::entities::user::{self, UserRole, UserStatus};
use crate::services::users::{CreateUserInput, UpdateUserInput};
use crate::{
    auth::AuthUser,
    errors::{ApiError, ServiceError},
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Jane Smith",
    "email": "jane.smith@example.com",
    "password": "SecurePass123",
    "role": "staff"
}))]
pub struct CreateUserRequest {
    /// User's full name
    #[schema(example = "Jane Smith")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// User's email address (must be unique)
    #[schema(example = "jane.smith@example.com")]
    #[validate(email)]
    pub email: String,

    /// User's password (minimum 8 characters)
    #[schema(example = "SecurePass123")]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// User role (admin or staff); defaults to staff
    #[schema(example = "staff")]
    pub role: Option<UserRole>,

    /// Profile picture URL
    pub picture_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    /// Updated user name
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    /// Updated email address
    #[validate(email)]
    pub email: Option<String>,

    /// Updated role
    pub role: Option<UserRole>,

    /// Updated account status
    pub status: Option<UserStatus>,

    /// Updated profile picture URL
    pub picture_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    /// Current password for verification
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    /// New password (minimum 8 characters)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

fn map_user(model: &user::Model) -> UserResponse {
    UserResponse {
        id: model.id.to_string(),
        name: model.name.clone(),
        email: model.email.clone(),
        role: model.role,
        status: model.status,
        email_verified: model.email_verified,
        picture_url: model.picture_url.clone(),
        created_at: model.created_at.to_rfc3339(),
        updated_at: model.updated_at.map(|at| at.to_rfc3339()),
    }
}

// Handler functions

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    current_user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    if !current_user.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "Only admin users can create new users".to_string(),
        )));
    }

    let created = state
        .services
        .users
        .create_user(CreateUserInput {
            email: payload.email,
            name: payload.name,
            password: payload.password,
            role: payload.role.unwrap_or(UserRole::Staff),
            picture_url: payload.picture_url,
        })
        .await?;

    info!("User created: {}", created.id);

    Ok(created_response(map_user(&created)))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/:id",
    params(("id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "User returned", body = UserResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    current_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // Users can only view their own profile unless they're admin
    if current_user.user_id != user_id.to_string() && !current_user.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "You can only view your own profile".to_string(),
        )));
    }

    let found = state.services.users.get_user(user_id).await?;
    match found {
        Some(model) => Ok(success_response(map_user(&model))),
        None => Err(ApiError::NotFound(format!(
            "User with ID {} not found",
            user_id
        ))),
    }
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/v1/users/:id",
    params(("id" = String, Path, description = "User ID (UUID)")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    // Only admins may change roles or status; users may edit their own profile
    let editing_self = current_user.user_id == user_id.to_string();
    if !editing_self && !current_user.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "You can only update your own profile".to_string(),
        )));
    }
    if (payload.role.is_some() || payload.status.is_some()) && !current_user.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "Only admin users can change roles or status".to_string(),
        )));
    }

    let updated = state
        .services
        .users
        .update_user(
            user_id,
            UpdateUserInput {
                name: payload.name,
                email: payload.email,
                role: payload.role,
                status: payload.status,
                picture_url: payload.picture_url,
            },
        )
        .await?;

    info!("User updated: {}", user_id);

    Ok(success_response(map_user(&updated)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/:id",
    params(("id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 204, description = "User deleted",
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !current_user.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "Only admin users can delete users".to_string(),
        )));
    }

    if current_user.user_id == user_id.to_string() {
        return Err(ApiError::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }

    state.services.users.delete_user(user_id).await?;

    info!("User deleted: {}", user_id);

    Ok(no_content_response())
}

/// List all users with pagination
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users listed",
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    current_user: AuthUser,
    Query(pagination): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if !current_user.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "Only admin users can list all users".to_string(),
        )));
    }

    let result = state
        .services
        .users
        .list_users(pagination.page, pagination.limit)
        .await?;

    let users: Vec<UserResponse> = result.users.iter().map(map_user).collect();

    Ok(success_response(serde_json::json!({
        "users": users,
        "total": result.total,
        "page": result.page,
        "per_page": result.per_page
    })))
}

/// Change user password
#[utoipa::path(
    post,
    path = "/api/v1/users/:id/change-password",
    params(("id" = String, Path, description = "User ID (UUID)")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed",
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    // Either the user is changing their own password or they are an admin
    if current_user.user_id != user_id.to_string() && !current_user.is_admin() {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "You can only update your own profile".to_string(),
        )));
    }

    state
        .services
        .users
        .change_password(user_id, &payload.current_password, &payload.new_password)
        .await?;

    info!("Password changed for user: {}", user_id);

    Ok(success_response(serde_json::json!({
        "message": "Password changed successfully"
    })))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    responses(
        (status = 200, description = "Current user", body = UserResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    current_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = Uuid::parse_str(&current_user.user_id)
        .map_err(|_| ApiError::ServiceError(ServiceError::Unauthorized("Invalid subject".into())))?;

    let found = state.services.users.get_user(user_id).await?;
    match found {
        Some(model) => Ok(success_response(map_user(&model))),
        None => Err(ApiError::NotFound("Current user no longer exists".into())),
    }
}
