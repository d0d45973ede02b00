use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Canteen API",
        version = "1.0.0",
        description = r#"
# Canteen Point-of-Sale API

Backend for a cafeteria point-of-sale and back office: the meal catalogue,
customer balance accounts, order placement, and user administration.

## Authentication

All API endpoints require authentication using JWT tokens obtained from
`POST /auth/login`. Include the token in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

The API uses a consistent error response format with appropriate HTTP status
codes:

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient balance: balance 10.00 does not cover order total 21.50",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints support pagination with the following query parameters:
- `page`: Page number (default: 1)
- `limit`: Items per page (default: 20, max: 100)
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Meals", description = "Meal catalogue endpoints"),
        (name = "Customers", description = "Customer account endpoints"),
        (name = "Orders", description = "Order placement and browsing endpoints"),
        (name = "users", description = "User administration endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Meals
        crate::handlers::meals::list_meals,
        crate::handlers::meals::list_meal_tags,
        crate::handlers::meals::get_meal,
        crate::handlers::meals::create_meal,
        crate::handlers::meals::update_meal,
        crate::handlers::meals::update_meal_status,
        crate::handlers::meals::delete_meal,

        // Customers
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::top_up_balance,
        crate::handlers::customers::delete_customer,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_items,
        crate::handlers::orders::delete_order,

        // Users
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::users::change_password,
        crate::handlers::users::get_current_user,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Meal types
            crate::handlers::meals::MealResponse,
            crate::handlers::meals::CreateMealRequest,
            crate::handlers::meals::UpdateMealRequest,
            crate::handlers::meals::UpdateMealStatusRequest,

            // Customer types
            crate::handlers::customers::CustomerResponse,
            crate::handlers::customers::CreateCustomerRequest,
            crate::handlers::customers::UpdateCustomerRequest,
            crate::handlers::customers::TopUpRequest,

            // Order types
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::orders::CreateOrderItem,
            crate::handlers::orders::OrderItem,
            crate::entities::order::PaymentMethod,

            // User types
            crate::handlers::users::UserResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::ChangePasswordRequest,
            crate::entities::user::UserRole,
            crate::entities::user::UserStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_core_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Canteen API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/meals"));
        assert!(json.contains("/api/v1/customers"));
    }
}
