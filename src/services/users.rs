use crate::{
    auth::{hash_password, verify_password},
    db::DbPool,
    entities::user::{
        self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel, UserRole,
        UserStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: UserRole,
    pub picture_url: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub picture_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service managing back-office user accounts
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    /// Creates a new user service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a user account with an argon2-hashed password
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<UserModel, ServiceError> {
        if input.password.len() < 8 {
            return Err(ServiceError::ValidationError(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = chrono::Utc::now();
        let user_id = Uuid::new_v4();

        let duplicate = UserEntity::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A user with email {} already exists",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password)
            .map_err(|e| ServiceError::HashError(e.to_string()))?;

        let user_active_model = UserActiveModel {
            id: Set(user_id),
            email: Set(input.email),
            name: Set(input.name),
            password_hash: Set(password_hash),
            picture_url: Set(input.picture_url),
            email_verified: Set(false),
            status: Set(UserStatus::Verified),
            role: Set(input.role),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let user_model = user_active_model.insert(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to create user in database");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user_id, "User created successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::UserCreated(user_id)).await {
                warn!(error = %e, user_id = %user_id, "Failed to send user created event");
            }
        }

        Ok(user_model)
    }

    /// Retrieves a user by ID
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, ServiceError> {
        let db = &*self.db_pool;

        UserEntity::find_by_id(user_id).one(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to fetch user from database");
            ServiceError::DatabaseError(e)
        })
    }

    /// Lists users with pagination
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<UserListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = UserEntity::find()
            .order_by_asc(user::Column::Email)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count users");
            ServiceError::DatabaseError(e)
        })?;

        let users = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, page = page, per_page = per_page, "Failed to fetch users page");
                ServiceError::DatabaseError(e)
            })?;

        info!(
            total = total,
            page = page,
            per_page = per_page,
            returned_count = users.len(),
            "Users listed successfully"
        );

        Ok(UserListResponse {
            users,
            total,
            page,
            per_page,
        })
    }

    /// Updates user profile fields
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> Result<UserModel, ServiceError> {
        let db = &*self.db_pool;
        let now = chrono::Utc::now();

        let existing = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                warn!(user_id = %user_id, "User not found for update");
                ServiceError::NotFound(format!("User with ID {} not found", user_id))
            })?;

        if let Some(new_email) = &input.email {
            if new_email != &existing.email {
                let duplicate = UserEntity::find()
                    .filter(user::Column::Email.eq(new_email.clone()))
                    .one(db)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                if duplicate.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "A user with email {} already exists",
                        new_email
                    )));
                }
            }
        }

        let mut user_active_model: UserActiveModel = existing.into();
        if let Some(name) = input.name {
            user_active_model.name = Set(name);
        }
        if let Some(email) = input.email {
            user_active_model.email = Set(email);
        }
        if let Some(role) = input.role {
            user_active_model.role = Set(role);
        }
        if let Some(status) = input.status {
            user_active_model.status = Set(status);
        }
        if let Some(picture_url) = input.picture_url {
            user_active_model.picture_url = Set(Some(picture_url));
        }
        user_active_model.updated_at = Set(Some(now));

        let updated = user_active_model.update(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to update user");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user_id, "User updated successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::UserUpdated(user_id)).await {
                warn!(error = %e, user_id = %user_id, "Failed to send user updated event");
            }
        }

        Ok(updated)
    }

    /// Verifies the current password and replaces it with a new hash
    #[instrument(skip(self, current_password, new_password), fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        if new_password.len() < 8 {
            return Err(ServiceError::ValidationError(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = chrono::Utc::now();

        let existing = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("User with ID {} not found", user_id)))?;

        let verified = verify_password(current_password, &existing.password_hash)
            .map_err(|e| ServiceError::HashError(e.to_string()))?;
        if !verified {
            return Err(ServiceError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash =
            hash_password(new_password).map_err(|e| ServiceError::HashError(e.to_string()))?;

        let mut user_active_model: UserActiveModel = existing.into();
        user_active_model.password_hash = Set(password_hash);
        user_active_model.updated_at = Set(Some(now));

        user_active_model.update(db).await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to change user password");
            ServiceError::DatabaseError(e)
        })?;

        info!(user_id = %user_id, "Password changed successfully");

        Ok(())
    }

    /// Deletes a user account
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let existing = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_none() {
            return Err(ServiceError::NotFound(format!(
                "User with ID {} not found",
                user_id
            )));
        }

        UserEntity::delete_by_id(user_id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to delete user");
                ServiceError::DatabaseError(e)
            })?;

        info!(user_id = %user_id, "User deleted successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::UserDeleted(user_id)).await {
                warn!(error = %e, user_id = %user_id, "Failed to send user deleted event");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_user_rejects_short_password() {
        let service = UserService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service
            .create_user(CreateUserInput {
                email: "short@example.com".to_string(),
                name: "Shorty".to_string(),
                password: "2short".to_string(),
                role: UserRole::Staff,
                picture_url: None,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn change_password_rejects_short_replacement() {
        let service = UserService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service
            .change_password(Uuid::new_v4(), "old-password", "tiny")
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }
}
