use crate::{
    db::DbPool,
    entities::meal::{self, ActiveModel as MealActiveModel, Entity as MealEntity, Model as MealModel},
    entities::meal_tag::{
        self, ActiveModel as MealTagActiveModel, Entity as MealTagEntity, Model as MealTagModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, LoaderTrait,
    PaginatorTrait, QueryFilter, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMealInput {
    pub name: String,
    pub price: Decimal,
    pub photo_url: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateMealInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub photo_url: Option<String>,
    pub is_active: Option<bool>,
    /// When present, replaces the meal's tag rows entirely
    pub tags: Option<Vec<String>>,
}

/// Filters accepted by [`MealService::list_meals`]
#[derive(Debug, Default, Clone)]
pub struct MealListFilter {
    /// Only meals carrying this tag name
    pub tag: Option<String>,
    /// Only meals with the given active flag
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MealListResponse {
    pub meals: Vec<(MealModel, Vec<MealTagModel>)>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service managing the meal catalogue and its tag rows
#[derive(Clone)]
pub struct MealService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl MealService {
    /// Creates a new meal service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a catalogue entry with its (deduplicated) tags
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_meal(
        &self,
        input: CreateMealInput,
    ) -> Result<(MealModel, Vec<MealTagModel>), ServiceError> {
        if input.price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Meal price must be positive".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = chrono::Utc::now();
        let meal_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for meal creation");
            ServiceError::DatabaseError(e)
        })?;

        let meal_active_model = MealActiveModel {
            id: Set(meal_id),
            name: Set(input.name.clone()),
            price: Set(input.price),
            photo_url: Set(input.photo_url),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let meal_model = meal_active_model.insert(&txn).await.map_err(|e| {
            error!(error = %e, meal_id = %meal_id, "Failed to create meal in database");
            ServiceError::DatabaseError(e)
        })?;

        let tags = insert_tag_rows(&txn, meal_id, &input.tags).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, meal_id = %meal_id, "Failed to commit meal creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(meal_id = %meal_id, name = %meal_model.name, "Meal created successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::MealCreated(meal_id)).await {
                warn!(error = %e, meal_id = %meal_id, "Failed to send meal created event");
            }
        }

        Ok((meal_model, tags))
    }

    /// Updates a catalogue entry; a supplied tag list replaces the old rows
    #[instrument(skip(self, input), fields(meal_id = %meal_id))]
    pub async fn update_meal(
        &self,
        meal_id: Uuid,
        input: UpdateMealInput,
    ) -> Result<(MealModel, Vec<MealTagModel>), ServiceError> {
        if let Some(price) = input.price {
            if price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Meal price must be positive".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;
        let now = chrono::Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let existing = MealEntity::find_by_id(meal_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                warn!(meal_id = %meal_id, "Meal not found for update");
                ServiceError::NotFound(format!("Meal with ID {} not found", meal_id))
            })?;

        let mut meal_active_model: MealActiveModel = existing.into();
        if let Some(name) = input.name {
            meal_active_model.name = Set(name);
        }
        if let Some(price) = input.price {
            meal_active_model.price = Set(price);
        }
        if let Some(photo_url) = input.photo_url {
            meal_active_model.photo_url = Set(Some(photo_url));
        }
        if let Some(is_active) = input.is_active {
            meal_active_model.is_active = Set(is_active);
        }
        meal_active_model.updated_at = Set(Some(now));

        let updated = meal_active_model.update(&txn).await.map_err(|e| {
            error!(error = %e, meal_id = %meal_id, "Failed to update meal");
            ServiceError::DatabaseError(e)
        })?;

        let tags = match input.tags {
            Some(new_tags) => {
                MealTagEntity::delete_many()
                    .filter(meal_tag::Column::MealId.eq(meal_id))
                    .exec(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                insert_tag_rows(&txn, meal_id, &new_tags).await?
            }
            None => MealTagEntity::find()
                .filter(meal_tag::Column::MealId.eq(meal_id))
                .all(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?,
        };

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(meal_id = %meal_id, "Meal updated successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::MealUpdated(meal_id)).await {
                warn!(error = %e, meal_id = %meal_id, "Failed to send meal updated event");
            }
        }

        Ok((updated, tags))
    }

    /// Toggles the active flag without touching other fields
    #[instrument(skip(self), fields(meal_id = %meal_id, is_active = is_active))]
    pub async fn set_meal_status(
        &self,
        meal_id: Uuid,
        is_active: bool,
    ) -> Result<MealModel, ServiceError> {
        let db = &*self.db_pool;
        let now = chrono::Utc::now();

        let existing = MealEntity::find_by_id(meal_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Meal with ID {} not found", meal_id)))?;

        let mut meal_active_model: MealActiveModel = existing.into();
        meal_active_model.is_active = Set(is_active);
        meal_active_model.updated_at = Set(Some(now));

        let updated = meal_active_model.update(db).await.map_err(|e| {
            error!(error = %e, meal_id = %meal_id, "Failed to update meal status");
            ServiceError::DatabaseError(e)
        })?;

        info!(meal_id = %meal_id, is_active = is_active, "Meal status updated");

        Ok(updated)
    }

    /// Retrieves a meal with its tags
    #[instrument(skip(self), fields(meal_id = %meal_id))]
    pub async fn get_meal(
        &self,
        meal_id: Uuid,
    ) -> Result<Option<(MealModel, Vec<MealTagModel>)>, ServiceError> {
        let db = &*self.db_pool;

        let found = MealEntity::find_by_id(meal_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        match found {
            Some(meal_model) => {
                let tags = MealTagEntity::find()
                    .filter(meal_tag::Column::MealId.eq(meal_id))
                    .all(db)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                Ok(Some((meal_model, tags)))
            }
            None => Ok(None),
        }
    }

    /// Lists meals with pagination, tags embedded per meal
    #[instrument(skip(self, filter))]
    pub async fn list_meals(
        &self,
        filter: MealListFilter,
        page: u64,
        per_page: u64,
    ) -> Result<MealListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = MealEntity::find();

        if let Some(active) = filter.active {
            query = query.filter(meal::Column::IsActive.eq(active));
        }

        if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query
                .join(JoinType::InnerJoin, meal::Relation::MealTags.def())
                .filter(meal_tag::Column::Name.eq(tag))
                .distinct();
        }

        let paginator = query.paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count meals");
            ServiceError::DatabaseError(e)
        })?;

        let meals = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, page = page, per_page = per_page, "Failed to fetch meals page");
                ServiceError::DatabaseError(e)
            })?;

        let tags = meals
            .load_many(MealTagEntity, db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let meals: Vec<(MealModel, Vec<MealTagModel>)> =
            meals.into_iter().zip(tags).collect();

        info!(
            total = total,
            page = page,
            per_page = per_page,
            returned_count = meals.len(),
            "Meals listed successfully"
        );

        Ok(MealListResponse {
            meals,
            total,
            page,
            per_page,
        })
    }

    /// Distinct tag names across the whole catalogue
    #[instrument(skip(self))]
    pub async fn list_tag_names(&self) -> Result<Vec<String>, ServiceError> {
        let db = &*self.db_pool;

        MealTagEntity::find()
            .select_only()
            .column(meal_tag::Column::Name)
            .distinct()
            .into_tuple::<String>()
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list tag names");
                ServiceError::DatabaseError(e)
            })
    }

    /// Deletes a meal and its tag rows
    #[instrument(skip(self), fields(meal_id = %meal_id))]
    pub async fn delete_meal(&self, meal_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let existing = MealEntity::find_by_id(meal_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Meal with ID {} not found",
                meal_id
            )));
        }

        MealTagEntity::delete_many()
            .filter(meal_tag::Column::MealId.eq(meal_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        MealEntity::delete_by_id(meal_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(meal_id = %meal_id, "Meal deleted successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::MealDeleted(meal_id)).await {
                warn!(error = %e, meal_id = %meal_id, "Failed to send meal deleted event");
            }
        }

        Ok(())
    }
}

/// Inserts deduplicated, non-empty tag rows for a meal
async fn insert_tag_rows<C: ConnectionTrait>(
    conn: &C,
    meal_id: Uuid,
    names: &[String],
) -> Result<Vec<MealTagModel>, ServiceError> {
    let unique: BTreeSet<&str> = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();

    let mut saved = Vec::with_capacity(unique.len());
    for name in unique {
        let tag_active_model = MealTagActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            meal_id: Set(meal_id),
        };
        let tag = tag_active_model
            .insert(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        saved.push(tag);
    }

    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn create_meal_rejects_non_positive_price() {
        let service = MealService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service
            .create_meal(CreateMealInput {
                name: "Free Lunch".to_string(),
                price: dec!(0.00),
                photo_url: None,
                tags: vec![],
                is_active: true,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn update_meal_rejects_negative_price() {
        let service = MealService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service
            .update_meal(
                Uuid::new_v4(),
                UpdateMealInput {
                    price: Some(dec!(-1.00)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn tag_names_are_deduplicated_and_trimmed() {
        let names = vec![
            "Vegan".to_string(),
            " Vegan ".to_string(),
            "".to_string(),
            "GlutenFree".to_string(),
        ];
        let unique: BTreeSet<&str> = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        assert_eq!(unique.len(), 2);
        assert!(unique.contains("Vegan"));
        assert!(unique.contains("GlutenFree"));
    }
}
