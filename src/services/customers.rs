use crate::{
    db::DbPool,
    entities::customer::{
        self, ActiveModel as CustomerActiveModel, Entity as CustomerEntity, Model as CustomerModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerInput {
    pub name: String,
    pub parent_contact: Option<String>,
    pub class: Option<String>,
    pub balance: Option<Decimal>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateCustomerInput {
    pub name: Option<String>,
    pub parent_contact: Option<String>,
    pub class: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service managing customer balance accounts
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CustomerService {
    /// Creates a new customer service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a customer account; the balance starts at zero unless given
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_customer(
        &self,
        input: CreateCustomerInput,
    ) -> Result<CustomerModel, ServiceError> {
        let opening_balance = input.balance.unwrap_or(Decimal::ZERO);
        if opening_balance < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Opening balance cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = chrono::Utc::now();
        let customer_id = Uuid::new_v4();

        let customer_active_model = CustomerActiveModel {
            id: Set(customer_id),
            name: Set(input.name),
            parent_contact: Set(input.parent_contact),
            class: Set(input.class),
            balance: Set(opening_balance),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let customer_model = customer_active_model.insert(db).await.map_err(|e| {
            error!(error = %e, customer_id = %customer_id, "Failed to create customer in database");
            ServiceError::DatabaseError(e)
        })?;

        info!(customer_id = %customer_id, "Customer created successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CustomerCreated(customer_id)).await {
                warn!(error = %e, customer_id = %customer_id, "Failed to send customer created event");
            }
        }

        Ok(customer_model)
    }

    /// Updates contact fields; balances change only via top-up and orders
    #[instrument(skip(self, input), fields(customer_id = %customer_id))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> Result<CustomerModel, ServiceError> {
        let db = &*self.db_pool;
        let now = chrono::Utc::now();

        let existing = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                warn!(customer_id = %customer_id, "Customer not found for update");
                ServiceError::NotFound(format!("Customer with ID {} not found", customer_id))
            })?;

        let mut customer_active_model: CustomerActiveModel = existing.into();
        if let Some(name) = input.name {
            customer_active_model.name = Set(name);
        }
        if let Some(parent_contact) = input.parent_contact {
            customer_active_model.parent_contact = Set(Some(parent_contact));
        }
        if let Some(class) = input.class {
            customer_active_model.class = Set(Some(class));
        }
        customer_active_model.updated_at = Set(Some(now));

        let updated = customer_active_model.update(db).await.map_err(|e| {
            error!(error = %e, customer_id = %customer_id, "Failed to update customer");
            ServiceError::DatabaseError(e)
        })?;

        info!(customer_id = %customer_id, "Customer updated successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CustomerUpdated(customer_id)).await {
                warn!(error = %e, customer_id = %customer_id, "Failed to send customer updated event");
            }
        }

        Ok(updated)
    }

    /// Adds a strictly positive amount to the stored balance atomically
    #[instrument(skip(self), fields(customer_id = %customer_id, amount = %amount))]
    pub async fn top_up_balance(
        &self,
        customer_id: Uuid,
        amount: Decimal,
    ) -> Result<CustomerModel, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Top-up amount must be positive".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = chrono::Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, customer_id = %customer_id, "Failed to start transaction for top-up");
            ServiceError::DatabaseError(e)
        })?;

        let account = CustomerEntity::find_by_id(customer_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                warn!(customer_id = %customer_id, "Customer not found for top-up");
                ServiceError::NotFound(format!("Customer with ID {} not found", customer_id))
            })?;

        let new_balance = account.balance + amount;
        let mut customer_active_model: CustomerActiveModel = account.into();
        customer_active_model.balance = Set(new_balance);
        customer_active_model.updated_at = Set(Some(now));

        let updated = customer_active_model.update(&txn).await.map_err(|e| {
            error!(error = %e, customer_id = %customer_id, "Failed to top up customer balance");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, customer_id = %customer_id, "Failed to commit top-up transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            customer_id = %customer_id,
            amount = %amount,
            new_balance = %updated.balance,
            "Balance topped up successfully"
        );

        if let Some(event_sender) = &self.event_sender {
            let event = Event::BalanceToppedUp {
                customer_id,
                amount,
                new_balance: updated.balance,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, customer_id = %customer_id, "Failed to send balance topped up event");
            }
        }

        Ok(updated)
    }

    /// Retrieves a customer by ID
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<CustomerModel>, ServiceError> {
        let db = &*self.db_pool;

        CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, customer_id = %customer_id, "Failed to fetch customer from database");
                ServiceError::DatabaseError(e)
            })
    }

    /// Lists customers with pagination and optional case-insensitive name search
    #[instrument(skip(self, search))]
    pub async fn list_customers(
        &self,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<CustomerListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = CustomerEntity::find().order_by_asc(customer::Column::Name);

        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    customer::Entity,
                    customer::Column::Name,
                ))))
                .like(pattern),
            );
        }

        let paginator = query.paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count customers");
            ServiceError::DatabaseError(e)
        })?;

        let customers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, page = page, per_page = per_page, "Failed to fetch customers page");
                ServiceError::DatabaseError(e)
            })?;

        info!(
            total = total,
            page = page,
            per_page = per_page,
            returned_count = customers.len(),
            "Customers listed successfully"
        );

        Ok(CustomerListResponse {
            customers,
            total,
            page,
            per_page,
        })
    }

    /// Deletes a customer account
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let existing = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Customer with ID {} not found",
                customer_id
            )));
        }

        CustomerEntity::delete_by_id(customer_id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, customer_id = %customer_id, "Failed to delete customer");
                ServiceError::DatabaseError(e)
            })?;

        info!(customer_id = %customer_id, "Customer deleted successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CustomerDeleted(customer_id)).await {
                warn!(error = %e, customer_id = %customer_id, "Failed to send customer deleted event");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn top_up_rejects_zero_amount() {
        let service =
            CustomerService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service.top_up_balance(Uuid::new_v4(), dec!(0.00)).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn top_up_rejects_negative_amount() {
        let service =
            CustomerService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service.top_up_balance(Uuid::new_v4(), dec!(-5.00)).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn create_rejects_negative_opening_balance() {
        let service =
            CustomerService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service
            .create_customer(CreateCustomerInput {
                name: "Alice Johnson".to_string(),
                parent_contact: None,
                class: None,
                balance: Some(dec!(-1.00)),
            })
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }
}
