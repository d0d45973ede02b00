use crate::{
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    entities::meal::Entity as MealEntity,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        PaymentMethod,
    },
    entities::order_item::{
        self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
        Model as OrderItemModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
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

/// Request/Response types for the order service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderItem {
    pub meal_id: Uuid,
    pub quantity: i32,
    /// Optional client-side price used only as a cross-check against the
    /// catalogue; the catalogue price is authoritative.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: Uuid,
    pub payment_method: PaymentMethod,
    pub items: Vec<PlaceOrderItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Filters accepted by [`OrderService::list_orders`]
#[derive(Debug, Default, Clone)]
pub struct OrderListFilter {
    pub customer_id: Option<Uuid>,
    /// Case-insensitive match against the customer name
    pub customer_search: Option<String>,
    /// Restrict to orders placed on this calendar day (UTC)
    pub placed_on: Option<NaiveDate>,
}

/// Service for placing and browsing orders.
///
/// Placement runs in a single database transaction: meals are resolved and
/// priced from the catalogue, and a balance payment debits the customer only
/// if funds cover the computed total.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Places a new order, debiting the customer's balance when the payment
    /// method is `Balance`. Nothing is persisted if any step fails.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn place_order(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<(OrderModel, Vec<OrderItemModel>), ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "An order requires at least one item".to_string(),
            ));
        }
        for (index, item) in request.items.iter().enumerate() {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "items[{index}].quantity must be at least 1"
                )));
            }
        }

        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order placement");
            ServiceError::DatabaseError(e)
        })?;

        let account = CustomerEntity::find_by_id(request.customer_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                warn!(customer_id = %request.customer_id, "Customer not found for order placement");
                ServiceError::NotFound(format!(
                    "Customer with ID {} not found",
                    request.customer_id
                ))
            })?;

        // Resolve every meal and compute totals from catalogue prices
        let mut total_amount = Decimal::ZERO;
        let mut item_models: Vec<OrderItemActiveModel> = Vec::with_capacity(request.items.len());
        for (index, item) in request.items.iter().enumerate() {
            let dish = MealEntity::find_by_id(item.meal_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "items[{index}].meal_id references an unknown meal ({})",
                        item.meal_id
                    ))
                })?;

            if !dish.is_active {
                return Err(ServiceError::ValidationError(format!(
                    "items[{index}] references an inactive meal ({})",
                    dish.name
                )));
            }

            if let Some(provided_price) = item.unit_price {
                if provided_price != dish.price {
                    return Err(ServiceError::ValidationError(format!(
                        "items[{index}].unit_price ({}) does not match catalogue price ({}) for {}",
                        provided_price, dish.price, dish.name
                    )));
                }
            }

            let total_price = dish.price * Decimal::from(item.quantity);
            total_amount += total_price;

            item_models.push(OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                meal_id: Set(dish.id),
                meal_name: Set(dish.name),
                quantity: Set(item.quantity),
                unit_price: Set(dish.price),
                total_price: Set(total_price),
                created_at: Set(now),
            });
        }

        // Balance payment debits the account within the same transaction;
        // the balance must never go negative.
        let mut new_balance = None;
        if request.payment_method == PaymentMethod::Balance {
            if account.balance < total_amount {
                info!(
                    customer_id = %account.id,
                    balance = %account.balance,
                    total_amount = %total_amount,
                    "Rejecting balance payment with insufficient funds"
                );
                return Err(ServiceError::InsufficientBalance(format!(
                    "balance {} does not cover order total {}",
                    account.balance, total_amount
                )));
            }

            let remaining = account.balance - total_amount;
            let mut account_active: customer::ActiveModel = account.clone().into();
            account_active.balance = Set(remaining);
            account_active.updated_at = Set(Some(now));
            account_active.update(&txn).await.map_err(|e| {
                error!(error = %e, customer_id = %account.id, "Failed to debit customer balance");
                ServiceError::DatabaseError(e)
            })?;
            new_balance = Some(remaining);
        }

        let order_active_model = OrderActiveModel {
            id: Set(order_id),
            customer_id: Set(account.id),
            placed_at: Set(now),
            total_amount: Set(total_amount),
            payment_method: Set(request.payment_method),
            created_at: Set(now),
        };

        let order_model = order_active_model.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order in database");
            ServiceError::DatabaseError(e)
        })?;

        let mut saved_items = Vec::with_capacity(item_models.len());
        for item_model in item_models {
            let saved = item_model.insert(&txn).await.map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to create order item in database");
                ServiceError::DatabaseError(e)
            })?;
            saved_items.push(saved);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order placement transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            customer_id = %account.id,
            total_amount = %total_amount,
            payment_method = request.payment_method.as_str(),
            "Order placed successfully"
        );

        if let Some(event_sender) = &self.event_sender {
            let placed = Event::OrderPlaced {
                order_id,
                customer_id: account.id,
                total_amount,
                payment_method: request.payment_method.as_str().to_string(),
            };
            if let Err(e) = event_sender.send(placed).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order placed event");
            }
            if let Some(balance) = new_balance {
                let debited = Event::BalanceDebited {
                    customer_id: account.id,
                    order_id,
                    amount: total_amount,
                    new_balance: balance,
                };
                if let Err(e) = event_sender.send(debited).await {
                    warn!(error = %e, order_id = %order_id, "Failed to send balance debited event");
                }
            }
        }

        Ok((order_model, saved_items))
    }

    /// Retrieves an order by ID along with its customer name
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderResponse>, ServiceError> {
        let db = &*self.db_pool;

        let found = OrderEntity::find_by_id(order_id)
            .find_also_related(CustomerEntity)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order from database");
                ServiceError::DatabaseError(e)
            })?;

        Ok(found.map(|(order_model, account)| model_to_response(order_model, account)))
    }

    /// Retrieves the items belonging to an order
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, ServiceError> {
        let db = &*self.db_pool;

        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order items");
                ServiceError::DatabaseError(e)
            })
    }

    /// Lists orders with pagination, newest first
    #[instrument(skip(self, filter))]
    pub async fn list_orders(
        &self,
        filter: OrderListFilter,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = OrderEntity::find()
            .find_also_related(CustomerEntity)
            .order_by_desc(order::Column::PlacedAt);

        if let Some(customer_id) = filter.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }

        if let Some(search) = filter
            .customer_search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    customer::Entity,
                    customer::Column::Name,
                ))))
                .like(pattern),
            );
        }

        if let Some(day) = filter.placed_on {
            let start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
            let end = start + chrono::Duration::days(1);
            query = query
                .filter(order::Column::PlacedAt.gte(start))
                .filter(order::Column::PlacedAt.lt(end));
        }

        let paginator = query.paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count orders");
            ServiceError::DatabaseError(e)
        })?;

        let rows = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, per_page = per_page, "Failed to fetch orders page");
            ServiceError::DatabaseError(e)
        })?;

        let orders: Vec<OrderResponse> = rows
            .into_iter()
            .map(|(order_model, account)| model_to_response(order_model, account))
            .collect();

        info!(
            total = total,
            page = page,
            per_page = per_page,
            returned_count = orders.len(),
            "Orders listed successfully"
        );

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Deletes an order and its items
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let existing = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Order with ID {} not found",
                order_id
            )));
        }

        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        OrderEntity::delete_by_id(order_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(order_id = %order_id, "Order deleted successfully");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderDeleted(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order deleted event");
            }
        }

        Ok(())
    }
}

/// Converts an order model (plus optional joined customer) to response format
fn model_to_response(model: OrderModel, account: Option<customer::Model>) -> OrderResponse {
    OrderResponse {
        id: model.id,
        customer_id: model.customer_id,
        customer_name: account.map(|c| c.name),
        placed_at: model.placed_at,
        total_amount: model.total_amount,
        payment_method: model.payment_method,
        created_at: model.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn model_to_response_carries_customer_name() {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();

        let model = OrderModel {
            id: order_id,
            customer_id,
            placed_at: now,
            total_amount: dec!(21.50),
            payment_method: PaymentMethod::Balance,
            created_at: now,
        };
        let account = customer::Model {
            id: customer_id,
            name: "Alice Johnson".to_string(),
            parent_contact: None,
            class: Some("Grade 2".to_string()),
            balance: dec!(10.00),
            created_at: now,
            updated_at: None,
        };

        let response = model_to_response(model, Some(account));
        assert_eq!(response.id, order_id);
        assert_eq!(response.customer_name.as_deref(), Some("Alice Johnson"));
        assert_eq!(response.total_amount, dec!(21.50));
        assert_eq!(response.payment_method, PaymentMethod::Balance);
    }

    #[test]
    fn line_totals_accumulate_with_decimal_precision() {
        // 3 x 10.75 + 2 x 9.00 = 50.25
        let lines = [(dec!(10.75), 3), (dec!(9.00), 2)];
        let total: Decimal = lines
            .iter()
            .map(|(price, qty)| *price * Decimal::from(*qty))
            .sum();
        assert_eq!(total, dec!(50.25));
    }

    #[tokio::test]
    async fn place_order_rejects_empty_cart() {
        let service = OrderService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service
            .place_order(PlaceOrderRequest {
                customer_id: Uuid::new_v4(),
                payment_method: PaymentMethod::Cash,
                items: vec![],
            })
            .await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn place_order_rejects_non_positive_quantity() {
        let service = OrderService::new(Arc::new(sea_orm::DatabaseConnection::Disconnected), None);
        let result = service
            .place_order(PlaceOrderRequest {
                customer_id: Uuid::new_v4(),
                payment_method: PaymentMethod::Cash,
                items: vec![PlaceOrderItem {
                    meal_id: Uuid::new_v4(),
                    quantity: 0,
                    unit_price: None,
                }],
            })
            .await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }
}
