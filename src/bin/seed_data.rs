//! Seed data script - populates the database with realistic demo data
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 3 back-office users (one admin, two staff)
//! - 6 meals with dietary tags
//! - 6 customers with balances
//! - 5 historical orders with items

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use std::time::Duration as StdDuration;
use tracing::info;
use uuid::Uuid;

use canteen_api::auth::hash_password;
use canteen_api::entities::{
    customer, meal, meal_tag, order,
    order::PaymentMethod,
    order_item,
    user::{self, UserRole, UserStatus},
};
use canteen_api::migrator::Migrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Canteen API Seed Data ===");
    info!("Creating demo data for exploration...\n");

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://canteen.db?mode=rwc".to_string());

    let mut options = ConnectOptions::new(database_url.clone());
    options
        .max_connections(5)
        .min_connections(1)
        .connect_timeout(StdDuration::from_secs(10))
        .acquire_timeout(StdDuration::from_secs(10));

    info!("Connecting to database: {}", database_url);
    let db = Database::connect(options).await?;
    info!("Connected!\n");

    Migrator::up(&db, None).await?;

    info!("Creating users...");
    let user_count = create_users(&db).await?;
    info!("  Created {} users", user_count);

    info!("Creating meals...");
    let meals = create_meals(&db).await?;
    info!("  Created {} meals with tags", meals.len());

    info!("Creating customers...");
    let customers = create_customers(&db).await?;
    info!("  Created {} customers", customers.len());

    info!("Creating orders...");
    let order_count = create_orders(&db, &meals, &customers).await?;
    info!("  Created {} orders with items", order_count);

    info!("\n=== Seed Data Complete ===");
    info!("Your Canteen API is now populated with demo data!");
    info!("");
    info!("Sign in with admin@canteen.local / admin-password-123 and try:");
    info!("  curl http://localhost:8080/api/v1/meals");
    info!("  curl http://localhost:8080/api/v1/customers");
    info!("  curl http://localhost:8080/api/v1/orders");
    info!("");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    Ok(())
}

async fn create_users(db: &DatabaseConnection) -> anyhow::Result<usize> {
    let accounts = [
        ("admin@canteen.local", "Alma Reyes", "admin-password-123", UserRole::Admin),
        ("jane@canteen.local", "Jane Smith", "staff-password-123", UserRole::Staff),
        ("will@canteen.local", "William Davis", "staff-password-123", UserRole::Staff),
    ];

    let now = Utc::now();
    for (email, name, password, role) in accounts {
        let hash = hash_password(password).map_err(|e| anyhow::anyhow!("{e}"))?;
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set(name.to_string()),
            password_hash: Set(hash),
            picture_url: Set(None),
            email_verified: Set(true),
            status: Set(UserStatus::Verified),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;
    }

    Ok(3)
}

async fn create_meals(db: &DatabaseConnection) -> anyhow::Result<Vec<meal::Model>> {
    let catalogue: [(&str, Decimal, &[&str]); 6] = [
        ("Chicken Caesar Salad", dec!(10.75), &["GlutenFree"]),
        ("Beef Tacos", dec!(12.99), &["DairyFree"]),
        ("Vegetarian Pizza", dec!(9.00), &["Vegetarian"]),
        ("Grilled Salmon", dec!(10.75), &["GlutenFree", "DairyFree"]),
        ("Spaghetti Carbonara", dec!(10.75), &[]),
        ("Lentil Curry", dec!(8.50), &["Vegan", "GlutenFree"]),
    ];

    let now = Utc::now();
    let mut saved = Vec::with_capacity(catalogue.len());
    for (name, price, tags) in catalogue {
        let meal_model = meal::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            photo_url: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        for tag in tags {
            meal_tag::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(tag.to_string()),
                meal_id: Set(meal_model.id),
            }
            .insert(db)
            .await?;
        }

        saved.push(meal_model);
    }

    Ok(saved)
}

async fn create_customers(db: &DatabaseConnection) -> anyhow::Result<Vec<customer::Model>> {
    let roster: [(&str, &str, &str, Decimal); 6] = [
        ("Emily Davis", "emily.davis@example.com", "Grade 5", dec!(30.00)),
        ("Michael Smith", "james.wilson@example.com", "Grade 4", dec!(15.75)),
        ("Sophia Brown", "sophia.brown@example.com", "Grade 3", dec!(10.00)),
        ("Alice Johnson", "michael.smith@example.com", "Grade 2", dec!(25.50)),
        ("James Wilson", "alice.johnson@example.com", "Grade 2", dec!(40.20)),
        ("Noah Miller", "nina.miller@example.com", "Grade 1", dec!(5.00)),
    ];

    let now = Utc::now();
    let mut saved = Vec::with_capacity(roster.len());
    for (name, contact, class, balance) in roster {
        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            parent_contact: Set(Some(contact.to_string())),
            class: Set(Some(class.to_string())),
            balance: Set(balance),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;
        saved.push(model);
    }

    Ok(saved)
}

async fn create_orders(
    db: &DatabaseConnection,
    meals: &[meal::Model],
    customers: &[customer::Model],
) -> anyhow::Result<usize> {
    let history: [(usize, &[(usize, i32)], PaymentMethod, i64); 5] = [
        (0, &[(0, 1), (2, 2)], PaymentMethod::Cash, 21),
        (1, &[(3, 1)], PaymentMethod::Balance, 14),
        (2, &[(2, 1)], PaymentMethod::Balance, 7),
        (3, &[(1, 2), (4, 1)], PaymentMethod::Card, 3),
        (4, &[(5, 3)], PaymentMethod::Cash, 1),
    ];

    for (customer_idx, lines, payment_method, days_ago) in history {
        let account = &customers[customer_idx];
        let placed_at = Utc::now() - Duration::days(days_ago);
        let order_id = Uuid::new_v4();

        let mut total_amount = Decimal::ZERO;
        let mut item_models = Vec::with_capacity(lines.len());
        for (meal_idx, quantity) in lines {
            let dish = &meals[*meal_idx];
            let total_price = dish.price * Decimal::from(*quantity);
            total_amount += total_price;
            item_models.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                meal_id: Set(dish.id),
                meal_name: Set(dish.name.clone()),
                quantity: Set(*quantity),
                unit_price: Set(dish.price),
                total_price: Set(total_price),
                created_at: Set(placed_at),
            });
        }

        order::ActiveModel {
            id: Set(order_id),
            customer_id: Set(account.id),
            placed_at: Set(placed_at),
            total_amount: Set(total_amount),
            payment_method: Set(payment_method),
            created_at: Set(placed_at),
        }
        .insert(db)
        .await?;

        for item in item_models {
            item.insert(db).await?;
        }
    }

    Ok(5)
}
