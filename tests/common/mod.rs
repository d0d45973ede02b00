use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use canteen_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::user::UserRole,
    events::{self, EventSender},
    handlers::AppServices,
    services::users::CreateUserInput,
    AppState,
};

/// Helper harness for spinning up an application state backed by a SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    #[allow(dead_code)]
    pub auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // Minimal configuration suitable for tests; each harness gets its own
        // database file so suites can run concurrently.
        let db_file = std::env::temp_dir().join(format!("canteen_test_{}.db", Uuid::new_v4()));
        let db_url = format!("sqlite://{}?mode=rwc", db_file.display());

        let mut cfg = AppConfig::new(
            db_url,
            "test_secret_key_for_canteen_integration_suites_0nly_kYq3mW8hZvNfRt2d".to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_cfg = AuthConfig::new(
            cfg.jwt_secret.clone(),
            "canteen-api".to_string(),
            "canteen-auth".to_string(),
            Duration::from_secs(cfg.jwt_expiration as u64),
            Duration::from_secs(cfg.refresh_token_expiration as u64),
        );
        let auth_service = Arc::new(AuthService::new(auth_cfg, db_arc.clone()));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        // Seed an admin account and mint a token for authenticated requests
        let admin = state
            .services
            .users
            .create_user(CreateUserInput {
                email: "admin@canteen.test".to_string(),
                name: "Test Admin".to_string(),
                password: "admin-password-123".to_string(),
                role: UserRole::Admin,
                picture_url: None,
            })
            .await
            .expect("seed admin user");

        let token_pair = auth_service
            .generate_token(&admin)
            .await
            .expect("mint admin token");

        let router = Router::new()
            .route("/", get(|| async { "canteen-api up" }))
            .nest("/api/v1", canteen_api::api_v1_routes())
            .nest_service(
                "/auth",
                canteen_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(axum::middleware::from_fn_with_state(
                auth_service.clone(),
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .layer(axum::middleware::from_fn(
                canteen_api::middleware_helpers::request_id::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            token: token_pair.access_token,
            auth_service,
            _event_task: event_task,
        }
    }

    /// Issue a request with the seeded admin bearer token attached.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.token.clone();
        self.request_with_token(method, uri, body, Some(&token))
            .await
    }

    /// Issue a request without any Authorization header.
    #[allow(dead_code)]
    pub async fn request_anonymous(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request_with_token(method, uri, body, None).await
    }

    /// Issue a request with an explicit bearer token (or none).
    pub async fn request_with_token(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request should produce a response")
    }

    /// Seed a catalogue meal directly through the service layer.
    pub async fn seed_meal(&self, name: &str, price: Decimal, tags: &[&str]) -> Uuid {
        let (meal, _) = self
            .state
            .services
            .meals
            .create_meal(canteen_api::services::meals::CreateMealInput {
                name: name.to_string(),
                price,
                photo_url: None,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                is_active: true,
            })
            .await
            .expect("seed meal");
        meal.id
    }

    /// Seed a customer account directly through the service layer.
    pub async fn seed_customer(&self, name: &str, balance: Decimal) -> Uuid {
        let account = self
            .state
            .services
            .customers
            .create_customer(canteen_api::services::customers::CreateCustomerInput {
                name: name.to_string(),
                parent_contact: None,
                class: Some("Grade 4".to_string()),
                balance: Some(balance),
            })
            .await
            .expect("seed customer");
        account.id
    }
}

/// Deserialize a response body into JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
