use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use funnelcrm_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        campaign, customer, customer::CustomerStatus, gateway as gateway_entity, offer, order,
        product, transaction, Order, Transaction,
    },
    events::{self, EventSender},
    gateway::DemoGateway,
    handlers::AppServices,
    AppState,
};

/// Helper harness: the full axum app over an in-memory SQLite database with
/// the embedded migrator and the demo gateway.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        // A single pooled connection keeps the in-memory database alive and
        // shared for the lifetime of the harness.
        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(5),
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            Arc::new(DemoGateway::new()),
            cfg.default_currency.clone(),
        );

        let state = Arc::new(AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        });

        let router = Router::new()
            .nest("/api/v1", funnelcrm_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Issue a JSON POST against the app and return the raw response.
    pub async fn post_json(&self, path: &str, payload: Value) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request construction");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router oneshot")
    }

    // ==================== Seed helpers ====================

    pub async fn seed_gateway(&self, name: &str, priority: i32, active: bool) -> gateway_entity::Model {
        gateway_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            token: Set(format!("gw_token_{}", name)),
            priority: Set(priority),
            active: Set(active),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed gateway")
    }

    pub async fn seed_campaign(&self, currency: &str, preauth_only: bool) -> campaign::Model {
        campaign::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Summer Launch".to_string()),
            currency: Set(currency.to_string()),
            preauth_only: Set(preauth_only),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed campaign")
    }

    pub async fn seed_product(&self, sku: &str, price: Decimal, shipping_cost: Decimal) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Product {}", sku)),
            sku: Set(sku.to_string()),
            price: Set(price),
            shipping_cost: Set(shipping_cost),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_offer(
        &self,
        campaign: &campaign::Model,
        product: &product::Model,
        price_override: Option<Decimal>,
        ship_price: Option<Decimal>,
        gateway_id: Option<Uuid>,
    ) -> offer::Model {
        offer::ActiveModel {
            id: Set(Uuid::new_v4()),
            campaign_id: Set(campaign.id),
            product_id: Set(product.id),
            gateway_id: Set(gateway_id),
            name: Set("Starter Kit".to_string()),
            price_override: Set(price_override),
            ship_price: Set(ship_price),
            qty_per_order: Set(1),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed offer")
    }

    pub async fn seed_customer(
        &self,
        status: CustomerStatus,
        campaign: &campaign::Model,
        offer: &offer::Model,
    ) -> customer::Model {
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set("buyer@example.com".to_string()),
            first_name: Set("Jamie".to_string()),
            last_name: Set("Rivera".to_string()),
            phone: Set(None),
            status: Set(status),
            decline_count: Set(0),
            last_decline_reason: Set(None),
            last_decline_code: Set(None),
            source_campaign_id: Set(Some(campaign.id)),
            source_offer_id: Set(Some(offer.id)),
            ship_address1: Set("123 Main St".to_string()),
            ship_address2: Set(None),
            ship_city: Set("Austin".to_string()),
            ship_state: Set("TX".to_string()),
            ship_postal: Set("78701".to_string()),
            ship_country: Set("US".to_string()),
            bill_same_as_ship: Set(true),
            bill_address1: Set(None),
            bill_address2: Set(None),
            bill_city: Set(None),
            bill_state: Set(None),
            bill_postal: Set(None),
            bill_country: Set(None),
            ip_address: Set(Some("203.0.113.9".to_string())),
            first_order_id: Set(None),
            converted_at: Set(None),
            lifetime_value: Set(Decimal::ZERO),
            total_orders: Set(0),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed customer")
    }

    // ==================== Assertion helpers ====================

    pub async fn reload_customer(&self, id: Uuid) -> customer::Model {
        funnelcrm_api::entities::Customer::find_by_id(id)
            .one(&*self.state.db)
            .await
            .expect("customer query")
            .expect("customer exists")
    }

    pub async fn orders_for(&self, customer_id: Uuid) -> Vec<order::Model> {
        Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .all(&*self.state.db)
            .await
            .expect("orders query")
    }

    pub async fn transactions_for(&self, customer_id: Uuid) -> Vec<transaction::Model> {
        Transaction::find()
            .filter(transaction::Column::CustomerId.eq(customer_id))
            .all(&*self.state.db)
            .await
            .expect("transactions query")
    }

    pub async fn count_all_orders(&self) -> u64 {
        Order::find()
            .count(&*self.state.db)
            .await
            .expect("orders count")
    }
}

/// Decode a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Assert an HTTP status and return the decoded JSON body.
pub async fn expect_status(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status, "unexpected HTTP status");
    response_json(response).await
}
