// not every test binary uses every helper
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use multisafepay_bridge::{
    app_router,
    config::{AppConfig, ChannelGatewayOverride, GatewayEnvironment, GatewaySettings},
    db::{self, DbConfig},
    entities::{order, order_item, order_transaction, payment_method},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Schema, Set};
use sha2::Sha512;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const TEST_API_KEY: &str = "test_api_key_1234567890";
pub const TEST_CHANNEL: &str = "storefront-nl";

/// Test harness around an application state backed by an in-memory SQLite
/// database with freshly created tables.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let db = db::establish_connection(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..DbConfig::default()
        })
        .await
        .expect("failed to open in-memory database");
        let db = Arc::new(db);

        create_tables(&db).await;

        let (tx, rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(tx));
        let event_task = tokio::spawn(events::process_events(rx));

        let services = AppServices::new(db.clone(), config.clone(), event_sender.clone());
        let state = AppState {
            db,
            config,
            event_sender,
            services,
        };
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }
}

async fn create_tables(db: &sea_orm::DatabaseConnection) {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    for stmt in [
        schema.create_table_from_entity(order::Entity),
        schema.create_table_from_entity(order_item::Entity),
        schema.create_table_from_entity(order_transaction::Entity),
        schema.create_table_from_entity(payment_method::Entity),
    ] {
        db.execute(backend.build(&stmt))
            .await
            .expect("failed to create table");
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        log_level: "debug".to_string(),
        log_json: false,
        public_base_url: "https://shop.example.com".to_string(),
        shop_version: Some("6.5.0".to_string()),
        gateway: GatewaySettings {
            api_key: TEST_API_KEY.to_string(),
            environment: GatewayEnvironment::Test,
            time_active_days: 30,
            second_chance: true,
            ..GatewaySettings::default()
        },
        channels: HashMap::new(),
    }
}

/// Config variant whose channel override points the gateway client at a
/// local mock server.
pub fn test_config_with_api_base(api_base: &str) -> AppConfig {
    let mut config = test_config();
    config.channels.insert(
        TEST_CHANNEL.to_string(),
        ChannelGatewayOverride {
            api_base: Some(api_base.to_string()),
            ..ChannelGatewayOverride::default()
        },
    );
    config
}

pub fn sample_order() -> order::Model {
    order::Model {
        id: Uuid::new_v4(),
        order_number: "10042".to_string(),
        sales_channel_id: TEST_CHANNEL.to_string(),
        currency: "EUR".to_string(),
        amount_total: Decimal::new(10000, 2),
        shipping_total: Decimal::new(484, 2),
        shipping_tax_rate: Decimal::new(21, 0),
        customer_email: "shopper@example.com".to_string(),
        customer_phone: Some("+31612345678".to_string()),
        customer_locale: Some("nl-NL".to_string()),
        customer_ip: Some("203.0.113.7".to_string()),
        billing_first_name: "Jan".to_string(),
        billing_last_name: "de Vries".to_string(),
        billing_street: "Kraanspoor 39".to_string(),
        billing_zip_code: "1033 SC".to_string(),
        billing_city: "Amsterdam".to_string(),
        billing_country: "NL".to_string(),
        shipping_first_name: "Jan".to_string(),
        shipping_last_name: "de Vries".to_string(),
        shipping_street: "Kraanspoor 39".to_string(),
        shipping_zip_code: "1033 SC".to_string(),
        shipping_city: "Amsterdam".to_string(),
        shipping_country: "NL".to_string(),
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn sample_item(order_id: Uuid, position: i32) -> order_item::Model {
    order_item::Model {
        id: Uuid::new_v4(),
        order_id,
        parent_id: None,
        item_type: order_item::TYPE_PRODUCT.to_string(),
        label: format!("Product {position}"),
        description: None,
        quantity: Decimal::ONE,
        unit_price: Decimal::new(999, 2),
        tax_rate: Decimal::new(19, 0),
        product_number: Some(format!("SKU-{position}")),
        promotion_id: None,
        position,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub async fn insert_order(app: &TestApp, model: order::Model) -> order::Model {
    order::ActiveModel::from(model)
        .insert(&*app.state.db)
        .await
        .expect("failed to insert order")
}

pub async fn insert_item(app: &TestApp, model: order_item::Model) -> order_item::Model {
    order_item::ActiveModel::from(model)
        .insert(&*app.state.db)
        .await
        .expect("failed to insert order item")
}

pub async fn insert_payment_method(
    app: &TestApp,
    name: &str,
    gateway_code: &str,
) -> payment_method::Model {
    payment_method::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        gateway_code: Set(gateway_code.to_string()),
        active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to insert payment method")
}

pub async fn insert_transaction(
    app: &TestApp,
    order_id: Uuid,
    payment_method_id: Uuid,
    state: &str,
) -> order_transaction::Model {
    order_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        payment_method_id: Set(payment_method_id),
        state: Set(state.to_string()),
        amount: Set(Decimal::new(10000, 2)),
        currency: Set("EUR".to_string()),
        gateway_transaction_id: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        version: Set(1),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to insert transaction")
}

/// Signs a notification body the way the gateway does: base64 over the hex
/// encoding of an HMAC-SHA512 digest keyed by the merchant API key.
pub fn sign_notification(body: &[u8], api_key: &str) -> String {
    let mut mac =
        Hmac::<Sha512>::new_from_slice(api_key.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    BASE64.encode(hex::encode(mac.finalize().into_bytes()).as_bytes())
}
