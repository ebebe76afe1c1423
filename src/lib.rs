//! MultiSafepay bridge library.
//!
//! Integrates the MultiSafepay payment gateway with the host order system:
//! assembles gateway order requests from orders, turns gateway status
//! notifications into order-transaction state transitions, and exposes the
//! payment HTTP surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use axum::{response::Json, routing::get, routing::post, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi as _, ToSchema};

pub use handlers::AppServices;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: AppServices,
}

/// Uniform success envelope for HTTP responses.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics_endpoint() -> String {
    metrics::render()
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

/// Builds the HTTP router over the shared application state.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api-docs/openapi.json", get(openapi_document))
        .route("/api/v1/payments", post(handlers::payments::initiate_payment))
        .route(
            "/api/v1/payments/notification",
            post(handlers::notifications::payment_notification),
        )
        .route(
            "/api/v1/payments/:transaction_id",
            get(handlers::payments::payment_status),
        )
        .route(
            "/api/v1/payments/:transaction_id/shipped",
            post(handlers::payments::mark_shipped),
        )
        .route(
            "/api/v1/payments/:transaction_id/refund",
            post(handlers::payments::refund_payment),
        )
        .route(
            "/api/v1/payments/issuers/:gateway",
            get(handlers::payments::list_issuers),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
