use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuditRecorder, PairingService};

pub mod audit;
pub mod auth;
pub mod controllers;
mod error;
mod observability;
pub mod readings;
pub mod requester;
pub mod system;
mod types;
pub mod users;
pub mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub audit: AuditRecorder,
    pub pairing: PairingService,
    pub start_time: std::time::Instant,
    pub prometheus_handle: Option<PrometheusHandle>,
}

pub async fn create_app_state(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;

    Ok(Arc::new(AppState {
        audit: AuditRecorder::new(store.clone()),
        pairing: PairingService::new(store.clone()),
        store,
        config,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/me", get(auth::get_me))
        .route("/me", patch(auth::update_me))
        .route("/me", delete(auth::delete_me))
        .route("/me/password", patch(auth::change_password))
        .route("/users", get(users::list_users))
        .route("/users", post(users::invite_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", patch(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/controllers", get(users::list_user_controllers))
        .route("/users/{id}/controllers", post(users::assign_controller))
        .route(
            "/users/{id}/controllers/{controller_id}",
            patch(users::relabel_controller),
        )
        .route(
            "/users/{id}/controllers/{controller_id}",
            delete(users::unassign_controller),
        )
        .route("/controllers", get(controllers::list_controllers))
        .route("/controllers", post(controllers::create_controller))
        .route("/controllers/{id}", delete(controllers::delete_controller))
        .route("/claim", post(controllers::claim_controller))
        .route("/devices", get(readings::list_devices))
        .route("/latest/{device_id}", get(readings::latest_reading))
        .route("/history/{device_id}", get(readings::reading_history))
        .route("/readings", get(readings::list_readings))
        .route("/audit", get(audit::list_audit))
        .route("/audit", delete(audit::purge_audit))
        .route("/system/health", get(system::get_health))
        .route("/metrics", get(observability::get_metrics))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_metrics))
}
