//! HTTP surface of the air-quality prediction service.
//!
//! The binary builds an [`AppState`] from [`config::Settings`] and serves
//! [`router`]; integration tests drive the same router in-process.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

use std::sync::Arc;
use std::time::Instant;

use air_quality_core::PredictionPipeline;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::Settings;

// ------------------------------------------------------------------ //
//  Shared application state                                           //
// ------------------------------------------------------------------ //

/// Shared state injected into every Axum handler via `State`.
pub struct AppState {
    pub pipeline: PredictionPipeline,
    pub settings: Settings,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: PredictionPipeline, settings: Settings) -> Self {
        Self {
            pipeline,
            settings,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        (self.started_at.elapsed().as_secs_f64() * 100.0).round() / 100.0
    }
}

// ------------------------------------------------------------------ //
//  Router                                                             //
// ------------------------------------------------------------------ //

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.allowed_origins);

    let wrong_method = handlers::method_not_allowed;

    let api = Router::new()
        .route("/health", get(handlers::health).fallback(wrong_method))
        .route("/health/detailed", get(handlers::health_detailed).fallback(wrong_method))
        .route("/health/ready", get(handlers::health_ready).fallback(wrong_method))
        .route("/health/live", get(handlers::health_live).fallback(wrong_method))
        .route("/predict", post(handlers::predict).fallback(wrong_method))
        .route("/predict/batch", post(handlers::predict_batch).fallback(wrong_method))
        .route("/historical", post(handlers::historical).fallback(wrong_method));

    Router::new()
        .route("/", get(handlers::root).fallback(wrong_method))
        .route("/stations", get(handlers::stations).fallback(wrong_method))
        .route("/metrics", get(handlers::model_metrics).fallback(wrong_method))
        .nest("/api/v1", api)
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
