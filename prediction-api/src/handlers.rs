//! Axum HTTP handlers for the prediction API.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use air_quality_core::{
    assembler::{BatchPredictionResponse, PredictionResponse},
    historical::query_history,
    BatchPredictionRequest, HistoricalQuery, HistoricalResponse, PredictionRequest,
};
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    error::ApiError,
    models::{
        Components, DetailedHealthResponse, HealthResponse, HealthStatus, LivenessResponse,
        ModelComponent, ReadinessResponse, RootResponse, StationsResponse, StoreComponent,
        SystemMetrics,
    },
    AppState,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

// ------------------------------------------------------------------ //
//  GET /                                                              //
// ------------------------------------------------------------------ //

pub async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    Json(RootResponse {
        nome: state.settings.app_name.clone(),
        versao: state.settings.app_version.clone(),
        docs: "README.md",
        health: "/api/v1/health",
    })
}

// ------------------------------------------------------------------ //
//  Health                                                             //
// ------------------------------------------------------------------ //

/// Result of one store ping: elapsed milliseconds or the failure message.
async fn probe_store(state: &AppState) -> Result<f64, String> {
    let started = Instant::now();
    match state.pipeline.store().ping().await {
        Ok(()) => Ok(started.elapsed().as_secs_f64() * 1000.0),
        Err(e) => {
            warn!(error = %e, backend = state.pipeline.store().backend(), "store ping failed");
            Err(e.to_string())
        }
    }
}

fn basic_health(state: &AppState, store_ok: bool) -> HealthResponse {
    let model_loaded = state.pipeline.predictor().is_loaded();
    HealthResponse {
        status: if model_loaded && store_ok {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        timestamp: Utc::now(),
        versao: state.settings.app_version.clone(),
        modelo_carregado: model_loaded,
        banco_conectado: store_ok,
        uptime: state.uptime_secs(),
    }
}

fn up_down(ok: bool) -> &'static str {
    if ok {
        "up"
    } else {
        "down"
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store_ok = probe_store(&state).await.is_ok();
    Json(basic_health(&state, store_ok))
}

pub async fn health_detailed(State(state): State<Arc<AppState>>) -> Json<DetailedHealthResponse> {
    let probe = probe_store(&state).await;
    let basic = basic_health(&state, probe.is_ok());
    let predictor = state.pipeline.predictor();

    let componentes = Components {
        modelo: ModelComponent {
            info: predictor.info(),
            status: up_down(predictor.is_loaded()),
        },
        banco_dados: StoreComponent {
            backend: state.pipeline.store().backend(),
            status: up_down(probe.is_ok()),
            latencia_ms: probe.as_ref().ok().map(|ms| (ms * 1000.0).round() / 1000.0),
            erro: probe.err(),
        },
    };

    let metricas_sistema = SystemMetrics {
        pid: std::process::id(),
        cpus: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        uptime: basic.uptime,
    };

    Json(DetailedHealthResponse {
        basic,
        componentes,
        metricas_sistema,
    })
}

pub async fn health_ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let model_ok = state.pipeline.predictor().is_loaded();
    let store_ok = probe_store(&state).await.is_ok();
    let ready = model_ok && store_ok;

    let body = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" },
        modelo: up_down(model_ok),
        banco_dados: up_down(store_ok),
        timestamp: Utc::now(),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

pub async fn health_live() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive",
        timestamp: Utc::now(),
    })
}

// ------------------------------------------------------------------ //
//  POST /api/v1/predict                                               //
// ------------------------------------------------------------------ //

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> ApiResult<PredictionResponse> {
    let Json(req) = payload?;
    let resp = state.pipeline.predict(&req).await?;
    info!(
        city = %resp.cidade,
        quality = %resp.qualidade_geral,
        index = resp.indice_qualidade,
        "POST /predict processed"
    );
    Ok(Json(resp))
}

// ------------------------------------------------------------------ //
//  POST /api/v1/predict/batch                                         //
// ------------------------------------------------------------------ //

pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchPredictionRequest>, JsonRejection>,
) -> ApiResult<BatchPredictionResponse> {
    let Json(req) = payload?;
    let resp = state.pipeline.predict_batch(&req).await?;
    Ok(Json(resp))
}

// ------------------------------------------------------------------ //
//  POST /api/v1/historical                                            //
// ------------------------------------------------------------------ //

pub async fn historical(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<HistoricalQuery>, JsonRejection>,
) -> ApiResult<HistoricalResponse> {
    let Json(query) = payload?;
    let resp = query_history(state.pipeline.store().as_ref(), &query).await?;
    Ok(Json(resp))
}

// ------------------------------------------------------------------ //
//  GET /stations                                                      //
// ------------------------------------------------------------------ //

pub async fn stations(State(state): State<Arc<AppState>>) -> ApiResult<StationsResponse> {
    let estacoes = state
        .pipeline
        .store()
        .list_stations()
        .await
        .map_err(air_quality_core::AirQualityError::from)?;
    Ok(Json(StationsResponse {
        total: estacoes.len(),
        estacoes,
    }))
}

// ------------------------------------------------------------------ //
//  GET /metrics                                                       //
// ------------------------------------------------------------------ //

/// Serve the metadata file written next to the production model.
pub async fn model_metrics(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let path = Path::new(&state.settings.model_path).join("model.metadata.json");
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("model metadata not found".to_string()));
        }
        Err(e) => {
            return Err(ApiError::Internal(format!("reading {}: {e}", path.display())));
        }
    };
    let value = serde_json::from_str(&raw)
        .map_err(|e| ApiError::Internal(format!("parsing {}: {e}", path.display())))?;
    Ok(Json(value))
}

// ------------------------------------------------------------------ //
//  Fallback                                                           //
// ------------------------------------------------------------------ //

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("route {} not found", uri.path()))
}

/// Route matched but the verb is not served there.
pub async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::MethodNotAllowed {
        method,
        path: uri.path().to_string(),
    }
}
