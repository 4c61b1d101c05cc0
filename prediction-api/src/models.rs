//! HTTP response models that have no counterpart in the core crate.
//!
//! Prediction and historical bodies come straight from `air_quality_core`.

use air_quality_core::{ModelInfo, Station};
use chrono::{DateTime, Utc};
use serde::Serialize;

// ------------------------------------------------------------------ //
//  Service info                                                       //
// ------------------------------------------------------------------ //

/// Body of `GET /`.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub nome: String,
    pub versao: String,
    pub docs: &'static str,
    pub health: &'static str,
}

// ------------------------------------------------------------------ //
//  Health                                                             //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub versao: String,
    pub modelo_carregado: bool,
    pub banco_conectado: bool,
    /// Seconds since start-up.
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct ModelComponent {
    #[serde(flatten)]
    pub info: ModelInfo,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StoreComponent {
    pub backend: &'static str,
    pub status: &'static str,
    pub latencia_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erro: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Components {
    pub modelo: ModelComponent,
    pub banco_dados: StoreComponent,
}

#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub pid: u32,
    pub cpus: usize,
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    #[serde(flatten)]
    pub basic: HealthResponse,
    pub componentes: Components,
    pub metricas_sistema: SystemMetrics,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub modelo: &'static str,
    pub banco_dados: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

// ------------------------------------------------------------------ //
//  Stations                                                           //
// ------------------------------------------------------------------ //

#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub total: usize,
    pub estacoes: Vec<Station>,
}
