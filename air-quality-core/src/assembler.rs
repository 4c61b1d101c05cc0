//! Response assembly: turns raw predictor output into the wire response.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::AirQualityError;
use crate::historical::HistoricalRecord;
use crate::pollutant::Pollutant;
use crate::predictor::RawPrediction;
use crate::quality::{self, QualityLevel};

// ------------------------------------------------------------------ //
//  Wire types                                                         //
// ------------------------------------------------------------------ //

/// Classified estimate for one pollutant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantResult {
    pub valor: f64,
    pub unidade: &'static str,
    pub nivel_qualidade: QualityLevel,
    /// Always within `[0, 1]`.
    pub confianca: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub cidade: String,
    pub data_predicao: NaiveDate,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub poluentes: BTreeMap<Pollutant, PollutantResult>,
    /// Worst level among the reported pollutants.
    pub qualidade_geral: QualityLevel,
    pub indice_qualidade: f64,
    pub modelo_versao: String,
    /// Mean of the per-pollutant confidences.
    pub confianca_geral: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historico: Option<Vec<HistoricalRecord>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchPredictionResponse {
    pub cidade: String,
    pub total_predicoes: usize,
    pub predicoes: Vec<PredictionResponse>,
    /// Wall-clock seconds spent on the whole batch.
    pub tempo_processamento: f64,
}

// ------------------------------------------------------------------ //
//  Assembly                                                           //
// ------------------------------------------------------------------ //

fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

fn clamp_confidence(pollutant: Pollutant, raw: f64) -> f64 {
    if raw.is_nan() {
        warn!(%pollutant, "predictor returned NaN confidence, using 0");
        return 0.0;
    }
    let clamped = raw.clamp(0.0, 1.0);
    if clamped != raw {
        warn!(%pollutant, confidence = raw, "confidence outside [0, 1], clamped");
    }
    clamped
}

/// Build a single prediction response from predictor output.
///
/// Fails with an internal error when the predictor returned no estimates or a
/// non-finite estimate; such output cannot be classified.
pub fn assemble_prediction(
    city: &str,
    date: NaiveDate,
    raw: &RawPrediction,
    model_version: &str,
    generated_at: DateTime<Utc>,
) -> Result<PredictionResponse, AirQualityError> {
    if raw.values.is_empty() {
        return Err(AirQualityError::Internal(
            "predictor returned no pollutant estimates".into(),
        ));
    }
    if let Some((p, v)) = raw.values.iter().find(|(_, v)| !v.is_finite()) {
        return Err(AirQualityError::Internal(format!(
            "predictor returned non-finite estimate for {p}: {v}"
        )));
    }

    let poluentes: BTreeMap<Pollutant, PollutantResult> = raw
        .values
        .iter()
        .map(|(p, v)| {
            let confianca = clamp_confidence(*p, raw.confidences.get(p).copied().unwrap_or(0.0));
            let result = PollutantResult {
                valor: round_to(*v, 2),
                unidade: p.unit(),
                nivel_qualidade: quality::classify(*p, *v),
                confianca,
            };
            (*p, result)
        })
        .collect();

    let qualidade_geral = quality::worst_level(poluentes.values().map(|r| r.nivel_qualidade))
        .unwrap_or(QualityLevel::Excelente);
    let indice = quality::aggregate_index(raw.values.iter().map(|(p, v)| (*p, *v))).unwrap_or(0.0);
    let confianca_geral =
        poluentes.values().map(|r| r.confianca).sum::<f64>() / poluentes.len() as f64;

    Ok(PredictionResponse {
        cidade: city.to_string(),
        data_predicao: date,
        timestamp: generated_at,
        poluentes,
        qualidade_geral,
        indice_qualidade: round_to(indice, 1),
        modelo_versao: model_version.to_string(),
        confianca_geral: round_to(confianca_geral, 3),
        historico: None,
    })
}
