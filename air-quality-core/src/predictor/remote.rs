//! Remote scoring service client.
//!
//! POSTs `{cidade, data, dados_climaticos}` as JSON and expects
//! `{valores: {pollutant: f64}, confiancas: {pollutant: f64}}` back.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ModelInfo, Predictor, PredictorError, RawPrediction};
use crate::climate::ValidatedClimate;
use crate::pollutant::Pollutant;

pub struct RemotePredictor {
    url: String,
    version: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    cidade: &'a str,
    data: NaiveDate,
    dados_climaticos: &'a ValidatedClimate,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    valores: BTreeMap<String, f64>,
    #[serde(default)]
    confiancas: BTreeMap<String, f64>,
}

impl RemotePredictor {
    /// Build a client for the scoring service at `url`. `timeout` bounds each
    /// HTTP exchange.
    pub fn new(
        url: impl Into<String>,
        version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PredictorError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PredictorError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            version: version.into(),
            http,
        })
    }
}

fn parse_pollutant_map(
    map: BTreeMap<String, f64>,
) -> Result<BTreeMap<Pollutant, f64>, PredictorError> {
    map.into_iter()
        .map(|(key, value)| {
            let pollutant = key
                .parse::<Pollutant>()
                .map_err(|e| PredictorError::InvalidResponse(e.to_string()))?;
            Ok((pollutant, value))
        })
        .collect()
}

fn into_raw(resp: ScoreResponse) -> Result<RawPrediction, PredictorError> {
    let values = parse_pollutant_map(resp.valores)?;
    let confidences = parse_pollutant_map(resp.confiancas)?;
    if values.is_empty() {
        return Err(PredictorError::InvalidResponse("no pollutant estimates in response".into()));
    }
    Ok(RawPrediction { values, confidences })
}

#[async_trait]
impl Predictor for RemotePredictor {
    async fn predict(
        &self,
        city: &str,
        climate: &ValidatedClimate,
        date: NaiveDate,
    ) -> Result<RawPrediction, PredictorError> {
        let body = ScoreRequest {
            cidade: city,
            data: date,
            dados_climaticos: climate,
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PredictorError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PredictorError::Unavailable(format!(
                "scoring service returned status {}",
                resp.status()
            )));
        }

        let parsed: ScoreResponse = resp
            .json()
            .await
            .map_err(|e| PredictorError::InvalidResponse(e.to_string()))?;

        into_raw(parsed)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: format!("remote:{}", self.url),
            version: self.version.clone(),
            features: crate::climate::CLIMATE_RANGES
                .iter()
                .map(|r| r.field.to_string())
                .collect(),
        }
    }
}
