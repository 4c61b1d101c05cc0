//! Predictor trait and the adapter boundary around it.
//!
//! The pipeline never looks inside a model: anything that maps validated
//! climate inputs to per-pollutant estimates and confidences can be plugged in.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::climate::ValidatedClimate;
use crate::pollutant::Pollutant;

mod remote;
mod rules;

pub use remote::RemotePredictor;
pub use rules::RulePredictor;

// ------------------------------------------------------------------ //
//  Domain types                                                       //
// ------------------------------------------------------------------ //

/// Raw output of a predictor: an estimate and a confidence per pollutant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPrediction {
    pub values: BTreeMap<Pollutant, f64>,
    /// Missing entries are treated as confidence 0.
    pub confidences: BTreeMap<Pollutant, f64>,
}

impl RawPrediction {
    pub fn with(mut self, pollutant: Pollutant, value: f64, confidence: f64) -> Self {
        self.values.insert(pollutant, value);
        self.confidences.insert(pollutant, confidence);
        self
    }
}

/// Descriptive metadata about the model behind a predictor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("service unavailable: model not loaded")]
    NotLoaded,
    #[error("service unavailable: prediction model did not answer within {0} ms")]
    Timeout(u64),
    #[error("service unavailable: prediction model unreachable: {0}")]
    Unavailable(String),
    #[error("prediction model returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl PredictorError {
    /// True for outages, false for a predictor that answered with garbage.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, PredictorError::InvalidResponse(_))
    }
}

// ------------------------------------------------------------------ //
//  Trait                                                              //
// ------------------------------------------------------------------ //

#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(
        &self,
        city: &str,
        climate: &ValidatedClimate,
        date: NaiveDate,
    ) -> Result<RawPrediction, PredictorError>;

    /// Whether the predictor can currently serve requests.
    fn is_loaded(&self) -> bool {
        true
    }

    fn info(&self) -> ModelInfo;
}

/// Run one prediction with a deadline. An expired deadline or an unloaded
/// model surface as service-unavailable errors.
pub async fn invoke(
    predictor: &dyn Predictor,
    city: &str,
    climate: &ValidatedClimate,
    date: NaiveDate,
    timeout: Duration,
) -> Result<RawPrediction, PredictorError> {
    if !predictor.is_loaded() {
        return Err(PredictorError::NotLoaded);
    }
    match tokio::time::timeout(timeout, predictor.predict(city, climate, date)).await {
        Ok(result) => result,
        Err(_) => Err(PredictorError::Timeout(timeout.as_millis() as u64)),
    }
}

// ------------------------------------------------------------------ //
//  FakePredictor (for tests)                                          //
// ------------------------------------------------------------------ //

/// A recorded call to [`FakePredictor`].
#[derive(Debug, Clone, PartialEq)]
pub struct PredictCall {
    pub city: String,
    pub temperatura: f64,
    pub date: NaiveDate,
}

/// Scripted predictor for tests: returns fixed output (or a fixed error),
/// optionally after a delay, and records every call.
#[derive(Debug, Clone)]
pub struct FakePredictor {
    output: RawPrediction,
    failure: Option<PredictorError>,
    delay: Option<Duration>,
    loaded: bool,
    echo: bool,
    pub calls: Arc<Mutex<Vec<PredictCall>>>,
}

impl FakePredictor {
    pub fn new(output: RawPrediction) -> Self {
        Self {
            output,
            failure: None,
            delay: None,
            loaded: true,
            echo: false,
            calls: Arc::default(),
        }
    }

    /// Output where PM2.5 echoes the input temperature, which makes the
    /// mapping between batch inputs and outputs observable.
    pub fn echo_temperature() -> Self {
        Self {
            echo: true,
            ..Self::new(RawPrediction::default())
        }
    }

    pub fn failing(error: PredictorError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(RawPrediction::default())
        }
    }

    pub fn unloaded() -> Self {
        Self {
            loaded: false,
            ..Self::new(RawPrediction::default())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Non-destructive snapshot of the calls received so far.
    pub fn snapshot(&self) -> Vec<PredictCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Predictor for FakePredictor {
    async fn predict(
        &self,
        city: &str,
        climate: &ValidatedClimate,
        date: NaiveDate,
    ) -> Result<RawPrediction, PredictorError> {
        self.calls.lock().unwrap().push(PredictCall {
            city: city.to_string(),
            temperatura: climate.temperatura(),
            date,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.echo {
            return Ok(RawPrediction::default().with(Pollutant::Pm25, climate.temperatura(), 0.9));
        }
        Ok(self.output.clone())
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: "fake".to_string(),
            version: "test".to_string(),
            features: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::ClimateData;

    fn climate() -> ValidatedClimate {
        ClimateData {
            temperatura: Some(25.0),
            umidade: Some(60.0),
            vento_velocidade: Some(10.0),
            precipitacao: Some(0.0),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn invoke_passes_through_output() {
        let fake = FakePredictor::echo_temperature();
        let out = invoke(&fake, "Santos", &climate(), date(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out.values[&Pollutant::Pm25], 25.0);
        assert_eq!(fake.snapshot()[0].city, "Santos");
    }

    #[tokio::test]
    async fn scripted_output_is_returned_verbatim() {
        let empty = FakePredictor::new(RawPrediction::default());
        let out = invoke(&empty, "Santos", &climate(), date(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(out.values.is_empty());

        let scripted = RawPrediction::default().with(Pollutant::O3, 80.0, 0.6);
        let fake = FakePredictor::new(scripted.clone());
        let out = invoke(&fake, "Santos", &climate(), date(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out, scripted);
    }

    #[tokio::test]
    async fn unloaded_model_is_not_called() {
        let fake = FakePredictor::unloaded();
        let err = invoke(&fake, "Santos", &climate(), date(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, PredictorError::NotLoaded);
        assert!(fake.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_predictor_times_out() {
        let fake = FakePredictor::echo_temperature().with_delay(Duration::from_secs(30));
        let err = invoke(&fake, "Santos", &climate(), date(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err, PredictorError::Timeout(200));
        assert!(err.is_unavailable());
    }

    #[test]
    fn invalid_response_is_not_an_outage() {
        assert!(!PredictorError::InvalidResponse("x".into()).is_unavailable());
        assert!(PredictorError::Unavailable("x".into()).is_unavailable());
    }
}
