//! Deterministic rule model used when no remote scoring service is configured.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{ModelInfo, Predictor, PredictorError, RawPrediction};
use crate::climate::ValidatedClimate;
use crate::pollutant::Pollutant;

const PM25_BASE: f64 = 20.0;
const PM25_FLOOR: f64 = 5.0;
const PM10_RATIO: f64 = 1.8;
const NO2_RATIO: f64 = 1.4;

/// Estimates PM2.5 from simple climate heuristics and derives PM10 and NO2
/// from it.
#[derive(Debug, Clone)]
pub struct RulePredictor {
    version: String,
}

impl RulePredictor {
    pub fn new() -> Self {
        Self {
            version: "1.0.0".to_string(),
        }
    }

    pub fn estimate_pm25(climate: &ValidatedClimate) -> f64 {
        let mut pm25 = PM25_BASE;

        let t = climate.temperatura();
        if t > 30.0 {
            pm25 += 10.0;
        } else if t < 15.0 {
            pm25 += 5.0;
        }

        let h = climate.umidade();
        if h < 40.0 {
            pm25 += 8.0;
        } else if h > 80.0 {
            pm25 -= 3.0;
        }

        let wind = climate.vento_velocidade();
        if wind > 20.0 {
            pm25 -= 5.0;
        } else if wind < 5.0 {
            pm25 += 7.0;
        }

        // rain washout
        if climate.precipitacao() > 5.0 {
            pm25 -= 10.0;
        }

        pm25.max(PM25_FLOOR)
    }
}

impl Default for RulePredictor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Predictor for RulePredictor {
    async fn predict(
        &self,
        _city: &str,
        climate: &ValidatedClimate,
        _date: NaiveDate,
    ) -> Result<RawPrediction, PredictorError> {
        let pm25 = Self::estimate_pm25(climate);
        Ok(RawPrediction::default()
            .with(Pollutant::Pm25, pm25, 0.80)
            .with(Pollutant::Pm10, pm25 * PM10_RATIO, 0.75)
            .with(Pollutant::No2, pm25 * NO2_RATIO, 0.70))
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: "rule_model".to_string(),
            version: self.version.clone(),
            features: crate::climate::CLIMATE_RANGES
                .iter()
                .map(|r| r.field.to_string())
                .collect(),
        }
    }
}
