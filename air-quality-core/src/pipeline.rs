//! Prediction pipeline: validate → predict → classify → assemble.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::assembler::{assemble_prediction, BatchPredictionResponse, PredictionResponse};
use crate::climate::{ClimateData, ValidatedClimate};
use crate::error::AirQualityError;
use crate::predictor::{self, Predictor};
use crate::store::HistoricalStore;
use crate::validation::ValidationErrors;

// ------------------------------------------------------------------ //
//  Requests                                                           //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub cidade: Option<String>,
    pub dados_climaticos: ClimateData,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub data_predicao: Option<NaiveDate>,
    #[serde(default)]
    pub incluir_historico: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchPredictionRequest {
    #[serde(default)]
    pub cidade: Option<String>,
    pub dados_climaticos: Vec<ClimateData>,
    /// When present, `datas_predicao[i]` pairs with `dados_climaticos[i]`.
    #[serde(default)]
    pub datas_predicao: Option<Vec<NaiveDate>>,
}

// ------------------------------------------------------------------ //
//  Pipeline                                                           //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub default_city: String,
    pub predictor_timeout: Duration,
    pub max_batch_size: usize,
    /// Upper bound on concurrent predictor calls inside one batch.
    pub batch_concurrency: usize,
    /// Days of history attached when `incluir_historico` is set, ending on
    /// the target date.
    pub history_window_days: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_city: "São Paulo".to_string(),
            predictor_timeout: Duration::from_secs(5),
            max_batch_size: 100,
            batch_concurrency: 8,
            history_window_days: 7,
        }
    }
}

pub struct PredictionPipeline {
    predictor: Arc<dyn Predictor>,
    store: Arc<dyn HistoricalStore>,
    config: PipelineConfig,
}

impl PredictionPipeline {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        store: Arc<dyn HistoricalStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            predictor,
            store,
            config,
        }
    }

    pub fn predictor(&self) -> &Arc<dyn Predictor> {
        &self.predictor
    }

    pub fn store(&self) -> &Arc<dyn HistoricalStore> {
        &self.store
    }

    fn resolve_city(&self, cidade: Option<&str>) -> Result<String, AirQualityError> {
        match cidade.map(str::trim) {
            None | Some("") => Ok(self.config.default_city.clone()),
            Some(c) if c.chars().count() < 2 => Err(AirQualityError::unprocessable(
                "cidade",
                "must have at least 2 characters",
            )),
            Some(c) => Ok(c.to_string()),
        }
    }

    /// Single prediction.
    pub async fn predict(
        &self,
        req: &PredictionRequest,
    ) -> Result<PredictionResponse, AirQualityError> {
        let city = self.resolve_city(req.cidade.as_deref())?;
        let climate = req.dados_climaticos.validate().map_err(|e| {
            warn!(city = %city, fields = e.len(), "prediction rejected by validation");
            e
        })?;
        let date = req.data_predicao.unwrap_or_else(|| Utc::now().date_naive());
        info!(city = %city, %date, "prediction accepted");

        let mut response = predict_one(
            self.predictor.as_ref(),
            &city,
            &climate,
            date,
            self.config.predictor_timeout,
        )
        .await?;

        if req.incluir_historico {
            let span = self.config.history_window_days.saturating_sub(1);
            let start = date.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);
            let records = self.store.query_range(&city, start, date).await.map_err(|e| {
                error!(error = %e, city = %city, "history lookup failed");
                e
            })?;
            response.historico = Some(records);
        }

        Ok(response)
    }

    /// Batch prediction, all-or-nothing.
    ///
    /// Every item is validated before any prediction runs, and violations are
    /// reported together under `dados_climaticos[i].<field>`. Items are then
    /// predicted concurrently (bounded by `batch_concurrency`); the first
    /// failure aborts the remaining work. Output order matches input order.
    pub async fn predict_batch(
        &self,
        req: &BatchPredictionRequest,
    ) -> Result<BatchPredictionResponse, AirQualityError> {
        let started = Instant::now();
        let city = self.resolve_city(req.cidade.as_deref())?;
        let n = req.dados_climaticos.len();

        if n == 0 || n > self.config.max_batch_size {
            return Err(AirQualityError::unprocessable(
                "dados_climaticos",
                format!("batch must contain between 1 and {} items (got {n})", self.config.max_batch_size),
            ));
        }

        let dates: Vec<NaiveDate> = match &req.datas_predicao {
            Some(dates) if dates.len() != n => {
                return Err(AirQualityError::unprocessable(
                    "datas_predicao",
                    format!("length {} does not match dados_climaticos length {n}", dates.len()),
                ));
            }
            Some(dates) => dates.clone(),
            None => vec![Utc::now().date_naive(); n],
        };

        let mut errors = ValidationErrors::new();
        let mut validated: Vec<ValidatedClimate> = Vec::with_capacity(n);
        for (i, item) in req.dados_climaticos.iter().enumerate() {
            match item.validate_prefixed(&format!("dados_climaticos[{i}].")) {
                Ok(v) => validated.push(v),
                Err(e) => errors.extend(e),
            }
        }
        errors.into_result().map_err(|e| {
            warn!(city = %city, items = n, fields = e.len(), "batch rejected by validation");
            e
        })?;

        info!(city = %city, items = n, "batch accepted");

        let permits = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
        let mut set = JoinSet::new();
        for (index, (climate, date)) in validated.into_iter().zip(dates).enumerate() {
            let predictor = Arc::clone(&self.predictor);
            let permits = Arc::clone(&permits);
            let city = city.clone();
            let timeout = self.config.predictor_timeout;
            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| AirQualityError::Internal(e.to_string()))?;
                let resp = predict_one(predictor.as_ref(), &city, &climate, date, timeout).await;
                resp.map(|r| (index, r)).map_err(|e| AirQualityError::BatchItem {
                    index,
                    source: Box::new(e),
                })
            });
        }

        let mut slots: Vec<Option<PredictionResponse>> = vec![None; n];
        while let Some(joined) = set.join_next().await {
            let (index, resp) = joined.map_err(|e| AirQualityError::Internal(e.to_string()))??;
            slots[index] = Some(resp);
        }

        let predicoes: Vec<PredictionResponse> = slots.into_iter().flatten().collect();
        if predicoes.len() != n {
            return Err(AirQualityError::Internal("batch finished with missing items".into()));
        }

        let elapsed = started.elapsed().as_secs_f64();
        info!(city = %city, items = n, elapsed_secs = elapsed, "batch complete");

        Ok(BatchPredictionResponse {
            cidade: city,
            total_predicoes: n,
            predicoes,
            tempo_processamento: (elapsed * 1000.0).round() / 1000.0,
        })
    }
}

async fn predict_one(
    predictor: &dyn Predictor,
    city: &str,
    climate: &ValidatedClimate,
    date: NaiveDate,
    timeout: Duration,
) -> Result<PredictionResponse, AirQualityError> {
    let raw = predictor::invoke(predictor, city, climate, date, timeout)
        .await
        .map_err(|e| {
            error!(error = %e, city = %city, %date, "predictor failed");
            e
        })?;
    let version = predictor.info().version;
    assemble_prediction(city, date, &raw, &version, Utc::now())
}
