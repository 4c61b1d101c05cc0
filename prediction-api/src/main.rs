//! Air-quality prediction service: HTTP entry point.
//!
//! Storage is PostgreSQL when `AIRQ_DATABASE_URL` is set and a seeded
//! in-memory store otherwise. Predictions come from the remote scoring service
//! at `AIRQ_PREDICTOR_URL` when set, or from the built-in rule model.

use std::sync::Arc;

use air_quality_core::{
    predictor::{RemotePredictor, RulePredictor},
    store::{InMemoryStore, PgHistoricalStore},
    HistoricalStore, PredictionPipeline, Predictor,
};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use prediction_api::{config::Settings, router, AppState};
use tracing::info;

async fn build_store(settings: &Settings) -> Result<Arc<dyn HistoricalStore>> {
    match settings.database_url.as_deref() {
        Some(url) => {
            let store = PgHistoricalStore::connect(url).await?;
            store.migrate().await?;
            info!("PostgreSQL historical store connected");
            Ok(Arc::new(store))
        }
        None => {
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid seed start date")?;
            let store = InMemoryStore::seeded_between(start, Utc::now().date_naive());
            info!("no database configured, using seeded in-memory store");
            Ok(Arc::new(store))
        }
    }
}

fn build_predictor(settings: &Settings) -> Result<Arc<dyn Predictor>> {
    match settings.predictor_url.as_deref() {
        Some(url) => {
            let remote =
                RemotePredictor::new(url, settings.app_version.clone(), settings.predictor_timeout())?;
            info!(url, "using remote scoring service");
            Ok(Arc::new(remote))
        }
        None => {
            info!("no predictor configured, using rule model");
            Ok(Arc::new(RulePredictor::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("prediction_api=info".parse()?),
        )
        .json()
        .init();

    let settings = Settings::load()?;

    let store = build_store(&settings).await?;
    let predictor = build_predictor(&settings)?;
    let model = predictor.info();
    info!(
        model = %model.name,
        version = %model.version,
        store = store.backend(),
        "prediction pipeline ready"
    );

    let pipeline = PredictionPipeline::new(predictor, store, settings.pipeline_config());
    let bind_addr = settings.bind_addr.clone();
    let app = router(Arc::new(AppState::new(pipeline, settings)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = bind_addr, "prediction-api listening");

    axum::serve(listener, app).await?;

    Ok(())
}
