//! Air-quality prediction contract.
//!
//! Validates climate inputs, hands them to a pluggable predictor, classifies
//! the returned pollutant concentrations and assembles single or batch
//! responses. Historical queries run against a pluggable store.
//!
//! The HTTP surface lives in the `prediction-api` crate; everything here is
//! transport-agnostic.

pub mod assembler;
pub mod climate;
pub mod error;
pub mod historical;
pub mod pipeline;
pub mod pollutant;
pub mod predictor;
pub mod quality;
pub mod store;
pub mod validation;

pub use climate::{ClimateData, ValidatedClimate};
pub use error::{AirQualityError, ErrorKind};
pub use historical::{HistoricalQuery, HistoricalRecord, HistoricalResponse};
pub use pipeline::{BatchPredictionRequest, PipelineConfig, PredictionPipeline, PredictionRequest};
pub use pollutant::Pollutant;
pub use predictor::{ModelInfo, Predictor, PredictorError, RawPrediction};
pub use quality::QualityLevel;
pub use store::{HistoricalStore, Station, StoreError};
pub use validation::{FieldViolation, ValidationErrors};
