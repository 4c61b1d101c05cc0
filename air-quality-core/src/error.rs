//! Error taxonomy shared by every pipeline stage.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::predictor::PredictorError;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// One or more climate fields missing or out of range.
    Validation,
    /// Request is well-formed JSON but structurally unacceptable.
    Unprocessable,
    /// Predictor or store could not serve the request.
    Unavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum AirQualityError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{message}")]
    Unprocessable {
        message: String,
        details: BTreeMap<String, String>,
    },

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failure of one item inside a batch; carries the item position.
    #[error("batch item {index}: {source}")]
    BatchItem {
        index: usize,
        #[source]
        source: Box<AirQualityError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AirQualityError {
    pub fn unprocessable(field: &str, issue: impl Into<String>) -> Self {
        let issue = issue.into();
        let mut details = BTreeMap::new();
        details.insert(field.to_string(), issue.clone());
        AirQualityError::Unprocessable {
            message: format!("{field}: {issue}"),
            details,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AirQualityError::Validation(_) => ErrorKind::Validation,
            AirQualityError::Unprocessable { .. } => ErrorKind::Unprocessable,
            AirQualityError::Predictor(e) if e.is_unavailable() => ErrorKind::Unavailable,
            AirQualityError::Predictor(_) => ErrorKind::Internal,
            AirQualityError::Store(e) if e.is_unavailable() => ErrorKind::Unavailable,
            AirQualityError::Store(_) => ErrorKind::Internal,
            AirQualityError::BatchItem { source, .. } => source.kind(),
            AirQualityError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Field → issue pairs for the error envelope. Empty when the error is not
    /// tied to specific fields.
    pub fn details(&self) -> BTreeMap<String, String> {
        match self {
            AirQualityError::Validation(errs) => errs.details(),
            AirQualityError::Unprocessable { details, .. } => details.clone(),
            AirQualityError::BatchItem { index, source } => {
                let mut details = source.details();
                details.insert("item".to_string(), index.to_string());
                details
            }
            _ => BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Issue;

    #[test]
    fn validation_kind_and_details() {
        let mut errs = ValidationErrors::new();
        errs.push("temperatura", Issue::OutOfRange { value: 70.0, min: -50.0, max: 60.0 });
        let err = AirQualityError::from(errs);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.details()["temperatura"], "must be between -50 and 60");
    }

    #[test]
    fn model_and_database_outages_are_unavailable_with_distinct_messages() {
        let model = AirQualityError::from(PredictorError::NotLoaded);
        let db = AirQualityError::from(StoreError::Unavailable("connection refused".into()));
        assert_eq!(model.kind(), ErrorKind::Unavailable);
        assert_eq!(db.kind(), ErrorKind::Unavailable);
        assert!(model.to_string().contains("model not loaded"));
        assert!(db.to_string().contains("database unreachable"));
    }

    #[test]
    fn batch_item_inherits_kind_and_reports_index() {
        let err = AirQualityError::BatchItem {
            index: 3,
            source: Box::new(PredictorError::Timeout(5000).into()),
        };
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.to_string().starts_with("batch item 3:"));
        assert_eq!(err.details()["item"], "3");
    }

    #[test]
    fn malformed_predictor_output_is_internal() {
        let err = AirQualityError::from(PredictorError::InvalidResponse("bad".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
