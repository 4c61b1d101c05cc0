//! HistoricalStore trait and implementations.
//!
//! Writes are owned by an external ingestion pipeline; this side only reads.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::historical::HistoricalRecord;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgHistoricalStore;

// ------------------------------------------------------------------ //
//  Domain types                                                       //
// ------------------------------------------------------------------ //

/// A monitoring station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("service unavailable: database unreachable: {0}")]
    Unavailable(String),
    #[error("database query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Case-insensitive key for city matching.
pub fn city_key(city: &str) -> String {
    city.trim().to_lowercase()
}

// ------------------------------------------------------------------ //
//  Trait                                                              //
// ------------------------------------------------------------------ //

#[async_trait]
pub trait HistoricalStore: Send + Sync {
    /// Records for `city` with `start <= date <= end`, ascending by date.
    async fn query_range(
        &self,
        city: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalRecord>, StoreError>;

    async fn list_stations(&self) -> Result<Vec<Station>, StoreError>;

    /// Cheap reachability check used by health endpoints.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_key_ignores_case_and_padding() {
        assert_eq!(city_key("  São Paulo "), city_key("são paulo"));
    }

    #[test]
    fn only_unavailable_is_an_outage() {
        assert!(StoreError::Unavailable("x".into()).is_unavailable());
        assert!(!StoreError::Query("x".into()).is_unavailable());
    }
}
