//! PostgreSQL-backed historical store.
//!
//! Uses [`sqlx`] against two tables, `historical_records` (one row per city
//! and day) and `stations`. Rows are written by the ingestion pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use tracing::info;

use super::{HistoricalStore, Station, StoreError};
use crate::climate::ClimateData;
use crate::historical::HistoricalRecord;
use crate::pollutant::Pollutant;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Shared connection pool.
pub struct PgHistoricalStore {
    pool: PgPool,
}

impl PgHistoricalStore {
    /// Connect to PostgreSQL using the supplied `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to connect to PostgreSQL: {e}")))?;

        Ok(Self { pool })
    }

    /// Create the tables if they don't exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS historical_records (
                id                  BIGSERIAL PRIMARY KEY,
                city                TEXT NOT NULL,
                record_date         DATE NOT NULL,
                pm25                DOUBLE PRECISION,
                pm10                DOUBLE PRECISION,
                no2                 DOUBLE PRECISION,
                o3                  DOUBLE PRECISION,
                co                  DOUBLE PRECISION,
                so2                 DOUBLE PRECISION,
                temperatura         DOUBLE PRECISION,
                umidade             DOUBLE PRECISION,
                vento_velocidade    DOUBLE PRECISION,
                vento_direcao       DOUBLE PRECISION,
                precipitacao        DOUBLE PRECISION,
                pressao_atmosferica DOUBLE PRECISION,
                UNIQUE (city, record_date)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS historical_records_city_date
                ON historical_records (lower(city), record_date)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stations (
                id        INTEGER PRIMARY KEY,
                name      TEXT NOT NULL,
                latitude  DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                city      TEXT NOT NULL,
                state     TEXT NOT NULL,
                country   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("historical store schema ready");
        Ok(())
    }
}

fn record_from_row(row: &PgRow) -> Result<HistoricalRecord, sqlx::Error> {
    let mut poluentes = BTreeMap::new();
    for p in Pollutant::ALL {
        if let Some(v) = row.try_get::<Option<f64>, _>(p.as_str())? {
            poluentes.insert(p, v);
        }
    }

    let clima = ClimateData {
        temperatura: row.try_get("temperatura")?,
        umidade: row.try_get("umidade")?,
        vento_velocidade: row.try_get("vento_velocidade")?,
        vento_direcao: row.try_get("vento_direcao")?,
        precipitacao: row.try_get("precipitacao")?,
        pressao_atmosferica: row.try_get("pressao_atmosferica")?,
    };

    Ok(HistoricalRecord::new(row.try_get("record_date")?, poluentes, clima))
}

#[async_trait]
impl HistoricalStore for PgHistoricalStore {
    async fn query_range(
        &self,
        city: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT record_date, pm25, pm10, no2, o3, co, so2,
                   temperatura, umidade, vento_velocidade, vento_direcao,
                   precipitacao, pressao_atmosferica
            FROM historical_records
            WHERE lower(city) = lower($1)
              AND record_date BETWEEN $2 AND $3
            ORDER BY record_date ASC
            "#,
        )
        .bind(city.trim())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn list_stations(&self) -> Result<Vec<Station>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, latitude, longitude, city, state, country
            FROM stations
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(Station {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    latitude: r.try_get("latitude")?,
                    longitude: r.try_get("longitude")?,
                    city: r.try_get("city")?,
                    state: r.try_get("state")?,
                    country: r.try_get("country")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StoreError::from)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_level_errors_are_unavailable() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_unavailable());
    }

    #[test]
    fn query_level_errors_are_not_outages() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_unavailable());
        assert!(err.to_string().starts_with("database query failed"));
    }
}
