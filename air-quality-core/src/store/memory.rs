//! In-memory store used when no database is configured, and by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use super::{city_key, HistoricalStore, Station, StoreError};
use crate::climate::ClimateData;
use crate::historical::HistoricalRecord;
use crate::pollutant::Pollutant;

#[derive(Debug, Clone)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<String, Vec<HistoricalRecord>>>>,
    stations: Arc<RwLock<Vec<Station>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            stations: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the default stations and one deterministic
    /// record per day in `[start, end]` for each station city.
    pub fn seeded_between(start: NaiveDate, end: NaiveDate) -> Self {
        let store = Self::new();
        let stations = default_stations();

        let mut cities: Vec<&str> = stations.iter().map(|s| s.city.as_str()).collect();
        cities.sort_unstable();
        cities.dedup();

        for (offset, city) in cities.iter().enumerate() {
            let mut day = start;
            while day <= end {
                store.insert(city, synthetic_record(day, offset as f64));
                match day.succ_opt() {
                    Some(next) => day = next,
                    None => break,
                }
            }
        }

        for station in stations {
            store.add_station(station);
        }
        store
    }

    pub fn insert(&self, city: &str, record: HistoricalRecord) {
        self.records
            .write()
            .unwrap()
            .entry(city_key(city))
            .or_default()
            .push(record);
    }

    pub fn add_station(&self, station: Station) {
        self.stations.write().unwrap().push(station);
    }

    /// Simulate an outage: while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store marked offline".into()))
        }
    }
}

#[async_trait]
impl HistoricalStore for InMemoryStore {
    async fn query_range(
        &self,
        city: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalRecord>, StoreError> {
        self.check_available()?;
        let guard = self.records.read().unwrap();
        let mut out: Vec<HistoricalRecord> = guard
            .get(&city_key(city))
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.data >= start && r.data <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by_key(|r| r.data);
        Ok(out)
    }

    async fn list_stations(&self) -> Result<Vec<Station>, StoreError> {
        self.check_available()?;
        Ok(self.stations.read().unwrap().clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ------------------------------------------------------------------ //
//  Seed data                                                          //
// ------------------------------------------------------------------ //

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Smooth, deterministic daily values keyed on the calendar day so the same
/// date always yields the same record.
fn synthetic_record(day: NaiveDate, city_offset: f64) -> HistoricalRecord {
    let n = day.num_days_from_ce() as f64;
    let c = city_offset;

    let pm25 = 18.0 + 3.0 * c + 9.0 * (n * 0.45 + c).sin();
    let mut poluentes = BTreeMap::new();
    poluentes.insert(Pollutant::Pm25, round2(pm25));
    poluentes.insert(Pollutant::Pm10, round2(pm25 * 1.8 + 4.0 * (n * 0.3).cos()));
    poluentes.insert(Pollutant::No2, round2(30.0 + 12.0 * (n * 0.2 + c).sin()));
    poluentes.insert(Pollutant::O3, round2(60.0 + 20.0 * (n * 0.35).cos()));
    poluentes.insert(Pollutant::Co, round2(0.9 + 0.4 * (n * 0.5 + c).sin()));
    poluentes.insert(Pollutant::So2, round2(8.0 + 4.0 * (n * 0.25 + c).cos()));

    let clima = ClimateData {
        temperatura: Some(round2(22.0 + 6.0 * (n * 0.21).sin())),
        umidade: Some(round2(65.0 + 15.0 * (n * 0.17 + c).cos())),
        vento_velocidade: Some(round2(10.0 + 5.0 * (n * 0.33).sin())),
        vento_direcao: Some(round2(180.0 + 170.0 * (n * 0.11).sin())),
        precipitacao: Some(round2((8.0 * (n * 0.7).sin()).max(0.0))),
        pressao_atmosferica: Some(round2(1013.0 + 6.0 * (n * 0.13).cos())),
    };

    HistoricalRecord::new(day, poluentes, clima)
}

pub fn default_stations() -> Vec<Station> {
    let rows: [(i32, &str, f64, f64, &str); 12] = [
        (1, "Estação Centro", -23.5505, -46.6333, "São Paulo"),
        (2, "Estação Leste", -23.5489, -46.5810, "São Paulo"),
        (3, "Estação Oeste", -23.5500, -46.6800, "São Paulo"),
        (4, "Estação Norte", -23.4500, -46.6000, "São Paulo"),
        (5, "Estação Sul", -23.6500, -46.6500, "São Paulo"),
        (6, "Estação Parque", -23.5800, -46.6000, "São Paulo"),
        (7, "Estação Industrial", -23.5000, -46.7000, "São Paulo"),
        (8, "Estação Rural", -23.7000, -46.8000, "São Paulo"),
        (9, "Estação Praia", -23.9600, -46.3900, "Santos"),
        (10, "Estação Montanha", -22.9000, -47.0600, "Campinas"),
        (11, "Estação Histórica", -23.5500, -46.6300, "São Paulo"),
        (12, "Estação Nova", -23.5200, -46.6100, "São Paulo"),
    ];

    rows.iter()
        .map(|(id, name, lat, lon, city)| Station {
            id: *id,
            name: name.to_string(),
            latitude: *lat,
            longitude: *lon,
            city: city.to_string(),
            state: "SP".to_string(),
            country: "BR".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[tokio::test]
    async fn seeded_store_covers_every_city_and_day() {
        let store = InMemoryStore::seeded_between(day(1, 1), day(1, 31));
        for city in ["São Paulo", "Santos", "Campinas"] {
            let records = store.query_range(city, day(1, 1), day(1, 31)).await.unwrap();
            assert_eq!(records.len(), 31, "{city}");
        }
        assert_eq!(store.list_stations().await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn seeded_values_are_deterministic_and_valid() {
        let a = InMemoryStore::seeded_between(day(1, 1), day(1, 10));
        let b = InMemoryStore::seeded_between(day(1, 5), day(1, 20));
        let ra = a.query_range("Santos", day(1, 5), day(1, 5)).await.unwrap();
        let rb = b.query_range("Santos", day(1, 5), day(1, 5)).await.unwrap();
        assert_eq!(ra, rb);

        for r in a.query_range("São Paulo", day(1, 1), day(1, 10)).await.unwrap() {
            assert!(r.clima.validate().is_ok());
            assert!(r.poluentes.values().all(|v| *v > 0.0));
            assert!(r.nivel_qualidade.is_some());
        }
    }

    #[tokio::test]
    async fn city_lookup_is_case_insensitive() {
        let store = InMemoryStore::seeded_between(day(2, 1), day(2, 2));
        for spelling in ["SÃO PAULO", "  são paulo "] {
            let records = store.query_range(spelling, day(2, 1), day(2, 2)).await.unwrap();
            assert_eq!(records.len(), 2, "{spelling}");
        }
        // unknown city yields nothing rather than an error
        let records = store.query_range("Curitiba", day(2, 1), day(2, 2)).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_available(false);
        assert!(store.ping().await.unwrap_err().is_unavailable());
        assert!(store.list_stations().await.is_err());
        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }
}
