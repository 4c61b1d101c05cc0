//! Historical query handling: range lookup against the store plus per-pollutant
//! summary statistics.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::climate::ClimateData;
use crate::error::AirQualityError;
use crate::pollutant::Pollutant;
use crate::quality::{self, QualityLevel};
use crate::store::HistoricalStore;

// ------------------------------------------------------------------ //
//  Inbound                                                            //
// ------------------------------------------------------------------ //

/// Request body for a historical lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoricalQuery {
    pub cidade: String,
    pub data_inicio: NaiveDate,
    pub data_fim: NaiveDate,
    /// Defaults to every tracked pollutant when absent or empty.
    #[serde(default)]
    pub poluentes: Option<Vec<String>>,
}

/// A query that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub city: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Requested pollutants in request order, without duplicates.
    pub pollutants: Vec<Pollutant>,
}

impl HistoricalQuery {
    pub fn resolve(&self) -> Result<ResolvedQuery, AirQualityError> {
        let city = self.cidade.trim();
        if city.chars().count() < 2 {
            return Err(AirQualityError::unprocessable(
                "cidade",
                "must have at least 2 characters",
            ));
        }
        if self.data_fim < self.data_inicio {
            return Err(AirQualityError::unprocessable(
                "data_fim",
                "must not be before data_inicio",
            ));
        }

        let pollutants = match self.poluentes.as_deref() {
            None | Some([]) => Pollutant::ALL.to_vec(),
            Some(names) => {
                let mut parsed = Vec::with_capacity(names.len());
                let mut unknown = Vec::new();
                for name in names {
                    match name.parse::<Pollutant>() {
                        Ok(p) if !parsed.contains(&p) => parsed.push(p),
                        Ok(_) => {}
                        Err(_) => unknown.push(name.as_str()),
                    }
                }
                if !unknown.is_empty() {
                    return Err(AirQualityError::unprocessable(
                        "poluentes",
                        format!("unknown pollutant(s): {}", unknown.join(", ")),
                    ));
                }
                parsed
            }
        };

        Ok(ResolvedQuery {
            city: city.to_string(),
            start: self.data_inicio,
            end: self.data_fim,
            pollutants,
        })
    }
}

// ------------------------------------------------------------------ //
//  Outbound                                                           //
// ------------------------------------------------------------------ //

/// One persisted day of observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRecord {
    pub data: NaiveDate,
    pub poluentes: BTreeMap<Pollutant, f64>,
    pub clima: ClimateData,
    /// Worst level across every pollutant stored for the day.
    pub nivel_qualidade: Option<QualityLevel>,
}

impl HistoricalRecord {
    pub fn new(data: NaiveDate, poluentes: BTreeMap<Pollutant, f64>, clima: ClimateData) -> Self {
        let nivel_qualidade = worst_of(&poluentes);
        Self {
            data,
            poluentes,
            clima,
            nivel_qualidade,
        }
    }

    /// Drop every pollutant not in `keep`. The label follows the remaining
    /// values.
    pub fn retain_pollutants(&mut self, keep: &[Pollutant]) {
        self.poluentes.retain(|p, _| keep.contains(p));
        self.nivel_qualidade = worst_of(&self.poluentes);
    }
}

fn worst_of(poluentes: &BTreeMap<Pollutant, f64>) -> Option<QualityLevel> {
    quality::worst_level(poluentes.iter().map(|(p, v)| quality::classify(*p, *v)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Period {
    pub inicio: NaiveDate,
    pub fim: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantStatistics {
    pub media: f64,
    pub maximo: f64,
    pub minimo: f64,
    pub amostras: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalResponse {
    pub cidade: String,
    pub periodo: Period,
    pub total_registros: usize,
    pub dados: Vec<HistoricalRecord>,
    /// Absent when no records matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estatisticas: Option<BTreeMap<Pollutant, PollutantStatistics>>,
}

// ------------------------------------------------------------------ //
//  Statistics                                                         //
// ------------------------------------------------------------------ //

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Mean/max/min of each requested pollutant across `records`.
///
/// Returns `None` for an empty record set. A pollutant with no samples in any
/// record is left out rather than reported as zero.
pub fn statistics(
    records: &[HistoricalRecord],
    pollutants: &[Pollutant],
) -> Option<BTreeMap<Pollutant, PollutantStatistics>> {
    if records.is_empty() {
        return None;
    }

    let mut stats = BTreeMap::new();
    for p in pollutants {
        let values: Vec<f64> = records.iter().filter_map(|r| r.poluentes.get(p).copied()).collect();
        if values.is_empty() {
            continue;
        }
        let sum: f64 = values.iter().sum();
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        stats.insert(
            *p,
            PollutantStatistics {
                media: round2(sum / values.len() as f64),
                maximo: max,
                minimo: min,
                amostras: values.len(),
            },
        );
    }
    Some(stats)
}

// ------------------------------------------------------------------ //
//  Query                                                              //
// ------------------------------------------------------------------ //

/// Run a historical query: records ordered by ascending date, restricted to
/// the requested pollutants, plus statistics over them.
pub async fn query_history(
    store: &dyn HistoricalStore,
    query: &HistoricalQuery,
) -> Result<HistoricalResponse, AirQualityError> {
    let q = query.resolve()?;

    let mut records = store.query_range(&q.city, q.start, q.end).await?;
    records.retain(|r| r.data >= q.start && r.data <= q.end);
    records.sort_by_key(|r| r.data);
    for r in &mut records {
        r.retain_pollutants(&q.pollutants);
    }

    let estatisticas = statistics(&records, &q.pollutants);

    info!(
        city = %q.city,
        start = %q.start,
        end = %q.end,
        records = records.len(),
        "historical query complete"
    );

    Ok(HistoricalResponse {
        cidade: q.city,
        periodo: Period {
            inicio: q.start,
            fim: q.end,
        },
        total_registros: records.len(),
        dados: records,
        estatisticas,
    })
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::memory::InMemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(d: u32, pm25: f64, pm10: f64) -> HistoricalRecord {
        let mut p = BTreeMap::new();
        p.insert(Pollutant::Pm25, pm25);
        p.insert(Pollutant::Pm10, pm10);
        HistoricalRecord::new(day(d), p, ClimateData::default())
    }

    fn query(start: u32, end: u32, pollutants: Option<&[&str]>) -> HistoricalQuery {
        HistoricalQuery {
            cidade: "São Paulo".into(),
            data_inicio: day(start),
            data_fim: day(end),
            poluentes: pollutants.map(|ps| ps.iter().map(|s| s.to_string()).collect()),
        }
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        // inserted out of order on purpose
        store.insert("São Paulo", record(20, 30.0, 60.0));
        store.insert("São Paulo", record(5, 10.0, 20.0));
        store.insert("São Paulo", record(12, 20.0, 40.0));
        store.insert("Santos", record(12, 99.0, 99.0));
        store
    }

    #[test]
    fn record_label_is_worst_pollutant() {
        // pm25 10 → excelente, pm10 60 → moderada
        assert_eq!(record(1, 10.0, 60.0).nivel_qualidade, Some(QualityLevel::Moderada));
        let empty = HistoricalRecord::new(day(1), BTreeMap::new(), ClimateData::default());
        assert_eq!(empty.nivel_qualidade, None);
    }

    #[test]
    fn inverted_range_is_unprocessable() {
        let err = query(31, 1, None).resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unprocessable);
        assert!(err.details().contains_key("data_fim"));
    }

    #[test]
    fn unknown_pollutants_are_named() {
        let err = query(1, 31, Some(&["pm25", "invalid_pollutant"])).resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unprocessable);
        assert!(err.details()["poluentes"].contains("invalid_pollutant"));
    }

    #[test]
    fn short_city_is_unprocessable() {
        let mut q = query(1, 2, None);
        q.cidade = " a ".into();
        assert_eq!(q.resolve().unwrap_err().kind(), ErrorKind::Unprocessable);
    }

    #[test]
    fn pollutants_default_to_all_and_deduplicate() {
        assert_eq!(query(1, 2, None).resolve().unwrap().pollutants, Pollutant::ALL.to_vec());
        assert_eq!(query(1, 2, Some(&[])).resolve().unwrap().pollutants.len(), 6);
        let q = query(1, 2, Some(&["no2", "pm25", "no2"])).resolve().unwrap();
        assert_eq!(q.pollutants, vec![Pollutant::No2, Pollutant::Pm25]);
    }

    #[test]
    fn statistics_over_requested_pollutants() {
        let records = vec![record(1, 10.0, 20.0), record(2, 20.0, 40.0), record(3, 33.0, 60.0)];
        let stats = statistics(&records, &[Pollutant::Pm25]).unwrap();
        assert_eq!(stats.len(), 1);
        let pm25 = &stats[&Pollutant::Pm25];
        assert_eq!(pm25.media, 21.0);
        assert_eq!(pm25.maximo, 33.0);
        assert_eq!(pm25.minimo, 10.0);
        assert_eq!(pm25.amostras, 3);
    }

    #[test]
    fn statistics_absent_for_empty_set_and_skip_unsampled_pollutants() {
        assert!(statistics(&[], &Pollutant::ALL).is_none());
        let stats = statistics(&[record(1, 10.0, 20.0)], &[Pollutant::O3]).unwrap();
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn returns_city_records_in_ascending_date_order() {
        let resp = query_history(&store(), &query(1, 31, Some(&["pm25", "pm10", "no2"])))
            .await
            .unwrap();
        assert_eq!(resp.total_registros, 3);
        let dates: Vec<_> = resp.dados.iter().map(|r| r.data).collect();
        assert_eq!(dates, vec![day(5), day(12), day(20)]);
        let stats = resp.estatisticas.unwrap();
        assert_eq!(stats[&Pollutant::Pm25].media, 20.0);
        assert!(!stats.contains_key(&Pollutant::No2));
    }

    #[tokio::test]
    async fn restricts_record_pollutants_to_request() {
        let resp = query_history(&store(), &query(1, 31, Some(&["pm10"]))).await.unwrap();
        assert!(resp.dados.iter().all(|r| r.poluentes.keys().eq([Pollutant::Pm10].iter())));
    }

    #[tokio::test]
    async fn record_label_follows_requested_pollutants_only() {
        let store = InMemoryStore::new();
        store.insert("Campinas", record(3, 5.0, 200.0));

        let mut q = query(1, 31, Some(&["pm25"]));
        q.cidade = "Campinas".into();
        let resp = query_history(&store, &q).await.unwrap();
        let r = &resp.dados[0];
        assert_eq!(r.poluentes.len(), 1);
        // pm10 200 would be muito_ruim, but it is not part of the answer
        assert_eq!(r.nivel_qualidade, Some(QualityLevel::Excelente));
    }

    #[test]
    fn retain_pollutants_recomputes_label() {
        let mut r = record(1, 5.0, 200.0);
        assert_eq!(r.nivel_qualidade, Some(QualityLevel::MuitoRuim));
        r.retain_pollutants(&[Pollutant::Pm25]);
        assert_eq!(r.nivel_qualidade, Some(QualityLevel::Excelente));
        r.retain_pollutants(&[Pollutant::O3]);
        assert_eq!(r.nivel_qualidade, None);
    }

    #[tokio::test]
    async fn range_bounds_are_inclusive() {
        let resp = query_history(&store(), &query(5, 12, None)).await.unwrap();
        assert_eq!(resp.total_registros, 2);
    }

    #[tokio::test]
    async fn empty_range_has_zero_records_and_no_statistics() {
        let resp = query_history(&store(), &query(25, 31, None)).await.unwrap();
        assert_eq!(resp.total_registros, 0);
        assert!(resp.dados.is_empty());
        assert!(resp.estatisticas.is_none());

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("estatisticas").is_none());
        assert_eq!(json["total_registros"], 0);
    }

    #[tokio::test]
    async fn unavailable_store_surfaces_as_unavailable() {
        let store = store();
        store.set_available(false);
        let err = query_history(&store, &query(1, 31, None)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.to_string().contains("database unreachable"));
    }
}
