//! Pollutant concentration → air-quality level classification.

use serde::{Deserialize, Serialize};

use crate::pollutant::Pollutant;

// ------------------------------------------------------------------ //
//  Types                                                              //
// ------------------------------------------------------------------ //

/// Qualitative air-quality band, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excelente,
    Boa,
    Moderada,
    Ruim,
    MuitoRuim,
    Perigosa,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 6] = [
        QualityLevel::Excelente,
        QualityLevel::Boa,
        QualityLevel::Moderada,
        QualityLevel::Ruim,
        QualityLevel::MuitoRuim,
        QualityLevel::Perigosa,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QualityLevel::Excelente => "excelente",
            QualityLevel::Boa       => "boa",
            QualityLevel::Moderada  => "moderada",
            QualityLevel::Ruim      => "ruim",
            QualityLevel::MuitoRuim => "muito_ruim",
            QualityLevel::Perigosa  => "perigosa",
        }
    }

    /// Position of the band in severity order (0 = excelente).
    pub fn band_index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upper bounds of the five bounded bands for one pollutant.
///
/// Band `i` is `[upper[i-1], upper[i])` with an implicit lower bound of 0 for
/// the first band; anything at or above `upper[4]` is [`QualityLevel::Perigosa`].
#[derive(Debug, Clone, Copy)]
pub struct Breakpoints {
    pub upper: [f64; 5],
}

/// Index range each band maps onto.
const INDEX_RANGES: [(f64, f64); 6] = [
    (0.0, 50.0),
    (50.0, 100.0),
    (100.0, 150.0),
    (150.0, 200.0),
    (200.0, 300.0),
    (300.0, 500.0),
];

pub const MAX_INDEX: f64 = 500.0;

pub fn breakpoints(pollutant: Pollutant) -> Breakpoints {
    let upper = match pollutant {
        Pollutant::Pm25 => [12.0, 25.0, 37.5, 75.0, 150.0],
        Pollutant::Pm10 => [20.0, 50.0, 100.0, 150.0, 250.0],
        Pollutant::No2  => [25.0, 50.0, 100.0, 200.0, 400.0],
        Pollutant::O3   => [50.0, 75.0, 100.0, 160.0, 240.0],
        Pollutant::Co   => [1.0, 2.0, 4.0, 10.0, 17.0],
        Pollutant::So2  => [10.0, 40.0, 125.0, 350.0, 500.0],
    };
    Breakpoints { upper }
}

impl Breakpoints {
    /// Concentration interval of band `index`. The open top band gets a
    /// nominal ceiling of twice its lower bound.
    fn band(&self, index: usize) -> (f64, f64) {
        let lo = if index == 0 { 0.0 } else { self.upper[index - 1] };
        let hi = if index < self.upper.len() {
            self.upper[index]
        } else {
            lo * 2.0
        };
        (lo, hi)
    }
}

// ------------------------------------------------------------------ //
//  Classification                                                     //
// ------------------------------------------------------------------ //

/// Classify a concentration. Bands are lower-inclusive: a value sitting exactly
/// on a boundary belongs to the higher band. Negative values count as 0.
pub fn classify(pollutant: Pollutant, value: f64) -> QualityLevel {
    let value = value.max(0.0);
    let bp = breakpoints(pollutant);
    for (i, upper) in bp.upper.iter().enumerate() {
        if value < *upper {
            return QualityLevel::ALL[i];
        }
    }
    QualityLevel::Perigosa
}

/// Sub-index (0–500) of a concentration, interpolated inside its band.
pub fn sub_index(pollutant: Pollutant, value: f64) -> f64 {
    let value = value.max(0.0);
    let level = classify(pollutant, value);
    let i = level.band_index();
    let (lo, hi) = breakpoints(pollutant).band(i);
    let (idx_lo, idx_hi) = INDEX_RANGES[i];

    let fraction = if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (idx_lo + fraction * (idx_hi - idx_lo)).min(MAX_INDEX)
}

/// Worst level among the given ones, `None` when there are none.
pub fn worst_level(levels: impl IntoIterator<Item = QualityLevel>) -> Option<QualityLevel> {
    levels.into_iter().max()
}

/// Aggregate index of a set of concentrations: the highest sub-index.
pub fn aggregate_index(values: impl IntoIterator<Item = (Pollutant, f64)>) -> Option<f64> {
    values
        .into_iter()
        .map(|(p, v)| sub_index(p, v))
        .fold(None, |acc: Option<f64>, idx| Some(acc.map_or(idx, |a| a.max(idx))))
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pm25_band_interiors() {
        assert_eq!(classify(Pollutant::Pm25, 5.0), QualityLevel::Excelente);
        assert_eq!(classify(Pollutant::Pm25, 20.0), QualityLevel::Boa);
        assert_eq!(classify(Pollutant::Pm25, 25.5), QualityLevel::Moderada);
        assert_eq!(classify(Pollutant::Pm25, 50.0), QualityLevel::Ruim);
        assert_eq!(classify(Pollutant::Pm25, 100.0), QualityLevel::MuitoRuim);
        assert_eq!(classify(Pollutant::Pm25, 300.0), QualityLevel::Perigosa);
    }

    #[test]
    fn pm25_boundaries_belong_to_higher_band() {
        assert_eq!(classify(Pollutant::Pm25, 0.0), QualityLevel::Excelente);
        assert_eq!(classify(Pollutant::Pm25, 12.0), QualityLevel::Boa);
        assert_eq!(classify(Pollutant::Pm25, 25.0), QualityLevel::Moderada);
        assert_eq!(classify(Pollutant::Pm25, 37.5), QualityLevel::Ruim);
        assert_eq!(classify(Pollutant::Pm25, 75.0), QualityLevel::MuitoRuim);
        assert_eq!(classify(Pollutant::Pm25, 150.0), QualityLevel::Perigosa);
    }

    #[test]
    fn just_below_boundary_stays_in_lower_band() {
        assert_eq!(classify(Pollutant::Pm25, 11.999), QualityLevel::Excelente);
        assert_eq!(classify(Pollutant::Pm25, 149.99), QualityLevel::MuitoRuim);
    }

    #[test]
    fn negative_concentration_is_excelente() {
        assert_eq!(classify(Pollutant::No2, -3.0), QualityLevel::Excelente);
        assert_eq!(sub_index(Pollutant::No2, -3.0), 0.0);
    }

    #[test]
    fn classification_is_monotonic_for_every_pollutant() {
        for p in Pollutant::ALL {
            let mut prev = QualityLevel::Excelente;
            let mut v = 0.0;
            while v < 1200.0 {
                let level = classify(p, v);
                assert!(level >= prev, "{p}: {v} dropped from {prev} to {level}");
                prev = level;
                v += 0.25;
            }
        }
    }

    #[test]
    fn sub_index_is_monotonic_and_bounded() {
        for p in Pollutant::ALL {
            let mut prev = 0.0;
            let mut v = 0.0;
            while v < 2000.0 {
                let idx = sub_index(p, v);
                assert!(idx >= prev, "{p}: index fell at {v}");
                assert!(idx <= MAX_INDEX);
                prev = idx;
                v += 0.5;
            }
        }
    }

    #[test]
    fn sub_index_interpolates_inside_band() {
        // 18.5 is halfway through [12, 25) → halfway through [50, 100)
        assert!((sub_index(Pollutant::Pm25, 18.5) - 75.0).abs() < 1e-9);
        assert_eq!(sub_index(Pollutant::Pm25, 12.0), 50.0);
    }

    #[test]
    fn open_top_band_clamps_at_max_index() {
        assert_eq!(sub_index(Pollutant::Pm25, 10_000.0), MAX_INDEX);
        assert_eq!(sub_index(Pollutant::Pm25, 150.0), 300.0);
    }

    #[test]
    fn worst_level_picks_highest_severity() {
        let result = worst_level([QualityLevel::Boa, QualityLevel::Ruim, QualityLevel::Moderada]);
        assert_eq!(result, Some(QualityLevel::Ruim));
    }

    #[test]
    fn worst_level_of_nothing_is_none() {
        assert_eq!(worst_level(std::iter::empty()), None);
    }

    #[test]
    fn aggregate_index_is_highest_sub_index() {
        let idx = aggregate_index([(Pollutant::Pm25, 5.0), (Pollutant::Pm10, 120.0)]).unwrap();
        assert_eq!(idx, sub_index(Pollutant::Pm10, 120.0));
        assert!(aggregate_index(std::iter::empty()).is_none());
    }

    #[test]
    fn labels_serialise_snake_case() {
        assert_eq!(serde_json::to_string(&QualityLevel::MuitoRuim).unwrap(), "\"muito_ruim\"");
        for level in QualityLevel::ALL {
            assert_eq!(
                serde_json::to_string(&level).unwrap(),
                format!("\"{}\"", level.as_str())
            );
        }
    }
}
