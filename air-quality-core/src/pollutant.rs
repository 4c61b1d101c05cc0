//! Tracked air contaminants.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A pollutant reported by predictions and historical records.
///
/// Serialises as the lowercase identifier used on the wire (`pm25`, `no2`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm25,
    Pm10,
    No2,
    O3,
    Co,
    So2,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::Co,
        Pollutant::So2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::Pm10 => "pm10",
            Pollutant::No2  => "no2",
            Pollutant::O3   => "o3",
            Pollutant::Co   => "co",
            Pollutant::So2  => "so2",
        }
    }

    /// Concentration unit the breakpoint table for this pollutant is expressed in.
    pub fn unit(self) -> &'static str {
        match self {
            Pollutant::Co => "mg/m³",
            _             => "µg/m³",
        }
    }
}

impl std::fmt::Display for Pollutant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pollutant '{0}' (expected one of pm25, pm10, no2, o3, co, so2)")]
pub struct UnknownPollutant(pub String);

impl FromStr for Pollutant {
    type Err = UnknownPollutant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pm25" | "pm2.5" => Ok(Pollutant::Pm25),
            "pm10"           => Ok(Pollutant::Pm10),
            "no2"            => Ok(Pollutant::No2),
            "o3"             => Ok(Pollutant::O3),
            "co"             => Ok(Pollutant::Co),
            "so2"            => Ok(Pollutant::So2),
            _                => Err(UnknownPollutant(s.to_string())),
        }
    }
}
