//! Climate inputs and the range table they are validated against.

use serde::{Deserialize, Serialize};

use crate::validation::{Issue, ValidationErrors};

/// Validation rule for one climate field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRange {
    pub field: &'static str,
    pub required: bool,
    pub min: f64,
    pub max: f64,
}

/// Documented ranges, inclusive on both ends. Order matches [`ClimateData::readings`].
pub const CLIMATE_RANGES: [FieldRange; 6] = [
    FieldRange { field: "temperatura",         required: true,  min: -50.0, max: 60.0 },
    FieldRange { field: "umidade",             required: true,  min: 0.0,   max: 100.0 },
    FieldRange { field: "vento_velocidade",    required: true,  min: 0.0,   max: 200.0 },
    FieldRange { field: "vento_direcao",       required: false, min: 0.0,   max: 360.0 },
    FieldRange { field: "precipitacao",        required: true,  min: 0.0,   max: 1000.0 },
    FieldRange { field: "pressao_atmosferica", required: false, min: 800.0, max: 1200.0 },
];

/// Climate readings as received. Every field is optional at this stage so that
/// a missing required field is reported by name instead of failing decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateData {
    /// °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperatura: Option<f64>,
    /// %
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umidade: Option<f64>,
    /// km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vento_velocidade: Option<f64>,
    /// degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vento_direcao: Option<f64>,
    /// mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitacao: Option<f64>,
    /// hPa
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressao_atmosferica: Option<f64>,
}

impl ClimateData {
    fn readings(&self) -> [Option<f64>; 6] {
        [
            self.temperatura,
            self.umidade,
            self.vento_velocidade,
            self.vento_direcao,
            self.precipitacao,
            self.pressao_atmosferica,
        ]
    }

    /// Check every field and record violations under `prefix` (e.g.
    /// `dados_climaticos[3].`). Does not stop at the first failure.
    pub fn collect_violations(&self, prefix: &str, errors: &mut ValidationErrors) {
        for (rule, reading) in CLIMATE_RANGES.iter().zip(self.readings()) {
            let field = format!("{prefix}{}", rule.field);
            match reading {
                None if rule.required => errors.push(field, Issue::Missing),
                None => {}
                Some(v) if !v.is_finite() => errors.push(field, Issue::NotFinite),
                Some(v) if v < rule.min || v > rule.max => errors.push(
                    field,
                    Issue::OutOfRange { value: v, min: rule.min, max: rule.max },
                ),
                Some(_) => {}
            }
        }
    }

    /// Validate against [`CLIMATE_RANGES`], returning every violation at once.
    pub fn validate(&self) -> Result<ValidatedClimate, ValidationErrors> {
        self.validate_prefixed("")
    }

    pub fn validate_prefixed(&self, prefix: &str) -> Result<ValidatedClimate, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.collect_violations(prefix, &mut errors);

        // A missing required field always leaves a violation behind, so the
        // fallback arm only ever returns a non-empty collection.
        match (self.temperatura, self.umidade, self.vento_velocidade, self.precipitacao) {
            (Some(temperatura), Some(umidade), Some(vento_velocidade), Some(precipitacao))
                if errors.is_empty() =>
            {
                Ok(ValidatedClimate {
                    temperatura,
                    umidade,
                    vento_velocidade,
                    vento_direcao: self.vento_direcao,
                    precipitacao,
                    pressao_atmosferica: self.pressao_atmosferica,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Climate readings that passed validation. Only obtainable through
/// [`ClimateData::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedClimate {
    temperatura: f64,
    umidade: f64,
    vento_velocidade: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    vento_direcao: Option<f64>,
    precipitacao: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pressao_atmosferica: Option<f64>,
}

impl ValidatedClimate {
    pub fn temperatura(&self) -> f64 {
        self.temperatura
    }

    pub fn umidade(&self) -> f64 {
        self.umidade
    }

    pub fn vento_velocidade(&self) -> f64 {
        self.vento_velocidade
    }

    pub fn vento_direcao(&self) -> Option<f64> {
        self.vento_direcao
    }

    pub fn precipitacao(&self) -> f64 {
        self.precipitacao
    }

    pub fn pressao_atmosferica(&self) -> Option<f64> {
        self.pressao_atmosferica
    }
}

impl From<&ValidatedClimate> for ClimateData {
    fn from(v: &ValidatedClimate) -> Self {
        ClimateData {
            temperatura: Some(v.temperatura),
            umidade: Some(v.umidade),
            vento_velocidade: Some(v.vento_velocidade),
            vento_direcao: v.vento_direcao,
            precipitacao: Some(v.precipitacao),
            pressao_atmosferica: v.pressao_atmosferica,
        }
    }
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClimateData {
        ClimateData {
            temperatura: Some(25.5),
            umidade: Some(65.0),
            vento_velocidade: Some(15.2),
            vento_direcao: None,
            precipitacao: Some(0.0),
            pressao_atmosferica: None,
        }
    }

    #[test]
    fn documented_example_passes() {
        let v = sample().validate().unwrap();
        assert_eq!(v.temperatura(), 25.5);
        assert_eq!(v.vento_direcao(), None);
    }

    #[test]
    fn temperature_bounds_are_inclusive() {
        for t in [-50.0, 60.0] {
            let data = ClimateData { temperatura: Some(t), ..sample() };
            assert!(data.validate().is_ok(), "{t} should pass");
        }
        for t in [-51.0, 61.0, 70.0] {
            let data = ClimateData { temperatura: Some(t), ..sample() };
            let errs = data.validate().unwrap_err();
            assert_eq!(errs.fields().collect::<Vec<_>>(), vec!["temperatura"]);
        }
    }

    #[test]
    fn temperature_70_details_match_contract() {
        let data = ClimateData { temperatura: Some(70.0), ..sample() };
        let details = data.validate().unwrap_err().details();
        assert_eq!(details["temperatura"], "must be between -50 and 60");
    }

    #[test]
    fn each_missing_required_field_is_named() {
        let required = ["temperatura", "umidade", "vento_velocidade", "precipitacao"];
        for field in required {
            let mut data = sample();
            match field {
                "temperatura" => data.temperatura = None,
                "umidade" => data.umidade = None,
                "vento_velocidade" => data.vento_velocidade = None,
                _ => data.precipitacao = None,
            }
            let errs = data.validate().unwrap_err();
            assert_eq!(errs.len(), 1);
            assert_eq!(errs.violations()[0].field, field);
            assert_eq!(errs.violations()[0].issue, Issue::Missing);
        }
    }

    #[test]
    fn optional_fields_may_be_absent_but_not_out_of_range() {
        let ok = ClimateData {
            vento_direcao: Some(360.0),
            pressao_atmosferica: Some(800.0),
            ..sample()
        };
        assert!(ok.validate().is_ok());

        let bad = ClimateData {
            vento_direcao: Some(361.0),
            pressao_atmosferica: Some(1300.0),
            ..sample()
        };
        let errs = bad.validate().unwrap_err();
        let fields: Vec<_> = errs.fields().collect();
        assert_eq!(fields, vec!["vento_direcao", "pressao_atmosferica"]);
    }

    #[test]
    fn collects_every_violation_not_just_the_first() {
        let data = ClimateData {
            temperatura: Some(100.0),
            umidade: Some(150.0),
            vento_velocidade: None,
            vento_direcao: None,
            precipitacao: Some(-1.0),
            pressao_atmosferica: None,
        };
        let errs = data.validate().unwrap_err();
        assert_eq!(errs.len(), 4);
    }

    #[test]
    fn prefix_is_applied_to_field_paths() {
        let data = ClimateData { umidade: None, ..sample() };
        let errs = data.validate_prefixed("dados_climaticos[3].").unwrap_err();
        assert_eq!(errs.violations()[0].field, "dados_climaticos[3].umidade");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let data = ClimateData { temperatura: Some(f64::NAN), ..sample() };
        let errs = data.validate().unwrap_err();
        assert_eq!(errs.violations()[0].issue, Issue::NotFinite);
    }

    #[test]
    fn deserialises_with_missing_fields() {
        let data: ClimateData = serde_json::from_value(serde_json::json!({
            "temperatura": 25.0,
            "vento_velocidade": 15.2,
            "precipitacao": 0.0
        }))
        .unwrap();
        assert_eq!(data.umidade, None);
        let errs = data.validate().unwrap_err();
        assert_eq!(errs.details()["umidade"], "field required");
    }
}
