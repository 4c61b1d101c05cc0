//! Collected field violations.
//!
//! Validation never stops at the first bad field: every violation found in a
//! request is pushed into one [`ValidationErrors`] so callers can report them
//! together.

use std::collections::BTreeMap;

/// What is wrong with a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    Missing,
    NotFinite,
    OutOfRange { value: f64, min: f64, max: f64 },
}

impl Issue {
    /// Short human-readable description used in the `details` map.
    pub fn describe(&self) -> String {
        match self {
            Issue::Missing => "field required".to_string(),
            Issue::NotFinite => "must be a finite number".to_string(),
            Issue::OutOfRange { min, max, .. } => format!("must be between {min} and {max}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Field path, e.g. `temperatura` or `dados_climaticos[2].umidade`.
    pub field: String,
    pub issue: Issue,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.issue {
            Issue::OutOfRange { value, .. } => {
                write!(f, "{} {} (got {value})", self.field, self.issue.describe())
            }
            issue => write!(f, "{} {}", self.field, issue.describe()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, issue: Issue) {
        self.violations.push(FieldViolation {
            field: field.into(),
            issue,
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.violations.extend(other.violations);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.field.as_str())
    }

    /// Field → issue map for the error envelope.
    pub fn details(&self) -> BTreeMap<String, String> {
        self.violations
            .iter()
            .map(|v| (v.field.clone(), v.issue.describe()))
            .collect()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed for {} field(s)", self.violations.len())?;
        for (i, v) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_describes_bounds_without_value() {
        let issue = Issue::OutOfRange { value: 70.0, min: -50.0, max: 60.0 };
        assert_eq!(issue.describe(), "must be between -50 and 60");
    }

    #[test]
    fn display_names_field_value_and_bounds() {
        let mut errs = ValidationErrors::new();
        errs.push("temperatura", Issue::OutOfRange { value: 70.0, min: -50.0, max: 60.0 });
        errs.push("umidade", Issue::Missing);

        let msg = errs.to_string();
        assert!(msg.starts_with("validation failed for 2 field(s)"));
        assert!(msg.contains("temperatura must be between -50 and 60 (got 70)"));
        assert!(msg.contains("umidade field required"));
    }

    #[test]
    fn details_map_every_field() {
        let mut errs = ValidationErrors::new();
        errs.push("a", Issue::Missing);
        errs.push("b", Issue::NotFinite);
        let details = errs.details();
        assert_eq!(details.len(), 2);
        assert_eq!(details["a"], "field required");
        assert_eq!(details["b"], "must be a finite number");
    }

    #[test]
    fn empty_collection_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
