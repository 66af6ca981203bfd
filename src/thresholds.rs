//! Graduation thresholds: the minimum each aggregate must reach.
//!
//! Thresholds are reference data, loaded from the requirements file
//! ([`crate::config_file`]); the engine never hard-codes them. Order is
//! preserved so the gap report lists deficiencies in the order the
//! requirements file declares them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An aggregate the rule engine computes over passed, non-superseded records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Total,
    ForeignLanguage,
    Elective,
    ProfessionalElective,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Total,
        Metric::ForeignLanguage,
        Metric::Elective,
        Metric::ProfessionalElective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Total => "total",
            Metric::ForeignLanguage => "foreign-language",
            Metric::Elective => "elective",
            Metric::ProfessionalElective => "professional-elective",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum for one metric: a credit sum, or a course count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Minimum {
    Credits(f64),
    Courses(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub metric: Metric,
    pub minimum: Minimum,
}

impl Requirement {
    pub fn credits(metric: Metric, min: f64) -> Self {
        Self {
            metric,
            minimum: Minimum::Credits(min),
        }
    }

    pub fn courses(metric: Metric, min: usize) -> Self {
        Self {
            metric,
            minimum: Minimum::Courses(min),
        }
    }
}

/// Ordered list of requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds(Vec<Requirement>);

impl Thresholds {
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self(requirements)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Requirement> for Thresholds {
    fn from_iter<T: IntoIterator<Item = Requirement>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_kebab_case() {
        assert_eq!(Metric::ForeignLanguage.to_string(), "foreign-language");
        assert_eq!(
            Metric::ProfessionalElective.to_string(),
            "professional-elective"
        );
        let json = serde_json::to_string(&Metric::ProfessionalElective).unwrap();
        assert_eq!(json, "\"professional-elective\"");
    }

    #[test]
    fn thresholds_keep_declaration_order() {
        let t: Thresholds = [
            Requirement::credits(Metric::Elective, 7.0),
            Requirement::credits(Metric::Total, 240.0),
        ]
        .into_iter()
        .collect();
        let metrics: Vec<_> = t.iter().map(|r| r.metric).collect();
        assert_eq!(metrics, vec![Metric::Elective, Metric::Total]);
    }
}
