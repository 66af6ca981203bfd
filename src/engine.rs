//! Graduation rule engine.
//!
//! Classifies course records, sums credits per category and compares the
//! sums against the configured thresholds. Deterministic and pure: the same
//! records and thresholds always produce the same [`Evaluation`].
//!
//! ## Algorithm
//!
//! ```text
//! records ─▶ validate ─▶ drop superseded ─▶ partition (passed / failed)
//!                                              │            │
//!                                     aggregates (passed)   failed-course list
//!                                              │
//!                                  thresholds ─▶ gap report
//! ```
//!
//! An empty record list short-circuits to a single diagnostic entry; so does
//! a record that violates the record contract (negative credit, unknown
//! grade, ...), since aggregating over inconsistent rows would produce a
//! report nobody can trust.

use crate::config::{AuditConfig, CategoryRole, ProfessionalElectivePolicy, Vocabulary};
use crate::record::{CourseRecord, Language};
use crate::thresholds::{Metric, Minimum, Thresholds};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Diagnostic emitted when there is nothing to evaluate.
pub const NO_RECORDS_DIAGNOSTIC: &str =
    "No course records could be read from the transcript; graduation requirements were not evaluated.";

/// Credits are summed and compared in hundredths; `f64` only at the edges.
const CREDIT_SCALE: f64 = 100.0;

fn to_hundredths(credit: f64) -> i64 {
    (credit * CREDIT_SCALE).round() as i64
}

fn from_hundredths(hundredths: i64) -> f64 {
    hundredths as f64 / CREDIT_SCALE
}

/// Credit sum and course count for one aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub credits: f64,
    pub courses: usize,
}

/// Exact running sum behind a [`Tally`].
#[derive(Debug, Clone, Copy, Default)]
struct Sum {
    hundredths: i64,
    courses: usize,
}

impl Sum {
    fn add(&mut self, hundredths: i64) {
        self.hundredths += hundredths;
        self.courses += 1;
    }

    fn tally(self) -> Tally {
        Tally {
            credits: from_hundredths(self.hundredths),
            courses: self.courses,
        }
    }
}

/// The four aggregates, computed over passed, non-superseded records only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub total: Tally,
    pub foreign_language: Tally,
    pub elective: Tally,
    pub professional_elective: Tally,
}

impl Aggregates {
    pub fn get(&self, metric: Metric) -> Tally {
        match metric {
            Metric::Total => self.total,
            Metric::ForeignLanguage => self.foreign_language,
            Metric::Elective => self.elective,
            Metric::ProfessionalElective => self.professional_elective,
        }
    }
}

/// Unit a shortfall is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Unit {
    Credits,
    Courses,
}

/// One Gap Report entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GapEntry {
    /// An aggregate is strictly below its threshold.
    Shortfall {
        metric: Metric,
        unit: Unit,
        required: f64,
        achieved: f64,
        /// `required - achieved`; positive by construction.
        shortfall: f64,
    },
    /// Evaluation did not run (no records, malformed records).
    Diagnostic { message: String },
}

impl fmt::Display for GapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapEntry::Shortfall {
                metric,
                unit,
                required,
                achieved,
                shortfall,
            } => {
                let unit = match unit {
                    Unit::Credits => "credits",
                    Unit::Courses => "courses",
                };
                write!(
                    f,
                    "{metric}: {shortfall} {unit} short (required {required}, achieved {achieved})"
                )
            }
            GapEntry::Diagnostic { message } => f.write_str(message),
        }
    }
}

/// A course with a failing grade, in transcript order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCourse {
    pub code: String,
    pub title: String,
    pub grade: String,
}

/// Result of [`RuleEngine::evaluate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub aggregates: Aggregates,
    pub failed: Vec<FailedCourse>,
    pub gaps: Vec<GapEntry>,
}

impl Evaluation {
    fn diagnostic(message: impl Into<String>) -> Self {
        Self {
            aggregates: Aggregates::default(),
            failed: Vec::new(),
            gaps: vec![GapEntry::Diagnostic {
                message: message.into(),
            }],
        }
    }

    /// Human-readable Gap Report lines.
    pub fn gap_messages(&self) -> Vec<String> {
        self.gaps.iter().map(ToString::to_string).collect()
    }

    /// True when every threshold is met and evaluation actually ran.
    pub fn is_eligible(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Classifies and aggregates records against thresholds.
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    vocabulary: &'a Vocabulary,
    policy: &'a ProfessionalElectivePolicy,
}

impl<'a> RuleEngine<'a> {
    pub fn new(vocabulary: &'a Vocabulary, policy: &'a ProfessionalElectivePolicy) -> Self {
        Self { vocabulary, policy }
    }

    pub fn from_config(config: &'a AuditConfig) -> Self {
        Self::new(&config.vocabulary, &config.elective_policy)
    }

    /// Evaluate `records` against `thresholds`.
    pub fn evaluate(&self, records: &[CourseRecord], thresholds: &Thresholds) -> Evaluation {
        if records.is_empty() {
            debug!("No records to evaluate");
            return Evaluation::diagnostic(NO_RECORDS_DIAGNOSTIC);
        }
        if let Err(problem) = self.validate(records) {
            warn!("Evaluation aborted: {}", problem);
            return Evaluation::diagnostic(format!(
                "Malformed course data: {problem}; graduation requirements were not evaluated."
            ));
        }

        let mut sums = [Sum::default(); 4];
        let [total, foreign_language, elective, professional_elective] = &mut sums;
        let mut failed = Vec::new();

        for record in records.iter().filter(|r| !r.is_superseded()) {
            if self.vocabulary.is_failing(record.grade()) {
                failed.push(FailedCourse {
                    code: record.code().to_string(),
                    title: record.title().to_string(),
                    grade: record.grade().to_string(),
                });
                continue;
            }

            let credit = to_hundredths(record.credit());
            total.add(credit);
            if record.language() == Language::ForeignLanguage {
                foreign_language.add(credit);
            }
            if self.vocabulary.role_of(record.category()) == Some(CategoryRole::Elective) {
                elective.add(credit);
            }
            if self.is_professional_elective(record) {
                professional_elective.add(credit);
            }
        }

        let exact = |metric: Metric| match metric {
            Metric::Total => sums[0],
            Metric::ForeignLanguage => sums[1],
            Metric::Elective => sums[2],
            Metric::ProfessionalElective => sums[3],
        };
        let gaps = thresholds
            .iter()
            .filter_map(|req| {
                let sum = exact(req.metric);
                let (unit, required, achieved) = match req.minimum {
                    Minimum::Credits(min) => (Unit::Credits, to_hundredths(min), sum.hundredths),
                    Minimum::Courses(min) => (Unit::Courses, min as i64, sum.courses as i64),
                };
                let shown = |n: i64| match unit {
                    Unit::Credits => from_hundredths(n),
                    Unit::Courses => n as f64,
                };
                (achieved < required).then(|| GapEntry::Shortfall {
                    metric: req.metric,
                    unit,
                    required: shown(required),
                    achieved: shown(achieved),
                    shortfall: shown(required - achieved),
                })
            })
            .collect::<Vec<_>>();

        let aggregates = Aggregates {
            total: sums[0].tally(),
            foreign_language: sums[1].tally(),
            elective: sums[2].tally(),
            professional_elective: sums[3].tally(),
        };

        debug!(
            "Evaluated {} records: {} total credits, {} failed, {} gaps",
            records.len(),
            aggregates.total.credits,
            failed.len(),
            gaps.len()
        );

        Evaluation {
            aggregates,
            failed,
            gaps,
        }
    }

    /// Required codes with no passing, non-superseded record, sorted.
    pub fn missing_required(
        &self,
        records: &[CourseRecord],
        required: &BTreeSet<String>,
    ) -> Vec<String> {
        let passed: HashSet<&str> = records
            .iter()
            .filter(|r| !r.is_superseded() && !self.vocabulary.is_failing(r.grade()))
            .map(|r| r.code())
            .collect();
        required
            .iter()
            .filter(|code| !passed.contains(code.as_str()))
            .cloned()
            .collect()
    }

    fn is_professional_elective(&self, record: &CourseRecord) -> bool {
        let role = self.vocabulary.role_of(record.category());
        match self.policy {
            ProfessionalElectivePolicy::ExactCategory => {
                role == Some(CategoryRole::ProfessionalElective)
            }
            ProfessionalElectivePolicy::NotMandatoryOrElective => !matches!(
                role,
                Some(CategoryRole::Mandatory) | Some(CategoryRole::Elective)
            ),
            ProfessionalElectivePolicy::CodePrefix(prefixes) => {
                let code = record.code().to_uppercase();
                role != Some(CategoryRole::Mandatory)
                    && prefixes
                        .iter()
                        .map(|p| p.trim().to_uppercase())
                        .any(|p| !p.is_empty() && code.starts_with(&p))
            }
        }
    }

    fn validate(&self, records: &[CourseRecord]) -> Result<(), String> {
        for (i, r) in records.iter().enumerate() {
            let at = || format!("record {} ({})", i + 1, r.code());
            if r.code().trim().is_empty() {
                return Err(format!("record {} has an empty course code", i + 1));
            }
            if !r.credit().is_finite() || r.credit() < 0.0 {
                return Err(format!("{} has invalid credit {}", at(), r.credit()));
            }
            if r.replaced_by().len() > 2 {
                return Err(format!(
                    "{} names {} replacement courses (at most 2)",
                    at(),
                    r.replaced_by().len()
                ));
            }
            if self.vocabulary.grade(r.grade()).is_none() {
                return Err(format!("{} has unknown grade '{}'", at(), r.grade()));
            }
            if self.vocabulary.category(r.category()).is_none() {
                return Err(format!("{} has unknown category '{}'", at(), r.category()));
            }
        }
        Ok(())
    }
}
