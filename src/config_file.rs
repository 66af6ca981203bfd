//! On-disk requirements file (TOML).
//!
//! The requirements file carries the graduation thresholds, which are
//! reference data and therefore mandatory, plus optional overrides for the
//! vocabulary, the classification policy, the table layout and the reference
//! spreadsheet headers. Everything except `[[requirement]]` may be omitted.
//!
//! ```toml
//! [[requirement]]
//! metric = "total"
//! min_credits = 240
//!
//! [[requirement]]
//! metric = "foreign-language"
//! min_credits = 72
//!
//! [classification]
//! professional_elective = "prefix"
//! prefixes = ["BIL", "YAZ"]
//! ```

use crate::config::{AuditConfigBuilder, ProfessionalElectivePolicy, TableLayout, Vocabulary};
use crate::error::GradError;
use crate::reference::ReferenceColumns;
use crate::thresholds::{Metric, Requirement, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Parsed requirements file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirementsFile {
    #[serde(default)]
    pub requirement: Vec<RequirementEntry>,
    pub vocabulary: Option<Vocabulary>,
    pub classification: Option<ClassificationConfig>,
    pub table: Option<TableLayout>,
    pub reference: Option<ReferenceColumns>,
}

/// One `[[requirement]]` table: a metric and exactly one minimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementEntry {
    pub metric: Metric,
    pub min_credits: Option<f64>,
    pub min_courses: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// `exact`, `permissive` or `prefix`.
    pub professional_elective: Option<String>,
    pub prefixes: Option<Vec<String>>,
}

impl ClassificationConfig {
    fn policy(&self) -> Result<Option<ProfessionalElectivePolicy>, String> {
        let Some(kind) = self.professional_elective.as_deref() else {
            return Ok(None);
        };
        match kind.trim().to_lowercase().as_str() {
            "exact" => Ok(Some(ProfessionalElectivePolicy::ExactCategory)),
            "permissive" => Ok(Some(ProfessionalElectivePolicy::NotMandatoryOrElective)),
            "prefix" => {
                let prefixes = self.prefixes.clone().unwrap_or_default();
                if prefixes.is_empty() {
                    return Err("professional_elective = \"prefix\" needs `prefixes`".into());
                }
                Ok(Some(ProfessionalElectivePolicy::CodePrefix(prefixes)))
            }
            other => Err(format!(
                "unknown professional_elective policy '{other}' (expected exact, permissive or prefix)"
            )),
        }
    }
}

impl RequirementsFile {
    /// Load and validate a requirements file.
    ///
    /// A missing file is a [`GradError::ReferenceDataMissing`]: the audit must
    /// not run against absent thresholds.
    pub fn load(path: &Path) -> Result<Self, GradError> {
        if !path.exists() {
            return Err(GradError::ReferenceDataMissing {
                what: "requirements file",
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| GradError::InvalidRequirements {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let file = Self::parse(&content).map_err(|detail| GradError::InvalidRequirements {
            path: path.to_path_buf(),
            detail,
        })?;
        debug!(
            "Loaded {} requirements from {}",
            file.requirement.len(),
            path.display()
        );
        Ok(file)
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self, String> {
        let file: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        file.thresholds()?;
        if let Some(c) = &file.classification {
            c.policy()?;
        }
        Ok(file)
    }

    /// The ordered thresholds declared by `[[requirement]]` entries.
    pub fn thresholds(&self) -> Result<Thresholds, String> {
        if self.requirement.is_empty() {
            return Err("no [[requirement]] entries".into());
        }
        self.requirement
            .iter()
            .map(|entry| match (entry.min_credits, entry.min_courses) {
                (Some(c), None) if c.is_finite() && c >= 0.0 => {
                    Ok(Requirement::credits(entry.metric, c))
                }
                (Some(c), None) => Err(format!(
                    "requirement '{}': min_credits must be a non-negative number, got {c}",
                    entry.metric
                )),
                (None, Some(n)) => Ok(Requirement::courses(entry.metric, n)),
                _ => Err(format!(
                    "requirement '{}': set exactly one of min_credits or min_courses",
                    entry.metric
                )),
            })
            .collect()
    }

    /// Reference spreadsheet headers, or the defaults.
    pub fn reference_columns(&self) -> ReferenceColumns {
        self.reference.clone().unwrap_or_default()
    }

    /// Overlay the file's optional sections onto a config builder.
    pub fn apply(&self, mut builder: AuditConfigBuilder) -> AuditConfigBuilder {
        if let Some(v) = &self.vocabulary {
            builder = builder.vocabulary(v.clone());
        }
        if let Some(t) = &self.table {
            builder = builder.table(t.clone());
        }
        // `parse` already rejected invalid policies.
        if let Some(Ok(Some(policy))) = self.classification.as_ref().map(|c| c.policy()) {
            builder = builder.elective_policy(policy);
        }
        builder
    }
}
