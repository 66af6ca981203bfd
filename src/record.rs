//! The course record: one normalised transcript line item.
//!
//! Records are produced once per extraction pass and never mutated
//! afterwards. Fields are private; downstream stages read them through
//! accessors and derive new values (aggregates, failed-course lists) instead
//! of editing records in place.

use serde::{Deserialize, Serialize};

/// Instruction language of a course, derived from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    /// Title carries one of the configured foreign-language markers.
    ForeignLanguage,
    /// Everything else, including ambiguous titles.
    #[default]
    NativeLanguage,
}

impl Language {
    /// Substring test against the configured markers, e.g. `"(İng)"`.
    ///
    /// This is not a language detector: a title without a marker is
    /// native-language no matter what it says.
    pub fn from_title<S: AsRef<str>>(title: &str, markers: &[S]) -> Self {
        if markers
            .iter()
            .map(AsRef::as_ref)
            .any(|m| !m.is_empty() && title.contains(m))
        {
            Language::ForeignLanguage
        } else {
            Language::NativeLanguage
        }
    }
}

/// A single completed (or attempted) course read from a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    code: String,
    title: String,
    credit: f64,
    grade: String,
    category: String,
    language: Language,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    replaced_by: Vec<String>,
}

impl CourseRecord {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        credit: f64,
        grade: impl Into<String>,
        category: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            credit,
            grade: grade.into(),
            category: category.into(),
            language,
            replaced_by: Vec::new(),
        }
    }

    /// Attach the codes of the courses that superseded this one.
    pub fn with_replaced_by<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replaced_by = codes
            .into_iter()
            .map(Into::into)
            .filter(|c: &String| !c.trim().is_empty())
            .collect();
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn credit(&self) -> f64 {
        self.credit
    }

    pub fn grade(&self) -> &str {
        &self.grade
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn replaced_by(&self) -> &[String] {
        &self.replaced_by
    }

    /// A superseded record never contributes to any aggregate.
    pub fn is_superseded(&self) -> bool {
        !self.replaced_by.is_empty()
    }
}

/// Normalise a locale-formatted credit token to a dot-decimal value.
///
/// Accepts digits with at most one `.` or `,` separator (`"7,5"`, `"7.5"`,
/// `"7"`). Anything else returns `None`; callers treat that as zero and
/// apply their own tolerance policy.
pub fn parse_credit(token: &str) -> Option<f64> {
    let token = token.trim();
    let mut separators = 0;
    let mut digits = 0;
    for c in token.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' | ',' => separators += 1,
            _ => return None,
        }
    }
    if digits == 0 || separators > 1 {
        return None;
    }
    token.replace(',', ".").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_and_dot_credits_agree() {
        assert_eq!(parse_credit("7,5"), Some(7.5));
        assert_eq!(parse_credit("7.5"), Some(7.5));
        assert_eq!(parse_credit("7,5"), parse_credit("7.5"));
        assert_eq!(parse_credit(" 6 "), Some(6.0));
        assert_eq!(parse_credit("0,0"), Some(0.0));
    }

    #[test]
    fn malformed_credits_rejected() {
        assert_eq!(parse_credit(""), None);
        assert_eq!(parse_credit("AKTS"), None);
        assert_eq!(parse_credit("1.000,5"), None);
        assert_eq!(parse_credit("-3"), None);
        assert_eq!(parse_credit(","), None);
        assert_eq!(parse_credit("5a"), None);
    }

    #[test]
    fn language_marker_is_substring_match() {
        let markers = ["(İng)", "(EN)"];
        assert_eq!(
            Language::from_title("Technical English (İng)", &markers),
            Language::ForeignLanguage
        );
        assert_eq!(
            Language::from_title("Data Structures (EN)", &markers),
            Language::ForeignLanguage
        );
        assert_eq!(
            Language::from_title("İngilizce Okuma", &markers),
            Language::NativeLanguage
        );
    }

    #[test]
    fn empty_marker_never_matches() {
        assert_eq!(
            Language::from_title("Anything", &[""]),
            Language::NativeLanguage
        );
    }

    #[test]
    fn blank_replacement_codes_are_dropped() {
        let r = CourseRecord::new("MAT101", "Calculus", 6.0, "AA", "Z", Language::NativeLanguage)
            .with_replaced_by(["", "  "]);
        assert!(!r.is_superseded());

        let r = r.with_replaced_by(["MAT103"]);
        assert!(r.is_superseded());
        assert_eq!(r.replaced_by(), ["MAT103".to_string()]);
    }
}
