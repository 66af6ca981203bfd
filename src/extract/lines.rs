//! Line-pattern strategy: one course per text line, fields in fixed order.
//!
//! ```text
//! MAT101  Calculus I (İng)  6,0  AA  Z  [MAT103] [MAT105]
//! code    title (lazy)      cred grd cat  replaced-by tokens
//! ```
//!
//! Lines that do not match, or whose grade or category is outside the
//! vocabulary, are skipped silently. Also used on OCR output.

use super::{ExtractionStrategy, StrategyYield};
use crate::config::Vocabulary;
use crate::error::GradError;
use crate::pipeline::render::TranscriptSource;
use crate::record::{parse_credit, CourseRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_COURSE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\S+)\s+(.+?)\s+(\d+[.,]\d+)\s+(\S+)\s+(\S+)(?:\s+(\S+))?(?:\s+(\S+))?\s*$",
    )
    .unwrap()
});

#[derive(Debug, Clone)]
pub struct LinePatternStrategy {
    vocabulary: Vocabulary,
}

impl LinePatternStrategy {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Parse one line, or `None` if it is not a course line.
    pub fn parse_line(&self, line: &str) -> Option<CourseRecord> {
        let caps = RE_COURSE_LINE.captures(line)?;
        let credit = parse_credit(&caps[3])?;
        let grade = self.vocabulary.grade(&caps[4])?;
        let category = self.vocabulary.category(&caps[5])?;
        let title = caps[2].trim();

        let replaced_by = [caps.get(6), caps.get(7)]
            .into_iter()
            .flatten()
            .map(|m| m.as_str().to_string());

        Some(
            CourseRecord::new(
                &caps[1],
                title,
                credit,
                grade,
                category,
                self.vocabulary.language_of(title),
            )
            .with_replaced_by(replaced_by),
        )
    }

    /// Parse every line of `text`; returns the records and the number of
    /// non-blank lines that did not parse.
    pub fn records_from_text(&self, text: &str) -> (Vec<CourseRecord>, usize) {
        let mut records = Vec::new();
        let mut missed = 0;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match self.parse_line(line) {
                Some(r) => records.push(r),
                None => missed += 1,
            }
        }
        (records, missed)
    }
}

impl ExtractionStrategy for LinePatternStrategy {
    fn name(&self) -> &'static str {
        "line-pattern"
    }

    fn extract(&self, doc: &dyn TranscriptSource) -> Result<StrategyYield, GradError> {
        if !doc.has_text_layer() {
            return Ok(StrategyYield::skipped("no text layer"));
        }

        let mut out = StrategyYield::default();
        for page in doc.text_pages() {
            let (records, missed) = self.records_from_text(&page.text);
            debug!(
                "Page {}: {} course lines, {} other lines",
                page.page_num,
                records.len(),
                missed
            );
            out.records.extend(records);
            out.rejected += missed;
        }
        out.page_errors = doc.page_errors().to_vec();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::TextTranscript;
    use crate::record::Language;

    fn strategy() -> LinePatternStrategy {
        LinePatternStrategy::new(Vocabulary::default())
    }

    #[test]
    fn parses_plain_course_line() {
        let r = strategy()
            .parse_line("MAT101 Calculus I 6,0 AA Z")
            .expect("course line");
        assert_eq!(r.code(), "MAT101");
        assert_eq!(r.title(), "Calculus I");
        assert_eq!(r.credit(), 6.0);
        assert_eq!(r.grade(), "AA");
        assert_eq!(r.category(), "Z");
        assert_eq!(r.language(), Language::NativeLanguage);
        assert!(!r.is_superseded());
    }

    #[test]
    fn comma_and_dot_credits_agree() {
        let s = strategy();
        let a = s.parse_line("BIL201 Data Structures (İng) 7,5 BA MS").unwrap();
        let b = s.parse_line("BIL201 Data Structures (İng) 7.5 BA MS").unwrap();
        assert_eq!(a.credit(), 7.5);
        assert_eq!(a, b);
        assert_eq!(a.language(), Language::ForeignLanguage);
    }

    #[test]
    fn trailing_tokens_become_replacements() {
        let r = strategy()
            .parse_line("MAT101 Calculus I 6,0 AA Z MAT103 MAT105")
            .unwrap();
        assert_eq!(r.replaced_by(), ["MAT103", "MAT105"]);
        assert!(r.is_superseded());
    }

    #[test]
    fn non_course_lines_are_skipped() {
        let s = strategy();
        assert!(s.parse_line("Student No: 20181234").is_none());
        assert!(s.parse_line("Semester GPA 3,12").is_none());
        // Grade outside the vocabulary.
        assert!(s.parse_line("MAT101 Calculus 6,0 QQ Z").is_none());
        // Category outside the vocabulary.
        assert!(s.parse_line("MAT101 Calculus 6,0 AA XYZ").is_none());
        // Integer credit does not match the column pattern.
        assert!(s.parse_line("MAT101 Calculus 6 AA Z").is_none());
    }

    #[test]
    fn extracts_across_pages_in_order() {
        let doc = TextTranscript::from_text([
            "FALL 2019\nMAT101 Calculus I 6,0 AA Z\nFIZ101 Physics I 5,0 FF Z",
            "SPRING 2020\nENG102 Academic English (ENG) 4,0 BB S\nTotal 15,0",
        ]);
        let y = strategy().extract(&doc).unwrap();
        let codes: Vec<_> = y.records.iter().map(|r| r.code()).collect();
        assert_eq!(codes, vec!["MAT101", "FIZ101", "ENG102"]);
        assert_eq!(y.rejected, 3);
    }

    #[test]
    fn skipped_without_text_layer() {
        let doc = TextTranscript::from_text(["", "  "]);
        let y = strategy().extract(&doc).unwrap();
        assert!(y.records.is_empty());
        assert_eq!(y.skipped.as_deref(), Some("no text layer"));
    }
}
