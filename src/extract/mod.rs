//! The extraction cascade: document → ordered course records.
//!
//! Three strategies share one contract, [`ExtractionStrategy`], and run in a
//! fixed order, each only if everything before it produced nothing:
//!
//! ```text
//! TableStrategy ──(empty)──▶ LinePatternStrategy ──(empty)──▶ OcrStrategy
//! (positioned text            (page text, one row           (rasterise, OCR,
//!  fragments → cells)          per line)                     then line pattern)
//! ```
//!
//! The first non-empty result is final; results are never merged across
//! strategies. [`Cascade::extract`] never fails: a strategy that errors is
//! logged, recorded in the [`CascadeOutcome`] and treated as empty.

pub mod lines;
pub mod ocr;
pub mod table;

pub use lines::LinePatternStrategy;
pub use ocr::OcrStrategy;
pub use table::TableStrategy;

use crate::config::AuditConfig;
use crate::error::{GradError, PageError};
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::TranscriptSource;
use crate::record::CourseRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Why a candidate row did not become a course record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowRejection {
    #[error("{found} columns, need at least {needed}")]
    TooFewColumns { found: usize, needed: usize },

    #[error("empty course code")]
    EmptyCode,

    #[error("zero or unparseable credit '{raw}'")]
    ZeroCredit { raw: String },

    #[error("unknown grade '{0}'")]
    UnknownGrade(String),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("course {code} was superseded")]
    Superseded { code: String },
}

/// What one strategy produced.
#[derive(Debug, Clone, Default)]
pub struct StrategyYield {
    pub records: Vec<CourseRecord>,
    /// Candidate rows or lines that were dropped.
    pub rejected: usize,
    pub page_errors: Vec<PageError>,
    /// Set when the strategy chose not to run.
    pub skipped: Option<String>,
}

impl StrategyYield {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// One way of turning a document into course records.
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;

    /// `Err` means the strategy could not run at all; the cascade moves on.
    fn extract(&self, doc: &dyn TranscriptSource) -> Result<StrategyYield, GradError>;
}

/// Record of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub records: usize,
    pub rejected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub page_errors: Vec<PageError>,
}

/// Result of running the cascade.
#[derive(Debug, Clone, Default)]
pub struct CascadeOutcome {
    pub records: Vec<CourseRecord>,
    /// Strategy that produced `records`; `None` when every strategy came up empty.
    pub strategy: Option<&'static str>,
    pub attempts: Vec<StrategyAttempt>,
}

impl CascadeOutcome {
    pub fn is_exhausted(&self) -> bool {
        self.strategy.is_none()
    }
}

/// Ordered fallback chain of strategies.
pub struct Cascade {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Cascade {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Table → line pattern → OCR, configured from `config`. Without an OCR
    /// engine the chain stops after the line pattern.
    pub fn standard(config: &AuditConfig, ocr: Option<Arc<dyn OcrEngine>>) -> Self {
        let lines = LinePatternStrategy::new(config.vocabulary.clone());
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(TableStrategy::new(config.vocabulary.clone(), config.table.clone())),
            Box::new(lines.clone()),
        ];
        if let Some(engine) = ocr {
            strategies.push(Box::new(
                OcrStrategy::new(engine, lines)
                    .max_rendered_pixels(config.max_rendered_pixels)
                    .force(config.force_ocr),
            ));
        }
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run strategies in order until one yields at least one record.
    pub fn extract(&self, doc: &dyn TranscriptSource) -> CascadeOutcome {
        let mut outcome = CascadeOutcome::default();

        for strategy in &self.strategies {
            let name = strategy.name();
            let attempt = match strategy.extract(doc) {
                Ok(y) => {
                    let attempt = StrategyAttempt {
                        strategy: name.to_string(),
                        records: y.records.len(),
                        rejected: y.rejected,
                        skipped: y.skipped,
                        error: None,
                        page_errors: y.page_errors,
                    };
                    if !y.records.is_empty() {
                        info!(
                            "Strategy '{}' produced {} records ({} rows rejected)",
                            name,
                            y.records.len(),
                            y.rejected
                        );
                        outcome.attempts.push(attempt);
                        outcome.records = y.records;
                        outcome.strategy = Some(name);
                        return outcome;
                    }
                    match &attempt.skipped {
                        Some(reason) => info!("Strategy '{}' skipped: {}", name, reason),
                        None => info!("Strategy '{}' produced no records", name),
                    }
                    attempt
                }
                Err(e) => {
                    warn!("Strategy '{}' failed: {}", name, e);
                    StrategyAttempt {
                        strategy: name.to_string(),
                        records: 0,
                        rejected: 0,
                        skipped: None,
                        error: Some(e.to_string()),
                        page_errors: Vec::new(),
                    }
                }
            };
            outcome.attempts.push(attempt);
        }

        warn!(
            "Extraction exhausted: none of {} strategies produced records",
            self.strategies.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::TextTranscript;
    use crate::record::Language;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fixed {
        name: &'static str,
        result: Result<usize, &'static str>,
        calls: Rc<Cell<usize>>,
    }

    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn extract(&self, _doc: &dyn TranscriptSource) -> Result<StrategyYield, GradError> {
            self.calls.set(self.calls.get() + 1);
            match self.result {
                Ok(n) => Ok(StrategyYield {
                    records: (0..n)
                        .map(|i| {
                            CourseRecord::new(
                                format!("{}{}", self.name, i),
                                "t",
                                1.0,
                                "AA",
                                "Z",
                                Language::NativeLanguage,
                            )
                        })
                        .collect(),
                    ..StrategyYield::default()
                }),
                Err(msg) => Err(GradError::Internal(msg.into())),
            }
        }
    }

    fn fixed(
        name: &'static str,
        result: Result<usize, &'static str>,
    ) -> (Box<dyn ExtractionStrategy>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Box::new(Fixed {
                name,
                result,
                calls: Rc::clone(&calls),
            }),
            calls,
        )
    }

    #[test]
    fn first_non_empty_strategy_wins() {
        let (a, a_calls) = fixed("a", Ok(0));
        let (b, b_calls) = fixed("b", Ok(2));
        let (c, c_calls) = fixed("c", Ok(5));
        let outcome = Cascade::new(vec![a, b, c]).extract(&TextTranscript::default());

        assert_eq!(outcome.strategy, Some("b"));
        assert_eq!(outcome.records.len(), 2);
        assert_eq!((a_calls.get(), b_calls.get(), c_calls.get()), (1, 1, 0));
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[test]
    fn failing_strategy_falls_through() {
        let (a, _) = fixed("a", Err("boom"));
        let (b, _) = fixed("b", Ok(1));
        let outcome = Cascade::new(vec![a, b]).extract(&TextTranscript::default());
        assert_eq!(outcome.strategy, Some("b"));
        assert_eq!(outcome.attempts[0].error.as_deref(), Some("Internal error: boom"));
    }

    #[test]
    fn exhausted_cascade_returns_empty() {
        let (a, _) = fixed("a", Ok(0));
        let (b, _) = fixed("b", Err("nope"));
        let outcome = Cascade::new(vec![a, b]).extract(&TextTranscript::default());
        assert!(outcome.is_exhausted());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[test]
    fn standard_cascade_order() {
        let config = AuditConfig::default();
        assert_eq!(
            Cascade::standard(&config, None).strategy_names(),
            vec!["table", "line-pattern"]
        );
    }
}
