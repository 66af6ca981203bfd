//! Structured-table strategy.
//!
//! PDF transcripts rarely carry real table markup; what they do carry is
//! text runs with bounding boxes. A table is recovered by grouping runs
//! into rows by vertical centre and cutting each row into cells wherever
//! the horizontal gap between neighbouring runs exceeds the column gap.
//! Cells are then mapped to fields by fixed column position.

use super::{ExtractionStrategy, RowRejection, StrategyYield};
use crate::config::{TableLayout, Vocabulary};
use crate::error::GradError;
use crate::pipeline::render::{TextFragment, TranscriptSource};
use crate::record::{parse_credit, CourseRecord};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TableStrategy {
    vocabulary: Vocabulary,
    layout: TableLayout,
}

impl TableStrategy {
    pub fn new(vocabulary: Vocabulary, layout: TableLayout) -> Self {
        Self { vocabulary, layout }
    }

    /// Map one row of cells to a record.
    pub fn parse_row(&self, cells: &[String]) -> Result<CourseRecord, RowRejection> {
        let layout = &self.layout;
        if cells.len() < layout.min_columns {
            return Err(RowRejection::TooFewColumns {
                found: cells.len(),
                needed: layout.min_columns,
            });
        }
        let cell = |idx: usize| cells.get(idx).map(|c| c.trim()).unwrap_or("");

        let code = cell(layout.code);
        if code.is_empty() {
            return Err(RowRejection::EmptyCode);
        }

        let raw_credit = cell(layout.credit);
        let credit = parse_credit(raw_credit).unwrap_or(0.0);
        if credit <= 0.0 {
            return Err(RowRejection::ZeroCredit {
                raw: raw_credit.to_string(),
            });
        }

        let grade = self
            .vocabulary
            .grade(cell(layout.grade))
            .ok_or_else(|| RowRejection::UnknownGrade(cell(layout.grade).to_string()))?;
        let category = self
            .vocabulary
            .category(cell(layout.category))
            .ok_or_else(|| RowRejection::UnknownCategory(cell(layout.category).to_string()))?;

        if layout.substitutes.iter().any(|&idx| !cell(idx).is_empty()) {
            return Err(RowRejection::Superseded {
                code: code.to_string(),
            });
        }

        let title = cell(layout.title);
        Ok(CourseRecord::new(
            code,
            title,
            credit,
            grade,
            category,
            self.vocabulary.language_of(title),
        ))
    }
}

impl ExtractionStrategy for TableStrategy {
    fn name(&self) -> &'static str {
        "table"
    }

    fn extract(&self, doc: &dyn TranscriptSource) -> Result<StrategyYield, GradError> {
        let mut out = StrategyYield::default();

        for page in doc.text_pages() {
            let rows = group_rows(
                &page.fragments,
                self.layout.row_tolerance,
                self.layout.column_gap,
            );
            if !rows.iter().any(|r| r.len() >= self.layout.min_columns) {
                debug!("Page {}: no table rows", page.page_num);
                continue;
            }

            for (i, cells) in rows.iter().enumerate() {
                match self.parse_row(cells) {
                    Ok(record) => out.records.push(record),
                    Err(reason) => {
                        debug!("Page {} row {}: rejected: {}", page.page_num, i + 1, reason);
                        out.rejected += 1;
                    }
                }
            }
        }

        if out.records.is_empty() && doc.text_pages().iter().all(|p| p.fragments.is_empty()) {
            out.skipped = Some("no positioned text".into());
        }
        Ok(out)
    }
}

/// Group fragments into rows, top of page first, and split each row into
/// cells left to right.
pub fn group_rows(fragments: &[TextFragment], row_tolerance: f32, column_gap: f32) -> Vec<Vec<String>> {
    let mut sorted: Vec<&TextFragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| {
        b.centre_y()
            .total_cmp(&a.centre_y())
            .then(a.left.total_cmp(&b.left))
    });

    let mut rows: Vec<Vec<&TextFragment>> = Vec::new();
    for frag in sorted {
        match rows.last_mut() {
            Some(row) if (row[0].centre_y() - frag.centre_y()).abs() <= row_tolerance => {
                row.push(frag)
            }
            _ => rows.push(vec![frag]),
        }
    }

    rows.into_iter()
        .map(|mut row| {
            row.sort_by(|a, b| a.left.total_cmp(&b.left));
            split_cells(&row, column_gap)
        })
        .collect()
}

fn split_cells(row: &[&TextFragment], column_gap: f32) -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    let mut prev_right: Option<f32> = None;

    for frag in row {
        let text = frag.text.trim();
        match prev_right {
            Some(right) if frag.left - right <= column_gap => {
                if let Some(last) = cells.last_mut() {
                    last.push(' ');
                    last.push_str(text);
                }
            }
            _ => cells.push(text.to_string()),
        }
        prev_right = Some(prev_right.map_or(frag.right, |r| r.max(frag.right)));
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::{PageText, TextTranscript};
    use crate::record::Language;

    /// Lay out `cells` as one row of fragments at height `y`, each cell
    /// 40pt wide with 20pt gaps.
    fn row(y: f32, cells: &[&str]) -> Vec<TextFragment> {
        cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, c)| {
                let left = i as f32 * 60.0;
                TextFragment::new(*c, left, y + 5.0, left + 40.0, y - 5.0)
            })
            .collect()
    }

    fn strategy() -> TableStrategy {
        TableStrategy::new(Vocabulary::default(), TableLayout::default())
    }

    fn doc(rows: Vec<Vec<TextFragment>>) -> TextTranscript {
        let fragments = rows.into_iter().flatten().collect();
        TextTranscript::from_pages(vec![PageText::new(1, "ignored").with_fragments(fragments)])
    }

    #[test]
    fn groups_fragments_into_rows_and_cells() {
        let mut frags = row(700.0, &["MAT101", "Calculus", "6,0", "AA", "Z"]);
        // Second word of the title sits close to the first: same cell.
        frags.push(TextFragment::new("I", 102.0, 706.0, 110.0, 696.0));
        frags.extend(row(680.0, &["FIZ101", "Physics", "5", "BB", "Z"]));

        let rows = group_rows(&frags, 3.0, 8.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["MAT101", "Calculus I", "6,0", "AA", "Z"]);
        assert_eq!(rows[1][0], "FIZ101");
    }

    #[test]
    fn parses_rows_and_derives_language() {
        let doc = doc(vec![
            row(720.0, &["Code", "Title", "Credit", "Grade", "Type"]),
            row(700.0, &["MAT101", "Calculus", "6,0", "AA", "Z"]),
            row(680.0, &["ENG101", "English (İng)", "4.5", "FF", "S"]),
        ]);
        let y = strategy().extract(&doc).unwrap();

        assert_eq!(y.records.len(), 2);
        assert_eq!(y.rejected, 1, "header row rejected");
        assert_eq!(y.records[0].credit(), 6.0);
        assert_eq!(y.records[1].language(), Language::ForeignLanguage);
        assert_eq!(y.records[1].grade(), "FF");
    }

    #[test]
    fn rejects_bad_rows() {
        let s = strategy();
        let cells = |xs: &[&str]| xs.iter().map(|x| x.to_string()).collect::<Vec<_>>();

        assert!(matches!(
            s.parse_row(&cells(&["MAT101", "Calculus", "6"])),
            Err(RowRejection::TooFewColumns { found: 3, needed: 5 })
        ));
        assert_eq!(
            s.parse_row(&cells(&["", "Calculus", "6", "AA", "Z"])),
            Err(RowRejection::EmptyCode)
        );
        assert!(matches!(
            s.parse_row(&cells(&["MAT101", "Calculus", "0,0", "AA", "Z"])),
            Err(RowRejection::ZeroCredit { .. })
        ));
        assert!(matches!(
            s.parse_row(&cells(&["MAT101", "Calculus", "abc", "AA", "Z"])),
            Err(RowRejection::ZeroCredit { .. })
        ));
        assert_eq!(
            s.parse_row(&cells(&["MAT101", "Calculus", "6", "AA", "Z", "MAT103"])),
            Err(RowRejection::Superseded {
                code: "MAT101".into()
            })
        );
    }

    #[test]
    fn page_without_table_rows_yields_nothing() {
        let doc = doc(vec![row(700.0, &["Transcript", "of", "records"])]);
        let y = strategy().extract(&doc).unwrap();
        assert!(y.records.is_empty());
        assert_eq!(y.rejected, 0);
    }

    #[test]
    fn plain_text_document_is_skipped() {
        let doc = TextTranscript::from_text(["MAT101 Calculus 6,0 AA Z"]);
        let y = strategy().extract(&doc).unwrap();
        assert!(y.records.is_empty());
        assert!(y.skipped.is_some());
    }
}
