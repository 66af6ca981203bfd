//! Reference data: required-course list and substitution catalog.
//!
//! The audit core only ever sees the [`ReferenceData`] trait. [`Catalog`] is
//! the in-memory implementation; [`Catalog::from_workbooks`] fills it from two
//! spreadsheets (xlsx, xls or ods). Either spreadsheet missing is a fatal
//! precondition failure, never retried.

use crate::error::GradError;
use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// A catalog course that can stand in for a failed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitute {
    pub code: String,
    pub title: String,
}

/// One row of the substitution catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub title: String,
    pub substitute_1: Option<String>,
    pub substitute_2: Option<String>,
}

impl CatalogEntry {
    fn substitutes(&self, code: &str) -> bool {
        [&self.substitute_1, &self.substitute_2]
            .into_iter()
            .flatten()
            .any(|s| s == code)
    }
}

/// Read-only lookups the audit needs from reference data.
pub trait ReferenceData {
    /// Codes every graduate must have passed.
    fn required_course_codes(&self) -> &BTreeSet<String>;

    /// Catalog courses whose substitute-1 or substitute-2 column equals `code`,
    /// in catalog row order.
    fn substitutes_for(&self, code: &str) -> Vec<Substitute>;
}

/// Materialised reference tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    required: BTreeSet<String>,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(required: impl IntoIterator<Item = String>, entries: Vec<CatalogEntry>) -> Self {
        Self {
            required: required.into_iter().collect(),
            entries,
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Load the required-course list and the substitution catalog from the
    /// first sheet of each workbook.
    pub fn from_workbooks(
        required_path: &Path,
        substitutions_path: &Path,
        columns: &ReferenceColumns,
    ) -> Result<Self, GradError> {
        ensure_present("required-course list", required_path)?;
        ensure_present("substitution catalog", substitutions_path)?;

        let required_rows = read_first_sheet(required_path)?;
        let code_idx = header_index(&required_rows, &columns.code, required_path)?;
        let required: BTreeSet<String> = required_rows
            .iter()
            .skip(1)
            .filter_map(|row| row.get(code_idx))
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let subs_rows = read_first_sheet(substitutions_path)?;
        let code_idx = header_index(&subs_rows, &columns.code, substitutions_path)?;
        let title_idx = header_index(&subs_rows, &columns.title, substitutions_path)?;
        let sub1_idx = header_index(&subs_rows, &columns.substitute_1, substitutions_path)?;
        let sub2_idx = header_index(&subs_rows, &columns.substitute_2, substitutions_path)?;

        let entries: Vec<CatalogEntry> = subs_rows
            .iter()
            .skip(1)
            .filter_map(|row| {
                let code = cell(row, code_idx)?;
                Some(CatalogEntry {
                    code,
                    title: cell(row, title_idx).unwrap_or_default(),
                    substitute_1: cell(row, sub1_idx),
                    substitute_2: cell(row, sub2_idx),
                })
            })
            .collect();

        info!(
            "Reference data: {} required courses, {} catalog rows",
            required.len(),
            entries.len()
        );
        Ok(Self { required, entries })
    }
}

impl ReferenceData for Catalog {
    fn required_course_codes(&self) -> &BTreeSet<String> {
        &self.required
    }

    fn substitutes_for(&self, code: &str) -> Vec<Substitute> {
        self.entries
            .iter()
            .filter(|e| e.substitutes(code))
            .map(|e| Substitute {
                code: e.code.clone(),
                title: e.title.clone(),
            })
            .collect()
    }
}

/// Header names of the reference spreadsheets.
///
/// Matching ignores case and whitespace, so `"Substitute 1"` matches
/// `"substitute1"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceColumns {
    pub code: String,
    pub title: String,
    pub substitute_1: String,
    pub substitute_2: String,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            code: "code".into(),
            title: "title".into(),
            substitute_1: "substitute-1".into(),
            substitute_2: "substitute-2".into(),
        }
    }
}

// ── Spreadsheet helpers ──────────────────────────────────────────────────

fn ensure_present(what: &'static str, path: &Path) -> Result<(), GradError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(GradError::ReferenceDataMissing {
            what,
            path: path.to_path_buf(),
        })
    }
}

fn read_first_sheet(path: &Path) -> Result<Vec<Vec<String>>, GradError> {
    let invalid = |detail: String| GradError::ReferenceDataInvalid {
        path: path.to_path_buf(),
        detail,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| invalid(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let first = sheet_names
        .first()
        .ok_or_else(|| invalid("workbook has no sheets".into()))?;
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| invalid(e.to_string()))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Render a cell as text; whole floats lose their `.0` so numeric course
/// codes read back as typed.
fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(d) => d.as_f64().to_string(),
        Data::Empty | Data::Error(_) => String::new(),
    }
}

fn cell(row: &[String], idx: usize) -> Option<String> {
    row.get(idx)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn normalise_header(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

fn header_index(rows: &[Vec<String>], name: &str, path: &Path) -> Result<usize, GradError> {
    let wanted = normalise_header(name);
    rows.first()
        .and_then(|header| header.iter().position(|h| normalise_header(h) == wanted))
        .ok_or_else(|| GradError::ReferenceDataInvalid {
            path: path.to_path_buf(),
            detail: format!("missing column '{name}'"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(code: &str, title: &str, s1: Option<&str>, s2: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            code: code.into(),
            title: title.into(),
            substitute_1: s1.map(Into::into),
            substitute_2: s2.map(Into::into),
        }
    }

    #[test]
    fn substitutes_match_either_column_in_row_order() {
        let catalog = Catalog::new(
            vec![],
            vec![
                entry("MAT201", "Linear Algebra II", Some("MAT101"), None),
                entry("FIZ110", "Physics Lab", None, None),
                entry("MAT205", "Applied Algebra", Some("MAT102"), Some("MAT101")),
            ],
        );
        let subs = catalog.substitutes_for("MAT101");
        let codes: Vec<_> = subs.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["MAT201", "MAT205"]);
        assert!(catalog.substitutes_for("FIZ110").is_empty());
    }

    #[test]
    fn required_codes_are_deduplicated() {
        let catalog = Catalog::new(
            vec!["MAT101".to_string(), "MAT101".to_string(), "FIZ101".to_string()],
            vec![],
        );
        assert_eq!(catalog.required_course_codes().len(), 2);
    }

    #[test]
    fn missing_workbook_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::from_workbooks(
            &dir.path().join("required.xlsx"),
            &dir.path().join("subs.xlsx"),
            &ReferenceColumns::default(),
        )
        .unwrap_err();
        match err {
            GradError::ReferenceDataMissing { what, .. } => {
                assert_eq!(what, "required-course list")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Write `rows` to the first sheet of a new xlsx; empty strings stay blank.
    fn write_workbook(path: &Path, rows: &[&[&str]]) {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let coordinate = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                sheet.get_cell_mut(coordinate.as_str()).set_value(*value);
            }
        }
        umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
    }

    fn write_reference_workbooks(dir: &Path, catalog_header: &[&str]) -> (PathBuf, PathBuf) {
        let required = dir.join("required.xlsx");
        write_workbook(
            &required,
            &[
                &["Title", "Code"],
                &["Calculus I", "MAT101"],
                &["Orphan title", ""],
                &["Physics I", " FIZ101 "],
                &["Calculus I (repeat)", "MAT101"],
            ],
        );
        let substitutions = dir.join("substitutions.xlsx");
        write_workbook(
            &substitutions,
            &[
                catalog_header,
                &["FIZ103", "Physics I (new curriculum)", "FIZ101", ""],
                &["", "Row without a code", "MAT101", ""],
                &["MAT205", "Applied Algebra", "MAT102", "MAT101"],
                &["MAT103", "Calculus I (new curriculum)", "MAT101", ""],
            ],
        );
        (required, substitutions)
    }

    #[test]
    fn workbooks_load_required_set_and_catalog_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (required, substitutions) = write_reference_workbooks(
            dir.path(),
            &["Code", "Title", "Substitute-1", "SUBSTITUTE-2"],
        );

        let catalog =
            Catalog::from_workbooks(&required, &substitutions, &ReferenceColumns::default())
                .unwrap();

        let codes: Vec<_> = catalog.required_course_codes().iter().cloned().collect();
        assert_eq!(codes, vec!["FIZ101", "MAT101"]);

        assert_eq!(
            catalog.entries(),
            &[
                entry("FIZ103", "Physics I (new curriculum)", Some("FIZ101"), None),
                entry("MAT205", "Applied Algebra", Some("MAT102"), Some("MAT101")),
                entry("MAT103", "Calculus I (new curriculum)", Some("MAT101"), None),
            ]
        );
        let subs: Vec<_> = catalog
            .substitutes_for("MAT101")
            .into_iter()
            .map(|s| s.code)
            .collect();
        assert_eq!(subs, vec!["MAT205", "MAT103"]);
    }

    #[test]
    fn workbook_without_substitute_column_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let (required, substitutions) =
            write_reference_workbooks(dir.path(), &["Code", "Title", "Substitute-1", "Notes"]);

        let err = Catalog::from_workbooks(&required, &substitutions, &ReferenceColumns::default())
            .unwrap_err();
        match err {
            GradError::ReferenceDataInvalid { path, detail } => {
                assert_eq!(path, substitutions);
                assert!(detail.contains("substitute-2"), "got: {detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_lookup_ignores_case_and_spaces() {
        let rows = vec![vec!["Code".to_string(), "Substitute 1".to_string()]];
        let path = Path::new("x.xlsx");
        assert_eq!(header_index(&rows, "substitute1", path).unwrap(), 1);
        assert!(header_index(&rows, "title", path).is_err());
    }

    #[test]
    fn whole_float_cells_render_as_integers() {
        assert_eq!(cell_to_string(&Data::Float(1010.0)), "1010");
        assert_eq!(cell_to_string(&Data::Float(7.5)), "7.5");
        assert_eq!(cell_to_string(&Data::String(" MAT101 ".into())), "MAT101");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
