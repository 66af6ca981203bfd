//! Substitution resolver: catalog alternatives for failed courses.

use crate::engine::FailedCourse;
use crate::reference::{ReferenceData, Substitute};
use std::collections::BTreeMap;
use tracing::debug;

/// Map each failed course code to the catalog courses that list it as
/// substitute-1 or substitute-2.
///
/// Codes with no alternatives are left out of the map entirely. A course
/// failed more than once is looked up once. Substitutes keep the reference
/// data's row order.
pub fn resolve(
    failed: &[FailedCourse],
    reference: &dyn ReferenceData,
) -> BTreeMap<String, Vec<Substitute>> {
    let mut resolved = BTreeMap::new();
    for course in failed {
        if resolved.contains_key(&course.code) {
            continue;
        }
        let substitutes = reference.substitutes_for(&course.code);
        debug!(
            "{}: {} substitute(s) in catalog",
            course.code,
            substitutes.len()
        );
        if !substitutes.is_empty() {
            resolved.insert(course.code.clone(), substitutes);
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Catalog, CatalogEntry};

    fn failed(code: &str) -> FailedCourse {
        FailedCourse {
            code: code.into(),
            title: format!("{code} title"),
            grade: "FF".into(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            Vec::<String>::new(),
            vec![
                CatalogEntry {
                    code: "MAT201".into(),
                    title: "Linear Algebra".into(),
                    substitute_1: Some("MAT101".into()),
                    substitute_2: None,
                },
                CatalogEntry {
                    code: "MAT202".into(),
                    title: "Numerical Methods".into(),
                    substitute_1: None,
                    substitute_2: Some("MAT101".into()),
                },
            ],
        )
    }

    #[test]
    fn resolves_and_omits_empty_entries() {
        let map = resolve(&[failed("MAT101"), failed("FIZ101")], &catalog());
        assert_eq!(map.len(), 1);
        let codes: Vec<_> = map["MAT101"].iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["MAT201", "MAT202"]);
        assert!(!map.contains_key("FIZ101"));
    }

    #[test]
    fn repeated_failures_resolve_once() {
        let map = resolve(&[failed("MAT101"), failed("MAT101")], &catalog());
        assert_eq!(map["MAT101"].len(), 2);
    }

    #[test]
    fn no_failures_no_entries() {
        assert!(resolve(&[], &catalog()).is_empty());
    }
}
