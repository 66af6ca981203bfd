//! Post-processing: deterministic cleanup of OCR output before row parsing.
//!
//! Both OCR engines produce text that is right in content but awkward in
//! form. Tesseract emits ligatures, stray zero-width characters and CRLF
//! line endings; vision models wrap their answer in code fences or lay the
//! rows out as a Markdown pipe table despite being asked not to. The line
//! pattern strategy expects one course per line with whitespace-separated
//! fields, so these rules reshape the text into exactly that.
//!
//! ## Rule Order
//!
//! Fences go first so the table rules see bare rows; invisible characters
//! go before whitespace collapsing so a zero-width space between two tokens
//! does not survive as a token boundary.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw OCR output.
///
/// Rules (applied in order):
/// 1. Strip outer code fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Expand typographic ligatures (`ﬁ` → `fi`)
/// 5. Drop Markdown table separator rows and unwrap pipe-delimited cells
/// 6. Collapse whitespace runs inside each line, trim, drop blank lines
pub fn clean_ocr_text(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = expand_ligatures(&s);
    let s = unwrap_pipe_tables(&s);
    collapse_whitespace(&s)
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Expand ligatures ─────────────────────────────────────────────────

fn expand_ligatures(input: &str) -> String {
    input
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

// ── Rule 5: Unwrap Markdown pipe tables ──────────────────────────────────────

static RE_SEPARATOR_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\|?\s*:?-{3,}:?\s*(\|\s*:?-{3,}:?\s*)*\|?\s*$").unwrap());

fn unwrap_pipe_tables(input: &str) -> String {
    input
        .lines()
        .filter(|line| !RE_SEPARATOR_ROW.is_match(line))
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 1 {
                trimmed[1..trimmed.len() - 1]
                    .split('|')
                    .map(str::trim)
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse whitespace ──────────────────────────────────────────────

static RE_INNER_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| RE_INNER_WS.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```text\nMAT101 Calculus 6,0 AA Z\n```";
        assert_eq!(strip_code_fences(input), "MAT101 Calculus 6,0 AA Z");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "MAT101 Calculus 6,0 AA Z";
        assert_eq!(strip_code_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("MAT\u{200B}101"), "MAT101");
    }

    #[test]
    fn test_ligatures() {
        assert_eq!(expand_ligatures("Quanti\u{FB01}ed"), "Quantified");
    }

    #[test]
    fn test_unwrap_pipe_table() {
        let input = "| Code | Title | Credit |\n|---|:---:|---|\n| MAT101 | Calculus I | 6,0 |";
        assert_eq!(
            unwrap_pipe_tables(input),
            "Code Title Credit\nMAT101 Calculus I 6,0"
        );
    }

    #[test]
    fn test_collapse_whitespace_drops_blank_lines() {
        let input = "  MAT101\t\tCalculus   I  \n\n   \nFIZ101 Physics";
        assert_eq!(
            collapse_whitespace(input),
            "MAT101 Calculus I\nFIZ101 Physics"
        );
    }

    #[test]
    fn test_clean_ocr_text_full_pipeline() {
        let input = "```\r\n| MAT101 | Calculus I | 6,0 | AA | Z |\r\n|---|---|---|---|---|\r\n| ENG101 | Academic English (\u{200B}İng) | 4,0 | FF | Z |\r\n```";
        assert_eq!(
            clean_ocr_text(input),
            "MAT101 Calculus I 6,0 AA Z\nENG101 Academic English (İng) 4,0 FF Z"
        );
    }
}
