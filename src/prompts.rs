//! Prompts for vision-model transcription of scanned transcript pages.
//!
//! The vision engine is asked for plain rows, not Markdown: its output goes
//! through the same line pattern as the text layer, so any structure the
//! model invents has to be stripped again afterwards. Callers can override
//! the prompt via [`crate::config::VisionSettings::system_prompt`].

/// Default system prompt for transcribing one transcript page image.
pub const TRANSCRIPTION_PROMPT: &str = r#"You are transcribing a page of a university academic transcript.

Follow these rules precisely:

1. ROWS
   - Output one line per course row, top to bottom, in the order printed
   - Keep the columns in printed order: code, title, credit, grade, category,
     then any replacement course codes
   - Separate columns with a single space

2. FIDELITY
   - Copy course codes, grades and category codes exactly as printed
   - Copy credits exactly, keeping the decimal comma or point as printed
   - Keep language markers in titles, such as (İng) or (ENG)
   - Do not correct, translate or expand anything

3. WHAT TO IGNORE
   - Student name, number, photo and address blocks
   - Semester headers, term averages and cumulative averages
   - Page numbers, signatures, stamps and footers

4. OUTPUT FORMAT
   - Output ONLY the rows
   - Do NOT use Markdown tables or code fences
   - Do NOT add commentary
   - If the page has no course rows, output nothing"#;

/// The user turn sent with each page image.
pub fn page_instruction(page_num: usize) -> String {
    format!("Transcribe the course rows on page {page_num}.")
}
