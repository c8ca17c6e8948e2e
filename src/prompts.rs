//! System prompt for the vision-LLM document converter.
//!
//! The converter's markdown is later flattened by
//! [`crate::pipeline::canonicalize::markdown_to_plain_text`] and compared with
//! OCR output, so the prompt asks for faithful transcription first and light
//! structure second. Callers can override it through
//! [`crate::pipeline::vlm::VlmSettings::system_prompt`].

/// Default system prompt for transcribing one page image to markdown.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a careful document transcriber. Convert the page image to Markdown.

Follow these rules precisely:

1. TEXT
   - Transcribe ALL visible text exactly as written, including accents and diacritics
   - Keep the reading order a human would use
   - Do not translate, summarise or correct the text

2. STRUCTURE
   - Use # / ## / ### for headings that are visually headings
   - Use - for bullet lists and 1. 2. 3. for numbered lists
   - Use **bold** and *italic* only where the page shows emphasis
   - Convert tables to GFM pipe tables

3. IDENTITY DOCUMENTS AND FORMS
   - Keep field labels next to their values on the same line ("Nom: DUPONT")
   - Transcribe machine-readable zones (MRZ) line by line, character for character

4. WHAT TO IGNORE
   - Photos, logos, signatures and decorative elements (do not describe them)

5. OUTPUT FORMAT
   - Output ONLY the Markdown content
   - Do NOT wrap in ```markdown fences
   - Do NOT add commentary or explanations"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_forbids_fences_and_commentary() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("Do NOT wrap"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("diacritics"));
    }
}
