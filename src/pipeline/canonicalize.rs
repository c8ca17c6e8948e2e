//! Markdown → plain text, so converter output can be compared with OCR output.
//!
//! OCR engines produce bare text while document converters produce markdown.
//! Before the two are diffed or scored, the markup has to go. This is not a
//! markdown renderer: seven regex passes remove the constructs converters
//! actually emit and leave everything else alone.
//!
//! ## Rule Order
//!
//! Headings first, then bold before italic so `**` is never read as two
//! italic markers. Images are dropped before links are unwrapped, because an
//! image embed `![alt](url)` contains a link-shaped `[alt](url)`. Blank-run
//! collapsing and trimming come last since earlier rules can empty lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Strip markdown markup from `markdown`, returning comparable plain text.
///
/// Rules (applied in order):
/// 1. Drop heading markers (`#`–`######` plus following whitespace)
/// 2. Unwrap bold `**text**`
/// 3. Unwrap italic `*text*`
/// 4. Remove image embeds `![alt](url)` entirely
/// 5. Unwrap links `[text](url)` to their text
/// 6. Unwrap inline code `` `text` ``
/// 7. Collapse 3+ newlines to exactly two, then trim
pub fn markdown_to_plain_text(markdown: &str) -> String {
    let s = strip_headings(markdown);
    let s = unwrap_bold(&s);
    let s = unwrap_italic(&s);
    let s = remove_images(&s);
    let s = unwrap_links(&s);
    let s = unwrap_inline_code(&s);
    let s = collapse_blank_runs(&s);
    s.trim().to_string()
}

// ── Rule 1: Headings ─────────────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"#{1,6}\s+").unwrap());

fn strip_headings(input: &str) -> String {
    RE_HEADING.replace_all(input, "").into_owned()
}

// ── Rules 2–3: Emphasis ──────────────────────────────────────────────────────

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").unwrap());

fn unwrap_bold(input: &str) -> String {
    RE_BOLD.replace_all(input, "${1}").into_owned()
}

fn unwrap_italic(input: &str) -> String {
    RE_ITALIC.replace_all(input, "${1}").into_owned()
}

// ── Rules 4–5: Images and links ──────────────────────────────────────────────

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.*?\]\(.*?\)").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.+?)\]\(.*?\)").unwrap());

fn remove_images(input: &str) -> String {
    RE_IMAGE.replace_all(input, "").into_owned()
}

fn unwrap_links(input: &str) -> String {
    RE_LINK.replace_all(input, "${1}").into_owned()
}

// ── Rule 6: Inline code ──────────────────────────────────────────────────────

static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.+?)`").unwrap());

fn unwrap_inline_code(input: &str) -> String {
    RE_INLINE_CODE.replace_all(input, "${1}").into_owned()
}

// ── Rule 7: Blank runs ───────────────────────────────────────────────────────

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_runs(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
