//! Merge recognizer regions into page text, document text and one confidence.

use crate::output::RecognizedRegion;

/// Text and raw confidences of one recognised page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub text: String,
    pub confidences: Vec<f64>,
}

/// Join region texts with single spaces, in the order the recognizer returned them.
pub fn aggregate_page(regions: &[RecognizedRegion]) -> PageResult {
    PageResult {
        text: regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        confidences: regions.iter().map(|r| r.confidence).collect(),
    }
}

/// Marker line placed above each page of a PDF.
pub fn page_marker(page_num: usize) -> String {
    format!("--- Page {} ---", page_num)
}

/// Join PDF pages: each page behind its marker, pages separated by a blank line.
///
/// `pages` holds `(page_number, page)` pairs already in document order.
pub fn join_pdf_pages(pages: &[(usize, PageResult)]) -> String {
    pages
        .iter()
        .map(|(num, page)| format!("{}\n{}", page_marker(*num), page.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Mean of every confidence across `pages`, rounded to two decimals.
///
/// Zero regions yields exactly `0.0`, never a missing value.
pub fn overall_confidence<'a>(pages: impl IntoIterator<Item = &'a PageResult>) -> f64 {
    let (sum, count) = pages
        .into_iter()
        .flat_map(|p| p.confidences.iter())
        .fold((0.0f64, 0usize), |(s, n), c| (s + c, n + 1));
    if count == 0 {
        return 0.0;
    }
    round2(sum / count as f64)
}

/// Two decimals, exact halves to the even neighbour (0.125 -> 0.12).
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
