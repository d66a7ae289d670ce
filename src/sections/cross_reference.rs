//! Cross Reference Index detection: the GE-style 10-K front matter table
//! mapping each item to a page (or page range) in the printed filing, e.g.
//!
//! | Item    | Page |
//! |---------|------|
//! | Item 1  | 3    |
//! | Item 1A | 7-12 |
//!
//! Two ways to turn a recognized index into sections, per the item id it
//! names:
//!
//! 1. **Corroboration.** If the heading strategy already found a real
//!    heading for that item id, reuse its span with boosted confidence —
//!    the index and the body agree, so trust the body's own offsets.
//! 2. **Page-range fallback.** If no heading exists for that id (the GE-style
//!    filing this strategy exists for: items are *only* referenced through
//!    the index, never as inline headings), resolve its declared page range
//!    against the page-break markers `builder::engine` collected while
//!    walking the document, per §4.6's "walk page breaks ... to map page
//!    numbers to offsets." Best-effort: if the document carries no page
//!    break markers at all, this item contributes nothing rather than
//!    guessing — per the Open Question, an invented offset is worse than no
//!    detection, but a *resolvable* page reference should resolve.

use std::sync::LazyLock;

use regex::Regex;

use crate::table::matrix::TableMatrix;
use crate::types::DetectionMethod;

use super::{item_id_from_text, SectionCandidate};

fn looks_like_page_ref(s: &str) -> bool {
    static PAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(-\d+)?$").unwrap());
    PAGE_RE.is_match(s.trim())
}

fn parse_page_ref(s: &str) -> Option<(u32, u32)> {
    let s = s.trim();
    match s.split_once('-') {
        Some((a, b)) => Some((a.trim().parse().ok()?, b.trim().parse().ok()?)),
        None => {
            let n: u32 = s.parse().ok()?;
            Some((n, n))
        }
    }
}

struct IndexedItem {
    id: String,
    title: String,
    pages: Option<(u32, u32)>,
}

/// Item ids (plus title and declared page range, when present) named by any
/// recognized cross-reference table in the document. A table only counts as
/// a recognized index once at least two of its rows pair an item label with
/// something that looks like a page reference — a single coincidental match
/// isn't enough to call a table a Cross Reference Index.
fn index_items(tables: &[TableMatrix]) -> Vec<IndexedItem> {
    let mut items = Vec::new();
    for table in tables {
        let mut matches_in_table = 0usize;
        let mut found = Vec::new();
        for row in 0..table.row_count {
            let cells: Vec<&str> = (0..table.col_count)
                .filter_map(|col| table.cell_at(row, col).map(|c| c.content.as_str()))
                .collect();
            let item = cells.iter().find_map(|c| item_id_from_text(c));
            let page_cell = cells.iter().find(|c| looks_like_page_ref(c));
            let has_page = page_cell.is_some() || cells.iter().any(|c| c.trim().eq_ignore_ascii_case("not applicable"));
            if let (Some((id, inline_title)), true) = (item, has_page) {
                matches_in_table += 1;
                let title = cells
                    .iter()
                    .find(|c| {
                        let t = c.trim();
                        !t.is_empty() && item_id_from_text(t).is_none() && !looks_like_page_ref(t) && !t.eq_ignore_ascii_case("not applicable")
                    })
                    .map(|s| s.trim().to_string())
                    .unwrap_or(inline_title);
                let pages = page_cell.and_then(|c| parse_page_ref(c));
                found.push(IndexedItem { id, title, pages });
            }
        }
        if matches_in_table >= 2 {
            items.extend(found);
        }
    }
    items
}

/// Page N's start offset: before the first marker the document is on page
/// 1, each subsequent marker begins the next page. `page_breaks` is sorted,
/// document-order offsets (see `builder::engine::run_engine`).
fn page_start_offset(page_breaks: &[usize], doc_len: usize, page: u32) -> usize {
    if page <= 1 {
        return 0;
    }
    page_breaks.get((page - 2) as usize).copied().unwrap_or(doc_len)
}

/// Resolve a `(start_page, end_page)` range to a `[start, end)` character
/// span: the union of every page in the range, per §4.6's "union of the
/// byte ranges for each of I's page spans."
fn resolve_page_range(page_breaks: &[usize], doc_len: usize, start_page: u32, end_page: u32) -> Option<(usize, usize)> {
    if page_breaks.is_empty() {
        return None;
    }
    let start = page_start_offset(page_breaks, doc_len, start_page);
    let end = page_start_offset(page_breaks, doc_len, end_page.max(start_page) + 1).max(start);
    let end = end.min(doc_len);
    if end > start {
        Some((start, end))
    } else {
        None
    }
}

/// Recognize a Cross Reference Index table and turn each item it names into
/// a section: corroborate against a matching heading candidate if one
/// exists, otherwise fall back to resolving its declared page range against
/// `page_breaks`.
pub fn detect(tables: &[TableMatrix], heading_candidates: &[SectionCandidate], page_breaks: &[usize], doc_len: usize) -> Vec<SectionCandidate> {
    let named = index_items(tables);
    if named.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for item in named {
        if let Some(hit) = heading_candidates.iter().find(|c| c.id == item.id) {
            candidates.push(SectionCandidate {
                id: hit.id.clone(),
                title: hit.title.clone(),
                start_offset: hit.start_offset,
                end_offset: hit.end_offset,
                confidence: (hit.confidence + 0.15).min(1.0),
                method: DetectionMethod::CrossReferenceIndex,
            });
            continue;
        }
        let Some((start_page, end_page)) = item.pages else { continue };
        if let Some((start, end)) = resolve_page_range(page_breaks, doc_len, start_page, end_page) {
            candidates.push(SectionCandidate {
                id: item.id,
                title: item.title,
                start_offset: start,
                end_offset: end,
                confidence: 0.6,
                method: DetectionMethod::CrossReferenceIndex,
            });
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::tokenizer::Tokenizer;
    use crate::table::matrix::parse_raw_table;

    fn build_table(html: &str) -> TableMatrix {
        let tokens = Tokenizer::new(html).tokenize();
        let (raw, _) = parse_raw_table(&tokens);
        TableMatrix::from_raw(raw)
    }

    #[test]
    fn recognizes_item_to_page_index_and_corroborates_known_heading() {
        let table = build_table(
            "<table><tr><td>Item 1</td><td>3</td></tr><tr><td>Item 1A</td><td>7-12</td></tr></table>",
        );
        let heading_candidates = vec![SectionCandidate {
            id: "item_1".to_string(),
            title: "Business".to_string(),
            start_offset: 500,
            end_offset: 900,
            confidence: 0.7,
            method: DetectionMethod::Heading,
        }];
        let result = detect(&[table], &heading_candidates, &[], 0);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "item_1");
        assert!(result[0].confidence > 0.7);
    }

    #[test]
    fn a_table_with_no_page_column_is_not_mistaken_for_an_index() {
        let table = build_table("<table><tr><td>Item 1</td><td>Business</td></tr></table>");
        let result = detect(&[table], &[], &[], 0);
        assert!(result.is_empty());
    }

    #[test]
    fn an_item_with_no_corroborating_heading_resolves_via_page_breaks() {
        let table = build_table(
            "<table><tr><td>Item 1</td><td>Business</td><td>1-2</td></tr>\
             <tr><td>Item 1A</td><td>Risk Factors</td><td>3-5</td></tr></table>",
        );
        // Four page breaks: pages are [0,100) [100,200) [200,300) [300,400) [400,doc_len).
        let page_breaks = vec![100, 200, 300, 400];
        let result = detect(&[table], &[], &page_breaks, 600);
        let risk = result.iter().find(|c| c.id == "item_1a").expect("item_1a resolved from its page range");
        assert_eq!(risk.method, DetectionMethod::CrossReferenceIndex);
        assert_eq!(risk.start_offset, 200);
        assert_eq!(risk.end_offset, 600);
        assert_eq!(risk.title, "Risk Factors");
    }

    #[test]
    fn no_page_breaks_in_the_document_means_no_fallback_span() {
        let table = build_table("<table><tr><td>Item 1</td><td>Business</td><td>1-2</td></tr>\
             <tr><td>Item 1A</td><td>Risk Factors</td><td>3-5</td></tr></table>");
        let result = detect(&[table], &[], &[], 600);
        assert!(result.is_empty());
    }
}
