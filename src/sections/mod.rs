//! Section detection: five independent strategies (TOC, cross-reference
//! index, heading, pattern, contextual) whose candidates are combined by
//! weighted vote in `hybrid`.

pub mod contextual;
pub mod cross_reference;
pub mod header_detection;
pub mod hybrid;
pub mod pattern;
pub mod toc;

pub use hybrid::{HybridSectionDetector, SectionCandidate};

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Node, NodeKind};

/// The text a leaf text-bearing node carries, if any.
pub fn node_text(node: &Node) -> Option<&str> {
    match &node.kind {
        NodeKind::Heading { text, .. } => Some(text),
        NodeKind::Paragraph { text } => Some(text),
        NodeKind::Text { text } => Some(text),
        _ => None,
    }
}

/// Extract a normalized section id and the remainder title from heading-like
/// text, e.g. `"Item 2.02. Results of Operations"` -> `("item_202",
/// "Results of Operations")`, `"Item 1A. Risk Factors"` -> `("item_1a", ...)`.
///
/// The id strips punctuation from the item number (`5.02` -> `502`) and
/// lowercases any trailing letter suffix, matching the glossary's
/// `item_1a`/`item_502`-style identifiers.
pub fn item_id_from_text(text: &str) -> Option<(String, String)> {
    static ITEM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)^item\s+([0-9]+(?:\.[0-9]+)?[a-z]?)\.?\s*(.*)$").unwrap());
    let caps = ITEM_RE.captures(text.trim())?;
    let number = caps[1].to_ascii_lowercase().replace('.', "");
    let title = caps[2].trim().to_string();
    Some((format!("item_{number}"), if title.is_empty() { text.trim().to_string() } else { title }))
}

/// Extract a normalized part id from text like `"Part II"` -> `"part_ii"`.
pub fn part_id_from_text(text: &str) -> Option<String> {
    static PART_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^part\s+([ivx]+)\b").unwrap());
    let caps = PART_RE.captures(text.trim())?;
    Some(format!("part_{}", caps[1].to_ascii_lowercase()))
}

/// Combine a part id (if currently open) with an item id into the
/// `part_ii_item_2`-style compound identifier the glossary documents for
/// 10-Q filings.
pub fn compound_id(part: Option<&str>, item: &str) -> String {
    match part {
        Some(p) => format!("{p}_{item}"),
        None => item.to_string(),
    }
}

/// Stretch each candidate's `end_offset` from its own triggering node's
/// narrow span out to the next candidate's `start_offset` (or `doc_len` for
/// the last one). A heading or pattern match only spans its own text; the
/// section it opens runs until the next one starts. Assumes `candidates` is
/// already in document order, which both `hybrid::heading_candidates` and
/// `pattern::detect` produce by construction.
pub fn extend_ends_to_next_start(mut candidates: Vec<hybrid::SectionCandidate>, doc_len: usize) -> Vec<hybrid::SectionCandidate> {
    let starts: Vec<usize> = candidates.iter().map(|c| c.start_offset).collect();
    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.end_offset = starts.get(i + 1).copied().unwrap_or(doc_len);
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_strips_punctuation_from_decimal_item_numbers() {
        let (id, title) = item_id_from_text("Item 5.02. Departure of Directors").unwrap();
        assert_eq!(id, "item_502");
        assert_eq!(title, "Departure of Directors");
    }

    #[test]
    fn item_id_lowercases_letter_suffix() {
        let (id, _) = item_id_from_text("Item 1A. Risk Factors").unwrap();
        assert_eq!(id, "item_1a");
    }

    #[test]
    fn part_id_normalizes_roman_numeral() {
        assert_eq!(part_id_from_text("Part II").as_deref(), Some("part_ii"));
    }

    #[test]
    fn compound_id_joins_part_and_item() {
        assert_eq!(compound_id(Some("part_ii"), "item_2"), "part_ii_item_2");
        assert_eq!(compound_id(None, "item_2"), "item_2");
    }

    #[test]
    fn extend_ends_to_next_start_stretches_each_candidate_to_its_successor() {
        use crate::types::DetectionMethod;
        let narrow = |id: &str, start: usize, end: usize| hybrid::SectionCandidate {
            id: id.to_string(),
            title: id.to_string(),
            start_offset: start,
            end_offset: end,
            confidence: 0.9,
            method: DetectionMethod::Heading,
        };
        let candidates = vec![narrow("item_1", 0, 17), narrow("item_1a", 50, 68)];
        let extended = extend_ends_to_next_start(candidates, 200);
        assert_eq!(extended[0].end_offset, 50);
        assert_eq!(extended[1].end_offset, 200);
    }
}
