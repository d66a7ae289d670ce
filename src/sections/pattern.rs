//! Pattern-based section detection: scans every text-bearing leaf node (not
//! just the ones the heading detector promoted) for an `Item N`/`Part N`
//! pattern at the start of its text. This is the fallback that makes
//! section extraction work on filings where item headers were authored as
//! plain bold paragraph text rather than real heading markup — the exact
//! gap the `<h#>`-only approach misses.

use crate::types::{DetectionMethod, Node};

use super::{extend_ends_to_next_start, item_id_from_text, node_text, part_id_from_text, SectionCandidate};

pub fn detect(nodes: &[Node], doc_len: usize) -> Vec<SectionCandidate> {
    let mut candidates = Vec::new();
    let mut open_part: Option<String> = None;

    for node in nodes {
        let Some(text) = node_text(node) else { continue };
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.chars().count() > 200 {
            continue;
        }

        if let Some(part_id) = part_id_from_text(trimmed) {
            open_part = Some(part_id.clone());
            candidates.push(SectionCandidate {
                id: part_id,
                title: trimmed.to_string(),
                start_offset: node.span.start,
                end_offset: node.span.end,
                confidence: 0.75,
                method: DetectionMethod::Pattern,
            });
            continue;
        }

        if let Some((item_id, title)) = item_id_from_text(trimmed) {
            let id = super::compound_id(open_part.as_deref(), &item_id);
            candidates.push(SectionCandidate {
                id,
                title,
                start_offset: node.span.start,
                end_offset: node.span.end,
                confidence: 0.8,
                method: DetectionMethod::Pattern,
            });
        }
    }

    extend_ends_to_next_start(candidates, doc_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, NodeKind, Span};

    fn text_node(id: u32, text: &str, start: usize, end: usize) -> Node {
        let mut n = Node::new(NodeId(id), Some(NodeId(0)), Span::new(start, end), NodeKind::Paragraph { text: text.to_string() });
        n.parent = Some(NodeId(0));
        n
    }

    #[test]
    fn plain_paragraph_item_header_is_detected() {
        let nodes = vec![
            Node::new(NodeId(0), None, Span::new(0, 10), NodeKind::Document),
            text_node(1, "Item 2.02. Results of Operations and Financial Condition", 0, 10),
        ];
        let candidates = detect(&nodes, 10);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "item_202");
    }

    #[test]
    fn part_prefixes_subsequent_items() {
        let nodes = vec![
            Node::new(NodeId(0), None, Span::new(0, 10), NodeKind::Document),
            text_node(1, "Part II", 0, 2),
            text_node(2, "Item 1. Legal Proceedings", 2, 10),
        ];
        let candidates = detect(&nodes, 10);
        assert_eq!(candidates[1].id, "part_ii_item_1");
    }
}
