//! Table-of-contents section detection: resolves `<a href="#x">Item 2.
//! Properties</a>`-style same-document links against whatever anchor in the
//! body carries a matching `id`/`name`, when those links cluster near the
//! start of the document (the front-matter TOC a filing's cover pages
//! almost always carry).
//!
//! This strategy only fires when there's real anchor evidence to resolve —
//! it never guesses at offsets from link text alone.

use std::collections::HashMap;

use crate::types::{DetectionMethod, TocLink};

use super::{item_id_from_text, part_id_from_text, SectionCandidate};

/// Links whose `source_offset` falls within this fraction of total document
/// length are considered "near the start" for TOC clustering purposes.
const TOC_ZONE_FRACTION: f64 = 0.2;

/// Minimum number of same-document links resolving within the TOC zone
/// before we trust the cluster is really a table of contents and not a
/// couple of stray footnote backlinks.
const MIN_CLUSTER_SIZE: usize = 3;

pub fn detect(toc_links: &[TocLink], anchor_targets: &HashMap<String, usize>, doc_len: usize) -> Vec<SectionCandidate> {
    if doc_len == 0 {
        return Vec::new();
    }
    let zone_end = (doc_len as f64 * TOC_ZONE_FRACTION) as usize;

    let resolved: Vec<(&TocLink, usize)> = toc_links
        .iter()
        .filter(|link| link.source_offset <= zone_end)
        .filter_map(|link| anchor_targets.get(&link.target).map(|&offset| (link, offset)))
        .collect();

    if resolved.len() < MIN_CLUSTER_SIZE {
        return Vec::new();
    }

    let mut sorted = resolved;
    sorted.sort_by_key(|(_, offset)| *offset);

    let mut candidates = Vec::new();
    let mut open_part: Option<String> = None;
    for (idx, (link, start)) in sorted.iter().enumerate() {
        let end = sorted.get(idx + 1).map(|(_, o)| *o).unwrap_or(doc_len);
        let text = link.text.trim();
        if let Some(part_id) = part_id_from_text(text) {
            open_part = Some(part_id.clone());
            candidates.push(SectionCandidate {
                id: part_id,
                title: text.to_string(),
                start_offset: *start,
                end_offset: end,
                confidence: 0.9,
                method: DetectionMethod::Toc,
            });
            continue;
        }
        if let Some((item_id, title)) = item_id_from_text(text) {
            candidates.push(SectionCandidate {
                id: super::compound_id(open_part.as_deref(), &item_id),
                title,
                start_offset: *start,
                end_offset: end,
                confidence: 0.9,
                method: DetectionMethod::Toc,
            });
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_clustered_anchor_links_near_document_start() {
        let links = vec![
            TocLink { target: "toc_item1".to_string(), text: "Item 1. Business".to_string(), source_offset: 50 },
            TocLink { target: "toc_item1a".to_string(), text: "Item 1A. Risk Factors".to_string(), source_offset: 60 },
            TocLink { target: "toc_item2".to_string(), text: "Item 2. Properties".to_string(), source_offset: 70 },
        ];
        let mut targets = HashMap::new();
        targets.insert("toc_item1".to_string(), 1000);
        targets.insert("toc_item1a".to_string(), 5000);
        targets.insert("toc_item2".to_string(), 9000);

        let candidates = detect(&links, &targets, 100_000);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].id, "item_1");
        assert_eq!(candidates[0].start_offset, 1000);
        assert_eq!(candidates[0].end_offset, 5000);
    }

    #[test]
    fn small_clusters_below_minimum_are_rejected() {
        let links = vec![TocLink { target: "x".to_string(), text: "Item 1".to_string(), source_offset: 10 }];
        let mut targets = HashMap::new();
        targets.insert("x".to_string(), 500);
        assert!(detect(&links, &targets, 100_000).is_empty());
    }
}
