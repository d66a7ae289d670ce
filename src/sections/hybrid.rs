//! Combines the five section-detection strategies by weighted vote:
//! TOC 0.35, Cross Reference Index 0.30, Heading 0.25, Pattern 0.15, with
//! Contextual applied as a confidence adjustment (not an independent vote)
//! on top of whatever the other four produced. Overlapping sections are
//! resolved by trimming the later one's start to the earlier one's end;
//! anything under `detection_thresholds.min_confidence` (with a per-form
//! override, if configured) is dropped.

use std::collections::HashMap;

use regex::Regex;

use crate::config::ParserConfig;
use crate::table::matrix::TableMatrix;
use crate::types::{DetectionMethod, Node, NodeKind, TocLink};

use super::{contextual, cross_reference, extend_ends_to_next_start, item_id_from_text, part_id_from_text, pattern, toc};

#[derive(Debug, Clone)]
pub struct SectionCandidate {
    pub id: String,
    pub title: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub confidence: f32,
    pub method: DetectionMethod,
}

fn strategy_weight(method: DetectionMethod) -> f32 {
    match method {
        DetectionMethod::Toc => 0.35,
        DetectionMethod::CrossReferenceIndex => 0.30,
        DetectionMethod::Heading => 0.25,
        DetectionMethod::Pattern => 0.15,
        DetectionMethod::Contextual => 0.10,
        _ => 0.10,
    }
}

fn match_known_category(text: &str, patterns: &HashMap<String, Vec<String>>) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    for (category, regexes) in patterns {
        for pat in regexes {
            if let Ok(re) = Regex::new(pat) {
                if re.is_match(&lower) {
                    return Some(category.clone());
                }
            }
        }
    }
    None
}

/// Per §4.5's Heading strategy: "the heading is a start; the next matching
/// heading is the end." Each heading node's own `span` covers only its own
/// text (see `builder::engine::close_top`), so the candidates built here
/// start narrow and get stretched to the next one's start (or `doc_len`) in
/// one pass at the end, in document order — the same shape `toc::detect`
/// already uses for TOC-derived candidates.
fn heading_candidates(nodes: &[Node], headings: &[crate::types::NodeId], doc_len: usize, cfg: &ParserConfig) -> Vec<SectionCandidate> {
    let mut out = Vec::new();
    let mut open_part: Option<String> = None;
    for &hid in headings {
        let node = &nodes[hid.0 as usize];
        let NodeKind::Heading { text, confidence, .. } = &node.kind else { continue };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(part_id) = part_id_from_text(trimmed) {
            open_part = Some(part_id.clone());
            out.push(SectionCandidate {
                id: part_id,
                title: trimmed.to_string(),
                start_offset: node.span.start,
                end_offset: node.span.end,
                confidence: *confidence,
                method: DetectionMethod::Heading,
            });
            continue;
        }
        if let Some((item_id, title)) = item_id_from_text(trimmed) {
            out.push(SectionCandidate {
                id: super::compound_id(open_part.as_deref(), &item_id),
                title,
                start_offset: node.span.start,
                end_offset: node.span.end,
                confidence: *confidence,
                method: DetectionMethod::Heading,
            });
            continue;
        }
        if let Some(category) = match_known_category(trimmed, &cfg.section_patterns) {
            out.push(SectionCandidate {
                id: category,
                title: trimmed.to_string(),
                start_offset: node.span.start,
                end_offset: node.span.end,
                confidence: *confidence,
                method: DetectionMethod::Heading,
            });
        }
    }
    extend_ends_to_next_start(out, doc_len)
}

/// Merge every strategy's candidates for the same id into one, weighting
/// each contribution by its strategy's vote weight (mirrors
/// `header_detection::combine`'s confidence-times-weight averaging). The
/// span reported is whichever single contribution carried the most weight.
fn merge_by_id(all: Vec<SectionCandidate>) -> Vec<SectionCandidate> {
    let mut groups: HashMap<String, Vec<SectionCandidate>> = HashMap::new();
    for c in all {
        groups.entry(c.id.clone()).or_default().push(c);
    }

    let mut merged = Vec::with_capacity(groups.len());
    for (id, group) in groups {
        let mut total_weight = 0.0f32;
        let mut total_confidence = 0.0f32;
        let mut best: Option<&SectionCandidate> = None;
        let mut best_score = -1.0f32;
        for c in &group {
            let w = strategy_weight(c.method);
            total_weight += w;
            total_confidence += c.confidence * w;
            let score = c.confidence * w;
            if score > best_score {
                best_score = score;
                best = Some(c);
            }
        }
        let best = best.unwrap();
        let confidence = if total_weight > 0.0 { total_confidence / total_weight } else { best.confidence };
        // Agreement across independent strategies corroborates the call;
        // a lone strategy's vote stands on its own confidence.
        let agreement_bonus = if group.len() > 1 { 0.05 * (group.len() - 1) as f32 } else { 0.0 };

        merged.push(SectionCandidate {
            id,
            title: best.title.clone(),
            start_offset: best.start_offset,
            end_offset: best.end_offset,
            confidence: (confidence + agreement_bonus).min(1.0),
            method: if group.len() > 1 { DetectionMethod::Combined } else { best.method },
        });
    }
    merged
}

/// Trim overlapping sections (later start clamped to earlier end) and
/// penalize the later one's confidence, per the documented overlap policy.
fn resolve_overlaps(mut candidates: Vec<SectionCandidate>, boundary_overlap_penalty: f32) -> Vec<SectionCandidate> {
    candidates.sort_by_key(|c| c.start_offset);
    for i in 1..candidates.len() {
        let prev_end = candidates[i - 1].end_offset;
        if candidates[i].start_offset < prev_end {
            candidates[i].start_offset = prev_end;
            candidates[i].confidence *= boundary_overlap_penalty;
        }
        if candidates[i].end_offset < candidates[i].start_offset {
            candidates[i].end_offset = candidates[i].start_offset;
        }
    }
    candidates
}

pub struct HybridSectionDetector;

impl HybridSectionDetector {
    /// Run all five strategies and return the final, threshold-filtered,
    /// non-overlapping section list in document order.
    pub fn detect(
        nodes: &[Node],
        headings: &[crate::types::NodeId],
        tables: &[TableMatrix],
        toc_links: &[TocLink],
        anchor_targets: &HashMap<String, usize>,
        page_breaks: &[usize],
        doc_len: usize,
        cfg: &ParserConfig,
    ) -> Vec<SectionCandidate> {
        let headings_found = heading_candidates(nodes, headings, doc_len, cfg);
        let toc_found = toc::detect(toc_links, anchor_targets, doc_len);
        let cross_ref_found = cross_reference::detect(tables, &headings_found, page_breaks, doc_len);
        let pattern_found = if headings_found.is_empty() {
            pattern::detect(nodes, doc_len)
        } else {
            Vec::new()
        };

        let mut all = Vec::new();
        all.extend(headings_found);
        all.extend(toc_found);
        all.extend(cross_ref_found);
        all.extend(pattern_found);

        let mut merged = merge_by_id(all);

        if cfg.detection_thresholds.enable_cross_validation {
            merged = contextual::adjust(merged, doc_len, &cfg.detection_thresholds);
        }

        let resolved = resolve_overlaps(merged, cfg.detection_thresholds.boundary_overlap_penalty);

        let min_confidence = cfg
            .form
            .as_deref()
            .and_then(|form| cfg.detection_thresholds.thresholds_by_form.get(form))
            .and_then(|overrides| overrides.get("min_confidence"))
            .copied()
            .unwrap_or(cfg.detection_thresholds.min_confidence);

        let mut out: Vec<SectionCandidate> = resolved.into_iter().filter(|c| c.confidence >= min_confidence).collect();
        out.sort_by_key(|c| c.start_offset);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, Span};

    #[test]
    fn plain_text_items_are_found_when_no_real_headings_exist() {
        let nodes = vec![
            Node::new(NodeId(0), None, Span::new(0, 300), NodeKind::Document),
            {
                let mut n = Node::new(NodeId(1), Some(NodeId(0)), Span::new(0, 60), NodeKind::Paragraph {
                    text: "Item 5.02. Departure of Directors or Certain Officers".to_string(),
                });
                n.parent = Some(NodeId(0));
                n
            },
        ];
        let cfg = ParserConfig::default();
        let result = HybridSectionDetector::detect(&nodes, &[], &[], &[], &HashMap::new(), &[], 300, &cfg);
        assert!(result.iter().any(|c| c.id == "item_502"));
    }

    #[test]
    fn overlapping_sections_have_the_later_start_trimmed() {
        let candidates = vec![
            SectionCandidate { id: "a".into(), title: "A".into(), start_offset: 0, end_offset: 100, confidence: 0.9, method: DetectionMethod::Heading },
            SectionCandidate { id: "b".into(), title: "B".into(), start_offset: 50, end_offset: 200, confidence: 0.9, method: DetectionMethod::Heading },
        ];
        let resolved = resolve_overlaps(candidates, 0.9);
        assert_eq!(resolved[1].start_offset, 100);
    }
}
