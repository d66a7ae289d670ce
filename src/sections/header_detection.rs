//! Multi-strategy header detection: style, pattern, structural, and
//! contextual evidence, combined by weighted vote.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{DetectionMethod, StyleInfo};

/// Evidence gathered about a single candidate element, independent of how
/// it was obtained — built by the tree builder from whatever raw-element
/// state it has at the point a frame finalizes.
pub struct ElementContext<'a> {
    pub tag: &'a str,
    pub text: &'a str,
    pub style: Option<&'a StyleInfo>,
    pub base_font_size_pt: f32,
    pub is_alone_in_parent: bool,
    pub next_sibling_text_len: Option<usize>,
    pub prev_sibling_text: Option<&'a str>,
    pub depth: usize,
    pub has_current_section: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderInfo {
    pub level: u8,
    pub confidence: f32,
    pub text: String,
    pub detection_method: DetectionMethod,
    pub is_item: bool,
    pub item_number: Option<String>,
}

impl HeaderInfo {
    fn from_text(text: &str, level: u8, confidence: f32, method: DetectionMethod) -> Self {
        let (is_item, item_number) = extract_item_number(text);
        Self {
            level,
            confidence,
            text: text.to_string(),
            detection_method: method,
            is_item,
            item_number,
        }
    }
}

fn extract_item_number(text: &str) -> (bool, Option<String>) {
    static ITEM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)^item\s+(\d+[A-Za-z]?)").unwrap());
    match ITEM_RE.captures(text.trim()) {
        Some(caps) => (true, Some(caps[1].to_string())),
        None => (false, None),
    }
}

fn is_skippable(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 200 {
        return true;
    }
    if trimmed.chars().count() == 1 && ".,!?;:()[]{}".contains(trimmed) {
        return true;
    }
    false
}

fn detect_style_based(ctx: &ElementContext) -> Option<HeaderInfo> {
    let style = ctx.style?;
    if is_skippable(ctx.text) {
        return None;
    }

    let mut confidence = 0.0f32;
    let mut level = 3u8;

    if let Some(font_size) = style.font_size_pt {
        if ctx.base_font_size_pt > 0.0 {
            let ratio = font_size / ctx.base_font_size_pt;
            if ratio >= 2.0 {
                confidence += 0.8;
                level = 1;
            } else if ratio >= 1.5 {
                confidence += 0.7;
                level = 2;
            } else if ratio >= 1.2 {
                confidence += 0.5;
                level = 3;
            } else if ratio >= 1.1 {
                confidence += 0.3;
                level = 4;
            }
        }
    }

    if style.is_bold {
        confidence += 0.3;
        if level == 3 {
            level = 2;
        }
    }
    if style.is_centered {
        confidence += 0.2;
    }
    let word_count = ctx.text.split_whitespace().count();
    if ctx.text == ctx.text.to_uppercase() && word_count <= 10 {
        confidence += 0.2;
    }
    if style.margin_top.unwrap_or(0.0) > 20.0 {
        confidence += 0.1;
    }
    if style.margin_bottom.unwrap_or(0.0) > 10.0 {
        confidence += 0.1;
    }

    confidence = confidence.min(1.0);
    if confidence > 0.4 {
        Some(HeaderInfo::from_text(ctx.text, level, confidence, DetectionMethod::Style))
    } else {
        None
    }
}

struct HeaderPattern {
    regex: Regex,
    level: u8,
    base_confidence: f32,
}

static HEADER_PATTERNS: LazyLock<Vec<HeaderPattern>> = LazyLock::new(|| {
    let specs: &[(&str, u8, f32)] = &[
        (r"(?i)^item\s+(\d+[a-z]?)[.\s]+(.+)$", 1, 0.95),
        (r"(?i)^part\s+[ivx]+[.\s]*$", 1, 0.9),
        (r"(?i)^(business|risk factors|properties|legal proceedings)$", 2, 0.85),
        (r"(?i)^(management'?s?\s+discussion|md&a)", 2, 0.85),
        (r"(?i)^(financial\s+statements|consolidated\s+financial\s+statements)$", 2, 0.85),
        (r"^\d+\.\s+[A-Z][A-Za-z\s]+$", 3, 0.7),
        (r"^[A-Z]\.\s+[A-Z][A-Za-z\s]+$", 3, 0.7),
        (r"^\([a-z]\)\s+[A-Z][A-Za-z\s]+$", 4, 0.6),
        (r"^[A-Z][A-Za-z\s]+[A-Za-z]$", 3, 0.5),
        (r"^[A-Z\s]+$", 3, 0.6),
    ];
    specs
        .iter()
        .map(|(pattern, level, confidence)| HeaderPattern {
            regex: Regex::new(pattern).unwrap(),
            level: *level,
            base_confidence: *confidence,
        })
        .collect()
});

fn detect_pattern_based(ctx: &ElementContext) -> Option<HeaderInfo> {
    let text = ctx.text.trim();
    if is_skippable(text) {
        return None;
    }
    if text.matches('.').count() > 2 {
        return None;
    }

    for pattern in HEADER_PATTERNS.iter() {
        if pattern.regex.is_match(text) {
            let mut confidence = pattern.base_confidence;
            if ctx.is_alone_in_parent {
                confidence += 0.1;
            }
            if ctx.next_sibling_text_len.unwrap_or(0) > 100 {
                confidence += 0.1;
            }
            confidence = confidence.min(1.0);
            return Some(HeaderInfo::from_text(text, pattern.level, confidence, DetectionMethod::Pattern));
        }
    }
    None
}

fn detect_structural(ctx: &ElementContext) -> Option<HeaderInfo> {
    let text = ctx.text.trim();
    if is_skippable(text) {
        return None;
    }

    if let Some(level) = heading_tag_level(ctx.tag) {
        return Some(HeaderInfo::from_text(text, level, 1.0, DetectionMethod::Structural));
    }

    let mut confidence = 0.0f32;
    let level = 3u8;

    if matches!(ctx.tag, "strong" | "b") {
        confidence += 0.3;
    }
    if ctx.is_alone_in_parent {
        confidence += 0.3;
    }
    if let Some(len) = ctx.next_sibling_text_len {
        if len > 0 {
            confidence += 0.2;
        }
    }
    let words = text.split_whitespace().count();
    if (1..=10).contains(&words) {
        confidence += 0.1;
    }

    confidence = confidence.min(1.0);
    if confidence > 0.5 {
        Some(HeaderInfo::from_text(text, level, confidence, DetectionMethod::Structural))
    } else {
        None
    }
}

fn heading_tag_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn looks_like_header(text: &str) -> bool {
    if text.split_whitespace().count() > 15 {
        return false;
    }
    let trimmed = text.trim_end();
    if trimmed.ends_with(['.', '!', '?', ';']) {
        return false;
    }
    let is_upper = text == text.to_uppercase() && text.chars().any(|c| c.is_alphabetic());
    let is_title = text
        .split_whitespace()
        .all(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(true));
    if is_upper || is_title {
        return true;
    }
    text.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

fn detect_contextual(ctx: &ElementContext) -> Option<HeaderInfo> {
    let text = ctx.text.trim();
    if is_skippable(text) {
        return None;
    }

    let mut confidence = 0.0f32;
    let mut level = 3u8;

    if looks_like_header(text) {
        confidence += 0.4;
    }

    if let Some(prev) = ctx.prev_sibling_text {
        if looks_like_header(prev) {
            confidence += 0.3;
            level = if text.len() > prev.len() { 2 } else { 3 };
        }
    }

    if let Some(next_len) = ctx.next_sibling_text_len {
        if next_len > text.len() * 3 {
            confidence += 0.3;
        }
    }

    if !ctx.has_current_section && ctx.depth < 5 {
        confidence += 0.2;
    }

    confidence = confidence.min(1.0);
    if confidence > 0.5 {
        Some(HeaderInfo::from_text(text, level, confidence, DetectionMethod::Contextual))
    } else {
        None
    }
}

/// Combines the four detectors with weighted voting.
pub struct HeaderDetectionStrategy {
    pub threshold: f32,
}

impl HeaderDetectionStrategy {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn detect(&self, ctx: &ElementContext) -> Option<HeaderInfo> {
        if ctx.text.trim().is_empty() {
            return None;
        }

        let results: Vec<HeaderInfo> = [
            detect_style_based(ctx),
            detect_pattern_based(ctx),
            detect_structural(ctx),
            detect_contextual(ctx),
        ]
        .into_iter()
        .flatten()
        .collect();

        if results.is_empty() {
            return None;
        }
        if results.len() == 1 {
            return if results[0].confidence >= self.threshold {
                Some(results[0].clone())
            } else {
                None
            };
        }

        Some(combine(results, ctx.text))
    }
}

fn detector_weight(method: DetectionMethod) -> f32 {
    match method {
        DetectionMethod::Style => 0.3,
        DetectionMethod::Pattern => 0.4,
        DetectionMethod::Structural => 0.2,
        DetectionMethod::Contextual => 0.1,
        _ => 0.1,
    }
}

fn combine(results: Vec<HeaderInfo>, text: &str) -> HeaderInfo {
    let mut total_confidence = 0.0f32;
    let mut total_weight = 0.0f32;
    let mut level_votes: std::collections::HashMap<u8, f32> = std::collections::HashMap::new();
    let mut is_item = false;
    let mut item_number = None;

    for result in &results {
        let weight = detector_weight(result.detection_method);
        total_confidence += result.confidence * weight;
        total_weight += weight;
        *level_votes.entry(result.level).or_insert(0.0) += result.confidence * weight;
        if result.is_item {
            is_item = true;
            item_number = item_number.or_else(|| result.item_number.clone());
        }
    }

    let final_confidence = if total_weight > 0.0 {
        total_confidence / total_weight
    } else {
        0.0
    };
    let final_level = level_votes
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(level, _)| level)
        .unwrap_or(3);

    HeaderInfo {
        level: final_level,
        confidence: final_confidence,
        text: text.to_string(),
        detection_method: DetectionMethod::Combined,
        is_item,
        item_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(tag: &'a str, text: &'a str) -> ElementContext<'a> {
        ElementContext {
            tag,
            text,
            style: None,
            base_font_size_pt: 12.0,
            is_alone_in_parent: false,
            next_sibling_text_len: None,
            prev_sibling_text: None,
            depth: 0,
            has_current_section: false,
        }
    }

    #[test]
    fn h1_tag_is_always_a_level_1_header() {
        let strategy = HeaderDetectionStrategy::new(0.6);
        let info = strategy.detect(&ctx("h1", "Overview")).unwrap();
        assert_eq!(info.level, 1);
        assert_eq!(info.confidence, 1.0);
    }

    #[test]
    fn item_pattern_is_detected_with_high_confidence() {
        let strategy = HeaderDetectionStrategy::new(0.6);
        let info = strategy.detect(&ctx("p", "Item 2.02. Results of Operations")).unwrap();
        assert!(info.is_item);
        assert_eq!(info.item_number.as_deref(), Some("2"));
    }

    #[test]
    fn plain_prose_is_not_a_header() {
        let strategy = HeaderDetectionStrategy::new(0.6);
        let text = "The company reported strong quarterly results across all regions, driven by continued demand.";
        assert!(strategy.detect(&ctx("p", text)).is_none());
    }
}
