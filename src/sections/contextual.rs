//! Contextual cross-validation: adjusts a candidate's confidence by whether
//! it's followed by substantive content before the next boundary. A
//! "section" that opens and closes within a couple of words (a stray
//! pattern match inside a sentence, a cross-reference fragment) is
//! downweighted; one followed by real prose is boosted. Gated behind
//! `ParserConfig::detection_thresholds.enable_cross_validation` since it's
//! the priciest of the five strategies (it has to look at every other
//! candidate's span content).

use crate::config::DetectionThresholds;

use super::SectionCandidate;

/// Minimum number of characters of content a section must span to count as
/// "substantive" for cross-validation purposes.
const SUBSTANTIVE_LEN: usize = 200;

pub fn adjust(candidates: Vec<SectionCandidate>, doc_len: usize, thresholds: &DetectionThresholds) -> Vec<SectionCandidate> {
    candidates
        .into_iter()
        .map(|mut c| {
            let end = c.end_offset.min(doc_len);
            let span_len = end.saturating_sub(c.start_offset);
            if span_len >= SUBSTANTIVE_LEN {
                c.confidence = (c.confidence * thresholds.cross_validation_boost).min(1.0);
            } else {
                c.confidence *= thresholds.disagreement_penalty;
            }
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DetectionMethod;

    fn candidate(start: usize, end: usize, confidence: f32) -> SectionCandidate {
        SectionCandidate {
            id: "item_1".to_string(),
            title: "Business".to_string(),
            start_offset: start,
            end_offset: end,
            confidence,
            method: DetectionMethod::Heading,
        }
    }

    #[test]
    fn substantive_sections_are_boosted() {
        let thresholds = DetectionThresholds::default();
        let result = adjust(vec![candidate(0, 5000, 0.6)], 10_000, &thresholds);
        assert!(result[0].confidence > 0.6);
    }

    #[test]
    fn thin_sections_are_penalized() {
        let thresholds = DetectionThresholds::default();
        let result = adjust(vec![candidate(0, 20, 0.6)], 10_000, &thresholds);
        assert!(result[0].confidence < 0.6);
    }
}
