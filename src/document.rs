//! Public entry point: `parse_html`/`parse_html_dyn` wire the byte source,
//! preprocessor, tokenizer, tree builder and section detector into the
//! `Document` facade callers actually hold onto.
//!
//! The pipeline is a straight line with one branch point:
//!
//! ```text
//! ByteSource -> Tokenizer -> extract_and_strip -> TreeBuilder|StreamingTreeBuilder -> HybridSectionDetector
//! ```
//!
//! `ParserConfig::streaming_threshold` picks the branch; both builders run
//! the same `run_engine` core and produce an identical `EngineOutput` shape,
//! so nothing downstream needs to know which one ran.

use std::time::{Duration, Instant};

use crate::builder::{EngineOutput, StreamingTreeBuilder, TreeBuilder};
use crate::byte_source::{byte_source_from_any, ByteSource, ByteSourceInput};
use crate::config::ParserConfig;
use crate::error::ParserResult;
use crate::html::tokenizer::Tokenizer;
use crate::preprocessor::extract_and_strip;
use crate::sections::{HybridSectionDetector, SectionCandidate};
use crate::style::cache::StyleCache;
use crate::table::matrix::TableMatrix;
use crate::types::{DocumentMetadata, Node, NodeId, XBRLFact};

/// The parsed document: a node arena, the XBRL facts recovered from it, the
/// resolved tables, and the sections the hybrid detector settled on.
///
/// Every cross-reference into the tree is a `NodeId` rather than a borrow,
/// so `Document` can be handed across threads or serialized without
/// fighting the borrow checker — the same arena discipline `types::Node`
/// itself uses.
#[derive(Debug)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub style_cache: StyleCache,
    pub text: String,
    pub tables: Vec<TableMatrix>,
    pub xbrl_facts: Vec<XBRLFact>,
    pub sections: Vec<SectionCandidate>,
    pub heading_ids: Vec<NodeId>,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.0 as usize]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// All `Heading` nodes in document order, per §6's `document.headings`.
    pub fn headings(&self) -> impl Iterator<Item = &Node> {
        self.heading_ids.iter().filter_map(|id| self.node(*id))
    }

    /// The effective style for `id`, inherited properties resolved up its
    /// ancestor chain. See `StyleCache::resolved_style`.
    pub fn resolved_style(&self, id: NodeId) -> crate::types::StyleInfo {
        self.style_cache.resolved_style(&self.nodes, id)
    }

    /// Visible facts only — the common case for a caller building a
    /// financial statement, where a hidden duplicate of a visible fact
    /// would only double-count it.
    pub fn visible_facts(&self) -> impl Iterator<Item = &XBRLFact> {
        self.xbrl_facts.iter().filter(|f| !f.hidden)
    }

    pub fn hidden_facts(&self) -> impl Iterator<Item = &XBRLFact> {
        self.xbrl_facts.iter().filter(|f| f.hidden)
    }

    /// The section whose `[start_offset, end_offset)` span contains
    /// `offset`, if any. Sections are non-overlapping and sorted by
    /// `start_offset`, so the first match is the only match.
    pub fn section_at(&self, offset: usize) -> Option<&SectionCandidate> {
        self.sections.iter().find(|s| s.start_offset <= offset && offset < s.end_offset)
    }

    pub fn section(&self, id: &str) -> Option<&SectionCandidate> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Slice `self.text` by the `[start, end)` *character* offsets every
    /// `Span`/`SectionCandidate` is expressed in — not byte offsets, so a
    /// naive `&self.text[start..end]` would panic or mis-slice on any
    /// multi-byte character earlier in the document.
    pub fn char_slice(&self, start: usize, end: usize) -> &str {
        let byte_start = self.text.char_indices().nth(start).map(|(i, _)| i).unwrap_or(self.text.len());
        let byte_end = self.text.char_indices().nth(end).map(|(i, _)| i).unwrap_or(self.text.len());
        &self.text[byte_start..byte_end]
    }

    /// The text covered by `section`'s `[start_offset, end_offset)` span.
    /// Covers §6's `section.text()` accessor; a free function here rather
    /// than a method on `SectionCandidate` since the section itself only
    /// carries offsets, not a borrow of the document it came from.
    pub fn section_text(&self, section: &SectionCandidate) -> &str {
        self.char_slice(section.start_offset, section.end_offset)
    }
}

/// Timing diagnostics for the parse pipeline. Mirrors the step-by-step
/// summary a caller would want when a filing takes longer than expected to
/// parse — off by default, since most callers never look at it.
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(&'static str, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, timings: Vec::new() }
    }

    fn time_step<F, R>(&mut self, step_name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        self.timings.push((step_name, elapsed));
        println!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());
        result
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }
        println!("\n📊 Parse summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (step, duration) in &self.timings {
            let percentage = if total.as_secs_f64() > 0.0 { (duration.as_secs_f64() / total.as_secs_f64()) * 100.0 } else { 0.0 };
            println!("   {:.<35} {:.0}ms ({:.1}%)", step, duration.as_millis(), percentage);
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Parse `html` (a `String`, `&str`, or `Vec<u8>`) into a `Document`, using
/// `cfg` to bound size, pick the streaming threshold, and tune section
/// detection. This is the crate's one true entry point — everything else in
/// the module tree is a building block this function assembles.
pub fn parse_html(html: impl Into<ByteSourceInput>, cfg: &ParserConfig) -> ParserResult<Document> {
    cfg.validate()?;
    let mut profiler = StepProfiler::new(cfg.enable_profiling);

    let source = profiler.time_step("byte_source", || ByteSource::new(html.into(), cfg.max_document_size))?;
    let byte_size = source.byte_size();
    let should_stream = source.should_stream(cfg.streaming_threshold);

    let tokens = profiler.time_step("tokenize", || Tokenizer::new(source.html()).tokenize());
    let (tokens, xbrl_facts) = profiler.time_step("extract_and_strip", || extract_and_strip(tokens));

    let engine_output: EngineOutput = profiler.time_step("build_tree", || {
        if should_stream {
            StreamingTreeBuilder::build(&tokens, cfg)
        } else {
            TreeBuilder::build(&tokens, cfg)
        }
    });

    // Spans throughout the builder are char offsets (`text.chars().count()`),
    // not byte offsets, so sections/tables can be sliced correctly for any
    // multi-byte text a filing's prose or entities introduce.
    let doc_len = engine_output.text.chars().count();
    let sections = profiler.time_step("detect_sections", || {
        HybridSectionDetector::detect(
            &engine_output.nodes,
            &engine_output.headings,
            &engine_output.tables,
            &engine_output.toc_links,
            &engine_output.anchor_targets,
            &engine_output.page_breaks,
            doc_len,
            cfg,
        )
    });

    profiler.print_summary();

    let metadata = DocumentMetadata {
        form: cfg.form.clone(),
        byte_size,
        extracted_at: None,
        xbrl_fact_count: xbrl_facts.len(),
    };

    Ok(Document {
        nodes: engine_output.nodes,
        style_cache: engine_output.style_cache,
        text: engine_output.text,
        tables: engine_output.tables,
        xbrl_facts,
        sections,
        heading_ids: engine_output.headings,
        metadata,
    })
}

/// Type-erased entry point for callers crossing a dynamic boundary (FFI,
/// scripting hosts) where `parse_html`'s static `impl Into<ByteSourceInput>`
/// can't apply.
pub fn parse_html_dyn(html: &dyn std::any::Any, cfg: &ParserConfig) -> ParserResult<Document> {
    cfg.validate()?;
    let source = byte_source_from_any(html, cfg.max_document_size)?;
    parse_html(source.into_html(), cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    #[test]
    fn parses_a_minimal_filing_into_headings_and_text() {
        let html = "<h1>Item 1. Business</h1><p>We make things.</p>";
        let cfg = ParserConfig::default();
        let doc = parse_html(html, &cfg).unwrap();
        assert!(doc.text.contains("We make things."));
        assert!(doc.nodes.iter().any(|n| matches!(n.kind, NodeKind::Heading { .. })));
    }

    #[test]
    fn headings_accessor_exposes_heading_nodes_in_document_order() {
        let html = "<h1>Item 1. Business</h1><p>Body.</p><h1>Item 1A. Risk Factors</h1>";
        let cfg = ParserConfig::default();
        let doc = parse_html(html, &cfg).unwrap();
        let headings: Vec<&Node> = doc.headings().collect();
        assert_eq!(headings.len(), 2);
        assert!(headings.iter().all(|n| matches!(n.kind, NodeKind::Heading { .. })));
    }

    #[test]
    fn hidden_ix_facts_survive_stripping() {
        let html = r#"<div><ix:header><ix:hidden><ix:nonnumeric name="dei:EntityRegistrantName" contextref="c1">Acme Corp</ix:nonnumeric></ix:hidden></ix:header><p>Body text.</p></div>"#;
        let cfg = ParserConfig::default();
        let doc = parse_html(html, &cfg).unwrap();
        assert_eq!(doc.hidden_facts().count(), 1);
        assert!(doc.hidden_facts().next().unwrap().hidden);
        assert!(!doc.text.contains("Acme Corp"));
    }

    #[test]
    fn oversized_input_is_rejected_before_any_parsing_work() {
        let mut cfg = ParserConfig::default();
        cfg.max_document_size = 10;
        let err = parse_html("a".repeat(11), &cfg).unwrap_err();
        assert!(matches!(err, crate::error::ParserError::DocumentTooLarge { .. }));
    }

    #[test]
    fn streaming_and_non_streaming_paths_agree_on_text() {
        let html = "<h1>Item 1. Business</h1><p>We make things people want.</p>";
        let mut streaming_cfg = ParserConfig::default();
        streaming_cfg.streaming_threshold = 1;
        let streaming_doc = parse_html(html, &streaming_cfg).unwrap();

        let direct_cfg = ParserConfig::default();
        let direct_doc = parse_html(html, &direct_cfg).unwrap();

        assert_eq!(streaming_doc.text, direct_doc.text);
    }

    #[test]
    fn parse_html_dyn_rejects_unsupported_types() {
        let cfg = ParserConfig::default();
        let value: i32 = 5;
        let err = parse_html_dyn(&value, &cfg).unwrap_err();
        assert!(matches!(err, crate::error::ParserError::InvalidInputType { .. }));
    }

    #[test]
    fn section_at_finds_the_containing_section() {
        let html = "<h1>Item 1. Business</h1><p>We make things.</p><h1>Item 1A. Risk Factors</h1><p>Risks abound.</p>";
        let cfg = ParserConfig::default();
        let doc = parse_html(html, &cfg).unwrap();
        let mid = doc.text.find("Risks").unwrap();
        let section = doc.section_at(mid).expect("offset inside a detected section");
        assert_eq!(section.id, "item_1a");
    }
}
