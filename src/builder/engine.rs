//! Shared tree-construction engine used by both `TreeBuilder` and
//! `StreamingTreeBuilder`. A single explicit stack machine walks the token
//! stream once; because the stack lives on the heap (`Vec<Frame>`) rather
//! than the call stack, 100+ levels of nesting never risk a stack overflow.
//!
//! Tag handling is deliberately coarse, matching the tokenizer's own
//! "purpose-built, not HTML5-conformant" stance. Only a handful of tags get
//! special treatment (`h1`-`h6`, `p`, `ul`/`ol`/`li`, `table`, `a`, `br`,
//! head/script/style); everything else — div, span, font, and any unknown
//! tag alike — is a generic container candidate per §4.2 ("unknown tags
//! pass through as generic containers"), applied uniformly rather than
//! hand-listing every phrasing tag HTML defines.

use std::collections::HashMap;

use crate::config::ParserConfig;
use crate::html::tokenizer::Token;
use crate::sections::header_detection::{ElementContext, HeaderDetectionStrategy};
use crate::style::cache::{parse_style_attr, StyleCache};
use crate::table::matrix::{parse_raw_table, TableMatrix};
use crate::types::{DetectionMethod, Node, NodeId, NodeKind, Span, TocLink};

pub struct EngineOutput {
    pub nodes: Vec<Node>,
    pub style_cache: StyleCache,
    pub text: String,
    pub tables: Vec<TableMatrix>,
    pub headings: Vec<NodeId>,
    pub anchor_targets: HashMap<String, usize>,
    pub toc_links: Vec<TocLink>,
    /// Character offsets where a page-break marker (`page-break-before`
    /// style, or a `class` naming one directly) was seen, in document
    /// order. Feeds `cross_reference`'s page-range-to-offset resolution.
    pub page_breaks: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TagClass {
    Heading(u8),
    Paragraph,
    List { ordered: bool },
    ListItem,
    Table,
    StructuralContainer,
    Phrasing,
    Anchor,
    Break,
    Skip,
}

fn classify(tag: &str) -> TagClass {
    match tag {
        "h1" => TagClass::Heading(1),
        "h2" => TagClass::Heading(2),
        "h3" => TagClass::Heading(3),
        "h4" => TagClass::Heading(4),
        "h5" => TagClass::Heading(5),
        "h6" => TagClass::Heading(6),
        "p" => TagClass::Paragraph,
        "ul" => TagClass::List { ordered: false },
        "ol" => TagClass::List { ordered: true },
        "li" => TagClass::ListItem,
        "table" => TagClass::Table,
        "a" => TagClass::Anchor,
        "br" | "hr" => TagClass::Break,
        "head" | "title" | "meta" | "link" | "script" | "style" | "ix:header" | "ix:hidden" => {
            TagClass::Skip
        }
        "b" | "strong" | "i" | "em" | "u" | "span" | "font" | "sup" | "sub" | "small" | "tt"
        | "code" | "abbr" | "cite" | "ix:nonfraction" | "ix:nonnumeric" | "ix:continuation"
        | "ix:exclude" => TagClass::Phrasing,
        _ => TagClass::StructuralContainer,
    }
}

/// True for the handful of tags filings actually leave unclosed: opening a
/// new structural element while one of these is on top of the stack
/// implicitly closes it first, rather than nesting under it.
fn is_auto_closeable(tag: &str) -> bool {
    matches!(tag, "p" | "li")
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

enum Decision {
    /// Kind is fixed at open time (heading level, list, list item).
    Fixed,
    /// Kind decided at close time: Heading (if the detector fires),
    /// Paragraph (tag was literally `p`), or Text/Container otherwise.
    Deferred { is_p: bool },
}

struct Frame {
    node_id: NodeId,
    tag: String,
    decision: Decision,
    text_buf: String,
    start_offset: usize,
    had_block_child: bool,
    is_alone_in_parent: bool,
    prev_sibling_text: Option<String>,
    depth: usize,
}

struct AnchorState {
    href: Option<String>,
    id: Option<String>,
    start_offset: usize,
    text_start_len: usize,
}

pub fn run_engine(tokens: &[Token], cfg: &ParserConfig) -> EngineOutput {
    let mut nodes: Vec<Node> = vec![Node::new(NodeId::ROOT, None, Span::new(0, 0), NodeKind::Document)];
    let mut style_cache = StyleCache::new(cfg.cache_size);
    let mut text = String::new();
    let mut tables: Vec<TableMatrix> = Vec::new();
    let mut headings: Vec<NodeId> = Vec::new();
    let mut anchor_targets: HashMap<String, usize> = HashMap::new();
    let mut toc_links: Vec<TocLink> = Vec::new();
    let mut page_breaks: Vec<usize> = Vec::new();

    let header_strategy = HeaderDetectionStrategy::new(cfg.header_detection_threshold);
    let base_font_size_pt: f32 = 12.0;

    let mut stack: Vec<Frame> = vec![Frame {
        node_id: NodeId::ROOT,
        tag: "#document".to_string(),
        decision: Decision::Fixed,
        text_buf: String::new(),
        start_offset: 0,
        had_block_child: false,
        is_alone_in_parent: false,
        prev_sibling_text: None,
        depth: 0,
    }];
    let mut anchor: Option<AnchorState> = None;

    macro_rules! top {
        () => {
            stack.last_mut().unwrap()
        };
    }

    let mut i = 0usize;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Text(raw) => {
                let chunk = if cfg.preserve_whitespace {
                    raw.clone()
                } else if cfg.normalize_text {
                    crate::normalize::normalize_text(raw)
                } else {
                    raw.clone()
                };
                if !chunk.is_empty() {
                    text.push_str(&chunk);
                    top!().text_buf.push_str(&chunk);
                }
                i += 1;
            }
            Token::Comment(_) | Token::Doctype => {
                i += 1;
            }
            Token::StartTag { name, attrs, self_closing } => {
                let class = classify(name);
                match class {
                    TagClass::Skip => {
                        i = skip_subtree(tokens, i, name, *self_closing);
                        continue;
                    }
                    TagClass::Break => {
                        if name == "hr" {
                            let style_attr = attr(attrs, "style").unwrap_or("");
                            let css_class = attr(attrs, "class").unwrap_or("");
                            let is_page_break = css_class.to_ascii_lowercase().contains("page-break")
                                || parse_style_attr(style_attr).page_break_before;
                            if is_page_break {
                                page_breaks.push(text.chars().count());
                            }
                        }
                        text.push('\n');
                        top!().text_buf.push('\n');
                        i += 1;
                        continue;
                    }
                    TagClass::Anchor => {
                        let href = attr(attrs, "href").map(|s| s.to_string());
                        let id = attr(attrs, "id").or_else(|| attr(attrs, "name")).map(|s| s.to_string());
                        let text_start_len = top!().text_buf.chars().count();
                        anchor = Some(AnchorState {
                            href,
                            id,
                            start_offset: text.chars().count(),
                            text_start_len,
                        });
                        if *self_closing {
                            finalize_anchor(&mut anchor, &top!().text_buf, &mut anchor_targets, &mut toc_links);
                        }
                        i += 1;
                        continue;
                    }
                    TagClass::Phrasing => {
                        i += 1;
                        continue;
                    }
                    TagClass::Table => {
                        while matches!(top!().tag.as_str(), "p" | "li") {
                            close_top(&mut stack, &mut nodes, &style_cache, &header_strategy, base_font_size_pt, &mut headings, &text);
                        }
                        flush_top_text(&mut stack, &mut nodes, &text);
                        let style_ref = if cfg.extract_styles {
                            let style_attr = attr(attrs, "style").unwrap_or("");
                            let css_class = attr(attrs, "class");
                            Some(style_cache.intern(style_attr, css_class))
                        } else {
                            None
                        };
                        let (raw_table, consumed) = parse_raw_table(&tokens[i..]);
                        let matrix = TableMatrix::from_raw(raw_table);
                        let caption = matrix.caption.clone();
                        let classification = matrix.classification;
                        let matrix_ref = tables.len();
                        tables.push(matrix);
                        let start = text.chars().count();
                        let node_id = NodeId(nodes.len() as u32);
                        let mut node = Node::new(
                            node_id,
                            Some(top!().node_id),
                            Span::new(start, start),
                            NodeKind::Table { matrix_ref, caption, classification },
                        );
                        node.style = style_ref;
                        nodes.push(node);
                        register_child(&mut nodes, &stack, node_id);
                        top!().had_block_child = true;
                        i += consumed;
                        continue;
                    }
                    TagClass::Heading(_)
                    | TagClass::Paragraph
                    | TagClass::List { .. }
                    | TagClass::ListItem
                    | TagClass::StructuralContainer => {
                        while matches!(top!().tag.as_str(), "p" | "li") {
                            close_top(&mut stack, &mut nodes, &style_cache, &header_strategy, base_font_size_pt, &mut headings, &text);
                        }
                        flush_top_text(&mut stack, &mut nodes, &text);

                        let style_attr_raw = attr(attrs, "style").unwrap_or("");
                        let css_class_raw = attr(attrs, "class").unwrap_or("");
                        if css_class_raw.to_ascii_lowercase().contains("page-break")
                            || parse_style_attr(style_attr_raw).page_break_before
                        {
                            page_breaks.push(text.chars().count());
                        }
                        let style_ref = if cfg.extract_styles {
                            Some(style_cache.intern(style_attr_raw, attr(attrs, "class")))
                        } else {
                            None
                        };

                        let start_offset = text.chars().count();
                        let is_alone = !top!().had_block_child && top!().text_buf.is_empty();
                        let prev_text = if !top!().text_buf.is_empty() {
                            Some(top!().text_buf.clone())
                        } else {
                            None
                        };
                        let depth = stack.len();

                        let node_id = NodeId(nodes.len() as u32);
                        let placeholder_kind = match class {
                            TagClass::Heading(level) => NodeKind::Heading {
                                level,
                                text: String::new(),
                                confidence: 1.0,
                                detection_method: DetectionMethod::Structural,
                            },
                            TagClass::List { ordered } => NodeKind::List { ordered },
                            TagClass::ListItem => NodeKind::ListItem,
                            _ => NodeKind::Container,
                        };
                        let mut node = Node::new(node_id, Some(top!().node_id), Span::new(start_offset, start_offset), placeholder_kind);
                        node.style = style_ref;
                        nodes.push(node);
                        register_child(&mut nodes, &stack, node_id);
                        top!().had_block_child = true;

                        let decision = match class {
                            TagClass::Paragraph => Decision::Deferred { is_p: true },
                            TagClass::StructuralContainer => Decision::Deferred { is_p: false },
                            _ => Decision::Fixed,
                        };

                        stack.push(Frame {
                            node_id,
                            tag: name.clone(),
                            decision,
                            text_buf: String::new(),
                            start_offset,
                            had_block_child: false,
                            is_alone_in_parent: is_alone,
                            prev_sibling_text: prev_text,
                            depth,
                        });

                        if *self_closing {
                            close_top(&mut stack, &mut nodes, &style_cache, &header_strategy, base_font_size_pt, &mut headings, &text);
                        }
                        i += 1;
                        continue;
                    }
                }
            }
            Token::EndTag { name } => {
                let class = classify(name);
                match class {
                    TagClass::Anchor => {
                        finalize_anchor(&mut anchor, &top!().text_buf, &mut anchor_targets, &mut toc_links);
                        i += 1;
                        continue;
                    }
                    TagClass::Phrasing | TagClass::Break | TagClass::Skip | TagClass::Table => {
                        i += 1;
                        continue;
                    }
                    _ => {}
                }

                // Pop the matching frame, auto-closing any intervening
                // `p`/`li` frames along the way. A stray end tag matching
                // nothing currently open is ignored — malformed markup
                // recovered silently, per the parser's lenient posture.
                loop {
                    if stack.len() <= 1 {
                        break;
                    }
                    if stack.last().unwrap().tag == *name {
                        close_top(&mut stack, &mut nodes, &style_cache, &header_strategy, base_font_size_pt, &mut headings, &text);
                        break;
                    }
                    if is_auto_closeable(&stack.last().unwrap().tag) {
                        close_top(&mut stack, &mut nodes, &style_cache, &header_strategy, base_font_size_pt, &mut headings, &text);
                        continue;
                    }
                    break;
                }
                i += 1;
            }
        }
    }

    // EOF: close every remaining open frame, bottom-up, except the root.
    while stack.len() > 1 {
        close_top(&mut stack, &mut nodes, &style_cache, &header_strategy, base_font_size_pt, &mut headings, &text);
    }
    flush_top_text(&mut stack, &mut nodes, &text);
    let end = text.chars().count();
    nodes[0].span = Span::new(0, end);

    page_breaks.sort_unstable();
    page_breaks.dedup();

    EngineOutput {
        nodes,
        style_cache,
        text,
        tables,
        headings,
        anchor_targets,
        toc_links,
        page_breaks,
    }
}

/// Append `child` to the current top-of-stack frame's node's children list.
fn register_child(nodes: &mut [Node], stack: &[Frame], child: NodeId) {
    let parent_id = stack.last().unwrap().node_id;
    nodes[parent_id.0 as usize].children.push(child);
}

fn flush_top_text(stack: &mut [Frame], nodes: &mut Vec<Node>, text: &str) {
    let top = stack.last_mut().unwrap();
    if top.text_buf.is_empty() {
        return;
    }
    let content = std::mem::take(&mut top.text_buf);
    let end = text.chars().count();
    let start = end - content.chars().count();
    let node_id = NodeId(nodes.len() as u32);
    nodes.push(Node::new(node_id, Some(top.node_id), Span::new(start, end), NodeKind::Text { text: content }));
    let parent_id = top.node_id;
    nodes[parent_id.0 as usize].children.push(node_id);
}

fn finalize_anchor(
    anchor: &mut Option<AnchorState>,
    current_text_buf: &str,
    anchor_targets: &mut HashMap<String, usize>,
    toc_links: &mut Vec<TocLink>,
) {
    let Some(a) = anchor.take() else { return };
    if let Some(id) = a.id {
        anchor_targets.insert(id, a.start_offset);
    }
    if let Some(href) = a.href {
        if let Some(target) = href.strip_prefix('#') {
            let chars: Vec<char> = current_text_buf.chars().collect();
            let link_text: String = if chars.len() >= a.text_start_len {
                chars[a.text_start_len..].iter().collect()
            } else {
                String::new()
            };
            toc_links.push(TocLink {
                target: target.to_string(),
                text: link_text.trim().to_string(),
                source_offset: a.start_offset,
            });
        }
    }
}

/// Pop the top frame, finalize its node kind (running heading detection for
/// deferred leaves), and set its span's end offset.
fn close_top(
    stack: &mut Vec<Frame>,
    nodes: &mut Vec<Node>,
    style_cache: &StyleCache,
    header_strategy: &HeaderDetectionStrategy,
    base_font_size_pt: f32,
    headings: &mut Vec<NodeId>,
    text: &str,
) {
    if stack.len() <= 1 {
        return;
    }
    flush_top_text(stack, nodes, text);
    let frame = stack.pop().unwrap();
    let end_offset = text.chars().count();
    let node_idx = frame.node_id.0 as usize;
    nodes[node_idx].span = Span::new(frame.start_offset, end_offset);

    match frame.decision {
        Decision::Fixed => {
            if let NodeKind::Heading { .. } = &nodes[node_idx].kind {
                headings.push(frame.node_id);
            }
        }
        Decision::Deferred { is_p } => {
            if frame.had_block_child {
                nodes[node_idx].kind = NodeKind::Container;
                return;
            }
            let merged_text = nodes[node_idx]
                .children
                .iter()
                .filter_map(|id| match &nodes[id.0 as usize].kind {
                    NodeKind::Text { text } => Some(text.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("");
            let trimmed = merged_text.trim();
            if trimmed.is_empty() {
                nodes[node_idx].kind = NodeKind::Container;
                return;
            }

            let style_info = nodes[node_idx].style.and_then(|r| style_cache.get(r)).cloned();
            let ctx = ElementContext {
                tag: &frame.tag,
                text: trimmed,
                style: style_info.as_ref(),
                base_font_size_pt,
                is_alone_in_parent: frame.is_alone_in_parent,
                next_sibling_text_len: None,
                prev_sibling_text: frame.prev_sibling_text.as_deref(),
                depth: frame.depth,
                has_current_section: !headings.is_empty(),
            };

            if let Some(info) = header_strategy.detect(&ctx) {
                nodes[node_idx].kind = NodeKind::Heading {
                    level: info.level,
                    text: trimmed.to_string(),
                    confidence: info.confidence,
                    detection_method: info.detection_method,
                };
                nodes[node_idx].children.clear();
                headings.push(frame.node_id);
            } else if is_p {
                nodes[node_idx].kind = NodeKind::Paragraph { text: trimmed.to_string() };
                nodes[node_idx].children.clear();
            } else {
                nodes[node_idx].kind = NodeKind::Text { text: trimmed.to_string() };
                nodes[node_idx].children.clear();
            }
        }
    }
}

/// `meta`/`link` are void in real markup — a closing tag never appears, so
/// there is nothing to depth-scan for.
fn is_void_skip_tag(tag: &str) -> bool {
    matches!(tag, "meta" | "link")
}

/// `script`/`style` are tokenized as `StartTag, Text[, EndTag]` — the
/// `EndTag` only appears when the source actually closed the tag — never as
/// a nested, depth-countable subtree, so they're consumed directly rather
/// than depth-scanned.
fn is_raw_text_skip_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// Skip a `TagClass::Skip` subtree (`head`/`title`/`meta`/`link`/`script`/
/// `style`/`ix:header`/`ix:hidden`) without touching the text buffer or node
/// stack. `ix:header`/`ix:hidden` are already stripped by the preprocessor,
/// so in practice the depth-scan fallback below only fires for head/title.
fn skip_subtree(tokens: &[Token], start: usize, tag: &str, self_closing: bool) -> usize {
    if self_closing || is_void_skip_tag(tag) {
        return start + 1;
    }
    if is_raw_text_skip_tag(tag) {
        let mut i = start + 1;
        if matches!(tokens.get(i), Some(Token::Text(_))) {
            i += 1;
        }
        if matches!(tokens.get(i), Some(Token::EndTag { name }) if name == tag) {
            i += 1;
        }
        return i;
    }
    let mut depth = 1i32;
    let mut i = start + 1;
    while i < tokens.len() && depth > 0 {
        match &tokens[i] {
            Token::StartTag { name, self_closing, .. } if name == tag && !self_closing => depth += 1,
            Token::EndTag { name } if name == tag => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::tokenizer::Tokenizer;

    #[test]
    fn page_break_markers_are_collected_in_document_order() {
        let cfg = ParserConfig::default();
        let html = "<p>Page one.</p><hr class=\"page-break\"><p>Page two.</p>\
                     <div style=\"page-break-before: always;\">Page three.</div>";
        let tokens = Tokenizer::new(html).tokenize();
        let output = run_engine(&tokens, &cfg);
        assert_eq!(output.page_breaks.len(), 2);
        assert!(output.page_breaks[0] < output.page_breaks[1]);
    }

    #[test]
    fn content_after_a_closed_script_tag_survives() {
        let cfg = ParserConfig::default();
        let tokens = Tokenizer::new("<script>var x = 1 < 2;</script><p>real content</p>").tokenize();
        let output = run_engine(&tokens, &cfg);
        assert!(output.text.contains("real content"));
    }

    #[test]
    fn content_after_a_closed_style_tag_survives() {
        let cfg = ParserConfig::default();
        let tokens = Tokenizer::new("<style>p { color: red; }</style><p>real content</p>").tokenize();
        let output = run_engine(&tokens, &cfg);
        assert!(output.text.contains("real content"));
    }

    #[test]
    fn content_after_a_void_meta_tag_survives() {
        let cfg = ParserConfig::default();
        // A body-level `<meta>` with no closing tag — common in lenient
        // real-world markup where `<head>` was never explicitly closed.
        let tokens = Tokenizer::new("<meta charset=\"utf-8\"><p>after meta</p>").tokenize();
        let output = run_engine(&tokens, &cfg);
        assert!(output.text.contains("after meta"));
    }

    #[test]
    fn content_after_a_void_link_tag_survives() {
        let cfg = ParserConfig::default();
        let tokens = Tokenizer::new("<link rel=\"stylesheet\" href=\"a.css\"><p>after link</p>").tokenize();
        let output = run_engine(&tokens, &cfg);
        assert!(output.text.contains("after link"));
    }

    #[test]
    fn a_leading_br_does_not_underflow_the_flushed_span() {
        let cfg = ParserConfig::default();
        let tokens = Tokenizer::new("<div><br>text</div>").tokenize();
        let output = run_engine(&tokens, &cfg);
        assert!(output.text.contains("text"));
    }

    #[test]
    fn an_hr_between_paragraphs_keeps_text_and_text_buf_in_sync() {
        let cfg = ParserConfig::default();
        let tokens = Tokenizer::new("<p>before</p><hr><p>after</p>").tokenize();
        let output = run_engine(&tokens, &cfg);
        assert!(output.text.contains("before"));
        assert!(output.text.contains("after"));
    }
}
