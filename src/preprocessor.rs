//! Two preprocessing passes that run on the token stream before tree
//! construction: XBRL fact pre-extraction, then hidden-region stripping.
//!
//! Order matters. Extraction must see `ix:header`/`ix:hidden` subtrees
//! before they're stripped, or hidden facts are lost — this is a documented
//! regression in the lineage this parser is built for, so the two passes
//! are combined into a single forward scan that extracts and decides what
//! to keep in the same step, rather than two independent passes that could
//! drift out of order under future edits.

use crate::html::tokenizer::Token;
use crate::types::{FactKind, XBRLFact};

fn is_hidden_region_tag(name: &str) -> bool {
    name == "ix:header" || name == "ix:hidden"
}

fn is_fact_tag(name: &str) -> Option<FactKind> {
    match name {
        "ix:nonfraction" => Some(FactKind::NonFraction),
        "ix:nonnumeric" => Some(FactKind::NonNumeric),
        _ => None,
    }
}

fn is_raw_stripped_tag(name: &str) -> bool {
    matches!(name, "script" | "style")
}

#[derive(Debug)]
enum OpenFrame {
    /// An `ix:header`/`ix:hidden` ancestor; everything nested under it is
    /// dropped from the output token stream.
    Hidden,
    /// An in-progress `ix:nonfraction`/`ix:nonnumeric` capture.
    Fact {
        kind: FactKind,
        attrs: Vec<(String, String)>,
        text: String,
    },
    /// Any other open element, tracked only so end tags pop the right kind
    /// of frame.
    Plain,
}

fn attr(attrs: &[(String, String)], key: &str) -> Option<String> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

fn finalize_fact(kind: FactKind, attrs: Vec<(String, String)>, text: String, hidden: bool) -> XBRLFact {
    XBRLFact {
        concept: attr(&attrs, "name").unwrap_or_default(),
        value: text.trim().to_string(),
        context_ref: attr(&attrs, "contextref").unwrap_or_default(),
        unit_ref: attr(&attrs, "unitref"),
        decimals: attr(&attrs, "decimals").and_then(|v| v.parse().ok()),
        scale: attr(&attrs, "scale").and_then(|v| v.parse().ok()),
        period: attr(&attrs, "period"),
        hidden,
        kind,
        source_offset: None,
    }
}

/// Run both preprocessing passes over a token stream, returning the cleaned
/// token stream (safe to hand to a tree builder) and every extracted XBRL
/// fact, visible and hidden alike.
pub fn extract_and_strip(tokens: Vec<Token>) -> (Vec<Token>, Vec<XBRLFact>) {
    let mut out = Vec::with_capacity(tokens.len());
    let mut facts = Vec::new();
    let mut stack: Vec<OpenFrame> = Vec::new();

    let hidden_depth = |stack: &[OpenFrame]| stack.iter().any(|f| matches!(f, OpenFrame::Hidden));

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::StartTag { name, attrs, self_closing } => {
                let currently_hidden = hidden_depth(&stack);

                if is_raw_stripped_tag(name) && !self_closing {
                    // Raw-text elements (`script`/`style`) are always
                    // emitted by the tokenizer as StartTag, Text, EndTag.
                    // Skip all three; their text must never reach output.
                    i += 1;
                    if i < tokens.len() && matches!(tokens[i], Token::Text(_)) {
                        i += 1;
                    }
                    if i < tokens.len() && matches!(&tokens[i], Token::EndTag { name: n } if n == name) {
                        i += 1;
                    }
                    continue;
                }

                if let Some(kind) = is_fact_tag(name) {
                    if *self_closing {
                        facts.push(finalize_fact(kind, attrs.clone(), String::new(), currently_hidden));
                    } else {
                        stack.push(OpenFrame::Fact {
                            kind,
                            attrs: attrs.clone(),
                            text: String::new(),
                        });
                    }
                    if !currently_hidden {
                        out.push(tokens[i].clone());
                    }
                    i += 1;
                    continue;
                }

                if is_hidden_region_tag(name) {
                    if !self_closing {
                        stack.push(OpenFrame::Hidden);
                    }
                    // The hidden-region tag itself never reaches the output.
                    i += 1;
                    continue;
                }

                if !currently_hidden {
                    out.push(tokens[i].clone());
                }
                if !self_closing {
                    stack.push(OpenFrame::Plain);
                }
                i += 1;
            }
            Token::EndTag { name } => {
                let currently_hidden = hidden_depth(&stack);
                match stack.pop() {
                    Some(OpenFrame::Fact { kind, attrs, text }) => {
                        // A fact frame closing: it was hidden iff an
                        // ancestor *above* it was hidden (it can't be
                        // hidden by itself).
                        let was_hidden = hidden_depth(&stack);
                        facts.push(finalize_fact(kind, attrs, text, was_hidden));
                        if !was_hidden {
                            out.push(Token::EndTag { name: name.clone() });
                        }
                    }
                    Some(OpenFrame::Hidden) => {
                        // dropped silently; its own end tag never emitted
                    }
                    Some(OpenFrame::Plain) | None => {
                        if !currently_hidden {
                            out.push(Token::EndTag { name: name.clone() });
                        }
                    }
                }
                i += 1;
            }
            Token::Text(text) => {
                if let Some(OpenFrame::Fact { text: acc, .. }) = stack.last_mut() {
                    acc.push_str(text);
                }
                if !hidden_depth(&stack) {
                    out.push(Token::Text(text.clone()));
                }
                i += 1;
            }
            Token::Comment(_) | Token::Doctype => {
                i += 1;
            }
        }
    }

    (out, dedupe_facts(facts))
}

/// Coalesce duplicate facts (same concept+context+value). When both a
/// visible and hidden copy exist, the visible copy wins — filers routinely
/// tag a number once invisibly for machine consumption and once visibly for
/// the reader, and callers care about the fact existing, not about which
/// copy happened to come first.
fn dedupe_facts(facts: Vec<XBRLFact>) -> Vec<XBRLFact> {
    let mut deduped: Vec<XBRLFact> = Vec::with_capacity(facts.len());
    for fact in facts {
        if let Some(existing) = deduped
            .iter_mut()
            .find(|f: &&mut XBRLFact| f.concept == fact.concept && f.context_ref == fact.context_ref && f.value == fact.value)
        {
            if existing.hidden && !fact.hidden {
                *existing = fact;
            }
        } else {
            deduped.push(fact);
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::tokenizer::Tokenizer;

    fn run(html: &str) -> (Vec<Token>, Vec<XBRLFact>) {
        extract_and_strip(Tokenizer::new(html).tokenize())
    }

    #[test]
    fn hidden_fact_is_extracted_and_stripped() {
        let html = r#"<ix:hidden><ix:nonfraction name="us-gaap:Revenue" contextRef="c1" unitRef="usd" decimals="-3">1234567000</ix:nonfraction></ix:hidden><p>Revenue was $1.23B</p>"#;
        let (out, facts) = run(html);

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].concept, "us-gaap:Revenue");
        assert_eq!(facts[0].value, "1234567000");
        assert!(facts[0].hidden);

        let rendered: String = out
            .iter()
            .filter_map(|t| match t {
                Token::Text(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert!(!rendered.contains("1234567000"));
        assert!(rendered.contains("Revenue was $1.23B"));
    }

    #[test]
    fn script_and_style_content_is_stripped() {
        let html = "<style>.x{color:red}</style><script>alert(1)</script><p>hi</p>";
        let (out, _) = run(html);
        let rendered: String = out
            .iter()
            .filter_map(|t| match t {
                Token::Text(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(rendered, "hi");
    }

    #[test]
    fn visible_fact_is_extracted_but_not_stripped() {
        let html = r#"<p>Revenue: <ix:nonfraction name="us-gaap:Revenue" contextRef="c1">1,230</ix:nonfraction></p>"#;
        let (out, facts) = run(html);
        assert_eq!(facts.len(), 1);
        assert!(!facts[0].hidden);
        let rendered: String = out
            .iter()
            .filter_map(|t| match t {
                Token::Text(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert!(rendered.contains("1,230"));
    }

    #[test]
    fn visible_copy_wins_over_duplicate_hidden_fact() {
        let html = r#"<ix:hidden><ix:nonfraction name="us-gaap:Revenue" contextRef="c1">500</ix:nonfraction></ix:hidden><p><ix:nonfraction name="us-gaap:Revenue" contextRef="c1">500</ix:nonfraction></p>"#;
        let (_, facts) = run(html);
        assert_eq!(facts.len(), 1);
        assert!(!facts[0].hidden);
    }
}
