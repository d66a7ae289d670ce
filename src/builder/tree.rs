//! Non-streaming tree builder: materializes the whole token vector and
//! walks it once. The default path — used for any document under
//! `ParserConfig::streaming_threshold` — since a single pass over an
//! already-in-memory `Vec<Token>` is simpler and just as fast for the
//! common case.

use crate::config::ParserConfig;
use crate::html::tokenizer::Token;

use super::engine::{run_engine, EngineOutput};

pub struct TreeBuilder;

impl TreeBuilder {
    pub fn build(tokens: &[Token], cfg: &ParserConfig) -> EngineOutput {
        run_engine(tokens, cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::tokenizer::Tokenizer;
    use crate::types::NodeKind;

    fn tokens_for(html: &str) -> Vec<Token> {
        Tokenizer::new(html).tokenize()
    }

    #[test]
    fn builds_a_heading_and_paragraph() {
        let cfg = ParserConfig::default();
        let tokens = tokens_for("<h1>Overview</h1><p>Some prose about the business.</p>");
        let output = TreeBuilder::build(&tokens, &cfg);
        assert_eq!(output.headings.len(), 1);
        let heading = &output.nodes[output.headings[0].0 as usize];
        assert!(matches!(&heading.kind, NodeKind::Heading { level: 1, .. }));
    }

    #[test]
    fn unclosed_paragraph_is_auto_closed_at_the_next_block() {
        let cfg = ParserConfig::default();
        let tokens = tokens_for("<p>Unclosed<div>and div</div>");
        let output = TreeBuilder::build(&tokens, &cfg);
        assert!(output.text.contains("Unclosed"));
        assert!(output.text.contains("and div"));
    }

    #[test]
    fn deeply_nested_containers_do_not_overflow_the_stack() {
        let cfg = ParserConfig::default();
        let mut html = String::new();
        for _ in 0..500 {
            html.push_str("<div>");
        }
        html.push_str("deep text");
        for _ in 0..500 {
            html.push_str("</div>");
        }
        let tokens = tokens_for(&html);
        let output = TreeBuilder::build(&tokens, &cfg);
        assert!(output.text.contains("deep text"));
    }

    #[test]
    fn table_inside_the_tree_is_recorded() {
        let cfg = ParserConfig::default();
        let tokens = tokens_for("<p>Before</p><table><tr><td>A</td></tr></table><p>After</p>");
        let output = TreeBuilder::build(&tokens, &cfg);
        assert_eq!(output.tables.len(), 1);
    }
}
