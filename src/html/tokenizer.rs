//! A lenient, purpose-built HTML tokenizer.
//!
//! This does not attempt HTML5 conformance (explicitly a non-goal) — it is
//! tuned to the markup SEC filings actually contain: well-formed-ish tag
//! soup with inline-XBRL namespace tags (`ix:nonfraction`, `ix:hidden`, …),
//! occasional unclosed `p`/`li`/`tr`/`td`, comments, and raw-text elements
//! (`script`/`style`/`textarea`). Following the lineage's own preference for
//! a hand-written scanner over pulling in a full browser-grade parser for a
//! narrower job, this tokenizer is a single forward pass over the input
//! string with no backtracking.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text(String),
    Comment(String),
    Doctype,
}

/// Elements whose content is raw text: no child tags are recognized until
/// the matching end tag.
fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style" | "textarea")
}

pub struct Tokenizer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    /// Advance `pos` by `n` bytes, assuming `n` lands on a char boundary
    /// (true for all call sites: ASCII delimiters or pre-measured spans).
    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Tokenize the whole input eagerly. Filings are small enough in
    /// practice (even the 60 MB ones) that materializing the token vector
    /// once is simpler and fast enough; `StreamingTreeBuilder` gets its
    /// memory win from discarding *tree* state early, not from avoiding
    /// this vector.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while !self.at_end() {
            if self.starts_with("<!--") {
                tokens.push(self.read_comment());
            } else if self.starts_with("<!") {
                self.skip_doctype();
                tokens.push(Token::Doctype);
            } else if self.peek() == Some(b'<') && self.next_is_tag_start() {
                if let Some(tok) = self.read_tag() {
                    let is_raw = matches!(&tok, Token::StartTag{ name, self_closing, .. } if !self_closing && is_raw_text_element(name));
                    tokens.push(tok);
                    if is_raw {
                        if let Token::StartTag { name, .. } = tokens.last().unwrap().clone() {
                            let (text_tok, closed) = self.read_raw_text_until_close(&name);
                            tokens.push(text_tok);
                            if closed {
                                tokens.push(Token::EndTag { name });
                            }
                        }
                    }
                }
            } else {
                tokens.push(self.read_text());
            }
        }
        tokens
    }

    /// Heuristic: `<` followed by `/`, an ASCII letter, or `!` starts a
    /// tag/end-tag/doctype; anything else (a bare `<` in prose, common in
    /// older filings) is treated as text.
    fn next_is_tag_start(&self) -> bool {
        match self.bytes.get(self.pos + 1) {
            Some(b'/') => true,
            Some(c) => c.is_ascii_alphabetic(),
            None => false,
        }
    }

    fn read_comment(&mut self) -> Token {
        self.advance(4); // "<!--"
        let start = self.pos;
        let end = self.input[self.pos..].find("-->").map(|i| self.pos + i).unwrap_or(self.bytes.len());
        let content = self.input[start..end].to_string();
        self.pos = (end + 3).min(self.bytes.len());
        Token::Comment(content)
    }

    fn skip_doctype(&mut self) {
        if let Some(i) = self.input[self.pos..].find('>') {
            self.pos += i + 1;
        } else {
            self.pos = self.bytes.len();
        }
    }

    fn read_text(&mut self) -> Token {
        let start = self.pos;
        while !self.at_end() {
            if self.peek() == Some(b'<') && (self.next_is_tag_start() || self.starts_with("<!")) {
                break;
            }
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        Token::Text(decode_entities(raw))
    }

    /// Read raw text up to (not including) the matching close tag. Returns
    /// the `Text` token plus whether a close tag was actually found and
    /// consumed. An unterminated `<script>`/`<style>` running to EOF has no
    /// close to consume, and the caller must not synthesize an `EndTag` for
    /// one that was never in the source.
    fn read_raw_text_until_close(&mut self, tag_name: &str) -> (Token, bool) {
        let close = format!("</{}", tag_name);
        let start = self.pos;
        let lower_input_from_here = self.input[self.pos..].to_ascii_lowercase();
        let found = lower_input_from_here.find(&close.to_ascii_lowercase());
        let end = found.map(|i| self.pos + i).unwrap_or(self.bytes.len());
        let content = self.input[start..end].to_string();
        self.pos = end;
        let mut closed = false;
        // consume the end tag itself so the main loop doesn't re-read it as text
        if found.is_some() && !self.at_end() {
            if let Some(tag_end) = self.input[self.pos..].find('>') {
                self.pos += tag_end + 1;
                closed = true;
            }
        }
        (Token::Text(content), closed)
    }

    fn read_tag(&mut self) -> Option<Token> {
        self.advance(1); // '<'
        if self.peek() == Some(b'/') {
            self.advance(1);
            let name_start = self.pos;
            while !self.at_end() && is_name_byte(self.bytes[self.pos]) {
                self.pos += 1;
            }
            let name = self.input[name_start..self.pos].to_ascii_lowercase();
            // skip to '>'
            while !self.at_end() && self.peek() != Some(b'>') {
                self.pos += 1;
            }
            if !self.at_end() {
                self.advance(1);
            }
            if name.is_empty() {
                return None;
            }
            return Some(Token::EndTag { name });
        }

        let name_start = self.pos;
        while !self.at_end() && is_name_byte(self.bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos == name_start {
            // Not actually a tag (stray '<'); treat the '<' as literal text.
            self.pos = name_start - 1 + 1;
            return Some(Token::Text("<".to_string()));
        }
        let name = self.input[name_start..self.pos].to_ascii_lowercase();

        let mut attrs = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            if self.at_end() {
                break;
            }
            match self.peek() {
                Some(b'>') => {
                    self.advance(1);
                    break;
                }
                Some(b'/') => {
                    self_closing = true;
                    self.advance(1);
                    if self.peek() == Some(b'>') {
                        self.advance(1);
                    }
                    break;
                }
                _ => {
                    if let Some(attr) = self.read_attr() {
                        attrs.push(attr);
                    } else {
                        break;
                    }
                }
            }
        }

        Some(Token::StartTag {
            name,
            attrs,
            self_closing,
        })
    }

    fn read_attr(&mut self) -> Option<(String, String)> {
        let name_start = self.pos;
        while !self.at_end() && is_attr_name_byte(self.bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos == name_start {
            // Unrecognized byte inside a tag (stray punctuation); skip it so
            // we don't spin forever on malformed attribute soup.
            self.pos += 1;
            return Some((String::new(), String::new()));
        }
        let name = self.input[name_start..self.pos].to_ascii_lowercase();
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Some((name, String::new()));
        }
        self.advance(1);
        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ b'"') | Some(q @ b'\'') => {
                self.advance(1);
                let start = self.pos;
                while !self.at_end() && self.peek() != Some(q) {
                    self.pos += 1;
                }
                let value = self.input[start..self.pos].to_string();
                if !self.at_end() {
                    self.advance(1);
                }
                value
            }
            _ => {
                let start = self.pos;
                while !self.at_end() && !self.peek().unwrap().is_ascii_whitespace() && self.peek() != Some(b'>') {
                    self.pos += 1;
                }
                self.input[start..self.pos].to_string()
            }
        };
        Some((name, decode_entities(&value)))
    }

    fn skip_whitespace(&mut self) {
        while !self.at_end() && self.peek().unwrap().is_ascii_whitespace() {
            self.pos += 1;
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b':' || b == b'-' || b == b'_'
}

fn is_attr_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b':' || b == b'-' || b == b'_' || b == b'.'
}

/// Decode the small set of entities that actually show up in EDGAR filings.
/// Not a full HTML entity table — numeric character references and the five
/// XML predefined entities, which covers the overwhelming majority of real
/// filing content.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'&' {
            if let Some(semi) = input[i..].find(';') {
                let entity = &input[i + 1..i + semi];
                if let Some(decoded) = decode_one_entity(entity) {
                    out.push(decoded);
                    i += semi + 1;
                    continue;
                }
            }
        }
        let ch = input[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    let _ = &mut chars; // keep peekable typed without unused warning pre-1.0 polish
    out
}

fn decode_one_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => return Some('&'),
        "lt" => return Some('<'),
        "gt" => return Some('>'),
        "quot" => return Some('"'),
        "apos" => return Some('\''),
        "nbsp" => return Some('\u{00a0}'),
        _ => {}
    }
    if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_paragraph() {
        let tokens = Tokenizer::new("<p>Hello <b>world</b></p>").tokenize();
        assert_eq!(
            tokens,
            vec![
                Token::StartTag { name: "p".into(), attrs: vec![], self_closing: false },
                Token::Text("Hello ".into()),
                Token::StartTag { name: "b".into(), attrs: vec![], self_closing: false },
                Token::Text("world".into()),
                Token::EndTag { name: "b".into() },
                Token::EndTag { name: "p".into() },
            ]
        );
    }

    #[test]
    fn tokenizes_ix_nonfraction_attrs() {
        let tokens = Tokenizer::new(
            r#"<ix:nonfraction name="us-gaap:Revenue" contextRef="c1" unitRef="usd" decimals="-3">1234567000</ix:nonfraction>"#,
        )
        .tokenize();
        match &tokens[0] {
            Token::StartTag { name, attrs, .. } => {
                assert_eq!(name, "ix:nonfraction");
                assert!(attrs.contains(&("name".to_string(), "us-gaap:Revenue".to_string())));
                assert!(attrs.contains(&("contextref".to_string(), "c1".to_string())));
            }
            other => panic!("expected StartTag, got {other:?}"),
        }
    }

    #[test]
    fn script_content_is_raw_text() {
        let tokens = Tokenizer::new("<script>if (a < b) { x(); }</script><p>ok</p>").tokenize();
        assert_eq!(
            tokens,
            vec![
                Token::StartTag { name: "script".into(), attrs: vec![], self_closing: false },
                Token::Text("if (a < b) { x(); }".into()),
                Token::EndTag { name: "script".into() },
                Token::StartTag { name: "p".into(), attrs: vec![], self_closing: false },
                Token::Text("ok".into()),
                Token::EndTag { name: "p".into() },
            ]
        );
    }

    #[test]
    fn decodes_numeric_and_named_entities() {
        assert_eq!(decode_entities("Item 2.02 &amp; more"), "Item 2.02 & more");
        assert_eq!(decode_entities("caf&#233;"), "caf\u{e9}");
        assert_eq!(decode_entities("caf&#xe9;"), "caf\u{e9}");
    }

    #[test]
    fn comment_is_skipped_as_its_own_token() {
        let tokens = Tokenizer::new("<!-- a comment --><p>x</p>").tokenize();
        assert!(matches!(tokens[0], Token::Comment(_)));
    }
}
