//! Text normalization applied to each raw text chunk as the tree builder
//! assembles node content, when `ParserConfig::normalize_text` is set and
//! `preserve_whitespace` is not.
//!
//! Two rules, in order:
//! 1. Collapse any run of whitespace (including embedded newlines from
//!    pretty-printed markup) to a single space.
//! 2. Insert a space after sentence-ending punctuation (`.`, `!`, `?`, `;`,
//!    `:`) immediately followed by a letter — filings routinely concatenate
//!    adjacent `<span>`s with no whitespace between sentences. This must
//!    never fire between a digit and a following digit or letter-after-digit
//!    run like `2.02`, since SEC 8-K item numbers depend on that sequence
//!    surviving intact; checking that the following character is alphabetic
//!    (not numeric) is what keeps it out of that case.

pub fn normalize_text(input: &str) -> String {
    let mut collapsed = String::with_capacity(input.len());
    let mut last_was_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
                last_was_space = true;
            }
        } else {
            collapsed.push(ch);
            last_was_space = false;
        }
    }
    let trimmed = collapsed.trim();

    let chars: Vec<char> = trimmed.chars().collect();
    let mut out = String::with_capacity(trimmed.len() + 8);
    for (idx, &ch) in chars.iter().enumerate() {
        out.push(ch);
        if matches!(ch, '.' | '!' | '?' | ';' | ':') {
            if let Some(&next) = chars.get(idx + 1) {
                if next.is_alphabetic() {
                    out.push(' ');
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize_text("a   b\n\tc"), "a b c");
    }

    #[test]
    fn inserts_space_between_run_together_sentences() {
        assert_eq!(normalize_text("First sentence.Second sentence."), "First sentence. Second sentence.");
    }

    #[test]
    fn does_not_break_item_number_decimals() {
        assert_eq!(normalize_text("Item 2.02 Results of Operations"), "Item 2.02 Results of Operations");
    }
}
