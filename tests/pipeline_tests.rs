//! End-to-end scenarios exercised through the public API only — no
//! fixture files, since a filing's interesting shapes (an item-number
//! decimal, a hidden iXBRL fact, a cross-reference index table) are
//! compact enough to write inline and keep the intent next to the
//! assertion.

use edgar_filing_parser::standardization::concept_mapper::MapperContext;
use edgar_filing_parser::{parse_html, standardize_statement, ConceptMapper, DetectionMethod, Document, ParserConfig, StatementRow};

fn doc(html: &str) -> Document {
    parse_html(html, &ParserConfig::default()).expect("well-formed test fixture should parse")
}

#[test]
fn item_numbers_with_decimals_are_not_split_by_sentence_spacing() {
    let d = doc("<p>See Item 2.02 Results of Operations and Item 9.01 Financial Statements.</p>");
    assert!(d.text.contains("Item 2.02 Results"));
    assert!(!d.text.contains("Item 2. 02"));
}

#[test]
fn hidden_xbrl_facts_survive_preprocessing_while_staying_out_of_visible_text() {
    let html = r#"
        <html><body>
        <ix:header>
            <ix:hidden>
                <ix:nonnumeric name="dei:EntityRegistrantName" contextref="c1">Widget Industries</ix:nonnumeric>
                <ix:nonfraction name="us-gaap:Assets" contextref="c1" unitref="usd" decimals="-3">1234000</ix:nonfraction>
            </ix:hidden>
        </ix:header>
        <p>The company reported results today.</p>
        </body></html>
    "#;
    let d = doc(html);
    assert_eq!(d.hidden_facts().count(), 2);
    assert_eq!(d.visible_facts().count(), 0);
    assert!(!d.text.contains("Widget Industries"));
    assert!(d.text.contains("reported results today"));
}

#[test]
fn a_visible_copy_of_a_hidden_fact_is_not_double_counted() {
    let html = r#"
        <ix:hidden><ix:nonfraction name="us-gaap:Assets" contextref="c1">1000</ix:nonfraction></ix:hidden>
        <p><ix:nonfraction name="us-gaap:Assets" contextref="c1">1000</ix:nonfraction></p>
    "#;
    let d = doc(html);
    assert_eq!(d.xbrl_facts.len(), 1);
    assert!(!d.xbrl_facts[0].hidden);
}

#[test]
fn headings_drive_section_detection_when_present() {
    let html = "\
        <h2>Item 1. Business</h2><p>We make widgets for a living.</p>\
        <h2>Item 1A. Risk Factors</h2><p>Widgets may go out of fashion.</p>";
    let d = doc(html);
    d.section("item_1").expect("item 1 section detected");
    let risk = d.section("item_1a").expect("risk factors section detected");
    let offset = d.text.find("out of fashion").unwrap();
    assert!(risk.start_offset <= offset && offset < risk.end_offset);
}

#[test]
fn item_headers_are_found_in_plain_paragraphs_when_no_real_headings_exist() {
    let html = "<p>Item 5.02. Departure of Directors or Certain Officers</p><p>Jane Doe resigned.</p>";
    let d = doc(html);
    let section = d.section("item_502").expect("plain-text item fallback should still find the section");
    assert_eq!(section.method, DetectionMethod::Pattern);
}

#[test]
fn a_cross_reference_index_table_corroborates_heading_based_sections() {
    let html = "\
        <table><tr><td>Item 1</td><td>3-5</td></tr><tr><td>Item 1A</td><td>6-12</td></tr></table>\
        <h2>Item 1. Business</h2><p>Business description.</p>\
        <h2>Item 1A. Risk Factors</h2><p>Risk description.</p>";
    let d = doc(html);
    let section = d.section("item_1").expect("item 1 detected");
    assert_eq!(section.method, DetectionMethod::Combined);
}

#[test]
fn a_cross_reference_index_with_no_inline_headings_resolves_via_page_breaks() {
    // GE-style front matter: items are named only by page range in the
    // index table, never as an inline heading. The body is split into
    // pages by `<hr class="page-break">` markers; Item 1A's declared range
    // (pages 3-6) starts right after the second marker and runs to the end
    // of the document, where a large risk-factors narrative lives.
    let filler = "Filler page content. ".repeat(20);
    let risk_factors = "Risk factors discussion covers many pages of disclosure. ".repeat(220);
    let html = format!(
        "<table><tr><td>Item 1</td><td>Business</td><td>1-2</td></tr>\
         <tr><td>Item 1A</td><td>Risk Factors</td><td>3-6</td></tr></table>\
         <p>{filler}</p><hr class=\"page-break\">\
         <p>{filler}</p><hr class=\"page-break\">\
         <p>{risk_factors}</p>"
    );
    let d = doc(&html);
    let section = d.section("item_1a").expect("item_1a resolved from its page range, with no inline heading to corroborate");
    assert_eq!(section.method, DetectionMethod::CrossReferenceIndex);
    assert!(
        d.section_text(section).chars().count() > 10_000,
        "expected over 10,000 characters of content, got {}",
        d.section_text(section).chars().count()
    );
}

#[test]
fn rowspan_and_colspan_are_resolved_into_a_dense_grid() {
    let html = "\
        <table>\
            <tr><td rowspan=\"2\">Label</td><td>2023</td><td>2024</td></tr>\
            <tr><td>100</td><td>200</td></tr>\
        </table>";
    let d = doc(html);
    assert_eq!(d.tables.len(), 1);
    let table = &d.tables[0];
    assert_eq!(table.row_count, 2);
    assert_eq!(table.col_count, 3);
    assert_eq!(table.cell_at(0, 0).unwrap().content, "Label");
    assert_eq!(table.cell_at(1, 0).unwrap().content, "Label");
}

#[test]
fn standardization_resolves_the_debt_classification_tag_name_hint() {
    let mapper = ConceptMapper::new();
    let rows = vec![StatementRow::new("us-gaap:LongTermDebtObligations", "Long-Term Debt", 1, "BalanceSheet")];
    let standardized = standardize_statement(rows, &mapper);
    assert_eq!(standardized[0].standard_concept.as_deref(), Some("NoncurrentDebt"));
    // The label must survive standardization untouched.
    assert_eq!(standardized[0].label, "Long-Term Debt");
}

#[test]
fn an_unmapped_tag_is_still_reported_as_unmapped_rather_than_guessed_at() {
    let mapper = ConceptMapper::new();
    let ctx = MapperContext { statement_type: Some("BalanceSheet"), ..Default::default() };
    let result = mapper.map_concept("us-gaap:SomeBespokeTagNobodyUses", &ctx);
    assert!(result.is_none());
}
