//! Resolves a raw `<table>` subtree into a dense `TableMatrix`: rowspan and
//! colspan collapsed into a rectangular grid, columns classified, a header
//! band detected, and renderers for downstream consumers.

use crate::html::tokenizer::Token;
use crate::types::{Alignment, Cell, TableClassification};

/// A raw, not-yet-resolved table row: each cell as parsed straight off the
/// token stream, before rowspan/colspan resolution.
#[derive(Debug, Clone)]
pub(crate) struct RawCell {
    content: String,
    row_span: u32,
    col_span: u32,
    is_header: bool,
    alignment: Alignment,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RawTable {
    pub(crate) caption: Option<String>,
    rows: Vec<Vec<RawCell>>,
}

/// Parse the token slice for one `<table>...</table>` subtree (the opening
/// `table` StartTag must be `tokens[0]`) into a `RawTable`, and return how
/// many tokens were consumed so the caller can advance its cursor past it.
pub(crate) fn parse_raw_table(tokens: &[Token]) -> (RawTable, usize) {
    let mut table = RawTable::default();
    let mut depth = 0i32;
    let mut i = 0;
    let mut current_row: Option<Vec<RawCell>> = None;
    let mut in_cell: Option<RawCell> = None;
    let mut in_caption = false;
    let mut in_thead = false;

    while i < tokens.len() {
        match &tokens[i] {
            Token::StartTag { name, attrs, self_closing } => {
                match name.as_str() {
                    "table" => depth += 1,
                    "thead" => in_thead = true,
                    "caption" => in_caption = true,
                    "tr" => current_row = Some(Vec::new()),
                    "td" | "th" => {
                        let row_span = attr(attrs, "rowspan").and_then(|v| v.parse().ok()).unwrap_or(1).max(1);
                        let col_span = attr(attrs, "colspan").and_then(|v| v.parse().ok()).unwrap_or(1).max(1);
                        let style = attr(attrs, "style").unwrap_or_default();
                        let align_attr = attr(attrs, "align");
                        let alignment = resolve_alignment(&style, align_attr.as_deref());
                        in_cell = Some(RawCell {
                            content: String::new(),
                            row_span,
                            col_span,
                            is_header: name == "th" || in_thead,
                            alignment,
                        });
                    }
                    _ => {}
                }
                if *self_closing && matches!(name.as_str(), "td" | "th") {
                    if let (Some(cell), Some(row)) = (in_cell.take(), current_row.as_mut()) {
                        row.push(cell);
                    }
                }
            }
            Token::EndTag { name } => match name.as_str() {
                "table" => {
                    depth -= 1;
                    if depth <= 0 {
                        i += 1;
                        break;
                    }
                }
                "thead" => in_thead = false,
                "caption" => in_caption = false,
                "tr" => {
                    if let Some(row) = current_row.take() {
                        table.rows.push(row);
                    }
                }
                "td" | "th" => {
                    if let (Some(cell), Some(row)) = (in_cell.take(), current_row.as_mut()) {
                        row.push(cell);
                    }
                }
                _ => {}
            },
            Token::Text(text) => {
                if in_caption {
                    table.caption.get_or_insert_with(String::new).push_str(text);
                } else if let Some(cell) = in_cell.as_mut() {
                    cell.content.push_str(text);
                }
            }
            Token::Comment(_) | Token::Doctype => {}
        }
        i += 1;
    }

    for row in &mut table.rows {
        for cell in row.iter_mut() {
            cell.content = cell.content.trim().to_string();
        }
    }
    if let Some(caption) = table.caption.as_mut() {
        *caption = caption.trim().to_string();
    }

    (table, i)
}

fn attr(attrs: &[(String, String)], key: &str) -> Option<String> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

fn resolve_alignment(style: &str, align_attr: Option<&str>) -> Alignment {
    let style_lower = style.to_ascii_lowercase();
    if style_lower.contains("text-align:right") || style_lower.contains("text-align: right") {
        return Alignment::Right;
    }
    if style_lower.contains("text-align:center") || style_lower.contains("text-align: center") {
        return Alignment::Center;
    }
    if style_lower.contains("text-align:left") || style_lower.contains("text-align: left") {
        return Alignment::Left;
    }
    match align_attr.map(|s| s.to_ascii_lowercase()) {
        Some(ref s) if s == "right" => Alignment::Right,
        Some(ref s) if s == "center" => Alignment::Center,
        Some(ref s) if s == "left" => Alignment::Left,
        _ => Alignment::Unspecified,
    }
}

/// The resolved, rectangular table.
#[derive(Debug, Clone)]
pub struct TableMatrix {
    pub caption: Option<String>,
    pub row_count: usize,
    pub col_count: usize,
    /// Cells at their origin. Positions covered only by a span (not an
    /// origin) don't appear here — look them up via `cell_at`.
    cells: Vec<Cell>,
    /// row_count x col_count grid of indices into `cells`, or `None` for a
    /// position covered by nobody (shouldn't happen once resolved, but kept
    /// `Option` to fail closed rather than panic on malformed input).
    grid: Vec<Option<usize>>,
    pub classification: TableClassification,
}

impl TableMatrix {
    /// Build a matrix from a raw parsed table, resolving rowspan/colspan via
    /// the documented two-pass algorithm: first pass places every cell at
    /// its origin and marks its spanned rectangle as covered (clipping
    /// colspan to the row width, and dropping cells that collide with an
    /// already-covered position); second pass classifies columns and
    /// detects a header band.
    pub(crate) fn from_raw(raw: RawTable) -> Self {
        let row_count = raw.rows.len();
        // The table's column count comes from its multi-cell rows' declared
        // widths; a lone single-cell row (a full-width banner or caption-like
        // row) never gets to define the width on its own, since that's
        // exactly the shape a too-wide colspan needs to be clipped against
        // rather than accommodated by.
        let row_width = |row: &[RawCell]| row.iter().map(|c| c.col_span as usize).sum::<usize>();
        let col_count = raw
            .rows
            .iter()
            .filter(|row| row.len() > 1)
            .map(|row| row_width(row))
            .max()
            .unwrap_or_else(|| raw.rows.iter().map(|row| row_width(row)).max().unwrap_or(0));

        let mut grid: Vec<Option<usize>> = vec![None; row_count * col_count];
        let mut cells: Vec<Cell> = Vec::new();

        for (r, row) in raw.rows.iter().enumerate() {
            let mut col_cursor = 0usize;
            for raw_cell in row {
                // Find the first uncovered column at this row.
                while col_cursor < col_count && grid[r * col_count + col_cursor].is_some() {
                    col_cursor += 1;
                }
                if col_cursor >= col_count {
                    continue; // row overflowed; drop silently (malformed input)
                }

                let mut col_span = raw_cell.col_span as usize;
                if col_cursor + col_span > col_count {
                    col_span = col_count - col_cursor; // clip to row width
                }
                let row_span = raw_cell.row_span as usize;

                // Detect a colliding span: if any target position is
                // already covered, the first-declared cell keeps it — drop
                // this cell entirely (per documented edge-case policy).
                let mut collides = false;
                'outer: for dr in 0..row_span {
                    let rr = r + dr;
                    if rr >= row_count {
                        break;
                    }
                    for dc in 0..col_span {
                        let cc = col_cursor + dc;
                        if grid[rr * col_count + cc].is_some() {
                            collides = true;
                            break 'outer;
                        }
                    }
                }
                if collides {
                    col_cursor += 1;
                    continue;
                }

                let cell_index = cells.len();
                cells.push(Cell {
                    content: raw_cell.content.clone(),
                    row_span: row_span as u32,
                    col_span: col_span as u32,
                    is_header: raw_cell.is_header,
                    alignment: raw_cell.alignment,
                    origin: (r as u32, col_cursor as u32),
                });

                for dr in 0..row_span {
                    let rr = r + dr;
                    if rr >= row_count {
                        break;
                    }
                    for dc in 0..col_span {
                        let cc = col_cursor + dc;
                        grid[rr * col_count + cc] = Some(cell_index);
                    }
                }
                col_cursor += col_span;
            }
        }

        let classification = classify(&cells, row_count, col_count);

        Self {
            caption: raw.caption,
            row_count,
            col_count,
            cells,
            grid,
            classification,
        }
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.row_count || col >= self.col_count {
            return None;
        }
        self.grid[row * self.col_count + col].map(|idx| &self.cells[idx])
    }

    pub fn has_header(&self) -> bool {
        self.cells.iter().any(|c| c.is_header)
            || (self.row_count > 0 && (0..self.col_count).all(|c| self.cell_at(0, c).map(|cell| cell.is_header).unwrap_or(false)))
    }

    /// Render to a 2D array of strings suitable for a dataframe-style
    /// export: one entry per grid position, repeating a spanning cell's
    /// content across the cells it covers.
    pub fn to_dataframe(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.row_count);
        for r in 0..self.row_count {
            let mut row = Vec::with_capacity(self.col_count);
            for c in 0..self.col_count {
                row.push(self.cell_at(r, c).map(|cell| cell.content.clone()).unwrap_or_default());
            }
            out.push(row);
        }
        out
    }

    /// Plain document-order text: every origin cell's content, space
    /// separated, one line per row.
    pub fn text(&self) -> String {
        let mut lines = Vec::with_capacity(self.row_count);
        for r in 0..self.row_count {
            let mut seen = std::collections::HashSet::new();
            let mut parts = Vec::new();
            for c in 0..self.col_count {
                if let Some(idx) = self.grid[r * self.col_count + c] {
                    if seen.insert(idx) {
                        parts.push(self.cells[idx].content.clone());
                    }
                }
            }
            lines.push(parts.join(" "));
        }
        lines.join("\n")
    }

    /// A minimal box-drawn rendering for terminal display.
    pub fn render(&self) -> String {
        let df = self.to_dataframe();
        let mut widths = vec![0usize; self.col_count];
        for row in &df {
            for (c, cell) in row.iter().enumerate() {
                widths[c] = widths[c].max(cell.chars().count());
            }
        }
        let sep: String = "+".to_string()
            + &widths.iter().map(|w| "-".repeat(w + 2)).collect::<Vec<_>>().join("+")
            + "+";
        let mut out = vec![sep.clone()];
        for row in &df {
            let line = "|".to_string()
                + &row
                    .iter()
                    .enumerate()
                    .map(|(c, cell)| format!(" {:<width$} ", cell, width = widths[c]))
                    .collect::<Vec<_>>()
                    .join("|")
                + "|";
            out.push(line);
            out.push(sep.clone());
        }
        out.join("\n")
    }
}

fn classify(cells: &[Cell], row_count: usize, col_count: usize) -> TableClassification {
    if cells.is_empty() || row_count == 0 || col_count == 0 {
        return TableClassification::Unknown;
    }

    let total = cells.len();
    let numeric = cells.iter().filter(|c| looks_numeric(&c.content)).count();
    let currency = cells.iter().filter(|c| c.content.contains('$') || c.content.contains('€') || c.content.contains('£')).count();
    let numeric_ratio = numeric as f32 / total as f32;

    let known_statement_labels = [
        "total assets",
        "total liabilities",
        "net income",
        "revenue",
        "total current assets",
        "total stockholders",
        "cash and cash equivalents",
        "operating expenses",
    ];
    let has_statement_labels = cells.iter().any(|c| {
        let lower = c.content.to_ascii_lowercase();
        known_statement_labels.iter().any(|label| lower.contains(label))
    });

    if has_statement_labels && numeric_ratio > 0.3 {
        return TableClassification::FinancialStatement;
    }
    if currency > 0 && numeric_ratio > 0.4 {
        return TableClassification::FinancialStatement;
    }
    if col_count <= 2 && numeric_ratio < 0.2 {
        return TableClassification::Layout;
    }
    if numeric_ratio > 0.6 {
        return TableClassification::NumericData;
    }
    if col_count >= 2 && row_count >= 2 && numeric_ratio > 0.15 {
        return TableClassification::Comparison;
    }
    if numeric_ratio < 0.1 {
        return TableClassification::Narrative;
    }
    TableClassification::Unknown
}

fn looks_numeric(content: &str) -> bool {
    let cleaned: String = content
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%' | '(' | ')' | '€' | '£' | ' '))
        .collect();
    if cleaned.is_empty() {
        return false;
    }
    cleaned.parse::<f64>().is_ok() || cleaned == "-" || cleaned == "—"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::tokenizer::Tokenizer;

    fn build(html: &str) -> TableMatrix {
        let tokens = Tokenizer::new(html).tokenize();
        let (raw, _consumed) = parse_raw_table(&tokens);
        TableMatrix::from_raw(raw)
    }

    #[test]
    fn simple_table_has_expected_dimensions() {
        let matrix = build("<table><tr><td>A</td><td>B</td></tr><tr><td>C</td><td>D</td></tr></table>");
        assert_eq!(matrix.row_count, 2);
        assert_eq!(matrix.col_count, 2);
        assert_eq!(matrix.cell_at(0, 0).unwrap().content, "A");
        assert_eq!(matrix.cell_at(1, 1).unwrap().content, "D");
    }

    #[test]
    fn rowspan_and_colspan_resolve_into_dense_grid() {
        let matrix = build(
            "<table><tr><td rowspan=\"2\">A</td><td>B</td></tr><tr><td>C</td></tr></table>",
        );
        assert_eq!(matrix.row_count, 2);
        assert_eq!(matrix.col_count, 2);
        assert_eq!(matrix.cell_at(0, 0).unwrap().content, "A");
        assert_eq!(matrix.cell_at(1, 0).unwrap().content, "A"); // covered by the rowspan
        assert_eq!(matrix.cell_at(1, 1).unwrap().content, "C");

        // Every position is claimed by exactly one cell's origin or span.
        let mut claimed = 0;
        for r in 0..matrix.row_count {
            for c in 0..matrix.col_count {
                if matrix.cell_at(r, c).is_some() {
                    claimed += 1;
                }
            }
        }
        assert_eq!(claimed, matrix.row_count * matrix.col_count);
    }

    #[test]
    fn colspan_exceeding_row_width_is_clipped() {
        let matrix = build(
            "<table><tr><td colspan=\"5\">A</td></tr><tr><td>B</td><td>C</td></tr></table>",
        );
        assert_eq!(matrix.col_count, 2);
        assert_eq!(matrix.cell_at(0, 0).unwrap().col_span, 2);
    }

    #[test]
    fn th_cells_mark_header_band() {
        let matrix = build("<table><tr><th>Name</th><th>Value</th></tr><tr><td>A</td><td>1</td></tr></table>");
        assert!(matrix.has_header());
    }

    #[test]
    fn financial_statement_detected_by_labels_and_currency() {
        let matrix = build(
            "<table><tr><td>Total Assets</td><td>$1,234</td></tr><tr><td>Total Liabilities</td><td>$500</td></tr></table>",
        );
        assert_eq!(matrix.classification, TableClassification::FinancialStatement);
    }
}
