//! Thread-safe accumulator for tags standardization couldn't map (or could
//! only map ambiguously), so mapping coverage can be expanded systematically
//! from CSV review rather than guessed at.
//!
//! Two partitions, each append-only and deduplicated on its own key:
//! unmapped tags by `(concept, statement_type)`, ambiguous resolutions by
//! `(concept, section, chosen_result)`. Both export to Excel-friendly CSV —
//! list-valued fields (candidate concepts) are pipe-separated within a
//! single cell rather than spread across columns, since the column count
//! per row must stay fixed for `csv::Writer`.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde::Serialize;

use crate::error::ParserError;

#[derive(Debug, Clone, Serialize)]
struct UnmappedTagEntry {
    concept: String,
    label: String,
    suggested_mapping: String,
    confidence: String,
    cik: String,
    company_name: String,
    statement_type: String,
    section: String,
    calculation_parent: String,
    notes: String,
}

#[derive(Debug, Clone, Serialize)]
struct AmbiguousResolutionEntry {
    concept: String,
    label: String,
    candidates: String,
    resolved_to: String,
    resolution_method: String,
    confidence: String,
    cik: String,
    company_name: String,
    statement_type: String,
    section: String,
    notes: String,
}

/// Extra context an unmapped-tag log entry can carry. Every field beyond
/// `concept`/`label` is optional, mirroring the Python logger's
/// keyword-argument call sites.
#[derive(Debug, Clone, Default)]
pub struct UnmappedContext {
    pub cik: Option<String>,
    pub company_name: Option<String>,
    pub statement_type: Option<String>,
    pub section: Option<String>,
    pub calculation_parent: Option<String>,
    pub notes: Option<String>,
}

#[derive(Default)]
struct LoggerState {
    unmapped: Vec<UnmappedTagEntry>,
    ambiguous: Vec<AmbiguousResolutionEntry>,
    seen_unmapped: std::collections::HashSet<String>,
    seen_ambiguous: std::collections::HashSet<String>,
}

pub struct UnmappedTagLogger {
    state: Mutex<LoggerState>,
    auto_suggest: bool,
}

impl UnmappedTagLogger {
    pub fn new(auto_suggest: bool) -> Self {
        Self { state: Mutex::new(LoggerState::default()), auto_suggest }
    }

    /// Log an unmapped XBRL tag. A no-op if `(concept, statement_type)` was
    /// already logged — the first entry for a given key wins.
    pub fn log_unmapped(&self, concept: &str, label: &str, context: &UnmappedContext) {
        let key = format!("{concept}:{}", context.statement_type.as_deref().unwrap_or(""));
        let mut state = self.state.lock().expect("unmapped tag logger mutex poisoned");
        if !state.seen_unmapped.insert(key) {
            return;
        }

        let (suggested, confidence) =
            if self.auto_suggest { suggest_mapping(label, context.statement_type.as_deref()) } else { (None, 0.0) };

        state.unmapped.push(UnmappedTagEntry {
            concept: concept.to_string(),
            label: label.to_string(),
            suggested_mapping: suggested.unwrap_or_default(),
            confidence: if confidence > 0.0 { format!("{confidence:.2}") } else { String::new() },
            cik: context.cik.clone().unwrap_or_default(),
            company_name: context.company_name.clone().unwrap_or_default(),
            statement_type: context.statement_type.clone().unwrap_or_default(),
            section: context.section.clone().unwrap_or_default(),
            calculation_parent: context.calculation_parent.clone().unwrap_or_default(),
            notes: context.notes.clone().unwrap_or_default(),
        });
    }

    /// Log how an ambiguous tag was resolved. A no-op if
    /// `(concept, section, resolved_to)` was already logged.
    #[allow(clippy::too_many_arguments)]
    pub fn log_ambiguous(
        &self,
        concept: &str,
        label: &str,
        candidates: Vec<String>,
        resolved_to: Option<String>,
        resolution_method: &str,
        statement_type: Option<String>,
        section: Option<String>,
        confidence: f32,
    ) {
        let key = format!("{concept}:{}:{}", section.as_deref().unwrap_or(""), resolved_to.as_deref().unwrap_or(""));
        let mut state = self.state.lock().expect("unmapped tag logger mutex poisoned");
        if !state.seen_ambiguous.insert(key) {
            return;
        }

        state.ambiguous.push(AmbiguousResolutionEntry {
            concept: concept.to_string(),
            label: label.to_string(),
            candidates: candidates.join("|"),
            resolved_to: resolved_to.unwrap_or_default(),
            resolution_method: resolution_method.to_string(),
            confidence: format!("{confidence:.2}"),
            cik: String::new(),
            company_name: String::new(),
            statement_type: statement_type.unwrap_or_default(),
            section: section.unwrap_or_default(),
            notes: String::new(),
        });
    }

    pub fn unmapped_count(&self) -> usize {
        self.state.lock().expect("unmapped tag logger mutex poisoned").unmapped.len()
    }

    pub fn ambiguous_count(&self) -> usize {
        self.state.lock().expect("unmapped tag logger mutex poisoned").ambiguous.len()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().expect("unmapped tag logger mutex poisoned");
        state.unmapped.clear();
        state.ambiguous.clear();
        state.seen_unmapped.clear();
        state.seen_ambiguous.clear();
    }

    /// Write `unmapped_tags.csv` into `output_dir`, returning the number of
    /// rows written (0 if there was nothing to log).
    pub fn save_unmapped_csv(&self, output_dir: &Path) -> Result<usize, ParserError> {
        let state = self.state.lock().expect("unmapped tag logger mutex poisoned");
        if state.unmapped.is_empty() {
            return Ok(0);
        }
        std::fs::create_dir_all(output_dir)?;
        let mut writer = csv::Writer::from_path(output_dir.join("unmapped_tags.csv")).map_err(csv_err)?;
        for entry in &state.unmapped {
            writer.serialize(entry).map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(state.unmapped.len())
    }

    /// Write `ambiguous_resolutions.csv` into `output_dir`.
    pub fn save_ambiguous_csv(&self, output_dir: &Path) -> Result<usize, ParserError> {
        let state = self.state.lock().expect("unmapped tag logger mutex poisoned");
        if state.ambiguous.is_empty() {
            return Ok(0);
        }
        std::fs::create_dir_all(output_dir)?;
        let mut writer = csv::Writer::from_path(output_dir.join("ambiguous_resolutions.csv")).map_err(csv_err)?;
        for entry in &state.ambiguous {
            writer.serialize(entry).map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(state.ambiguous.len())
    }

    pub fn save_to_csv(&self, output_dir: &Path) -> Result<(usize, usize), ParserError> {
        let unmapped = self.save_unmapped_csv(output_dir)?;
        let ambiguous = self.save_ambiguous_csv(output_dir)?;
        Ok((unmapped, ambiguous))
    }

    /// The process-wide default logger, shared by every `ConceptMapper`
    /// unless a caller builds its own.
    pub fn global() -> &'static UnmappedTagLogger {
        static DEFAULT_LOGGER: OnceLock<UnmappedTagLogger> = OnceLock::new();
        DEFAULT_LOGGER.get_or_init(|| UnmappedTagLogger::new(true))
    }
}

fn csv_err(e: csv::Error) -> ParserError {
    ParserError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Keyword-heuristic suggestion for an unmapped tag's standard concept,
/// scored by how strongly the label's wording implies a concept. Only a
/// handful of patterns are encoded — this is meant to surface "probably
/// X" hints for a human reviewing the unmapped-tags CSV, not to silently
/// stand in for a real mapping (callers never auto-accept these; see
/// `ConceptMapper`'s ≥0.9 threshold for the bar an automatic mapping has
/// to clear instead).
pub fn suggest_mapping(label: &str, statement_type: Option<&str>) -> (Option<String>, f32) {
    let label_lower = label.to_ascii_lowercase();

    const SUGGESTIONS: &[(&str, Option<&str>, &str, f32)] = &[
        ("net sales", Some("IncomeStatement"), "Revenue", 0.80),
        ("revenue", Some("IncomeStatement"), "Revenue", 0.85),
        ("sales", Some("IncomeStatement"), "Revenue", 0.75),
        ("cost of", Some("IncomeStatement"), "CostOfRevenue", 0.70),
        ("research", Some("IncomeStatement"), "ResearchAndDevelopmentExpense", 0.75),
        ("selling", Some("IncomeStatement"), "SellingGeneralAndAdministrativeExpense", 0.70),
        ("cash", Some("BalanceSheet"), "CashAndCashEquivalents", 0.75),
        ("receivable", Some("BalanceSheet"), "TradeReceivables", 0.70),
        ("inventory", Some("BalanceSheet"), "Inventories", 0.85),
        ("property", Some("BalanceSheet"), "PlantPropertyEquipmentNet", 0.70),
        ("goodwill", Some("BalanceSheet"), "Goodwill", 0.90),
        ("intangible", Some("BalanceSheet"), "IntangibleAssets", 0.80),
        ("payable", Some("BalanceSheet"), "TradePayables", 0.70),
        ("debt", Some("BalanceSheet"), "NoncurrentDebt", 0.65),
        ("deferred", Some("BalanceSheet"), "OtherOperatingNonCurrentLiabilities", 0.50),
        ("equity", Some("BalanceSheet"), "CommonEquity", 0.60),
        ("retained", Some("BalanceSheet"), "RetainedEarnings", 0.65),
    ];

    for (pattern, stmt, suggestion, confidence) in SUGGESTIONS {
        if label_lower.contains(pattern) && (stmt.is_none() || *stmt == statement_type) {
            return (Some(suggestion.to_string()), *confidence);
        }
    }

    (None, 0.0)
}
