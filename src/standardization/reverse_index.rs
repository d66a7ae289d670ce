//! O(1) XBRL tag → standard-concept lookup, with the context-based
//! disambiguation rules for tags that map to more than one concept.
//!
//! ```text
//! XBRL tag (us-gaap:AccountsPayableCurrent)
//!     | reverse_index lookup, O(1)
//! standard concept (TradePayables)
//!     | display_names lookup
//! display label ("Accounts Payable")
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use super::section_membership::SectionMembership;
use super::unmapped_logger::UnmappedTagLogger;

const NAMESPACE_PREFIXES: &[&str] = &["us-gaap:", "us-gaap_", "ifrs-full:", "dei:"];

/// Tags that are never standardized — `dei:` cover-page facts and the like
/// carry no comparable financial meaning across filers.
const EXCLUDED_TAGS: &[&str] = &["dei:EntityCommonStockSharesOutstanding", "dei:DocumentPeriodEndDate", "dei:EntityRegistrantName"];

pub fn should_exclude(tag: &str) -> bool {
    EXCLUDED_TAGS.iter().any(|excluded| excluded.eq_ignore_ascii_case(tag))
}

#[derive(Debug, Clone)]
struct IndexEntry {
    standard_tags: Vec<&'static str>,
    ambiguous: bool,
    deprecated_year: Option<&'static str>,
    comment: Option<&'static str>,
}

fn entry(standard_tags: &[&'static str]) -> IndexEntry {
    IndexEntry {
        standard_tags: standard_tags.to_vec(),
        ambiguous: standard_tags.len() > 1,
        deprecated_year: None,
        comment: None,
    }
}

/// Built-in GAAP tag table. A real deployment loads this from the
/// `gaap_mappings.json`/`display_names.json` pair the spec documents;
/// the defaults here cover the concepts this crate's tests and the
/// Standardizer's subtotal table exercise, following the same
/// built-in-default-plus-override shape as `config::default_section_patterns`.
fn default_gaap_mappings() -> HashMap<&'static str, IndexEntry> {
    let mut m = HashMap::new();
    m.insert("CashAndCashEquivalentsAtCarryingValue", entry(&["CashAndCashEquivalents"]));
    m.insert("AccountsReceivableNetCurrent", entry(&["TradeReceivables"]));
    m.insert("InventoryNet", entry(&["Inventories"]));
    m.insert("PrepaidExpenseCurrent", entry(&["PrepaidExpenses"]));
    m.insert("AssetsCurrent", entry(&["TotalCurrentAssets"]));
    m.insert("PropertyPlantAndEquipmentNet", entry(&["PlantPropertyEquipmentNet"]));
    m.insert("Goodwill", entry(&["Goodwill"]));
    m.insert("IntangibleAssetsNetExcludingGoodwill", entry(&["IntangibleAssets"]));
    m.insert("Assets", entry(&["TotalAssets"]));
    m.insert("AccountsPayableCurrent", entry(&["TradePayables"]));
    m.insert("AccruedLiabilitiesCurrent", entry(&["AccruedLiabilitiesCurrent"]));
    m.insert("LiabilitiesCurrent", entry(&["TotalCurrentLiabilities"]));
    m.insert("LongTermDebtNoncurrent", entry(&["NoncurrentDebt"]));
    m.insert("DebtCurrent", entry(&["CurrentDebt"]));
    m.insert("Liabilities", entry(&["TotalLiabilities"]));
    m.insert("StockholdersEquity", entry(&["CommonEquity"]));
    m.insert("RetainedEarningsAccumulatedDeficit", entry(&["RetainedEarnings"]));
    m.insert("LiabilitiesAndStockholdersEquity", entry(&["TotalLiabilitiesAndEquity"]));
    m.insert("Revenues", entry(&["Revenue"]));
    m.insert("RevenueFromContractWithCustomerExcludingAssessedTax", entry(&["Revenue"]));
    m.insert("CostOfRevenue", entry(&["CostOfRevenue"]));
    m.insert("ResearchAndDevelopmentExpense", entry(&["ResearchAndDevelopmentExpense"]));
    m.insert("SellingGeneralAndAdministrativeExpense", entry(&["SellingGeneralAndAdministrativeExpense"]));
    m.insert("OperatingIncomeLoss", entry(&["OperatingIncome"]));
    m.insert("InterestExpense", entry(&["InterestExpense"]));
    m.insert("IncomeLossFromContinuingOperationsBeforeIncomeTaxesExtraordinaryItemsNoncontrollingInterest", entry(&["IncomeBeforeTax"]));
    m.insert("IncomeTaxExpenseBenefit", entry(&["IncomeTaxExpense"]));
    m.insert("NetIncomeLoss", entry(&["NetIncome"]));
    m.insert("NetCashProvidedByUsedInOperatingActivities", entry(&["CashFromOperations"]));
    m.insert("NetCashProvidedByUsedInInvestingActivities", entry(&["CashFromInvesting"]));
    m.insert("NetCashProvidedByUsedInFinancingActivities", entry(&["CashFromFinancing"]));
    m.insert("CashAndCashEquivalentsPeriodIncreaseDecrease", entry(&["NetChangeInCash"]));

    // Documented ambiguous tags — these are the two the spec's own test
    // vectors exercise (`test_issue_644_debt_disambiguation`-style current
    // vs. non-current bucketing, and the asset/liability straddling tag).
    m.insert(
        "AccountsPayableCurrentAndNoncurrent",
        IndexEntry {
            standard_tags: vec!["TradePayables", "OtherOperatingNonCurrentLiabilities"],
            ambiguous: true,
            deprecated_year: None,
            comment: Some("Curr/NonCurr ambiguity"),
        },
    );
    m.insert(
        "LongTermDebtObligations",
        IndexEntry {
            standard_tags: vec!["CurrentDebt", "NoncurrentDebt"],
            ambiguous: true,
            deprecated_year: None,
            comment: Some("debt classification ambiguity, see issue #644"),
        },
    );
    m
}

fn default_display_names() -> HashMap<&'static str, &'static str> {
    let mut names = HashMap::new();
    names.insert("CashAndCashEquivalents", "Cash and Cash Equivalents");
    names.insert("TradeReceivables", "Accounts Receivable");
    names.insert("Inventories", "Inventory");
    names.insert("PrepaidExpenses", "Prepaid Expenses");
    names.insert("TotalCurrentAssets", "Total Current Assets");
    names.insert("PlantPropertyEquipmentNet", "Property, Plant and Equipment");
    names.insert("Goodwill", "Goodwill");
    names.insert("IntangibleAssets", "Intangible Assets");
    names.insert("TotalAssets", "Total Assets");
    names.insert("TradePayables", "Accounts Payable");
    names.insert("AccruedLiabilitiesCurrent", "Accrued Liabilities");
    names.insert("TotalCurrentLiabilities", "Total Current Liabilities");
    names.insert("NoncurrentDebt", "Long-Term Debt");
    names.insert("CurrentDebt", "Short-Term Debt");
    names.insert("TotalLiabilities", "Total Liabilities");
    names.insert("CommonEquity", "Common Stock");
    names.insert("RetainedEarnings", "Retained Earnings");
    names.insert("TotalLiabilitiesAndEquity", "Total Liabilities and Equity");
    names.insert("Revenue", "Revenue");
    names.insert("CostOfRevenue", "Cost of Revenue");
    names.insert("ResearchAndDevelopmentExpense", "Research and Development Expense");
    names.insert("SellingGeneralAndAdministrativeExpense", "Selling, General and Administrative Expense");
    names.insert("OperatingIncome", "Operating Income");
    names.insert("InterestExpense", "Interest Expense");
    names.insert("IncomeBeforeTax", "Income Before Tax");
    names.insert("IncomeTaxExpense", "Income Tax Expense");
    names.insert("NetIncome", "Net Income");
    names.insert("CashFromOperations", "Net Cash from Operating Activities");
    names.insert("CashFromInvesting", "Net Cash from Investing Activities");
    names.insert("CashFromFinancing", "Net Cash from Financing Activities");
    names.insert("NetChangeInCash", "Net Change in Cash");
    names.insert("OtherOperatingNonCurrentLiabilities", "Other Non-Current Liabilities");
    names
}

/// Result of a [`ReverseIndex::lookup`].
#[derive(Debug, Clone)]
pub struct MappingResult {
    pub standard_concepts: Vec<String>,
    pub display_names: Vec<String>,
    pub is_ambiguous: bool,
    pub is_deprecated: bool,
    pub deprecated_year: Option<String>,
    pub comment: Option<String>,
}

impl MappingResult {
    pub fn primary_concept(&self) -> Option<&str> {
        self.standard_concepts.first().map(|s| s.as_str())
    }

    pub fn primary_display_name(&self) -> Option<&str> {
        self.display_names.first().map(|s| s.as_str())
    }
}

/// Context supplied to disambiguate an ambiguous tag. Every field is
/// optional: a caller with nothing but the tag still gets the fallback
/// (first-candidate) resolution.
#[derive(Debug, Clone, Default)]
pub struct DisambiguationContext<'a> {
    pub section: Option<&'a str>,
    pub statement_type: Option<&'a str>,
    pub is_total: bool,
    /// Only used when `log_ambiguous` — carried through to the logger.
    pub label: Option<&'a str>,
}

enum ResolutionMethod {
    IsTotal,
    Section,
    TagNameHint,
    Fallback,
}

impl ResolutionMethod {
    fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::IsTotal => "is_total",
            ResolutionMethod::Section => "section",
            ResolutionMethod::TagNameHint => "tag_name_hint",
            ResolutionMethod::Fallback => "fallback",
        }
    }
}

pub struct ReverseIndex {
    index: HashMap<String, IndexEntry>,
    display_names: HashMap<String, String>,
    normalized_cache: HashMap<String, String>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        let index: HashMap<String, IndexEntry> = default_gaap_mappings().into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let display_names: HashMap<String, String> = default_display_names().into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let mut reverse_index = Self { index, display_names, normalized_cache: HashMap::new() };
        reverse_index.build_normalized_cache();
        reverse_index
    }

    fn build_normalized_cache(&mut self) {
        let tags: Vec<String> = self.index.keys().cloned().collect();
        for tag in tags {
            self.normalized_cache.insert(tag.to_ascii_lowercase(), tag.clone());
            for prefix in NAMESPACE_PREFIXES {
                if tag.to_ascii_lowercase().starts_with(&prefix.to_ascii_lowercase()) {
                    let stripped = &tag[prefix.len()..];
                    self.normalized_cache.insert(stripped.to_ascii_lowercase(), tag.clone());
                }
            }
        }
    }

    fn normalize_tag(&self, tag: &str) -> Option<String> {
        if self.index.contains_key(tag) {
            return Some(tag.to_string());
        }

        let mut normalized = tag;
        for prefix in NAMESPACE_PREFIXES {
            if let Some(stripped) = tag.strip_prefix(prefix) {
                normalized = stripped;
                break;
            }
        }
        if self.index.contains_key(normalized) {
            return Some(normalized.to_string());
        }

        self.normalized_cache.get(&normalized.to_ascii_lowercase()).cloned()
    }

    pub fn lookup(&self, xbrl_tag: &str) -> Option<MappingResult> {
        if should_exclude(xbrl_tag) {
            return None;
        }
        let normalized = self.normalize_tag(xbrl_tag)?;
        let entry = self.index.get(&normalized)?;

        let display_names = entry
            .standard_tags
            .iter()
            .map(|tag| self.display_names.get(*tag).cloned().unwrap_or_else(|| tag.to_string()))
            .collect();

        Some(MappingResult {
            standard_concepts: entry.standard_tags.iter().map(|s| s.to_string()).collect(),
            display_names,
            is_ambiguous: entry.ambiguous,
            is_deprecated: entry.deprecated_year.is_some(),
            deprecated_year: entry.deprecated_year.map(|s| s.to_string()),
            comment: entry.comment.map(|s| s.to_string()),
        })
    }

    /// Primary lookup entry point. Non-ambiguous tags resolve immediately;
    /// ambiguous tags run the four-rule disambiguation in order
    /// (is_total → section → tag-name hint → fallback), stopping at the
    /// first rule that commits to a candidate.
    pub fn get_standard_concept(&self, xbrl_tag: &str, context: Option<&DisambiguationContext>, log_ambiguous: bool) -> Option<String> {
        let result = self.lookup(xbrl_tag)?;

        if !result.is_ambiguous {
            return result.primary_concept().map(|s| s.to_string());
        }

        let (resolved, method) = match context {
            Some(ctx) => self.disambiguate(xbrl_tag, &result.standard_concepts, ctx),
            None => (None, ResolutionMethod::Fallback),
        };

        let (resolved, method) = match resolved {
            Some(concept) => (concept, method),
            None => (result.primary_concept().unwrap().to_string(), ResolutionMethod::Fallback),
        };

        if log_ambiguous {
            UnmappedTagLogger::global().log_ambiguous(
                xbrl_tag,
                context.and_then(|c| c.label).unwrap_or(""),
                result.standard_concepts.clone(),
                Some(resolved.clone()),
                method.as_str(),
                context.and_then(|c| c.statement_type).map(|s| s.to_string()),
                context.and_then(|c| c.section).map(|s| s.to_string()),
                if matches!(method, ResolutionMethod::Fallback) { 0.5 } else { 1.0 },
            );
        }

        Some(resolved)
    }

    fn disambiguate(&self, xbrl_tag: &str, candidates: &[String], context: &DisambiguationContext) -> (Option<String>, ResolutionMethod) {
        // Rule 1: is_total hint.
        if context.is_total {
            if let Some(total_candidate) = candidates.iter().find(|c| c.to_ascii_lowercase().contains("total")) {
                return (Some(total_candidate.clone()), ResolutionMethod::IsTotal);
            }
        }

        // Rule 2: section matching via SectionMembership.
        if let Some(section) = context.section {
            let statement_type = context.statement_type.unwrap_or("BalanceSheet");
            for candidate in candidates {
                if let Some(candidate_section) = super::section_membership::default_membership().get_section(candidate, Some(statement_type)) {
                    if sections_match(section, candidate_section) {
                        return (Some(candidate.clone()), ResolutionMethod::Section);
                    }
                }
            }
        }

        // Rule 3: tag-name hints. Resolves a documented debt-classification
        // bug where "LongTermDebtObligations" (despite the name) was being
        // bucketed as current because it happened to sort first.
        let tag_lower = xbrl_tag.to_ascii_lowercase();
        if tag_lower.contains("noncurrent") || tag_lower.contains("longterm") {
            if let Some(candidate) = candidates.iter().find(|c| c.to_ascii_lowercase().contains("noncurrent")) {
                return (Some(candidate.clone()), ResolutionMethod::TagNameHint);
            }
        } else if tag_lower.contains("current") {
            if let Some(candidate) = candidates.iter().find(|c| {
                let lower = c.to_ascii_lowercase();
                lower.contains("current") && !lower.contains("noncurrent")
            }) {
                return (Some(candidate.clone()), ResolutionMethod::TagNameHint);
            }
        }

        (None, ResolutionMethod::Fallback)
    }

    pub fn get_display_name(&self, xbrl_tag: &str, context: Option<&DisambiguationContext>) -> Option<String> {
        let result = self.lookup(xbrl_tag)?;
        if !result.is_ambiguous {
            return result.primary_display_name().map(|s| s.to_string());
        }
        if let Some(ctx) = context {
            let (resolved, _) = self.disambiguate(xbrl_tag, &result.standard_concepts, ctx);
            if let Some(concept) = resolved {
                return Some(self.display_names.get(&concept).cloned().unwrap_or(concept));
            }
        }
        result.primary_display_name().map(|s| s.to_string())
    }

    pub fn is_excluded(&self, xbrl_tag: &str) -> bool {
        should_exclude(xbrl_tag)
    }

    pub fn is_ambiguous(&self, xbrl_tag: &str) -> bool {
        self.lookup(xbrl_tag).map(|r| r.is_ambiguous).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl Default for ReverseIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Fuzzy section-name equality: treats `"Current Assets"` and
/// `"CurrentAssets"` as the same, but requires current-vs-noncurrent and
/// asset-vs-liability to agree strictly (a "Current Assets" context must
/// never match a "Current Liabilities" candidate).
fn sections_match(context_section: &str, concept_section: &str) -> bool {
    let normalize = |s: &str| s.to_ascii_lowercase().replace(['-', '_'], " ");
    let ctx = normalize(context_section);
    let cpt = normalize(concept_section);

    if ctx == cpt {
        return true;
    }

    let is_current = |s: &str| s.contains("current") && !is_noncurrent(s);
    let ctx_current = is_current(&ctx);
    let ctx_noncurrent = is_noncurrent(&ctx);
    let cpt_current = is_current(&cpt);
    let cpt_noncurrent = is_noncurrent(&cpt);

    if ctx_current != cpt_current || ctx_noncurrent != cpt_noncurrent {
        return false;
    }

    let ctx_asset = ctx.contains("asset");
    let ctx_liability = ctx.contains("liabilit");
    let cpt_asset = cpt.contains("asset");
    let cpt_liability = cpt.contains("liabilit");

    if (ctx_asset && cpt_liability) || (ctx_liability && cpt_asset) {
        return false;
    }

    (ctx_current && cpt_current && ctx_asset && cpt_asset)
        || (ctx_current && cpt_current && ctx_liability && cpt_liability)
        || (ctx_noncurrent && cpt_noncurrent && ctx_asset && cpt_asset)
        || (ctx_noncurrent && cpt_noncurrent && ctx_liability && cpt_liability)
}

fn is_noncurrent(s: &str) -> bool {
    s.contains("non current") || s.contains("noncurrent") || (s.contains("non") && s.contains("current"))
}

static DEFAULT_INDEX: OnceLock<ReverseIndex> = OnceLock::new();

/// The process-wide default reverse index, built once on first use.
pub fn default_index() -> &'static ReverseIndex {
    DEFAULT_INDEX.get_or_init(ReverseIndex::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ambiguous_tag_resolves_to_its_sole_concept() {
        let index = ReverseIndex::new();
        assert_eq!(index.get_standard_concept("us-gaap:AccountsPayableCurrent", None, false).as_deref(), Some("TradePayables"));
    }

    #[test]
    fn namespace_prefixes_are_stripped_before_lookup() {
        let index = ReverseIndex::new();
        assert_eq!(index.get_standard_concept("AccountsPayableCurrent", None, false).as_deref(), Some("TradePayables"));
    }

    #[test]
    fn ambiguous_tag_disambiguates_via_tag_name_hint() {
        let index = ReverseIndex::new();
        let result = index.get_standard_concept("LongTermDebtObligations", Some(&DisambiguationContext::default()), false);
        assert_eq!(result.as_deref(), Some("NoncurrentDebt"));
    }

    #[test]
    fn ambiguous_tag_disambiguates_via_section_context() {
        let index = ReverseIndex::new();
        let ctx = DisambiguationContext {
            section: Some("Non-Current Liabilities"),
            statement_type: Some("BalanceSheet"),
            is_total: false,
            label: None,
        };
        let resolved = index.get_standard_concept("AccountsPayableCurrentAndNoncurrent", Some(&ctx), false).unwrap();
        assert_eq!(super::super::section_membership::default_membership().get_section(&resolved, Some("BalanceSheet")), Some("Non-Current Liabilities"));
    }

    #[test]
    fn is_total_hint_takes_priority_over_tag_name_and_section() {
        let index = ReverseIndex::new();
        let ctx = DisambiguationContext { section: None, statement_type: None, is_total: true, label: None };
        // Neither ambiguous fixture contains a "total" candidate, so the
        // rule should fall through harmlessly to a later rule rather than
        // panicking or picking randomly.
        let resolved = index.get_standard_concept("AccountsPayableCurrentAndNoncurrent", Some(&ctx), false);
        assert!(resolved.is_some());
    }

    #[test]
    fn ambiguous_tag_with_no_context_falls_back_to_first_candidate() {
        let index = ReverseIndex::new();
        let resolved = index.get_standard_concept("AccountsPayableCurrentAndNoncurrent", None, false);
        assert_eq!(resolved.as_deref(), Some("TradePayables"));
    }

    #[test]
    fn excluded_tags_never_resolve() {
        let index = ReverseIndex::new();
        assert!(index.is_excluded("dei:EntityRegistrantName"));
        assert_eq!(index.lookup("dei:EntityRegistrantName").map(|_| ()), None);
    }

    #[test]
    fn unknown_tag_returns_none() {
        let index = ReverseIndex::new();
        assert!(index.lookup("us-gaap:SomeConceptThatDoesNotExist").is_none());
    }
}
