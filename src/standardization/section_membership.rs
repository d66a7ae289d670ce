//! Lookup service mapping a standard concept to the section of a financial
//! statement it belongs to (`"Current Assets"`, `"Non-Current Liabilities"`,
//! ...). This is the context [`reverse_index::ReverseIndex`](super::reverse_index::ReverseIndex)
//! disambiguates ambiguous tags against, so it has to be loaded before any
//! disambiguation can happen — built once, at process startup, from a fixed
//! catalog (see [`default_catalog`]) rather than re-derived per document.

use std::collections::HashMap;
use std::sync::OnceLock;

/// `{statement_type: {section: [concept, ...]}}`, the same nesting shape the
/// original `section_membership.json` used (with its `_metadata` key
/// already stripped).
fn default_catalog() -> HashMap<&'static str, HashMap<&'static str, Vec<&'static str>>> {
    let mut balance_sheet = HashMap::new();
    balance_sheet.insert(
        "Current Assets",
        vec![
            "CashAndCashEquivalents",
            "CashAndMarketableSecurities",
            "TradeReceivables",
            "Inventories",
            "PrepaidExpenses",
            "OtherCurrentAssets",
        ],
    );
    balance_sheet.insert(
        "Non-Current Assets",
        vec![
            "PlantPropertyEquipmentNet",
            "Goodwill",
            "IntangibleAssets",
            "LongTermInvestments",
            "DeferredTaxAssetsNonCurrent",
            "OtherNonCurrentAssets",
        ],
    );
    balance_sheet.insert(
        "Current Liabilities",
        vec![
            "TradePayables",
            "AccruedLiabilitiesCurrent",
            "CurrentDebt",
            "OtherOperatingCurrentLiabilities",
            "DeferredRevenueCurrent",
        ],
    );
    balance_sheet.insert(
        "Non-Current Liabilities",
        vec![
            "NoncurrentDebt",
            "OtherOperatingNonCurrentLiabilities",
            "DeferredTaxLiabilitiesNonCurrent",
            "DeferredRevenueNonCurrent",
        ],
    );
    balance_sheet.insert("Equity", vec!["CommonEquity", "RetainedEarnings", "TreasuryStock", "AccumulatedOtherComprehensiveIncome"]);
    balance_sheet.insert(
        "Totals",
        vec!["TotalCurrentAssets", "TotalAssets", "TotalCurrentLiabilities", "TotalLiabilities", "TotalEquity", "TotalLiabilitiesAndEquity"],
    );

    let mut income_statement = HashMap::new();
    income_statement.insert("Revenue", vec!["Revenue", "OtherRevenue"]);
    income_statement.insert(
        "Operating Expenses",
        vec!["CostOfRevenue", "ResearchAndDevelopmentExpense", "SellingGeneralAndAdministrativeExpense", "OperatingExpenses"],
    );
    income_statement.insert("Operating Income", vec!["OperatingIncome", "GrossProfit"]);
    income_statement.insert("Other Income and Expense", vec!["InterestExpense", "InterestIncome", "OtherNonoperatingIncomeExpense"]);
    income_statement.insert("Income Taxes", vec!["IncomeTaxExpense", "IncomeBeforeTax"]);
    income_statement.insert("Net Income", vec!["NetIncome", "NetIncomeLoss"]);

    let mut cash_flow = HashMap::new();
    cash_flow.insert("Operating Activities", vec!["CashFromOperations", "DepreciationAndAmortization", "ShareBasedCompensation"]);
    cash_flow.insert("Investing Activities", vec!["CashFromInvesting", "CapitalExpenditures", "AcquisitionsNetOfCash"]);
    cash_flow.insert("Financing Activities", vec!["CashFromFinancing", "RepaymentsOfDebt", "ProceedsFromDebt", "DividendsPaid"]);
    cash_flow.insert("Totals", vec!["NetChangeInCash"]);

    let mut catalog = HashMap::new();
    catalog.insert("BalanceSheet", balance_sheet);
    catalog.insert("IncomeStatement", income_statement);
    catalog.insert("CashFlowStatement", cash_flow);
    catalog
}

pub struct SectionMembership {
    /// `concept -> {statement_type -> section}`.
    by_concept: HashMap<String, HashMap<String, String>>,
    statement_sections: HashMap<String, Vec<String>>,
}

impl SectionMembership {
    pub fn new() -> Self {
        Self::from_catalog(default_catalog())
    }

    fn from_catalog(catalog: HashMap<&'static str, HashMap<&'static str, Vec<&'static str>>>) -> Self {
        let mut by_concept: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut statement_sections: HashMap<String, Vec<String>> = HashMap::new();

        for (statement_type, sections) in catalog {
            let mut section_names = Vec::with_capacity(sections.len());
            for (section_name, concepts) in sections {
                section_names.push(section_name.to_string());
                for concept in concepts {
                    by_concept
                        .entry(concept.to_string())
                        .or_default()
                        .insert(statement_type.to_string(), section_name.to_string());
                }
            }
            statement_sections.insert(statement_type.to_string(), section_names);
        }

        Self { by_concept, statement_sections }
    }

    /// Section for `concept`, optionally restricted to a single statement
    /// type. Without a `statement_type`, returns whichever statement's
    /// entry happens to come back first — concepts are expected to live in
    /// exactly one statement in practice.
    pub fn get_section(&self, concept: &str, statement_type: Option<&str>) -> Option<&str> {
        let sections = self.by_concept.get(concept)?;
        match statement_type {
            Some(st) => sections.get(st).map(|s| s.as_str()),
            None => sections.values().next().map(|s| s.as_str()),
        }
    }

    pub fn get_statement_sections(&self, statement_type: &str) -> &[String] {
        self.statement_sections.get(statement_type).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// `true` if `concept`'s Balance Sheet section is current, `false` if
    /// non-current, `None` if the concept isn't a balance-sheet concept.
    pub fn is_current(&self, concept: &str) -> Option<bool> {
        let section = self.get_section(concept, Some("BalanceSheet"))?;
        let lower = section.to_ascii_lowercase();
        if lower.contains("current") && !lower.contains("non-current") {
            Some(true)
        } else if lower.contains("non-current") {
            Some(false)
        } else {
            None
        }
    }

    pub fn is_asset(&self, concept: &str) -> Option<bool> {
        let section = self.get_section(concept, Some("BalanceSheet"))?;
        let lower = section.to_ascii_lowercase();
        if lower.contains("asset") {
            Some(true)
        } else if lower.contains("liabilit") || lower.contains("equity") {
            Some(false)
        } else if section == "Totals" {
            let concept_lower = concept.to_ascii_lowercase();
            if concept_lower.contains("asset") {
                Some(true)
            } else if concept_lower.contains("liabilit") || concept_lower.contains("equity") {
                Some(false)
            } else {
                None
            }
        } else {
            None
        }
    }

    pub fn is_liability(&self, concept: &str) -> Option<bool> {
        let section = self.get_section(concept, Some("BalanceSheet"))?;
        Some(section.to_ascii_lowercase().contains("liabilit"))
    }

    pub fn is_equity(&self, concept: &str) -> Option<bool> {
        let section = self.get_section(concept, Some("BalanceSheet"))?;
        Some(section.to_ascii_lowercase().contains("equity"))
    }

    pub fn len(&self) -> usize {
        self.by_concept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_concept.is_empty()
    }
}

impl Default for SectionMembership {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_MEMBERSHIP: OnceLock<SectionMembership> = OnceLock::new();

/// The process-wide default section membership catalog.
pub fn default_membership() -> &'static SectionMembership {
    DEFAULT_MEMBERSHIP.get_or_init(SectionMembership::new)
}
