//! Priority-resolved concept mapping: layers per-company overrides and an
//! entity-detection boost on top of the global [`ReverseIndex`], with its
//! own `(tag, statement_type)` result cache (negative results included, so
//! a tag nothing can map stays cheap to ask about twice).
//!
//! Resolution order, first non-null wins:
//! 1. **Priority 3** (entity-detection boost) — if the tag's namespace
//!    prefix matches a company with a loaded override file, try that
//!    company's mappings first, regardless of which filing is active.
//! 2. **Priority 2** (company) — the company named in the call's context,
//!    if different from (or in addition to) the entity-detected one.
//! 3. **Priority 1** (core) — the global `ReverseIndex`, always tried last.
//!
//! Company override files are named `<id>_mappings.json` and loaded lazily
//! on first reference to that company id — most runs only ever touch one or
//! two companies, so eagerly loading every override file in a directory
//! would be wasted work.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::Deserialize;

use super::reverse_index::{DisambiguationContext, ReverseIndex};

/// `<id>_mappings.json` shape: entity metadata plus a flat
/// `company_concept -> standard_concept` table.
#[derive(Debug, Clone, Deserialize)]
struct CompanyMappingFile {
    #[serde(default)]
    metadata: CompanyMetadata,
    #[serde(default)]
    concept_mappings: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CompanyMetadata {
    #[serde(default)]
    cik: Option<String>,
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    entity_identifier: Option<String>,
}

/// Context passed to `ConceptMapper::map_concept`, loosely mirroring the
/// row context the Standardizer builds per line item.
#[derive(Debug, Clone, Default)]
pub struct MapperContext<'a> {
    pub statement_type: Option<&'a str>,
    pub section: Option<&'a str>,
    pub is_total: bool,
    pub label: Option<&'a str>,
    /// CIK or ticker identifying the filer, if known. Enables priority-2
    /// lookup even when the tag's own namespace prefix doesn't name a
    /// known company.
    pub company_id: Option<&'a str>,
    pub log_ambiguous: bool,
}

impl<'a> MapperContext<'a> {
    fn disambiguation(&self) -> DisambiguationContext<'a> {
        DisambiguationContext { section: self.section, statement_type: self.statement_type, is_total: self.is_total, label: self.label }
    }
}

pub struct ConceptMapper {
    reverse_index: &'static ReverseIndex,
    mappings_dir: Option<PathBuf>,
    company_files: RwLock<HashMap<String, Option<CompanyMappingFile>>>,
    cache: Mutex<HashMap<(String, String), Option<String>>>,
}

impl ConceptMapper {
    /// A mapper with no company-override directory — priority 1 only.
    pub fn new() -> Self {
        Self { reverse_index: super::reverse_index::default_index(), mappings_dir: None, company_files: RwLock::new(HashMap::new()), cache: Mutex::new(HashMap::new()) }
    }

    /// A mapper that looks for `<id>_mappings.json` override files under
    /// `mappings_dir`.
    pub fn with_mappings_dir(mappings_dir: impl Into<PathBuf>) -> Self {
        Self { reverse_index: super::reverse_index::default_index(), mappings_dir: Some(mappings_dir.into()), company_files: RwLock::new(HashMap::new()), cache: Mutex::new(HashMap::new()) }
    }

    /// Map `company_concept` to a standard concept, checking priority 3
    /// (entity-detected company), then priority 2 (company named in
    /// `context`), then priority 1 (core reverse index). Caches by
    /// `(company_concept, statement_type)`, including `None` results.
    pub fn map_concept(&self, company_concept: &str, context: &MapperContext) -> Option<String> {
        let cache_key = (company_concept.to_string(), context.statement_type.unwrap_or("").to_string());
        if let Some(cached) = self.cache.lock().expect("concept mapper cache mutex poisoned").get(&cache_key) {
            return cached.clone();
        }

        let detected_company = detect_company_prefix(company_concept);

        let result = detected_company
            .as_deref()
            .and_then(|id| self.lookup_company_mapping(id, company_concept))
            .or_else(|| context.company_id.and_then(|id| self.lookup_company_mapping(id, company_concept)))
            .or_else(|| self.reverse_index.get_standard_concept(company_concept, Some(&context.disambiguation()), context.log_ambiguous));

        self.cache.lock().expect("concept mapper cache mutex poisoned").insert(cache_key, result.clone());
        result
    }

    fn lookup_company_mapping(&self, company_id: &str, company_concept: &str) -> Option<String> {
        let file = self.load_company_file(company_id)?;
        file.concept_mappings.get(company_concept).cloned()
    }

    /// Lazily load and cache `<company_id>_mappings.json`. Takes the read
    /// lock first; only on a miss does it upgrade to a write lock to
    /// insert — avoids serializing every lookup behind a write lock once
    /// the company's file is already resident.
    fn load_company_file(&self, company_id: &str) -> Option<CompanyMappingFile> {
        if let Some(cached) = self.company_files.read().expect("company file cache poisoned").get(company_id) {
            return cached.clone();
        }

        let loaded = self.mappings_dir.as_ref().and_then(|dir| read_company_file(dir, company_id));
        self.company_files.write().expect("company file cache poisoned").insert(company_id.to_string(), loaded.clone());
        loaded
    }

    pub fn clear_cache(&self) {
        self.cache.lock().expect("concept mapper cache mutex poisoned").clear();
    }
}

impl Default for ConceptMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CompanyMappingFile {
    fn clone(&self) -> Self {
        Self { metadata: self.metadata.clone(), concept_mappings: self.concept_mappings.clone() }
    }
}

fn read_company_file(dir: &Path, company_id: &str) -> Option<CompanyMappingFile> {
    let path = dir.join(format!("{company_id}_mappings.json"));
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Extract a namespace-prefix company identifier from a tag, e.g.
/// `"tsla:AutomotiveRevenue"` -> `Some("tsla")`. Returns `None` for the
/// standard `us-gaap:`/`ifrs-full:`/`dei:` namespaces, which never name a
/// specific filer.
fn detect_company_prefix(tag: &str) -> Option<String> {
    let (prefix, _) = tag.split_once(':')?;
    if matches!(prefix, "us-gaap" | "ifrs-full" | "dei" | "srt") {
        None
    } else {
        Some(prefix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_core_reverse_index_with_no_company_context() {
        let mapper = ConceptMapper::new();
        let ctx = MapperContext::default();
        assert_eq!(mapper.map_concept("us-gaap:AccountsPayableCurrent", &ctx).as_deref(), Some("TradePayables"));
    }

    #[test]
    fn detect_company_prefix_ignores_standard_namespaces() {
        assert_eq!(detect_company_prefix("us-gaap:Revenues"), None);
        assert_eq!(detect_company_prefix("dei:EntityRegistrantName"), None);
        assert_eq!(detect_company_prefix("tsla:AutomotiveRevenue"), Some("tsla".to_string()));
    }

    #[test]
    fn repeated_lookups_are_served_from_cache() {
        let mapper = ConceptMapper::new();
        let ctx = MapperContext::default();
        let first = mapper.map_concept("us-gaap:Goodwill", &ctx);
        let second = mapper.map_concept("us-gaap:Goodwill", &ctx);
        assert_eq!(first, second);
    }

    #[test]
    fn negative_results_are_cached_too() {
        let mapper = ConceptMapper::new();
        let ctx = MapperContext::default();
        assert_eq!(mapper.map_concept("us-gaap:SomeUnknownConcept", &ctx), None);
        // Second call must hit the cache path rather than re-querying.
        assert_eq!(mapper.map_concept("us-gaap:SomeUnknownConcept", &ctx), None);
    }

    #[test]
    fn unknown_company_id_falls_through_to_core_mapping() {
        let mapper = ConceptMapper::with_mappings_dir("/nonexistent/mappings/dir");
        let ctx = MapperContext { company_id: Some("1234567"), ..Default::default() };
        assert_eq!(mapper.map_concept("us-gaap:AccountsPayableCurrent", &ctx).as_deref(), Some("TradePayables"));
    }
}
