//! Parser configuration.
//!
//! Mirrors the shape the rest of this lineage uses for its config structs:
//! `serde`-derived, every field defaulted via a named `default_*` function so
//! partial YAML/JSON overrides deserialize cleanly, with named factory
//! presets for common tuning profiles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ParserError;

fn default_max_document_size() -> usize {
    100 * 1024 * 1024 // 100 MiB — handles large filings like JPM's 10-K
}

fn default_streaming_threshold() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

fn default_cache_size() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_min_confidence() -> f32 {
    0.6
}

fn default_cross_validation_boost() -> f32 {
    1.2
}

fn default_disagreement_penalty() -> f32 {
    0.8
}

fn default_boundary_overlap_penalty() -> f32 {
    0.9
}

fn default_header_detection_threshold() -> f32 {
    0.6
}

fn default_min_text_length() -> usize {
    10
}

fn default_merge_distance() -> usize {
    2
}

/// Configurable thresholds for section-detection strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionThresholds {
    /// Minimum confidence score to accept a section (0.0-1.0).
    pub min_confidence: f32,
    /// Multiplier applied when multiple strategies agree (>1.0).
    pub cross_validation_boost: f32,
    /// Multiplier applied when strategies disagree (<1.0).
    pub disagreement_penalty: f32,
    /// Multiplier applied to the later of two overlapping sections (<1.0).
    pub boundary_overlap_penalty: f32,
    /// Whether to run the contextual (cross-validation) strategy. Disabled
    /// by default for performance.
    pub enable_cross_validation: bool,
    /// Filing-form-specific threshold overrides, keyed by form (e.g. "10-K").
    pub thresholds_by_form: HashMap<String, HashMap<String, f32>>,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            cross_validation_boost: default_cross_validation_boost(),
            disagreement_penalty: default_disagreement_penalty(),
            boundary_overlap_penalty: default_boundary_overlap_penalty(),
            enable_cross_validation: false,
            thresholds_by_form: HashMap::new(),
        }
    }
}

fn default_section_patterns() -> HashMap<String, Vec<String>> {
    let mut patterns = HashMap::new();
    patterns.insert(
        "business".to_string(),
        vec![
            r"item\s+1\.?\s*business".to_string(),
            r"business\s+overview".to_string(),
            r"our\s+business".to_string(),
        ],
    );
    patterns.insert(
        "risk_factors".to_string(),
        vec![
            r"item\s+1a\.?\s*risk\s+factors".to_string(),
            r"risk\s+factors".to_string(),
            r"factors\s+that\s+may\s+affect".to_string(),
        ],
    );
    patterns.insert(
        "properties".to_string(),
        vec![r"item\s+2\.?\s*properties".to_string(), r"properties".to_string()],
    );
    patterns.insert(
        "legal_proceedings".to_string(),
        vec![
            r"item\s+3\.?\s*legal\s+proceedings".to_string(),
            r"legal\s+proceedings".to_string(),
            r"litigation".to_string(),
        ],
    );
    patterns.insert(
        "mda".to_string(),
        vec![
            r"item\s+7\.?\s*management'?s?\s+discussion".to_string(),
            r"md&a".to_string(),
            r"management'?s?\s+discussion\s+and\s+analysis".to_string(),
        ],
    );
    patterns.insert(
        "financial_statements".to_string(),
        vec![
            r"item\s+8\.?\s*financial\s+statements".to_string(),
            r"consolidated\s+financial\s+statements".to_string(),
            r"financial\s+statements".to_string(),
        ],
    );
    patterns
}

fn default_features() -> HashMap<String, bool> {
    let mut features = HashMap::new();
    for key in [
        "ml_header_detection",
        "semantic_analysis",
        "table_understanding",
        "xbrl_validation",
        "auto_section_detection",
        "smart_text_extraction",
        "footnote_linking",
        "cross_reference_resolution",
    ] {
        features.insert(key.to_string(), true);
    }
    features
}

fn default_header_detection_methods() -> Vec<String> {
    vec![
        "style".to_string(),
        "pattern".to_string(),
        "structural".to_string(),
        "contextual".to_string(),
    ]
}

/// Configuration for the HTML parser and the section/table/XBRL subsystems
/// that sit on top of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    // Performance settings
    #[serde(default = "default_max_document_size")]
    pub max_document_size: usize,
    #[serde(default = "default_streaming_threshold")]
    pub streaming_threshold: usize,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default = "default_true")]
    pub enable_parallel: bool,

    // Parsing settings
    pub strict_mode: bool,
    #[serde(default = "default_true")]
    pub extract_xbrl: bool,
    #[serde(default = "default_true")]
    pub extract_styles: bool,
    pub preserve_whitespace: bool,
    #[serde(default = "default_true")]
    pub normalize_text: bool,
    #[serde(default = "default_true")]
    pub extract_links: bool,
    pub extract_images: bool,

    // AI optimization (output shaping for downstream LLM consumers)
    #[serde(default = "default_true")]
    pub optimize_for_ai: bool,
    pub max_token_estimation: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    // Table processing
    #[serde(default = "default_true")]
    pub table_extraction: bool,
    #[serde(default = "default_true")]
    pub detect_table_types: bool,
    #[serde(default = "default_true")]
    pub extract_table_relationships: bool,
    #[serde(default = "default_true")]
    pub fast_table_rendering: bool,

    // Section detection
    #[serde(default = "default_true")]
    pub detect_sections: bool,
    pub eager_section_extraction: bool,
    /// Filing form, e.g. "10-K", "10-Q", "8-K". Required for section
    /// detection to select form-specific patterns.
    pub form: Option<String>,
    pub detection_thresholds: DetectionThresholds,
    #[serde(default = "default_section_patterns")]
    pub section_patterns: HashMap<String, Vec<String>>,

    #[serde(default = "default_features")]
    pub features: HashMap<String, bool>,

    // Header detection
    #[serde(default = "default_header_detection_threshold")]
    pub header_detection_threshold: f32,
    #[serde(default = "default_header_detection_methods")]
    pub header_detection_methods: Vec<String>,

    // Text extraction
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    #[serde(default = "default_true")]
    pub merge_adjacent_nodes: bool,
    #[serde(default = "default_merge_distance")]
    pub merge_distance: usize,

    // Performance monitoring
    pub enable_profiling: bool,
    pub log_performance: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_document_size: default_max_document_size(),
            streaming_threshold: default_streaming_threshold(),
            cache_size: default_cache_size(),
            enable_parallel: true,
            strict_mode: false,
            extract_xbrl: true,
            extract_styles: true,
            preserve_whitespace: false,
            normalize_text: true,
            extract_links: true,
            extract_images: false,
            optimize_for_ai: true,
            max_token_estimation: 100_000,
            chunk_size: 512,
            chunk_overlap: 128,
            table_extraction: true,
            detect_table_types: true,
            extract_table_relationships: true,
            fast_table_rendering: true,
            detect_sections: true,
            eager_section_extraction: false,
            form: None,
            detection_thresholds: DetectionThresholds::default(),
            section_patterns: default_section_patterns(),
            features: default_features(),
            header_detection_threshold: default_header_detection_threshold(),
            header_detection_methods: default_header_detection_methods(),
            min_text_length: default_min_text_length(),
            merge_adjacent_nodes: true,
            merge_distance: default_merge_distance(),
            enable_profiling: false,
            log_performance: false,
        }
    }
}

impl ParserConfig {
    /// Validate the configuration, rejecting nonsensical threshold values at
    /// construction time rather than mid-parse.
    pub fn validate(&self) -> Result<(), ParserError> {
        if self.streaming_threshold > self.max_document_size {
            return Err(ParserError::InvalidConfig(format!(
                "streaming_threshold ({}) cannot exceed max_document_size ({})",
                self.streaming_threshold, self.max_document_size
            )));
        }
        let mc = self.detection_thresholds.min_confidence;
        if !(0.0..=1.0).contains(&mc) {
            return Err(ParserError::InvalidConfig(format!(
                "detection_thresholds.min_confidence must be in [0.0, 1.0], got {mc}"
            )));
        }
        Ok(())
    }

    /// Tuned for throughput: skips style/XBRL extraction and the pricier
    /// table/section analysis.
    pub fn for_performance() -> Self {
        let mut features = HashMap::new();
        for key in ["ml_header_detection", "semantic_analysis", "table_understanding", "xbrl_validation"] {
            features.insert(key.to_string(), false);
        }
        Self {
            extract_styles: false,
            extract_xbrl: false,
            enable_parallel: true,
            cache_size: 5000,
            eager_section_extraction: false,
            fast_table_rendering: true,
            features,
            ..Self::default()
        }
    }

    /// Tuned for fidelity: strict parsing, every analysis pass enabled.
    pub fn for_accuracy() -> Self {
        Self {
            strict_mode: true,
            extract_styles: true,
            extract_xbrl: true,
            enable_parallel: true,
            features: default_features(),
            ..Self::default()
        }
    }

    /// Tuned for downstream LLM consumption: skip styles (not useful to a
    /// model), keep XBRL and text normalization, merge adjacent nodes.
    pub fn for_ai() -> Self {
        let mut features = HashMap::new();
        for key in ["ml_header_detection", "semantic_analysis", "smart_text_extraction"] {
            features.insert(key.to_string(), true);
        }
        Self {
            optimize_for_ai: true,
            extract_styles: false,
            extract_xbrl: true,
            normalize_text: true,
            merge_adjacent_nodes: true,
            features,
            ..Self::default()
        }
    }

    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate().map_err(anyhow::Error::from)?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults (with a warning) on any
    /// I/O or deserialization failure. Mapping/config file loads degrade
    /// gracefully rather than aborting a run.
    pub fn load_with_fallback(path: &std::path::Path) -> Self {
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!(
                    "⚠️  Failed to load config from {}, using defaults: {err}",
                    path.display()
                );
                Self::default()
            }
        }
    }
}

/// Per-form-type parser configuration registry. Parallels `ConfigManager`
/// from the PDF-era config layer, but keyed by filing form string instead of
/// a closed document-type enum, since SEC forms are an open-ended set.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    by_form: HashMap<String, ParserConfig>,
    default_config: ParserConfig,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            by_form: HashMap::new(),
            default_config: ParserConfig::default(),
        };
        registry.load_builtin_configs();
        registry
    }

    fn load_builtin_configs(&mut self) {
        for form in ["10-K", "10-Q", "8-K"] {
            let mut config = ParserConfig::default();
            config.form = Some(form.to_string());
            self.by_form.insert(form.to_string(), config);
        }
    }

    pub fn get_config(&self, form: Option<&str>) -> &ParserConfig {
        match form {
            Some(form) => self.by_form.get(form).unwrap_or(&self.default_config),
            None => &self.default_config,
        }
    }

    pub fn register(&mut self, form: impl Into<String>, config: ParserConfig) {
        self.by_form.insert(form.into(), config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_documented_values() {
        let config = ParserConfig::default();
        assert_eq!(config.max_document_size, 100 * 1024 * 1024);
        assert_eq!(config.streaming_threshold, 10 * 1024 * 1024);
        assert_eq!(config.cache_size, 1000);
        assert_eq!(config.detection_thresholds.min_confidence, 0.6);
        assert!(!config.detection_thresholds.enable_cross_validation);
        assert_eq!(config.header_detection_threshold, 0.6);
    }

    #[test]
    fn validate_rejects_streaming_threshold_above_max() {
        let mut config = ParserConfig::default();
        config.streaming_threshold = config.max_document_size + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn for_performance_disables_expensive_features() {
        let config = ParserConfig::for_performance();
        assert!(!config.extract_styles);
        assert!(!config.extract_xbrl);
        assert_eq!(config.features.get("xbrl_validation"), Some(&false));
    }

    #[test]
    fn registry_falls_back_to_default_for_unknown_form() {
        let registry = ConfigRegistry::new();
        let config = registry.get_config(Some("NPORT-P"));
        assert_eq!(config.max_document_size, 100 * 1024 * 1024);
        let tenk = registry.get_config(Some("10-K"));
        assert_eq!(tenk.form.as_deref(), Some("10-K"));
    }
}
