//! Configuration structures for the backfill pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Native text shorter than this (in characters) triggers OCR under `auto`.
pub const MIN_NATIVE_TEXT_CHARS: usize = 50;

/// Upper bound on pages rasterized for OCR.
pub const MAX_OCR_PAGES: usize = 10;

/// Measurement candidates resolve to the maximum when max >= ratio * min.
pub const WEIGHT_OUTLIER_RATIO: i64 = 5;

/// Minimum length of a plausible proforma invoice number.
pub const REFERENCE_MIN_LEN: usize = 5;

/// Prefixes that make a separator-less reference plausible.
pub const REFERENCE_PREFIXES: [&str; 6] = ["PI", "INV", "PO", "SO", "QT", "CI"];

/// Lines at the top of a bill of lading scanned for an unlabeled B/L number.
pub const BOL_HEADER_SCAN_LINES: usize = 15;

/// Lines searched for a supplier name before the invoice/PO marker.
pub const COUNTERPARTY_HEADER_LINES: usize = 12;

/// Maximum supplier address lines collected after the name.
pub const ADDRESS_MAX_LINES: usize = 4;

/// Ports longer than this are rejected.
pub const PORT_MAX_LEN: usize = 40;

/// Lines scanned before and after a shipping-mark anchor.
pub const MARK_WINDOW_BEFORE: usize = 2;
pub const MARK_WINDOW_AFTER: usize = 15;

/// Main configuration for the docfill pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocfillConfig {
    /// Text acquisition configuration.
    pub acquisition: AcquisitionConfig,

    /// Candidate reconciliation configuration.
    pub reconcile: ReconcileConfig,

    /// Pattern matching windows and bounds.
    pub matching: MatchingConfig,

    /// Related-file scanning.
    pub related: RelatedConfig,
}

/// When to run optical recognition on page-based documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrPolicy {
    /// Only when native text is shorter than the configured minimum.
    #[default]
    Auto,
    /// Always, replacing native text when OCR returns something.
    Always,
    /// Never; images yield no text.
    Never,
}

impl OcrPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(OcrPolicy::Auto),
            "always" | "force" => Some(OcrPolicy::Always),
            "never" | "off" => Some(OcrPolicy::Never),
            _ => None,
        }
    }
}

impl fmt::Display for OcrPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OcrPolicy::Auto => "auto",
            OcrPolicy::Always => "always",
            OcrPolicy::Never => "never",
        })
    }
}

/// Text acquisition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// OCR policy for PDFs.
    pub ocr_policy: OcrPolicy,

    /// Minimum native text length to skip OCR under `auto`.
    pub min_native_chars: usize,

    /// Maximum pages to rasterize.
    pub max_ocr_pages: usize,

    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Path to the tesseract binary.
    pub tesseract_path: String,

    /// Tesseract language.
    pub tesseract_lang: String,

    /// Path to the pdftoppm binary.
    pub pdftoppm_path: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            ocr_policy: OcrPolicy::Auto,
            min_native_chars: MIN_NATIVE_TEXT_CHARS,
            max_ocr_pages: MAX_OCR_PAGES,
            render_dpi: 300,
            tesseract_path: "tesseract".to_string(),
            tesseract_lang: "eng".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
        }
    }
}

/// A supplier spelling that maps to a canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierAlias {
    pub canonical: String,
    pub variants: Vec<String>,
}

/// Candidate reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Let OCR-sourced candidates influence writes.
    pub allow_ocr_evidence: bool,

    /// Outlier ratio for measurement fields.
    pub outlier_ratio: Decimal,

    /// Minimum length of a plausible reference number.
    pub reference_min_len: usize,

    /// Known reference prefixes.
    pub reference_prefixes: Vec<String>,

    /// Extra supplier aliases on top of the built-in table.
    pub supplier_aliases: Vec<SupplierAlias>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            allow_ocr_evidence: false,
            outlier_ratio: Decimal::from(WEIGHT_OUTLIER_RATIO),
            reference_min_len: REFERENCE_MIN_LEN,
            reference_prefixes: REFERENCE_PREFIXES.iter().map(|s| s.to_string()).collect(),
            supplier_aliases: Vec::new(),
        }
    }
}

/// Pattern matching windows and bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub bol_header_scan_lines: usize,
    pub counterparty_header_lines: usize,
    pub address_max_lines: usize,
    pub port_max_len: usize,
    pub mark_window_before: usize,
    pub mark_window_after: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            bol_header_scan_lines: BOL_HEADER_SCAN_LINES,
            counterparty_header_lines: COUNTERPARTY_HEADER_LINES,
            address_max_lines: ADDRESS_MAX_LINES,
            port_max_len: PORT_MAX_LEN,
            mark_window_before: MARK_WINDOW_BEFORE,
            mark_window_after: MARK_WINDOW_AFTER,
        }
    }
}

/// Related-file scanning configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedConfig {
    /// Root directory to scan; scanning is off when unset.
    pub root: Option<PathBuf>,
}

impl DocfillConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_named_constants() {
        let config = DocfillConfig::default();
        assert_eq!(config.acquisition.min_native_chars, MIN_NATIVE_TEXT_CHARS);
        assert_eq!(config.reconcile.outlier_ratio, Decimal::from(5));
        assert_eq!(config.reconcile.reference_min_len, 5);
        assert!(!config.reconcile.allow_ocr_evidence);
        assert_eq!(config.matching.port_max_len, 40);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: DocfillConfig =
            serde_json::from_str(r#"{"acquisition": {"ocr_policy": "never"}}"#).unwrap();
        assert_eq!(config.acquisition.ocr_policy, OcrPolicy::Never);
        assert_eq!(config.acquisition.max_ocr_pages, MAX_OCR_PAGES);
        assert_eq!(config.matching.bol_header_scan_lines, BOL_HEADER_SCAN_LINES);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = DocfillConfig::default();
        config.reconcile.allow_ocr_evidence = true;
        config.save(&path).unwrap();

        let loaded = DocfillConfig::from_file(&path).unwrap();
        assert!(loaded.reconcile.allow_ocr_evidence);
    }
}
