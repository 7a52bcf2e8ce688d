//! Core library for purchase-order document backfill.
//!
//! This crate provides:
//! - Text acquisition from PDFs, scans, spreadsheets and plain text
//! - Pattern matchers per document type and target field
//! - Candidate reconciliation and line-item correlation
//! - The empty-target, unique-value write policy and its mapping report

pub mod error;
pub mod models;
pub mod pdf;
pub mod ocr;
pub mod sheets;
pub mod acquire;
pub mod rules;
pub mod reconcile;
pub mod correlate;
pub mod decision;
pub mod report;
pub mod store;
pub mod related;
pub mod pipeline;

pub use error::{DocfillError, Result};
pub use models::candidate::{Candidate, Provenance};
pub use models::config::{DocfillConfig, OcrPolicy};
pub use models::document::{DocumentType, ExtractedText, ExtractionMethod, FileKind, SourceDocument};
pub use models::order::{FieldValue, LineField, OrderField, OrderSnapshot, OrderUpdate};
pub use acquire::TextAcquirer;
pub use reconcile::{Reconciler, Reduced};
pub use decision::{Decision, SkipReason};
pub use report::{MappingReport, OrderReport, PersistenceStatus};
pub use store::{JsonFileStore, MemoryOrderStore, OrderStore};
pub use related::{GlobRelatedFiles, RelatedFileFinder};
pub use pipeline::{BackfillEngine, DocumentExtraction, RunOptions};
