//! The mapping report: the durable audit trail of one run.
//!
//! Every decision is recorded with the candidates behind it, applied or
//! not. Maps are `BTreeMap`s so serialized output is stable; the only
//! value that differs between identical runs is `generated_at`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::error::Result;
use crate::models::candidate::Candidate;
use crate::models::document::{DocumentType, ExtractionMethod};
use crate::models::order::{FieldValue, LineField, NewOrderLine, OrderField};
use crate::reconcile::{CandidateStatus, Reduced};

/// One candidate as it was judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    #[serde(flatten)]
    pub candidate: Candidate<FieldValue>,
    pub status: CandidateStatus,
}

/// Decision for one field, with all evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReport {
    pub current: Option<FieldValue>,
    pub candidates: Vec<CandidateReport>,
    pub reduced: Reduced<FieldValue>,
    #[serde(flatten)]
    pub decision: Decision,
}

/// Decisions for one existing order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReport {
    pub line_id: String,
    pub sku: String,
    pub fields: BTreeMap<LineField, FieldReport>,
}

/// How one document's text was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// `None` for files found by a related-file scan.
    pub document_id: Option<String>,
    pub document_type: DocumentType,
    pub source_path: Option<String>,
    pub method: Option<ExtractionMethod>,
    pub chars: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// What happened to the order's writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistenceStatus {
    /// Dry run: nothing was sent to the store.
    DryRun,
    /// No decision applied.
    NothingToWrite,
    /// The store accepted the update.
    Committed,
    /// The store rejected the update; none of it was written.
    Failed { error: String },
}

/// Everything recorded for one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub order_id: String,
    pub po_number: String,
    pub documents: Vec<DocumentReport>,
    pub fields: BTreeMap<OrderField, FieldReport>,
    pub lines: Vec<LineReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_lines: Vec<NewOrderLine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub persistence: PersistenceStatus,
}

impl OrderReport {
    /// Order fields with an apply decision.
    pub fn applied_fields(&self) -> impl Iterator<Item = (OrderField, &FieldValue)> {
        self.fields
            .iter()
            .filter_map(|(field, report)| report.decision.applied().map(|v| (*field, v)))
    }

    /// Line fields with an apply decision.
    pub fn applied_line_fields(&self) -> impl Iterator<Item = (&str, LineField, &FieldValue)> {
        self.lines.iter().flat_map(|line| {
            line.fields.iter().filter_map(move |(field, report)| {
                report
                    .decision
                    .applied()
                    .map(|v| (line.line_id.as_str(), *field, v))
            })
        })
    }

    /// Whether any write was proposed.
    pub fn has_writes(&self) -> bool {
        self.applied_fields().next().is_some()
            || self.applied_line_fields().next().is_some()
            || !self.created_lines.is_empty()
    }
}

/// Run-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub orders_processed: usize,
    pub orders_touched: usize,
    pub lines_created: usize,
    pub persistence_failures: usize,
    pub fields: BTreeMap<OrderField, usize>,
    pub line_fields: BTreeMap<LineField, usize>,
}

impl RunCounters {
    /// Count an order. Dry runs count would-apply decisions; otherwise only
    /// committed writes count.
    pub fn record(&mut self, order: &OrderReport) {
        self.orders_processed += 1;

        match order.persistence {
            PersistenceStatus::DryRun | PersistenceStatus::Committed => {}
            PersistenceStatus::NothingToWrite => return,
            PersistenceStatus::Failed { .. } => {
                self.persistence_failures += 1;
                return;
            }
        }

        if !order.has_writes() {
            return;
        }
        self.orders_touched += 1;
        self.lines_created += order.created_lines.len();
        for (field, _) in order.applied_fields() {
            *self.fields.entry(field).or_default() += 1;
        }
        for (_, field, _) in order.applied_line_fields() {
            *self.line_fields.entry(field).or_default() += 1;
        }
    }

    /// Total order and line fields counted.
    pub fn total_writes(&self) -> usize {
        self.fields.values().sum::<usize>() + self.line_fields.values().sum::<usize>()
    }
}

/// The report for one run. Write-once: built by the pipeline, then saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub allow_ocr_evidence: bool,
    pub orders: Vec<OrderReport>,
    pub counters: RunCounters,
}

/// One row of the flat summary: an applied value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub order_id: String,
    pub po_number: String,
    pub line_id: String,
    pub field: String,
    pub value: String,
    pub canonicalization: bool,
}

impl MappingReport {
    pub fn new(dry_run: bool, allow_ocr_evidence: bool, orders: Vec<OrderReport>) -> Self {
        let mut counters = RunCounters::default();
        for order in &orders {
            counters.record(order);
        }
        Self {
            generated_at: Utc::now(),
            dry_run,
            allow_ocr_evidence,
            orders,
            counters,
        }
    }

    /// Flat rows of every applied value, order fields first.
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        let mut rows = Vec::new();
        for order in &self.orders {
            for (field, report) in &order.fields {
                if let Decision::Apply {
                    value,
                    canonicalization,
                } = &report.decision
                {
                    rows.push(SummaryRow {
                        order_id: order.order_id.clone(),
                        po_number: order.po_number.clone(),
                        line_id: String::new(),
                        field: field.to_string(),
                        value: value.to_string(),
                        canonicalization: *canonicalization,
                    });
                }
            }
            for (line_id, field, value) in order.applied_line_fields() {
                rows.push(SummaryRow {
                    order_id: order.order_id.clone(),
                    po_number: order.po_number.clone(),
                    line_id: line_id.to_string(),
                    field: field.to_string(),
                    value: value.to_string(),
                    canonicalization: false,
                });
            }
            for line in &order.created_lines {
                rows.push(SummaryRow {
                    order_id: order.order_id.clone(),
                    po_number: order.po_number.clone(),
                    line_id: format!("new:{}", line.sku),
                    field: "units_ordered".to_string(),
                    value: line.units_ordered.to_string(),
                    canonicalization: false,
                });
            }
        }
        rows
    }

    /// Write the report as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
