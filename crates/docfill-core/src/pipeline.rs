//! The backfill run: acquire, match, reconcile, decide, persist.
//!
//! Orders are processed one at a time and documents one at a time within
//! an order. Each order's evidence is gathered into a fresh accumulator,
//! reduced by [`plan_order`] into a report and an update, and the update is
//! handed to the store unless the run is a dry run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::acquire::TextAcquirer;
use crate::correlate::correlate;
use crate::decision::{Decision, decide, decide_value};
use crate::error::Result;
use crate::models::candidate::{Candidate, LineItemMatch, Provenance, ShippingMarkMatch};
use crate::models::config::{DocfillConfig, MatchingConfig, OcrPolicy, ReconcileConfig};
use crate::models::document::{DocumentType, ExtractionMethod, FileKind};
use crate::models::order::{
    FieldPolicy, FieldValue, FieldWrite, LineField, LineWrite, OrderField, OrderSnapshot,
    OrderUpdate,
};
use crate::ocr::{FallbackRasterizer, OcrBackend, PageRasterizer, TesseractCli};
use crate::reconcile::{CandidateStatus, Reconciler};
use crate::related::{GlobRelatedFiles, RelatedFileFinder};
use crate::report::{
    CandidateReport, DocumentReport, FieldReport, LineReport, MappingReport, OrderReport,
    PersistenceStatus,
};
use crate::rules::{matcher_set, references};
use crate::store::OrderStore;

/// Options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Do everything except the store write.
    pub dry_run: bool,
    /// Let optical-recognition candidates influence writes.
    pub allow_ocr_evidence: bool,
    /// OCR policy for page-based documents.
    pub ocr_policy: OcrPolicy,
    /// Only process these orders; all when empty.
    pub order_ids: Vec<String>,
    /// Stop after this many orders.
    pub limit: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            allow_ocr_evidence: false,
            ocr_policy: OcrPolicy::Auto,
            order_ids: Vec::new(),
            limit: None,
        }
    }
}

/// Candidates found in one or more documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentEvidence {
    pub fields: BTreeMap<OrderField, Vec<Candidate<FieldValue>>>,
    pub line_items: Vec<Candidate<LineItemMatch>>,
    pub shipping_marks: Vec<Candidate<ShippingMarkMatch>>,
    /// PO numbers the documents mention.
    pub po_references: BTreeSet<String>,
}

impl DocumentEvidence {
    pub fn candidate_count(&self) -> usize {
        self.fields.values().map(Vec::len).sum::<usize>()
            + self.line_items.len()
            + self.shipping_marks.len()
    }

    fn merge(&mut self, other: DocumentEvidence) {
        for (field, candidates) in other.fields {
            self.fields.entry(field).or_default().extend(candidates);
        }
        self.line_items.extend(other.line_items);
        self.shipping_marks.extend(other.shipping_marks);
        self.po_references.extend(other.po_references);
    }
}

/// Run every matcher registered for a document type over its text.
pub fn match_document(
    text: &str,
    doc_type: DocumentType,
    provenance: &Provenance,
    config: &MatchingConfig,
) -> DocumentEvidence {
    let set = matcher_set(doc_type);
    let tagged = |matcher: &str| Provenance {
        matcher: matcher.to_string(),
        ..provenance.clone()
    };

    let mut evidence = DocumentEvidence::default();
    for matcher in &set.fields {
        let found = matcher.run(text, config);
        if found.is_empty() {
            continue;
        }
        trace!("{} found {} candidates in {}", matcher.name, found.len(), provenance.source_path);
        evidence
            .fields
            .entry(matcher.field)
            .or_default()
            .extend(found.into_iter().map(|m| m.into_candidate(tagged(matcher.name))));
    }

    if let Some(line_items) = set.line_items {
        evidence.line_items = line_items(text)
            .into_iter()
            .map(|m| m.into_candidate(tagged("line_item")))
            .collect();
    }
    if let Some(shipping_marks) = set.shipping_marks {
        evidence.shipping_marks = shipping_marks(text, config)
            .into_iter()
            .map(|m| m.into_candidate(tagged("shipping_mark")))
            .collect();
    }
    evidence.po_references = references::po_references(text);

    evidence
}

/// Everything gathered for one order before reduction.
#[derive(Debug, Clone, Default)]
pub struct OrderEvidence {
    pub documents: Vec<DocumentReport>,
    pub evidence: DocumentEvidence,
    pub warnings: Vec<String>,
}

/// The outcome of reducing one order's evidence.
#[derive(Debug, Clone)]
pub struct OrderPlan {
    pub report: OrderReport,
    pub update: OrderUpdate,
}

/// Drop optical candidates unless they are allowed; returns how many went.
fn gate<T>(candidates: &mut Vec<Candidate<T>>, allow_optical: bool) -> usize {
    if allow_optical {
        return 0;
    }
    let before = candidates.len();
    candidates.retain(|c| !c.is_optical());
    before - candidates.len()
}

fn reference_key(reference: &str) -> String {
    reference
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Warn when documents only mention other purchase orders.
fn po_mismatch(po_number: &str, references: &BTreeSet<String>) -> Option<String> {
    let po = reference_key(po_number);
    if po.is_empty() || references.is_empty() {
        return None;
    }
    let matches = references.iter().map(|r| reference_key(r)).any(|r| {
        !r.is_empty() && (r == po || r.ends_with(&po) || po.ends_with(&r))
    });
    if matches {
        return None;
    }
    let found: Vec<&str> = references.iter().map(String::as_str).collect();
    Some(format!(
        "documents reference purchase order {} but the order is {}",
        found.join(", "),
        po_number
    ))
}

fn judged(candidates: Vec<Candidate<FieldValue>>, statuses: Vec<CandidateStatus>) -> Vec<CandidateReport> {
    candidates
        .into_iter()
        .zip(statuses)
        .map(|(candidate, status)| CandidateReport { candidate, status })
        .collect()
}

/// Reduce an order's evidence to decisions and the update that carries them.
///
/// Pure: nothing is read or written here.
pub fn plan_order(order: &OrderSnapshot, gathered: OrderEvidence, reconciler: &Reconciler) -> OrderPlan {
    let OrderEvidence {
        documents,
        evidence,
        mut warnings,
    } = gathered;
    let DocumentEvidence {
        mut fields,
        line_items: mut rows,
        shipping_marks: mut marks,
        po_references,
    } = evidence;
    let mut update = OrderUpdate::default();

    if let Some(warning) = po_mismatch(&order.po_number, &po_references) {
        warnings.push(warning);
    }

    let mut field_reports = BTreeMap::new();
    for field in OrderField::ALL {
        let candidates = fields.remove(&field).unwrap_or_default();
        let current = order.header.get(field);
        let reduction = reconciler.reduce(field.policy(), &candidates);
        let decision = decide(field, current.as_ref(), &reduction.outcome, reconciler.aliases());

        if let Decision::Apply {
            value,
            canonicalization,
        } = &decision
        {
            update.fields.push(FieldWrite {
                field,
                value: value.clone(),
                canonicalization: *canonicalization,
            });
        }
        field_reports.insert(
            field,
            FieldReport {
                current,
                candidates: judged(candidates, reduction.statuses),
                reduced: reduction.outcome,
                decision,
            },
        );
    }

    let allow_optical = reconciler.allows_ocr_evidence();
    let excluded = gate(&mut rows, allow_optical) + gate(&mut marks, allow_optical);
    if excluded > 0 {
        warnings.push(format!(
            "{} optical line candidates excluded; allow OCR evidence to use them",
            excluded
        ));
    }

    let correlation = correlate(&order.lines, &rows, &marks);
    warnings.extend(correlation.warnings);

    let mut line_reports = Vec::new();
    for (line, mut evidence) in order.lines.iter().zip(correlation.lines) {
        let mut reports = BTreeMap::new();
        for field in LineField::ALL {
            let candidates = evidence.fields.remove(&field).unwrap_or_default();
            let current = line.get(field);
            let reduction = reconciler.reduce(FieldPolicy::Plain, &candidates);
            let decision = decide_value(current.as_ref(), &reduction.outcome);
            if let Some(value) = decision.applied() {
                update.lines.push(LineWrite {
                    line_id: line.id.clone(),
                    field,
                    value: value.clone(),
                });
            }
            reports.insert(
                field,
                FieldReport {
                    current,
                    candidates: judged(candidates, reduction.statuses),
                    reduced: reduction.outcome,
                    decision,
                },
            );
        }
        line_reports.push(LineReport {
            line_id: line.id.clone(),
            sku: line.sku.clone(),
            fields: reports,
        });
    }

    let mut created_lines = Vec::new();
    if order.lines.is_empty() {
        for proposed in correlation.new_lines {
            debug!(
                "Proposing line {} x{} from {} sources",
                proposed.line.sku,
                proposed.line.units_ordered,
                proposed.sources.len()
            );
            update.new_lines.push(proposed.line.clone());
            created_lines.push(proposed.line);
        }
    }

    let persistence = if update.is_empty() {
        PersistenceStatus::NothingToWrite
    } else {
        PersistenceStatus::DryRun
    };

    OrderPlan {
        report: OrderReport {
            order_id: order.id.clone(),
            po_number: order.po_number.clone(),
            documents,
            fields: field_reports,
            lines: line_reports,
            created_lines,
            warnings,
            persistence,
        },
        update,
    }
}

/// One file to acquire, with what is known about it.
struct Source<'a> {
    path: &'a Path,
    kind: FileKind,
    doc_type: DocumentType,
    document_id: Option<String>,
    stage: Option<String>,
}

/// Text and candidates from a single file, outside any order.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentExtraction {
    pub source_path: String,
    pub document_type: DocumentType,
    pub method: ExtractionMethod,
    pub chars: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip)]
    pub text: String,
    #[serde(flatten)]
    pub evidence: DocumentEvidence,
}

/// Runs backfill over the orders of a store.
pub struct BackfillEngine<O, R> {
    acquirer: TextAcquirer<O, R>,
    matching: MatchingConfig,
    reconcile: ReconcileConfig,
    related: Option<Box<dyn RelatedFileFinder>>,
}

impl BackfillEngine<TesseractCli, FallbackRasterizer> {
    /// Engine backed by the external OCR tools and, when a root is
    /// configured, a related-file scan.
    pub fn from_config(config: &DocfillConfig) -> Self {
        let engine = Self::new(TextAcquirer::from_config(&config.acquisition), config);
        match &config.related.root {
            Some(root) => engine.with_related(GlobRelatedFiles::new(root)),
            None => engine,
        }
    }
}

impl<O: OcrBackend, R: PageRasterizer> BackfillEngine<O, R> {
    pub fn new(acquirer: TextAcquirer<O, R>, config: &DocfillConfig) -> Self {
        Self {
            acquirer,
            matching: config.matching.clone(),
            reconcile: config.reconcile.clone(),
            related: None,
        }
    }

    /// Also scan for files related to each order.
    pub fn with_related(mut self, finder: impl RelatedFileFinder + 'static) -> Self {
        self.related = Some(Box::new(finder));
        self
    }

    /// Acquire and match a single file.
    pub fn extract(&self, path: &Path, doc_type: DocumentType, policy: OcrPolicy) -> DocumentExtraction {
        let kind = FileKind::detect(path, None);
        let extracted = self.acquirer.acquire(path, kind, policy);
        let provenance = Provenance {
            source_path: path.display().to_string(),
            method: extracted.method,
            document_id: None,
            document_type: Some(doc_type),
            document_stage: None,
            matcher: String::new(),
        };
        let evidence = if extracted.is_empty() {
            DocumentEvidence::default()
        } else {
            match_document(&extracted.text, doc_type, &provenance, &self.matching)
        };

        DocumentExtraction {
            source_path: provenance.source_path,
            document_type: doc_type,
            method: extracted.method,
            chars: extracted.text.chars().count(),
            errors: extracted.errors,
            text: extracted.text,
            evidence,
        }
    }

    /// Run over every selected order.
    pub fn run<S: OrderStore + ?Sized>(&self, store: &mut S, options: &RunOptions) -> Result<MappingReport> {
        self.run_with_progress(store, options, |_, _, _| {})
    }

    /// Run, reporting each finished order as `(index, total, report)`.
    pub fn run_with_progress<S, F>(
        &self,
        store: &mut S,
        options: &RunOptions,
        mut on_order: F,
    ) -> Result<MappingReport>
    where
        S: OrderStore + ?Sized,
        F: FnMut(usize, usize, &OrderReport),
    {
        let start = Instant::now();
        let orders: Vec<OrderSnapshot> = store
            .load_orders()?
            .into_iter()
            .filter(|o| options.order_ids.is_empty() || options.order_ids.contains(&o.id))
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();

        let mut reconcile = self.reconcile.clone();
        reconcile.allow_ocr_evidence |= options.allow_ocr_evidence;
        let reconciler = Reconciler::new(&reconcile);

        info!(
            "Processing {} orders ({}, OCR evidence {})",
            orders.len(),
            if options.dry_run { "dry run" } else { "apply" },
            if reconciler.allows_ocr_evidence() { "allowed" } else { "excluded" }
        );

        let total = orders.len();
        let mut reports = Vec::with_capacity(total);
        for (index, order) in orders.iter().enumerate() {
            let report = self.process_order(order, store, options, &reconciler);
            on_order(index, total, &report);
            reports.push(report);
        }

        let report = MappingReport::new(options.dry_run, reconciler.allows_ocr_evidence(), reports);
        info!(
            "Run finished in {:?}: {} orders touched, {} field writes",
            start.elapsed(),
            report.counters.orders_touched,
            report.counters.total_writes()
        );
        Ok(report)
    }

    fn process_order<S: OrderStore + ?Sized>(
        &self,
        order: &OrderSnapshot,
        store: &mut S,
        options: &RunOptions,
        reconciler: &Reconciler,
    ) -> OrderReport {
        let gathered = self.gather(order, options.ocr_policy);
        let OrderPlan { mut report, update } = plan_order(order, gathered, reconciler);

        if update.is_empty() || options.dry_run {
            debug!(
                "Order {}: {} fields, {} line fields, {} new lines proposed",
                order.id,
                update.fields.len(),
                update.lines.len(),
                update.new_lines.len()
            );
            return report;
        }

        match store.apply(&order.id, &update) {
            Ok(()) => {
                info!(
                    "Order {}: committed {} fields, {} line fields, {} new lines",
                    order.id,
                    update.fields.len(),
                    update.lines.len(),
                    update.new_lines.len()
                );
                report.persistence = PersistenceStatus::Committed;
            }
            Err(e) => {
                warn!("Order {}: write rejected: {}", order.id, e);
                report.warnings.push(format!("write rejected: {}", e));
                report.persistence = PersistenceStatus::Failed {
                    error: e.to_string(),
                };
            }
        }
        report
    }

    /// Acquire and match every document of an order, plus related files.
    pub fn gather(&self, order: &OrderSnapshot, policy: OcrPolicy) -> OrderEvidence {
        let mut gathered = OrderEvidence::default();
        let mut seen: BTreeSet<PathBuf> = BTreeSet::new();

        for document in &order.documents {
            let Some(path) = document.resolved_path() else {
                let message = format!("document {} has no resolved file path", document.id);
                warn!("Order {}: {}", order.id, message);
                gathered.documents.push(DocumentReport {
                    document_id: Some(document.id.clone()),
                    document_type: document.doc_type,
                    source_path: None,
                    method: None,
                    chars: 0,
                    errors: vec![message.clone()],
                });
                gathered.warnings.push(message);
                continue;
            };

            seen.insert(path.clone());
            self.collect(
                &mut gathered,
                Source {
                    path: &path,
                    kind: FileKind::detect(&path, document.content_type.as_deref()),
                    doc_type: document.doc_type,
                    document_id: Some(document.id.clone()),
                    stage: document.stage.clone(),
                },
                policy,
            );
        }

        if let Some(finder) = &self.related {
            for file in finder.find(order) {
                if !seen.insert(file.path.clone()) {
                    continue;
                }
                self.collect(
                    &mut gathered,
                    Source {
                        path: &file.path,
                        kind: FileKind::detect(&file.path, None),
                        doc_type: file.doc_type,
                        document_id: None,
                        stage: None,
                    },
                    policy,
                );
            }
        }

        debug!(
            "Order {}: {} documents, {} candidates",
            order.id,
            gathered.documents.len(),
            gathered.evidence.candidate_count()
        );
        gathered
    }

    fn collect(&self, gathered: &mut OrderEvidence, source: Source<'_>, policy: OcrPolicy) {
        let extracted = self.acquirer.acquire(source.path, source.kind, policy);
        let label = source
            .document_id
            .clone()
            .unwrap_or_else(|| source.path.display().to_string());
        gathered
            .warnings
            .extend(extracted.errors.iter().map(|e| format!("{}: {}", label, e)));

        let provenance = Provenance {
            source_path: source.path.display().to_string(),
            method: extracted.method,
            document_id: source.document_id,
            document_type: Some(source.doc_type),
            document_stage: source.stage,
            matcher: String::new(),
        };

        if !extracted.is_empty() {
            let evidence = match_document(&extracted.text, source.doc_type, &provenance, &self.matching);
            gathered.evidence.merge(evidence);
        }

        gathered.documents.push(DocumentReport {
            document_id: provenance.document_id,
            document_type: source.doc_type,
            source_path: Some(provenance.source_path),
            method: Some(extracted.method),
            chars: extracted.text.chars().count(),
            errors: extracted.errors,
        });
    }
}
