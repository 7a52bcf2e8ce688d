//! Line-item correlation.
//!
//! Priced rows are matched to existing order lines by units ordered, then
//! by item number. Shipping-mark attributes are matched by normalized SKU.
//! When an order has no lines, coherent shipping-mark evidence may propose
//! new ones.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::candidate::{Candidate, LineItemMatch, Provenance, ShippingMarkMatch};
use crate::models::order::{FieldValue, LineField, NewOrderLine, OrderLine};
use crate::reconcile::{Reduced, reduce};
use crate::rules::normalize_sku;

/// Per-field candidates for one existing order line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineEvidence {
    pub line_id: String,
    pub fields: BTreeMap<LineField, Vec<Candidate<FieldValue>>>,
}

impl LineEvidence {
    fn push(&mut self, field: LineField, candidate: Candidate<FieldValue>) {
        self.fields.entry(field).or_default().push(candidate);
    }
}

/// A line proposed for an order without lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedLine {
    pub line: NewOrderLine,
    pub sources: Vec<Provenance>,
}

/// Everything the correlator found for one order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correlation {
    /// One entry per existing order line, in order.
    pub lines: Vec<LineEvidence>,
    pub new_lines: Vec<ProposedLine>,
    pub warnings: Vec<String>,
}

/// Candidate re-labelled for one line field.
fn derive<T>(source: &Candidate<T>, value: FieldValue, matcher: &str) -> Candidate<FieldValue> {
    Candidate {
        value,
        raw: source.raw.clone(),
        context: source.context.clone(),
        provenance: Provenance {
            matcher: matcher.to_string(),
            ..source.provenance.clone()
        },
    }
}

/// Cost lookup keyed by units ordered or item number.
#[derive(Debug)]
struct CostTables<'a> {
    by_units: BTreeMap<i64, Vec<&'a Candidate<LineItemMatch>>>,
    by_item: BTreeMap<String, Vec<&'a Candidate<LineItemMatch>>>,
}

fn cost_of(item: &LineItemMatch) -> (Option<Decimal>, Option<Decimal>) {
    (
        item.unit_cost.map(|d| d.normalize()),
        item.total_cost.map(|d| d.normalize()),
    )
}

fn conflicting_keys<K: Ord + Clone>(
    table: &BTreeMap<K, Vec<&Candidate<LineItemMatch>>>,
) -> BTreeSet<K> {
    table
        .iter()
        .filter(|(_, rows)| {
            rows.iter()
                .map(|c| cost_of(&c.value))
                .collect::<BTreeSet<_>>()
                .len()
                > 1
        })
        .map(|(k, _)| k.clone())
        .collect()
}

impl<'a> CostTables<'a> {
    /// Build both tables; a key whose rows disagree on cost is dropped,
    /// and every row under it leaves both tables.
    fn build(rows: &'a [Candidate<LineItemMatch>], warnings: &mut Vec<String>) -> Self {
        let mut by_units: BTreeMap<i64, Vec<&Candidate<LineItemMatch>>> = BTreeMap::new();
        let mut by_item: BTreeMap<String, Vec<&Candidate<LineItemMatch>>> = BTreeMap::new();
        for row in rows {
            by_units.entry(row.value.units_ordered).or_default().push(row);
            if let Some(item) = &row.value.item_number {
                by_item.entry(item.to_uppercase()).or_default().push(row);
            }
        }

        let bad_units = conflicting_keys(&by_units);
        let bad_items = conflicting_keys(&by_item);
        for units in &bad_units {
            warnings.push(format!("line items disagree on cost for quantity {}", units));
        }
        for item in &bad_items {
            warnings.push(format!("line items disagree on cost for item number {}", item));
        }

        let tainted = |row: &Candidate<LineItemMatch>| {
            bad_units.contains(&row.value.units_ordered)
                || row
                    .value
                    .item_number
                    .as_ref()
                    .is_some_and(|i| bad_items.contains(&i.to_uppercase()))
        };

        for table_rows in by_units.values_mut().chain(by_item.values_mut()) {
            table_rows.retain(|row| !tainted(*row));
        }
        by_units.retain(|_, rows| !rows.is_empty());
        by_item.retain(|_, rows| !rows.is_empty());

        Self { by_units, by_item }
    }
}

/// Product number to line id, from shipping marks and the lines themselves.
/// A product number pointing at two lines is dropped.
fn product_number_map(lines: &[OrderLine], marks: &[Candidate<ShippingMarkMatch>]) -> BTreeMap<String, String> {
    let mut targets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for line in lines {
        if let Some(item) = line.item_number.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            targets.entry(item.to_uppercase()).or_default().insert(line.id.clone());
        }
    }

    for mark in marks {
        let Some(product) = &mark.value.product_number else {
            continue;
        };
        for line in lines.iter().filter(|l| normalize_sku(&l.sku) == mark.value.sku) {
            targets.entry(product.to_uppercase()).or_default().insert(line.id.clone());
        }
    }

    targets
        .into_iter()
        .filter_map(|(product, ids)| match reduce(ids) {
            Reduced::Unique(id) => Some((product, id)),
            _ => None,
        })
        .collect()
}

fn attach_row(evidence: &mut LineEvidence, row: &Candidate<LineItemMatch>, matcher: &str) {
    let item = &row.value;
    if let Some(cost) = item.unit_cost {
        evidence.push(LineField::UnitCost, derive(row, FieldValue::Number(cost.normalize()), matcher));
    }
    if let Some(cost) = item.total_cost {
        evidence.push(LineField::TotalCost, derive(row, FieldValue::Number(cost.normalize()), matcher));
    }
    if let Some(upc) = item.units_per_carton {
        evidence.push(LineField::UnitsPerCarton, derive(row, FieldValue::Count(upc), matcher));
    }
    if let Some(cartons) = item.cartons {
        evidence.push(LineField::Cartons, derive(row, FieldValue::Count(cartons), matcher));
    }
}

/// Field values carried by one shipping-mark block.
fn mark_values(mark: &ShippingMarkMatch) -> Vec<(LineField, FieldValue)> {
    let mut values = Vec::new();
    if let Some(n) = mark.units_per_carton {
        values.push((LineField::UnitsPerCarton, FieldValue::Count(n)));
    }
    if let Some(n) = mark.cartons {
        values.push((LineField::Cartons, FieldValue::Count(n)));
    }
    if let Some(dims) = &mark.dimensions {
        values.push((LineField::CartonLengthCm, FieldValue::Number(dims.length_cm)));
        values.push((LineField::CartonWidthCm, FieldValue::Number(dims.width_cm)));
        values.push((LineField::CartonHeightCm, FieldValue::Number(dims.height_cm)));
    }
    if let Some(w) = mark.net_weight_kg {
        values.push((LineField::CartonNetWeightKg, FieldValue::Number(w.normalize())));
    }
    if let Some(w) = mark.gross_weight_kg {
        values.push((LineField::CartonGrossWeightKg, FieldValue::Number(w.normalize())));
    }
    if let Some(code) = &mark.commodity_code {
        values.push((LineField::CommodityCode, FieldValue::Text(code.clone())));
    }
    if let Some(origin) = &mark.country_of_origin {
        values.push((LineField::CountryOfOrigin, FieldValue::Text(origin.clone())));
    }
    values
}

/// Correlate line evidence with an order's lines.
///
/// Callers pass only candidates that passed method gating.
pub fn correlate(
    lines: &[OrderLine],
    rows: &[Candidate<LineItemMatch>],
    marks: &[Candidate<ShippingMarkMatch>],
) -> Correlation {
    let mut warnings = Vec::new();
    let tables = CostTables::build(rows, &mut warnings);
    let products = product_number_map(lines, marks);

    // Quantities shared by several lines cannot pick one of them.
    let mut units_seen: BTreeMap<i64, usize> = BTreeMap::new();
    for units in lines.iter().filter_map(|l| l.units_ordered) {
        *units_seen.entry(units).or_default() += 1;
    }

    let mut evidence = Vec::with_capacity(lines.len());
    for line in lines {
        let mut found = LineEvidence {
            line_id: line.id.clone(),
            fields: BTreeMap::new(),
        };

        let by_units = line
            .units_ordered
            .filter(|u| units_seen.get(u) == Some(&1))
            .and_then(|u| tables.by_units.get(&u));

        if let Some(matched) = by_units {
            for row in matched {
                attach_row(&mut found, row, "line_item_by_units");
            }
        } else {
            for (item, matched) in &tables.by_item {
                if products.get(item) == Some(&line.id) {
                    for row in matched {
                        attach_row(&mut found, row, "line_item_by_item_number");
                    }
                }
            }
        }

        let sku = normalize_sku(&line.sku);
        for mark in marks.iter().filter(|m| m.value.sku == sku) {
            for (field, value) in mark_values(&mark.value) {
                found.push(field, derive(mark, value, "shipping_mark"));
            }
        }

        debug!(
            line = %line.id,
            fields = found.fields.len(),
            "Correlated line evidence"
        );
        evidence.push(found);
    }

    let new_lines = if lines.is_empty() {
        propose_lines(marks, &tables, &mut warnings)
    } else {
        Vec::new()
    };

    Correlation {
        lines: evidence,
        new_lines,
        warnings,
    }
}

/// New lines from shipping marks, one per SKU with a coherent carton pair.
fn propose_lines(
    marks: &[Candidate<ShippingMarkMatch>],
    tables: &CostTables<'_>,
    warnings: &mut Vec<String>,
) -> Vec<ProposedLine> {
    let mut by_sku: BTreeMap<&str, Vec<&Candidate<ShippingMarkMatch>>> = BTreeMap::new();
    for mark in marks {
        by_sku.entry(mark.value.sku.as_str()).or_default().push(mark);
    }

    let mut proposed = Vec::new();
    for (sku, group) in by_sku {
        let pairs = group
            .iter()
            .filter_map(|m| Some((m.value.units_per_carton?, m.value.cartons?)));
        let (upc, cartons) = match reduce(pairs) {
            Reduced::Unique(pair) => pair,
            Reduced::None => continue,
            Reduced::Ambiguous(_) => {
                warnings.push(format!("conflicting carton counts for new line {}", sku));
                continue;
            }
        };
        let Some(units_ordered) = upc.checked_mul(cartons).filter(|u| *u > 0) else {
            continue;
        };

        let mut per_field: BTreeMap<LineField, Vec<FieldValue>> = BTreeMap::new();
        for mark in &group {
            for (field, value) in mark_values(&mark.value) {
                per_field.entry(field).or_default().push(value);
            }
        }
        if let Some(rows) = tables.by_units.get(&units_ordered) {
            for row in rows {
                if let Some(cost) = row.value.unit_cost {
                    per_field.entry(LineField::UnitCost).or_default().push(FieldValue::Number(cost.normalize()));
                }
                if let Some(cost) = row.value.total_cost {
                    per_field.entry(LineField::TotalCost).or_default().push(FieldValue::Number(cost.normalize()));
                }
            }
        }

        let values: BTreeMap<LineField, FieldValue> = per_field
            .into_iter()
            .filter_map(|(field, values)| match reduce(values) {
                Reduced::Unique(v) => Some((field, v)),
                _ => None,
            })
            .collect();

        let item_number = match reduce(group.iter().filter_map(|m| m.value.product_number.clone())) {
            Reduced::Unique(n) => Some(n),
            _ => None,
        };

        debug!(sku, units_ordered, "Proposing new line");
        proposed.push(ProposedLine {
            line: NewOrderLine {
                sku: sku.to_string(),
                units_ordered,
                item_number,
                values,
            },
            sources: group.iter().map(|m| m.provenance.clone()).collect(),
        });
    }

    proposed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::CartonDimensions;
    use crate::models::document::{DocumentType, ExtractionMethod};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn provenance(doc_type: DocumentType) -> Provenance {
        Provenance {
            source_path: "doc".into(),
            method: ExtractionMethod::NativeText,
            document_id: Some("d1".into()),
            document_type: Some(doc_type),
            document_stage: None,
            matcher: "test".into(),
        }
    }

    fn row(sku: &str, item: Option<&str>, units: i64, unit: &str, total: &str) -> Candidate<LineItemMatch> {
        Candidate {
            value: LineItemMatch {
                sku: Some(sku.into()),
                item_number: item.map(str::to_string),
                units_ordered: units,
                unit_cost: Some(dec(unit)),
                total_cost: Some(dec(total)),
                units_per_carton: None,
                cartons: None,
            },
            raw: sku.into(),
            context: sku.into(),
            provenance: provenance(DocumentType::ProformaInvoice),
        }
    }

    fn mark(value: ShippingMarkMatch) -> Candidate<ShippingMarkMatch> {
        Candidate {
            raw: value.sku.clone(),
            context: value.sku.clone(),
            value,
            provenance: provenance(DocumentType::ShippingMarks),
        }
    }

    fn line(id: &str, sku: &str, units: Option<i64>) -> OrderLine {
        OrderLine {
            id: id.into(),
            sku: sku.into(),
            units_ordered: units,
            ..OrderLine::default()
        }
    }

    fn values(evidence: &LineEvidence, field: LineField) -> Vec<FieldValue> {
        evidence
            .fields
            .get(&field)
            .map(|c| c.iter().map(|c| c.value.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_cost_by_units_ordered() {
        let lines = vec![line("l1", "BT-1001", Some(1200)), line("l2", "BT-1002", Some(240))];
        let rows = vec![
            row("BT-1001", None, 1200, "3.20", "3840.00"),
            row("BT-1002", None, 240, "4.50", "1080.00"),
        ];

        let found = correlate(&lines, &rows, &[]);
        assert_eq!(values(&found.lines[0], LineField::UnitCost), vec![FieldValue::Number(dec("3.2"))]);
        assert_eq!(values(&found.lines[1], LineField::TotalCost), vec![FieldValue::Number(dec("1080"))]);
        assert!(found.warnings.is_empty());
    }

    #[test]
    fn test_conflicting_key_leaves_both_tables() {
        let lines = vec![line("l1", "BT-1001", Some(1200))];
        let rows = vec![
            row("BT-1001", Some("7"), 1200, "3.20", "3840.00"),
            row("BT-1001", Some("7"), 1200, "3.10", "3720.00"),
        ];

        let found = correlate(&lines, &rows, &[]);
        assert!(found.lines[0].fields.is_empty());
        assert_eq!(found.warnings.len(), 2);
    }

    #[test]
    fn test_item_number_fallback_through_shipping_marks() {
        let lines = vec![line("l1", "BT-1001", None)];
        let rows = vec![row("BT-1001", Some("1001"), 600, "2.00", "1200.00")];
        let marks = vec![mark(ShippingMarkMatch {
            sku: "BT-1001".into(),
            product_number: Some("1001".into()),
            ..ShippingMarkMatch::default()
        })];

        let found = correlate(&lines, &rows, &marks);
        let costs = &found.lines[0].fields[&LineField::UnitCost];
        assert_eq!(costs[0].value, FieldValue::Number(dec("2")));
        assert_eq!(costs[0].provenance.matcher, "line_item_by_item_number");
    }

    #[test]
    fn test_shared_quantity_does_not_pick_a_line() {
        let lines = vec![line("l1", "A-1", Some(100)), line("l2", "B-2", Some(100))];
        let rows = vec![row("A-1", None, 100, "1.00", "100.00")];

        let found = correlate(&lines, &rows, &[]);
        assert!(found.lines.iter().all(|l| l.fields.is_empty()));
    }

    #[test]
    fn test_marks_attach_by_normalized_sku() {
        let lines = vec![line("l1", "bt-1001-sea", Some(1200))];
        let marks = vec![mark(ShippingMarkMatch {
            sku: "BT-1001".into(),
            cartons: Some(50),
            commodity_code: Some("95030075".into()),
            dimensions: Some(CartonDimensions {
                length_cm: dec("50"),
                width_cm: dec("40"),
                height_cm: dec("30"),
            }),
            ..ShippingMarkMatch::default()
        })];

        let found = correlate(&lines, &[], &marks);
        assert_eq!(values(&found.lines[0], LineField::Cartons), vec![FieldValue::Count(50)]);
        assert_eq!(
            values(&found.lines[0], LineField::CartonHeightCm),
            vec![FieldValue::Number(dec("30"))]
        );
        assert!(found.new_lines.is_empty());
    }

    #[test]
    fn test_new_line_from_marks_when_order_has_none() {
        let marks = vec![mark(ShippingMarkMatch {
            sku: "BT-1001".into(),
            product_number: Some("1001".into()),
            units_per_carton: Some(24),
            cartons: Some(50),
            country_of_origin: Some("CHINA".into()),
            ..ShippingMarkMatch::default()
        })];
        let rows = vec![row("BT-1001", None, 1200, "3.20", "3840.00")];

        let found = correlate(&[], &rows, &marks);
        assert_eq!(found.new_lines.len(), 1);

        let new_line = &found.new_lines[0].line;
        assert_eq!(new_line.sku, "BT-1001");
        assert_eq!(new_line.units_ordered, 1200);
        assert_eq!(new_line.item_number.as_deref(), Some("1001"));
        assert_eq!(new_line.values[&LineField::UnitCost], FieldValue::Number(dec("3.2")));
        assert_eq!(
            new_line.values[&LineField::CountryOfOrigin],
            FieldValue::Text("CHINA".into())
        );
    }

    #[test]
    fn test_incoherent_marks_propose_nothing() {
        let marks = vec![
            mark(ShippingMarkMatch {
                sku: "BT-1001".into(),
                units_per_carton: Some(24),
                cartons: Some(50),
                ..ShippingMarkMatch::default()
            }),
            mark(ShippingMarkMatch {
                sku: "BT-1001".into(),
                units_per_carton: Some(12),
                cartons: Some(50),
                ..ShippingMarkMatch::default()
            }),
            mark(ShippingMarkMatch {
                sku: "BT-1002".into(),
                cartons: Some(10),
                ..ShippingMarkMatch::default()
            }),
        ];

        let found = correlate(&[], &[], &marks);
        assert!(found.new_lines.is_empty());
        assert_eq!(found.warnings.len(), 1);
    }
}
