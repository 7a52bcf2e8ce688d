//! Order snapshot, backfill target fields and the update proposed to the store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::document::SourceDocument;

/// A typed value for a target field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Number(Decimal),
    Count(i64),
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used by the measurement outlier rule.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(d) => Some(*d),
            FieldValue::Count(n) => Some(Decimal::from(*n)),
            _ => None,
        }
    }

    /// Whether a stored value counts as empty.
    ///
    /// Text is empty when blank or a single placeholder character such as
    /// `-` or `.`; dates and numbers are never blank once present.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => {
                let s = s.trim();
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (None, _) => true,
                    (Some(c), None) => !c.is_alphanumeric(),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Number(d) => write!(f, "{}", d.normalize()),
            FieldValue::Count(n) => write!(f, "{}", n),
        }
    }
}

/// Whether an optional current value should be treated as empty.
pub fn is_empty_value(value: Option<&FieldValue>) -> bool {
    value.is_none_or(FieldValue::is_blank)
}

/// How candidates for a field are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Exact-value deduplication.
    Plain,
    /// Reference-number plausibility filter before deduplication.
    Reference,
    /// Numeric outlier rule (largest value wins when it dominates).
    Measurement,
    /// Supplier alias canonicalization before deduplication.
    Counterparty,
}

/// Order-level backfill targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    ProformaInvoiceNumber,
    CommercialInvoiceNumber,
    InvoiceDate,
    BillOfLadingNumber,
    ContainerNumber,
    CustomsReference,
    CustomsClearanceDate,
    Vessel,
    Voyage,
    PortOfLoading,
    PortOfDischarge,
    ActualDeparture,
    EstimatedArrival,
    GoodsReceivedDate,
    ReceiveType,
    GrossWeightKg,
    NetWeightKg,
    VolumeCbm,
    TotalCartons,
    SupplierName,
    SupplierAddress,
}

impl OrderField {
    pub const ALL: [OrderField; 21] = [
        OrderField::ProformaInvoiceNumber,
        OrderField::CommercialInvoiceNumber,
        OrderField::InvoiceDate,
        OrderField::BillOfLadingNumber,
        OrderField::ContainerNumber,
        OrderField::CustomsReference,
        OrderField::CustomsClearanceDate,
        OrderField::Vessel,
        OrderField::Voyage,
        OrderField::PortOfLoading,
        OrderField::PortOfDischarge,
        OrderField::ActualDeparture,
        OrderField::EstimatedArrival,
        OrderField::GoodsReceivedDate,
        OrderField::ReceiveType,
        OrderField::GrossWeightKg,
        OrderField::NetWeightKg,
        OrderField::VolumeCbm,
        OrderField::TotalCartons,
        OrderField::SupplierName,
        OrderField::SupplierAddress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderField::ProformaInvoiceNumber => "proforma_invoice_number",
            OrderField::CommercialInvoiceNumber => "commercial_invoice_number",
            OrderField::InvoiceDate => "invoice_date",
            OrderField::BillOfLadingNumber => "bill_of_lading_number",
            OrderField::ContainerNumber => "container_number",
            OrderField::CustomsReference => "customs_reference",
            OrderField::CustomsClearanceDate => "customs_clearance_date",
            OrderField::Vessel => "vessel",
            OrderField::Voyage => "voyage",
            OrderField::PortOfLoading => "port_of_loading",
            OrderField::PortOfDischarge => "port_of_discharge",
            OrderField::ActualDeparture => "actual_departure",
            OrderField::EstimatedArrival => "estimated_arrival",
            OrderField::GoodsReceivedDate => "goods_received_date",
            OrderField::ReceiveType => "receive_type",
            OrderField::GrossWeightKg => "gross_weight_kg",
            OrderField::NetWeightKg => "net_weight_kg",
            OrderField::VolumeCbm => "volume_cbm",
            OrderField::TotalCartons => "total_cartons",
            OrderField::SupplierName => "supplier_name",
            OrderField::SupplierAddress => "supplier_address",
        }
    }

    /// Reconciliation policy for this field.
    pub fn policy(&self) -> FieldPolicy {
        match self {
            OrderField::ProformaInvoiceNumber => FieldPolicy::Reference,
            OrderField::GrossWeightKg | OrderField::NetWeightKg | OrderField::VolumeCbm => {
                FieldPolicy::Measurement
            }
            OrderField::SupplierName => FieldPolicy::Counterparty,
            _ => FieldPolicy::Plain,
        }
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currently persisted order-level fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderHeader {
    pub proforma_invoice_number: Option<String>,
    pub commercial_invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub bill_of_lading_number: Option<String>,
    pub container_number: Option<String>,
    pub customs_reference: Option<String>,
    pub customs_clearance_date: Option<NaiveDate>,
    pub vessel: Option<String>,
    pub voyage: Option<String>,
    pub port_of_loading: Option<String>,
    pub port_of_discharge: Option<String>,
    pub actual_departure: Option<NaiveDate>,
    pub estimated_arrival: Option<NaiveDate>,
    pub goods_received_date: Option<NaiveDate>,
    pub receive_type: Option<String>,
    pub gross_weight_kg: Option<Decimal>,
    pub net_weight_kg: Option<Decimal>,
    pub volume_cbm: Option<Decimal>,
    pub total_cartons: Option<i64>,
    pub supplier_name: Option<String>,
    pub supplier_address: Option<String>,
}

impl OrderHeader {
    /// Current value of a field.
    pub fn get(&self, field: OrderField) -> Option<FieldValue> {
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);
        let date = |v: &Option<NaiveDate>| v.map(FieldValue::Date);
        let number = |v: &Option<Decimal>| v.map(FieldValue::Number);

        match field {
            OrderField::ProformaInvoiceNumber => text(&self.proforma_invoice_number),
            OrderField::CommercialInvoiceNumber => text(&self.commercial_invoice_number),
            OrderField::InvoiceDate => date(&self.invoice_date),
            OrderField::BillOfLadingNumber => text(&self.bill_of_lading_number),
            OrderField::ContainerNumber => text(&self.container_number),
            OrderField::CustomsReference => text(&self.customs_reference),
            OrderField::CustomsClearanceDate => date(&self.customs_clearance_date),
            OrderField::Vessel => text(&self.vessel),
            OrderField::Voyage => text(&self.voyage),
            OrderField::PortOfLoading => text(&self.port_of_loading),
            OrderField::PortOfDischarge => text(&self.port_of_discharge),
            OrderField::ActualDeparture => date(&self.actual_departure),
            OrderField::EstimatedArrival => date(&self.estimated_arrival),
            OrderField::GoodsReceivedDate => date(&self.goods_received_date),
            OrderField::ReceiveType => text(&self.receive_type),
            OrderField::GrossWeightKg => number(&self.gross_weight_kg),
            OrderField::NetWeightKg => number(&self.net_weight_kg),
            OrderField::VolumeCbm => number(&self.volume_cbm),
            OrderField::TotalCartons => self.total_cartons.map(FieldValue::Count),
            OrderField::SupplierName => text(&self.supplier_name),
            OrderField::SupplierAddress => text(&self.supplier_address),
        }
    }

    /// Store a value; returns false when the value type does not fit the field.
    pub fn set(&mut self, field: OrderField, value: FieldValue) -> bool {
        use FieldValue::*;

        match (field, value) {
            (OrderField::ProformaInvoiceNumber, Text(v)) => self.proforma_invoice_number = Some(v),
            (OrderField::CommercialInvoiceNumber, Text(v)) => {
                self.commercial_invoice_number = Some(v)
            }
            (OrderField::InvoiceDate, Date(v)) => self.invoice_date = Some(v),
            (OrderField::BillOfLadingNumber, Text(v)) => self.bill_of_lading_number = Some(v),
            (OrderField::ContainerNumber, Text(v)) => self.container_number = Some(v),
            (OrderField::CustomsReference, Text(v)) => self.customs_reference = Some(v),
            (OrderField::CustomsClearanceDate, Date(v)) => self.customs_clearance_date = Some(v),
            (OrderField::Vessel, Text(v)) => self.vessel = Some(v),
            (OrderField::Voyage, Text(v)) => self.voyage = Some(v),
            (OrderField::PortOfLoading, Text(v)) => self.port_of_loading = Some(v),
            (OrderField::PortOfDischarge, Text(v)) => self.port_of_discharge = Some(v),
            (OrderField::ActualDeparture, Date(v)) => self.actual_departure = Some(v),
            (OrderField::EstimatedArrival, Date(v)) => self.estimated_arrival = Some(v),
            (OrderField::GoodsReceivedDate, Date(v)) => self.goods_received_date = Some(v),
            (OrderField::ReceiveType, Text(v)) => self.receive_type = Some(v),
            (OrderField::GrossWeightKg, Number(v)) => self.gross_weight_kg = Some(v),
            (OrderField::NetWeightKg, Number(v)) => self.net_weight_kg = Some(v),
            (OrderField::VolumeCbm, Number(v)) => self.volume_cbm = Some(v),
            (OrderField::TotalCartons, Count(v)) => self.total_cartons = Some(v),
            (OrderField::SupplierName, Text(v)) => self.supplier_name = Some(v),
            (OrderField::SupplierAddress, Text(v)) => self.supplier_address = Some(v),
            _ => return false,
        }
        true
    }
}

/// Per-line backfill targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineField {
    UnitCost,
    TotalCost,
    UnitsPerCarton,
    Cartons,
    CartonLengthCm,
    CartonWidthCm,
    CartonHeightCm,
    CartonNetWeightKg,
    CartonGrossWeightKg,
    CommodityCode,
    CountryOfOrigin,
}

impl LineField {
    pub const ALL: [LineField; 11] = [
        LineField::UnitCost,
        LineField::TotalCost,
        LineField::UnitsPerCarton,
        LineField::Cartons,
        LineField::CartonLengthCm,
        LineField::CartonWidthCm,
        LineField::CartonHeightCm,
        LineField::CartonNetWeightKg,
        LineField::CartonGrossWeightKg,
        LineField::CommodityCode,
        LineField::CountryOfOrigin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineField::UnitCost => "unit_cost",
            LineField::TotalCost => "total_cost",
            LineField::UnitsPerCarton => "units_per_carton",
            LineField::Cartons => "cartons",
            LineField::CartonLengthCm => "carton_length_cm",
            LineField::CartonWidthCm => "carton_width_cm",
            LineField::CartonHeightCm => "carton_height_cm",
            LineField::CartonNetWeightKg => "carton_net_weight_kg",
            LineField::CartonGrossWeightKg => "carton_gross_weight_kg",
            LineField::CommodityCode => "commodity_code",
            LineField::CountryOfOrigin => "country_of_origin",
        }
    }
}

impl fmt::Display for LineField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted order line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLine {
    pub id: String,
    pub sku: String,
    pub item_number: Option<String>,
    pub units_ordered: Option<i64>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub units_per_carton: Option<i64>,
    pub cartons: Option<i64>,
    pub carton_length_cm: Option<Decimal>,
    pub carton_width_cm: Option<Decimal>,
    pub carton_height_cm: Option<Decimal>,
    pub carton_net_weight_kg: Option<Decimal>,
    pub carton_gross_weight_kg: Option<Decimal>,
    pub commodity_code: Option<String>,
    pub country_of_origin: Option<String>,
}

impl OrderLine {
    pub fn get(&self, field: LineField) -> Option<FieldValue> {
        let number = |v: &Option<Decimal>| v.map(FieldValue::Number);
        let count = |v: &Option<i64>| v.map(FieldValue::Count);
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);

        match field {
            LineField::UnitCost => number(&self.unit_cost),
            LineField::TotalCost => number(&self.total_cost),
            LineField::UnitsPerCarton => count(&self.units_per_carton),
            LineField::Cartons => count(&self.cartons),
            LineField::CartonLengthCm => number(&self.carton_length_cm),
            LineField::CartonWidthCm => number(&self.carton_width_cm),
            LineField::CartonHeightCm => number(&self.carton_height_cm),
            LineField::CartonNetWeightKg => number(&self.carton_net_weight_kg),
            LineField::CartonGrossWeightKg => number(&self.carton_gross_weight_kg),
            LineField::CommodityCode => text(&self.commodity_code),
            LineField::CountryOfOrigin => text(&self.country_of_origin),
        }
    }

    pub fn set(&mut self, field: LineField, value: FieldValue) -> bool {
        use FieldValue::*;

        match (field, value) {
            (LineField::UnitCost, Number(v)) => self.unit_cost = Some(v),
            (LineField::TotalCost, Number(v)) => self.total_cost = Some(v),
            (LineField::UnitsPerCarton, Count(v)) => self.units_per_carton = Some(v),
            (LineField::Cartons, Count(v)) => self.cartons = Some(v),
            (LineField::CartonLengthCm, Number(v)) => self.carton_length_cm = Some(v),
            (LineField::CartonWidthCm, Number(v)) => self.carton_width_cm = Some(v),
            (LineField::CartonHeightCm, Number(v)) => self.carton_height_cm = Some(v),
            (LineField::CartonNetWeightKg, Number(v)) => self.carton_net_weight_kg = Some(v),
            (LineField::CartonGrossWeightKg, Number(v)) => self.carton_gross_weight_kg = Some(v),
            (LineField::CommodityCode, Text(v)) => self.commodity_code = Some(v),
            (LineField::CountryOfOrigin, Text(v)) => self.country_of_origin = Some(v),
            _ => return false,
        }
        true
    }
}

/// The subset of an order relevant to backfill, read once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    /// Order identity.
    pub id: String,

    /// Purchase order number.
    #[serde(default)]
    pub po_number: String,

    /// Order-level target fields.
    #[serde(default)]
    pub header: OrderHeader,

    /// Existing order lines.
    #[serde(default)]
    pub lines: Vec<OrderLine>,

    /// Attached source documents.
    #[serde(default)]
    pub documents: Vec<SourceDocument>,
}

/// One order-level write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWrite {
    pub field: OrderField,
    pub value: FieldValue,
    /// Rewrites an existing supplier name to its canonical spelling.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub canonicalization: bool,
}

/// One write to an existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineWrite {
    pub line_id: String,
    pub field: LineField,
    pub value: FieldValue,
}

/// A line proposed for an order that has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub sku: String,
    pub units_ordered: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_number: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<LineField, FieldValue>,
}

/// Everything the core asks the store to persist for one order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldWrite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineWrite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_lines: Vec<NewOrderLine>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.lines.is_empty() && self.new_lines.is_empty()
    }
}
