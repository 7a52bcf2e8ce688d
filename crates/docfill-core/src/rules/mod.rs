//! Rule-based field matchers for shipping and trade documents.
//!
//! Every matcher is a pure function from text to zero or more
//! [`FieldMatch`]es. [`matcher_set`] maps a document type to the ordered
//! matchers that apply to it.

pub mod classify;
pub mod counterparty;
pub mod dates;
pub mod line_items;
pub mod numbers;
pub mod patterns;
pub mod references;
pub mod shipping_marks;
pub mod transport;

pub use classify::ReceiveType;
pub use dates::parse_unambiguous_date;
pub use line_items::normalize_sku;
pub use numbers::parse_number;
pub use references::validate_container_number;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::candidate::{FieldMatch, LineItemMatch, ShippingMarkMatch};
use crate::models::config::MatchingConfig;
use crate::models::document::DocumentType;
use crate::models::order::{FieldValue, OrderField};

/// Signature shared by every field matcher.
pub type FieldMatchFn = fn(&str, &MatchingConfig) -> Vec<FieldMatch<FieldValue>>;

/// Line-item row matcher.
pub type LineItemFn = fn(&str) -> Vec<FieldMatch<LineItemMatch>>;

/// Shipping-mark block matcher.
pub type ShippingMarkFn = fn(&str, &MatchingConfig) -> Vec<FieldMatch<ShippingMarkMatch>>;

/// One field matcher bound to its target field.
#[derive(Clone, Copy)]
pub struct FieldMatcher {
    /// Stable name recorded in candidate provenance.
    pub name: &'static str,
    pub field: OrderField,
    pub extract: FieldMatchFn,
}

impl FieldMatcher {
    const fn new(name: &'static str, field: OrderField, extract: FieldMatchFn) -> Self {
        Self {
            name,
            field,
            extract,
        }
    }

    pub fn run(&self, text: &str, config: &MatchingConfig) -> Vec<FieldMatch<FieldValue>> {
        (self.extract)(text, config)
    }
}

impl std::fmt::Debug for FieldMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldMatcher")
            .field("name", &self.name)
            .field("field", &self.field)
            .finish()
    }
}

/// Matchers that apply to one document type.
#[derive(Debug, Clone, Default)]
pub struct MatcherSet {
    pub fields: Vec<FieldMatcher>,
    pub line_items: Option<LineItemFn>,
    pub shipping_marks: Option<ShippingMarkFn>,
}

fn as_texts(matches: Vec<FieldMatch<String>>) -> Vec<FieldMatch<FieldValue>> {
    matches.into_iter().map(|m| m.map(FieldValue::Text)).collect()
}

fn as_dates(matches: Vec<FieldMatch<NaiveDate>>) -> Vec<FieldMatch<FieldValue>> {
    matches.into_iter().map(|m| m.map(FieldValue::Date)).collect()
}

fn as_numbers(matches: Vec<FieldMatch<Decimal>>) -> Vec<FieldMatch<FieldValue>> {
    matches.into_iter().map(|m| m.map(FieldValue::Number)).collect()
}

fn as_counts(matches: Vec<FieldMatch<i64>>) -> Vec<FieldMatch<FieldValue>> {
    matches.into_iter().map(|m| m.map(FieldValue::Count)).collect()
}

const BOL_NUMBER: FieldMatcher =
    FieldMatcher::new("bill_of_lading_number", OrderField::BillOfLadingNumber, |t, c| {
        as_texts(references::bill_of_lading_number(t, c.bol_header_scan_lines))
    });

const CONTAINER: FieldMatcher =
    FieldMatcher::new("container_number", OrderField::ContainerNumber, |t, _| {
        as_texts(references::container_number(t))
    });

const VESSEL: FieldMatcher =
    FieldMatcher::new("vessel", OrderField::Vessel, |t, _| as_texts(transport::vessel(t)));

const VOYAGE: FieldMatcher =
    FieldMatcher::new("voyage", OrderField::Voyage, |t, _| as_texts(transport::voyage(t)));

const PORT_OF_LOADING: FieldMatcher =
    FieldMatcher::new("port_of_loading", OrderField::PortOfLoading, |t, c| {
        as_texts(transport::port_of_loading(t, c.port_max_len))
    });

const PORT_OF_DISCHARGE: FieldMatcher =
    FieldMatcher::new("port_of_discharge", OrderField::PortOfDischarge, |t, c| {
        as_texts(transport::port_of_discharge(t, c.port_max_len))
    });

const SHIPPED_ON_BOARD: FieldMatcher =
    FieldMatcher::new("shipped_on_board", OrderField::ActualDeparture, |t, _| {
        as_dates(dates::shipped_on_board(t))
    });

const ETA: FieldMatcher =
    FieldMatcher::new("estimated_arrival", OrderField::EstimatedArrival, |t, _| {
        as_dates(dates::estimated_arrival(t))
    });

const RECEIVE_TYPE: FieldMatcher =
    FieldMatcher::new("receive_type", OrderField::ReceiveType, |t, _| {
        classify::receive_type(t)
            .into_iter()
            .map(|m| m.map(|kind| FieldValue::Text(kind.as_code().to_string())))
            .collect()
    });

const GROSS_WEIGHT: FieldMatcher =
    FieldMatcher::new("gross_weight", OrderField::GrossWeightKg, |t, _| {
        as_numbers(numbers::gross_weight(t))
    });

const NET_WEIGHT: FieldMatcher =
    FieldMatcher::new("net_weight", OrderField::NetWeightKg, |t, _| {
        as_numbers(numbers::net_weight(t))
    });

const VOLUME: FieldMatcher =
    FieldMatcher::new("volume", OrderField::VolumeCbm, |t, _| as_numbers(numbers::volume(t)));

const TOTAL_CARTONS: FieldMatcher =
    FieldMatcher::new("total_cartons", OrderField::TotalCartons, |t, _| {
        as_counts(numbers::total_cartons(t))
    });

const INVOICE_NUMBER: FieldMatcher = FieldMatcher::new(
    "commercial_invoice_number",
    OrderField::CommercialInvoiceNumber,
    |t, _| as_texts(references::commercial_invoice_number(t)),
);

const INVOICE_DATE: FieldMatcher =
    FieldMatcher::new("invoice_date", OrderField::InvoiceDate, |t, _| {
        as_dates(dates::invoice_date(t))
    });

const SUPPLIER_NAME: FieldMatcher =
    FieldMatcher::new("supplier_name", OrderField::SupplierName, |t, c| {
        as_texts(counterparty::supplier_name(
            t,
            c.counterparty_header_lines,
            c.address_max_lines,
        ))
    });

const SUPPLIER_ADDRESS: FieldMatcher =
    FieldMatcher::new("supplier_address", OrderField::SupplierAddress, |t, c| {
        as_texts(counterparty::supplier_address(
            t,
            c.counterparty_header_lines,
            c.address_max_lines,
        ))
    });

const CUSTOMS_REFERENCE: FieldMatcher =
    FieldMatcher::new("customs_reference", OrderField::CustomsReference, |t, _| {
        as_texts(references::customs_reference(t))
    });

const CLEARANCE_DATE: FieldMatcher =
    FieldMatcher::new("clearance_date", OrderField::CustomsClearanceDate, |t, _| {
        as_dates(dates::clearance_date(t))
    });

const PROFORMA_NUMBER: FieldMatcher = FieldMatcher::new(
    "proforma_invoice_number",
    OrderField::ProformaInvoiceNumber,
    |t, _| as_texts(references::proforma_invoice_number(t)),
);

const RECEIVED_DATE: FieldMatcher =
    FieldMatcher::new("received_date", OrderField::GoodsReceivedDate, |t, _| {
        as_dates(dates::received_date(t))
    });

fn marks(text: &str, config: &MatchingConfig) -> Vec<FieldMatch<ShippingMarkMatch>> {
    shipping_marks::shipping_marks(text, config.mark_window_before, config.mark_window_after)
}

/// Matchers for a document type, in priority order.
pub fn matcher_set(doc_type: DocumentType) -> MatcherSet {
    match doc_type {
        DocumentType::BillOfLading => MatcherSet {
            fields: vec![
                BOL_NUMBER,
                CONTAINER,
                VESSEL,
                VOYAGE,
                PORT_OF_LOADING,
                PORT_OF_DISCHARGE,
                SHIPPED_ON_BOARD,
                ETA,
                RECEIVE_TYPE,
                GROSS_WEIGHT,
                VOLUME,
                TOTAL_CARTONS,
            ],
            ..MatcherSet::default()
        },
        DocumentType::CommercialInvoice => MatcherSet {
            fields: vec![
                INVOICE_NUMBER,
                INVOICE_DATE,
                SUPPLIER_NAME,
                SUPPLIER_ADDRESS,
                GROSS_WEIGHT,
                NET_WEIGHT,
            ],
            line_items: Some(line_items::line_items),
            shipping_marks: None,
        },
        DocumentType::PackingList => MatcherSet {
            fields: vec![GROSS_WEIGHT, NET_WEIGHT, VOLUME, TOTAL_CARTONS],
            line_items: None,
            shipping_marks: Some(marks),
        },
        DocumentType::CustomsDeclaration => MatcherSet {
            fields: vec![CUSTOMS_REFERENCE, CLEARANCE_DATE, GROSS_WEIGHT, CONTAINER],
            ..MatcherSet::default()
        },
        DocumentType::ProformaInvoice => MatcherSet {
            fields: vec![PROFORMA_NUMBER, SUPPLIER_NAME, SUPPLIER_ADDRESS],
            line_items: Some(line_items::line_items),
            shipping_marks: None,
        },
        DocumentType::ShippingMarks => MatcherSet {
            fields: Vec::new(),
            line_items: None,
            shipping_marks: Some(marks),
        },
        DocumentType::GoodsReceivedNote => MatcherSet {
            fields: vec![RECEIVED_DATE, TOTAL_CARTONS],
            ..MatcherSet::default()
        },
        DocumentType::PurchaseOrderPdf => MatcherSet {
            fields: vec![SUPPLIER_NAME, SUPPLIER_ADDRESS],
            line_items: Some(line_items::line_items),
            shipping_marks: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_document_type_has_matchers() {
        for doc_type in DocumentType::ALL {
            let set = matcher_set(doc_type);
            assert!(
                !set.fields.is_empty() || set.line_items.is_some() || set.shipping_marks.is_some(),
                "{doc_type} has no matchers"
            );
        }
    }

    #[test]
    fn test_bill_of_lading_departure() {
        let set = matcher_set(DocumentType::BillOfLading);
        let config = MatchingConfig::default();
        let matcher = set
            .fields
            .iter()
            .find(|m| m.field == OrderField::ActualDeparture)
            .unwrap();

        let found = matcher.run("SHIPPED ON BOARD 12-MAR-2024", &config);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 12).unwrap())
        );
    }

    #[test]
    fn test_receive_type_is_stored_as_code() {
        let found = RECEIVE_TYPE.run("1 X 40HC", &MatchingConfig::default());
        assert_eq!(found[0].value, FieldValue::Text("40HC".into()));
    }

    #[test]
    fn test_fields_are_unique_per_type() {
        for doc_type in DocumentType::ALL {
            let set = matcher_set(doc_type);
            let mut fields: Vec<OrderField> = set.fields.iter().map(|m| m.field).collect();
            let before = fields.len();
            fields.sort();
            fields.dedup();
            assert_eq!(fields.len(), before, "{doc_type} repeats a field");
        }
    }
}
