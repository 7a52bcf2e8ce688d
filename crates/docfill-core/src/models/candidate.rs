//! Extraction candidates and their provenance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::document::{DocumentType, ExtractionMethod};

/// Where a candidate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Path of the file the text was acquired from.
    pub source_path: String,

    /// How the text was obtained.
    pub method: ExtractionMethod,

    /// Originating document; `None` for files found by a related-file scan.
    pub document_id: Option<String>,

    /// Document type the matcher was selected for.
    pub document_type: Option<DocumentType>,

    /// Workflow stage of the originating document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_stage: Option<String>,

    /// Name of the matcher that produced the candidate.
    pub matcher: String,
}

/// One proposed value for a field, before reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate<T> {
    /// Typed value.
    pub value: T,

    /// Raw matched substring.
    pub raw: String,

    /// Surrounding line(s).
    pub context: String,

    /// Provenance.
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl<T> Candidate<T> {
    /// Whether this candidate came from optical recognition.
    pub fn is_optical(&self) -> bool {
        self.provenance.method == ExtractionMethod::OpticalRecognition
    }
}

/// A matcher hit before provenance is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch<T> {
    pub value: T,
    pub raw: String,
    pub context: String,
}

impl<T> FieldMatch<T> {
    pub fn new(value: T, raw: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            value,
            raw: raw.into(),
            context: context.into(),
        }
    }

    /// Convert the value, keeping the matched text.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldMatch<U> {
        FieldMatch {
            value: f(self.value),
            raw: self.raw,
            context: self.context,
        }
    }

    /// Attach provenance.
    pub fn into_candidate(self, provenance: Provenance) -> Candidate<T> {
        Candidate {
            value: self.value,
            raw: self.raw,
            context: self.context,
            provenance,
        }
    }
}

/// A priced row from a PI/PO/invoice table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemMatch {
    /// Normalized SKU code.
    pub sku: Option<String>,
    /// Item number column, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_number: Option<String>,
    pub units_ordered: i64,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_per_carton: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cartons: Option<i64>,
}

/// Carton dimensions in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartonDimensions {
    pub length_cm: Decimal,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
}

/// Attributes found in one shipping-mark block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMarkMatch {
    /// Normalized SKU from the anchor line.
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cartons: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_per_carton: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commodity_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_weight_kg: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_weight_kg: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<CartonDimensions>,
}
