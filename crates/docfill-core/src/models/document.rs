//! Source documents attached to an order and the text acquired from them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Metadata keys that may carry a resolved file path, in lookup order.
const PATH_METADATA_KEYS: [&str; 3] = ["resolved_path", "file_path", "path"];

/// Closed set of document types attached to purchase orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Bill of lading issued by the carrier.
    BillOfLading,
    /// Commercial invoice from the supplier.
    CommercialInvoice,
    /// Packing list.
    PackingList,
    /// Customs declaration / entry.
    CustomsDeclaration,
    /// Proforma invoice (also used for quotations).
    ProformaInvoice,
    /// Shipping-mark sheet with per-SKU carton attributes.
    ShippingMarks,
    /// Goods-received note from the warehouse.
    GoodsReceivedNote,
    /// The purchase order itself, as a PDF.
    PurchaseOrderPdf,
}

impl DocumentType {
    /// All document types.
    pub const ALL: [DocumentType; 8] = [
        DocumentType::BillOfLading,
        DocumentType::CommercialInvoice,
        DocumentType::PackingList,
        DocumentType::CustomsDeclaration,
        DocumentType::ProformaInvoice,
        DocumentType::ShippingMarks,
        DocumentType::GoodsReceivedNote,
        DocumentType::PurchaseOrderPdf,
    ];

    /// Stable snake_case tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BillOfLading => "bill_of_lading",
            DocumentType::CommercialInvoice => "commercial_invoice",
            DocumentType::PackingList => "packing_list",
            DocumentType::CustomsDeclaration => "customs_declaration",
            DocumentType::ProformaInvoice => "proforma_invoice",
            DocumentType::ShippingMarks => "shipping_marks",
            DocumentType::GoodsReceivedNote => "goods_received_note",
            DocumentType::PurchaseOrderPdf => "purchase_order_pdf",
        }
    }

    /// Parse a tag or a common abbreviation.
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase().replace(['-', ' '], "_");
        match s.as_str() {
            "bill_of_lading" | "bol" | "bl" => Some(DocumentType::BillOfLading),
            "commercial_invoice" | "ci" | "invoice" => Some(DocumentType::CommercialInvoice),
            "packing_list" | "pl" => Some(DocumentType::PackingList),
            "customs_declaration" | "customs" | "entry" => Some(DocumentType::CustomsDeclaration),
            "proforma_invoice" | "pi" | "proforma" | "quotation" => {
                Some(DocumentType::ProformaInvoice)
            }
            "shipping_marks" | "shipping_mark" | "marks" => Some(DocumentType::ShippingMarks),
            "goods_received_note" | "grn" => Some(DocumentType::GoodsReceivedNote),
            "purchase_order_pdf" | "purchase_order" | "po" => Some(DocumentType::PurchaseOrderPdf),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document attached to an order. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Document identity in the order store.
    pub id: String,

    /// Document type.
    pub doc_type: DocumentType,

    /// Original file name.
    pub file_name: String,

    /// MIME content type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Size in bytes.
    #[serde(default)]
    pub byte_size: u64,

    /// Workflow stage of the document (draft, final, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    /// Free-form metadata; may carry a resolved source path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SourceDocument {
    /// Resolved path to the document file, taken from metadata.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        PATH_METADATA_KEYS.iter().find_map(|key| {
            self.metadata
                .get(*key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        })
    }
}

/// How the text of a document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Text embedded in the document (PDF text layer, plain text).
    NativeText,
    /// Image-based optical character recognition.
    OpticalRecognition,
    /// Cell values from a spreadsheet or delimited file.
    StructuredText,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::NativeText => "native-text",
            ExtractionMethod::OpticalRecognition => "optical-recognition",
            ExtractionMethod::StructuredText => "structured-text",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text acquired from one document during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Extracted text, possibly empty.
    pub text: String,
    /// How the text was obtained.
    pub method: ExtractionMethod,
    /// Non-fatal problems met along the way.
    pub errors: Vec<String>,
}

impl ExtractedText {
    /// Empty result carrying a single error.
    pub fn failed(method: ExtractionMethod, error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            method,
            errors: vec![error.into()],
        }
    }

    /// Whether there is any usable evidence.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Physical file format, which selects the acquisition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Image,
    Spreadsheet,
    Delimited,
    PlainText,
    Unsupported,
}

impl FileKind {
    /// Detect from content type, falling back to the file extension.
    pub fn detect(path: &Path, content_type: Option<&str>) -> Self {
        if let Some(kind) = content_type.and_then(Self::from_content_type) {
            return kind;
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "pdf" => FileKind::Pdf,
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => FileKind::Image,
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => FileKind::Spreadsheet,
            "csv" | "tsv" => FileKind::Delimited,
            "txt" | "text" | "eml" => FileKind::PlainText,
            _ => FileKind::Unsupported,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.trim().to_lowercase();
        let ct = ct.split(';').next().unwrap_or("").trim();

        match ct {
            "application/pdf" => Some(FileKind::Pdf),
            "text/csv" | "text/tab-separated-values" => Some(FileKind::Delimited),
            "text/plain" => Some(FileKind::PlainText),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel"
            | "application/vnd.oasis.opendocument.spreadsheet" => Some(FileKind::Spreadsheet),
            _ if ct.starts_with("image/") => Some(FileKind::Image),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::detect(Path::new("a/BL.PDF"), None), FileKind::Pdf);
        assert_eq!(FileKind::detect(Path::new("marks.xlsx"), None), FileKind::Spreadsheet);
        assert_eq!(FileKind::detect(Path::new("scan.jpeg"), None), FileKind::Image);
        assert_eq!(FileKind::detect(Path::new("notes"), None), FileKind::Unsupported);
    }

    #[test]
    fn test_content_type_wins_over_extension() {
        assert_eq!(
            FileKind::detect(Path::new("upload.bin"), Some("application/pdf")),
            FileKind::Pdf
        );
        assert_eq!(
            FileKind::detect(Path::new("upload.bin"), Some("image/png")),
            FileKind::Image
        );
        // Unknown content types fall through to the extension.
        assert_eq!(
            FileKind::detect(Path::new("list.csv"), Some("application/octet-stream")),
            FileKind::Delimited
        );
    }

    #[test]
    fn test_resolved_path_lookup_order() {
        let mut doc = SourceDocument {
            id: "d1".to_string(),
            doc_type: DocumentType::BillOfLading,
            file_name: "bl.pdf".to_string(),
            content_type: None,
            byte_size: 0,
            stage: None,
            metadata: BTreeMap::new(),
        };
        assert_eq!(doc.resolved_path(), None);

        doc.metadata.insert("path".into(), serde_json::json!("/tmp/b.pdf"));
        doc.metadata.insert("resolved_path".into(), serde_json::json!("/tmp/a.pdf"));
        assert_eq!(doc.resolved_path(), Some(PathBuf::from("/tmp/a.pdf")));
    }

    #[test]
    fn test_document_type_parsing() {
        assert_eq!(DocumentType::from_str("B/L".replace('/', "").as_str()), Some(DocumentType::BillOfLading));
        assert_eq!(DocumentType::from_str("packing-list"), Some(DocumentType::PackingList));
        assert_eq!(DocumentType::from_str("Quotation"), Some(DocumentType::ProformaInvoice));
        assert_eq!(DocumentType::from_str("unknown"), None);
    }
}
