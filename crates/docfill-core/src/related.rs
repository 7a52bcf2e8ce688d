//! Related-file discovery: documents on disk that belong to an order but
//! are not attached to it.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::models::document::DocumentType;
use crate::models::order::OrderSnapshot;

/// A file found for an order, with the document type guessed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedFile {
    pub path: PathBuf,
    pub doc_type: DocumentType,
}

/// Finds extra source files for an order.
pub trait RelatedFileFinder {
    fn find(&self, order: &OrderSnapshot) -> Vec<RelatedFile>;
}

/// Finds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelatedFiles;

impl RelatedFileFinder for NoRelatedFiles {
    fn find(&self, _order: &OrderSnapshot) -> Vec<RelatedFile> {
        Vec::new()
    }
}

/// File-name keywords, most specific first.
const NAME_KEYWORDS: [(&[&str], DocumentType); 7] = [
    (&["proforma", "pi", "quotation", "quote"], DocumentType::ProformaInvoice),
    (&["bl", "bol", "mbl", "hbl", "lading"], DocumentType::BillOfLading),
    (&["pl", "packing", "packinglist"], DocumentType::PackingList),
    (&["marks", "mark", "shippingmarks"], DocumentType::ShippingMarks),
    (&["customs", "entry", "mrn", "declaration", "c88"], DocumentType::CustomsDeclaration),
    (&["grn", "received", "receipt"], DocumentType::GoodsReceivedNote),
    (&["ci", "invoice", "inv"], DocumentType::CommercialInvoice),
];

/// Guess a document type from the words of a file name.
pub fn infer_document_type(path: &Path) -> Option<DocumentType> {
    let stem = path.file_stem()?.to_str()?.to_lowercase();
    let words: Vec<&str> = stem
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    NAME_KEYWORDS
        .iter()
        .find(|(keywords, _)| words.iter().any(|w| keywords.contains(w)))
        .map(|(_, doc_type)| *doc_type)
}

/// Scans a directory tree for files whose names contain the PO number.
#[derive(Debug, Clone)]
pub struct GlobRelatedFiles {
    root: PathBuf,
}

impl GlobRelatedFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RelatedFileFinder for GlobRelatedFiles {
    fn find(&self, order: &OrderSnapshot) -> Vec<RelatedFile> {
        let po = order.po_number.trim();
        if po.is_empty() {
            return Vec::new();
        }

        let pattern = self
            .root
            .join("**")
            .join(format!("*{}*", glob::Pattern::escape(po)));
        let Some(pattern) = pattern.to_str() else {
            return Vec::new();
        };

        let options = glob::MatchOptions {
            case_sensitive: false,
            ..glob::MatchOptions::new()
        };
        let entries = match glob::glob_with(pattern, options) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Invalid related-file pattern {}: {}", pattern, e);
                return Vec::new();
            }
        };

        let mut found: Vec<RelatedFile> = entries
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let doc_type = infer_document_type(&path);
                trace!("Related file {} -> {:?}", path.display(), doc_type);
                Some(RelatedFile {
                    doc_type: doc_type?,
                    path,
                })
            })
            .collect();
        found.sort_by(|a, b| a.path.cmp(&b.path));

        debug!("Found {} related files for {}", found.len(), po);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_infer_document_type() {
        assert_eq!(infer_document_type(Path::new("PO-4711_BL.pdf")), Some(DocumentType::BillOfLading));
        assert_eq!(infer_document_type(Path::new("PO-4711 Proforma Invoice.pdf")), Some(DocumentType::ProformaInvoice));
        assert_eq!(infer_document_type(Path::new("po4711-invoice.pdf")), Some(DocumentType::CommercialInvoice));
        assert_eq!(infer_document_type(Path::new("PO-4711 packing list.xlsx")), Some(DocumentType::PackingList));
        assert_eq!(infer_document_type(Path::new("PO-4711 table.pdf")), None);
    }

    #[test]
    fn test_glob_finds_files_by_po_number() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2024").join("march");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("PO-4711_BL.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("po-4711 marks.xlsx"), b"x").unwrap();
        std::fs::write(dir.path().join("PO-4711 photo.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("PO-9999_BL.pdf"), b"x").unwrap();

        let order = OrderSnapshot {
            id: "o1".into(),
            po_number: "PO-4711".into(),
            ..OrderSnapshot::default()
        };
        let found = GlobRelatedFiles::new(dir.path()).find(&order);

        let types: Vec<DocumentType> = found.iter().map(|f| f.doc_type).collect();
        assert_eq!(types.len(), 2);
        assert!(types.contains(&DocumentType::BillOfLading));
        assert!(types.contains(&DocumentType::ShippingMarks));
    }

    #[test]
    fn test_empty_po_number_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GlobRelatedFiles::new(dir.path()).find(&OrderSnapshot::default()).is_empty());
    }
}
