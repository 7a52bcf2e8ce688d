//! Text acquisition: turns a source file into matchable text.
//!
//! Acquisition never fails. Every problem along the way becomes a warning
//! in [`ExtractedText::errors`] and whatever text was obtained is returned,
//! possibly empty.

use std::path::Path;

use tracing::{debug, warn};

use crate::models::config::{AcquisitionConfig, OcrPolicy};
use crate::models::document::{ExtractedText, ExtractionMethod, FileKind};
use crate::ocr::{FallbackRasterizer, OcrBackend, PageRasterizer, TesseractCli};
use crate::pdf::{PdfExtractor, PdfProcessor};
use crate::sheets;

/// Converts documents into text using native extraction and OCR.
pub struct TextAcquirer<O, R> {
    ocr: O,
    rasterizer: R,
    config: AcquisitionConfig,
}

impl TextAcquirer<TesseractCli, FallbackRasterizer> {
    /// Acquirer backed by the external tools named in the config.
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(
            TesseractCli::from_config(config),
            FallbackRasterizer::from_config(config),
            config.clone(),
        )
    }
}

impl<O: OcrBackend, R: PageRasterizer> TextAcquirer<O, R> {
    pub fn new(ocr: O, rasterizer: R, config: AcquisitionConfig) -> Self {
        Self {
            ocr,
            rasterizer,
            config,
        }
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Acquire the text of one file.
    pub fn acquire(&self, path: &Path, kind: FileKind, policy: OcrPolicy) -> ExtractedText {
        if !path.is_file() {
            let result = ExtractedText::failed(
                ExtractionMethod::NativeText,
                format!("source file not found: {}", path.display()),
            );
            warn!("{}", result.errors[0]);
            return result;
        }

        let result = match kind {
            FileKind::Pdf => self.acquire_pdf(path, policy),
            FileKind::Image => self.acquire_image(path, policy),
            FileKind::Spreadsheet => structured(sheets::spreadsheet_text(path)),
            FileKind::Delimited => structured(sheets::delimited_text(path)),
            FileKind::PlainText => match std::fs::read(path) {
                Ok(bytes) => ExtractedText {
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                    method: ExtractionMethod::NativeText,
                    errors: Vec::new(),
                },
                Err(e) => ExtractedText::failed(
                    ExtractionMethod::NativeText,
                    format!("failed to read {}: {}", path.display(), e),
                ),
            },
            FileKind::Unsupported => ExtractedText::failed(
                ExtractionMethod::NativeText,
                format!("unsupported file type: {}", path.display()),
            ),
        };

        for error in &result.errors {
            warn!("{}: {}", path.display(), error);
        }
        debug!(
            "Acquired {} chars from {} via {}",
            result.text.chars().count(),
            path.display(),
            result.method
        );
        result
    }

    fn acquire_pdf(&self, path: &Path, policy: OcrPolicy) -> ExtractedText {
        let mut errors = Vec::new();

        let native = match PdfExtractor::open(path).and_then(|pdf| pdf.extract_text()) {
            Ok(text) => text,
            Err(e) => {
                errors.push(format!("native text extraction failed: {}", e));
                String::new()
            }
        };

        let native_chars = native.trim().chars().count();
        let run_ocr = match policy {
            OcrPolicy::Always => true,
            OcrPolicy::Auto => native_chars < self.config.min_native_chars,
            OcrPolicy::Never => false,
        };

        if run_ocr {
            debug!(
                "Running OCR on {} ({} native chars, policy {})",
                path.display(),
                native_chars,
                policy
            );
            let ocr_text = self.ocr_pdf(path, &mut errors);
            if !ocr_text.trim().is_empty() {
                return ExtractedText {
                    text: ocr_text,
                    method: ExtractionMethod::OpticalRecognition,
                    errors,
                };
            }
            errors.push("OCR produced no text; keeping native text".to_string());
        }

        ExtractedText {
            text: native,
            method: ExtractionMethod::NativeText,
            errors,
        }
    }

    /// Rasterize the first pages and concatenate what OCR recognizes.
    fn ocr_pdf(&self, path: &Path, errors: &mut Vec<String>) -> String {
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                errors.push(format!("failed to create scratch directory: {}", e));
                return String::new();
            }
        };

        let pages =
            match self
                .rasterizer
                .rasterize(path, self.config.max_ocr_pages, scratch.path())
            {
                Ok(pages) => pages,
                Err(e) => {
                    errors.push(format!("rasterization failed: {}", e));
                    return String::new();
                }
            };

        let mut texts = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            match self.ocr.recognize(page) {
                Ok(text) if !text.trim().is_empty() => texts.push(text),
                Ok(_) => debug!("OCR found no text on page {}", index + 1),
                Err(e) => errors.push(format!("OCR failed on page {}: {}", index + 1, e)),
            }
        }

        texts.join("\n\n")
    }

    fn acquire_image(&self, path: &Path, policy: OcrPolicy) -> ExtractedText {
        if policy == OcrPolicy::Never {
            return ExtractedText::failed(
                ExtractionMethod::OpticalRecognition,
                "OCR disabled; image has no text layer",
            );
        }

        match self.ocr.recognize(path) {
            Ok(text) => ExtractedText {
                text,
                method: ExtractionMethod::OpticalRecognition,
                errors: Vec::new(),
            },
            Err(e) => ExtractedText::failed(
                ExtractionMethod::OpticalRecognition,
                format!("OCR failed: {}", e),
            ),
        }
    }
}

fn structured(result: crate::error::Result<String>) -> ExtractedText {
    match result {
        Ok(text) => ExtractedText {
            text,
            method: ExtractionMethod::StructuredText,
            errors: Vec::new(),
        },
        Err(e) => ExtractedText::failed(ExtractionMethod::StructuredText, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::path::PathBuf;

    /// Returns fixed text and counts how often it was asked.
    struct FakeOcr {
        text: &'static str,
        calls: Cell<usize>,
    }

    impl FakeOcr {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                calls: Cell::new(0),
            }
        }
    }

    impl OcrBackend for FakeOcr {
        fn recognize(&self, _image: &Path) -> Result<String, OcrError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.text.to_string())
        }
    }

    /// Pretends to render a fixed number of pages.
    struct FakeRasterizer {
        pages: usize,
    }

    impl PageRasterizer for FakeRasterizer {
        fn rasterize(
            &self,
            _pdf: &Path,
            max_pages: usize,
            out_dir: &Path,
        ) -> Result<Vec<PathBuf>, OcrError> {
            Ok((1..=self.pages.min(max_pages))
                .map(|n| out_dir.join(format!("page-{n}.png")))
                .collect())
        }
    }

    struct BrokenRasterizer;

    impl PageRasterizer for BrokenRasterizer {
        fn rasterize(&self, _: &Path, _: usize, _: &Path) -> Result<Vec<PathBuf>, OcrError> {
            Err(OcrError::ToolUnavailable("pdftoppm".into()))
        }
    }

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_plain_text_is_native() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bl.txt", b"SHIPPED ON BOARD 12-MAR-2024");
        let acquirer = TextAcquirer::new(FakeOcr::new(""), FakeRasterizer { pages: 1 }, AcquisitionConfig::default());

        let result = acquirer.acquire(&path, FileKind::PlainText, OcrPolicy::Auto);
        assert_eq!(result.text, "SHIPPED ON BOARD 12-MAR-2024");
        assert_eq!(result.method, ExtractionMethod::NativeText);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_missing_file_is_a_warning() {
        let acquirer = TextAcquirer::new(FakeOcr::new("x"), FakeRasterizer { pages: 1 }, AcquisitionConfig::default());
        let result = acquirer.acquire(Path::new("/nonexistent/bl.pdf"), FileKind::Pdf, OcrPolicy::Auto);
        assert!(result.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(acquirer.ocr.calls.get(), 0);
    }

    #[test]
    fn test_unreadable_pdf_falls_back_to_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "scan.pdf", b"%PDF-1.4 garbage");
        let acquirer = TextAcquirer::new(
            FakeOcr::new("B/L NO: MEDU1234567"),
            FakeRasterizer { pages: 3 },
            AcquisitionConfig::default(),
        );

        let result = acquirer.acquire(&path, FileKind::Pdf, OcrPolicy::Auto);
        assert_eq!(result.method, ExtractionMethod::OpticalRecognition);
        assert_eq!(
            result.text,
            "B/L NO: MEDU1234567\n\nB/L NO: MEDU1234567\n\nB/L NO: MEDU1234567"
        );
        assert_eq!(acquirer.ocr.calls.get(), 3);
        // The native failure is still reported.
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_pdf_that_breaks_text_extraction_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = crate::pdf::one_page_pdf(b"BT /F9 12 Tf 72 720 Td (SHIPPED ON BOARD) Tj ET", None);
        let path = write(dir.path(), "bl.pdf", &pdf);
        let acquirer = TextAcquirer::new(FakeOcr::new("x"), FakeRasterizer { pages: 1 }, AcquisitionConfig::default());

        let result = acquirer.acquire(&path, FileKind::Pdf, OcrPolicy::Never);
        assert_eq!(result.method, ExtractionMethod::NativeText);
        assert!(result.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("native text extraction failed"));
    }

    #[test]
    fn test_ocr_page_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "scan.pdf", b"not a pdf");
        let config = AcquisitionConfig {
            max_ocr_pages: 2,
            ..AcquisitionConfig::default()
        };
        let acquirer = TextAcquirer::new(FakeOcr::new("text"), FakeRasterizer { pages: 5 }, config);

        acquirer.acquire(&path, FileKind::Pdf, OcrPolicy::Always);
        assert_eq!(acquirer.ocr.calls.get(), 2);
    }

    #[test]
    fn test_never_policy_skips_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write(dir.path(), "scan.pdf", b"not a pdf");
        let png = write(dir.path(), "scan.png", b"fake");
        let acquirer = TextAcquirer::new(FakeOcr::new("text"), FakeRasterizer { pages: 1 }, AcquisitionConfig::default());

        let result = acquirer.acquire(&pdf, FileKind::Pdf, OcrPolicy::Never);
        assert_eq!(result.method, ExtractionMethod::NativeText);
        assert!(result.is_empty());

        let result = acquirer.acquire(&png, FileKind::Image, OcrPolicy::Never);
        assert_eq!(result.method, ExtractionMethod::OpticalRecognition);
        assert!(result.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(acquirer.ocr.calls.get(), 0);
    }

    #[test]
    fn test_empty_ocr_keeps_native_method() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "scan.pdf", b"not a pdf");
        let acquirer = TextAcquirer::new(FakeOcr::new("  \n"), FakeRasterizer { pages: 1 }, AcquisitionConfig::default());

        let result = acquirer.acquire(&path, FileKind::Pdf, OcrPolicy::Always);
        assert_eq!(result.method, ExtractionMethod::NativeText);
        assert!(result.errors.iter().any(|e| e.contains("OCR produced no text")));
    }

    #[test]
    fn test_rasterizer_failure_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "scan.pdf", b"not a pdf");
        let acquirer = TextAcquirer::new(FakeOcr::new("text"), BrokenRasterizer, AcquisitionConfig::default());

        let result = acquirer.acquire(&path, FileKind::Pdf, OcrPolicy::Auto);
        assert!(result.is_empty());
        assert!(result.errors.iter().any(|e| e.contains("rasterization failed")));
    }

    #[test]
    fn test_image_goes_to_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "marks.jpg", b"fake");
        let acquirer = TextAcquirer::new(FakeOcr::new("SHIPPING MARK: BT-1001"), FakeRasterizer { pages: 1 }, AcquisitionConfig::default());

        let result = acquirer.acquire(&path, FileKind::Image, OcrPolicy::Auto);
        assert_eq!(result.method, ExtractionMethod::OpticalRecognition);
        assert_eq!(result.text, "SHIPPING MARK: BT-1001");
    }

    #[test]
    fn test_csv_is_structured() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "pl.csv", b"G.W.,1205.5 KGS\n");
        let acquirer = TextAcquirer::new(FakeOcr::new(""), FakeRasterizer { pages: 1 }, AcquisitionConfig::default());

        let result = acquirer.acquire(&path, FileKind::Delimited, OcrPolicy::Auto);
        assert_eq!(result.method, ExtractionMethod::StructuredText);
        assert_eq!(result.text, "G.W.\t1205.5 KGS");
    }

    #[test]
    fn test_unsupported_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "archive.zip", b"PK");
        let acquirer = TextAcquirer::new(FakeOcr::new(""), FakeRasterizer { pages: 1 }, AcquisitionConfig::default());

        let result = acquirer.acquire(&path, FileKind::Unsupported, OcrPolicy::Auto);
        assert!(result.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
