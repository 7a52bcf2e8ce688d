//! Error types for the docfill-core library.

use thiserror::Error;

/// Main error type for the docfill library.
#[derive(Error, Debug)]
pub enum DocfillError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR or rasterization error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Order store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Spreadsheet could not be opened or read.
    #[error("spreadsheet error: {0}")]
    Sheet(String),

    /// Delimited text could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors from rasterization and character recognition tools.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The external tool is disabled or not installed.
    #[error("{0} is not available")]
    ToolUnavailable(String),

    /// The external tool ran but exited unsuccessfully.
    #[error("{tool} failed (exit code {code}): {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// Page rasterization produced nothing usable.
    #[error("rasterization failed: {0}")]
    Rasterize(String),

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error while preparing tool input or reading its output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by an order store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The order does not exist in the store.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// A line referenced by an update does not exist on the order.
    #[error("line {line} not found on order {order}")]
    LineNotFound { order: String, line: String },

    /// The update would overwrite a value that is already populated.
    #[error("order {order}: refusing to overwrite populated field {field}")]
    Conflict { order: String, field: String },

    /// The value does not fit the field, or the change is not allowed.
    #[error("order {order}: invalid write to {field}")]
    InvalidWrite { order: String, field: String },

    /// The backing storage could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing storage content is malformed.
    #[error("storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type for the docfill library.
pub type Result<T> = std::result::Result<T, DocfillError>;
