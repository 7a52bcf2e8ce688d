//! Optical character recognition and page rasterization.
//!
//! Both steps shell out to external tools by default. They sit behind
//! [`OcrBackend`] and [`PageRasterizer`] so the acquisition stage can be
//! exercised without those tools installed.

mod rasterize;
mod tesseract;

pub use rasterize::{EmbeddedImageRasterizer, FallbackRasterizer, PdftoppmRasterizer};
pub use tesseract::TesseractCli;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::OcrError;

/// Recognizes the text in one image file.
pub trait OcrBackend {
    /// Recognized text, possibly empty.
    fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// Renders the first pages of a PDF into image files.
pub trait PageRasterizer {
    /// Write at most `max_pages` page images into `out_dir`, in page order.
    fn rasterize(&self, pdf: &Path, max_pages: usize, out_dir: &Path)
    -> Result<Vec<PathBuf>, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for &T {
    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        (**self).recognize(image)
    }
}

impl<T: PageRasterizer + ?Sized> PageRasterizer for &T {
    fn rasterize(
        &self,
        pdf: &Path,
        max_pages: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, OcrError> {
        (**self).rasterize(pdf, max_pages, out_dir)
    }
}

/// Whether an external program can be started at all.
pub fn command_available(program: &str) -> bool {
    Command::new(program)
        .arg("-v")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Map a spawn failure to "not installed" when the program is missing.
fn spawn_error(program: &str, err: std::io::Error) -> OcrError {
    if err.kind() == std::io::ErrorKind::NotFound {
        OcrError::ToolUnavailable(program.to_string())
    } else {
        OcrError::Io(err)
    }
}

/// Turn a finished process into an error unless it exited successfully.
fn check_status(program: &str, output: &std::process::Output) -> Result<(), OcrError> {
    if output.status.success() {
        return Ok(());
    }
    Err(OcrError::ToolFailed {
        tool: program.to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_command_is_unavailable() {
        assert!(!command_available("/nonexistent/docfill-tool"));
    }

    #[test]
    fn test_spawn_error_mapping() {
        let err = spawn_error(
            "tesseract",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(err, OcrError::ToolUnavailable(ref t) if t == "tesseract"));

        let err = spawn_error(
            "tesseract",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, OcrError::Io(_)));
    }
}
