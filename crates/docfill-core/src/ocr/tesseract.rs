//! Tesseract command-line backend.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::{OcrBackend, check_status, spawn_error};
use crate::error::OcrError;
use crate::models::config::AcquisitionConfig;

/// Runs `tesseract <image> stdout -l <lang>`.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: String,
    language: String,
}

impl TesseractCli {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(&config.tesseract_path, &config.tesseract_lang)
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::from_config(&AcquisitionConfig::default())
    }
}

impl OcrBackend for TesseractCli {
    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        debug!("Running {} on {}", self.program, image.display());

        let output = Command::new(&self.program)
            .arg(image.as_os_str())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| spawn_error(&self.program, e))?;
        check_status(&self.program, &output)?;

        Ok(clean_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Normalize line endings, drop form feeds and trailing blanks.
fn clean_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\x0c', "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let tesseract = TesseractCli::new("/nonexistent/tesseract", "eng");
        let err = tesseract.recognize(Path::new("page.png")).unwrap_err();
        assert!(matches!(err, OcrError::ToolUnavailable(_)));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("B/L NO: X1  \r\n\x0cPAGE 2\n\n"),
            "B/L NO: X1\n\nPAGE 2"
        );
    }
}
