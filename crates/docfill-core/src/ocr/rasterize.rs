//! PDF page rasterizers.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::GenericImageView;
use tracing::{debug, trace};

use super::{PageRasterizer, check_status, command_available, spawn_error};
use crate::error::OcrError;
use crate::models::config::AcquisitionConfig;
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Renders pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<String>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi,
        }
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(&config.pdftoppm_path, config.render_dpi)
    }

    pub fn is_available(&self) -> bool {
        command_available(&self.program)
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(
        &self,
        pdf: &Path,
        max_pages: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, OcrError> {
        if max_pages == 0 {
            return Ok(Vec::new());
        }

        let prefix = out_dir.join("page");
        let output = Command::new(&self.program)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(max_pages.to_string())
            .arg("-png")
            .arg(pdf.as_os_str())
            .arg(prefix.as_os_str())
            .output()
            .map_err(|e| spawn_error(&self.program, e))?;
        check_status(&self.program, &output)?;

        // Page numbers are zero-padded to a common width, so name order is page order.
        let mut pages: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension().is_some_and(|e| e == "png")
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("page"))
            })
            .collect();
        pages.sort();
        pages.truncate(max_pages);

        if pages.is_empty() {
            return Err(OcrError::Rasterize(format!(
                "{} produced no pages for {}",
                self.program,
                pdf.display()
            )));
        }

        debug!("Rendered {} pages with {}", pages.len(), self.program);
        Ok(pages)
    }
}

/// Uses the largest image embedded on each page, as found in scanned PDFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedImageRasterizer;

impl PageRasterizer for EmbeddedImageRasterizer {
    fn rasterize(
        &self,
        pdf: &Path,
        max_pages: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, OcrError> {
        let extractor =
            PdfExtractor::open(pdf).map_err(|e| OcrError::Rasterize(e.to_string()))?;
        let last = (extractor.page_count() as usize).min(max_pages) as u32;

        let mut pages = Vec::new();
        for page in 1..=last {
            let images = match extractor.page_images(page) {
                Ok(images) => images,
                Err(e) => {
                    trace!("Page {}: {}", page, e);
                    continue;
                }
            };
            let Some(largest) = images.into_iter().max_by_key(|img| {
                let (w, h) = img.dimensions();
                u64::from(w) * u64::from(h)
            }) else {
                continue;
            };

            let path = out_dir.join(format!("page-{:04}.png", page));
            largest.to_luma8().save(&path)?;
            pages.push(path);
        }

        if pages.is_empty() {
            return Err(OcrError::Rasterize(format!(
                "no decodable page images in {}",
                pdf.display()
            )));
        }

        debug!("Decoded {} embedded page images", pages.len());
        Ok(pages)
    }
}

/// `pdftoppm` when it is installed, otherwise embedded page images.
#[derive(Debug, Clone)]
pub struct FallbackRasterizer {
    primary: PdftoppmRasterizer,
    secondary: EmbeddedImageRasterizer,
}

impl FallbackRasterizer {
    pub fn new(primary: PdftoppmRasterizer) -> Self {
        Self {
            primary,
            secondary: EmbeddedImageRasterizer,
        }
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(PdftoppmRasterizer::from_config(config))
    }
}

impl Default for FallbackRasterizer {
    fn default() -> Self {
        Self::from_config(&AcquisitionConfig::default())
    }
}

impl PageRasterizer for FallbackRasterizer {
    fn rasterize(
        &self,
        pdf: &Path,
        max_pages: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, OcrError> {
        if self.primary.is_available() {
            match self.primary.rasterize(pdf, max_pages, out_dir) {
                Ok(pages) => return Ok(pages),
                Err(e) => debug!("pdftoppm failed, trying embedded images: {}", e),
            }
        }
        self.secondary.rasterize(pdf, max_pages, out_dir)
    }
}
