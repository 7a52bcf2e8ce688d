//! PDF text and image extraction using lopdf and pdf-extract.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Read and load a PDF file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| PdfError::Parse(format!("{}: {}", path.display(), e)))?;
        let mut extractor = Self::new();
        extractor.load(&data)?;
        Ok(extractor)
    }

    fn decode_image(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    // The stream content is the JPEG file itself.
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Skipping unsupported image filter {:?}", filter_name);
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);

        if bits != 8 {
            trace!("Unsupported bits per component: {}", bits);
            return None;
        }

        raw_to_rgba(&data, width, height, color_space)
    }

    /// Resources dictionary for a page, following `Parent` inheritance.
    fn page_resources(&self, doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
        let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.page_resources(doc, *parent_id),
            _ => None,
        }
    }
}

/// Expand 8-bit RGB or gray samples to an RGBA image.
fn raw_to_rgba(data: &[u8], width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = (width as usize) * (height as usize);

    let rgba: Vec<u8> = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= pixels * 3 => data[..pixels * 3]
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        b"DeviceGray" | b"G" if data.len() >= pixels => data[..pixels]
            .iter()
            .flat_map(|&g| [g, g, g, 255])
            .collect(),
        _ => {
            trace!(
                "Could not decode image: colorspace={:?}, data_len={}",
                String::from_utf8_lossy(color_space),
                data.len()
            );
            return None;
        }
    };

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

/// Best-effort text of a caught panic.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("text extractor panicked: {}", detail)
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }
        // pdf-extract panics on some documents lopdf accepts (undeclared fonts,
        // broken encodings); one bad file must not take the run down.
        panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&self.raw_data)
        }))
        .map_err(|payload| PdfError::TextExtraction(panic_message(&*payload)))?
        .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn page_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = self
            .document
            .as_ref()
            .ok_or(PdfError::Parse("No document loaded".to_string()))?;

        let pages = doc.get_pages();
        let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let mut images = Vec::new();
        if let Some(resources) = self.page_resources(doc, *page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = self.decode_image(doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }
}

/// Single-page PDF whose content stream draws text with the given bytes.
#[cfg(test)]
pub(crate) fn one_page_pdf(content: &[u8], resources: Option<Dictionary>) -> Vec<u8> {
    use lopdf::{Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));

    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Contents" => content_id,
    };
    if let Some(resources) = resources {
        page.set("Resources", resources);
    }
    let page_id = doc.add_object(page);

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(extractor.extract_text().is_err());
        assert!(extractor.page_images(1).is_err());
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let mut extractor = PdfExtractor::new();
        let err = extractor.load(b"not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_undeclared_font_is_a_text_error() {
        let pdf = one_page_pdf(b"BT /F9 12 Tf 72 720 Td (SHIPPED ON BOARD) Tj ET", None);

        let mut extractor = PdfExtractor::new();
        extractor.load(&pdf).unwrap();
        assert_eq!(extractor.page_count(), 1);

        let err = extractor.extract_text().unwrap_err();
        assert!(matches!(err, PdfError::TextExtraction(_)));
    }

    #[test]
    fn test_standard_font_text_is_extracted() {
        use lopdf::dictionary;

        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                },
            },
        };
        let pdf = one_page_pdf(
            b"BT /F1 12 Tf 72 720 Td (SHIPPED ON BOARD) Tj ET",
            Some(resources),
        );

        let mut extractor = PdfExtractor::new();
        extractor.load(&pdf).unwrap();
        let text = extractor.extract_text().unwrap();
        assert!(text.contains("SHIPPED ON BOARD"), "{:?}", text);
    }

    #[test]
    fn test_panic_message_reads_str_and_string_payloads() {
        assert_eq!(
            panic_message(&"boom"),
            "text extractor panicked: boom"
        );
        assert_eq!(
            panic_message(&String::from("bad font")),
            "text extractor panicked: bad font"
        );
        assert_eq!(panic_message(&42u8), "text extractor panicked: unknown cause");
    }

    #[test]
    fn test_raw_gray_expands_to_rgba() {
        let img = raw_to_rgba(&[0, 128, 255, 64], 2, 2, b"DeviceGray").unwrap();
        let rgba = img.to_rgba8();
        assert_eq!(rgba.get_pixel(1, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_short_raw_data_is_rejected() {
        assert!(raw_to_rgba(&[1, 2, 3], 2, 2, b"DeviceRGB").is_none());
        assert!(raw_to_rgba(&[1, 2, 3, 4], 2, 2, b"Indexed").is_none());
    }
}
