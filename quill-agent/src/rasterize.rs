//! Document rasterization
//!
//! Turns a PDF into one PNG per page, in document order, for vision prompting.
//!
//! `PdfiumRasterizer` is stateless (`Send + Sync`). Each call binds a fresh
//! `Pdfium` instance because the upstream type is `!Send`; the OS caches the
//! dynamic library load, so repeat binds are cheap.

use std::io::Cursor;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

/// Default rendering resolution
pub const DEFAULT_DPI: u32 = 150;

/// Largest width or height of a rendered page, in pixels
const MAX_DIMENSION_PX: u32 = 4096;

/// PDF points per inch
const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Error)]
pub enum RasterizeError {
    /// Malformed or unreadable document
    #[error("{0}")]
    DocumentDecode(String),

    #[error("PDFium library not available: {0}")]
    Library(String),

    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Converts a document into ordered page images
///
/// Pure and synchronous; async callers run it on a blocking thread.
/// An empty result is a valid outcome meaning "no pages".
pub trait DocumentRasterizer: Send + Sync {
    fn rasterize(&self, document: &[u8], dpi: u32) -> Result<Vec<Vec<u8>>, RasterizeError>;
}

/// Rasterizer backed by Google PDFium
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Creates the rasterizer, checking the PDFium library can be bound
    ///
    /// Looks at `PDFIUM_DYNAMIC_LIB_PATH` first, then the system library path.
    pub fn new() -> Result<Self, RasterizeError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

fn load_pdfium() -> Result<Pdfium, RasterizeError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| RasterizeError::Library(format!("failed to load {path}: {e}")))?;
        return Ok(Pdfium::new(bindings));
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        RasterizeError::Library(format!(
            "set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Pixel size for a page, aspect ratio kept, both sides within [1, MAX_DIMENSION_PX]
fn render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl DocumentRasterizer for PdfiumRasterizer {
    fn rasterize(&self, document: &[u8], dpi: u32) -> Result<Vec<Vec<u8>>, RasterizeError> {
        if document.is_empty() {
            return Ok(Vec::new());
        }

        let pdfium = load_pdfium()?;
        let pdf = pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(|e| RasterizeError::DocumentDecode(format!("failed to load PDF: {e}")))?;

        let mut images = Vec::new();
        for (index, page) in pdf.pages().iter().enumerate() {
            let (target_w, target_h) =
                render_dimensions(page.width().value, page.height().value, dpi);
            if target_w == MAX_DIMENSION_PX || target_h == MAX_DIMENSION_PX {
                warn!(page = index, width = target_w, height = target_h, "Page dimensions capped");
            }

            let config = PdfRenderConfig::new()
                .set_target_width(target_w as i32)
                .set_maximum_height(target_h as i32);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| RasterizeError::Render {
                    page: index,
                    reason: e.to_string(),
                })?;

            let mut cursor = Cursor::new(Vec::new());
            bitmap
                .as_image()
                .write_to(&mut cursor, ImageOutputFormat::Png)
                .map_err(|e| RasterizeError::Encode(e.to_string()))?;

            images.push(cursor.into_inner());
        }

        debug!(pages = images.len(), dpi, "Rasterized document");
        Ok(images)
    }
}
