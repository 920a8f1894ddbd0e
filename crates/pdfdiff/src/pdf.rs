//! [`PageSource`] over a PDF document rendered with PDFium.
//!
//! PDFium is linked dynamically: the library is looked up in the current
//! directory first, then in the system library paths.

use std::path::Path;

use pdfdiff_core::{PageSource, PageText, RenderOptions, RenderPlan, RgbImage, SourceError, TextBlock};
use pdfium_render::prelude::*;

fn backend(context: &str, err: &PdfiumError) -> SourceError {
    SourceError::Backend(format!("{context}: {err:?}"))
}

/// Bind to the PDFium library.
///
/// # Errors
///
/// Returns [`SourceError::Backend`] if no PDFium library can be loaded.
pub fn bind_pdfium() -> Result<Pdfium, SourceError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| backend("failed to load PDFium library", &e))?;
    Ok(Pdfium::new(bindings))
}

/// An open PDF document.
pub struct PdfiumSource<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumSource<'a> {
    /// Open the PDF at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Backend`] if the file cannot be loaded as a
    /// PDF.
    pub fn open(pdfium: &'a Pdfium, path: &Path) -> Result<Self, SourceError> {
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| backend(&format!("failed to load {}", path.display()), &e))?;
        tracing::debug!(path = %path.display(), pages = document.pages().len(), "PDF opened");
        Ok(Self { document })
    }

    fn page(&self, index: usize) -> Result<PdfPage<'_>, SourceError> {
        let count = self.page_count();
        let out_of_range = || SourceError::PageOutOfRange { index, count };
        let page_index = u16::try_from(index).map_err(|_| out_of_range())?;
        if index >= count {
            return Err(out_of_range());
        }
        self.document
            .pages()
            .get(page_index)
            .map_err(|e| backend(&format!("failed to load page {}", index + 1), &e))
    }
}

impl PageSource for PdfiumSource<'_> {
    fn page_count(&self) -> usize {
        usize::from(self.document.pages().len())
    }

    fn render_page(&self, index: usize, options: RenderOptions) -> Result<RgbImage, SourceError> {
        let page = self.page(index)?;
        let plan = RenderPlan::for_page(
            f64::from(page.width().value),
            f64::from(page.height().value),
            options,
        );
        if plan.clamped {
            tracing::debug!(page = index + 1, zoom = plan.zoom, "render scaled down to max side");
        }

        let config = PdfRenderConfig::new()
            .set_target_width(i32::try_from(plan.width).unwrap_or(i32::MAX))
            .set_target_height(i32::try_from(plan.height).unwrap_or(i32::MAX))
            .render_form_data(true);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| backend(&format!("failed to render page {}", index + 1), &e))?;
        Ok(bitmap.as_image().to_rgb8())
    }

    fn page_text(&self, index: usize) -> Result<PageText, SourceError> {
        let page = self.page(index)?;
        let height = page.height().value;
        let text = page
            .text()
            .map_err(|e| backend(&format!("failed to read text of page {}", index + 1), &e))?;

        // PDF space grows upward; blocks are stored top-down.
        let blocks = text
            .segments()
            .iter()
            .map(|segment| {
                let bounds = segment.bounds();
                TextBlock {
                    top: f64::from(height - bounds.top().value),
                    bottom: f64::from(height - bounds.bottom().value),
                    text: segment.text(),
                }
            })
            .collect();

        Ok(PageText {
            height: f64::from(height),
            blocks,
            full: text.all(),
        })
    }
}
