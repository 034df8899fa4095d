//! PDF rasterisation for the OCR fallback.
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and must not run on Tokio worker threads. Callers go
//! through [`render_pages`], which moves the work into `spawn_blocking`.
//!
//! Pages are capped by their longest edge (`max_pixels`) rather than DPI so
//! an oversized scan cannot blow up memory.

use crate::error::AnalyzerError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Turns every page of a PDF into an image, in page order.
pub trait PageRasterizer: Send + Sync {
    fn render_pages(&self, path: &Path, max_pixels: u32) -> Result<Vec<DynamicImage>, AnalyzerError>;
}

/// Run a rasteriser on the blocking pool.
pub async fn render_pages(
    rasterizer: &Arc<dyn PageRasterizer>,
    path: &Path,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, AnalyzerError> {
    let rasterizer = Arc::clone(rasterizer);
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || rasterizer.render_pages(&path, max_pixels))
        .await
        .map_err(|e| AnalyzerError::Internal(format!("Render task panicked: {}", e)))?
}

/// [`PageRasterizer`] backed by a dynamically loaded pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    lib_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// `lib_path` is the directory holding the pdfium shared library.
    /// When `None`, the system library search path is used.
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }

    /// Check that the library can be loaded, without opening a document.
    pub fn probe(&self) -> Result<(), AnalyzerError> {
        self.bind().map(|_| ())
    }

    fn bind(&self) -> Result<Pdfium, AnalyzerError> {
        let bindings = match &self.lib_path {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_system_library(),
        };
        bindings.map(Pdfium::new).map_err(|e| AnalyzerError::DependencyMissing {
            dependency: "pdfium".to_string(),
            hint: format!(
                "The pdfium library is needed to render scanned pages for OCR ({e:?}).\n\
                 Install it or set PDFIUM_LIB_PATH to the directory containing it."
            ),
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_pages(&self, path: &Path, max_pixels: u32) -> Result<Vec<DynamicImage>, AnalyzerError> {
        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_file(path, None).map_err(|e| {
            AnalyzerError::extraction(format!("pdfium could not open '{}': {e:?}", path.display()))
        })?;

        let pages = document.pages();
        info!("Rasterising {} pages for OCR", pages.len());

        let render_config = PdfRenderConfig::new()
            .set_target_width(max_pixels as i32)
            .set_maximum_height(max_pixels as i32);

        let mut images = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                AnalyzerError::extraction(format!("could not render page {}: {e:?}", idx + 1))
            })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    struct Fixed(usize);

    impl PageRasterizer for Fixed {
        fn render_pages(&self, _: &Path, max_pixels: u32) -> Result<Vec<DynamicImage>, AnalyzerError> {
            Ok((0..self.0)
                .map(|_| DynamicImage::ImageRgba8(RgbaImage::new(max_pixels, max_pixels)))
                .collect())
        }
    }

    #[tokio::test]
    async fn render_pages_runs_rasterizer_off_thread() {
        let r: Arc<dyn PageRasterizer> = Arc::new(Fixed(3));
        let pages = render_pages(&r, Path::new("x.pdf"), 20).await.unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].width(), 20);
    }

    #[test]
    fn missing_library_directory_is_a_missing_dependency() {
        let r = PdfiumRasterizer::new(Some(PathBuf::from("/nonexistent/pdfium-dir")));
        let err = r.render_pages(Path::new("x.pdf"), 100).unwrap_err();
        assert!(
            matches!(&err, AnalyzerError::DependencyMissing { dependency, .. } if dependency == "pdfium")
        );
    }
}
