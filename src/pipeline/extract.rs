//! PDF extraction: page text and product images via pdfium.
//!
//! ## Threading
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async tasks. The whole document is
//! read inside `tokio::task::spawn_blocking` and only plain data
//! ([`PageContent`]) crosses back.
//!
//! ## Embedded images first
//!
//! Line sheets embed product photography as image objects; decoding those
//! gives the model the original pixels. A page that names a style number but
//! carries no usable image (vector artwork, a flattened scan with text
//! overlay) is rasterised whole instead, with its longest edge capped.

use super::encode::{encode_image, is_large_enough};
use super::entries::{default_style_regex, find_style_numbers, group_entries, PageContent};
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::output::ExtractedEntry;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Turns a local PDF into one entry per product.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract(&self, pdf_path: &Path) -> Result<Vec<ExtractedEntry>, CatalogError>;
}

/// [`PdfExtractor`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    lib_path: Option<PathBuf>,
    style_re: Regex,
    min_image_px: u32,
    max_images_per_entry: usize,
    max_rendered_pixels: u32,
}

impl PdfiumExtractor {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let style_re = match config.style_pattern {
            Some(ref p) => Regex::new(p)
                .map_err(|e| CatalogError::InvalidConfig(format!("style_pattern: {e}")))?,
            None => default_style_regex().clone(),
        };
        Ok(Self {
            lib_path: config.pdfium_lib_path.clone(),
            style_re,
            min_image_px: config.min_image_px,
            max_images_per_entry: config.max_images_per_entry,
            max_rendered_pixels: config.max_rendered_pixels,
        })
    }
}

#[async_trait]
impl PdfExtractor for PdfiumExtractor {
    async fn extract(&self, pdf_path: &Path) -> Result<Vec<ExtractedEntry>, CatalogError> {
        let path = pdf_path.to_path_buf();
        let this = self.clone();

        let pages = tokio::task::spawn_blocking(move || this.read_pages_blocking(&path))
            .await
            .map_err(|e| CatalogError::Internal(format!("Extraction task panicked: {}", e)))??;

        let entries = group_entries(pages, &self.style_re, self.max_images_per_entry);
        info!(
            "Extracted {} product entr{} from {}",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" },
            pdf_path.display()
        );
        Ok(entries)
    }
}

impl PdfiumExtractor {
    fn read_pages_blocking(&self, pdf_path: &Path) -> Result<Vec<PageContent>, CatalogError> {
        let pdfium = bind_pdfium(self.lib_path.as_deref())?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| CatalogError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let mut pages = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let page_num = idx + 1;

            let text = match page.text() {
                Ok(t) => t.all(),
                Err(e) => {
                    warn!("Page {}: text extraction failed: {:?}", page_num, e);
                    String::new()
                }
            };

            let mut images = Vec::new();
            for object in page.objects().iter() {
                let Some(image_object) = object.as_image_object() else {
                    continue;
                };
                match image_object.get_raw_image() {
                    Ok(img) if is_large_enough(&img, self.min_image_px) => {
                        match encode_image(&img) {
                            Ok(data) => images.push(data),
                            Err(e) => warn!("Page {}: image encoding failed: {}", page_num, e),
                        }
                    }
                    Ok(img) => debug!(
                        "Page {}: skipping {}x{} image below {} px",
                        page_num,
                        img.width(),
                        img.height(),
                        self.min_image_px
                    ),
                    Err(e) => warn!("Page {}: image object unreadable: {:?}", page_num, e),
                }
            }

            if images.is_empty() && !find_style_numbers(&text, &self.style_re).is_empty() {
                match page.render_with_config(&render_config) {
                    Ok(bitmap) => match encode_image(&bitmap.as_image()) {
                        Ok(data) => {
                            debug!("Page {}: no embedded image, using page render", page_num);
                            images.push(data);
                        }
                        Err(e) => warn!("Page {}: render encoding failed: {}", page_num, e),
                    },
                    Err(e) => warn!("Page {}: rasterisation failed: {:?}", page_num, e),
                }
            }

            debug!(
                "Page {}: {} chars of text, {} image(s)",
                page_num,
                text.len(),
                images.len()
            );
            pages.push(PageContent {
                page_num,
                text,
                images,
            });
        }

        Ok(pages)
    }
}

/// Bind to pdfium: an explicit path (file or directory) wins; otherwise the
/// working directory, then the system library path.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, CatalogError> {
    let bindings = match lib_path {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
        }
        Some(p) => Pdfium::bind_to_library(p),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| CatalogError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}
