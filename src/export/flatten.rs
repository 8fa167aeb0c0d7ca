//! Annotation flattening.
//!
//! Walks every annotated page and converts display-space annotations into
//! point-space draw calls against an [`OutputBuilder`]. This is where the
//! Y-axis flip happens: annotation positions anchor on their display-space
//! *top* edge, output rects anchor on their point-space *bottom* edge, and
//! [`PageViewport::display_rect_to_doc`] reconciles the two. Only
//! `css_scale` enters the math; the backing render scale never does.

use std::num::NonZeroUsize;
use std::rc::Rc;

use log::warn;
use lru::LruCache;

use crate::core::annotation::{Annotation, AnnotationKind, SignatureAsset, CHECKBOX_BASE_SIZE};
use crate::core::document::SourceDocument;
use crate::core::error::{ParaphError, ParaphResult};
use crate::core::geometry::{DisplaySpace, PointSpace, Rect};
use crate::core::viewport::PageViewport;
use crate::export::pdf_builder::{ImageHandle, OutputBuilder, PdfBuilder};
use crate::export::raster::{rasterize_checkbox, rasterize_outline};
use crate::overlay::surface::OverlaySurface;

/// Entries held in the per-export embedded-asset cache.
const ASSET_CACHE_CAPACITY: usize = 64;

/// Export tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Raster pixels per display pixel when vector artwork (ink, checkboxes)
    /// is rasterized for embedding. Clamped into `2.0..=4.0`.
    pub fidelity: f64,
    /// Fail the whole export on the first undrawable annotation instead of
    /// skipping it.
    pub strict: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            fidelity: 3.0,
            strict: false,
        }
    }
}

/// Flatten the overlay into a new PDF.
pub fn flatten(
    document: &dyn SourceDocument,
    overlay: &OverlaySurface,
    options: &ExportOptions,
) -> ParaphResult<Vec<u8>> {
    let mut page_sizes = Vec::with_capacity(document.page_count());
    for page in 0..document.page_count() {
        page_sizes.push(document.page_size(page)?);
    }
    let mut builder = PdfBuilder::new(page_sizes);
    flatten_into(overlay, options, &mut builder)?;
    builder.serialize()
}

/// Flatten the overlay through an arbitrary output builder.
pub fn flatten_into(
    overlay: &OverlaySurface,
    options: &ExportOptions,
    builder: &mut dyn OutputBuilder,
) -> ParaphResult<()> {
    let fidelity = options.fidelity.clamp(2.0, 4.0);
    let cache_capacity =
        NonZeroUsize::new(ASSET_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
    let mut asset_cache: LruCache<usize, ImageHandle> = LruCache::new(cache_capacity);

    let mut pages: Vec<usize> = overlay.annotated_pages().map(|(page, _)| page).collect();
    pages.sort_unstable();

    for page in pages {
        let annotations = match overlay.annotations(page) {
            Some(items) if !items.is_empty() => items,
            _ => continue,
        };
        let viewport = overlay.viewport(page).ok_or_else(|| {
            ParaphError::Export(format!("no viewport computed for page {}", page))
        })?;

        // Bottom of the z-order first, so later annotations paint on top.
        for annotation in annotations.iter() {
            if !annotation.visible {
                continue;
            }
            let result = flatten_annotation(
                page,
                annotation,
                viewport,
                fidelity,
                &mut asset_cache,
                builder,
            );
            match result {
                Ok(()) => {}
                Err(ParaphError::AssetDecode(msg)) if !options.strict => {
                    warn!(
                        "skipping annotation {} on page {}: {}",
                        annotation.id().raw(),
                        page,
                        msg
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}

fn flatten_annotation(
    page: usize,
    annotation: &Annotation,
    viewport: &PageViewport,
    fidelity: f64,
    asset_cache: &mut LruCache<usize, ImageHandle>,
    builder: &mut dyn OutputBuilder,
) -> ParaphResult<()> {
    match &annotation.kind {
        AnnotationKind::Text {
            font_size,
            color,
            content,
        } => {
            let scale = viewport.css_scale;
            let font_doc = font_size * annotation.scale / scale;
            let x_doc = annotation.position.x / scale;
            let top_doc = viewport.document_size.height - annotation.position.y / scale;
            for (line_index, line) in content.split('\n').enumerate() {
                if line.is_empty() {
                    continue;
                }
                // Baseline sits one em below the line top, raised by the
                // font's descent allowance.
                let baseline = top_doc - font_doc * (line_index as f64 + 1.0) + font_doc * 0.2;
                builder.draw_text(page, line, x_doc, baseline, font_doc, *color)?;
            }
            Ok(())
        }
        AnnotationKind::Image { asset } => {
            let handle = embed_cached(asset, asset_cache, builder)?;
            let rect = doc_rect(annotation, viewport);
            builder.draw_image(page, handle, rect)
        }
        AnnotationKind::Checkbox { cycle, state_index } => {
            let state = cycle.state_at(*state_index);
            let size = CHECKBOX_BASE_SIZE * annotation.scale;
            let pixels = rasterize_checkbox(state, size * fidelity)?;
            let handle = builder.embed_image(&pixels)?;
            let rect = doc_rect(annotation, viewport);
            builder.draw_image(page, handle, rect)
        }
        AnnotationKind::Ink { outline, fill } => {
            let pixels = rasterize_outline(outline, *fill, fidelity * annotation.scale)?;
            let handle = builder.embed_image(&pixels)?;
            let rect = doc_rect(annotation, viewport);
            builder.draw_image(page, handle, rect)
        }
    }
}

/// The annotation's display bounds converted to a point-space rect.
fn doc_rect(annotation: &Annotation, viewport: &PageViewport) -> Rect<PointSpace> {
    let bounds: Rect<DisplaySpace> = annotation.display_bounds();
    viewport.display_rect_to_doc(bounds)
}

/// Embed a signature asset once per export, keyed by asset identity.
fn embed_cached(
    asset: &Rc<SignatureAsset>,
    cache: &mut LruCache<usize, ImageHandle>,
    builder: &mut dyn OutputBuilder,
) -> ParaphResult<ImageHandle> {
    let key = Rc::as_ptr(asset) as usize;
    if let Some(handle) = cache.get(&key) {
        return Ok(*handle);
    }
    let handle = builder.embed_image(asset.pixels())?;
    cache.put(key, handle);
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ExportOptions::default();
        assert_eq!(options.fidelity, 3.0);
        assert!(!options.strict);
    }

    #[test]
    fn test_fidelity_clamped() {
        let options = ExportOptions {
            fidelity: 10.0,
            ..ExportOptions::default()
        };
        assert_eq!(options.fidelity.clamp(2.0, 4.0), 4.0);
    }
}
