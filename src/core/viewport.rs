//! Per-page viewport and scale computation.
//!
//! Every displayed page carries a [`PageViewport`] that reconciles four
//! quantities: the document's native point size, the on-screen CSS size, the
//! backing raster size, and the user zoom. The invariant the rest of the
//! pipeline depends on: **`css_scale` alone defines the display coordinate
//! space in which annotation positions are stored.** The backing buffer may
//! be rendered at a different (clamped) scale for crispness, but annotation
//! math and export math only ever read `css_scale`.
//!
//! Viewport computation is defined to never fail; every input is clamped to
//! a valid range, since a failed layout calculation would strand the
//! interactive surface.

use crate::core::geometry::{DeviceSpace, DisplaySpace, Point, PointSpace, Rect, Size};

/// Horizontal layout margin reserved inside the container, in CSS pixels.
pub const LAYOUT_MARGIN: f64 = 40.0;

/// Maximum on-screen page width, in CSS pixels.
pub const MAX_LAYOUT_WIDTH: f64 = 800.0;

/// Lower bound for `css_scale`, applied when the container is narrower than
/// the layout margin.
pub const MIN_CSS_SCALE: f64 = 0.05;

/// Lower bound for the backing render scale; below this, page text becomes
/// illegible.
pub const MIN_QUALITY_SCALE: f64 = 0.25;

/// Upper bound for the backing render scale; above this, backing-buffer
/// memory becomes excessive.
pub const MAX_SAFE_SCALE: f64 = 4.0;

/// The viewport of a single displayed page.
///
/// Recomputed on container resize and zoom change. Recomputation is
/// idempotent: identical inputs produce a bit-identical viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct PageViewport {
    /// Native point dimensions of the page.
    pub document_size: Size<PointSpace>,

    /// On-screen CSS size: `document_size * css_scale`.
    pub css_size: Size<DisplaySpace>,

    /// Backing raster size in whole device pixels.
    pub device_size: Size<DeviceSpace>,

    /// Ratio of on-screen width to native width. Unclamped by the quality
    /// bounds; this is the value recorded for export math.
    pub css_scale: f64,

    /// `css_scale * device_pixel_ratio * zoom`, clamped into
    /// `[MIN_QUALITY_SCALE, MAX_SAFE_SCALE]`. Sizes the backing buffer only.
    pub render_scale: f64,

    /// Host display density.
    pub device_pixel_ratio: f64,

    /// User-controlled zoom multiplier.
    pub zoom: f64,
}

/// Compute the viewport for a page.
///
/// `css_scale = min(container_width - LAYOUT_MARGIN, MAX_LAYOUT_WIDTH) /
/// document_width`, clamped to at least [`MIN_CSS_SCALE`]; it is never zero
/// or negative even for degenerate containers. Non-finite or non-positive
/// `device_pixel_ratio`/`zoom` fall back to `1.0`.
pub fn compute_viewport(
    document_size: Size<PointSpace>,
    container_width: f64,
    device_pixel_ratio: f64,
    zoom: f64,
) -> PageViewport {
    let doc_width = if document_size.width.is_finite() && document_size.width > 0.0 {
        document_size.width
    } else {
        1.0
    };
    let dpr = sanitize_multiplier(device_pixel_ratio);
    let zoom = sanitize_multiplier(zoom);

    let container_width = if container_width.is_finite() {
        container_width
    } else {
        0.0
    };
    let target_width = (container_width - LAYOUT_MARGIN).min(MAX_LAYOUT_WIDTH);
    let css_scale = (target_width / doc_width).max(MIN_CSS_SCALE);

    let render_scale = (css_scale * dpr * zoom).clamp(MIN_QUALITY_SCALE, MAX_SAFE_SCALE);

    let css_size = Size::new(
        document_size.width * css_scale,
        document_size.height * css_scale,
    );
    let device_size = Size::new(
        (document_size.width * render_scale).floor(),
        (document_size.height * render_scale).floor(),
    );

    PageViewport {
        document_size,
        css_size,
        device_size,
        css_scale,
        render_scale,
        device_pixel_ratio: dpr,
        zoom,
    }
}

fn sanitize_multiplier(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        1.0
    }
}

impl PageViewport {
    /// Convert a display-space bounding box to document point space.
    ///
    /// Display space has Y increasing downward from the top-left; point
    /// space has Y increasing upward from the bottom-left. The conversion
    /// therefore divides by `css_scale` and flips about the page height,
    /// anchoring on the box's *top* edge:
    ///
    /// ```text
    /// doc_x   = display_x / css_scale
    /// doc_top = page_height - display_top / css_scale
    /// ```
    ///
    /// The returned rect's origin is the bottom-left corner, per the point
    /// space convention.
    pub fn display_rect_to_doc(&self, rect: Rect<DisplaySpace>) -> Rect<PointSpace> {
        let scale = self.css_scale;
        let doc_x = rect.min_x() / scale;
        let doc_w = rect.size.width / scale;
        let doc_h = rect.size.height / scale;
        let doc_top = self.document_size.height - rect.min_y() / scale;
        Rect::new(Point::new(doc_x, doc_top - doc_h), Size::new(doc_w, doc_h))
    }

    /// Convert a display-space length to point units.
    pub fn display_len_to_doc(&self, len: f64) -> f64 {
        len / self.css_scale
    }
}
