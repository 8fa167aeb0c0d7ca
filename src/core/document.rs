//! Source document interface.
//!
//! The rasterization library is an external collaborator; this module
//! specifies only its interface plus a trivial in-memory implementation used
//! by tests and demos. A real decoder satisfies [`SourceDocument`] by
//! wrapping its page handles.

use std::cell::Cell;
use std::rc::Rc;

use crate::core::error::{ParaphError, ParaphResult};
use crate::core::geometry::{PointSpace, Rgba, Size};

/// An RGBA8 pixel buffer, row-major, non-premultiplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer from raw RGBA bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> ParaphResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ParaphError::Generic(format!(
                "Pixel buffer size mismatch: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }
        Ok(PixelBuffer {
            width,
            height,
            data,
        })
    }

    /// Create a buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, color: Rgba) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        PixelBuffer {
            width,
            height,
            data,
        }
    }
}

/// Cooperative cancellation flag for a single rasterization task.
///
/// `Rc`-shared between the render queue (which cancels) and the running task
/// (which polls). Single-threaded by design; the whole pipeline runs on one
/// event loop.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Rc<Cell<bool>>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Immutable handle to the decoded source file.
///
/// Implementations decode once and expose per-page geometry and raster
/// access. `rasterize` must poll the cancel flag at its suspension points
/// and return [`ParaphError::RenderCancelled`] when superseded.
pub trait SourceDocument {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Native point-space size of a page.
    fn page_size(&self, page: usize) -> ParaphResult<Size<PointSpace>>;

    /// Rasterize a page at the given render scale into a pixel buffer.
    fn rasterize(
        &self,
        page: usize,
        render_scale: f64,
        cancel: &CancelFlag,
    ) -> ParaphResult<PixelBuffer>;
}

/// A source document with fixed page sizes and flat-color page rasters.
///
/// Stands in for a real decoder in tests and demos.
#[derive(Debug, Clone)]
pub struct FixedDocument {
    pages: Vec<Size<PointSpace>>,
    background: Rgba,
}

impl FixedDocument {
    pub fn new(pages: Vec<Size<PointSpace>>) -> ParaphResult<Self> {
        if pages.is_empty() {
            return Err(ParaphError::Decode("document has no pages".into()));
        }
        Ok(FixedDocument {
            pages,
            background: Rgba::new(255, 255, 255, 255),
        })
    }

    /// A document of `count` A4 portrait pages.
    pub fn a4(count: usize) -> ParaphResult<Self> {
        FixedDocument::new(vec![Size::new(595.0, 842.0); count])
    }

    fn check_page(&self, page: usize) -> ParaphResult<()> {
        if page >= self.pages.len() {
            return Err(ParaphError::PageOutOfRange {
                page,
                count: self.pages.len(),
            });
        }
        Ok(())
    }
}

impl SourceDocument for FixedDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> ParaphResult<Size<PointSpace>> {
        self.check_page(page)?;
        Ok(self.pages[page])
    }

    fn rasterize(
        &self,
        page: usize,
        render_scale: f64,
        cancel: &CancelFlag,
    ) -> ParaphResult<PixelBuffer> {
        self.check_page(page)?;
        if cancel.is_cancelled() {
            return Err(ParaphError::RenderCancelled);
        }
        let size = self.pages[page];
        let width = (size.width * render_scale).floor().max(1.0) as u32;
        let height = (size.height * render_scale).floor().max(1.0) as u32;
        Ok(PixelBuffer::solid(width, height, self.background))
    }
}
