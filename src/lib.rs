//! # Paraph: Client-Side PDF Annotation and Flattening
//!
//! Paraph is the annotation pipeline behind a document signing surface: it
//! models per-page viewports, captures freehand signature strokes, manages
//! text/checkbox/image/ink annotations on an interactive overlay, and
//! flattens everything into a new PDF with the Y-axis flip handled in one
//! place.
//!
//! ## Features
//!
//! - **Typed coordinate spaces**: display, point, and device coordinates are
//!   distinct types; values cannot cross spaces without a viewport conversion
//! - **Stroke vectorization**: pressure- and speed-sensitive outlines with
//!   end tapers, deterministic for a given sample sequence
//! - **Render scheduling**: per-page generation counters so a superseded
//!   rasterization can never overwrite a newer one
//! - **Self-contained export**: a from-scratch PDF writer with compressed
//!   content streams and soft-masked image XObjects
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use paraph::core::{FixedDocument, Point};
//! use paraph::overlay::{Command, OverlaySurface, Tool};
//! use paraph::export::{flatten, ExportOptions};
//!
//! // A two-page A4 document (a real decoder implements SourceDocument)
//! let document = Rc::new(FixedDocument::a4(2)?);
//! let mut overlay = OverlaySurface::new(document.clone(), 840.0, 2.0)?;
//!
//! // Place a checkbox and tick it
//! overlay.dispatch(Command::SetTool(Tool::PlaceCheckbox))?;
//! overlay.dispatch(Command::PointerDown { page: 0, pos: Point::new(120.0, 200.0) })?;
//! overlay.dispatch(Command::PointerUp)?;
//! overlay.dispatch(Command::DoubleActivate { page: 0, pos: Point::new(130.0, 210.0) })?;
//!
//! // Flatten into a standalone PDF
//! let pdf = flatten(document.as_ref(), &overlay, &ExportOptions::default())?;
//! assert!(pdf.starts_with(b"%PDF-1.7"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The pipeline has four layers:
//!
//! 1. **Core**: coordinate spaces, viewport math, the annotation model, and
//!    the source document interface
//! 2. **Ink**: stroke capture and stroke-to-outline vectorization
//! 3. **Overlay**: interactive state, command dispatch, render scheduling
//! 4. **Export**: rasterization of vector artwork and PDF serialization
//!
//! All display-to-document coordinate math runs through
//! [`core::PageViewport`], and only its `css_scale`; backing-buffer render
//! scales never leak into annotation or export math.

pub mod core;
pub mod export;
pub mod ink;
pub mod overlay;

// Re-export main types for convenience
pub use crate::core::{
    compute_viewport, Annotation, AnnotationId, AnnotationKind, CancelFlag, CheckboxCycle,
    CheckboxState, FixedDocument, MutateDelta, PageAnnotations, PageViewport, ParaphError,
    ParaphResult, PixelBuffer, Point, Rect, Rgba, SignatureAsset, Size, SourceDocument,
};
pub use crate::export::{flatten, ExportOptions, OutputBuilder, PdfBuilder};
pub use crate::ink::{outline_stroke, InkOutline, SignatureSurface, StrokeSample, StrokeStyle};
pub use crate::overlay::{Command, OverlaySurface, RenderQueue, RenderTicket, Tool};
