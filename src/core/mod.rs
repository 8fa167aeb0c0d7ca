pub mod annotation;
pub mod document;
pub mod error;
pub mod geometry;
pub mod text;
pub mod viewport;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, CheckboxCycle, CheckboxState, MutateDelta,
    PageAnnotations, SignatureAsset, CHECKBOX_BASE_SIZE,
};
pub use document::{CancelFlag, FixedDocument, PixelBuffer, SourceDocument};
pub use error::{ParaphError, ParaphResult};
pub use geometry::{DeviceSpace, DisplaySpace, Point, PointSpace, Rect, Rgba, Size};
pub use viewport::{compute_viewport, PageViewport};
