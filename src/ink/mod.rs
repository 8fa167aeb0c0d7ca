pub mod outline;
pub mod stroke;
pub mod surface;

pub use outline::{outline_stroke, InkOutline, StrokeStyle};
pub use stroke::{StrokeRecorder, StrokeSample};
pub use surface::{CommittedStroke, SignatureSurface};
