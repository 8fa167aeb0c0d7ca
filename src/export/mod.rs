pub mod flatten;
pub mod pdf_builder;
pub mod raster;

pub use flatten::{flatten, flatten_into, ExportOptions};
pub use pdf_builder::{ImageHandle, OutputBuilder, PdfBuilder};
pub use raster::{encode_png, rasterize_checkbox, rasterize_outline, rasterize_signature};
