//! CPU rasterization of annotation artwork.
//!
//! Ink outlines, checkbox glyphs, and composed signatures become RGBA pixel
//! buffers here. Everything is drawn with tiny-skia into a premultiplied
//! pixmap and demultiplied on the way out, since both the PNG encoder and
//! the PDF image path expect straight alpha.

use std::rc::Rc;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::core::annotation::{CheckboxState, SignatureAsset};
use crate::core::document::PixelBuffer;
use crate::core::error::{ParaphError, ParaphResult};
use crate::core::geometry::Rgba;
use crate::ink::outline::InkOutline;
use crate::ink::surface::SignatureSurface;

fn new_pixmap(width: u32, height: u32) -> ParaphResult<Pixmap> {
    Pixmap::new(width, height)
        .ok_or_else(|| ParaphError::Export(format!("cannot allocate {}x{} raster", width, height)))
}

fn make_paint(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn pixmap_to_buffer(pixmap: Pixmap) -> ParaphResult<PixelBuffer> {
    let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    PixelBuffer::from_rgba(pixmap.width(), pixmap.height(), data)
}

fn outline_path(
    outline: &InkOutline,
    offset_x: f64,
    offset_y: f64,
    pixel_scale: f64,
) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for (i, p) in outline.points().iter().enumerate() {
        let x = ((p.x - offset_x) * pixel_scale) as f32;
        let y = ((p.y - offset_y) * pixel_scale) as f32;
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    pb.close();
    pb.finish()
}

/// Rasterize a single ink outline at `pixel_scale` raster pixels per display
/// pixel. The buffer is sized to the outline bounds.
pub fn rasterize_outline(
    outline: &InkOutline,
    fill: Rgba,
    pixel_scale: f64,
) -> ParaphResult<PixelBuffer> {
    let bounds = outline.bounds();
    let width = (bounds.size.width * pixel_scale).ceil().max(1.0) as u32;
    let height = (bounds.size.height * pixel_scale).ceil().max(1.0) as u32;
    let mut pixmap = new_pixmap(width, height)?;

    let path = outline_path(outline, bounds.min_x(), bounds.min_y(), pixel_scale)
        .ok_or_else(|| ParaphError::Export("outline produced no drawable path".into()))?;
    pixmap.fill_path(
        &path,
        &make_paint(fill),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    pixmap_to_buffer(pixmap)
}

/// Rasterize a checkbox glyph into a square `size_px` buffer: the border box
/// plus a check mark, a cross, or nothing.
pub fn rasterize_checkbox(state: CheckboxState, size_px: f64) -> ParaphResult<PixelBuffer> {
    let size = size_px.ceil().max(4.0);
    let mut pixmap = new_pixmap(size as u32, size as u32)?;
    let paint = make_paint(Rgba::BLACK);
    let stroke = Stroke {
        width: (size / 15.0) as f32,
        ..Stroke::default()
    };

    // Border box, inset by half the stroke so it is not clipped.
    let inset = size / 30.0;
    let rect =
        tiny_skia::Rect::from_ltrb(
            inset as f32,
            inset as f32,
            (size - inset) as f32,
            (size - inset) as f32,
        )
        .ok_or_else(|| ParaphError::Export("degenerate checkbox rect".into()))?;
    let border = PathBuilder::from_rect(rect);
    pixmap.stroke_path(&border, &paint, &stroke, Transform::identity(), None);

    let mut pb = PathBuilder::new();
    match state {
        CheckboxState::Unmarked => {}
        CheckboxState::Checked => {
            pb.move_to((size * 0.22) as f32, (size * 0.55) as f32);
            pb.line_to((size * 0.42) as f32, (size * 0.74) as f32);
            pb.line_to((size * 0.78) as f32, (size * 0.28) as f32);
        }
        CheckboxState::Crossed => {
            pb.move_to((size * 0.25) as f32, (size * 0.25) as f32);
            pb.line_to((size * 0.75) as f32, (size * 0.75) as f32);
            pb.move_to((size * 0.75) as f32, (size * 0.25) as f32);
            pb.line_to((size * 0.25) as f32, (size * 0.75) as f32);
        }
    }
    if let Some(glyph) = pb.finish() {
        pixmap.stroke_path(&glyph, &paint, &stroke, Transform::identity(), None);
    }
    pixmap_to_buffer(pixmap)
}

/// Flatten a signature surface into a reusable asset at `pixel_scale` raster
/// pixels per display pixel. `None` when nothing was drawn.
pub fn rasterize_signature(
    surface: &SignatureSurface,
    pixel_scale: f64,
) -> ParaphResult<Option<Rc<SignatureAsset>>> {
    let Some(bounds) = surface.bounds() else {
        return Ok(None);
    };
    let width = (bounds.size.width * pixel_scale).ceil().max(1.0) as u32;
    let height = (bounds.size.height * pixel_scale).ceil().max(1.0) as u32;
    let mut pixmap = new_pixmap(width, height)?;

    for stroke in surface.strokes() {
        let Some(path) =
            outline_path(&stroke.outline, bounds.min_x(), bounds.min_y(), pixel_scale)
        else {
            continue;
        };
        pixmap.fill_path(
            &path,
            &make_paint(stroke.fill),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    let pixels = pixmap_to_buffer(pixmap)?;
    Ok(Some(SignatureAsset::from_pixels(pixels)))
}

/// Encode a pixel buffer as a standalone PNG (the "save signature" path).
pub fn encode_png(buffer: &PixelBuffer) -> ParaphResult<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            &buffer.data,
            buffer.width,
            buffer.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ParaphError::Export(format!("PNG encoding failed: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::outline::{outline_stroke, StrokeStyle};
    use crate::ink::stroke::StrokeSample;

    fn sample_outline() -> InkOutline {
        let samples: Vec<StrokeSample> = (0..20)
            .map(|i| StrokeSample::new(i as f64 * 4.0, 15.0, 0.5, i as f64 * 8.0))
            .collect();
        outline_stroke(&samples, &StrokeStyle::default()).unwrap()
    }

    #[test]
    fn test_rasterize_outline_has_ink() {
        let buffer = rasterize_outline(&sample_outline(), Rgba::BLACK, 2.0).unwrap();
        assert!(buffer.width > 1);
        // At least one pixel must be opaque-ish
        let inked = buffer.data.chunks(4).any(|px| px[3] > 128);
        assert!(inked);
    }

    #[test]
    fn test_checkbox_states_differ() {
        let unmarked = rasterize_checkbox(CheckboxState::Unmarked, 30.0).unwrap();
        let checked = rasterize_checkbox(CheckboxState::Checked, 30.0).unwrap();
        let crossed = rasterize_checkbox(CheckboxState::Crossed, 30.0).unwrap();
        assert_ne!(unmarked.data, checked.data);
        assert_ne!(checked.data, crossed.data);
    }

    #[test]
    fn test_empty_signature_is_none() {
        let surface = SignatureSurface::default();
        assert!(rasterize_signature(&surface, 2.0).unwrap().is_none());
    }

    #[test]
    fn test_signature_asset_roundtrip() {
        let mut surface = SignatureSurface::default();
        surface.begin_stroke(StrokeSample::new(0.0, 0.0, 0.5, 0.0));
        for i in 1..15 {
            surface.extend_stroke(StrokeSample::new(i as f64 * 5.0, i as f64 * 2.0, 0.5, 0.0));
        }
        surface.end_stroke().unwrap();

        let asset = rasterize_signature(&surface, 2.0).unwrap().unwrap();
        let png = encode_png(asset.pixels()).unwrap();
        // PNG magic
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
        let decoded = SignatureAsset::from_encoded(&png).unwrap();
        assert_eq!(decoded.natural_size(), asset.natural_size());
    }
}
