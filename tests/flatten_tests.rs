//! End-to-end flatten tests: display-space annotations in, point-space draw
//! calls (or whole PDFs) out.

use std::io::Write as _;
use std::rc::Rc;

use paraph::core::document::{FixedDocument, PixelBuffer};
use paraph::core::error::{ParaphError, ParaphResult};
use paraph::core::geometry::{Point, PointSpace, Rect, Rgba, Size};
use paraph::export::flatten::{flatten, flatten_into, ExportOptions};
use paraph::export::pdf_builder::{ImageHandle, OutputBuilder};
use paraph::overlay::command::{Command, Tool};
use paraph::overlay::surface::OverlaySurface;
use paraph::SignatureAsset;

/// Captures draw calls instead of serializing them.
#[derive(Default)]
struct RecordingBuilder {
    embedded: Vec<(u32, u32)>,
    images: Vec<(usize, ImageHandle, Rect<PointSpace>)>,
    texts: Vec<(usize, String, f64, f64, f64)>,
}

impl OutputBuilder for RecordingBuilder {
    fn embed_image(&mut self, pixels: &PixelBuffer) -> ParaphResult<ImageHandle> {
        if pixels.data.is_empty() {
            return Err(ParaphError::AssetDecode("empty image buffer".into()));
        }
        self.embedded.push((pixels.width, pixels.height));
        Ok(ImageHandle::from_index(self.embedded.len() - 1))
    }

    fn draw_image(
        &mut self,
        page: usize,
        handle: ImageHandle,
        rect: Rect<PointSpace>,
    ) -> ParaphResult<()> {
        self.images.push((page, handle, rect));
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: usize,
        text: &str,
        x: f64,
        y: f64,
        font_size: f64,
        _color: Rgba,
    ) -> ParaphResult<()> {
        self.texts.push((page, text.to_string(), x, y, font_size));
        Ok(())
    }

    fn serialize(&self) -> ParaphResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// One 600x800pt page shown at exactly half scale (container 340 gives a
/// 300px target width).
fn half_scale_setup() -> (Rc<FixedDocument>, OverlaySurface) {
    let doc = Rc::new(FixedDocument::new(vec![Size::new(600.0, 800.0)]).unwrap());
    let overlay = OverlaySurface::new(doc.clone(), 340.0, 1.0).unwrap();
    assert!((overlay.viewport(0).unwrap().css_scale - 0.5).abs() < 1e-12);
    (doc, overlay)
}

fn solid_asset(width: u32, height: u32) -> Rc<SignatureAsset> {
    SignatureAsset::from_pixels(PixelBuffer::solid(width, height, Rgba::new(20, 30, 40, 200)))
}

#[test]
fn test_image_flip_round_trip() {
    let (_doc, mut overlay) = half_scale_setup();
    // 100x40px asset placed at the standard signature point with scale 0.5
    // gives a 50x20 display box at (100, 100).
    overlay
        .dispatch(Command::PlaceSignature {
            page: 0,
            asset: solid_asset(100, 40),
        })
        .unwrap();

    let mut builder = RecordingBuilder::default();
    flatten_into(&overlay, &ExportOptions::default(), &mut builder).unwrap();

    assert_eq!(builder.images.len(), 1);
    let (page, _, rect) = &builder.images[0];
    assert_eq!(*page, 0);
    // x = 100 / 0.5, top = 800 - 100 / 0.5, drawn from the bottom edge
    assert!((rect.min_x() - 200.0).abs() < 1e-9);
    assert!((rect.max_y() - 600.0).abs() < 1e-9);
    assert!((rect.size.width - 100.0).abs() < 1e-9);
    assert!((rect.size.height - 40.0).abs() < 1e-9);
}

#[test]
fn test_text_baseline_math() {
    let (_doc, mut overlay) = half_scale_setup();
    overlay.dispatch(Command::SetTool(Tool::PlaceText)).unwrap();
    overlay
        .dispatch(Command::PointerDown {
            page: 0,
            pos: Point::new(100.0, 100.0),
        })
        .unwrap();
    overlay
        .dispatch(Command::SetTextContent("Jane Doe".into()))
        .unwrap();
    overlay.dispatch(Command::EndTextEdit).unwrap();

    let mut builder = RecordingBuilder::default();
    flatten_into(&overlay, &ExportOptions::default(), &mut builder).unwrap();

    assert_eq!(builder.texts.len(), 1);
    let (_, text, x, y, font_size) = &builder.texts[0];
    assert_eq!(text, "Jane Doe");
    // 20px font at css scale 0.5 is a 40pt font
    assert!((font_size - 40.0).abs() < 1e-9);
    assert!((x - 200.0).abs() < 1e-9);
    // baseline = top - em + 20% descent allowance = 600 - 40 + 8
    assert!((y - 568.0).abs() < 1e-9);
}

#[test]
fn test_multiline_text_stacks_downward() {
    let (_doc, mut overlay) = half_scale_setup();
    overlay.dispatch(Command::SetTool(Tool::PlaceText)).unwrap();
    overlay
        .dispatch(Command::PointerDown {
            page: 0,
            pos: Point::new(100.0, 100.0),
        })
        .unwrap();
    overlay
        .dispatch(Command::SetTextContent("first\nsecond".into()))
        .unwrap();
    overlay.dispatch(Command::EndTextEdit).unwrap();

    let mut builder = RecordingBuilder::default();
    flatten_into(&overlay, &ExportOptions::default(), &mut builder).unwrap();

    assert_eq!(builder.texts.len(), 2);
    let first_y = builder.texts[0].3;
    let second_y = builder.texts[1].3;
    // Point space Y grows upward; the second line sits one em lower.
    assert!((first_y - second_y - 40.0).abs() < 1e-9);
}

#[test]
fn test_invisible_annotation_skipped() {
    let (_doc, mut overlay) = half_scale_setup();
    overlay
        .dispatch(Command::PlaceSignature {
            page: 0,
            asset: solid_asset(10, 10),
        })
        .unwrap();
    let id = overlay.annotations(0).unwrap().active().unwrap();
    overlay
        .annotations_mut(0)
        .unwrap()
        .get_mut(id)
        .unwrap()
        .visible = false;

    let mut builder = RecordingBuilder::default();
    flatten_into(&overlay, &ExportOptions::default(), &mut builder).unwrap();
    assert!(builder.images.is_empty());
}

#[test]
fn test_shared_asset_embedded_once() {
    let doc = Rc::new(FixedDocument::new(vec![Size::new(600.0, 800.0); 2]).unwrap());
    let mut overlay = OverlaySurface::new(doc.clone(), 340.0, 1.0).unwrap();
    let asset = solid_asset(40, 20);
    for page in 0..2 {
        overlay
            .dispatch(Command::PlaceSignature {
                page,
                asset: asset.clone(),
            })
            .unwrap();
    }

    let mut builder = RecordingBuilder::default();
    flatten_into(&overlay, &ExportOptions::default(), &mut builder).unwrap();
    assert_eq!(builder.images.len(), 2);
    assert_eq!(builder.embedded.len(), 1);
    assert_eq!(builder.images[0].1, builder.images[1].1);
}

#[test]
fn test_undrawable_asset_skipped_unless_strict() {
    let (_doc, mut overlay) = half_scale_setup();
    let broken = SignatureAsset::from_pixels(PixelBuffer {
        width: 0,
        height: 0,
        data: Vec::new(),
    });
    overlay
        .dispatch(Command::PlaceSignature {
            page: 0,
            asset: broken,
        })
        .unwrap();
    overlay
        .dispatch(Command::PlaceSignature {
            page: 0,
            asset: solid_asset(8, 8),
        })
        .unwrap();

    let mut builder = RecordingBuilder::default();
    flatten_into(&overlay, &ExportOptions::default(), &mut builder).unwrap();
    // Lenient mode: the broken asset is dropped, the good one survives
    assert_eq!(builder.images.len(), 1);

    let mut strict_builder = RecordingBuilder::default();
    let strict = ExportOptions {
        strict: true,
        ..ExportOptions::default()
    };
    let err = flatten_into(&overlay, &strict, &mut strict_builder);
    assert!(matches!(err, Err(ParaphError::AssetDecode(_))));
}

#[test]
fn test_z_order_preserved_in_draw_calls() {
    let (_doc, mut overlay) = half_scale_setup();
    overlay
        .dispatch(Command::PlaceSignature {
            page: 0,
            asset: solid_asset(10, 10),
        })
        .unwrap();
    overlay
        .dispatch(Command::PlaceSignature {
            page: 0,
            asset: solid_asset(20, 20),
        })
        .unwrap();

    let mut builder = RecordingBuilder::default();
    flatten_into(&overlay, &ExportOptions::default(), &mut builder).unwrap();
    // Bottom-most annotation drawn first
    assert_eq!(builder.embedded[0], (10, 10));
    assert_eq!(builder.embedded[1], (20, 20));
}

#[test]
fn test_full_pdf_export() {
    let (doc, mut overlay) = half_scale_setup();
    overlay
        .dispatch(Command::PlaceSignature {
            page: 0,
            asset: solid_asset(60, 24),
        })
        .unwrap();
    overlay.dispatch(Command::SetTool(Tool::PlaceCheckbox)).unwrap();
    overlay
        .dispatch(Command::PointerDown {
            page: 0,
            pos: Point::new(40.0, 300.0),
        })
        .unwrap();

    let pdf = flatten(doc.as_ref(), &overlay, &ExportOptions::default()).unwrap();
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.starts_with("%PDF-1.7"));
    assert!(text.contains("/Subtype /Image"));
    assert!(text.contains("/MediaBox [0 0 600 800]"));
    assert!(text.ends_with("%%EOF\n"));

    // Output is plain bytes, writable as-is
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&pdf).unwrap();
    assert_eq!(file.as_file().metadata().unwrap().len(), pdf.len() as u64);
}

#[test]
fn test_annotation_free_document_still_exports() {
    let (doc, overlay) = half_scale_setup();
    let pdf = flatten(doc.as_ref(), &overlay, &ExportOptions::default()).unwrap();
    assert!(String::from_utf8_lossy(&pdf).contains("/Count 1"));
}
