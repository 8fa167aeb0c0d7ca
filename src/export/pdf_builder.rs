//! Flattened-output serialization.
//!
//! [`OutputBuilder`] is the seam between the flatten pass and the output
//! format: the pass emits embed/draw calls in document point space and the
//! builder turns them into bytes. The built-in [`PdfBuilder`] writes a
//! self-contained PDF from scratch: a page tree, one Helvetica font,
//! flate-compressed content streams, and RGB image XObjects with soft-mask
//! alpha.
//!
//! ```text
//! %PDF-1.7
//! 1 0 obj  << /Type /Catalog ... >>
//! 2 0 obj  << /Type /Pages ... >>
//! 3 0 obj  << /Type /Font ... >>
//! [image XObjects]
//! [page + content pairs]
//! xref / trailer / startxref
//! %%EOF
//! ```

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::core::document::PixelBuffer;
use crate::core::error::{ParaphError, ParaphResult};
use crate::core::geometry::{PointSpace, Rect, Rgba, Size};
use crate::core::text;

/// Reference to an image embedded in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(usize);

impl ImageHandle {
    /// Mint a handle from a raw index; for alternative builder backends.
    pub fn from_index(index: usize) -> Self {
        ImageHandle(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Receives the flatten pass's draw calls.
///
/// Coordinates are document points with a bottom-left origin. `draw_image`
/// rects give the bottom-left corner and extent; `draw_text` positions the
/// first glyph's baseline origin.
pub trait OutputBuilder {
    /// Embed an RGBA buffer, deduplicated by the caller.
    fn embed_image(&mut self, pixels: &PixelBuffer) -> ParaphResult<ImageHandle>;

    /// Draw an embedded image into a page rect.
    fn draw_image(
        &mut self,
        page: usize,
        handle: ImageHandle,
        rect: Rect<PointSpace>,
    ) -> ParaphResult<()>;

    /// Draw a single line of text at a baseline position.
    fn draw_text(
        &mut self,
        page: usize,
        text: &str,
        x: f64,
        y: f64,
        font_size: f64,
        color: Rgba,
    ) -> ParaphResult<()>;

    /// Serialize the accumulated document.
    fn serialize(&self) -> ParaphResult<Vec<u8>>;
}

struct EmbeddedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    /// Present when any source pixel is translucent.
    alpha: Option<Vec<u8>>,
}

enum ContentOp {
    Image {
        handle: ImageHandle,
        rect: Rect<PointSpace>,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        font_size: f64,
        color: Rgba,
    },
}

/// Builds a new single-layer PDF document.
pub struct PdfBuilder {
    page_sizes: Vec<Size<PointSpace>>,
    images: Vec<EmbeddedImage>,
    content: Vec<Vec<ContentOp>>,
}

impl PdfBuilder {
    pub fn new(page_sizes: Vec<Size<PointSpace>>) -> Self {
        let content = page_sizes.iter().map(|_| Vec::new()).collect();
        PdfBuilder {
            page_sizes,
            images: Vec::new(),
            content,
        }
    }

    fn check_page(&self, page: usize) -> ParaphResult<()> {
        if page >= self.page_sizes.len() {
            return Err(ParaphError::PageOutOfRange {
                page,
                count: self.page_sizes.len(),
            });
        }
        Ok(())
    }

    /// Image handles referenced by a page's content, in first-use order.
    fn used_handles(&self, page: usize) -> Vec<ImageHandle> {
        let mut handles = Vec::new();
        for op in &self.content[page] {
            if let ContentOp::Image { handle, .. } = op {
                if !handles.contains(handle) {
                    handles.push(*handle);
                }
            }
        }
        handles
    }

    fn build_content_stream(&self, page: usize) -> String {
        let mut stream = String::new();
        for op in &self.content[page] {
            match op {
                ContentOp::Image { handle, rect } => {
                    stream.push_str(&format!(
                        "q\n{} 0 0 {} {} {} cm\n/Im{} Do\nQ\n",
                        fmt_num(rect.size.width),
                        fmt_num(rect.size.height),
                        fmt_num(rect.min_x()),
                        fmt_num(rect.min_y()),
                        handle.0,
                    ));
                }
                ContentOp::Text {
                    text,
                    x,
                    y,
                    font_size,
                    color,
                } => {
                    stream.push_str(&format!(
                        "BT\n/F1 {} Tf\n{} {} {} rg\n{} {} Td\n({}) Tj\nET\n",
                        fmt_num(*font_size),
                        fmt_frac(color.r),
                        fmt_frac(color.g),
                        fmt_frac(color.b),
                        fmt_num(*x),
                        fmt_num(*y),
                        escape_pdf_string(text),
                    ));
                }
            }
        }
        stream
    }
}

impl OutputBuilder for PdfBuilder {
    fn embed_image(&mut self, pixels: &PixelBuffer) -> ParaphResult<ImageHandle> {
        if pixels.data.is_empty() || pixels.width == 0 || pixels.height == 0 {
            return Err(ParaphError::AssetDecode("empty image buffer".into()));
        }
        let count = pixels.width as usize * pixels.height as usize;
        let mut rgb = Vec::with_capacity(count * 3);
        let mut alpha = Vec::with_capacity(count);
        let mut translucent = false;
        for px in pixels.data.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
            if px[3] != 255 {
                translucent = true;
            }
        }
        self.images.push(EmbeddedImage {
            width: pixels.width,
            height: pixels.height,
            rgb,
            alpha: translucent.then_some(alpha),
        });
        Ok(ImageHandle(self.images.len() - 1))
    }

    fn draw_image(
        &mut self,
        page: usize,
        handle: ImageHandle,
        rect: Rect<PointSpace>,
    ) -> ParaphResult<()> {
        self.check_page(page)?;
        if handle.0 >= self.images.len() {
            return Err(ParaphError::Export(format!(
                "unknown image handle {}",
                handle.0
            )));
        }
        self.content[page].push(ContentOp::Image { handle, rect });
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: usize,
        text: &str,
        x: f64,
        y: f64,
        font_size: f64,
        color: Rgba,
    ) -> ParaphResult<()> {
        self.check_page(page)?;
        self.content[page].push(ContentOp::Text {
            text: text.to_string(),
            x,
            y,
            font_size,
            color,
        });
        Ok(())
    }

    fn serialize(&self) -> ParaphResult<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n");

        // Object numbers: fixed header objects, then images (plus a soft
        // mask object per translucent image), then page/content pairs.
        const CATALOG: u32 = 1;
        const PAGES: u32 = 2;
        const FONT: u32 = 3;

        let mut next_obj: u32 = 4;
        let mut image_objs: Vec<(u32, Option<u32>)> = Vec::with_capacity(self.images.len());
        for image in &self.images {
            let img_num = next_obj;
            next_obj += 1;
            let mask_num = image.alpha.as_ref().map(|_| {
                let n = next_obj;
                next_obj += 1;
                n
            });
            image_objs.push((img_num, mask_num));
        }
        let mut page_objs: Vec<(u32, u32)> = Vec::with_capacity(self.page_sizes.len());
        for _ in &self.page_sizes {
            page_objs.push((next_obj, next_obj + 1));
            next_obj += 2;
        }
        let total_objects = next_obj;

        let mut offsets: Vec<(u32, u64)> = Vec::new();
        let begin_obj = |buffer: &mut Vec<u8>, offsets: &mut Vec<(u32, u64)>, num: u32| {
            offsets.push((num, buffer.len() as u64));
            let _ = write!(buffer, "{} 0 obj\n", num);
        };

        // Catalog
        begin_obj(&mut buffer, &mut offsets, CATALOG);
        write!(buffer, "<</Type /Catalog /Pages {} 0 R>>\nendobj\n", PAGES)
            .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;

        // Page tree root
        begin_obj(&mut buffer, &mut offsets, PAGES);
        let kids: Vec<String> = page_objs.iter().map(|(p, _)| format!("{} 0 R", p)).collect();
        write!(
            buffer,
            "<</Type /Pages /Kids [{}] /Count {}>>\nendobj\n",
            kids.join(" "),
            self.page_sizes.len()
        )
        .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;

        // Helvetica, one of the standard 14 fonts
        begin_obj(&mut buffer, &mut offsets, FONT);
        buffer.extend_from_slice(
            b"<</Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding>>\nendobj\n",
        );

        // Image XObjects
        for (image, (img_num, mask_num)) in self.images.iter().zip(&image_objs) {
            let rgb = deflate(&image.rgb)?;
            begin_obj(&mut buffer, &mut offsets, *img_num);
            write!(
                buffer,
                "<</Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /Length {}",
                image.width,
                image.height,
                rgb.len()
            )
            .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;
            if let Some(mask) = mask_num {
                write!(buffer, " /SMask {} 0 R", mask)
                    .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;
            }
            buffer.extend_from_slice(b">>\nstream\n");
            buffer.extend_from_slice(&rgb);
            buffer.extend_from_slice(b"\nendstream\nendobj\n");

            if let (Some(mask_num), Some(alpha)) = (mask_num, &image.alpha) {
                let alpha = deflate(alpha)?;
                begin_obj(&mut buffer, &mut offsets, *mask_num);
                write!(
                    buffer,
                    "<</Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode /Length {}>>\nstream\n",
                    image.width,
                    image.height,
                    alpha.len()
                )
                .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;
                buffer.extend_from_slice(&alpha);
                buffer.extend_from_slice(b"\nendstream\nendobj\n");
            }
        }

        // Pages and their content streams
        for (page, ((page_num, content_num), size)) in
            page_objs.iter().zip(&self.page_sizes).enumerate()
        {
            let mut resources = String::from("/Font <</F1 3 0 R>>");
            let used = self.used_handles(page);
            if !used.is_empty() {
                let entries: Vec<String> = used
                    .iter()
                    .map(|h| format!("/Im{} {} 0 R", h.0, image_objs[h.0].0))
                    .collect();
                resources.push_str(&format!(" /XObject <<{}>>", entries.join(" ")));
            }

            begin_obj(&mut buffer, &mut offsets, *page_num);
            write!(
                buffer,
                "<</Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources <<{}>> /Contents {} 0 R>>\nendobj\n",
                PAGES,
                fmt_num(size.width),
                fmt_num(size.height),
                resources,
                content_num
            )
            .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;

            let stream = deflate(self.build_content_stream(page).as_bytes())?;
            begin_obj(&mut buffer, &mut offsets, *content_num);
            write!(
                buffer,
                "<</Length {} /Filter /FlateDecode>>\nstream\n",
                stream.len()
            )
            .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;
            buffer.extend_from_slice(&stream);
            buffer.extend_from_slice(b"\nendstream\nendobj\n");
        }

        // Cross-reference table: one contiguous subsection from object 0.
        let xref_offset = buffer.len() as u64;
        offsets.sort_by_key(|(num, _)| *num);
        write!(buffer, "xref\n0 {}\n", total_objects)
            .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;
        buffer.extend_from_slice(b"0000000000 65535 f \n");
        for (_, offset) in &offsets {
            write!(buffer, "{:010} 00000 n \n", offset)
                .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;
        }

        write!(
            buffer,
            "trailer\n<</Size {} /Root {} 0 R>>\nstartxref\n{}\n%%EOF\n",
            total_objects, CATALOG, xref_offset
        )
        .map_err(|e| ParaphError::Export(format!("write failed: {}", e)))?;

        Ok(buffer)
    }
}

fn deflate(data: &[u8]) -> ParaphResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ParaphError::Export(format!("stream compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| ParaphError::Export(format!("stream compression failed: {}", e)))
}

/// Format a coordinate: integers without a decimal point.
fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.4}", v)
    }
}

/// Format an 8-bit channel as a 0..1 fraction for the `rg` operator.
fn fmt_frac(channel: u8) -> String {
    if channel == 0 {
        "0".to_string()
    } else if channel == 255 {
        "1".to_string()
    } else {
        format!("{:.4}", channel as f64 / 255.0)
    }
}

/// Escape a literal string for parenthesized PDF syntax.
///
/// Characters are mapped to the WinAnsi encoding the font declares;
/// non-ASCII code points become octal escapes and unmappable characters are
/// substituted with `?`. Pushing raw UTF-8 bytes here would re-encode each
/// one as its own WinAnsi character.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let byte = text::win_ansi_byte(c).unwrap_or(b'?');
        match byte {
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(byte as char),
            _ => out.push_str(&format!("\\{:03o}", byte)),
        }
    }
    out
}
