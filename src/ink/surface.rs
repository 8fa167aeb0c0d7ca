//! Signature composition surface.
//!
//! Multiple committed strokes compose into one signature. The surface owns
//! the active recorder plus the committed outlines; re-tinting updates every
//! committed stroke, not just future ones.

use crate::core::geometry::{DisplaySpace, Rect, Rgba};
use crate::ink::outline::{InkOutline, StrokeStyle};
use crate::ink::stroke::{StrokeRecorder, StrokeSample};

/// A finished stroke held by the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedStroke {
    pub outline: InkOutline,
    pub fill: Rgba,
}

/// The drawing pad a signature is authored on.
#[derive(Debug, Clone)]
pub struct SignatureSurface {
    recorder: StrokeRecorder,
    strokes: Vec<CommittedStroke>,
    color: Rgba,
}

impl Default for SignatureSurface {
    fn default() -> Self {
        SignatureSurface::new(StrokeStyle::default(), Rgba::BLACK)
    }
}

impl SignatureSurface {
    pub fn new(style: StrokeStyle, color: Rgba) -> Self {
        SignatureSurface {
            recorder: StrokeRecorder::new(style),
            strokes: Vec::new(),
            color,
        }
    }

    pub fn begin_stroke(&mut self, sample: StrokeSample) {
        self.recorder.begin(sample);
    }

    pub fn extend_stroke(&mut self, sample: StrokeSample) {
        self.recorder.extend(sample);
    }

    pub fn extend_stroke_batch(&mut self, samples: &[StrokeSample]) {
        self.recorder.extend_batch(samples);
    }

    /// Preview outline of the in-progress stroke.
    pub fn preview(&self) -> Option<InkOutline> {
        self.recorder.current_outline()
    }

    /// Finish the active stroke, committing it if it produced an outline.
    pub fn end_stroke(&mut self) -> Option<&CommittedStroke> {
        let outline = self.recorder.end()?;
        self.strokes.push(CommittedStroke {
            outline,
            fill: self.color,
        });
        self.strokes.last()
    }

    /// Re-tint the signature. Applies to all previously committed strokes
    /// as well as strokes committed afterwards.
    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
        for stroke in &mut self.strokes {
            stroke.fill = color;
        }
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.recorder.end();
    }

    pub fn strokes(&self) -> &[CommittedStroke] {
        &self.strokes
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Union of all committed outline bounds; `None` while empty.
    pub fn bounds(&self) -> Option<Rect<DisplaySpace>> {
        let mut iter = self.strokes.iter();
        let first = iter.next()?.outline.bounds();
        Some(iter.fold(first, |acc, s| acc.union(&s.outline.bounds())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_line(surface: &mut SignatureSurface, y: f64) {
        surface.begin_stroke(StrokeSample::new(0.0, y, 0.5, 0.0));
        for i in 1..12 {
            surface.extend_stroke(StrokeSample::new(i as f64 * 6.0, y, 0.5, i as f64 * 8.0));
        }
        assert!(surface.end_stroke().is_some());
    }

    #[test]
    fn test_compose_and_bounds() {
        let mut surface = SignatureSurface::default();
        assert!(surface.bounds().is_none());
        draw_line(&mut surface, 10.0);
        draw_line(&mut surface, 40.0);
        assert_eq!(surface.strokes().len(), 2);
        let bounds = surface.bounds().unwrap();
        assert!(bounds.size.height > 25.0);
    }

    #[test]
    fn test_retint_covers_committed_strokes() {
        let mut surface = SignatureSurface::default();
        draw_line(&mut surface, 10.0);
        let blue = Rgba::from_hex("#2563eb");
        surface.set_color(blue);
        draw_line(&mut surface, 30.0);
        assert!(surface.strokes().iter().all(|s| s.fill == blue));
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut surface = SignatureSurface::default();
        draw_line(&mut surface, 10.0);
        surface.begin_stroke(StrokeSample::new(0.0, 0.0, 0.5, 0.0));
        surface.clear();
        assert!(surface.is_empty());
        assert!(surface.preview().is_none());
    }
}
