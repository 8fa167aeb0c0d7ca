//! Stroke capture.
//!
//! A stroke is ephemeral: it exists only between pointer-down and pointer-up
//! and is owned exclusively by the recorder. On gesture end it is converted
//! into an immutable outline or discarded.

use smallvec::SmallVec;

use crate::ink::outline::{outline_stroke, InkOutline, StrokeStyle};

/// One raw pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeSample {
    /// Display-space position.
    pub x: f64,
    pub y: f64,
    /// Recorded pointer pressure in `0..=1`; `0` means "not reported".
    pub pressure: f64,
    /// Milliseconds since an arbitrary epoch.
    pub time_ms: f64,
}

impl StrokeSample {
    pub fn new(x: f64, y: f64, pressure: f64, time_ms: f64) -> Self {
        StrokeSample {
            x,
            y,
            pressure,
            time_ms,
        }
    }
}

/// Records the sample sequence of the active pointer gesture.
///
/// Extension is synchronous and performs no I/O; it must complete before the
/// next animation frame. `current_outline` supports incremental re-render of
/// the in-progress stroke after every extension.
#[derive(Debug, Clone)]
pub struct StrokeRecorder {
    samples: SmallVec<[StrokeSample; 64]>,
    style: StrokeStyle,
    active: bool,
}

impl Default for StrokeRecorder {
    fn default() -> Self {
        StrokeRecorder::new(StrokeStyle::default())
    }
}

impl StrokeRecorder {
    pub fn new(style: StrokeStyle) -> Self {
        StrokeRecorder {
            samples: SmallVec::new(),
            style,
            active: false,
        }
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start a new stroke at the given sample, discarding any previous one.
    pub fn begin(&mut self, sample: StrokeSample) {
        self.samples.clear();
        self.samples.push(sample);
        self.active = true;
    }

    /// Append one sample to the active stroke. Ignored when no stroke is
    /// active (a stray move event after pointer-up).
    pub fn extend(&mut self, sample: StrokeSample) {
        if self.active {
            self.samples.push(sample);
        }
    }

    /// Append a batch of coalesced samples.
    ///
    /// Input events may deliver several buffered points per event during
    /// fast motion; accepting them all avoids dropped samples.
    pub fn extend_batch(&mut self, samples: &[StrokeSample]) {
        if self.active {
            self.samples.extend_from_slice(samples);
        }
    }

    /// Outline of the stroke captured so far, for live preview.
    pub fn current_outline(&self) -> Option<InkOutline> {
        outline_stroke(&self.samples, &self.style)
    }

    /// Finish the stroke and produce its outline.
    ///
    /// Zero or one sample yields `None`: a tap produces no visible mark.
    pub fn end(&mut self) -> Option<InkOutline> {
        self.active = false;
        let outline = outline_stroke(&self.samples, &self.style);
        self.samples.clear();
        outline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_yields_nothing() {
        let mut recorder = StrokeRecorder::default();
        recorder.begin(StrokeSample::new(10.0, 10.0, 0.5, 0.0));
        assert!(recorder.end().is_none());
    }

    #[test]
    fn test_extend_ignored_when_inactive() {
        let mut recorder = StrokeRecorder::default();
        recorder.extend(StrokeSample::new(1.0, 1.0, 0.5, 0.0));
        assert!(recorder.current_outline().is_none());
    }

    #[test]
    fn test_drag_yields_outline() {
        let mut recorder = StrokeRecorder::default();
        recorder.begin(StrokeSample::new(0.0, 0.0, 0.5, 0.0));
        for i in 1..20 {
            recorder.extend(StrokeSample::new(i as f64 * 4.0, 0.0, 0.5, i as f64 * 8.0));
        }
        let outline = recorder.end().expect("drag should produce an outline");
        assert!(outline.points().len() >= 3);
        // Recorder is reusable afterwards
        recorder.begin(StrokeSample::new(0.0, 0.0, 0.5, 0.0));
        assert!(recorder.is_active());
    }

    #[test]
    fn test_batch_extension_matches_singles() {
        let samples: Vec<StrokeSample> = (0..16)
            .map(|i| StrokeSample::new(i as f64 * 3.0, (i % 4) as f64, 0.6, i as f64 * 8.0))
            .collect();

        let mut one = StrokeRecorder::default();
        one.begin(samples[0]);
        for s in &samples[1..] {
            one.extend(*s);
        }

        let mut batched = StrokeRecorder::default();
        batched.begin(samples[0]);
        batched.extend_batch(&samples[1..]);

        assert_eq!(one.end(), batched.end());
    }
}
