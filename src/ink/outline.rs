//! Stroke-to-outline vectorization.
//!
//! Converts a time-ordered, pressure-weighted polyline into a closed outline
//! polygon suitable for solid fill. Raw samples are low-pass filtered to
//! suppress pointer jitter, then a variable-width ribbon is swept along the
//! filtered path: width follows pressure (recorded or speed-synthesized) and
//! tapers toward both ends, giving a hand-written appearance instead of a
//! uniform-width ribbon.
//!
//! Outline generation is a pure function of the sample sequence and the
//! style parameters; replaying identical samples yields an identical
//! outline.

use std::f64::consts::PI;

use crate::core::geometry::{DisplaySpace, Point, Rect};
use crate::ink::stroke::StrokeSample;

/// Consecutive filtered points closer than this are merged.
const MIN_POINT_DISTANCE: f64 = 0.1;

/// Minimum half-width of the ribbon before tapering.
const MIN_RADIUS: f64 = 0.25;

/// Segments used to approximate each semicircular end cap.
const CAP_SEGMENTS: usize = 8;

/// Fixed style parameters of the vectorizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    /// Full ribbon width at maximum pressure, display px.
    pub size: f64,
    /// How strongly pressure thins the ribbon, `0..=1`.
    pub thinning: f64,
    /// Low-pass filter strength, `0..=1`; higher lags harder behind the
    /// pointer.
    pub streamline: f64,
    /// Arc length over which the start of the stroke tapers in, px.
    pub taper_start: f64,
    /// Arc length over which the end of the stroke tapers out, px.
    pub taper_end: f64,
    /// Synthesize pressure from pointer speed for samples that report none
    /// (pressure 0). Recorded pressure always takes precedence.
    pub simulate_pressure: bool,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        StrokeStyle {
            size: 4.0,
            thinning: 0.5,
            streamline: 0.35,
            taper_start: 12.0,
            taper_end: 12.0,
            simulate_pressure: true,
        }
    }
}

/// A closed outline polygon in display space, wound for nonzero fill.
#[derive(Debug, Clone, PartialEq)]
pub struct InkOutline {
    points: Vec<Point<DisplaySpace>>,
}

impl InkOutline {
    pub fn points(&self) -> &[Point<DisplaySpace>] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounds of the outline.
    pub fn bounds(&self) -> Rect<DisplaySpace> {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if self.points.is_empty() {
            return Rect::from_xywh(0.0, 0.0, 0.0, 0.0);
        }
        Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[derive(Debug, Clone, Copy)]
struct FilteredPoint {
    x: f64,
    y: f64,
    pressure: f64,
    /// Distance from the previous filtered point.
    segment_len: f64,
}

/// Low-pass filter the raw samples.
///
/// Each accepted point is pulled toward the previous filtered position by
/// the streamline factor, and near-duplicate points are merged so direction
/// vectors stay well-defined.
fn filter_samples(samples: &[StrokeSample], style: &StrokeStyle) -> Vec<FilteredPoint> {
    let catch_up = (1.0 - style.streamline).clamp(0.15, 1.0);
    let mut filtered: Vec<FilteredPoint> = Vec::with_capacity(samples.len());

    for sample in samples {
        let pressure = sample.pressure.clamp(0.0, 1.0);
        match filtered.last() {
            None => filtered.push(FilteredPoint {
                x: sample.x,
                y: sample.y,
                pressure,
                segment_len: 0.0,
            }),
            Some(prev) => {
                let x = prev.x + (sample.x - prev.x) * catch_up;
                let y = prev.y + (sample.y - prev.y) * catch_up;
                let dx = x - prev.x;
                let dy = y - prev.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < MIN_POINT_DISTANCE {
                    continue;
                }
                let p = prev.pressure + (pressure - prev.pressure) * catch_up;
                filtered.push(FilteredPoint {
                    x,
                    y,
                    pressure: p,
                    segment_len: dist,
                });
            }
        }
    }

    filtered
}

/// Effective pressure per point.
///
/// Recorded pressure wins when the sample reports one. Unreported samples
/// (pressure 0) fall back to speed synthesis when enabled: fast segments
/// thin the ribbon and slow ones thicken it, smoothed against the previous
/// value so speed spikes do not produce bulges.
fn effective_pressures(points: &[FilteredPoint], style: &StrokeStyle) -> Vec<f64> {
    let mut pressures = Vec::with_capacity(points.len());
    let mut prev: f64 = 0.5;
    for point in points {
        let p = if point.pressure > 0.0 {
            point.pressure
        } else if style.simulate_pressure {
            let speed = (point.segment_len / style.size.max(0.1)).min(1.0);
            let target = 1.0 - speed;
            prev + (target - prev) * (speed / 2.0).max(0.1)
        } else {
            0.5
        };
        let p = p.clamp(0.0, 1.0);
        pressures.push(p);
        prev = p;
    }
    pressures
}

fn rotate(x: f64, y: f64, angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Generate the closed outline polygon for a sample sequence.
///
/// Returns `None` for fewer than two samples, or when filtering collapses
/// the gesture below a drawable length (a sub-pixel jitter "drag").
pub fn outline_stroke(samples: &[StrokeSample], style: &StrokeStyle) -> Option<InkOutline> {
    if samples.len() < 2 {
        return None;
    }

    let points = filter_samples(samples, style);
    if points.len() < 2 {
        return None;
    }

    let pressures = effective_pressures(&points, style);

    // Arc length from the start, per point.
    let mut arc: Vec<f64> = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for point in &points {
        total += point.segment_len;
        arc.push(total);
    }

    // Half-width per point: pressure thinning, then end tapers.
    let mut radii: Vec<f64> = Vec::with_capacity(points.len());
    for i in 0..points.len() {
        let mut radius = if style.thinning > 0.0 {
            (style.size / 2.0) * (1.0 - style.thinning * (1.0 - pressures[i]))
        } else {
            style.size / 2.0
        };
        radius = radius.max(MIN_RADIUS);

        if style.taper_start > 0.0 {
            radius *= (arc[i] / style.taper_start).min(1.0);
        }
        if style.taper_end > 0.0 {
            radius *= ((total - arc[i]) / style.taper_end).min(1.0);
        }
        radii.push(radius.max(0.01));
    }

    // Per-point direction by central difference, then the left/right offset
    // rails.
    let n = points.len();
    let mut left: Vec<Point<DisplaySpace>> = Vec::with_capacity(n);
    let mut right: Vec<Point<DisplaySpace>> = Vec::with_capacity(n);
    let mut dirs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for i in 0..n {
        let (ax, ay) = if i == 0 {
            (points[0].x, points[0].y)
        } else {
            (points[i - 1].x, points[i - 1].y)
        };
        let (bx, by) = if i == n - 1 {
            (points[n - 1].x, points[n - 1].y)
        } else {
            (points[i + 1].x, points[i + 1].y)
        };
        let dx = bx - ax;
        let dy = by - ay;
        let len = (dx * dx + dy * dy).sqrt();
        let dir = if len < 1e-12 {
            // Degenerate; inherit the previous direction.
            *dirs.last().unwrap_or(&(1.0, 0.0))
        } else {
            (dx / len, dy / len)
        };
        dirs.push(dir);

        let perp = (-dir.1, dir.0);
        left.push(Point::new(
            points[i].x + perp.0 * radii[i],
            points[i].y + perp.1 * radii[i],
        ));
        right.push(Point::new(
            points[i].x - perp.0 * radii[i],
            points[i].y - perp.1 * radii[i],
        ));
    }

    // Assemble: left rail forward, end cap, right rail backward, start cap.
    let mut outline: Vec<Point<DisplaySpace>> = Vec::with_capacity(2 * n + 2 * CAP_SEGMENTS);
    outline.extend_from_slice(&left);

    let last = &points[n - 1];
    let end_perp = (-dirs[n - 1].1, dirs[n - 1].0);
    for k in 1..CAP_SEGMENTS {
        let angle = -PI * k as f64 / CAP_SEGMENTS as f64;
        let (vx, vy) = rotate(end_perp.0, end_perp.1, angle);
        outline.push(Point::new(
            last.x + vx * radii[n - 1],
            last.y + vy * radii[n - 1],
        ));
    }

    for p in right.iter().rev() {
        outline.push(*p);
    }

    let first = &points[0];
    let start_neg_perp = (dirs[0].1, -dirs[0].0);
    for k in 1..CAP_SEGMENTS {
        let angle = -PI * k as f64 / CAP_SEGMENTS as f64;
        let (vx, vy) = rotate(start_neg_perp.0, start_neg_perp.1, angle);
        outline.push(Point::new(first.x + vx * radii[0], first.y + vy * radii[0]));
    }

    if outline.len() < 3 {
        return None;
    }
    Some(InkOutline { points: outline })
}
