//! Typed coordinate spaces and geometric primitives.
//!
//! The pipeline moves positions between three coordinate systems that are
//! numerically interchangeable but semantically incompatible:
//!
//! - [`DisplaySpace`]: on-screen logical CSS pixels, origin top-left, Y down.
//!   Annotation positions are stored in this space.
//! - [`PointSpace`]: the document's native points, origin bottom-left, Y up.
//!   The flatten engine emits draw commands in this space.
//! - [`DeviceSpace`]: backing raster pixels, `display × devicePixelRatio × zoom`.
//!
//! Mixing these up was the largest source of subtle bugs in earlier versions
//! of this pipeline, so each space is a distinct type parameter and a value
//! cannot cross spaces without an explicit conversion (see
//! [`PageViewport`](crate::core::viewport::PageViewport)).

use std::fmt;
use std::marker::PhantomData;

/// Marker trait for coordinate space tags.
pub trait CoordinateSpace: Copy + Clone + PartialEq + fmt::Debug + 'static {}

/// On-screen logical coordinate space (CSS pixels, origin top-left, Y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySpace;

/// Document-native point space (origin bottom-left, Y up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointSpace;

/// Backing raster buffer space (device pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpace;

impl CoordinateSpace for DisplaySpace {}
impl CoordinateSpace for PointSpace {}
impl CoordinateSpace for DeviceSpace {}

/// A point tagged with its coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<S: CoordinateSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<S>,
}

impl<S: CoordinateSpace> Point<S> {
    pub fn new(x: f64, y: f64) -> Self {
        Point {
            x,
            y,
            _space: PhantomData,
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Distance to another point in the same space.
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A width/height pair tagged with its coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size<S: CoordinateSpace> {
    pub width: f64,
    pub height: f64,
    _space: PhantomData<S>,
}

impl<S: CoordinateSpace> Size<S> {
    pub fn new(width: f64, height: f64) -> Self {
        Size {
            width,
            height,
            _space: PhantomData,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Size::new(self.width * factor, self.height * factor)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An axis-aligned rectangle tagged with its coordinate space.
///
/// `origin` is the corner nearest the space's origin convention: for
/// [`DisplaySpace`] that is the top-left corner, for [`PointSpace`] the
/// bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<S: CoordinateSpace> {
    pub origin: Point<S>,
    pub size: Size<S>,
}

impl<S: CoordinateSpace> Rect<S> {
    pub fn new(origin: Point<S>, size: Size<S>) -> Self {
        Rect { origin, size }
    }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn center(&self) -> Point<S> {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn contains(&self, p: Point<S>) -> bool {
        p.x >= self.min_x() && p.x <= self.max_x() && p.y >= self.min_y() && p.y <= self.max_y()
    }

    pub fn union(&self, other: &Self) -> Self {
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Rect::new(self.origin.translated(dx, dy), self.size)
    }
}

/// An RGBA color with 8-bit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    /// Parse a `#rrggbb` or `#rrggbbaa` hex color, with or without the `#`.
    ///
    /// Returns black for malformed input rather than failing; color parsing
    /// is never on a correctness-critical path.
    pub fn from_hex(hex: &str) -> Self {
        let trimmed = hex.strip_prefix('#').unwrap_or(hex);
        let parse = |range: std::ops::Range<usize>| {
            trimmed
                .get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        };
        match trimmed.len() {
            6 => match (parse(0..2), parse(2..4), parse(4..6)) {
                (Some(r), Some(g), Some(b)) => Rgba::new(r, g, b, 255),
                _ => Rgba::BLACK,
            },
            8 => match (parse(0..2), parse(2..4), parse(4..6), parse(6..8)) {
                (Some(r), Some(g), Some(b), Some(a)) => Rgba::new(r, g, b, a),
                _ => Rgba::BLACK,
            },
            _ => Rgba::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains() {
        let rect: Rect<DisplaySpace> = Rect::from_xywh(10.0, 20.0, 100.0, 50.0);
        assert!(rect.contains(Point::new(10.0, 20.0)));
        assert!(rect.contains(Point::new(110.0, 70.0)));
        assert!(!rect.contains(Point::new(9.9, 20.0)));
        assert!(!rect.contains(Point::new(50.0, 70.1)));
    }

    #[test]
    fn test_rect_union() {
        let a: Rect<DisplaySpace> = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_xywh(5.0, 5.0, 20.0, 3.0);
        let u = a.union(&b);
        assert_eq!(u.min_x(), 0.0);
        assert_eq!(u.min_y(), 0.0);
        assert_eq!(u.max_x(), 25.0);
        assert_eq!(u.max_y(), 10.0);
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(Rgba::from_hex("#2563eb"), Rgba::new(0x25, 0x63, 0xeb, 255));
        assert_eq!(Rgba::from_hex("000000"), Rgba::BLACK);
        assert_eq!(
            Rgba::from_hex("#11223344"),
            Rgba::new(0x11, 0x22, 0x33, 0x44)
        );
        // Malformed input falls back to black
        assert_eq!(Rgba::from_hex("#zzz"), Rgba::BLACK);
    }

    #[test]
    fn test_point_distance() {
        let a: Point<DisplaySpace> = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
