//! Annotation model.
//!
//! A per-page ordered collection of annotation objects. Sequence order is
//! z-order: later entries render on top and are hit-tested first. All
//! positions and scales live in display space (CSS pixels, origin top-left,
//! Y down) — the opposite vertical convention from document point space,
//! which is the central fact the flatten engine reconciles.

use std::rc::Rc;

use crate::core::error::{ParaphError, ParaphResult};
use crate::core::geometry::{DisplaySpace, Point, Rect, Rgba, Size};
use crate::core::text;
use crate::ink::outline::InkOutline;

/// Nominal unscaled checkbox glyph box, in display pixels.
pub const CHECKBOX_BASE_SIZE: f64 = 30.0;

/// Stable identifier for an annotation within its page model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(u64);

impl AnnotationId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A finalized signature rendered to a reusable pixel source.
///
/// Immutable once created; may be instantiated as many independent image
/// annotations across pages, each owning its own position and scale.
#[derive(Debug, Clone)]
pub struct SignatureAsset {
    pixels: crate::core::document::PixelBuffer,
}

impl SignatureAsset {
    /// Wrap a raw RGBA buffer.
    pub fn from_pixels(pixels: crate::core::document::PixelBuffer) -> Rc<Self> {
        Rc::new(SignatureAsset { pixels })
    }

    /// Decode an uploaded image (PNG or JPEG) into an asset.
    pub fn from_encoded(bytes: &[u8]) -> ParaphResult<Rc<Self>> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ParaphError::AssetDecode(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels =
            crate::core::document::PixelBuffer::from_rgba(width, height, rgba.into_raw())?;
        Ok(Rc::new(SignatureAsset { pixels }))
    }

    pub fn pixels(&self) -> &crate::core::document::PixelBuffer {
        &self.pixels
    }

    /// Natural size in display pixels (1 source pixel = 1 CSS px at scale 1).
    pub fn natural_size(&self) -> Size<DisplaySpace> {
        Size::new(self.pixels.width as f64, self.pixels.height as f64)
    }
}

/// Visual state of a checkbox annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckboxState {
    Unmarked,
    Checked,
    Crossed,
}

/// The fixed cycle a checkbox toggles through.
///
/// Source variants of this behavior disagreed on whether "unmarked" is
/// reachable by toggling, so the cycle is configurable rather than
/// hard-coded; the default includes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxCycle {
    states: Vec<CheckboxState>,
}

impl Default for CheckboxCycle {
    fn default() -> Self {
        CheckboxCycle {
            states: vec![
                CheckboxState::Unmarked,
                CheckboxState::Checked,
                CheckboxState::Crossed,
            ],
        }
    }
}

impl CheckboxCycle {
    /// Build a cycle from a non-empty state list.
    pub fn new(states: Vec<CheckboxState>) -> ParaphResult<Self> {
        if states.is_empty() {
            return Err(ParaphError::Generic("checkbox cycle cannot be empty".into()));
        }
        Ok(CheckboxCycle { states })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn state_at(&self, index: usize) -> CheckboxState {
        self.states[index % self.states.len()]
    }
}

/// The variant payload of an annotation.
#[derive(Debug, Clone)]
pub enum AnnotationKind {
    Text {
        font_size: f64,
        color: Rgba,
        content: String,
    },
    Image {
        asset: Rc<SignatureAsset>,
    },
    Checkbox {
        cycle: CheckboxCycle,
        /// Index into the cycle; the visible state is `cycle.state_at(state_index)`.
        state_index: usize,
    },
    Ink {
        outline: InkOutline,
        fill: Rgba,
    },
}

/// An annotation object positioned on a page.
#[derive(Debug, Clone)]
pub struct Annotation {
    id: AnnotationId,
    /// Top-left anchor in display space.
    pub position: Point<DisplaySpace>,
    /// Uniform scale applied to the natural size.
    pub scale: f64,
    /// Rotation about the bounding-box center, radians.
    pub rotation: f64,
    /// Invisible annotations are skipped on export, never on z-order grounds.
    pub visible: bool,
    pub kind: AnnotationKind,
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    /// Axis-aligned bounding box in display space, ignoring rotation.
    ///
    /// Rotation is applied about the box center, so the unrotated box is the
    /// anchor geometry for both hit-testing (which inverse-rotates the probe
    /// point) and export.
    pub fn display_bounds(&self) -> Rect<DisplaySpace> {
        let size = match &self.kind {
            AnnotationKind::Text {
                font_size, content, ..
            } => text::measure_text(content, *font_size).scaled(self.scale),
            AnnotationKind::Image { asset } => asset.natural_size().scaled(self.scale),
            AnnotationKind::Checkbox { .. } => {
                Size::new(CHECKBOX_BASE_SIZE, CHECKBOX_BASE_SIZE).scaled(self.scale)
            }
            AnnotationKind::Ink { outline, .. } => outline.bounds().size.scaled(self.scale),
        };
        Rect::new(self.position, size)
    }

    /// Advance a checkbox to its next cycle state, preserving the transform.
    ///
    /// No-op for other variants.
    pub fn toggle_checkbox(&mut self) {
        if let AnnotationKind::Checkbox { cycle, state_index } = &mut self.kind {
            *state_index = (*state_index + 1) % cycle.len();
        }
    }

    /// Current checkbox state, if this is a checkbox.
    pub fn checkbox_state(&self) -> Option<CheckboxState> {
        match &self.kind {
            AnnotationKind::Checkbox { cycle, state_index } => Some(cycle.state_at(*state_index)),
            _ => None,
        }
    }
}

/// An incremental move/scale/rotate applied to an annotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutateDelta {
    pub translate_x: f64,
    pub translate_y: f64,
    /// Multiplicative; `1.0` leaves the scale unchanged.
    pub scale_factor: f64,
    /// Additive, radians.
    pub rotate: f64,
}

impl Default for MutateDelta {
    fn default() -> Self {
        MutateDelta {
            translate_x: 0.0,
            translate_y: 0.0,
            scale_factor: 1.0,
            rotate: 0.0,
        }
    }
}

impl MutateDelta {
    pub fn translate(dx: f64, dy: f64) -> Self {
        MutateDelta {
            translate_x: dx,
            translate_y: dy,
            ..Default::default()
        }
    }

    pub fn rescale(factor: f64) -> Self {
        MutateDelta {
            scale_factor: factor,
            ..Default::default()
        }
    }

    pub fn rotate(radians: f64) -> Self {
        MutateDelta {
            rotate: radians,
            ..Default::default()
        }
    }
}

/// The ordered annotation collection of one page.
///
/// Zero or one annotation may be active (selected) per page.
#[derive(Debug, Clone, Default)]
pub struct PageAnnotations {
    items: Vec<Annotation>,
    active: Option<AnnotationId>,
    next_id: u64,
}

impl PageAnnotations {
    pub fn new() -> Self {
        PageAnnotations::default()
    }

    /// Append an annotation on top of the z-order and return its id.
    pub fn add(
        &mut self,
        position: Point<DisplaySpace>,
        scale: f64,
        kind: AnnotationKind,
    ) -> AnnotationId {
        self.next_id += 1;
        let id = AnnotationId(self.next_id);
        self.items.push(Annotation {
            id,
            position,
            scale,
            rotation: 0.0,
            visible: true,
            kind,
        });
        id
    }

    /// Remove an annotation; clears the selection if it was active.
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        let before = self.items.len();
        self.items.retain(|a| a.id != id);
        if self.active == Some(id) {
            self.active = None;
        }
        self.items.len() != before
    }

    pub fn set_active(&mut self, id: AnnotationId) -> bool {
        if self.items.iter().any(|a| a.id == id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<AnnotationId> {
        self.active
    }

    /// Apply a move/scale/rotate delta.
    pub fn mutate(&mut self, id: AnnotationId, delta: MutateDelta) -> ParaphResult<()> {
        let annotation = self
            .get_mut(id)
            .ok_or_else(|| ParaphError::Generic(format!("no annotation with id {}", id.0)))?;
        annotation.position = annotation
            .position
            .translated(delta.translate_x, delta.translate_y);
        if delta.scale_factor.is_finite() && delta.scale_factor > 0.0 {
            annotation.scale *= delta.scale_factor;
        }
        annotation.rotation += delta.rotate;
        Ok(())
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.items.iter_mut().find(|a| a.id == id)
    }

    /// Annotations in z-order, bottom first.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    /// Annotations topmost-first, the hit-testing order.
    pub fn iter_topmost_first(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
