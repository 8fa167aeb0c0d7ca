//! Overlay commands.
//!
//! Every user interaction reaches the overlay as one value of [`Command`],
//! dispatched through a single match. New interactions are added as new
//! variants, not as new entry points.

use std::rc::Rc;

use crate::core::annotation::{AnnotationId, MutateDelta, SignatureAsset};
use crate::core::geometry::{DisplaySpace, Point};

/// The active pointer tool.
///
/// Placement tools are one-shot: a successful placement reverts to
/// [`Tool::Select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    PlaceText,
    PlaceCheckbox,
}

/// One user interaction with the overlay.
#[derive(Debug, Clone)]
pub enum Command {
    /// Switch the active tool.
    SetTool(Tool),
    /// Pointer pressed at a page-local display position.
    PointerDown {
        page: usize,
        pos: Point<DisplaySpace>,
    },
    /// Pointer moved while pressed.
    PointerDrag {
        page: usize,
        pos: Point<DisplaySpace>,
    },
    /// Pointer released.
    PointerUp,
    /// Double-click/tap: toggles a checkbox or opens a text annotation for
    /// editing.
    DoubleActivate {
        page: usize,
        pos: Point<DisplaySpace>,
    },
    /// Instantiate a finalized signature on a page at the standard insertion
    /// point.
    PlaceSignature {
        page: usize,
        asset: Rc<SignatureAsset>,
    },
    /// Drop an uploaded image at a pointer position.
    DropAsset {
        page: usize,
        pos: Point<DisplaySpace>,
        asset: Rc<SignatureAsset>,
    },
    /// Delete the active annotation on whichever page holds one.
    DeleteActive,
    /// Move/scale/rotate the active annotation (resize and rotate handles).
    MutateActive(MutateDelta),
    /// Replace the content of the text annotation being edited.
    SetTextContent(String),
    /// Begin editing a text annotation.
    BeginTextEdit { page: usize, id: AnnotationId },
    /// Finish the active text edit.
    EndTextEdit,
    /// User zoom changed.
    SetZoom(f64),
    /// The layout container width changed.
    ContainerResized(f64),
}
