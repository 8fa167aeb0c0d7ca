//! Interactive overlay state.
//!
//! The overlay owns the per-page viewports, the per-page annotation
//! collections, the tool mode, and the render queue. All interaction arrives
//! through [`OverlaySurface::dispatch`]; the surface never reaches out to a
//! UI layer, it only returns the render tickets the caller must service.
//!
//! Positions handed to the surface are page-local display coordinates;
//! [`OverlaySurface::client_to_page`] performs the client-to-page translation
//! for callers that track page origins in a scroll container.

use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::core::annotation::{
    Annotation, AnnotationId, AnnotationKind, CheckboxCycle, MutateDelta, PageAnnotations,
};
use crate::core::document::SourceDocument;
use crate::core::error::{ParaphError, ParaphResult};
use crate::core::geometry::{DisplaySpace, Point, Rgba};
use crate::core::viewport::{compute_viewport, PageViewport};
use crate::overlay::command::{Command, Tool};
use crate::overlay::render_queue::{RenderQueue, RenderTicket};

/// Font size for newly placed text annotations, display px.
const TEXT_DEFAULT_FONT_SIZE: f64 = 20.0;

/// Maximum display width a dropped image is scaled down to.
const STAMP_MAX_WIDTH: f64 = 150.0;

/// Standard insertion point for a placed signature.
const SIGNATURE_INSERT: (f64, f64) = (100.0, 100.0);

/// Initial scale for a placed signature.
const SIGNATURE_SCALE: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
struct DragState {
    page: usize,
    id: AnnotationId,
    last: Point<DisplaySpace>,
}

/// The overlay of one open document.
pub struct OverlaySurface {
    document: Rc<dyn SourceDocument>,
    viewports: FxHashMap<usize, PageViewport>,
    pages: FxHashMap<usize, PageAnnotations>,
    queue: RenderQueue,
    tool: Tool,
    drag: Option<DragState>,
    editing_text: Option<(usize, AnnotationId)>,
    container_width: f64,
    device_pixel_ratio: f64,
    zoom: f64,
}

impl OverlaySurface {
    /// Build the overlay for a document, computing every page viewport.
    pub fn new(
        document: Rc<dyn SourceDocument>,
        container_width: f64,
        device_pixel_ratio: f64,
    ) -> ParaphResult<Self> {
        let mut surface = OverlaySurface {
            document,
            viewports: FxHashMap::default(),
            pages: FxHashMap::default(),
            queue: RenderQueue::new(),
            tool: Tool::Select,
            drag: None,
            editing_text: None,
            container_width,
            device_pixel_ratio,
            zoom: 1.0,
        };
        surface.recompute_viewports()?;
        Ok(surface)
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn viewport(&self, page: usize) -> Option<&PageViewport> {
        self.viewports.get(&page)
    }

    /// Annotation collection of a page, if the page has ever held one.
    pub fn annotations(&self, page: usize) -> Option<&PageAnnotations> {
        self.pages.get(&page)
    }

    /// Mutable annotation access, for model edits outside the command set
    /// (visibility toggles, programmatic transforms).
    pub fn annotations_mut(&mut self, page: usize) -> Option<&mut PageAnnotations> {
        self.pages.get_mut(&page)
    }

    /// Pages that carry annotations, with their collections.
    pub fn annotated_pages(&self) -> impl Iterator<Item = (usize, &PageAnnotations)> {
        self.pages.iter().map(|(page, items)| (*page, items))
    }

    /// The text annotation currently being edited, if any.
    pub fn editing_text(&self) -> Option<(usize, AnnotationId)> {
        self.editing_text
    }

    /// Translate a client (scroll-container) position into a page-local one.
    pub fn client_to_page(
        client: Point<DisplaySpace>,
        page_origin: Point<DisplaySpace>,
    ) -> Point<DisplaySpace> {
        Point::new(client.x - page_origin.x, client.y - page_origin.y)
    }

    /// Issue render tickets for every page at its current render scale.
    ///
    /// Call once after construction to kick off the initial rasterization;
    /// zoom and resize dispatches reissue tickets on their own. Any
    /// in-flight tickets are superseded.
    pub fn request_renders(&mut self) -> Vec<RenderTicket> {
        self.reissue_renders()
    }

    /// Record a completed render from a previously issued ticket.
    pub fn complete_render(
        &mut self,
        ticket: &RenderTicket,
        pixels: crate::core::document::PixelBuffer,
    ) -> ParaphResult<()> {
        self.queue.complete(ticket, pixels)
    }

    /// Latest completed render for a page.
    pub fn latest_render(&self, page: usize) -> Option<&crate::overlay::render_queue::CompletedRender> {
        self.queue.latest(page)
    }

    /// Dispatch one command, returning the render tickets it made necessary.
    pub fn dispatch(&mut self, command: Command) -> ParaphResult<Vec<RenderTicket>> {
        match command {
            Command::SetTool(tool) => {
                self.tool = tool;
                Ok(Vec::new())
            }
            Command::PointerDown { page, pos } => {
                self.pointer_down(page, pos)?;
                Ok(Vec::new())
            }
            Command::PointerDrag { page, pos } => {
                self.pointer_drag(page, pos)?;
                Ok(Vec::new())
            }
            Command::PointerUp => {
                self.drag = None;
                Ok(Vec::new())
            }
            Command::DoubleActivate { page, pos } => {
                self.double_activate(page, pos)?;
                Ok(Vec::new())
            }
            Command::PlaceSignature { page, asset } => {
                self.check_page(page)?;
                let id = self.page_mut(page).add(
                    Point::new(SIGNATURE_INSERT.0, SIGNATURE_INSERT.1),
                    SIGNATURE_SCALE,
                    AnnotationKind::Image { asset },
                );
                self.activate(page, id);
                Ok(Vec::new())
            }
            Command::DropAsset { page, pos, asset } => {
                self.check_page(page)?;
                let natural_width = asset.natural_size().width;
                let scale = if natural_width > 0.0 {
                    (STAMP_MAX_WIDTH / natural_width).min(1.0)
                } else {
                    1.0
                };
                let id = self
                    .page_mut(page)
                    .add(pos, scale, AnnotationKind::Image { asset });
                self.activate(page, id);
                Ok(Vec::new())
            }
            Command::DeleteActive => {
                self.delete_active_everywhere();
                Ok(Vec::new())
            }
            Command::MutateActive(delta) => {
                for items in self.pages.values_mut() {
                    if let Some(id) = items.active() {
                        items.mutate(id, delta)?;
                    }
                }
                Ok(Vec::new())
            }
            Command::BeginTextEdit { page, id } => {
                let is_text = self
                    .pages
                    .get(&page)
                    .and_then(|p| p.get(id))
                    .map(|a| matches!(a.kind, AnnotationKind::Text { .. }))
                    .unwrap_or(false);
                if is_text {
                    self.editing_text = Some((page, id));
                }
                Ok(Vec::new())
            }
            Command::SetTextContent(text) => {
                if let Some((page, id)) = self.editing_text {
                    if let Some(annotation) =
                        self.pages.get_mut(&page).and_then(|p| p.get_mut(id))
                    {
                        if let AnnotationKind::Text { content, .. } = &mut annotation.kind {
                            *content = text;
                        }
                    }
                }
                Ok(Vec::new())
            }
            Command::EndTextEdit => {
                self.end_text_edit();
                Ok(Vec::new())
            }
            Command::SetZoom(zoom) => {
                self.zoom = zoom;
                self.recompute_viewports()?;
                Ok(self.reissue_renders())
            }
            Command::ContainerResized(width) => {
                self.container_width = width;
                self.recompute_viewports()?;
                Ok(self.reissue_renders())
            }
        }
    }

    /// Topmost annotation under a page-local point, honoring rotation.
    pub fn hit_test(&self, page: usize, pos: Point<DisplaySpace>) -> Option<AnnotationId> {
        let annotations = self.pages.get(&page)?;
        for annotation in annotations.iter_topmost_first() {
            if Self::hits(annotation, pos) {
                return Some(annotation.id());
            }
        }
        None
    }

    fn hits(annotation: &Annotation, pos: Point<DisplaySpace>) -> bool {
        let bounds = annotation.display_bounds();
        if annotation.rotation == 0.0 {
            return bounds.contains(pos);
        }
        // Rotate the probe point backwards about the box center so the test
        // runs against the unrotated box.
        let center = bounds.center();
        let (sin, cos) = (-annotation.rotation).sin_cos();
        let dx = pos.x - center.x;
        let dy = pos.y - center.y;
        let local = Point::new(
            center.x + dx * cos - dy * sin,
            center.y + dx * sin + dy * cos,
        );
        bounds.contains(local)
    }

    fn pointer_down(&mut self, page: usize, pos: Point<DisplaySpace>) -> ParaphResult<()> {
        self.check_page(page)?;
        match self.tool {
            Tool::Select => {
                if let Some(id) = self.hit_test(page, pos) {
                    self.activate(page, id);
                    self.drag = Some(DragState {
                        page,
                        id,
                        last: pos,
                    });
                } else {
                    self.end_text_edit();
                    for items in self.pages.values_mut() {
                        items.clear_active();
                    }
                }
            }
            Tool::PlaceText => {
                let id = self.page_mut(page).add(
                    pos,
                    1.0,
                    AnnotationKind::Text {
                        font_size: TEXT_DEFAULT_FONT_SIZE,
                        color: Rgba::BLACK,
                        content: String::new(),
                    },
                );
                self.activate(page, id);
                self.editing_text = Some((page, id));
                self.tool = Tool::Select;
            }
            Tool::PlaceCheckbox => {
                let id = self.page_mut(page).add(
                    pos,
                    1.0,
                    AnnotationKind::Checkbox {
                        cycle: CheckboxCycle::default(),
                        state_index: 0,
                    },
                );
                self.activate(page, id);
                self.tool = Tool::Select;
            }
        }
        Ok(())
    }

    fn pointer_drag(&mut self, page: usize, pos: Point<DisplaySpace>) -> ParaphResult<()> {
        let Some(drag) = self.drag else {
            return Ok(());
        };
        if drag.page != page {
            return Ok(());
        }
        let delta = MutateDelta::translate(pos.x - drag.last.x, pos.y - drag.last.y);
        self.page_mut(drag.page).mutate(drag.id, delta)?;
        self.drag = Some(DragState { last: pos, ..drag });
        Ok(())
    }

    fn double_activate(&mut self, page: usize, pos: Point<DisplaySpace>) -> ParaphResult<()> {
        self.check_page(page)?;
        let Some(id) = self.hit_test(page, pos) else {
            return Ok(());
        };
        self.activate(page, id);
        let annotation = self
            .pages
            .get_mut(&page)
            .and_then(|p| p.get_mut(id))
            .ok_or_else(|| ParaphError::Generic("hit annotation vanished".into()))?;
        match &annotation.kind {
            AnnotationKind::Checkbox { .. } => annotation.toggle_checkbox(),
            AnnotationKind::Text { .. } => self.editing_text = Some((page, id)),
            _ => {}
        }
        Ok(())
    }

    /// Delete the active annotation, wherever it lives.
    ///
    /// Selection is per-page, so each page is visited. Suppressed entirely
    /// while a text annotation is being edited, where Delete means "delete a
    /// character".
    fn delete_active_everywhere(&mut self) {
        if self.editing_text.is_some() {
            return;
        }
        for (page, items) in self.pages.iter_mut() {
            if let Some(id) = items.active() {
                debug!("deleting annotation {} on page {}", id.raw(), page);
                items.remove(id);
            }
        }
        self.drag = None;
    }

    /// Finish editing; an empty text annotation is removed rather than left
    /// as an invisible zero-size object.
    fn end_text_edit(&mut self) {
        let Some((page, id)) = self.editing_text.take() else {
            return;
        };
        let empty = self
            .pages
            .get(&page)
            .and_then(|p| p.get(id))
            .map(|a| match &a.kind {
                AnnotationKind::Text { content, .. } => content.trim().is_empty(),
                _ => false,
            })
            .unwrap_or(false);
        if empty {
            self.page_mut(page).remove(id);
        }
    }

    fn activate(&mut self, page: usize, id: AnnotationId) {
        for (other, items) in self.pages.iter_mut() {
            if *other != page {
                items.clear_active();
            }
        }
        self.page_mut(page).set_active(id);
    }

    fn page_mut(&mut self, page: usize) -> &mut PageAnnotations {
        self.pages.entry(page).or_default()
    }

    fn check_page(&self, page: usize) -> ParaphResult<()> {
        if self.viewports.contains_key(&page) {
            Ok(())
        } else {
            Err(ParaphError::PageOutOfRange {
                page,
                count: self.document.page_count(),
            })
        }
    }

    fn recompute_viewports(&mut self) -> ParaphResult<()> {
        for page in 0..self.document.page_count() {
            let size = self.document.page_size(page)?;
            let viewport =
                compute_viewport(size, self.container_width, self.device_pixel_ratio, self.zoom);
            self.viewports.insert(page, viewport);
        }
        Ok(())
    }

    fn reissue_renders(&mut self) -> Vec<RenderTicket> {
        let mut tickets = Vec::with_capacity(self.viewports.len());
        let mut pages: Vec<usize> = self.viewports.keys().copied().collect();
        pages.sort_unstable();
        for page in pages {
            let render_scale = self.viewports[&page].render_scale;
            tickets.push(self.queue.request(page, render_scale));
        }
        tickets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::FixedDocument;

    fn surface(pages: usize) -> OverlaySurface {
        let doc = Rc::new(FixedDocument::a4(pages).unwrap());
        OverlaySurface::new(doc, 840.0, 1.0).unwrap()
    }

    fn place_checkbox(s: &mut OverlaySurface, page: usize, x: f64, y: f64) -> AnnotationId {
        s.dispatch(Command::SetTool(Tool::PlaceCheckbox)).unwrap();
        s.dispatch(Command::PointerDown {
            page,
            pos: Point::new(x, y),
        })
        .unwrap();
        s.dispatch(Command::PointerUp).unwrap();
        s.annotations(page).unwrap().active().unwrap()
    }

    #[test]
    fn test_placement_reverts_tool() {
        let mut s = surface(1);
        place_checkbox(&mut s, 0, 50.0, 50.0);
        assert_eq!(s.tool(), Tool::Select);
    }

    #[test]
    fn test_drag_moves_annotation() {
        let mut s = surface(1);
        let id = place_checkbox(&mut s, 0, 50.0, 50.0);
        s.dispatch(Command::PointerDown {
            page: 0,
            pos: Point::new(60.0, 60.0),
        })
        .unwrap();
        s.dispatch(Command::PointerDrag {
            page: 0,
            pos: Point::new(90.0, 40.0),
        })
        .unwrap();
        s.dispatch(Command::PointerUp).unwrap();
        let a = s.annotations(0).unwrap().get(id).unwrap();
        assert_eq!(a.position, Point::new(80.0, 30.0));
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut s = surface(1);
        let _below = place_checkbox(&mut s, 0, 50.0, 50.0);
        let above = place_checkbox(&mut s, 0, 60.0, 60.0);
        // Overlap region belongs to the later (topmost) annotation
        assert_eq!(s.hit_test(0, Point::new(65.0, 65.0)), Some(above));
    }

    #[test]
    fn test_global_delete_visits_all_pages() {
        let mut s = surface(2);
        place_checkbox(&mut s, 0, 50.0, 50.0);
        place_checkbox(&mut s, 1, 50.0, 50.0);
        // Force both pages to hold an active annotation at once
        let id0 = {
            let items = s.pages.get(&0).unwrap();
            items.iter().next().unwrap().id()
        };
        s.pages.get_mut(&0).unwrap().set_active(id0);

        s.dispatch(Command::DeleteActive).unwrap();
        assert!(s.annotations(0).unwrap().is_empty());
        assert!(s.annotations(1).unwrap().is_empty());
    }

    #[test]
    fn test_delete_suppressed_while_editing_text() {
        let mut s = surface(1);
        s.dispatch(Command::SetTool(Tool::PlaceText)).unwrap();
        s.dispatch(Command::PointerDown {
            page: 0,
            pos: Point::new(30.0, 30.0),
        })
        .unwrap();
        assert!(s.editing_text().is_some());
        s.dispatch(Command::SetTextContent("Jane Doe".into()))
            .unwrap();
        s.dispatch(Command::DeleteActive).unwrap();
        assert_eq!(s.annotations(0).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_text_removed_on_edit_end() {
        let mut s = surface(1);
        s.dispatch(Command::SetTool(Tool::PlaceText)).unwrap();
        s.dispatch(Command::PointerDown {
            page: 0,
            pos: Point::new(30.0, 30.0),
        })
        .unwrap();
        s.dispatch(Command::EndTextEdit).unwrap();
        assert!(s.annotations(0).unwrap().is_empty());
    }

    #[test]
    fn test_double_activate_toggles_checkbox() {
        let mut s = surface(1);
        let id = place_checkbox(&mut s, 0, 50.0, 50.0);
        s.dispatch(Command::DoubleActivate {
            page: 0,
            pos: Point::new(60.0, 60.0),
        })
        .unwrap();
        let state = s.annotations(0).unwrap().get(id).unwrap().checkbox_state();
        assert_eq!(state, Some(crate::core::annotation::CheckboxState::Checked));
    }

    #[test]
    fn test_mutate_active_rescales() {
        let mut s = surface(1);
        let id = place_checkbox(&mut s, 0, 50.0, 50.0);
        s.dispatch(Command::MutateActive(MutateDelta::rescale(2.0)))
            .unwrap();
        let a = s.annotations(0).unwrap().get(id).unwrap();
        assert_eq!(a.scale, 2.0);
        assert_eq!(a.display_bounds().size.width, 60.0);
    }

    #[test]
    fn test_zoom_reissues_renders() {
        let mut s = surface(2);
        let tickets = s.dispatch(Command::SetZoom(2.0)).unwrap();
        assert_eq!(tickets.len(), 2);
        let expected = s.viewport(0).unwrap().render_scale;
        assert_eq!(tickets[0].render_scale(), expected);
    }

    #[test]
    fn test_initial_renders_available_without_dispatch() {
        let mut s = surface(3);
        let tickets = s.request_renders();
        assert_eq!(tickets.len(), 3);
        assert!(tickets.iter().all(|t| !t.is_cancelled()));
        assert_eq!(
            tickets[0].render_scale(),
            s.viewport(0).unwrap().render_scale
        );
    }

    #[test]
    fn test_placement_on_missing_page_fails() {
        let mut s = surface(1);
        let err = s.dispatch(Command::PointerDown {
            page: 5,
            pos: Point::new(0.0, 0.0),
        });
        assert!(matches!(err, Err(ParaphError::PageOutOfRange { .. })));
    }

    #[test]
    fn test_client_to_page() {
        let p = OverlaySurface::client_to_page(Point::new(120.0, 400.0), Point::new(20.0, 350.0));
        assert_eq!(p, Point::new(100.0, 50.0));
    }

    #[test]
    fn test_rotated_hit_test() {
        let mut s = surface(1);
        let id = place_checkbox(&mut s, 0, 100.0, 100.0);
        s.pages
            .get_mut(&0)
            .unwrap()
            .mutate(id, MutateDelta::rotate(std::f64::consts::FRAC_PI_4))
            .unwrap();
        // Box center still hits regardless of rotation
        assert_eq!(s.hit_test(0, Point::new(115.0, 115.0)), Some(id));
        // An unrotated corner point no longer does
        assert_eq!(s.hit_test(0, Point::new(101.0, 101.0)), None);
    }
}
