//! Page rasterization scheduling.
//!
//! Per-page rasterization requests are not guaranteed to complete in request
//! order. The queue hands out one ticket per request; issuing a new ticket
//! for the same page cancels the previous one, so a late-arriving stale
//! render can never overwrite a newer one. Cancellation is caller-driven
//! (the viewport recompute path); there are no internal timeouts.

use rustc_hash::FxHashMap;

use crate::core::document::{CancelFlag, PixelBuffer};
use crate::core::error::{ParaphError, ParaphResult};

/// Authorization to rasterize one page at one scale.
#[derive(Debug, Clone)]
pub struct RenderTicket {
    page: usize,
    generation: u64,
    render_scale: f64,
    cancel: CancelFlag,
}

impl RenderTicket {
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn render_scale(&self) -> f64 {
        self.render_scale
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The flag the rasterizer polls at its suspension points.
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }
}

/// A completed page render.
#[derive(Debug, Clone)]
pub struct CompletedRender {
    pub render_scale: f64,
    pub pixels: PixelBuffer,
}

/// Tracks the newest rasterization request per page.
#[derive(Debug, Default)]
pub struct RenderQueue {
    generations: FxHashMap<usize, u64>,
    in_flight: FxHashMap<usize, CancelFlag>,
    completed: FxHashMap<usize, CompletedRender>,
}

impl RenderQueue {
    pub fn new() -> Self {
        RenderQueue::default()
    }

    /// Request a render for a page, superseding any in-flight request.
    ///
    /// The previous request's flag is cancelled before the new ticket is
    /// issued, so two renders never write the same page slot out of order.
    pub fn request(&mut self, page: usize, render_scale: f64) -> RenderTicket {
        if let Some(flag) = self.in_flight.remove(&page) {
            flag.cancel();
        }
        let generation = self.generations.entry(page).or_insert(0);
        *generation += 1;
        let cancel = CancelFlag::new();
        self.in_flight.insert(page, cancel.clone());
        RenderTicket {
            page,
            generation: *generation,
            render_scale,
            cancel,
        }
    }

    /// Record a finished render.
    ///
    /// A stale ticket (superseded since it was issued) is rejected with
    /// [`ParaphError::RenderCancelled`] and the newer result is untouched.
    pub fn complete(&mut self, ticket: &RenderTicket, pixels: PixelBuffer) -> ParaphResult<()> {
        let current = self.generations.get(&ticket.page).copied().unwrap_or(0);
        if ticket.is_cancelled() || ticket.generation != current {
            return Err(ParaphError::RenderCancelled);
        }
        self.in_flight.remove(&ticket.page);
        self.completed.insert(
            ticket.page,
            CompletedRender {
                render_scale: ticket.render_scale,
                pixels,
            },
        );
        Ok(())
    }

    /// Latest completed render for a page, if any.
    pub fn latest(&self, page: usize) -> Option<&CompletedRender> {
        self.completed.get(&page)
    }

    /// Drop cached output for a page (page teardown).
    pub fn forget(&mut self, page: usize) {
        if let Some(flag) = self.in_flight.remove(&page) {
            flag.cancel();
        }
        self.completed.remove(&page);
    }

    /// Number of completed renders currently held.
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::{FixedDocument, SourceDocument};

    #[test]
    fn test_supersede_cancels_previous() {
        let mut queue = RenderQueue::new();
        let a = queue.request(1, 1.0);
        let b = queue.request(1, 2.0);
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
    }

    #[test]
    fn test_exactly_one_completed_render() {
        let doc = FixedDocument::a4(2).unwrap();
        let mut queue = RenderQueue::new();

        // Request at scale A, then immediately at scale B.
        let a = queue.request(1, 1.0);
        let b = queue.request(1, 2.0);

        // The superseded task observes cancellation.
        assert!(matches!(
            doc.rasterize(1, a.render_scale(), a.cancel_flag()),
            Err(ParaphError::RenderCancelled)
        ));

        let pixels = doc.rasterize(1, b.render_scale(), b.cancel_flag()).unwrap();
        queue.complete(&b, pixels).unwrap();

        assert_eq!(queue.completed_count(), 1);
        let latest = queue.latest(1).unwrap();
        assert_eq!(latest.render_scale, 2.0);
    }

    #[test]
    fn test_stale_completion_rejected_even_out_of_order() {
        let mut queue = RenderQueue::new();
        let a = queue.request(0, 1.0);
        let b = queue.request(0, 3.0);

        queue
            .complete(&b, PixelBuffer::solid(2, 2, crate::core::geometry::Rgba::BLACK))
            .unwrap();
        // The old render finishing late must not overwrite the newer one.
        let late = queue.complete(&a, PixelBuffer::solid(1, 1, crate::core::geometry::Rgba::BLACK));
        assert!(matches!(late, Err(ParaphError::RenderCancelled)));
        assert_eq!(queue.latest(0).unwrap().render_scale, 3.0);
    }

    #[test]
    fn test_pages_are_independent() {
        let mut queue = RenderQueue::new();
        let a = queue.request(0, 1.0);
        let _b = queue.request(1, 1.0);
        assert!(!a.is_cancelled());
    }
}
