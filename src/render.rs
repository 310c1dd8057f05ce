//! Rendering: composites the layer store onto a [`Surface`] once per frame.
//!
//! [`draw_frame`] is the whole compositing step. [`RenderLoop`] wraps it with
//! the per-frame bookkeeping the browser driver ([`crate::raf::RafLoop`]) needs:
//! a frame counter, error logging, and a [`LoopHandle`] that stops rescheduling.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::cell::Cell;
use std::rc::Rc;

use crate::error::ParallaxError;
use crate::layer::LayerStore;
use crate::surface::Surface;

/// Clear `surface`, then draw every layer back to front with its own opacity.
///
/// Layers are stable-sorted in place by stacking order first, so equal keys
/// keep their insertion order. Returns the number of layers drawn.
///
/// # Errors
///
/// A layer that fails to draw is skipped and the rest of the frame is still
/// drawn. The first failure is returned as [`ParallaxError::Draw`].
pub fn draw_frame<S: Surface>(surface: &mut S, store: &mut LayerStore<S::Image>) -> Result<usize, ParallaxError> {
    let (width, height) = surface.size();
    surface.clear(width, height);

    let mut first_failure = None;
    let mut drawn = 0;
    for layer in store.sort_for_draw() {
        surface.set_global_alpha(layer.opacity());
        match surface.draw_image(&layer.image, layer.position.x, layer.position.y) {
            Ok(()) => drawn += 1,
            Err(e) => {
                if first_failure.is_none() {
                    first_failure = Some(ParallaxError::Draw { layer: layer.name.clone(), reason: e.to_string() });
                }
            }
        }
    }
    match first_failure {
        Some(e) => Err(e),
        None => Ok(drawn),
    }
}

/// What the driver should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Schedule another frame.
    Continue,
    /// The loop was cancelled; do not reschedule.
    Stopped,
}

/// Shared cancellation flag for a [`RenderLoop`].
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    cancelled: Rc<Cell<bool>>,
}

impl LoopHandle {
    /// Stop the loop. The frame in progress (if any) still completes.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// The render loop's state: surface, layers, and cancellation flag.
pub struct RenderLoop<S: Surface> {
    surface: S,
    store: LayerStore<S::Image>,
    handle: LoopHandle,
    frames: u64,
    failed_frames: u64,
}

impl<S: Surface> RenderLoop<S> {
    #[must_use]
    pub fn new(surface: S, store: LayerStore<S::Image>) -> Self {
        Self { surface, store, handle: LoopHandle::default(), frames: 0, failed_frames: 0 }
    }

    /// A handle that can stop this loop from outside the frame callback.
    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Run one frame and report whether the next one should be scheduled.
    ///
    /// Draw errors are logged and never stop the loop.
    pub fn frame(&mut self) -> FrameOutcome {
        if self.handle.is_cancelled() {
            return FrameOutcome::Stopped;
        }

        if let Err(e) = draw_frame(&mut self.surface, &mut self.store) {
            self.failed_frames += 1;
            // Broken images fail every frame; only report the first.
            if self.failed_frames == 1 {
                log::error!("frame {} draw failed: {e}", self.frames);
            }
        }
        self.frames += 1;

        if self.handle.is_cancelled() { FrameOutcome::Stopped } else { FrameOutcome::Continue }
    }

    /// Frames run so far, including ones whose draw failed.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames whose draw returned an error.
    #[must_use]
    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }

    #[must_use]
    pub fn store(&self) -> &LayerStore<S::Image> {
        &self.store
    }

    /// Mutable access for controllers that move or fade layers between frames.
    pub fn store_mut(&mut self) -> &mut LayerStore<S::Image> {
        &mut self.store
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }
}
