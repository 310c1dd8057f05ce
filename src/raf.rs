//! `requestAnimationFrame` driver for the [`RenderLoop`].
//!
//! [`RafLoop`] owns the JS closure registered with the browser. Each callback
//! runs one frame and re-registers itself while the frame reports
//! [`FrameOutcome::Continue`]. [`RafLoop::stop`] cancels the loop's
//! [`crate::render::LoopHandle`] and the pending frame request.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::Window;

use crate::error::ParallaxError;
use crate::render::{FrameOutcome, LoopHandle, RenderLoop};
use crate::surface::Surface;

type RafClosure = Closure<dyn FnMut(f64)>;

/// Drives a shared [`RenderLoop`] once per display refresh.
pub struct RafLoop {
    inner: Rc<RafInner>,
}

struct RafInner {
    window: Window,
    /// Set once in `start()`; the closure re-registers itself from inside.
    closure: RefCell<Option<RafClosure>>,
    frame: RefCell<Box<dyn FnMut() -> FrameOutcome>>,
    handle: LoopHandle,
    /// ID of the pending `requestAnimationFrame` call, if any.
    raf_id: Cell<Option<i32>>,
}

impl RafInner {
    fn request(&self, closure: &RafClosure) -> Result<(), ParallaxError> {
        let id = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())?;
        self.raf_id.set(Some(id));
        Ok(())
    }
}

impl RafLoop {
    /// Create a loop that is not yet running.
    pub fn new<S: Surface + 'static>(window: Window, render_loop: Rc<RefCell<RenderLoop<S>>>) -> Self {
        let handle = render_loop.borrow().handle();
        let frame = Box::new(move || render_loop.borrow_mut().frame());
        Self {
            inner: Rc::new(RafInner {
                window,
                closure: RefCell::new(None),
                frame: RefCell::new(frame),
                handle,
                raf_id: Cell::new(None),
            }),
        }
    }

    /// Request the first frame. Calling it on a running loop does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the browser refuses the first frame request.
    pub fn start(&self) -> Result<(), ParallaxError> {
        if self.is_running() || self.inner.handle.is_cancelled() {
            return Ok(());
        }

        let inner = Rc::clone(&self.inner);
        let closure = Closure::wrap(Box::new(move |_timestamp_ms: f64| {
            inner.raf_id.set(None);
            let outcome = (inner.frame.borrow_mut())();
            if outcome == FrameOutcome::Stopped {
                return;
            }
            if let Some(closure) = inner.closure.borrow().as_ref() {
                if let Err(e) = inner.request(closure) {
                    log::error!("requestAnimationFrame failed, render loop halted: {e}");
                }
            }
        }) as Box<dyn FnMut(f64)>);

        self.inner.request(&closure)?;
        *self.inner.closure.borrow_mut() = Some(closure);
        log::debug!("render loop started");
        Ok(())
    }

    /// Stop the loop for good and cancel the pending frame.
    pub fn stop(&self) {
        self.inner.handle.cancel();
        if let Some(id) = self.inner.raf_id.take() {
            if let Err(e) = self.inner.window.cancel_animation_frame(id) {
                log::warn!("cancelAnimationFrame failed: {}", ParallaxError::from(e));
            }
        }
    }

    /// A frame is currently scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.raf_id.get().is_some()
    }
}

impl Drop for RafLoop {
    fn drop(&mut self) {
        self.stop();
        // Break the closure -> inner reference cycle.
        self.inner.closure.borrow_mut().take();
    }
}

impl std::fmt::Debug for RafLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RafLoop")
            .field("running", &self.is_running())
            .field("cancelled", &self.inner.handle.is_cancelled())
            .finish()
    }
}
