//! Drawing surface abstraction.
//!
//! The render step only needs four operations from a 2D context, so it talks
//! to a [`Surface`] instead of [`web_sys::CanvasRenderingContext2d`] directly.
//! The browser implementation lives here; tests supply their own.

use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::error::ParallaxError;

/// A 2D target that layers are composited onto.
pub trait Surface {
    /// Image handle type accepted by [`Surface::draw_image`].
    type Image;

    /// Current surface size as `(width, height)` in pixels.
    fn size(&self) -> (f64, f64);

    /// Clear the rectangle `(0, 0, width, height)` to transparent.
    fn clear(&mut self, width: f64, height: f64);

    /// Set the alpha applied to subsequent draws.
    fn set_global_alpha(&mut self, alpha: f64);

    /// Draw `image` at its natural size with its top-left corner at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the platform rejects the draw (e.g. a broken image).
    fn draw_image(&mut self, image: &Self::Image, x: f64, y: f64) -> Result<(), ParallaxError>;
}

/// A `<canvas>` element and its 2D context.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        Self { canvas, ctx }
    }
}

impl Surface for CanvasSurface {
    type Image = HtmlImageElement;

    fn size(&self) -> (f64, f64) {
        (f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    fn clear(&mut self, width: f64, height: f64) {
        self.ctx.clear_rect(0.0, 0.0, width, height);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn draw_image(&mut self, image: &HtmlImageElement, x: f64, y: f64) -> Result<(), ParallaxError> {
        self.ctx
            .draw_image_with_html_image_element(image, x, y)
            .map_err(ParallaxError::from)
    }
}
