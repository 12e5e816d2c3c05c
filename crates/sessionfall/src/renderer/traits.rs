//! Drawing surface contract.
//!
//! The engine never touches a canvas directly. A host implements `Surface`
//! (the web bridge does it over `CanvasRenderingContext2d`; tests record calls)
//! and the render pass paints a `RenderBuffer` onto it.

use super::instance::{BallInstance, ParticleInstance};

/// A canvas-like 2D drawing surface sized to the viewport.
pub trait Surface {
    /// Decoded image type the surface can draw (e.g. an `HtmlImageElement`).
    /// Cloned out of the shared image cache, so it must be cheap to clone.
    type Image: Clone + 'static;

    /// Clear the whole surface before a new frame.
    fn clear(&mut self, width: f32, height: f32);

    /// Draw the horizontal border line.
    fn draw_border(&mut self, y: f32, width: f32);

    /// Draw one ball. `image` is `None` when neither its slot nor the fallback
    /// loaded; the surface should paint a placeholder.
    fn draw_ball(&mut self, ball: &BallInstance, image: Option<&Self::Image>);

    fn draw_particle(&mut self, particle: &ParticleInstance);
}
