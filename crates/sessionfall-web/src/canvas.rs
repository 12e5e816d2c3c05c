use std::f64::consts::TAU;
use sessionfall::{BallInstance, ParticleInstance, Surface};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

const BORDER_COLOR: &str = "rgba(255, 92, 92, 0.65)";
const PLACEHOLDER_COLOR: &str = "#9aa4b2";
const PARTICLE_COLOR: &str = "#ffb347";

/// `Surface` over a 2D canvas context.
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self::new(ctx))
    }

    fn ball(&self, ball: &BallInstance, image: Option<&HtmlImageElement>) -> Result<(), JsValue> {
        let r = ball.radius as f64;
        self.ctx.translate((ball.x + ball.offset_x) as f64, ball.y as f64)?;
        self.ctx.rotate(ball.rotation as f64)?;
        self.ctx.scale(ball.scale_x as f64, 1.0)?;
        match image {
            Some(img) => self
                .ctx
                .draw_image_with_html_image_element_and_dw_and_dh(img, -r, -r, 2.0 * r, 2.0 * r)?,
            None => {
                self.ctx.set_fill_style_str(PLACEHOLDER_COLOR);
                self.ctx.begin_path();
                self.ctx.arc(0.0, 0.0, r, 0.0, TAU)?;
                self.ctx.fill();
            }
        }
        Ok(())
    }

    fn particle(&self, p: &ParticleInstance) -> Result<(), JsValue> {
        self.ctx.set_global_alpha(p.alpha as f64);
        self.ctx.set_fill_style_str(PARTICLE_COLOR);
        self.ctx.begin_path();
        self.ctx.arc(p.x as f64, p.y as f64, p.radius as f64, 0.0, TAU)?;
        self.ctx.fill();
        Ok(())
    }
}

impl Surface for CanvasSurface {
    type Image = HtmlImageElement;

    fn clear(&mut self, width: f32, height: f32) {
        self.ctx.clear_rect(0.0, 0.0, width as f64, height as f64);
    }

    fn draw_border(&mut self, y: f32, width: f32) {
        self.ctx.save();
        self.ctx.set_stroke_style_str(BORDER_COLOR);
        self.ctx.set_line_width(1.0);
        self.ctx.begin_path();
        self.ctx.move_to(0.0, y as f64);
        self.ctx.line_to(width as f64, y as f64);
        self.ctx.stroke();
        self.ctx.restore();
    }

    fn draw_ball(&mut self, ball: &BallInstance, image: Option<&HtmlImageElement>) {
        self.ctx.save();
        if let Err(err) = self.ball(ball, image) {
            log::warn!("draw_ball {} failed: {:?}", ball.id, err);
        }
        self.ctx.restore();
    }

    fn draw_particle(&mut self, particle: &ParticleInstance) {
        self.ctx.save();
        if let Err(err) = self.particle(particle) {
            log::warn!("draw_particle failed: {:?}", err);
        }
        self.ctx.restore();
    }
}
