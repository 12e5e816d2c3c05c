use crate::api::config::EngineConfig;
use crate::assets::registry::ImageSet;
use crate::components::ball::Ball;
use crate::core::arena::BallArena;
use crate::renderer::instance::{BallInstance, ParticleInstance, RenderBuffer};
use crate::renderer::traits::Surface;
use super::flip::flip_transform;
use super::particles::ParticleSystem;

fn instance(ball: &Ball) -> BallInstance {
    let flip = flip_transform(ball);
    BallInstance {
        x: ball.pos.x,
        y: ball.pos.y,
        radius: ball.radius,
        rotation: ball.rotation,
        scale_x: flip.scale_x,
        offset_x: flip.offset_x,
        image: ball.image.index() as f32,
        id: ball.id.0 as f32,
    }
}

/// Build the render buffer from the arena and particle system.
/// Stacked balls go first, falling balls after `falling_split`, so falling
/// balls are painted over the towers.
pub fn build_render_buffer(
    arena: &BallArena,
    particles: &ParticleSystem,
    config: &EngineConfig,
    buffer: &mut RenderBuffer,
) {
    buffer.clear();
    buffer.width = config.width;
    buffer.height = config.height;
    buffer.border_y = config.border_y();

    buffer.balls.extend(arena.stacked().map(instance));
    buffer.falling_split = buffer.balls.len() as u32;
    buffer.balls.extend(arena.falling().map(instance));

    buffer.particles.extend(particles.particles.iter().map(|p| ParticleInstance {
        x: p.pos.x,
        y: p.pos.y,
        radius: p.radius,
        alpha: p.alpha.max(0.0),
    }));
}

/// Paint a built buffer: clear, border line, stacked balls, falling balls, particles.
pub fn paint<S: Surface>(buffer: &RenderBuffer, surface: &mut S, images: &ImageSet<S::Image>) {
    surface.clear(buffer.width, buffer.height);
    surface.draw_border(buffer.border_y, buffer.width);
    for ball in &buffer.balls {
        surface.draw_ball(ball, images.get_index(ball.image as usize));
    }
    for particle in &buffer.particles {
        surface.draw_particle(particle);
    }
}
