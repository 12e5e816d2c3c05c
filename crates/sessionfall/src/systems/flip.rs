//! Flip transitions: swap a ball's image behind a one-axis squash instead of an instant change.

use crate::components::ball::Ball;
use crate::components::feel::ImageSlot;
use crate::components::flip::{FlipAnimation, FlipStep};
use crate::core::arena::BallArena;

/// Horizontal squash applied when drawing a ball.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlipTransform {
    pub scale_x: f32,
    /// Horizontal shift in px, proportional to how far the ball is squashed.
    pub offset_x: f32,
}

impl FlipTransform {
    pub const IDENTITY: FlipTransform = FlipTransform { scale_x: 1.0, offset_x: 0.0 };
}

/// Start flipping `ball` toward `next`. No-op (returns false) when the ball already
/// shows `next` with nothing running, or is already flipping toward `next`.
/// A flip toward a different image restarts from zero.
pub fn start_image_flip(ball: &mut Ball, next: ImageSlot, duration: f32) -> bool {
    match &ball.flip {
        None if ball.image == next => false,
        Some(flip) if flip.next_image == next => false,
        _ => {
            ball.flip = Some(FlipAnimation::new(next, duration));
            true
        }
    }
}

/// Advance every running flip: swap the image at the halfway mark, clear at the end.
pub fn tick_flips(arena: &mut BallArena, dt: f32) {
    for ball in arena.iter_mut() {
        let Some(flip) = ball.flip.as_mut() else {
            continue;
        };
        let next = flip.next_image;
        match flip.tick(dt) {
            FlipStep::Running => {}
            FlipStep::Swap => ball.image = next,
            FlipStep::Done { swap } => {
                if swap {
                    ball.image = next;
                }
                ball.flip = None;
            }
        }
    }
}

pub fn flip_transform(ball: &Ball) -> FlipTransform {
    match &ball.flip {
        Some(flip) => {
            let scale_x = flip.scale_x();
            FlipTransform {
                scale_x,
                offset_x: (1.0 - scale_x) * ball.radius * 0.5,
            }
        }
        None => FlipTransform::IDENTITY,
    }
}
