//! Per-tick integration of falling balls and the falling -> stacked hand-off.

use crate::api::config::EngineConfig;
use crate::api::types::BallId;
use crate::components::ball::Ball;
use crate::core::arena::BallArena;
use super::stacking::StackingGrid;

/// Scale applied to `rotation_speed * dt` (rotation speed is in rad/s, dt in ms).
const ROTATION_SCALE: f32 = 0.001;

/// Integrate one falling ball: gravity, position, spin and homing toward its column.
pub fn integrate(ball: &mut Ball, dt: f32, config: &EngineConfig) {
    ball.vel.y += config.gravity * dt;
    ball.pos.y += ball.vel.y * dt;
    ball.rotation += ball.rotation_speed * dt * ROTATION_SCALE;
    ball.pos.x += (ball.target_x - ball.pos.x) * config.homing;
}

/// Advance every falling ball by `dt` ms. A ball whose bottom edge reaches the
/// top of its column's tower (or the floor) is stacked immediately, so a later
/// ball in the same column lands on it within the same tick.
/// Returns the balls that landed, with their columns.
pub fn step_falling(
    arena: &mut BallArena,
    grid: &mut StackingGrid,
    config: &EngineConfig,
    dt: f32,
) -> Vec<(BallId, usize)> {
    let floor = config.floor();
    let falling: Vec<BallId> = arena.falling().map(|b| b.id).collect();
    let mut landed = Vec::new();

    for id in falling {
        let Some(column) = arena.get(id).map(|b| b.column) else {
            continue;
        };
        let landing_y = StackingGrid::landing_y(arena, column, floor);

        let Some(ball) = arena.get_mut(id) else {
            continue;
        };
        integrate(ball, dt, config);
        if ball.bottom() < landing_y {
            continue;
        }

        if grid.stack_ball(arena, id, floor).is_some() {
            landed.push((id, column));
        }
    }
    landed
}
