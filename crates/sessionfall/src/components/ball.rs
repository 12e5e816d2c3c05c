use glam::Vec2;
use crate::api::types::BallId;
use crate::components::feel::ImageSlot;
use crate::components::flip::FlipAnimation;
use crate::components::session::SessionRecord;

/// Which ownership set a ball currently belongs to.
/// A ball moves Falling -> Stacked exactly once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallState {
    /// Advanced by the physics step every tick.
    Falling,
    /// Resting in a column tower, owned by the stacking grid.
    Stacked,
}

/// One visualised session.
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: BallId,
    pub device_id: String,
    pub state: BallState,
    /// Centre position in canvas pixels (y grows downward).
    pub pos: Vec2,
    /// Velocity in px/ms.
    pub vel: Vec2,
    pub column: usize,
    /// Column centre the ball homes toward while falling.
    pub target_x: f32,
    pub radius: f32,
    /// Rotation in radians.
    pub rotation: f32,
    pub rotation_speed: f32,
    pub image: ImageSlot,
    pub session: SessionRecord,
    pub flip: Option<FlipAnimation>,
}

impl Ball {
    /// Create a falling ball for a session; its image follows the session's feel level.
    pub fn new(id: BallId, session: SessionRecord, column: usize, radius: f32) -> Self {
        Self {
            id,
            device_id: session.device_id.clone(),
            state: BallState::Falling,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            column,
            target_x: 0.0,
            radius,
            rotation: 0.0,
            rotation_speed: 0.0,
            image: session.image_slot(),
            session,
            flip: None,
        }
    }

    // -- Builder pattern --

    pub fn with_pos(mut self, pos: Vec2) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_target_x(mut self, target_x: f32) -> Self {
        self.target_x = target_x;
        self
    }

    pub fn with_rotation_speed(mut self, speed: f32) -> Self {
        self.rotation_speed = speed;
        self
    }

    pub fn is_falling(&self) -> bool {
        self.state == BallState::Falling
    }

    pub fn is_stacked(&self) -> bool {
        self.state == BallState::Stacked
    }

    /// Y of the ball's top edge.
    pub fn top(&self) -> f32 {
        self.pos.y - self.radius
    }

    /// Y of the ball's bottom edge.
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.radius
    }
}
