use bytemuck::{Pod, Zeroable};

/// Per-ball render data, flip transform already resolved.
/// 8 floats = 32 bytes stride, read directly by the JS host.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BallInstance {
    /// Centre x in canvas px (flip offset not applied).
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Horizontal squash from a running flip (1.0 = none).
    pub scale_x: f32,
    /// Horizontal shift accompanying the squash.
    pub offset_x: f32,
    /// `ImageSlot` index.
    pub image: f32,
    /// Ball id, for hit-testing on the host side.
    pub id: f32,
}

impl BallInstance {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// Per-particle render data: 4 floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub alpha: f32,
}

impl ParticleInstance {
    pub const FLOATS: usize = 4;
}

/// Everything a surface needs to paint one frame.
pub struct RenderBuffer {
    /// Ball instances: stacked balls first, then falling balls from `falling_split`.
    pub balls: Vec<BallInstance>,
    pub particles: Vec<ParticleInstance>,
    /// Index where falling balls start in `balls`.
    pub falling_split: u32,
    pub border_y: f32,
    pub width: f32,
    pub height: f32,
}

impl RenderBuffer {
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(max_balls: usize) -> Self {
        Self {
            balls: Vec::with_capacity(max_balls),
            particles: Vec::with_capacity(256),
            falling_split: 0,
            border_y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.balls.clear();
        self.particles.clear();
        self.falling_split = 0;
    }

    pub fn ball_count(&self) -> u32 {
        self.balls.len() as u32
    }

    pub fn particle_count(&self) -> u32 {
        self.particles.len() as u32
    }

    pub fn stacked(&self) -> &[BallInstance] {
        &self.balls[..self.falling_split as usize]
    }

    pub fn falling(&self) -> &[BallInstance] {
        &self.balls[self.falling_split as usize..]
    }

    /// Raw pointer to ball data for shared-memory reads.
    pub fn balls_ptr(&self) -> *const f32 {
        self.balls.as_ptr() as *const f32
    }

    /// Raw pointer to particle data for shared-memory reads.
    pub fn particles_ptr(&self) -> *const f32 {
        self.particles.as_ptr() as *const f32
    }

    /// Balls as a flat float slice.
    pub fn ball_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.balls)
    }

    /// Particles as a flat float slice.
    pub fn particle_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.particles)
    }
}

impl Default for RenderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ball_instance_is_8_floats() {
        assert_eq!(std::mem::size_of::<BallInstance>(), BallInstance::STRIDE_BYTES);
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 16);
    }

    #[test]
    fn split_partitions_balls() {
        let mut buf = RenderBuffer::new();
        buf.balls.push(BallInstance { id: 1.0, ..Default::default() });
        buf.balls.push(BallInstance { id: 2.0, ..Default::default() });
        buf.balls.push(BallInstance { id: 3.0, ..Default::default() });
        buf.falling_split = 1;
        assert_eq!(buf.stacked().len(), 1);
        assert_eq!(buf.falling().len(), 2);
        assert_eq!(buf.ball_floats().len(), 24);
    }
}
