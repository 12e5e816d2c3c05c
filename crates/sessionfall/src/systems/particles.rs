//! Explosion particles: short-lived decorative debris spawned when a ball is removed.

use glam::Vec2;
use super::rng::Rng;

/// A single particle with physics and fade state.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    /// Velocity in px per tick-unit (one unit = 10 ms).
    pub vel: Vec2,
    pub radius: f32,
    /// Opacity, decays to 0 and the particle dies.
    pub alpha: f32,
}

impl Particle {
    /// Scale from ms to tick-units.
    pub const TIME_SCALE: f32 = 0.1;
    /// Downward acceleration per tick-unit.
    pub const GRAVITY: f32 = 0.05;
    /// Alpha lost per ms.
    pub const FADE_PER_MS: f32 = 0.002;

    pub fn new(pos: Vec2, vel: Vec2, radius: f32) -> Self {
        Self { pos, vel, radius, alpha: 1.0 }
    }

    /// Advance particle physics. Returns false when faded out.
    pub fn tick(&mut self, dt: f32) -> bool {
        let step = dt * Self::TIME_SCALE;
        self.pos += self.vel * step;
        self.vel.y += Self::GRAVITY * step;
        self.alpha -= Self::FADE_PER_MS * dt;
        self.alpha > 0.0
    }
}

/// All live particles plus the RNG that scatters them.
pub struct ParticleSystem {
    pub particles: Vec<Particle>,
    rng: Rng,
    explosions: u64,
}

impl ParticleSystem {
    pub const SPEED_RANGE: (f32, f32) = (2.0, 5.0);
    pub const RADIUS_RANGE: (f32, f32) = (2.0, 4.0);

    pub fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: Rng::new(seed.wrapping_add(7919)),
            explosions: 0,
        }
    }

    /// Spawn `count` particles at `center` flying off in uniformly random directions.
    pub fn create_explosion_particles(&mut self, center: Vec2, count: usize) {
        self.particles.reserve(count);
        for _ in 0..count {
            let angle = self.rng.range(0.0, std::f32::consts::TAU);
            let speed = self.rng.range(Self::SPEED_RANGE.0, Self::SPEED_RANGE.1);
            let radius = self.rng.range(Self::RADIUS_RANGE.0, Self::RADIUS_RANGE.1);
            self.particles.push(Particle::new(
                center,
                Vec2::new(angle.cos(), angle.sin()) * speed,
                radius,
            ));
        }
        self.explosions += 1;
    }

    /// Advance every particle, dropping the ones that faded out.
    pub fn tick(&mut self, dt: f32) {
        self.particles.retain_mut(|p| p.tick(dt));
    }

    /// Number of explosions triggered since creation or the last clear.
    pub fn explosion_count(&self) -> u64 {
        self.explosions
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.explosions = 0;
    }
}
