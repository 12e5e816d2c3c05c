/// Flat frame buffer layout for zero-copy reads by the JS host.
/// Must stay in sync with the host's `protocol.ts`.
///
/// Layout (all values in f32 / 4 bytes):
/// ```text
/// [Header: 12 floats]
/// [Balls: max_balls × 8 floats]
/// [Particles: max_particles × 4 floats]
/// [Events: max_events × 4 floats]
/// ```
///
/// Capacities are written into the header on every frame, so the host can
/// compute offsets without a separate handshake.

use crate::api::config::EngineConfig;
use crate::api::types::WireEvent;
use crate::renderer::instance::{BallInstance, ParticleInstance, RenderBuffer};

/// Number of floats in the header section.
pub const HEADER_FLOATS: usize = 12;

/// Header field indices.
pub const HEADER_FRAME_COUNTER: usize = 0;
pub const HEADER_PROTOCOL_VERSION: usize = 1;
pub const HEADER_WIDTH: usize = 2;
pub const HEADER_HEIGHT: usize = 3;
pub const HEADER_BORDER_Y: usize = 4;
pub const HEADER_MAX_BALLS: usize = 5;
pub const HEADER_BALL_COUNT: usize = 6;
pub const HEADER_FALLING_SPLIT: usize = 7;
pub const HEADER_MAX_PARTICLES: usize = 8;
pub const HEADER_PARTICLE_COUNT: usize = 9;
pub const HEADER_MAX_EVENTS: usize = 10;
pub const HEADER_EVENT_COUNT: usize = 11;

pub const PROTOCOL_VERSION: f32 = 1.0;

/// Fifteen particles per explosion, ~68 explosions in flight.
pub const DEFAULT_MAX_PARTICLES: usize = 1024;
pub const DEFAULT_MAX_EVENTS: usize = 64;

/// Section sizes and offsets, all in floats.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    pub max_balls: usize,
    pub max_particles: usize,
    pub max_events: usize,

    pub ball_data_offset: usize,
    pub particle_data_offset: usize,
    pub event_data_offset: usize,

    pub buffer_total_floats: usize,
    pub buffer_total_bytes: usize,
}

impl ProtocolLayout {
    pub fn new(max_balls: usize, max_particles: usize, max_events: usize) -> Self {
        let ball_data_offset = HEADER_FLOATS;
        let particle_data_offset = ball_data_offset + max_balls * BallInstance::FLOATS;
        let event_data_offset = particle_data_offset + max_particles * ParticleInstance::FLOATS;
        let buffer_total_floats = event_data_offset + max_events * WireEvent::FLOATS;

        Self {
            max_balls,
            max_particles,
            max_events,
            ball_data_offset,
            particle_data_offset,
            event_data_offset,
            buffer_total_floats,
            buffer_total_bytes: buffer_total_floats * 4,
        }
    }

    /// Ball capacity follows the viewport-derived cap.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_balls(), DEFAULT_MAX_PARTICLES, DEFAULT_MAX_EVENTS)
    }

    /// Pack one frame into `out`, resizing it to the full layout.
    /// Sections beyond their capacity are truncated (falling balls first,
    /// since they sit after the stacked ones).
    pub fn write_frame(
        &self,
        out: &mut Vec<f32>,
        frame: u32,
        buffer: &RenderBuffer,
        events: &[WireEvent],
    ) {
        out.resize(self.buffer_total_floats, 0.0);

        let balls = buffer.balls.len().min(self.max_balls);
        let particles = buffer.particles.len().min(self.max_particles);
        let events = &events[..events.len().min(self.max_events)];
        let split = (buffer.falling_split as usize).min(balls);

        let header = &mut out[..HEADER_FLOATS];
        header[HEADER_FRAME_COUNTER] = frame as f32;
        header[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        header[HEADER_WIDTH] = buffer.width;
        header[HEADER_HEIGHT] = buffer.height;
        header[HEADER_BORDER_Y] = buffer.border_y;
        header[HEADER_MAX_BALLS] = self.max_balls as f32;
        header[HEADER_BALL_COUNT] = balls as f32;
        header[HEADER_FALLING_SPLIT] = split as f32;
        header[HEADER_MAX_PARTICLES] = self.max_particles as f32;
        header[HEADER_PARTICLE_COUNT] = particles as f32;
        header[HEADER_MAX_EVENTS] = self.max_events as f32;
        header[HEADER_EVENT_COUNT] = events.len() as f32;

        let ball_floats: &[f32] = bytemuck::cast_slice(&buffer.balls[..balls]);
        out[self.ball_data_offset..self.ball_data_offset + ball_floats.len()]
            .copy_from_slice(ball_floats);

        let particle_floats: &[f32] = bytemuck::cast_slice(&buffer.particles[..particles]);
        out[self.particle_data_offset..self.particle_data_offset + particle_floats.len()]
            .copy_from_slice(particle_floats);

        let event_floats: &[f32] = bytemuck::cast_slice(events);
        out[self.event_data_offset..self.event_data_offset + event_floats.len()]
            .copy_from_slice(event_floats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(id: f32) -> BallInstance {
        BallInstance {
            x: 10.0,
            y: 20.0,
            radius: 12.0,
            rotation: 0.0,
            scale_x: 1.0,
            offset_x: 0.0,
            image: 3.0,
            id,
        }
    }

    #[test]
    fn offsets_are_contiguous() {
        let layout = ProtocolLayout::new(100, 200, 10);
        assert_eq!(layout.ball_data_offset, HEADER_FLOATS);
        assert_eq!(layout.particle_data_offset, HEADER_FLOATS + 100 * 8);
        assert_eq!(layout.event_data_offset, layout.particle_data_offset + 200 * 4);
        assert_eq!(layout.buffer_total_floats, layout.event_data_offset + 10 * 4);
        assert_eq!(layout.buffer_total_bytes, layout.buffer_total_floats * 4);
    }

    #[test]
    fn layout_follows_viewport_cap() {
        let short = ProtocolLayout::from_config(&EngineConfig::default().with_viewport(800.0, 600.0));
        let tall = ProtocolLayout::from_config(&EngineConfig::default().with_viewport(800.0, 900.0));
        assert_eq!(short.max_balls, 300);
        assert_eq!(tall.max_balls, 400);
    }

    #[test]
    fn frame_packs_header_and_sections() {
        let layout = ProtocolLayout::new(4, 4, 2);
        let mut buffer = RenderBuffer::new();
        buffer.width = 240.0;
        buffer.height = 600.0;
        buffer.border_y = 90.0;
        buffer.balls.push(ball(1.0));
        buffer.balls.push(ball(2.0));
        buffer.falling_split = 1;
        buffer.particles.push(ParticleInstance { x: 1.0, y: 2.0, radius: 3.0, alpha: 0.5 });
        let events = [WireEvent { kind: 3.0, a: 1.0, b: 2.0, c: 7.0 }];

        let mut out = Vec::new();
        layout.write_frame(&mut out, 9, &buffer, &events);

        assert_eq!(out.len(), layout.buffer_total_floats);
        assert_eq!(out[HEADER_FRAME_COUNTER], 9.0);
        assert_eq!(out[HEADER_BALL_COUNT], 2.0);
        assert_eq!(out[HEADER_FALLING_SPLIT], 1.0);
        assert_eq!(out[HEADER_PARTICLE_COUNT], 1.0);
        assert_eq!(out[HEADER_EVENT_COUNT], 1.0);
        assert_eq!(out[HEADER_BORDER_Y], 90.0);
        // Second ball's id is its last float.
        assert_eq!(out[layout.ball_data_offset + 15], 2.0);
        assert_eq!(out[layout.particle_data_offset + 3], 0.5);
        assert_eq!(out[layout.event_data_offset + 3], 7.0);
    }

    #[test]
    fn overfull_sections_are_truncated() {
        let layout = ProtocolLayout::new(2, 1, 1);
        let mut buffer = RenderBuffer::new();
        for id in 0..3 {
            buffer.balls.push(ball(id as f32));
        }
        buffer.falling_split = 3;
        let events = [WireEvent::default(); 3];

        let mut out = Vec::new();
        layout.write_frame(&mut out, 0, &buffer, &events);
        assert_eq!(out[HEADER_BALL_COUNT], 2.0);
        assert_eq!(out[HEADER_FALLING_SPLIT], 2.0);
        assert_eq!(out[HEADER_EVENT_COUNT], 1.0);
    }
}
