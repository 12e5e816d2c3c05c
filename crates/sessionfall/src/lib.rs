pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod bridge;
pub mod assets;

// Re-export key types at crate root for convenience
pub use api::config::EngineConfig;
pub use api::engine::{EngineTask, SessionEngine};
pub use api::error::{ConfigError, LoadError, RecordError};
pub use api::runner::Runner;
pub use api::types::{BallId, DataBatch, EngineEvent, RemovalReason, WireEvent};
pub use assets::cache::{ImageCache, ImageLoader};
pub use assets::manifest::ImageManifest;
pub use assets::registry::ImageSet;
pub use bridge::protocol::ProtocolLayout;
pub use components::ball::{Ball, BallState};
pub use components::feel::{feel_score, FeelLevel, ImageSlot};
pub use components::flip::FlipAnimation;
pub use components::session::SessionRecord;
pub use core::arena::BallArena;
pub use core::scheduler::{Scheduler, TaskId};
pub use core::time::FrameClock;
pub use renderer::instance::{BallInstance, ParticleInstance, RenderBuffer};
pub use renderer::traits::Surface;
pub use systems::particles::{Particle, ParticleSystem};
pub use systems::render::{build_render_buffer, paint};
pub use systems::stacking::StackingGrid;
