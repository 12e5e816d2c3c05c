pub mod instance;
pub mod traits;

pub use instance::{BallInstance, ParticleInstance, RenderBuffer};
pub use traits::Surface;
