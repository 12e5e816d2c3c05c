pub mod drop_scheduler;
pub mod flip;
pub mod particles;
pub mod physics;
pub mod render;
pub mod rng;
pub mod stacking;
