pub mod arena;
pub mod scheduler;
pub mod time;
