pub mod ball;
pub mod feel;
pub mod flip;
pub mod session;
