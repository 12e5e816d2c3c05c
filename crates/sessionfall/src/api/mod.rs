pub mod config;
pub mod engine;
pub mod error;
pub mod runner;
pub mod types;
