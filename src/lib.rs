// Core modules
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use engine::{EngineParams, TradingEngine};
pub use models::*;
