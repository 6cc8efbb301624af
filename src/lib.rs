pub mod api;
pub mod config;
pub mod definitions;
pub mod engine;
pub mod factory;
pub mod mcp;
pub mod providers;
pub mod storage;
pub mod tools;
pub mod types;

pub use config::Config;
pub use types::*;
