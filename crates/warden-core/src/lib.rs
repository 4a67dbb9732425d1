pub mod config;
pub mod labels;

pub use config::WardenConfig;
pub use labels::*;
