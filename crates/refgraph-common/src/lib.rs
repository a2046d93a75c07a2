//! Shared setup for refgraph users: configuration files and engine
//! construction from them.

pub mod config;

pub use config::{ConfigError, RefgraphConfig};

pub type Result<T> = anyhow::Result<T>;
