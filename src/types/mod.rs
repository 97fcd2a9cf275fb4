//! Shared types: configuration and error handling.

pub mod config;
pub mod errors;

pub use config::{
    Config, DiscoveryConfig, HealthConfig, IpcConfig, RetryPolicy, ServerConfig, TaskStoreConfig,
};
pub use errors::{Error, Result};
