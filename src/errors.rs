// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::dag::NodeId;
use crate::types::DeviceId;

#[derive(Error, Debug)]
pub enum HeteroflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Device {device} error: {message}")]
    Device { device: DeviceId, message: String },

    #[error("Dependency counter underflow on node {0}")]
    CounterUnderflow(NodeId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HeteroflowError {
    /// Shorthand for a [`HeteroflowError::Device`] error.
    pub fn device(device: DeviceId, message: impl Into<String>) -> Self {
        HeteroflowError::Device {
            device,
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HeteroflowError>;
