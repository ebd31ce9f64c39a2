// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] defines the TOML-facing types.
//! - [`loader`] reads files and runs validation.
//! - [`validate`] turns a [`RawConfigFile`] into a [`HeteroflowConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, from_toml_str, load_and_validate, load_from_path};
pub use model::{
    DeviceSection, GraphSection, HeteroflowConfig, KernelSection, LogSection, RawConfigFile,
};
