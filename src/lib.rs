// src/lib.rs

//! Heterogeneous task graphs.
//!
//! A [`Graph`] is a DAG whose vertices carry one of four payloads: a CPU
//! callable ([`Host`]), a host→device copy ([`Pull`]), a device→host copy
//! ([`Push`]) or a kernel launch ([`Kernel`]). Each [`Node`] keeps an atomic
//! count of unfinished predecessors that an executor uses as its readiness
//! signal.
//!
//! This crate builds and describes graphs; scheduling and dispatch belong to
//! the executor walking them.
//!
//! ```
//! use heteroflow::{GraphBuilder, NodeId};
//!
//! let input = vec![1.0f32; 100];
//! let mut output = vec![0.0f32; 100];
//!
//! let mut builder = GraphBuilder::new();
//! let a = builder.pull("a", &input);
//! let b = builder.kernel("b", |_i, _n: &usize| {}, input.len());
//! let c = builder.push("c", &mut output, a);
//! builder.linearize(&[a, b, c])?;
//!
//! let graph = builder.freeze()?;
//! assert_eq!(graph.node(a).unwrap().pending_dependencies(), 0);
//! assert_eq!(graph.node(b).unwrap().pending_dependencies(), 1);
//! assert_eq!(graph.node(c).unwrap().dependents(), &[NodeId(1)]);
//! # Ok::<(), heteroflow::HeteroflowError>(())
//! ```

pub mod config;
pub mod dag;
pub mod device;
pub mod errors;
pub mod logging;
pub mod payload;
pub mod types;

use std::path::Path;

use anyhow::Result;
use tracing::info;

pub use crate::config::HeteroflowConfig;
pub use crate::dag::{Graph, GraphBuilder, Node, NodeId};
pub use crate::device::{DeviceBuffer, DevicePtr, DeviceRuntime, EmulatedRuntime, StreamHandle};
pub use crate::errors::HeteroflowError;
pub use crate::payload::{Dim3, Host, Kernel, LaunchConfig, Payload, Pull, Push, TaskKind};
pub use crate::types::{DeviceId, LogLevel};

/// Load and validate the config at `path`, then install logging at the
/// configured level.
///
/// Convenience for binaries embedding the crate; libraries should call
/// [`config::load_and_validate`] and leave the subscriber alone.
pub fn init(path: impl AsRef<Path>) -> Result<HeteroflowConfig> {
    let cfg = config::load_and_validate(path.as_ref())?;
    logging::init_logging(cfg.log.level)?;
    info!(
        path = %path.as_ref().display(),
        default_device = cfg.device.default,
        validate_on_freeze = cfg.graph.validate_on_freeze,
        "heteroflow initialised"
    );
    Ok(cfg)
}
