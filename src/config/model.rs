// src/config/model.rs

use serde::Deserialize;

use crate::device::StreamHandle;
use crate::payload::{Dim3, LaunchConfig};
use crate::types::{DEFAULT_DEVICE, DeviceId, LogLevel};

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [log]
/// level = "debug"
///
/// [device]
/// default = 0
///
/// [kernel]
/// grid = [1, 1, 1]
/// block = [256, 1, 1]
/// shared_memory = 0
/// stream = 0
///
/// [graph]
/// validate_on_freeze = true
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub device: DeviceSection,

    #[serde(default)]
    pub kernel: KernelSection,

    #[serde(default)]
    pub graph: GraphSection,
}

/// Validated configuration.
///
/// Obtain one through [`crate::config::load_and_validate`],
/// `HeteroflowConfig::try_from(raw)` or [`Default`].
#[derive(Debug, Clone, Default)]
pub struct HeteroflowConfig {
    pub log: LogSection,
    pub device: DeviceSection,
    pub kernel: KernelSection,
    pub graph: GraphSection,
}

impl HeteroflowConfig {
    /// Assemble a config without validation; used after validation passed.
    pub(crate) fn new_unchecked(
        log: LogSection,
        device: DeviceSection,
        kernel: KernelSection,
        graph: GraphSection,
    ) -> Self {
        Self {
            log,
            device,
            kernel,
            graph,
        }
    }

    /// Launch configuration applied to kernels created by a configured
    /// [`crate::dag::GraphBuilder`].
    pub fn default_launch(&self) -> LaunchConfig {
        LaunchConfig {
            device: self.device.default,
            grid: Dim3::from(self.kernel.grid),
            block: Dim3::from(self.kernel.block),
            shared_memory: self.kernel.shared_memory,
            stream: StreamHandle(self.kernel.stream),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogSection {
    /// If `None`, `HETEROFLOW_LOG` or `info` is used.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// `[device]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSection {
    /// Device targeted by Pull and Kernel nodes unless they say otherwise.
    #[serde(default = "default_device")]
    pub default: DeviceId,
}

fn default_device() -> DeviceId {
    DEFAULT_DEVICE
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            default: default_device(),
        }
    }
}

/// `[kernel]` section: default launch geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct KernelSection {
    #[serde(default = "default_dims")]
    pub grid: [u32; 3],

    #[serde(default = "default_dims")]
    pub block: [u32; 3],

    /// Dynamic shared memory per block, in bytes.
    #[serde(default)]
    pub shared_memory: usize,

    /// Raw stream handle; `0` is the default stream.
    #[serde(default)]
    pub stream: u64,
}

fn default_dims() -> [u32; 3] {
    [1, 1, 1]
}

impl Default for KernelSection {
    fn default() -> Self {
        Self {
            grid: default_dims(),
            block: default_dims(),
            shared_memory: 0,
            stream: 0,
        }
    }
}

/// `[graph]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSection {
    /// Run structural validation when a builder is frozen.
    #[serde(default = "default_validate_on_freeze")]
    pub validate_on_freeze: bool,
}

fn default_validate_on_freeze() -> bool {
    true
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            validate_on_freeze: default_validate_on_freeze(),
        }
    }
}
