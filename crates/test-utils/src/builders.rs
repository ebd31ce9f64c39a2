#![allow(dead_code)]

use heteroflow::config::{HeteroflowConfig, RawConfigFile};
use heteroflow::types::{DeviceId, LogLevel};

/// Builder for `HeteroflowConfig` to simplify test setup.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log.level = Some(level);
        self
    }

    pub fn default_device(mut self, device: DeviceId) -> Self {
        self.config.device.default = device;
        self
    }

    pub fn grid(mut self, grid: [u32; 3]) -> Self {
        self.config.kernel.grid = grid;
        self
    }

    pub fn block(mut self, block: [u32; 3]) -> Self {
        self.config.kernel.block = block;
        self
    }

    pub fn shared_memory(mut self, bytes: usize) -> Self {
        self.config.kernel.shared_memory = bytes;
        self
    }

    pub fn stream(mut self, stream: u64) -> Self {
        self.config.kernel.stream = stream;
        self
    }

    pub fn validate_on_freeze(mut self, val: bool) -> Self {
        self.config.graph.validate_on_freeze = val;
        self
    }

    pub fn build(self) -> HeteroflowConfig {
        HeteroflowConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
