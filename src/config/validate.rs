// src/config/validate.rs

use crate::config::model::{HeteroflowConfig, KernelSection, RawConfigFile};
use crate::errors::{HeteroflowError, Result};

/// Upper bound on threads per block accepted in `[kernel].block`.
pub const MAX_THREADS_PER_BLOCK: u64 = 1024;

impl TryFrom<RawConfigFile> for HeteroflowConfig {
    type Error = HeteroflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_kernel_section(&raw.kernel)?;
        Ok(HeteroflowConfig::new_unchecked(
            raw.log,
            raw.device,
            raw.kernel,
            raw.graph,
        ))
    }
}

fn validate_kernel_section(kernel: &KernelSection) -> Result<()> {
    for (field, dims) in [("grid", kernel.grid), ("block", kernel.block)] {
        if dims.contains(&0) {
            return Err(HeteroflowError::ConfigError(format!(
                "[kernel].{field} dimensions must all be >= 1 (got {dims:?})"
            )));
        }
    }

    let threads = kernel
        .block
        .iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(u64::from(d)))
        .filter(|&t| t <= MAX_THREADS_PER_BLOCK);
    if threads.is_none() {
        return Err(HeteroflowError::ConfigError(format!(
            "[kernel].block {:?} exceeds {MAX_THREADS_PER_BLOCK} threads per block",
            kernel.block
        )));
    }

    Ok(())
}
