// src/device/buffer.rs

use std::sync::Arc;

use tracing::{debug, error};

use crate::device::{DevicePtr, DeviceRuntime};
use crate::errors::Result;
use crate::types::DeviceId;

/// An owned device allocation.
///
/// Dropping the buffer selects `device` on the runtime and releases the
/// allocation. Release happens at most once: a failed release is logged on
/// drop and never retried. Use [`DeviceBuffer::release`] to observe the error
/// instead.
#[derive(Debug)]
pub struct DeviceBuffer {
    runtime: Arc<dyn DeviceRuntime>,
    device: DeviceId,
    ptr: DevicePtr,
    len: usize,
    released: bool,
}

impl DeviceBuffer {
    /// Select `device` and allocate `len` bytes on it.
    pub fn allocate(runtime: Arc<dyn DeviceRuntime>, device: DeviceId, len: usize) -> Result<Self> {
        runtime.set_device(device)?;
        let ptr = runtime.allocate(len)?;
        debug!(device, %ptr, bytes = len, "allocated device buffer");

        Ok(Self {
            runtime,
            device,
            ptr,
            len,
            released: false,
        })
    }

    pub fn ptr(&self) -> DevicePtr {
        self.ptr
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Size of the allocation in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Runtime the allocation belongs to.
    pub fn runtime(&self) -> &Arc<dyn DeviceRuntime> {
        &self.runtime
    }

    /// Release the allocation now and report failures to the caller.
    pub fn release(mut self) -> Result<()> {
        self.free()
    }

    fn free(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        self.runtime.set_device(self.device)?;
        self.runtime.release(self.ptr)?;
        debug!(device = self.device, ptr = %self.ptr, "released device buffer");
        Ok(())
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        if let Err(err) = self.free() {
            error!(
                device = self.device,
                ptr = %self.ptr,
                error = %err,
                "failed to release device buffer"
            );
        }
    }
}
