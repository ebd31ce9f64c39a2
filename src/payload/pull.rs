// src/payload/pull.rs

use std::sync::{Mutex, MutexGuard, PoisonError};

use bytemuck::Pod;
use tracing::debug;

use crate::device::{DeviceBuffer, DevicePtr};
use crate::errors::{HeteroflowError, Result};
use crate::types::{DEFAULT_DEVICE, DeviceId};

/// Host→device copy descriptor.
///
/// The Pull borrows its source host memory and exclusively owns the device
/// buffer the executor attaches to it. The buffer is released (on its own
/// device) when the Pull is dropped, unless it was taken out before.
///
/// A Push reading this buffer must be ordered after this node in the graph;
/// that edge is the only thing keeping the buffer alive long enough.
#[derive(Debug)]
pub struct Pull<'h> {
    device: DeviceId,
    host: &'h [u8],
    device_size: usize,
    buffer: Mutex<Option<DeviceBuffer>>,
}

impl<'h> Pull<'h> {
    /// Describe a copy of `data` to the default device.
    pub fn new<T: Pod>(data: &'h [T]) -> Self {
        let host: &'h [u8] = bytemuck::cast_slice(data);
        Self {
            device: DEFAULT_DEVICE,
            host,
            device_size: host.len(),
            buffer: Mutex::new(None),
        }
    }

    /// Target `device` instead of the default one.
    pub fn on_device(mut self, device: DeviceId) -> Self {
        self.device = device;
        self
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Source host bytes.
    pub fn host_bytes(&self) -> &'h [u8] {
        self.host
    }

    pub fn host_size(&self) -> usize {
        self.host.len()
    }

    /// Bytes the device buffer must hold.
    pub fn device_size(&self) -> usize {
        self.device_size
    }

    /// Address of the attached device buffer, if any.
    pub fn device_ptr(&self) -> Option<DevicePtr> {
        self.slot().as_ref().map(DeviceBuffer::ptr)
    }

    pub fn has_device_buffer(&self) -> bool {
        self.device_ptr().is_some()
    }

    /// Hand a freshly allocated buffer to this Pull, which becomes its owner.
    ///
    /// The buffer must live on this Pull's device and hold at least
    /// [`Pull::device_size`] bytes, and no buffer may be attached yet. A
    /// rejected buffer is dropped, which releases it.
    pub fn attach_buffer(&self, buffer: DeviceBuffer) -> Result<()> {
        if buffer.device() != self.device {
            return Err(HeteroflowError::InvalidTransfer(format!(
                "buffer on device {} attached to pull targeting device {}",
                buffer.device(),
                self.device
            )));
        }
        if buffer.len() < self.device_size {
            return Err(HeteroflowError::InvalidTransfer(format!(
                "buffer of {} bytes is smaller than the {} bytes pulled",
                buffer.len(),
                self.device_size
            )));
        }

        let mut slot = self.slot();
        if let Some(existing) = slot.as_ref() {
            return Err(HeteroflowError::InvalidTransfer(format!(
                "pull already owns device buffer {}",
                existing.ptr()
            )));
        }

        debug!(device = self.device, ptr = %buffer.ptr(), "attached device buffer to pull");
        *slot = Some(buffer);
        Ok(())
    }

    /// Take ownership of the attached buffer back from this Pull.
    pub fn take_buffer(&self) -> Option<DeviceBuffer> {
        self.slot().take()
    }

    /// Run `f` with the attached buffer while holding the slot.
    pub fn with_buffer<R>(&self, f: impl FnOnce(Option<&DeviceBuffer>) -> R) -> R {
        let slot = self.slot();
        f(slot.as_ref())
    }

    fn slot(&self) -> MutexGuard<'_, Option<DeviceBuffer>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::EmulatedRuntime;

    #[test]
    fn sizes_follow_element_type() {
        let data = [0.0f32; 100];
        let pull = Pull::new(&data);

        assert_eq!(pull.host_size(), 100 * std::mem::size_of::<f32>());
        assert_eq!(pull.device_size(), pull.host_size());
        assert_eq!(pull.device(), 0);
        assert!(pull.device_ptr().is_none());
        assert!(!pull.has_device_buffer());
    }

    #[test]
    fn drop_after_buffer_was_released_releases_nothing() {
        let rt = Arc::new(EmulatedRuntime::new(1));
        let data = [1u8; 8];
        let pull = Pull::new(&data);
        pull.attach_buffer(DeviceBuffer::allocate(rt.clone(), 0, 8).unwrap())
            .unwrap();

        pull.take_buffer().unwrap().release().unwrap();
        assert_eq!(rt.release_count(), 1);

        drop(pull);
        assert_eq!(rt.allocation_count(), 1);
        assert_eq!(rt.release_count(), 1);
    }

    #[test]
    fn drop_releases_attached_buffer_once() {
        let rt = Arc::new(EmulatedRuntime::new(2));
        let data = [7u32; 16];
        let pull = Pull::new(&data).on_device(1);

        let buf = DeviceBuffer::allocate(rt.clone(), 1, pull.device_size()).unwrap();
        let ptr = buf.ptr();
        pull.attach_buffer(buf).unwrap();
        assert_eq!(pull.device_ptr(), Some(ptr));

        drop(pull);
        assert_eq!(rt.release_count(), 1);
        assert_eq!(rt.live_allocations(), 0);
    }

    #[test]
    fn take_buffer_moves_ownership_out() {
        let rt = Arc::new(EmulatedRuntime::new(1));
        let data = [1u16; 4];
        let pull = Pull::new(&data);
        pull.attach_buffer(DeviceBuffer::allocate(rt.clone(), 0, 8).unwrap())
            .unwrap();

        let buf = pull.take_buffer().unwrap();
        assert!(!pull.has_device_buffer());
        drop(pull);
        assert_eq!(rt.release_count(), 0);

        drop(buf);
        assert_eq!(rt.release_count(), 1);
    }

    #[test]
    fn attach_rejects_mismatched_buffers() {
        let rt = Arc::new(EmulatedRuntime::new(2));
        let data = [0u8; 32];
        let pull = Pull::new(&data);

        let wrong_device = DeviceBuffer::allocate(rt.clone(), 1, 32).unwrap();
        assert!(matches!(
            pull.attach_buffer(wrong_device),
            Err(HeteroflowError::InvalidTransfer(_))
        ));

        let too_small = DeviceBuffer::allocate(rt.clone(), 0, 16).unwrap();
        assert!(pull.attach_buffer(too_small).is_err());

        pull.attach_buffer(DeviceBuffer::allocate(rt.clone(), 0, 32).unwrap())
            .unwrap();
        let second = DeviceBuffer::allocate(rt.clone(), 0, 32).unwrap();
        assert!(pull.attach_buffer(second).is_err());

        // Rejected buffers were released on the spot; only the attached one lives.
        assert_eq!(rt.live_allocations(), 1);
    }
}
