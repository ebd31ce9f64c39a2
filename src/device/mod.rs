// src/device/mod.rs

//! Device runtime abstraction.
//!
//! The task graph never talks to a vendor runtime directly. Everything that
//! touches device memory or submits device work goes through the
//! [`DeviceRuntime`] trait:
//!
//! - [`buffer`] holds [`DeviceBuffer`], the RAII guard that releases a device
//!   allocation exactly once, on the device it was allocated on.
//! - [`emulated`] provides [`EmulatedRuntime`], a host-memory backed runtime
//!   used by tests and by callers without an accelerator.

use std::fmt;
use std::num::NonZeroU64;

use crate::errors::Result;
use crate::payload::LaunchConfig;
use crate::types::DeviceId;

pub mod buffer;
pub mod emulated;

pub use buffer::DeviceBuffer;
pub use emulated::EmulatedRuntime;

/// Opaque, non-null device address.
///
/// A missing buffer is expressed as `Option<DevicePtr>::None`, never as a
/// zero address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(NonZeroU64);

impl DevicePtr {
    /// Wrap a raw address; returns `None` for null.
    pub fn new(addr: u64) -> Option<Self> {
        NonZeroU64::new(addr).map(DevicePtr)
    }

    pub fn addr(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Handle of a device-side ordered execution queue.
///
/// The handle is not owned by whoever stores it; stream creation and
/// destruction belong to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamHandle(pub u64);

impl StreamHandle {
    /// The implicit per-device stream.
    pub const DEFAULT: StreamHandle = StreamHandle(0);
}

/// Native device runtime as seen by the task graph.
///
/// Device selection is per calling thread, like the CUDA runtime: every
/// operation other than [`DeviceRuntime::set_device`] acts on the device most
/// recently selected by the current thread (device 0 if none was selected).
pub trait DeviceRuntime: Send + Sync + fmt::Debug {
    /// Number of devices this runtime exposes.
    fn device_count(&self) -> u32;

    /// Select the device context for the calling thread.
    fn set_device(&self, device: DeviceId) -> Result<()>;

    /// Device currently selected by the calling thread.
    fn current_device(&self) -> DeviceId;

    /// Allocate `bytes` of device memory on the current device.
    fn allocate(&self, bytes: usize) -> Result<DevicePtr>;

    /// Release an allocation made on the current device.
    fn release(&self, ptr: DevicePtr) -> Result<()>;

    /// Copy host bytes into device memory.
    fn copy_to_device(&self, dst: DevicePtr, src: &[u8], stream: StreamHandle) -> Result<()>;

    /// Copy device memory back into a host slice.
    fn copy_to_host(&self, dst: &mut [u8], src: DevicePtr, stream: StreamHandle) -> Result<()>;

    /// Submit `work` for every linear work index described by `config`.
    fn launch(&self, config: &LaunchConfig, work: &(dyn Fn(usize) + Sync)) -> Result<()>;
}
