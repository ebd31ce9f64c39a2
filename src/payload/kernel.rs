// src/payload/kernel.rs

use std::fmt;

use tracing::debug;

use crate::device::{DeviceRuntime, StreamHandle};
use crate::errors::Result;
use crate::types::{DEFAULT_DEVICE, DeviceId};

/// Three-dimensional launch extent (grid or block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dim3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dim3 {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Number of points covered by this extent, or `None` if it does not
    /// fit in `usize`.
    pub fn volume(&self) -> Option<usize> {
        [self.y, self.z]
            .into_iter()
            .try_fold(self.x as usize, |acc, d| acc.checked_mul(d as usize))
    }
}

impl Default for Dim3 {
    fn default() -> Self {
        Dim3::new(1, 1, 1)
    }
}

impl From<u32> for Dim3 {
    fn from(x: u32) -> Self {
        Dim3::new(x, 1, 1)
    }
}

impl From<[u32; 3]> for Dim3 {
    fn from([x, y, z]: [u32; 3]) -> Self {
        Dim3::new(x, y, z)
    }
}

impl From<(u32, u32, u32)> for Dim3 {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Dim3::new(x, y, z)
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Everything needed to submit one kernel to a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    pub device: DeviceId,
    pub grid: Dim3,
    pub block: Dim3,
    /// Dynamic shared memory per block, in bytes.
    pub shared_memory: usize,
    pub stream: StreamHandle,
}

impl LaunchConfig {
    /// Total number of work indices (`grid.volume() * block.volume()`).
    ///
    /// `None` when the product overflows `usize`.
    pub fn threads(&self) -> Option<usize> {
        self.grid.volume()?.checked_mul(self.block.volume()?)
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE,
            grid: Dim3::default(),
            block: Dim3::default(),
            shared_memory: 0,
            stream: StreamHandle::DEFAULT,
        }
    }
}

/// Device kernel launch descriptor.
///
/// A kernel is a callable taking the implicit work index followed by one
/// argument bundle, and returning nothing. The signature is checked by the
/// compiler:
///
/// ```
/// use heteroflow::payload::{Dim3, Kernel};
///
/// let kernel = Kernel::new(|i, scale: &f32| { let _ = i as f32 * scale; }, 2.0f32)
///     .grid(Dim3::new(4, 1, 1))
///     .block(32u32);
/// assert_eq!(kernel.launch_config().threads(), Some(128));
/// ```
///
/// Three parameters:
///
/// ```compile_fail
/// use heteroflow::payload::Kernel;
///
/// let _ = Kernel::new(|_i: usize, _a: &u32, _b: &u32| {}, 1u32);
/// ```
///
/// A return value:
///
/// ```compile_fail
/// use heteroflow::payload::Kernel;
///
/// let _ = Kernel::new(|i: usize, a: &usize| -> usize { i + *a }, 1usize);
/// ```
///
/// A work index that is not `usize`:
///
/// ```compile_fail
/// use heteroflow::payload::Kernel;
///
/// let _ = Kernel::new(|_i: u32, _a: &u32| {}, 1u32);
/// ```
pub struct Kernel<'h> {
    launch: LaunchConfig,
    work: Box<dyn Fn(usize) + Send + Sync + 'h>,
}

impl<'h> Kernel<'h> {
    /// Bind `func` to `args`. The launch configuration starts at
    /// [`LaunchConfig::default`].
    pub fn new<F, A>(func: F, args: A) -> Self
    where
        F: Fn(usize, &A) + Send + Sync + 'h,
        A: Send + Sync + 'h,
    {
        Self {
            launch: LaunchConfig::default(),
            work: Box::new(move |index| func(index, &args)),
        }
    }

    pub fn on_device(mut self, device: DeviceId) -> Self {
        self.launch.device = device;
        self
    }

    pub fn grid(mut self, grid: impl Into<Dim3>) -> Self {
        self.launch.grid = grid.into();
        self
    }

    pub fn block(mut self, block: impl Into<Dim3>) -> Self {
        self.launch.block = block.into();
        self
    }

    pub fn shared_memory(mut self, bytes: usize) -> Self {
        self.launch.shared_memory = bytes;
        self
    }

    pub fn stream(mut self, stream: StreamHandle) -> Self {
        self.launch.stream = stream;
        self
    }

    /// Replace the whole launch configuration.
    pub fn with_launch(mut self, launch: LaunchConfig) -> Self {
        self.launch = launch;
        self
    }

    pub fn launch_config(&self) -> &LaunchConfig {
        &self.launch
    }

    pub fn device(&self) -> DeviceId {
        self.launch.device
    }

    pub fn grid_dims(&self) -> Dim3 {
        self.launch.grid
    }

    pub fn block_dims(&self) -> Dim3 {
        self.launch.block
    }

    pub fn shared_memory_size(&self) -> usize {
        self.launch.shared_memory
    }

    pub fn stream_handle(&self) -> StreamHandle {
        self.launch.stream
    }

    /// Run the kernel body for a single work index on the calling thread.
    pub fn invoke(&self, index: usize) {
        (self.work)(index)
    }

    /// Select the kernel's device and submit it with the stored launch
    /// configuration.
    pub fn submit(&self, runtime: &dyn DeviceRuntime) -> Result<()> {
        let launch = &self.launch;
        runtime.set_device(launch.device)?;
        debug!(
            device = launch.device,
            grid = %launch.grid,
            block = %launch.block,
            shared_memory = launch.shared_memory,
            stream = launch.stream.0,
            "submitting kernel"
        );
        runtime.launch(launch, &*self.work)
    }
}

impl fmt::Debug for Kernel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("launch", &self.launch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::device::EmulatedRuntime;

    #[test]
    fn defaults_are_a_single_thread_on_device_zero() {
        let k = Kernel::new(|_, _: &()| {}, ());
        assert_eq!(k.device(), 0);
        assert_eq!(k.grid_dims(), Dim3::new(1, 1, 1));
        assert_eq!(k.block_dims(), Dim3::new(1, 1, 1));
        assert_eq!(k.shared_memory_size(), 0);
        assert_eq!(k.stream_handle(), StreamHandle::DEFAULT);
        assert_eq!(k.launch_config().threads(), Some(1));
    }

    #[test]
    fn setters_update_launch_fields() {
        let k = Kernel::new(|_, _: &()| {}, ())
            .on_device(2)
            .grid([2u32, 2, 1])
            .block((64u32, 1u32, 1u32))
            .shared_memory(4096)
            .stream(StreamHandle(9));

        assert_eq!(k.device(), 2);
        assert_eq!(k.grid_dims(), Dim3::new(2, 2, 1));
        assert_eq!(k.block_dims(), Dim3::new(64, 1, 1));
        assert_eq!(k.shared_memory_size(), 4096);
        assert_eq!(k.stream_handle(), StreamHandle(9));
        assert_eq!(k.launch_config().threads(), Some(256));
    }

    #[test]
    fn oversized_geometry_has_no_thread_count() {
        let k = Kernel::new(|_, _: &()| {}, ())
            .grid(Dim3::new(u32::MAX, 65535, 65535))
            .block(Dim3::new(1024, 1, 1));

        assert_eq!(Dim3::new(u32::MAX, u32::MAX, u32::MAX).volume(), None);
        assert_eq!(k.launch_config().threads(), None);
        assert_eq!(Dim3::new(u32::MAX, 1, 1).volume(), Some(u32::MAX as usize));
    }

    #[test]
    fn invoke_passes_index_and_bound_args() {
        let seen = Mutex::new(Vec::new());
        let k = Kernel::new(
            |i, offset: &usize| seen.lock().unwrap().push(i + *offset),
            10usize,
        );

        k.invoke(0);
        k.invoke(5);
        drop(k);
        assert_eq!(seen.into_inner().unwrap(), vec![10, 15]);
    }

    #[test]
    fn submit_uses_stored_geometry() {
        let rt = EmulatedRuntime::new(2);
        let hits = AtomicUsize::new(0);
        let k = Kernel::new(
            |_, counter: &&AtomicUsize| {
                counter.fetch_add(1, Ordering::Relaxed);
            },
            &hits,
        )
        .on_device(1)
        .grid(3u32)
        .block(4u32);

        k.submit(&rt).unwrap();

        assert_eq!(hits.load(Ordering::Relaxed), 12);
        assert_eq!(rt.current_device(), 1);
        assert_eq!(rt.launch_count(), 1);
    }
}
