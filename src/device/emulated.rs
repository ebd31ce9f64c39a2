// src/device/emulated.rs

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::device::{DevicePtr, DeviceRuntime, StreamHandle};
use crate::errors::{HeteroflowError, Result};
use crate::payload::LaunchConfig;
use crate::types::{DEFAULT_DEVICE, DeviceId};

/// Alignment of emulated device addresses.
const ALLOC_ALIGN: u64 = 256;

/// Base address handed out for the first allocation.
const BASE_ADDR: u64 = 0x1000;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Device selected by this thread, per runtime instance.
    static SELECTED: RefCell<HashMap<u64, DeviceId>> = RefCell::new(HashMap::new());
}

#[derive(Debug)]
struct Allocation {
    device: DeviceId,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct EmulatedState {
    allocations: HashMap<DevicePtr, Allocation>,
    next_addr: u64,
    allocate_calls: usize,
    release_calls: usize,
    launches: usize,
}

/// Host-memory backed [`DeviceRuntime`].
///
/// Each "device" is a partition of host memory. The runtime keeps the same
/// bookkeeping rules a real driver enforces, so misuse shows up as errors:
/// - device selection is tracked per thread (in thread-local storage, so
///   it goes away with the thread),
/// - memory can only be released or copied while its owning device is
///   selected,
/// - unknown or already released pointers are rejected.
#[derive(Debug)]
pub struct EmulatedRuntime {
    id: u64,
    device_count: u32,
    state: Mutex<EmulatedState>,
}

impl EmulatedRuntime {
    pub fn new(device_count: u32) -> Self {
        Self {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            device_count,
            state: Mutex::new(EmulatedState {
                allocations: HashMap::new(),
                next_addr: BASE_ADDR,
                allocate_calls: 0,
                release_calls: 0,
                launches: 0,
            }),
        }
    }

    /// Number of allocations that have not been released yet.
    pub fn live_allocations(&self) -> usize {
        self.lock().allocations.len()
    }

    /// Total number of successful `allocate` calls.
    pub fn allocation_count(&self) -> usize {
        self.lock().allocate_calls
    }

    /// Total number of successful `release` calls.
    pub fn release_count(&self) -> usize {
        self.lock().release_calls
    }

    /// Total number of kernel launches submitted.
    pub fn launch_count(&self) -> usize {
        self.lock().launches
    }

    /// Snapshot of the bytes behind `ptr`, if it is still allocated.
    pub fn contents(&self, ptr: DevicePtr) -> Option<Vec<u8>> {
        self.lock().allocations.get(&ptr).map(|a| a.bytes.clone())
    }

    fn lock(&self) -> MutexGuard<'_, EmulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn selected_device(&self) -> DeviceId {
        SELECTED.with(|sel| sel.borrow().get(&self.id).copied().unwrap_or(DEFAULT_DEVICE))
    }

    fn check_device(&self, device: DeviceId) -> Result<()> {
        if device >= self.device_count {
            return Err(HeteroflowError::device(
                device,
                format!("no such device ({} available)", self.device_count),
            ));
        }
        Ok(())
    }
}

impl Drop for EmulatedRuntime {
    fn drop(&mut self) {
        // Other threads' entries are freed with those threads.
        let _ = SELECTED.try_with(|sel| sel.borrow_mut().remove(&self.id));
    }
}

impl EmulatedState {
    /// Look up an allocation that must live on `device`.
    fn owned_allocation(&mut self, ptr: DevicePtr, device: DeviceId) -> Result<&mut Allocation> {
        let alloc = self
            .allocations
            .get_mut(&ptr)
            .ok_or_else(|| HeteroflowError::device(device, format!("unknown device pointer {ptr}")))?;

        if alloc.device != device {
            return Err(HeteroflowError::device(
                device,
                format!("pointer {ptr} belongs to device {}", alloc.device),
            ));
        }
        Ok(alloc)
    }
}

impl DeviceRuntime for EmulatedRuntime {
    fn device_count(&self) -> u32 {
        self.device_count
    }

    fn set_device(&self, device: DeviceId) -> Result<()> {
        self.check_device(device)?;
        SELECTED.with(|sel| sel.borrow_mut().insert(self.id, device));
        Ok(())
    }

    fn current_device(&self) -> DeviceId {
        self.selected_device()
    }

    fn allocate(&self, bytes: usize) -> Result<DevicePtr> {
        let device = self.selected_device();
        let mut state = self.lock();

        let addr = state.next_addr;
        let next_addr = u64::try_from(bytes)
            .ok()
            .and_then(|b| b.max(1).div_ceil(ALLOC_ALIGN).checked_mul(ALLOC_ALIGN))
            .and_then(|span| addr.checked_add(span))
            .ok_or_else(|| {
                HeteroflowError::device(device, format!("address space exhausted allocating {bytes} bytes"))
            })?;
        let ptr = DevicePtr::new(addr)
            .ok_or_else(|| HeteroflowError::device(device, "address space exhausted"))?;

        let mut storage: Vec<u8> = Vec::new();
        storage
            .try_reserve_exact(bytes)
            .map_err(|_| HeteroflowError::device(device, "out of device memory"))?;
        storage.resize(bytes, 0);

        state.next_addr = next_addr;
        state.allocations.insert(
            ptr,
            Allocation {
                device,
                bytes: storage,
            },
        );
        state.allocate_calls += 1;
        trace!(device, %ptr, bytes, "emulated allocate");
        Ok(ptr)
    }

    fn release(&self, ptr: DevicePtr) -> Result<()> {
        let device = self.selected_device();
        let mut state = self.lock();
        state.owned_allocation(ptr, device)?;
        state.allocations.remove(&ptr);
        state.release_calls += 1;
        trace!(%ptr, "emulated release");
        Ok(())
    }

    fn copy_to_device(&self, dst: DevicePtr, src: &[u8], _stream: StreamHandle) -> Result<()> {
        let device = self.selected_device();
        let mut state = self.lock();
        let alloc = state.owned_allocation(dst, device)?;
        if src.len() > alloc.bytes.len() {
            return Err(HeteroflowError::device(
                alloc.device,
                format!(
                    "copy of {} bytes overflows {} byte buffer {dst}",
                    src.len(),
                    alloc.bytes.len()
                ),
            ));
        }
        alloc.bytes[..src.len()].copy_from_slice(src);
        Ok(())
    }

    fn copy_to_host(&self, dst: &mut [u8], src: DevicePtr, _stream: StreamHandle) -> Result<()> {
        let device = self.selected_device();
        let mut state = self.lock();
        let alloc = state.owned_allocation(src, device)?;
        if dst.len() > alloc.bytes.len() {
            return Err(HeteroflowError::device(
                alloc.device,
                format!(
                    "copy of {} bytes reads past {} byte buffer {src}",
                    dst.len(),
                    alloc.bytes.len()
                ),
            ));
        }
        dst.copy_from_slice(&alloc.bytes[..dst.len()]);
        Ok(())
    }

    fn launch(&self, config: &LaunchConfig, work: &(dyn Fn(usize) + Sync)) -> Result<()> {
        let current = self.selected_device();
        if current != config.device {
            return Err(HeteroflowError::device(
                current,
                format!("launch targets device {} but it is not selected", config.device),
            ));
        }
        let threads = config.threads().ok_or_else(|| {
            HeteroflowError::device(
                config.device,
                format!(
                    "launch geometry {} x {} overflows the work index range",
                    config.grid, config.block
                ),
            )
        })?;
        self.lock().launches += 1;

        // The lock is not held while user work runs.
        for index in 0..threads {
            work(index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::payload::Dim3;

    #[test]
    fn allocations_are_tagged_with_current_device() {
        let rt = EmulatedRuntime::new(2);
        rt.set_device(1).unwrap();
        let ptr = rt.allocate(32).unwrap();

        rt.set_device(0).unwrap();
        let err = rt.release(ptr).unwrap_err();
        assert!(err.to_string().contains("belongs to device 1"));

        rt.set_device(1).unwrap();
        rt.release(ptr).unwrap();
        assert_eq!(rt.live_allocations(), 0);
    }

    #[test]
    fn double_release_is_rejected() {
        let rt = EmulatedRuntime::new(1);
        let ptr = rt.allocate(4).unwrap();
        rt.release(ptr).unwrap();
        assert!(rt.release(ptr).is_err());
        assert_eq!(rt.release_count(), 1);
    }

    #[test]
    fn copies_round_trip_through_device_memory() {
        let rt = EmulatedRuntime::new(1);
        let ptr = rt.allocate(4).unwrap();

        rt.copy_to_device(ptr, &[1, 2, 3, 4], StreamHandle::DEFAULT).unwrap();
        let mut out = [0u8; 4];
        rt.copy_to_host(&mut out, ptr, StreamHandle::DEFAULT).unwrap();

        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(rt.contents(ptr), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn oversized_copy_is_rejected() {
        let rt = EmulatedRuntime::new(1);
        let ptr = rt.allocate(2).unwrap();
        assert!(rt.copy_to_device(ptr, &[0; 3], StreamHandle::DEFAULT).is_err());
    }

    #[test]
    fn addresses_do_not_overlap() {
        let rt = EmulatedRuntime::new(1);
        let a = rt.allocate(300).unwrap();
        let b = rt.allocate(0).unwrap();
        let c = rt.allocate(1).unwrap();
        assert!(b.addr() >= a.addr() + 300);
        assert!(c.addr() > b.addr());
    }

    #[test]
    fn launch_runs_every_work_index() {
        let rt = EmulatedRuntime::new(1);
        let config = LaunchConfig {
            grid: Dim3::new(2, 1, 1),
            block: Dim3::new(3, 2, 1),
            ..LaunchConfig::default()
        };
        let hits = AtomicUsize::new(0);
        let sum = AtomicUsize::new(0);

        rt.launch(&config, &|i| {
            hits.fetch_add(1, Ordering::Relaxed);
            sum.fetch_add(i, Ordering::Relaxed);
        })
        .unwrap();

        assert_eq!(hits.load(Ordering::Relaxed), 12);
        assert_eq!(sum.load(Ordering::Relaxed), (0..12).sum::<usize>());
        assert_eq!(rt.launch_count(), 1);
    }

    #[test]
    fn oversized_allocation_is_a_device_error() {
        let rt = EmulatedRuntime::new(1);

        let err = rt.allocate(usize::MAX).unwrap_err();
        assert!(matches!(err, HeteroflowError::Device { device: 0, .. }));

        let err = rt.allocate(isize::MAX as usize).unwrap_err();
        assert!(err.to_string().contains("out of device memory"));

        assert_eq!(rt.allocation_count(), 0);
        let ptr = rt.allocate(8).unwrap();
        assert_eq!(ptr.addr(), BASE_ADDR);
    }

    #[test]
    fn overflowing_launch_is_rejected_without_running() {
        let rt = EmulatedRuntime::new(1);
        let config = LaunchConfig {
            grid: Dim3::new(u32::MAX, 65535, 65535),
            block: Dim3::new(1024, 1, 1),
            ..LaunchConfig::default()
        };
        let hits = AtomicUsize::new(0);

        let err = rt
            .launch(&config, &|_| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap_err();
        assert!(matches!(err, HeteroflowError::Device { .. }));
        assert_eq!(hits.load(Ordering::Relaxed), 0);
        assert_eq!(rt.launch_count(), 0);
    }

    #[test]
    fn device_selection_is_per_thread_and_per_runtime() {
        let rt = EmulatedRuntime::new(2);
        let other = EmulatedRuntime::new(2);
        rt.set_device(1).unwrap();

        assert_eq!(rt.current_device(), 1);
        assert_eq!(other.current_device(), DEFAULT_DEVICE);

        std::thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(rt.current_device(), DEFAULT_DEVICE);
                rt.set_device(1).unwrap();
            });
        });
        assert_eq!(rt.current_device(), 1);

        drop(rt);
        let fresh = EmulatedRuntime::new(2);
        assert_eq!(fresh.current_device(), DEFAULT_DEVICE);
    }

    #[test]
    fn launch_on_unselected_device_fails() {
        let rt = EmulatedRuntime::new(2);
        let config = LaunchConfig {
            device: 1,
            ..LaunchConfig::default()
        };
        assert!(rt.launch(&config, &|_| {}).is_err());
        assert_eq!(rt.launch_count(), 0);
    }
}
