// src/payload/push.rs

use std::sync::{Mutex, PoisonError};

use bytemuck::Pod;

use crate::dag::NodeId;

/// Device→host copy descriptor.
///
/// `source` names the node whose [`crate::payload::Pull`] owns the device
/// buffer to copy back. The Push never owns device memory.
#[derive(Debug)]
pub struct Push<'h> {
    host: Mutex<&'h mut [u8]>,
    host_size: usize,
    source: NodeId,
}

impl<'h> Push<'h> {
    /// Describe a copy from `source`'s device buffer into `target`.
    pub fn new<T: Pod>(target: &'h mut [T], source: NodeId) -> Self {
        let host: &'h mut [u8] = bytemuck::cast_slice_mut(target);
        let host_size = host.len();
        Self {
            host: Mutex::new(host),
            host_size,
            source,
        }
    }

    pub fn host_size(&self) -> usize {
        self.host_size
    }

    /// Node holding the Pull whose buffer is copied back.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Run `f` with exclusive access to the destination bytes.
    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut host = self.host.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **host)
    }
}
