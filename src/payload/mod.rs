// src/payload/mod.rs

//! Task payloads: what a node actually does.
//!
//! The set of payload kinds is closed. Executors branch on [`Payload`] with an
//! exhaustive `match` instead of going through dynamic dispatch per task.
//!
//! - [`host`]: a CPU callable.
//! - [`pull`]: a host→device copy that owns the resulting device buffer.
//! - [`push`]: a device→host copy reading another node's Pull buffer.
//! - [`kernel`]: a device kernel launch descriptor.

use std::fmt;

pub mod host;
pub mod kernel;
pub mod pull;
pub mod push;

pub use host::Host;
pub use kernel::{Dim3, Kernel, LaunchConfig};
pub use pull::Pull;
pub use push::Push;

/// Discriminant of a [`Payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Host,
    Pull,
    Push,
    Kernel,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Host => "host",
            TaskKind::Pull => "pull",
            TaskKind::Push => "push",
            TaskKind::Kernel => "kernel",
        };
        f.write_str(s)
    }
}

/// The unit of work carried by a node. Selected once, never switched.
#[derive(Debug)]
pub enum Payload<'h> {
    Host(Host<'h>),
    Pull(Pull<'h>),
    Push(Push<'h>),
    Kernel(Kernel<'h>),
}

impl<'h> Payload<'h> {
    pub fn kind(&self) -> TaskKind {
        match self {
            Payload::Host(_) => TaskKind::Host,
            Payload::Pull(_) => TaskKind::Pull,
            Payload::Push(_) => TaskKind::Push,
            Payload::Kernel(_) => TaskKind::Kernel,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Payload::Host(_))
    }

    pub fn is_pull(&self) -> bool {
        matches!(self, Payload::Pull(_))
    }

    pub fn is_push(&self) -> bool {
        matches!(self, Payload::Push(_))
    }

    pub fn is_kernel(&self) -> bool {
        matches!(self, Payload::Kernel(_))
    }

    pub fn as_host(&self) -> Option<&Host<'h>> {
        match self {
            Payload::Host(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_pull(&self) -> Option<&Pull<'h>> {
        match self {
            Payload::Pull(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_push(&self) -> Option<&Push<'h>> {
        match self {
            Payload::Push(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_kernel(&self) -> Option<&Kernel<'h>> {
        match self {
            Payload::Kernel(k) => Some(k),
            _ => None,
        }
    }
}

impl<'h> From<Host<'h>> for Payload<'h> {
    fn from(h: Host<'h>) -> Self {
        Payload::Host(h)
    }
}

impl<'h> From<Pull<'h>> for Payload<'h> {
    fn from(p: Pull<'h>) -> Self {
        Payload::Pull(p)
    }
}

impl<'h> From<Push<'h>> for Payload<'h> {
    fn from(p: Push<'h>) -> Self {
        Payload::Push(p)
    }
}

impl<'h> From<Kernel<'h>> for Payload<'h> {
    fn from(k: Kernel<'h>) -> Self {
        Payload::Kernel(k)
    }
}
