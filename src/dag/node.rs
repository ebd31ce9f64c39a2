// src/dag/node.rs

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{Level, trace, warn};

use crate::errors::{HeteroflowError, Result};
use crate::payload::{Payload, TaskKind};

/// Stable index of a node inside its graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A vertex of the task graph: one payload plus its edges and readiness
/// counter.
///
/// `pending_dependencies` starts at zero and is bumped once per incoming
/// edge, so before execution it equals `dependents().len()`. During
/// execution the executor decrements it with [`Node::resolve_dependency`]
/// as predecessors finish; reaching zero is the readiness signal.
///
/// The counter only publishes its own value. Data produced by a predecessor
/// must be made visible to successors by the executor's own synchronization.
#[derive(Debug)]
pub struct Node<'h> {
    id: NodeId,
    name: String,
    payload: Payload<'h>,
    successors: Vec<NodeId>,
    dependents: Vec<NodeId>,
    pending: AtomicUsize,
}

impl<'h> Node<'h> {
    pub(crate) fn new(id: NodeId, name: String, payload: Payload<'h>) -> Self {
        Self {
            id,
            name,
            payload,
            successors: Vec::new(),
            dependents: Vec::new(),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Diagnostic label; not required to be unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Payload<'h> {
        &self.payload
    }

    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }

    pub fn is_host(&self) -> bool {
        self.payload.is_host()
    }

    pub fn is_pull(&self) -> bool {
        self.payload.is_pull()
    }

    pub fn is_push(&self) -> bool {
        self.payload.is_push()
    }

    pub fn is_kernel(&self) -> bool {
        self.payload.is_kernel()
    }

    /// Nodes this one must run before, in insertion order.
    pub fn successors(&self) -> &[NodeId] {
        &self.successors
    }

    /// Nodes that must run before this one, in insertion order.
    pub fn dependents(&self) -> &[NodeId] {
        &self.dependents
    }

    /// Current value of the readiness counter (`Acquire` load).
    pub fn pending_dependencies(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.pending_dependencies() == 0
    }

    /// Record that one predecessor finished.
    ///
    /// Returns `Ok(true)` for the single call that brings the counter to
    /// zero. The decrement is `AcqRel`, so whoever observes zero also
    /// observes every earlier decrement. Decrementing a zero counter is an
    /// executor bug and fails with [`HeteroflowError::CounterUnderflow`].
    pub fn resolve_dependency(&self) -> Result<bool> {
        match self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(prev) => Ok(prev == 1),
            Err(_) => Err(HeteroflowError::CounterUnderflow(self.id)),
        }
    }

    /// Re-arm the counter to the number of incoming edges.
    pub(crate) fn reset_pending(&mut self) {
        *self.pending.get_mut() = self.dependents.len();
    }
}

/// Establish that `a` runs before `b`.
///
/// Appends `b` to `a`'s successors, `a` to `b`'s dependents and bumps
/// `b`'s counter. Self-edges, duplicates and cycles are not rejected here;
/// see [`crate::dag::validate`].
pub(crate) fn precede(nodes: &mut [Node<'_>], a: NodeId, b: NodeId) -> Result<()> {
    let len = nodes.len();
    for id in [a, b] {
        if id.0 >= len {
            return Err(HeteroflowError::NodeNotFound(id));
        }
    }

    let lhs = &mut nodes[a.0];
    // The scan is linear in fan-out; only pay for it when the warning is seen.
    if tracing::enabled!(Level::WARN) && lhs.successors.contains(&b) {
        warn!(from = %lhs.name, to = %b, "adding duplicate edge");
    }
    lhs.successors.push(b);

    let rhs = &mut nodes[b.0];
    rhs.dependents.push(a);
    // Only the count itself needs to be race-free.
    rhs.pending.fetch_add(1, Ordering::Relaxed);

    trace!(from = %a, to = %b, "edge added");
    Ok(())
}
