use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::debug;

use heteroflow::dag::{Graph, Node, NodeId};
use heteroflow::device::{DeviceBuffer, DeviceRuntime, EmulatedRuntime, StreamHandle};
use heteroflow::errors::{HeteroflowError, Result};
use heteroflow::payload::Payload;

/// A single-threaded executor that:
/// - seeds a FIFO with every node whose counter is zero
/// - runs each payload against an `EmulatedRuntime`
/// - decrements successor counters and enqueues those that hit zero.
///
/// Pull nodes get their buffer allocated here, which is the executor's job.
pub struct SequentialExecutor {
    runtime: Arc<EmulatedRuntime>,
}

impl SequentialExecutor {
    pub fn new(runtime: Arc<EmulatedRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<EmulatedRuntime> {
        &self.runtime
    }

    /// Execute the whole graph once and return the dispatch order.
    pub fn run(&self, graph: &Graph<'_>) -> Result<Vec<NodeId>> {
        let mut ready: VecDeque<NodeId> = graph.ready().into();
        let mut order = Vec::with_capacity(graph.len());

        while let Some(id) = ready.pop_front() {
            let node = graph.node(id).ok_or(HeteroflowError::NodeNotFound(id))?;
            self.dispatch(graph, node)?;
            order.push(id);

            for &succ in node.successors() {
                let succ_node = graph
                    .node(succ)
                    .ok_or(HeteroflowError::NodeNotFound(succ))?;
                if succ_node.resolve_dependency()? {
                    ready.push_back(succ);
                }
            }
        }

        if order.len() != graph.len() {
            return Err(anyhow!(
                "executor stalled after {} of {} nodes",
                order.len(),
                graph.len()
            )
            .into());
        }
        Ok(order)
    }

    fn dispatch(&self, graph: &Graph<'_>, node: &Node<'_>) -> Result<()> {
        debug!(node = %node.name(), kind = %node.kind(), "dispatching");

        match node.payload() {
            Payload::Host(host) => host.run(),
            Payload::Pull(pull) => {
                if !pull.has_device_buffer() {
                    let runtime: Arc<dyn DeviceRuntime> = self.runtime.clone();
                    let buf = DeviceBuffer::allocate(runtime, pull.device(), pull.device_size())?;
                    pull.attach_buffer(buf)?;
                }
                let ptr = pull.device_ptr().ok_or_else(|| {
                    HeteroflowError::InvalidTransfer(format!("pull '{}' lost its buffer", node.name()))
                })?;
                self.runtime.set_device(pull.device())?;
                self.runtime
                    .copy_to_device(ptr, pull.host_bytes(), StreamHandle::DEFAULT)?;
            }
            Payload::Kernel(kernel) => kernel.submit(&*self.runtime)?,
            Payload::Push(push) => {
                let source = graph
                    .node(push.source())
                    .and_then(|n| n.payload().as_pull())
                    .ok_or_else(|| {
                        HeteroflowError::InvalidTransfer(format!(
                            "push '{}' has no pull source",
                            node.name()
                        ))
                    })?;
                let ptr = source.device_ptr().ok_or_else(|| {
                    HeteroflowError::InvalidTransfer(format!(
                        "push '{}' ran before its source buffer existed",
                        node.name()
                    ))
                })?;
                self.runtime.set_device(source.device())?;
                push.with_host_mut(|host| {
                    self.runtime.copy_to_host(host, ptr, StreamHandle::DEFAULT)
                })?;
            }
        }
        Ok(())
    }
}
