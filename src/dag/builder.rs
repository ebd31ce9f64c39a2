// src/dag/builder.rs

use bytemuck::Pod;
use tracing::debug;

use crate::config::HeteroflowConfig;
use crate::dag::graph::Graph;
use crate::dag::node::{self, Node, NodeId};
use crate::dag::validate;
use crate::errors::Result;
use crate::payload::{Host, Kernel, Payload, Pull, Push};

/// Construction phase of a task graph.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Edges are added
/// with [`GraphBuilder::precede`]; once the graph is complete,
/// [`GraphBuilder::freeze`] turns it into an immutable [`Graph`].
///
/// The convenience constructors (`pull`, `kernel`) apply the defaults from
/// the builder's [`HeteroflowConfig`]; payloads passed to
/// [`GraphBuilder::emplace`] are taken as they are.
#[derive(Debug)]
pub struct GraphBuilder<'h> {
    nodes: Vec<Node<'h>>,
    config: HeteroflowConfig,
}

impl<'h> GraphBuilder<'h> {
    pub fn new() -> Self {
        Self::with_config(&HeteroflowConfig::default())
    }

    pub fn with_config(config: &HeteroflowConfig) -> Self {
        Self {
            nodes: Vec::new(),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &HeteroflowConfig {
        &self.config
    }

    /// Add a node carrying `payload`.
    pub fn emplace(&mut self, name: impl Into<String>, payload: impl Into<Payload<'h>>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = Node::new(id, name.into(), payload.into());
        debug!(id = %id, name = %node.name(), kind = %node.kind(), "node created");
        self.nodes.push(node);
        id
    }

    /// Add a CPU task.
    pub fn host<F>(&mut self, name: impl Into<String>, work: F) -> NodeId
    where
        F: Fn() + Send + Sync + 'h,
    {
        self.emplace(name, Host::new(work))
    }

    /// Add a host→device copy of `data` to the configured default device.
    pub fn pull<T: Pod>(&mut self, name: impl Into<String>, data: &'h [T]) -> NodeId {
        let pull = Pull::new(data).on_device(self.config.device.default);
        self.emplace(name, pull)
    }

    /// Add a device→host copy of `source`'s buffer into `target`.
    pub fn push<T: Pod>(
        &mut self,
        name: impl Into<String>,
        target: &'h mut [T],
        source: NodeId,
    ) -> NodeId {
        self.emplace(name, Push::new(target, source))
    }

    /// Add a kernel launch with the configured default launch geometry.
    pub fn kernel<F, A>(&mut self, name: impl Into<String>, func: F, args: A) -> NodeId
    where
        F: Fn(usize, &A) + Send + Sync + 'h,
        A: Send + Sync + 'h,
    {
        let kernel = Kernel::new(func, args).with_launch(self.config.default_launch());
        self.emplace(name, kernel)
    }

    /// `a` runs before `b`.
    pub fn precede(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        node::precede(&mut self.nodes, a, b)
    }

    /// `a` runs before every node in `successors`.
    pub fn precede_all(&mut self, a: NodeId, successors: &[NodeId]) -> Result<()> {
        for &b in successors {
            self.precede(a, b)?;
        }
        Ok(())
    }

    /// Chain `ids` so each node runs before the next one.
    pub fn linearize(&mut self, ids: &[NodeId]) -> Result<()> {
        for pair in ids.windows(2) {
            self.precede(pair[0], pair[1])?;
        }
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<'h>> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// End construction.
    ///
    /// Runs [`validate::validate_nodes`] first when
    /// `[graph].validate_on_freeze` is set.
    pub fn freeze(self) -> Result<Graph<'h>> {
        if self.config.graph.validate_on_freeze {
            validate::validate_nodes(&self.nodes)?;
        }
        debug!(nodes = self.nodes.len(), "graph frozen");
        Ok(Graph::from_nodes(self.nodes))
    }
}

impl Default for GraphBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
