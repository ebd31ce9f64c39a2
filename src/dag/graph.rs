// src/dag/graph.rs

use tracing::debug;

use crate::dag::node::{Node, NodeId};
use crate::dag::validate;
use crate::errors::Result;

/// A frozen task graph, ready to be walked by an executor.
///
/// Adjacency lists and payload kinds are fixed. What may still change:
/// - readiness counters, through [`Node::resolve_dependency`] and
///   [`Graph::reset`],
/// - Pull buffer slots and Push destinations, through their own
///   synchronized accessors.
///
/// `Graph` is `Sync`, so executors can share `&Graph` between worker
/// threads. Dropping the graph drops every node, which releases any device
/// buffer still owned by a Pull.
#[derive(Debug)]
pub struct Graph<'h> {
    nodes: Vec<Node<'h>>,
}

impl<'h> Graph<'h> {
    pub(crate) fn from_nodes(nodes: Vec<Node<'h>>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<'h>> {
        self.nodes.get(id.0)
    }

    /// All nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<'h>> {
        self.nodes.iter()
    }

    /// Nodes without incoming edges.
    pub fn sources(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.dependents().is_empty())
            .map(Node::id)
            .collect()
    }

    /// Nodes without outgoing edges.
    pub fn sinks(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.successors().is_empty())
            .map(Node::id)
            .collect()
    }

    /// Nodes whose readiness counter is currently zero.
    pub fn ready(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_ready())
            .map(Node::id)
            .collect()
    }

    /// A dependency-respecting order of all nodes.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        validate::topological_order(&self.nodes)
    }

    /// Check the structural invariants (see [`validate::validate_nodes`]).
    pub fn validate(&self) -> Result<()> {
        validate::validate_nodes(&self.nodes)
    }

    /// Re-arm every readiness counter so the graph can be executed again.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset_pending();
        }
        debug!(nodes = self.nodes.len(), "readiness counters re-armed");
    }

    /// Render the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        validate::to_dot(&self.nodes)
    }

    /// Give up the arena and hand back the nodes, in id order.
    pub fn into_nodes(self) -> Vec<Node<'h>> {
        self.nodes
    }
}
