// src/dag/validate.rs

//! Structural checks for a task graph.
//!
//! The edge protocol itself accepts anything; these checks run on
//! [`crate::dag::GraphBuilder::freeze`] (unless disabled) or on demand via
//! [`crate::dag::Graph::validate`]:
//!
//! - no node precedes itself,
//! - the graph is acyclic,
//! - every Push reads from an existing Pull node,
//! - every Push is reachable from its source Pull, so the buffer is
//!   populated before the copy back and outlives it,
//! - a Push never copies more bytes than its source Pull holds.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::dag::node::{Node, NodeId};
use crate::errors::{HeteroflowError, Result};
use crate::payload::Payload;

/// Mirror the arena as a petgraph graph. Node index `i` is `NodeId(i)`.
fn to_petgraph(nodes: &[Node<'_>]) -> DiGraph<NodeId, ()> {
    let mut graph = DiGraph::with_capacity(nodes.len(), 0);
    for node in nodes {
        graph.add_node(node.id());
    }
    for node in nodes {
        for succ in node.successors() {
            graph.add_edge(NodeIndex::new(node.id().0), NodeIndex::new(succ.0), ());
        }
    }
    graph
}

/// Compute a topological order of the nodes.
pub fn topological_order(nodes: &[Node<'_>]) -> Result<Vec<NodeId>> {
    let graph = to_petgraph(nodes);
    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(|ix| graph[ix]).collect()),
        Err(cycle) => {
            let id = graph[cycle.node_id()];
            let name = nodes.get(id.0).map(Node::name).unwrap_or("?");
            Err(HeteroflowError::DagCycle(format!(
                "cycle detected in task graph involving node '{name}' ({id})"
            )))
        }
    }
}

/// Run every structural check.
pub fn validate_nodes(nodes: &[Node<'_>]) -> Result<()> {
    validate_edges(nodes)?;
    topological_order(nodes)?;
    validate_transfers(nodes)?;
    debug!(nodes = nodes.len(), "task graph validated");
    Ok(())
}

fn validate_edges(nodes: &[Node<'_>]) -> Result<()> {
    for node in nodes {
        if node.successors().contains(&node.id()) {
            return Err(HeteroflowError::InvalidEdge(format!(
                "node '{}' ({}) cannot precede itself",
                node.name(),
                node.id()
            )));
        }
    }
    Ok(())
}

fn validate_transfers(nodes: &[Node<'_>]) -> Result<()> {
    let graph = to_petgraph(nodes);

    for node in nodes {
        let Payload::Push(push) = node.payload() else {
            continue;
        };

        let src_id = push.source();
        let source = nodes.get(src_id.0).ok_or_else(|| {
            HeteroflowError::InvalidTransfer(format!(
                "push '{}' reads from unknown node {src_id}",
                node.name()
            ))
        })?;

        let Payload::Pull(pull) = source.payload() else {
            return Err(HeteroflowError::InvalidTransfer(format!(
                "push '{}' reads from '{}', a {} node, not a pull",
                node.name(),
                source.name(),
                source.kind()
            )));
        };

        if !has_path_connecting(
            &graph,
            NodeIndex::new(src_id.0),
            NodeIndex::new(node.id().0),
            None,
        ) {
            return Err(HeteroflowError::InvalidTransfer(format!(
                "push '{}' is not ordered after its source pull '{}'",
                node.name(),
                source.name()
            )));
        }

        if push.host_size() > pull.device_size() {
            return Err(HeteroflowError::InvalidTransfer(format!(
                "push '{}' copies {} bytes but pull '{}' only holds {}",
                node.name(),
                push.host_size(),
                source.name(),
                pull.device_size()
            )));
        }
    }
    Ok(())
}

/// Graphviz rendering with `name [kind]` labels.
pub fn to_dot(nodes: &[Node<'_>]) -> String {
    // `Dot` needs a `Display` edge weight even when edge labels are off.
    let mut graph: DiGraph<String, &'static str> = DiGraph::with_capacity(nodes.len(), 0);
    for node in nodes {
        graph.add_node(format!("{} [{}]", node.name(), node.kind()));
    }
    for node in nodes {
        for succ in node.successors() {
            graph.add_edge(NodeIndex::new(node.id().0), NodeIndex::new(succ.0), "");
        }
    }
    format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}
