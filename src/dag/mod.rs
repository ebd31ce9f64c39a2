// src/dag/mod.rs

//! Task graph representation.
//!
//! - [`node`] holds [`Node`], the vertex type, and the edge protocol.
//! - [`builder`] contains [`GraphBuilder`], the construction phase.
//! - [`graph`] contains [`Graph`], the frozen, execution-phase view.
//! - [`validate`] checks structural invariants with `petgraph`.
//!
//! The two phases are separate types: edges can only be added through
//! `&mut GraphBuilder`, and executors only ever see a `Graph`, so
//! construction and execution of one graph cannot interleave.

pub mod builder;
pub mod graph;
pub mod node;
pub mod validate;

pub use builder::GraphBuilder;
pub use graph::Graph;
pub use node::{Node, NodeId};
