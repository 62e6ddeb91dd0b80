//!
//! # gradgraph-core
//!
//! Reverse-mode automatic differentiation over an append-only arena.
//!
//! Every node of a [`Graph`] stores its value, its parents and the local
//! derivative of its value with respect to each parent. Gradients can then be
//! extracted two ways:
//!
//! - [`Graph::backward`] walks the nodes once in topological order and
//!   accumulates d(root)/d(node) into every ancestor;
//! - [`Graph::gradients`] multiplies local derivatives along every path and
//!   returns the sums keyed by printed value, leaving the graph untouched.
//!
//! The graph is generic over the algebra it computes in ([`Value`]); `f64`
//! is supported out of the box.
//!
//! ```
//! use gradgraph_core::Graph;
//!
//! let graph = Graph::<f64>::new();
//! let a = graph.var(3.0);
//! let b = graph.var(4.0);
//! let c = a * b + a;
//! c.backward().unwrap();
//! assert_eq!(a.grad(), 5.0);
//! assert_eq!(b.grad(), 3.0);
//! ```
//!
//! ## Invariants
//!
//! 1. A node only ever names nodes created before it as parents, so the graph
//!    is acyclic and a parent's handle is always smaller than its child's
//! 2. A node lists each parent once; operands that repeat a node have their
//!    local derivatives summed
//! 3. Values never change after construction, only accumulated gradients do
//!

mod backward;
mod config;
mod error;
mod graph;
mod ops;
mod query;
mod schedule;
mod value;

pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use graph::{Graph, NodeId, Operand, Var};
pub use query::Gradients;
pub use value::Value;
