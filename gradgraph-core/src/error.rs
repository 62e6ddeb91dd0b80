use thiserror::Error;

use crate::graph::NodeId;

pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// Failures raised while building or differentiating a graph.
///
/// Arithmetic anomalies (division by zero, `ln` of a negative number...) are
/// not errors here, the value type decides what they produce and that result
/// is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  /// An operand handed to an operator was created on another graph
  #[error("operand {node} belongs to a different graph")]
  ForeignNode { node: NodeId },

  /// A node names a parent that was not created before it
  #[error("cycle detected: {node} lists {parent} as a parent")]
  Cycle { node: NodeId, parent: NodeId },

  /// The path-accumulation query expanded more edges than allowed
  #[error("path accumulation expanded more than {limit} edges")]
  PathLimitExceeded { limit: usize },
}
