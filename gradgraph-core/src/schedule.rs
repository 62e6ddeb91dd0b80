use bit_set::BitSet;

use crate::error::{GraphError, Result};
use crate::graph::{Graph, Node, NodeId, Var};
use crate::value::Value;

impl<T: Value> Graph<T> {
  /// Order `root` and all of its ancestors so that every node comes strictly
  /// before each of its parents; each node appears exactly once.
  ///
  /// The order is deterministic: parents are explored in operand order.
  pub fn topological_order(&self, root: &Var<'_, T>) -> Result<Vec<NodeId>> {
    let root = self.owned(root)?;
    let nodes = self.nodes.borrow();
    reverse_postorder(&nodes, root)
  }
}

/// Linear dfs over parent edges, reversed postorder
pub(crate) fn reverse_postorder<T>(nodes: &[Node<T>], root: NodeId) -> Result<Vec<NodeId>> {
  let mut stack = Vec::with_capacity(64);
  let mut postorder = Vec::with_capacity(64);
  let mut visited = BitSet::with_capacity(nodes.len());

  stack.push((root, false));

  while let Some((id, expanded)) = stack.pop() {
    if expanded {
      postorder.push(id);
      continue;
    }
    if !visited.insert(id.0) {
      continue;
    }
    // marker to emit the node once all of its parents are done
    stack.push((id, true));
    // pushed in reverse so the first operand is explored first
    for edge in nodes[id.0].parents.iter().rev() {
      if edge.parent >= id {
        return Err(GraphError::Cycle {
          node: id,
          parent: edge.parent,
        });
      }
      if !visited.contains(edge.parent.0) {
        stack.push((edge.parent, false));
      }
    }
  }

  postorder.reverse();
  Ok(postorder)
}
