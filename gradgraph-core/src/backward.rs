use std::mem;

use log::{debug, trace};

use crate::error::Result;
use crate::graph::{Graph, Var};
use crate::schedule::reverse_postorder;
use crate::value::Value;

impl<T: Value> Graph<T> {
  /// Reverse-mode pass from `root`.
  ///
  /// Seeds `root`'s gradient with one (overwriting whatever it held), then
  /// walks the topological order and adds `local * grad(node)` into every
  /// parent. Afterwards each ancestor holds d(root)/d(ancestor) summed over
  /// all paths, on top of whatever it had accumulated before; call
  /// [`Graph::zero_grad`] first for a fresh result.
  pub fn backward(&self, root: &Var<'_, T>) -> Result<()> {
    let root = self.owned(root)?;
    let mut nodes = self.nodes.borrow_mut();
    let order = reverse_postorder(&nodes, root)?;
    debug!("backward from {root}: {} nodes scheduled", order.len());

    nodes[root.0].grad = T::one();

    for id in order {
      // parents always sit below their children in the arena
      let (ancestors, rest) = nodes.split_at_mut(id.0);
      let node = &rest[0];
      if node.parents.is_empty() {
        continue;
      }
      trace!("{id}: pushing gradient into {} parents", node.parents.len());
      for edge in &node.parents {
        let slot = &mut ancestors[edge.parent.0].grad;
        let upstream = edge.local.clone() * node.grad.clone();
        *slot = mem::replace(slot, T::zero()) + upstream;
      }
    }

    Ok(())
  }
}

impl<T: Value> Var<'_, T> {
  /// See [`Graph::backward`]
  #[inline]
  pub fn backward(&self) -> Result<()> {
    self.graph().backward(self)
  }
}
