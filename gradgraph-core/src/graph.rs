use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::ptr;

use smallvec::SmallVec;

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::value::Value;

/// Stable handle of a node inside its graph's arena.
///
/// Handles are handed out in creation order, so a parent always has a smaller
/// handle than any of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
  #[inline(always)]
  pub fn index(&self) -> usize {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// One parent of a node, along with d(node)/d(parent)
#[derive(Debug, Clone)]
pub(crate) struct Edge<T> {
  pub(crate) parent: NodeId,
  pub(crate) local: T,
}

#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
  pub(crate) value: T,
  /// Parent handles are unique within this list
  pub(crate) parents: SmallVec<[Edge<T>; 2]>,
  pub(crate) grad: T,
}

/// An append-only arena of nodes.
///
/// Nodes are never removed, they live as long as the graph does. Values are
/// frozen once pushed, only the accumulated gradients change afterwards.
pub struct Graph<T> {
  pub(crate) nodes: RefCell<Vec<Node<T>>>,
  pub(crate) config: GraphConfig,
}

impl<T: Value> Graph<T> {
  pub fn new() -> Self {
    Self::with_config(GraphConfig::default())
  }

  pub fn with_config(config: GraphConfig) -> Self {
    Self {
      nodes: RefCell::new(Vec::with_capacity(config.capacity)),
      config,
    }
  }

  #[inline]
  pub fn config(&self) -> &GraphConfig {
    &self.config
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.borrow().len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.nodes.borrow().is_empty()
  }

  /// Create a leaf holding `value`
  #[inline]
  pub fn var(&self, value: T) -> Var<'_, T> {
    Var::new(self.push(value, []), self)
  }

  /// Promote an operand to a node of this graph.
  ///
  /// Raw values become fresh leaves; a `Var` that already lives here is
  /// returned untouched, no new node is created for it.
  pub fn wrap<'g>(&'g self, operand: impl Into<Operand<'g, T>>) -> Result<Var<'g, T>> {
    let id = self.promote(operand.into())?;
    Ok(Var::new(id, self))
  }

  /// Wrap every raw value of `values` into its own leaf, preserving order
  pub fn leaves<I>(&self, values: I) -> Vec<Var<'_, T>>
  where
    I: IntoIterator<Item = T>,
  {
    values.into_iter().map(|value| self.var(value)).collect()
  }

  /// Reset the accumulated gradient of every node to zero
  pub fn zero_grad(&self) {
    for node in self.nodes.borrow_mut().iter_mut() {
      node.grad = T::zero();
    }
  }

  /// Resolve the handle of a var, rejecting vars of other graphs
  #[inline]
  pub(crate) fn owned(&self, var: &Var<'_, T>) -> Result<NodeId> {
    if ptr::eq(var.graph, self) {
      Ok(var.id)
    } else {
      Err(GraphError::ForeignNode { node: var.id })
    }
  }

  pub(crate) fn promote(&self, operand: Operand<'_, T>) -> Result<NodeId> {
    match operand {
      Operand::Node(var) => self.owned(&var),
      Operand::Raw(value) => Ok(self.push(value, [])),
    }
  }

  /// Promote both operands of a binary operator, checking ownership of both
  /// before any leaf is pushed
  pub(crate) fn promote_pair(
    &self,
    a: Operand<'_, T>,
    b: Operand<'_, T>,
  ) -> Result<(NodeId, NodeId)> {
    for operand in [&a, &b] {
      if let Operand::Node(var) = operand {
        self.owned(var)?;
      }
    }
    Ok((self.promote(a)?, self.promote(b)?))
  }

  /// Append a node; repeated parents have their local gradients summed into
  /// a single edge
  pub(crate) fn push<I>(&self, value: T, edges: I) -> NodeId
  where
    I: IntoIterator<Item = (NodeId, T)>,
  {
    let mut parents: SmallVec<[Edge<T>; 2]> = SmallVec::new();
    for (parent, local) in edges {
      match parents.iter_mut().find(|edge| edge.parent == parent) {
        Some(edge) => {
          let merged = mem::replace(&mut edge.local, T::zero()) + local;
          edge.local = merged;
        }
        None => parents.push(Edge { parent, local }),
      }
    }

    let mut nodes = self.nodes.borrow_mut();
    let id = NodeId(nodes.len());
    nodes.push(Node {
      value,
      parents,
      grad: T::zero(),
    });
    id
  }

  /// Build a node from one parent; `f` maps the parent value to
  /// (value, local gradient)
  #[inline]
  pub(crate) fn unary<F>(&self, a: NodeId, f: F) -> NodeId
  where
    F: FnOnce(&T) -> (T, T),
  {
    let (value, local) = f(&self.nodes.borrow()[a.0].value);
    self.push(value, [(a, local)])
  }

  /// Build a node from two parents; `f` maps the parent values to
  /// (value, local gradient wrt a, local gradient wrt b)
  #[inline]
  pub(crate) fn binary<F>(&self, a: NodeId, b: NodeId, f: F) -> NodeId
  where
    F: FnOnce(&T, &T) -> (T, T, T),
  {
    let (value, local_a, local_b) = {
      let nodes = self.nodes.borrow();
      f(&nodes[a.0].value, &nodes[b.0].value)
    };
    self.push(value, [(a, local_a), (b, local_b)])
  }
}

impl<T: Value> Default for Graph<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> fmt::Debug for Graph<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Graph")
      .field("nodes", &self.nodes.borrow().len())
      .field("config", &self.config)
      .finish()
  }
}

/// A handle to a node, tied to the graph that owns it.
///
/// Vars are `Copy`; cloning one never clones the node behind it.
pub struct Var<'g, T> {
  id: NodeId,
  graph: &'g Graph<T>,
}

impl<T> Clone for Var<'_, T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Var<'_, T> {}

impl<'g, T: Value> Var<'g, T> {
  #[inline(always)]
  pub(crate) fn new(id: NodeId, graph: &'g Graph<T>) -> Self {
    Self { id, graph }
  }

  #[inline(always)]
  pub fn id(&self) -> NodeId {
    self.id
  }

  #[inline(always)]
  pub fn graph(&self) -> &'g Graph<T> {
    self.graph
  }

  /// The value computed at construction time
  #[inline]
  pub fn value(&self) -> T {
    self.graph.nodes.borrow()[self.id.0].value.clone()
  }

  /// The gradient accumulated by [`Graph::backward`] so far
  #[inline]
  pub fn grad(&self) -> T {
    self.graph.nodes.borrow()[self.id.0].grad.clone()
  }

  #[inline]
  pub fn zero_grad(&self) {
    self.graph.nodes.borrow_mut()[self.id.0].grad = T::zero();
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.graph.nodes.borrow()[self.id.0].parents.is_empty()
  }

  /// Parent handles, in operand order
  pub fn parents(&self) -> SmallVec<[NodeId; 2]> {
    self.graph.nodes.borrow()[self.id.0]
      .parents
      .iter()
      .map(|edge| edge.parent)
      .collect()
  }

  /// d(self)/d(parent), or `None` if `parent` is not a direct parent
  pub fn local_gradient(&self, parent: &Var<'_, T>) -> Option<T> {
    if !ptr::eq(self.graph, parent.graph) {
      return None;
    }
    self.graph.nodes.borrow()[self.id.0]
      .parents
      .iter()
      .find(|edge| edge.parent == parent.id)
      .map(|edge| edge.local.clone())
  }
}

impl<T: Value> fmt::Display for Var<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.value(), f)
  }
}

impl<T: Value> fmt::Debug for Var<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Var")
      .field("id", &self.id)
      .field("value", &self.value())
      .finish()
  }
}

/// An operator argument: either a node of the graph or a raw value still to
/// be promoted into a leaf.
pub enum Operand<'g, T> {
  Node(Var<'g, T>),
  Raw(T),
}

impl<'g, T> From<Var<'g, T>> for Operand<'g, T> {
  #[inline(always)]
  fn from(var: Var<'g, T>) -> Self {
    Operand::Node(var)
  }
}

impl<'g, T> From<&Var<'g, T>> for Operand<'g, T> {
  #[inline(always)]
  fn from(var: &Var<'g, T>) -> Self {
    Operand::Node(*var)
  }
}

impl<'g, T: Value> From<f64> for Operand<'g, T> {
  #[inline(always)]
  fn from(value: f64) -> Self {
    Operand::Raw(T::from_f64(value))
  }
}
