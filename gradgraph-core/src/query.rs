use std::fmt;
use std::mem;

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeId, Var};
use crate::value::Value;

/// Derivatives of one root, keyed by the printed value of each ancestor.
///
/// Two ancestors that print the same share an entry and their
/// contributions are summed; prefer [`Graph::backward`] when that matters.
#[derive(Debug, Clone)]
pub struct Gradients<T> {
  entries: FxHashMap<String, T>,
}

impl<T: Value> Gradients<T> {
  #[inline]
  pub fn get(&self, key: &str) -> Option<&T> {
    self.entries.get(key)
  }

  /// Entry for the printed value of `var`
  #[inline]
  pub fn of(&self, var: &Var<'_, T>) -> Option<&T> {
    self.entries.get(&var.to_string())
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
    self.entries.iter().map(|(key, grad)| (key.as_str(), grad))
  }

  pub fn into_inner(self) -> FxHashMap<String, T> {
    self.entries
  }
}

impl<T: Value> Graph<T> {
  /// Path-accumulation query, the slow and non-mutating alternative to
  /// [`Graph::backward`].
  ///
  /// Every path from `root` to an ancestor contributes the product of the
  /// local gradients along it; contributions are summed per printed value.
  /// With `targets`, only ancestors whose printed value is listed get an
  /// entry, though every path is still walked. Printing then stops as soon as
  /// it outgrows the longest target; without targets every ancestor is
  /// printed in full.
  ///
  /// The walk is exponential in the number of stacked diamonds, so it stops
  /// with [`GraphError::PathLimitExceeded`] once it has expanded more edges
  /// than [`GraphConfig::path_limit`](crate::GraphConfig::path_limit).
  pub fn gradients(&self, root: &Var<'_, T>, targets: Option<&[&str]>) -> Result<Gradients<T>> {
    let root = self.owned(root)?;
    let limit = self.config.path_limit;
    let nodes = self.nodes.borrow();

    let mut keys: FxHashMap<NodeId, Option<String>> = FxHashMap::default();
    let mut entries: FxHashMap<String, T> = FxHashMap::default();
    let mut worklist: Vec<(NodeId, T)> = Vec::new();
    let mut expanded = 0usize;

    // each item carries the path weight up to and including its node; pushing
    // in reverse keeps the walk in operand order
    let seed = T::one();
    for edge in nodes[root.0].parents.iter().rev() {
      worklist.push((edge.parent, seed.clone() * edge.local.clone()));
    }

    while let Some((id, weight)) = worklist.pop() {
      expanded += 1;
      if expanded > limit {
        return Err(GraphError::PathLimitExceeded { limit });
      }

      let key = keys
        .entry(id)
        .or_insert_with(|| identifier(&nodes[id.0].value, targets));
      if let Some(key) = key {
        let slot = entries.entry(key.clone()).or_insert_with(T::zero);
        *slot = mem::replace(slot, T::zero()) + weight.clone();
      }

      for edge in nodes[id.0].parents.iter().rev() {
        worklist.push((edge.parent, weight.clone() * edge.local.clone()));
      }
    }

    debug!(
      "gradients from {root}: {expanded} edges expanded, {} entries",
      entries.len()
    );
    Ok(Gradients { entries })
  }
}

/// Entry key of `value`, or `None` when `targets` rules it out
fn identifier<T: fmt::Display>(value: &T, targets: Option<&[&str]>) -> Option<String> {
  let Some(targets) = targets else {
    return Some(value.to_string());
  };
  let longest = targets.iter().map(|target| target.len()).max()?;
  let key = render_bounded(value, longest)?;
  targets.contains(&key.as_str()).then_some(key)
}

/// Print `value`, giving up once the output exceeds `limit` bytes
fn render_bounded<T: fmt::Display>(value: &T, limit: usize) -> Option<String> {
  struct Bounded {
    out: String,
    limit: usize,
  }

  impl fmt::Write for Bounded {
    fn write_str(&mut self, s: &str) -> fmt::Result {
      if self.out.len() + s.len() > self.limit {
        return Err(fmt::Error);
      }
      self.out.push_str(s);
      Ok(())
    }
  }

  let mut writer = Bounded {
    out: String::new(),
    limit,
  };
  fmt::write(&mut writer, format_args!("{value}")).ok()?;
  Some(writer.out)
}

impl<T: Value> Var<'_, T> {
  /// Path-accumulated derivatives wrt every ancestor, see [`Graph::gradients`]
  #[inline]
  pub fn gradients(&self) -> Result<Gradients<T>> {
    self.graph().gradients(self, None)
  }

  /// Path-accumulated derivatives wrt the ancestors printed as `targets`
  #[inline]
  pub fn gradients_for(&self, targets: &[&str]) -> Result<Gradients<T>> {
    self.graph().gradients(self, Some(targets))
  }
}
