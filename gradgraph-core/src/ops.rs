//!
//! Operator layer: every operation pushes one node and records the local
//! derivative of its value with respect to each parent.
//!
//! | operation  | value       | local gradients                  |
//! |------------|-------------|----------------------------------|
//! | `add(a,b)` | `a + b`     | `1`, `1`                         |
//! | `mul(a,b)` | `a * b`     | `b`, `a`                         |
//! | `neg(a)`   | `-a`        | `-1`                             |
//! | `pow(a,b)` | `a^b`       | `b * a^(b-1)`, `ln(a) * a^b`     |
//! | `exp(a)`   | `e^a`       | `e^a`                            |
//! | `log(a)`   | `ln(a)`     | `a^(-1)`                         |
//! | `relu(a)`  | `a` if `a > 0` else `0` | `1` if `a > 0` else `0` |
//!
//! `sub`, `div` and `sqrt` are compositions of the above.
//!

use std::ops;

use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeId, Operand, Var};
use crate::value::Value;

impl<T: Value> Graph<T> {
  #[inline]
  fn add_nodes(&self, a: NodeId, b: NodeId) -> NodeId {
    self.binary(a, b, |a, b| (a.clone() + b.clone(), T::one(), T::one()))
  }

  #[inline]
  fn mul_nodes(&self, a: NodeId, b: NodeId) -> NodeId {
    self.binary(a, b, |a, b| (a.clone() * b.clone(), b.clone(), a.clone()))
  }

  #[inline]
  fn neg_node(&self, a: NodeId) -> NodeId {
    self.unary(a, |a| (-a.clone(), -T::one()))
  }

  #[inline]
  fn pow_nodes(&self, a: NodeId, b: NodeId) -> NodeId {
    self.binary(a, b, |a, b| {
      let value = a.pow(b);
      let local_a = b.clone() * a.pow(&(b.clone() - T::one()));
      let local_b = a.ln() * value.clone();
      (value, local_a, local_b)
    })
  }

  #[inline]
  fn exp_node(&self, a: NodeId) -> NodeId {
    self.unary(a, |a| {
      let value = a.exp();
      (value.clone(), value)
    })
  }

  #[inline]
  fn log_node(&self, a: NodeId) -> NodeId {
    self.unary(a, |a| (a.ln(), a.pow(&T::from_f64(-1.0))))
  }

  #[inline]
  fn relu_node(&self, a: NodeId) -> NodeId {
    self.unary(a, |a| {
      (
        a.select_positive(a.clone(), T::zero()),
        a.select_positive(T::one(), T::zero()),
      )
    })
  }

  #[inline]
  fn sub_nodes(&self, a: NodeId, b: NodeId) -> NodeId {
    let neg_b = self.neg_node(b);
    self.add_nodes(a, neg_b)
  }

  #[inline]
  fn div_nodes(&self, a: NodeId, b: NodeId) -> NodeId {
    let minus_one = self.push(T::from_f64(-1.0), []);
    let recip_b = self.pow_nodes(b, minus_one);
    self.mul_nodes(a, recip_b)
  }

  #[inline]
  fn sqrt_node(&self, a: NodeId) -> NodeId {
    let half = self.push(T::from_f64(0.5), []);
    self.pow_nodes(a, half)
  }

  #[inline]
  fn binary_op<'g, F>(
    &'g self,
    a: impl Into<Operand<'g, T>>,
    b: impl Into<Operand<'g, T>>,
    f: F,
  ) -> Result<Var<'g, T>>
  where
    F: FnOnce(&Self, NodeId, NodeId) -> NodeId,
  {
    let (a, b) = self.promote_pair(a.into(), b.into())?;
    Ok(Var::new(f(self, a, b), self))
  }

  #[inline]
  fn unary_op<'g, F>(&'g self, a: impl Into<Operand<'g, T>>, f: F) -> Result<Var<'g, T>>
  where
    F: FnOnce(&Self, NodeId) -> NodeId,
  {
    let a = self.promote(a.into())?;
    Ok(Var::new(f(self, a), self))
  }

  pub fn add<'g>(
    &'g self,
    a: impl Into<Operand<'g, T>>,
    b: impl Into<Operand<'g, T>>,
  ) -> Result<Var<'g, T>> {
    self.binary_op(a, b, Self::add_nodes)
  }

  /// `a - b`, built as `a + (-b)`
  pub fn sub<'g>(
    &'g self,
    a: impl Into<Operand<'g, T>>,
    b: impl Into<Operand<'g, T>>,
  ) -> Result<Var<'g, T>> {
    self.binary_op(a, b, Self::sub_nodes)
  }

  pub fn mul<'g>(
    &'g self,
    a: impl Into<Operand<'g, T>>,
    b: impl Into<Operand<'g, T>>,
  ) -> Result<Var<'g, T>> {
    self.binary_op(a, b, Self::mul_nodes)
  }

  /// `a / b`, built as `a * b^(-1)`
  pub fn div<'g>(
    &'g self,
    a: impl Into<Operand<'g, T>>,
    b: impl Into<Operand<'g, T>>,
  ) -> Result<Var<'g, T>> {
    self.binary_op(a, b, Self::div_nodes)
  }

  /// `a` raised to `b`; the local gradient wrt `b` holds `ln(a)`, so it is
  /// whatever the value type makes of `ln` for non-positive bases
  pub fn pow<'g>(
    &'g self,
    a: impl Into<Operand<'g, T>>,
    b: impl Into<Operand<'g, T>>,
  ) -> Result<Var<'g, T>> {
    self.binary_op(a, b, Self::pow_nodes)
  }

  pub fn neg<'g>(&'g self, a: impl Into<Operand<'g, T>>) -> Result<Var<'g, T>> {
    self.unary_op(a, Self::neg_node)
  }

  pub fn exp<'g>(&'g self, a: impl Into<Operand<'g, T>>) -> Result<Var<'g, T>> {
    self.unary_op(a, Self::exp_node)
  }

  /// Natural logarithm
  pub fn log<'g>(&'g self, a: impl Into<Operand<'g, T>>) -> Result<Var<'g, T>> {
    self.unary_op(a, Self::log_node)
  }

  /// `a^0.5`
  pub fn sqrt<'g>(&'g self, a: impl Into<Operand<'g, T>>) -> Result<Var<'g, T>> {
    self.unary_op(a, Self::sqrt_node)
  }

  pub fn relu<'g>(&'g self, a: impl Into<Operand<'g, T>>) -> Result<Var<'g, T>> {
    self.unary_op(a, Self::relu_node)
  }

  /// Apply [`Graph::relu`] to every operand, preserving order
  pub fn relu_all<'g, I>(&'g self, operands: I) -> Result<Vec<Var<'g, T>>>
  where
    I: IntoIterator,
    I::Item: Into<Operand<'g, T>>,
  {
    operands
      .into_iter()
      .map(|operand| self.relu(operand))
      .collect()
  }
}

/// Named operations on a var; these mirror the [`Graph`] methods with `self`
/// as the left operand.
impl<'g, T: Value> Var<'g, T> {
  #[inline]
  pub fn add(self, rhs: impl Into<Operand<'g, T>>) -> Result<Self> {
    self.graph().add(self, rhs)
  }

  #[inline]
  pub fn sub(self, rhs: impl Into<Operand<'g, T>>) -> Result<Self> {
    self.graph().sub(self, rhs)
  }

  #[inline]
  pub fn mul(self, rhs: impl Into<Operand<'g, T>>) -> Result<Self> {
    self.graph().mul(self, rhs)
  }

  #[inline]
  pub fn div(self, rhs: impl Into<Operand<'g, T>>) -> Result<Self> {
    self.graph().div(self, rhs)
  }

  #[inline]
  pub fn pow(self, exp: impl Into<Operand<'g, T>>) -> Result<Self> {
    self.graph().pow(self, exp)
  }

  #[inline]
  pub fn neg(self) -> Self {
    Var::new(self.graph().neg_node(self.id()), self.graph())
  }

  #[inline]
  pub fn exp(self) -> Self {
    Var::new(self.graph().exp_node(self.id()), self.graph())
  }

  #[inline]
  pub fn log(self) -> Self {
    Var::new(self.graph().log_node(self.id()), self.graph())
  }

  #[inline]
  pub fn sqrt(self) -> Self {
    Var::new(self.graph().sqrt_node(self.id()), self.graph())
  }

  #[inline]
  pub fn relu(self) -> Self {
    Var::new(self.graph().relu_node(self.id()), self.graph())
  }
}

#[inline]
#[track_caller]
fn expect_same_graph<V>(result: Result<V>) -> V {
  match result {
    Ok(var) => var,
    Err(err @ GraphError::ForeignNode { .. }) => panic!("{err}"),
    Err(err) => unreachable!("operators only fail on foreign operands: {err}"),
  }
}

// Operator sugar over the named methods. Mixing vars of two graphs is a
// programming error here and panics; use the named methods to get a `Result`.
macro_rules! binary_sugar {
  ($trait:ident, $method:ident) => {
    impl<'g, T: Value> ops::$trait<Var<'g, T>> for Var<'g, T> {
      type Output = Var<'g, T>;

      #[inline(always)]
      fn $method(self, rhs: Var<'g, T>) -> Self::Output {
        expect_same_graph(self.graph().$method(self, rhs))
      }
    }

    impl<'g, T: Value> ops::$trait<&Var<'g, T>> for Var<'g, T> {
      type Output = Var<'g, T>;

      #[inline(always)]
      fn $method(self, rhs: &Var<'g, T>) -> Self::Output {
        expect_same_graph(self.graph().$method(self, rhs))
      }
    }

    impl<'g, T: Value> ops::$trait<Var<'g, T>> for &Var<'g, T> {
      type Output = Var<'g, T>;

      #[inline(always)]
      fn $method(self, rhs: Var<'g, T>) -> Self::Output {
        expect_same_graph(self.graph().$method(self, rhs))
      }
    }

    impl<'g, T: Value> ops::$trait<&Var<'g, T>> for &Var<'g, T> {
      type Output = Var<'g, T>;

      #[inline(always)]
      fn $method(self, rhs: &Var<'g, T>) -> Self::Output {
        expect_same_graph(self.graph().$method(self, rhs))
      }
    }

    impl<'g, T: Value> ops::$trait<f64> for Var<'g, T> {
      type Output = Var<'g, T>;

      #[inline(always)]
      fn $method(self, rhs: f64) -> Self::Output {
        expect_same_graph(self.graph().$method(self, rhs))
      }
    }

    impl<'g, T: Value> ops::$trait<f64> for &Var<'g, T> {
      type Output = Var<'g, T>;

      #[inline(always)]
      fn $method(self, rhs: f64) -> Self::Output {
        expect_same_graph(self.graph().$method(self, rhs))
      }
    }

    // reflected forms: the raw left operand is promoted first, then the
    // operation runs with both operands in place
    impl<'g, T: Value> ops::$trait<Var<'g, T>> for f64 {
      type Output = Var<'g, T>;

      #[inline(always)]
      fn $method(self, rhs: Var<'g, T>) -> Self::Output {
        expect_same_graph(rhs.graph().$method(self, rhs))
      }
    }

    impl<'g, T: Value> ops::$trait<&Var<'g, T>> for f64 {
      type Output = Var<'g, T>;

      #[inline(always)]
      fn $method(self, rhs: &Var<'g, T>) -> Self::Output {
        expect_same_graph(rhs.graph().$method(self, rhs))
      }
    }
  };
}

binary_sugar!(Add, add);
binary_sugar!(Sub, sub);
binary_sugar!(Mul, mul);
binary_sugar!(Div, div);

impl<'g, T: Value> ops::Neg for Var<'g, T> {
  type Output = Var<'g, T>;

  #[inline(always)]
  fn neg(self) -> Self::Output {
    Var::neg(self)
  }
}

impl<'g, T: Value> ops::Neg for &Var<'g, T> {
  type Output = Var<'g, T>;

  #[inline(always)]
  fn neg(self) -> Self::Output {
    Var::neg(*self)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  mod var {
    use super::*;

    #[test]
    fn add() {
      let graph = Graph::<f64>::new();
      let a = graph.var(3.0);
      let b = graph.var(4.0);
      let c = a.add(b).unwrap();
      assert_eq!(c.value(), 7.0);
      assert_eq!(c.local_gradient(&a), Some(1.0));
      assert_eq!(c.local_gradient(&b), Some(1.0));
    }

    #[test]
    fn add_f64() {
      let graph = Graph::<f64>::new();
      let a = graph.var(3.0);
      let c = a.add(5.0).unwrap();
      assert_eq!(c.value(), 8.0);
      assert_eq!(c.parents().len(), 2);
      assert_eq!(c.local_gradient(&a), Some(1.0));
    }

    #[test]
    fn sub() {
      let graph = Graph::<f64>::new();
      let a = graph.var(7.0);
      let b = graph.var(4.0);
      let c = a.sub(b).unwrap();
      assert_eq!(c.value(), 3.0);
      // a - b is a + (-b): a is a direct parent, b sits behind a negation
      assert_eq!(c.local_gradient(&a), Some(1.0));
      assert_eq!(c.local_gradient(&b), None);
    }

    #[test]
    fn mul() {
      let graph = Graph::<f64>::new();
      let a = graph.var(3.0);
      let b = graph.var(4.0);
      let c = a.mul(b).unwrap();
      assert_eq!(c.value(), 12.0);
      // dc/da = b, dc/db = a
      assert_eq!(c.local_gradient(&a), Some(4.0));
      assert_eq!(c.local_gradient(&b), Some(3.0));
    }

    #[test]
    fn neg() {
      let graph = Graph::<f64>::new();
      let a = graph.var(3.0);
      let c = a.neg();
      assert_eq!(c.value(), -3.0);
      assert_eq!(c.local_gradient(&a), Some(-1.0));
    }

    #[test]
    fn pow() {
      let graph = Graph::<f64>::new();
      let a = graph.var(2.0);
      let b = graph.var(3.0);
      let c = a.pow(b).unwrap();
      assert_eq!(c.value(), 8.0);
      // dc/da = b * a^(b-1)
      assert_eq!(c.local_gradient(&a), Some(3.0 * f64::powf(2.0, 2.0)));
      // dc/db = ln(a) * a^b
      assert_eq!(c.local_gradient(&b), Some(f64::ln(2.0) * 8.0));
    }

    #[test]
    fn div() {
      let graph = Graph::<f64>::new();
      let a = graph.var(6.0);
      let b = graph.var(3.0);
      let c = a.div(b).unwrap();
      assert_eq!(c.value(), 2.0);
      assert_relative_eq!(c.local_gradient(&a).unwrap(), 1.0 / 3.0);
    }

    #[test]
    fn exp() {
      let graph = Graph::<f64>::new();
      let a = graph.var(1.3);
      let c = a.exp();
      assert_eq!(c.value(), f64::exp(1.3));
      assert_eq!(c.local_gradient(&a), Some(f64::exp(1.3)));
    }

    #[test]
    fn log() {
      let graph = Graph::<f64>::new();
      let a = graph.var(5.6);
      let c = a.log();
      assert_eq!(c.value(), f64::ln(5.6));
      assert_relative_eq!(c.local_gradient(&a).unwrap(), 1.0 / 5.6);
    }

    #[test]
    fn sqrt() {
      let graph = Graph::<f64>::new();
      let a = graph.var(4.0);
      let c = a.sqrt();
      assert_eq!(c.value(), 2.0);
      assert_relative_eq!(c.local_gradient(&a).unwrap(), 0.25);
    }

    #[test]
    fn relu() {
      let graph = Graph::<f64>::new();
      let pos = graph.var(2.5);
      let neg = graph.var(-1.0);
      let zero = graph.var(0.0);
      let r_pos = pos.relu();
      let r_neg = neg.relu();
      let r_zero = zero.relu();
      assert_eq!(r_pos.value(), 2.5);
      assert_eq!(r_pos.local_gradient(&pos), Some(1.0));
      assert_eq!(r_neg.value(), 0.0);
      assert_eq!(r_neg.local_gradient(&neg), Some(0.0));
      assert_eq!(r_zero.value(), 0.0);
      assert_eq!(r_zero.local_gradient(&zero), Some(0.0));
    }
  }

  mod graph {
    use super::*;

    #[test]
    fn raw_operands_on_both_sides() {
      let graph = Graph::<f64>::new();
      let c = graph.sub(10.0, 4.0).unwrap();
      assert_eq!(c.value(), 6.0);
      assert_eq!(graph.len(), 4);
    }

    #[test]
    fn reflected_operand_order() {
      let graph = Graph::<f64>::new();
      let x = graph.var(4.0);
      assert_eq!(graph.sub(10.0, x).unwrap().value(), 6.0);
      assert_eq!(graph.div(2.0, x).unwrap().value(), 0.5);
      let p = graph.pow(2.0, x).unwrap();
      assert_eq!(p.value(), 16.0);
      // x is the exponent: dp/dx = ln(2) * 2^x
      assert_relative_eq!(p.local_gradient(&x).unwrap(), f64::ln(2.0) * 16.0);
    }

    #[test]
    fn foreign_operand_pushes_nothing() {
      let graph = Graph::<f64>::new();
      let other = Graph::<f64>::new();
      let x = other.var(1.0);
      let err = graph.add(3.0, x).unwrap_err();
      assert_eq!(err, GraphError::ForeignNode { node: x.id() });
      assert!(graph.is_empty());
      assert!(graph.exp(x).is_err());
    }

    #[test]
    fn relu_all_is_elementwise() {
      let graph = Graph::<f64>::new();
      let out = graph.relu_all([-2.0, 0.5, 3.0]).unwrap();
      let values: Vec<f64> = out.iter().map(|v| v.value()).collect();
      assert_eq!(values, vec![0.0, 0.5, 3.0]);
    }
  }

  mod collisions {
    use super::*;

    #[test]
    fn add_self() {
      let graph = Graph::<f64>::new();
      let a = graph.var(3.0);
      let c = a.add(a).unwrap();
      assert_eq!(c.parents().len(), 1);
      assert_eq!(c.local_gradient(&a), Some(2.0));
    }

    #[test]
    fn mul_self() {
      let graph = Graph::<f64>::new();
      let a = graph.var(3.0);
      let c = a.mul(a).unwrap();
      assert_eq!(c.value(), 9.0);
      assert_eq!(c.parents().len(), 1);
      assert_eq!(c.local_gradient(&a), Some(6.0));
    }

    #[test]
    fn pow_self() {
      let graph = Graph::<f64>::new();
      let a = graph.var(2.0);
      let c = a.pow(a).unwrap();
      assert_eq!(c.value(), 4.0);
      // d(a^a)/da = a^a * (ln(a) + 1)
      assert_relative_eq!(
        c.local_gradient(&a).unwrap(),
        4.0 * (f64::ln(2.0) + 1.0)
      );
    }
  }

  mod sugar {
    use super::*;

    #[test]
    fn operators_match_named_methods() {
      let graph = Graph::<f64>::new();
      let a = graph.var(6.0);
      let b = graph.var(3.0);
      assert_eq!((a + b).value(), 9.0);
      assert_eq!((&a - &b).value(), 3.0);
      assert_eq!((a * &b).value(), 18.0);
      assert_eq!((&a / b).value(), 2.0);
      assert_eq!((-a).value(), -6.0);
      assert_eq!((-&b).value(), -3.0);
    }

    #[test]
    fn raw_on_either_side() {
      let graph = Graph::<f64>::new();
      let x = graph.var(4.0);
      assert_eq!((x + 1.0).value(), 5.0);
      assert_eq!((1.0 + x).value(), 5.0);
      assert_eq!((x - 1.0).value(), 3.0);
      assert_eq!((1.0 - x).value(), -3.0);
      assert_eq!((&x * 2.0).value(), 8.0);
      assert_eq!((2.0 * &x).value(), 8.0);
      assert_eq!((x / 2.0).value(), 2.0);
      assert_eq!((2.0 / x).value(), 0.5);
    }

    #[test]
    #[should_panic(expected = "belongs to a different graph")]
    fn mixing_graphs_panics() {
      let graph = Graph::<f64>::new();
      let other = Graph::<f64>::new();
      let _ = graph.var(1.0) + other.var(2.0);
    }
  }
}
