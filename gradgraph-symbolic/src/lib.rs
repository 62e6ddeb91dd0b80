//!
//! # gradgraph-symbolic
//!
//! Symbolic values for `gradgraph-core`: a graph over [`Expr`] records exact
//! derivative expressions that can later be evaluated at any point with
//! [`Expr::eval`].
//!
//! ```
//! use gradgraph_core::Graph;
//! use gradgraph_symbolic::{Bindings, Expr};
//!
//! let graph = Graph::<Expr>::new();
//! let x = graph.var(Expr::symbol("x"));
//! let y = x * x;
//! y.backward().unwrap();
//! let at = Bindings::new().bind("x", 3.0);
//! assert_eq!(x.grad().eval(&at).unwrap(), 6.0);
//! ```
//!

use std::fmt;
use std::mem;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

use num_traits::{One, Zero};
use rustc_hash::FxHashMap;
use thiserror::Error;

use gradgraph_core::{Operand, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
  #[error("symbol `{name}` has no binding")]
  Unbound { name: String },
}

/// Numbers to substitute for symbols during evaluation
#[derive(Debug, Clone, Default)]
pub struct Bindings {
  values: FxHashMap<String, f64>,
}

impl Bindings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn bind(mut self, name: impl Into<String>, value: f64) -> Self {
    self.insert(name, value);
    self
  }

  pub fn insert(&mut self, name: impl Into<String>, value: f64) {
    self.values.insert(name.into(), value);
  }

  #[inline]
  pub fn get(&self, name: &str) -> Option<f64> {
    self.values.get(name).copied()
  }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Bindings {
  fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
    let mut bindings = Bindings::new();
    for (name, value) in iter {
      bindings.insert(name, value);
    }
    bindings
  }
}

#[derive(Debug)]
enum Term {
  Num(f64),
  Sym(Rc<str>),
  Add(Expr, Expr),
  Mul(Expr, Expr),
  Pow(Expr, Expr),
  Neg(Expr),
  Exp(Expr),
  Ln(Expr),
  /// `then` where `cond > 0`, `otherwise` elsewhere
  Positive {
    cond: Expr,
    then: Expr,
    otherwise: Expr,
  },
}

/// An immutable, shared expression tree.
///
/// Cloning is cheap. Constructors fold numeric constants and the trivial
/// identities (`0 + x`, `1 * x`, `0 * x`, `x^1`, `--x`); nothing else is
/// simplified.
#[derive(Clone)]
pub struct Expr(Rc<Term>);

impl Expr {
  #[inline]
  pub fn num(value: f64) -> Self {
    Self::from_term(Term::Num(value))
  }

  #[inline]
  pub fn symbol(name: &str) -> Self {
    Self::from_term(Term::Sym(Rc::from(name)))
  }

  #[inline]
  fn from_term(term: Term) -> Self {
    Self(Rc::new(term))
  }

  /// The number this expression folded to, if it is constant
  #[inline]
  pub fn as_num(&self) -> Option<f64> {
    match *self.0 {
      Term::Num(value) => Some(value),
      _ => None,
    }
  }

  /// The name of this expression if it is a bare symbol
  pub fn name(&self) -> Option<&str> {
    match &*self.0 {
      Term::Sym(name) => Some(&**name),
      _ => None,
    }
  }

  fn sum(a: Self, b: Self) -> Self {
    match (a.as_num(), b.as_num()) {
      (Some(x), Some(y)) => Self::num(x + y),
      (Some(x), _) if x == 0.0 => b,
      (_, Some(y)) if y == 0.0 => a,
      _ => Self::from_term(Term::Add(a, b)),
    }
  }

  fn product(a: Self, b: Self) -> Self {
    match (a.as_num(), b.as_num()) {
      (Some(x), Some(y)) => Self::num(x * y),
      (Some(x), _) if x == 0.0 => Self::num(0.0),
      (_, Some(y)) if y == 0.0 => Self::num(0.0),
      (Some(x), _) if x == 1.0 => b,
      (_, Some(y)) if y == 1.0 => a,
      _ => Self::from_term(Term::Mul(a, b)),
    }
  }

  fn power(base: Self, exp: Self) -> Self {
    match (base.as_num(), exp.as_num()) {
      (Some(x), Some(y)) => Self::num(x.powf(y)),
      (_, Some(y)) if y == 1.0 => base,
      _ => Self::from_term(Term::Pow(base, exp)),
    }
  }

  fn negate(a: Self) -> Self {
    if let Some(x) = a.as_num() {
      return Self::num(-x);
    }
    if let Term::Neg(inner) = &*a.0 {
      return inner.clone();
    }
    Self::from_term(Term::Neg(a))
  }

  /// Substitute `bindings` for the symbols and evaluate.
  ///
  /// Shared subexpressions are evaluated once, and only the branch a
  /// piecewise selector picks is evaluated.
  pub fn eval(&self, bindings: &Bindings) -> Result<f64, EvalError> {
    let mut memo: FxHashMap<*const Term, f64> = FxHashMap::default();
    // a node goes back on the stack under its missing operands and is
    // evaluated once they are all in the memo
    let mut stack = vec![self];

    while let Some(expr) = stack.pop() {
      let key = Rc::as_ptr(&expr.0);
      if memo.contains_key(&key) {
        continue;
      }
      let known = |e: &Expr| memo.get(&Rc::as_ptr(&e.0)).copied();

      let value = match &*expr.0 {
        Term::Num(x) => *x,
        Term::Sym(name) => bindings.get(name).ok_or_else(|| EvalError::Unbound {
          name: name.to_string(),
        })?,
        Term::Add(a, b) => match (known(a), known(b)) {
          (Some(x), Some(y)) => x + y,
          _ => {
            stack.extend([expr, b, a]);
            continue;
          }
        },
        Term::Mul(a, b) => match (known(a), known(b)) {
          (Some(x), Some(y)) => x * y,
          _ => {
            stack.extend([expr, b, a]);
            continue;
          }
        },
        Term::Pow(a, b) => match (known(a), known(b)) {
          (Some(x), Some(y)) => x.powf(y),
          _ => {
            stack.extend([expr, b, a]);
            continue;
          }
        },
        Term::Neg(a) | Term::Exp(a) | Term::Ln(a) => match known(a) {
          Some(x) => match &*expr.0 {
            Term::Neg(_) => -x,
            Term::Exp(_) => x.exp(),
            _ => x.ln(),
          },
          None => {
            stack.extend([expr, a]);
            continue;
          }
        },
        Term::Positive {
          cond,
          then,
          otherwise,
        } => {
          let Some(c) = known(cond) else {
            stack.extend([expr, cond]);
            continue;
          };
          let branch = if c > 0.0 { then } else { otherwise };
          match known(branch) {
            Some(x) => x,
            None => {
              stack.extend([expr, branch]);
              continue;
            }
          }
        }
      };

      memo.insert(key, value);
    }

    Ok(memo[&Rc::as_ptr(&self.0)])
  }

  /// Whether printing this needs no surrounding parentheses
  fn is_atomic(&self) -> bool {
    match &*self.0 {
      Term::Num(x) => *x >= 0.0,
      Term::Pow(..) | Term::Neg(_) => false,
      _ => true,
    }
  }
}

impl Term {
  /// Move the operands out into `out`, leaving a leaf behind
  fn detach_into(&mut self, out: &mut Vec<Expr>) {
    match mem::replace(self, Term::Num(0.0)) {
      Term::Add(a, b) | Term::Mul(a, b) | Term::Pow(a, b) => out.extend([a, b]),
      Term::Neg(a) | Term::Exp(a) | Term::Ln(a) => out.push(a),
      Term::Positive {
        cond,
        then,
        otherwise,
      } => out.extend([cond, then, otherwise]),
      Term::Num(_) | Term::Sym(_) => {}
    }
  }
}

// Long chains would otherwise be freed one nested drop per link
impl Drop for Expr {
  fn drop(&mut self) {
    let Some(term) = Rc::get_mut(&mut self.0) else {
      return;
    };
    let mut orphans = Vec::new();
    term.detach_into(&mut orphans);
    while let Some(mut expr) = orphans.pop() {
      if let Some(term) = Rc::get_mut(&mut expr.0) {
        term.detach_into(&mut orphans);
      }
    }
  }
}

impl PartialEq for Expr {
  fn eq(&self, other: &Self) -> bool {
    let mut pending = vec![(self, other)];
    while let Some((a, b)) = pending.pop() {
      if Rc::ptr_eq(&a.0, &b.0) {
        continue;
      }
      match (&*a.0, &*b.0) {
        (Term::Num(x), Term::Num(y)) if x == y => {}
        (Term::Sym(x), Term::Sym(y)) if x == y => {}
        (Term::Add(a0, a1), Term::Add(b0, b1))
        | (Term::Mul(a0, a1), Term::Mul(b0, b1))
        | (Term::Pow(a0, a1), Term::Pow(b0, b1)) => pending.extend([(a0, b0), (a1, b1)]),
        (Term::Neg(a0), Term::Neg(b0))
        | (Term::Exp(a0), Term::Exp(b0))
        | (Term::Ln(a0), Term::Ln(b0)) => pending.push((a0, b0)),
        (
          Term::Positive {
            cond: a0,
            then: a1,
            otherwise: a2,
          },
          Term::Positive {
            cond: b0,
            then: b1,
            otherwise: b2,
          },
        ) => pending.extend([(a0, b0), (a1, b1), (a2, b2)]),
        _ => return false,
      }
    }
    true
  }
}

/// Generate `n` symbols named `prefix_0` through `prefix_{n-1}`
pub fn symbols(n: usize, prefix: &str) -> Vec<Expr> {
  (0..n)
    .map(|i| Expr::symbol(&format!("{prefix}_{i}")))
    .collect()
}

/// Pending output of the printer, popped from the back
enum Piece<'a> {
  Expr(&'a Expr),
  /// Parenthesised unless atomic
  Grouped(&'a Expr),
  Num(f64),
  Text(&'static str),
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use Piece::{Grouped, Num, Text};

    let mut stack = vec![Piece::Expr(self)];
    while let Some(piece) = stack.pop() {
      let expr = match piece {
        Text(text) => {
          f.write_str(text)?;
          continue;
        }
        Num(x) => {
          write!(f, "{x}")?;
          continue;
        }
        Grouped(e) if !e.is_atomic() => {
          stack.extend([Text(")"), Piece::Expr(e), Text("(")]);
          continue;
        }
        Grouped(e) | Piece::Expr(e) => e,
      };

      match &*expr.0 {
        Term::Num(x) => write!(f, "{x}")?,
        Term::Sym(name) => f.write_str(name)?,
        Term::Add(a, b) => match &*b.0 {
          Term::Neg(b) => stack.extend([Text(")"), Grouped(b), Text(" - "), Piece::Expr(a), Text("(")]),
          Term::Num(y) if *y < 0.0 => {
            stack.extend([Text(")"), Num(-y), Text(" - "), Piece::Expr(a), Text("(")])
          }
          _ => stack.extend([Text(")"), Piece::Expr(b), Text(" + "), Piece::Expr(a), Text("(")]),
        },
        Term::Mul(a, b) => stack.extend([Text(")"), Grouped(b), Text("*"), Grouped(a), Text("(")]),
        Term::Pow(a, b) => stack.extend([Grouped(b), Text("^"), Grouped(a)]),
        Term::Neg(a) => stack.extend([Grouped(a), Text("-")]),
        Term::Exp(a) => stack.extend([Text(")"), Piece::Expr(a), Text("exp(")]),
        Term::Ln(a) => stack.extend([Text(")"), Piece::Expr(a), Text("log(")]),
        Term::Positive {
          cond,
          then,
          otherwise,
        } => stack.extend([
          Text(")"),
          Piece::Expr(otherwise),
          Text(" > 0 else "),
          Piece::Expr(cond),
          Text(" if "),
          Piece::Expr(then),
          Text("piecewise("),
        ]),
      }
    }
    Ok(())
  }
}

impl fmt::Debug for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Expr({self})")
  }
}

impl From<f64> for Expr {
  #[inline]
  fn from(value: f64) -> Self {
    Expr::num(value)
  }
}

impl Add for Expr {
  type Output = Expr;

  #[inline]
  fn add(self, other: Self) -> Self::Output {
    Expr::sum(self, other)
  }
}

impl Sub for Expr {
  type Output = Expr;

  #[inline]
  fn sub(self, other: Self) -> Self::Output {
    Expr::sum(self, Expr::negate(other))
  }
}

impl Mul for Expr {
  type Output = Expr;

  #[inline]
  fn mul(self, other: Self) -> Self::Output {
    Expr::product(self, other)
  }
}

impl Div for Expr {
  type Output = Expr;

  #[inline]
  fn div(self, other: Self) -> Self::Output {
    Expr::product(self, Expr::power(other, Expr::num(-1.0)))
  }
}

impl Neg for Expr {
  type Output = Expr;

  #[inline]
  fn neg(self) -> Self::Output {
    Expr::negate(self)
  }
}

impl Zero for Expr {
  #[inline]
  fn zero() -> Self {
    Expr::num(0.0)
  }

  #[inline]
  fn is_zero(&self) -> bool {
    self.as_num() == Some(0.0)
  }
}

impl One for Expr {
  #[inline]
  fn one() -> Self {
    Expr::num(1.0)
  }
}

impl Value for Expr {
  #[inline]
  fn from_f64(x: f64) -> Self {
    Expr::num(x)
  }

  #[inline]
  fn pow(&self, exp: &Self) -> Self {
    Expr::power(self.clone(), exp.clone())
  }

  fn exp(&self) -> Self {
    match self.as_num() {
      Some(x) => Expr::num(x.exp()),
      None => Expr::from_term(Term::Exp(self.clone())),
    }
  }

  fn ln(&self) -> Self {
    match self.as_num() {
      Some(x) => Expr::num(x.ln()),
      None => Expr::from_term(Term::Ln(self.clone())),
    }
  }

  fn select_positive(&self, positive: Self, otherwise: Self) -> Self {
    match self.as_num() {
      Some(x) if x > 0.0 => positive,
      Some(_) => otherwise,
      None => Expr::from_term(Term::Positive {
        cond: self.clone(),
        then: positive,
        otherwise,
      }),
    }
  }
}

impl<'g> From<Expr> for Operand<'g, Expr> {
  #[inline(always)]
  fn from(expr: Expr) -> Self {
    Operand::Raw(expr)
  }
}
