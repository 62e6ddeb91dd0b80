use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::{One, Zero};

/// The algebra a graph computes in.
///
/// A graph never inspects values itself, it only asks the value type to
/// combine them; whatever the implementation returns for ill-defined inputs
/// (infinities, NaN, a symbolic placeholder...) is stored as-is.
///
/// `Display` doubles as the identifier used by
/// [`Graph::gradients`](crate::Graph::gradients).
pub trait Value:
  Clone
  + fmt::Debug
  + fmt::Display
  + Zero
  + One
  + Add<Output = Self>
  + Sub<Output = Self>
  + Mul<Output = Self>
  + Div<Output = Self>
  + Neg<Output = Self>
{
  /// Promote a raw number into the algebra
  fn from_f64(x: f64) -> Self;

  /// `self` raised to `exp`
  fn pow(&self, exp: &Self) -> Self;

  /// Natural exponential
  fn exp(&self) -> Self;

  /// Natural logarithm
  fn ln(&self) -> Self;

  /// Piecewise selector: `positive` where `self > 0`, `otherwise` elsewhere
  fn select_positive(&self, positive: Self, otherwise: Self) -> Self;
}

impl Value for f64 {
  #[inline]
  fn from_f64(x: f64) -> Self {
    x
  }

  #[inline]
  fn pow(&self, exp: &Self) -> Self {
    self.powf(*exp)
  }

  #[inline]
  fn exp(&self) -> Self {
    f64::exp(*self)
  }

  #[inline]
  fn ln(&self) -> Self {
    f64::ln(*self)
  }

  #[inline]
  fn select_positive(&self, positive: Self, otherwise: Self) -> Self {
    if *self > 0.0 {
      positive
    } else {
      otherwise
    }
  }
}
