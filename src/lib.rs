//!
//! # gradgraph
//!
//! ## Core API
//!
//! Reverse-mode automatic differentiation over an arena of nodes. Build values
//! with [`Graph::var`], combine them with the usual operators or the named
//! methods on [`Var`], then extract derivatives with [`Var::backward`] or
//! [`Var::gradients`].
//!
//! With the `symbolic` feature (on by default) the same graph can be built over
//! [`symbolic::Expr`], yielding derivative expressions instead of numbers.
//!

pub use gradgraph_core::*;

#[cfg(feature = "symbolic")]
pub use gradgraph_symbolic as symbolic;
