/// Tunables for a [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphConfig {
  /// Number of nodes to preallocate in the arena
  pub capacity: usize,
  /// Maximum number of edges the path-accumulation query may expand before
  /// giving up; the number of paths grows exponentially with stacked diamonds
  pub path_limit: usize,
}

impl GraphConfig {
  pub const DEFAULT_CAPACITY: usize = 512;
  pub const DEFAULT_PATH_LIMIT: usize = 1 << 22;

  pub fn new() -> Self {
    Self {
      capacity: Self::DEFAULT_CAPACITY,
      path_limit: Self::DEFAULT_PATH_LIMIT,
    }
  }

  pub fn with_capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  pub fn with_path_limit(mut self, path_limit: usize) -> Self {
    self.path_limit = path_limit;
    self
  }
}

impl Default for GraphConfig {
  fn default() -> Self {
    Self::new()
  }
}
