use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gradgraph::symbolic::{symbols, Bindings, Expr};
use gradgraph::{Graph, GraphConfig};

// =============================================================================
// NUMERIC BENCHMARKS
// =============================================================================

fn numeric_forward_chain(c: &mut Criterion) {
  let mut group = c.benchmark_group("numeric/forward_chain");

  for chain_len in [10, 100, 1000, 10_000] {
    group.throughput(Throughput::Elements(chain_len as u64));
    group.bench_with_input(
      BenchmarkId::from_parameter(chain_len),
      &chain_len,
      |b, &len| {
        b.iter(|| {
          let graph = Graph::<f64>::with_config(GraphConfig::new().with_capacity(4 * len + 1));
          let mut x = graph.var(black_box(0.5));
          for _ in 0..len {
            x = (x * x + 1.0).log();
          }
          black_box(x.value())
        });
      },
    );
  }
  group.finish();
}

fn numeric_backward_chain(c: &mut Criterion) {
  let mut group = c.benchmark_group("numeric/backward_chain");

  for chain_len in [10, 100, 1000, 10_000] {
    group.throughput(Throughput::Elements(chain_len as u64));
    group.bench_with_input(
      BenchmarkId::from_parameter(chain_len),
      &chain_len,
      |b, &len| {
        let graph = Graph::<f64>::new();
        let x = graph.var(black_box(0.5));
        let mut y = x;
        for _ in 0..len {
          y = (y * y + 1.0).log();
        }
        b.iter(|| {
          graph.zero_grad();
          y.backward().unwrap();
          black_box(x.grad())
        });
      },
    );
  }
  group.finish();
}

// =============================================================================
// INTERNAL BENCHMARKS
// =============================================================================

fn bench_topological_order(c: &mut Criterion) {
  let mut group = c.benchmark_group("internals/topological_order");

  for graph_size in [50, 500, 5000] {
    group.bench_with_input(
      BenchmarkId::from_parameter(graph_size),
      &graph_size,
      |b, &size| {
        let graph = Graph::<f64>::new();
        let x = graph.var(1.0);
        let mut y = x;
        for _ in 0..size {
          y = y * y + 0.001;
        }
        b.iter(|| black_box(graph.topological_order(&y).unwrap().len()));
      },
    );
  }
  group.finish();
}

/// Stacked diamonds: backward stays linear, path accumulation doubles per rung
fn bench_diamond_ladder(c: &mut Criterion) {
  let mut group = c.benchmark_group("internals/diamond_ladder");

  for rungs in [4, 8, 12] {
    let graph = Graph::<f64>::new();
    let x = graph.var(1.0);
    let mut y = x;
    for _ in 0..rungs {
      y = y * 0.5 + y * 0.5;
    }

    group.bench_with_input(BenchmarkId::new("backward", rungs), &rungs, |b, _| {
      b.iter(|| {
        graph.zero_grad();
        y.backward().unwrap();
        black_box(x.grad())
      });
    });
    group.bench_with_input(BenchmarkId::new("gradients", rungs), &rungs, |b, _| {
      b.iter(|| black_box(y.gradients().unwrap().len()));
    });
  }
  group.finish();
}

// =============================================================================
// SYMBOLIC BENCHMARKS
// =============================================================================

fn symbolic_backward_eval(c: &mut Criterion) {
  let mut group = c.benchmark_group("symbolic/backward_eval");

  for width in [4, 16, 64] {
    group.throughput(Throughput::Elements(width as u64));
    group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &n| {
      let at: Bindings = (0..n).map(|i| (format!("w_{i}"), 0.1 * i as f64)).collect();
      b.iter(|| {
        let graph = Graph::<Expr>::new();
        let w = graph.leaves(symbols(n, "w"));
        let mut total = w[0];
        for &wi in &w[1..] {
          total = (total * wi).relu() + wi;
        }
        total.backward().unwrap();
        black_box(w[0].grad().eval(&at).unwrap())
      });
    });
  }
  group.finish();
}

criterion_group!(
  name = benches;
  config = Criterion::default().measurement_time(Duration::from_secs(10));
  targets =
    numeric_forward_chain,
    numeric_backward_chain,
    bench_topological_order,
    bench_diamond_ladder,
    symbolic_backward_eval,
);

criterion_main!(benches);
