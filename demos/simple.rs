use gradgraph::Graph;

fn main() -> gradgraph::Result<()> {
  // Every node created from a graph lives in its arena
  let graph = Graph::<f64>::new();
  let x = graph.var(1.0);
  let y = x * x;
  // Seeds y with one and pushes it back to every ancestor
  y.backward()?;
  println!("Value: {}, dy/dx: {}", y.value(), x.grad());
  Ok(())
}
