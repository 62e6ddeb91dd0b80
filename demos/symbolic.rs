use gradgraph::symbolic::{Bindings, Expr};
use gradgraph::Graph;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  env_logger::init();

  let graph = Graph::<Expr>::new();
  let a = graph.var(Expr::symbol("a"));
  let b = graph.var(Expr::symbol("b"));
  let c = graph.var(Expr::symbol("c"));

  let i = a - b + c;
  let j = i.pow(b)?;
  let k = j.exp().sqrt();
  let l = 3.0 + k / i;
  let m = l.log();
  let d = m * a.pow(-b)?;

  d.backward()?;

  let at = Bindings::new().bind("a", 1.0).bind("b", 2.0).bind("c", 3.0);
  println!("d = {}", d.value());
  for leaf in [a, b, c] {
    println!("d{leaf} = {}", leaf.grad().eval(&at)?);
  }
  Ok(())
}
