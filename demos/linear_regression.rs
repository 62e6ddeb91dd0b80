use std::fs::File;
use std::io::{self, BufWriter, Write};

use gradgraph::Graph;

fn linear_regression() -> Result<(), Box<dyn std::error::Error>> {
  let x1_data = [1.0, 2.0, 3.0, 4.0, 5.0];
  let x2_data = [2.0, 1.0, 0.0, -1.0, 2.0];
  let mut y_data = Vec::with_capacity(x1_data.len());
  // y = 5.4*x1 - 2.3*x2 - 1.4 for each sample
  for i in 0..x1_data.len() {
    let y = 5.4 * x1_data[i] - 2.3 * x2_data[i] - 1.4;
    y_data.push(y);
  }

  let learning_rate = 0.02;
  let epochs = 10000;

  let file = File::create("training_loss.csv")?;
  let mut buf = BufWriter::new(file);
  writeln!(buf, "epoch,loss")?;

  let (mut w1, mut w2, mut b) = (0.0, 0.0, 0.0);

  for epoch in 0..epochs {
    // A fresh arena per step, the previous one is dropped wholesale
    let graph = Graph::<f64>::new();
    let params = graph.leaves([w1, w2, b]);
    let n = x1_data.len() as f64;
    let mut mse = graph.var(0.0);
    for i in 0..x1_data.len() {
      // y_pred = w1*x1 + w2*x2 + b
      let y_pred = params[0] * x1_data[i] + params[1] * x2_data[i] + params[2];
      let err = y_pred - y_data[i];
      mse = mse + err * err;
    }
    mse = mse / n;
    mse.backward()?;

    w1 -= learning_rate * params[0].grad();
    w2 -= learning_rate * params[1].grad();
    b -= learning_rate * params[2].grad();

    #[cfg(debug_assertions)]
    if epoch % 1000 == 0 {
      println!(
        "epoch {} | MSE = {:.4} | w1 = {:.4} | w2 = {:.4} | b = {:.4}",
        epoch,
        mse.value(),
        w1,
        w2,
        b
      );
    }
    writeln!(buf, "{},{}", epoch, mse.value())?;
  }

  let mut out = io::stdout().lock();
  writeln!(out, "trained parameters:")?;
  writeln!(out, "w1 = {w1:.4}")?;
  writeln!(out, "w2 = {w2:.4}")?;
  writeln!(out, "b  = {b:.4}")?;

  buf.flush()?;
  Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  env_logger::init();
  linear_regression()
}
