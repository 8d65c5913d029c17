//! Drives the interior-point method one record at a time on a small
//! two-variable problem and prints the iteration log.
//!
//! ```text
//! cargo run --manifest-path demos/Cargo.toml -- 0.5 2.0
//! RUST_LOG=debug cargo run --manifest-path demos/Cargo.toml
//! ```

use log::warn;
use nlip::{InteriorPointMethod, IterationStatus, Matrix, NLPBuilder, SolverOptions};
use problemo::Problem;
use problemo::common::IntoCommonProblem;

fn main() -> Result<(), Problem> {
    env_logger::init();

    let args: Vec<f64> = std::env::args()
        .skip(1)
        .map(|a| a.parse::<f64>())
        .collect::<Result<_, _>>()?;
    let x0 = match args.as_slice() {
        [] => vec![2.5, 2.5],
        [a, b] => vec![*a, *b],
        _ => return Err("Expected two coordinates for the initial guess".gloss()),
    };

    // min  -1000 exp(-(x₀x₁ - 1.5)² - (x₁ - 1.5)²)
    // s.t. x₀ - x₁² = 0
    //      -x₀⁴ + x₁ + 1 >= 0
    let nlp = NLPBuilder::new()
        .objective_ad(|x| (-(x[0] * x[1] - 1.5).powi(2) - (x[1] - 1.5).powi(2)).exp() * -1000.)
        .equality_ad(|x| vec![x[0] - x[1].powi(2)])
        .inequality_ad(|x| vec![-x[0].powi(4) + x[1] + 1.])
        .initial_guess(Matrix::from_column(x0))
        .build()?;

    let solver = InteriorPointMethod::new(&nlp, SolverOptions::default())?;

    println!(
        "{:>5} {:>9} {:>14} {:>14} {:>12} {:>12}",
        "iter", "status", "x0", "x1", "primal inf", "dual inf"
    );
    for record in solver {
        let record = record?;
        println!(
            "{:>5} {:>9} {:>14.8} {:>14.8} {:>12.3e} {:>12.3e}",
            record.iteration,
            record.status.to_string(),
            record.x[(0, 0)],
            record.x[(1, 0)],
            record.primal_infeasibility,
            record.dual_infeasibility
        );
        if record.status == IterationStatus::Failed {
            warn!("Iteration limit reached before convergence");
        }
    }

    Ok(())
}
