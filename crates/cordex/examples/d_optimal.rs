//! D-optimal design search for 8 runs and 3 scalar factors, first with the
//! parallel coordinate exchange, then refined with the surrogate loop.
//!
//! Run with `RUST_LOG=debug` to watch epochs improve the shared best.

use anyhow::Result;
use optex_cordex::{Cordex, DesignObjective, InfillStrategy, Optimality, Refiner};

fn main() -> Result<()> {
    env_logger::init();

    let cordex = Cordex::new(8, &[], 3)
        .optimality(Optimality::D)
        .epochs(30)
        .workers(4)
        .seed(42);
    let result = cordex.clone().run()?;
    println!("coordinate exchange: D = {:.4}", result.value);
    println!("{:8.4}", result.design);

    let objective = DesignObjective::new(8, 0, 3, Optimality::D, None, None)?;
    let refined = Refiner::new(objective)
        .strategy(InfillStrategy::EI)
        .rounds(15)
        .bootstrap(cordex.epochs(5))
        .seed(42)
        .run()?;
    println!("surrogate refinement: D = {:.4}", refined.value);
    println!("{:8.4}", refined.design);
    Ok(())
}
