//! A-optimal design for one functional factor expanded on a 3-term Fourier
//! basis, with a light ridge penalty on the information matrix.

use anyhow::Result;
use optex_cordex::{Cordex, Optimality, Penalization};
use optex_doe::{build_transform, BasisFamily};

fn main() -> Result<()> {
    env_logger::init();

    let j_cb = build_transform(BasisFamily::Fourier, &[3]);
    let result = Cordex::new(6, &[3], 0)
        .optimality(Optimality::A)
        .transform(j_cb)
        .penalization(Penalization {
            ridge_weight: 1e-6,
            ..Default::default()
        })
        .epochs(20)
        .seed(7)
        .run()?;
    println!("A value: {:.6}", result.value);
    println!("{:8.4}", result.design);
    Ok(())
}
