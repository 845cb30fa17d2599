use clap::{Parser, ValueEnum};
use env_logger::{Builder, Env};
use exauq::{Emulator, GpEmulator, Input, SimulatorDomain, TrainingDatum, oneshot_lhs};
use exauq_gp::correlation_models::{
    AbsoluteExponentialCorr, CorrelationModel, Matern32Corr, Matern52Corr, SquaredExponentialCorr,
};
use exauq_gp::mean_models::ConstantMean;

/// Correlation kernel of the GP emulator
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kernel {
    SquaredExponential,
    AbsoluteExponential,
    Matern32,
    Matern52,
}

#[derive(Parser)]
#[command(author, version, about = "Emulate a toy simulator with a GP", long_about = None)]
struct Args {
    /// Dimension of the simulator inputs
    #[arg(short, long, default_value_t = 2)]
    dim: usize,
    /// Number of simulator runs of the experimental design
    #[arg(short, long, default_value_t = 20)]
    batch_size: usize,
    /// Seed of the experimental design
    #[arg(short, long)]
    seed: Option<u64>,
    #[arg(short, long, value_enum, default_value_t = Kernel::SquaredExponential)]
    kernel: Kernel,
}

/// A cheap stand-in for an expensive simulator
fn simulator(x: &Input) -> f64 {
    x.iter()
        .enumerate()
        .map(|(i, v)| if i % 2 == 0 { *v } else { v * v + (i as f64) * v.sin() })
        .sum()
}

fn run<Corr: CorrelationModel<f64>>(args: &Args) -> anyhow::Result<()> {
    let bounds = (0..args.dim)
        .map(|i| if i % 2 == 0 { (-1., 1.) } else { (0., 10.) })
        .collect();
    let domain = SimulatorDomain::new(bounds)?;

    let design = oneshot_lhs(&domain, args.batch_size, args.seed)?;
    let data = design
        .into_iter()
        .map(|x| {
            let y = simulator(&x);
            TrainingDatum::new(x, y)
        })
        .collect::<exauq::Result<Vec<_>>>()?;
    for datum in &data {
        println!("{datum}");
    }

    let mut emulator = GpEmulator::<ConstantMean, Corr>::default();
    emulator.fit(&data)?;
    if let Some(hp) = emulator.fit_hyperparameters() {
        println!("Fitted hyperparameters: {hp:?}");
    }

    let test_design = oneshot_lhs(&domain, 5, args.seed.map(|s| s + 1))?;
    for x in test_design {
        let prediction = emulator.predict(&x)?;
        let y = simulator(&x);
        println!(
            "{x}: {prediction}, sd = {:.4}, true = {y:.4}, nes error = {:.4}",
            prediction.standard_deviation(),
            prediction.nes_error(y)
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let env = Env::new().filter_or("EXAUQ_LOG", "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let args = Args::parse();
    match args.kernel {
        Kernel::SquaredExponential => run::<SquaredExponentialCorr>(&args),
        Kernel::AbsoluteExponential => run::<AbsoluteExponentialCorr>(&args),
        Kernel::Matern32 => run::<Matern32Corr>(&args),
        Kernel::Matern52 => run::<Matern52Corr>(&args),
    }
}
