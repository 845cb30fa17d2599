use criterion::{Criterion, criterion_group, criterion_main};
use exauq::{Emulator, GpEmulator, Input, SimulatorDomain, TrainingDatum, oneshot_lhs};
use exauq_gp::GpParams;
use exauq_gp::NuggetTuning;
use exauq_gp::correlation_models::SquaredExponentialCorr;
use exauq_gp::mean_models::ConstantMean;

fn simulator(x: &Input) -> f64 {
    x.iter().map(|v| v.sin() + 0.1 * v * v).sum()
}

fn criterion_emulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("emulator");
    group.sample_size(10);
    for dim in [2, 4] {
        let domain = SimulatorDomain::new(vec![(-3., 3.); dim]).expect("domain");
        let data: Vec<TrainingDatum> = oneshot_lhs(&domain, 10 * dim, Some(42))
            .expect("design")
            .into_iter()
            .map(|x| {
                let y = simulator(&x);
                TrainingDatum::new(x, y).expect("datum")
            })
            .collect();

        group.bench_function(format!("fit {dim}d"), |b| {
            b.iter(|| {
                let mut gp = GpEmulator::new(
                    GpParams::new(ConstantMean(), SquaredExponentialCorr())
                        .nugget_tuning(NuggetTuning::Adaptive)
                        .seed(Some(42)),
                );
                gp.fit(std::hint::black_box(&data)).expect("fit");
                gp
            })
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_emulator);
criterion_main!(benches);
