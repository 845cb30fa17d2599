use approx::assert_abs_diff_eq;
use env_logger::{Builder, Env};
use exauq::{
    Emulator, ExauqError, GpEmulator, GpHyperparameters, Input, SimulatorDomain, TrainingDatum,
    oneshot_lhs,
};
use exauq_gp::GpParams;
use exauq_gp::NuggetTuning;
use exauq_gp::correlation_models::{Matern52Corr, SquaredExponentialCorr};
use exauq_gp::mean_models::{ConstantMean, LinearMean};

fn init_log() {
    let env = Env::new().filter_or("EXAUQ_LOG", "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();
}

fn simulator(x: &Input) -> f64 {
    x[0] + x[1].powi(2) + x[0] * x[1].sin()
}

fn make_training_data(domain: &SimulatorDomain, n: usize, seed: u64) -> Vec<TrainingDatum> {
    oneshot_lhs(domain, n, Some(seed))
        .expect("design")
        .into_iter()
        .map(|x| {
            let y = simulator(&x);
            TrainingDatum::new(x, y).expect("finite output")
        })
        .collect()
}

#[test]
fn test_tutorial_workflow() {
    init_log();
    let domain = SimulatorDomain::new(vec![(-1., 1.), (1., 100.)]).expect("domain");
    assert_eq!(domain.dim(), 2);

    let design = oneshot_lhs(&domain, 20, Some(1)).expect("design");
    assert_eq!(design, oneshot_lhs(&domain, 20, Some(1)).expect("design"));
    assert!(design.iter().all(|x| domain.contains(x)));

    let data = make_training_data(&domain, 20, 1);
    let mut gp = GpEmulator::new(
        GpParams::new(ConstantMean(), SquaredExponentialCorr())
            .nugget_tuning(NuggetTuning::Adaptive)
            .seed(Some(1)),
    );
    gp.fit(&data).expect("fit");
    assert_eq!(gp.training_data().len(), 20);

    // training inputs are reproduced
    let datum = &data[3];
    let prediction = gp.predict(datum.input()).expect("prediction");
    assert_abs_diff_eq!(
        prediction.estimate(),
        datum.output(),
        epsilon = 1e-2 * datum.output().abs().max(1.)
    );

    // prediction at a new input
    let x = Input::new(vec![0.5, 50.]).expect("input");
    let prediction = gp.predict(&x).expect("prediction");
    assert!(prediction.variance() > 0.);
    // within a few percent of the output range
    let (ymin, ymax) = data
        .iter()
        .map(|d| d.output())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, up), y| {
            (lo.min(y), up.max(y))
        });
    assert_abs_diff_eq!(
        prediction.estimate(),
        simulator(&x),
        epsilon = 5e-2 * (ymax - ymin)
    );
    assert!(prediction.standard_deviation() < ymax - ymin);
    let nes = prediction.nes_error(simulator(&x));
    assert!(nes.is_finite() && nes > 0.);
    println!("{x}: {prediction}, nes error = {nes}");
}

#[test]
fn test_workflow_with_other_models() {
    init_log();
    let domain = SimulatorDomain::new(vec![(-1., 1.), (1., 10.)]).expect("domain");
    let data = make_training_data(&domain, 15, 3);
    let mut gp = GpEmulator::new(
        GpParams::new(LinearMean(), Matern52Corr())
            .nugget_tuning(NuggetTuning::Adaptive)
            .seed(Some(3)),
    );
    gp.fit(&data).expect("fit");
    let x = Input::new(vec![0., 5.]).expect("input");
    let prediction = gp.predict(&x).expect("prediction");
    assert_abs_diff_eq!(prediction.estimate(), simulator(&x), epsilon = 5.);
}

#[test]
fn test_refit_with_fitted_hyperparameters() {
    init_log();
    let domain = SimulatorDomain::new(vec![(-1., 1.), (1., 10.)]).expect("domain");
    let data = make_training_data(&domain, 12, 5);
    let mut gp = GpEmulator::<ConstantMean, Matern52Corr>::default();
    gp.fit(&data).expect("fit");
    let hp = gp.fit_hyperparameters().expect("fitted").clone();

    let mut other = GpEmulator::<ConstantMean, Matern52Corr>::default();
    other.fit_with_hyperparameters(&data, &hp).expect("fit");
    assert_eq!(other.fit_hyperparameters(), Some(&hp));

    let x = Input::new(vec![0.2, 3.]).expect("input");
    assert_eq!(
        gp.predict(&x).expect("prediction"),
        other.predict(&x).expect("prediction")
    );
}

#[test]
fn test_unfitted_emulator_and_bad_inputs() {
    let gp = GpEmulator::<ConstantMean, Matern52Corr>::default();
    assert!(matches!(
        gp.predict(&Input::new(vec![0.]).expect("input")),
        Err(ExauqError::NotTrained)
    ));
    assert!(GpHyperparameters::new(vec![-1.], 1., None).is_err());
    assert!(SimulatorDomain::new(vec![(1., -1.)]).is_err());
}
