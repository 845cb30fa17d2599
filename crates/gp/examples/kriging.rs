use exauq_gp::{Kriging, NuggetTuning};
use linfa::prelude::*;
use ndarray::{Array, Axis, arr1, arr2};

fn main() {
    env_logger::init();

    let xtrain = arr2(&[[0.0], [1.0], [2.0], [3.0], [4.0]]);
    let ytrain = arr1(&[0.0, 1.0, 1.5, 0.9, 1.0]);

    let kriging = Kriging::params()
        .nugget_tuning(NuggetTuning::Adaptive)
        .seed(Some(42))
        .fit(&Dataset::new(xtrain, ytrain))
        .expect("Kriging fitting");
    println!("{kriging}");
    println!("length scales = {}", kriging.length_scales());

    let xtest = Array::linspace(0., 4., 9).insert_axis(Axis(1));
    let (ytest, yvar) = kriging
        .predict_valvar(&xtest)
        .expect("Kriging prediction");
    for ((x, y), v) in xtest.iter().zip(ytest.iter()).zip(yvar.iter()) {
        println!("f({x:.2}) ~ {y:.4} +/- {:.4}", f64::sqrt(*v));
    }
}
