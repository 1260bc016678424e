use ndarray::{Array2, Array3};
use num_complex::Complex64;
use rand::prelude::*;
use rand_distr::Normal;
use tracing_subscriber::EnvFilter;
use vmfcacg::VmfCacgMmTrainer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=vmfcacg=debug shows one line per EM iteration.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Two sources over a small STFT grid: each bin is dominated by one of
    // them. Spatial cue: a per-frequency steering vector. Embedding cue: a
    // noisy one-hot vector.
    let (frequencies, frames, channels, dims) = (8, 40, 3, 4);
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 0.05)?;

    let owner = Array2::from_shape_fn((frequencies, frames), |(f, t)| (t / 5 + f) % 2);
    let steering = |f: usize, source: usize, d: usize| {
        let delay = if source == 0 { 0.3 } else { -0.8 };
        Complex64::from_polar(1.0, delay * d as f64 * (f + 1) as f64)
    };

    let observation = Array3::from_shape_fn((frequencies, frames, channels), |(f, t, d)| {
        let gain = Complex64::new(1.0 + noise.sample(&mut rng), noise.sample(&mut rng));
        gain * steering(f, owner[[f, t]], d)
            + Complex64::new(noise.sample(&mut rng), noise.sample(&mut rng))
    });
    let embedding = Array3::from_shape_fn((frequencies, frames, dims), |(f, t, e)| {
        let hot = if owner[[f, t]] == e { 1.0 } else { 0.0 };
        hot + noise.sample(&mut rng)
    });

    let model = VmfCacgMmTrainer::new()
        .with_iterations(20)
        .with_seed(0)
        .fit(observation.view(), embedding.view(), None, Some(2), None)?;
    let labels = model.predict_labels(observation.view(), embedding.view())?;

    // Agreement up to a label swap.
    let agree = labels
        .iter()
        .zip(owner.iter())
        .filter(|(l, o)| l == o)
        .count();
    let total = labels.len();
    let accuracy = agree.max(total - agree) as f64 / total as f64;

    println!("weights={:?}", model.weight().to_vec());
    println!("concentration={:?}", model.vmf().concentration().to_vec());
    println!("accuracy={accuracy:.3}");

    Ok(())
}
