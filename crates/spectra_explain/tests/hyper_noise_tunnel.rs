//! Integration tests for the hyper noise tunnel.
//!
//! These drive the full cube-level entry point with mock and real
//! (autodiff-backed) inner attribution methods.

use std::sync::{Arc, Mutex};

use burn::prelude::*;
use burn_autodiff::Autodiff;

use spectra_core::backend::NdArray;
use spectra_core::{Baseline, ExplainableModel, HsiCube, Orientation, Seed};
use spectra_explain::{
    AttributionOptions, Explainer, ExplainError, HyperNoiseTunnel, HyperNoiseTunnelConfig,
    PointAttribution, Result, Saliency, SmoothingMethod,
};

type TestBackend = NdArray;

/// Inner method that returns its inputs unchanged.
struct IdentityAttribution;

impl PointAttribution<TestBackend> for IdentityAttribution {
    fn attribute_batch(
        &self,
        inputs: Tensor<TestBackend, 4>,
        _options: &AttributionOptions,
    ) -> Result<Tensor<TestBackend, 4>> {
        Ok(inputs)
    }
}

/// Inner method that records chunk sizes and tags each call's output with
/// the 1-based call number.
struct ChunkRecorder {
    sizes: Arc<Mutex<Vec<usize>>>,
}

impl PointAttribution<TestBackend> for ChunkRecorder {
    fn attribute_batch(
        &self,
        inputs: Tensor<TestBackend, 4>,
        _options: &AttributionOptions,
    ) -> Result<Tensor<TestBackend, 4>> {
        let mut sizes = self.sizes.lock().unwrap();
        sizes.push(inputs.dims()[0]);
        let call = sizes.len() as f32;
        Ok(Tensor::ones(inputs.dims(), &inputs.device()) * call)
    }
}

/// Inner method that records the rectify flag it was driven with.
struct RectifySpy {
    rectify: Arc<Mutex<Option<bool>>>,
}

impl PointAttribution<TestBackend> for RectifySpy {
    fn capabilities(&self) -> spectra_explain::AttributionCapabilities {
        spectra_explain::AttributionCapabilities { sign_control: true }
    }

    fn attribute_batch(
        &self,
        inputs: Tensor<TestBackend, 4>,
        options: &AttributionOptions,
    ) -> Result<Tensor<TestBackend, 4>> {
        *self.rectify.lock().unwrap() = Some(options.rectify);
        Ok(inputs)
    }
}

fn ones_cube(dims: [usize; 3]) -> HsiCube<TestBackend> {
    let device = Default::default();
    HsiCube::new(Tensor::ones(dims, &device), Orientation::BHW)
}

fn arange_cube(dims: [usize; 3]) -> HsiCube<TestBackend> {
    let device = Default::default();
    let n = dims.iter().product::<usize>();
    let data: Vec<f32> = (0..n).map(|i| i as f32).collect();
    let tensor = Tensor::<TestBackend, 1>::from_floats(data.as_slice(), &device).reshape(dims);
    HsiCube::new(tensor, Orientation::BHW)
}

fn max_abs(t: Tensor<TestBackend, 3>) -> f32 {
    t.abs().max().into_scalar().elem()
}

#[test]
fn no_perturbed_bands_reproduces_input() {
    // 3x4x4 all-ones cube, zero baseline, no band ever replaced: the
    // perturbed batch equals the input repeated, so smoothgrad of an
    // identity attribution equals the input exactly.
    let tunnel = HyperNoiseTunnel::new(IdentityAttribution).with_seed(Seed::new(1));
    let cube = ones_cube([3, 4, 4]);
    let config = HyperNoiseTunnelConfig {
        num_perturbed_bands: Some(0),
        n_samples: 5,
        ..HyperNoiseTunnelConfig::default()
    };

    let attrs = tunnel.attribute(&cube, &config).unwrap();
    assert_eq!(attrs.method(), "hyper_noise_tunnel");

    let residual = max_abs(attrs.values().clone() - cube.data().clone());
    assert!(residual < 1e-6);
}

#[test]
fn all_bands_perturbed_reproduces_baseline() {
    let tunnel = HyperNoiseTunnel::new(IdentityAttribution).with_seed(Seed::new(1));
    let cube = ones_cube([3, 4, 4]);
    let config = HyperNoiseTunnelConfig {
        num_perturbed_bands: Some(3),
        n_samples: 4,
        ..HyperNoiseTunnelConfig::default()
    };

    let attrs = tunnel.attribute(&cube, &config).unwrap();
    assert!(max_abs(attrs.values().clone()) < 1e-6);
}

#[test]
fn chunking_covers_every_sample_exactly_once() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let tunnel = HyperNoiseTunnel::new(ChunkRecorder {
        sizes: sizes.clone(),
    })
    .with_seed(Seed::new(7));

    let cube = ones_cube([2, 2, 2]);
    let config = HyperNoiseTunnelConfig {
        num_perturbed_bands: Some(0),
        n_samples: 7,
        steps_per_batch: 3,
        ..HyperNoiseTunnelConfig::default()
    };

    let batch = cube.data().clone().unsqueeze::<4>();
    let raw = tunnel.attribute_raw(batch, &config).unwrap();
    assert_eq!(raw.dims(), [7, 1, 2, 2, 2]);

    // Exactly three inner calls: two full chunks and the tail.
    assert_eq!(*sizes.lock().unwrap(), vec![3, 3, 1]);

    // Sample rows carry their producing call's tag: indices 0..3 from call
    // 1, 3..6 from call 2, 6 from call 3, each written exactly once.
    for (sample, expected) in [(0, 1.0), (2, 1.0), (3, 2.0), (5, 2.0), (6, 3.0)] {
        let row_sum: f32 = raw
            .clone()
            .slice([sample..sample + 1])
            .sum()
            .into_scalar()
            .elem();
        assert!(
            (row_sum - expected * 8.0).abs() < 1e-5,
            "sample {sample} written by the wrong call"
        );
    }
}

#[test]
fn vargrad_matches_moment_identity() {
    let cube = arange_cube([3, 4, 4]);
    let seed = Seed::new(21);

    let run = |method: SmoothingMethod| {
        let tunnel = HyperNoiseTunnel::new(IdentityAttribution).with_seed(seed);
        let config = HyperNoiseTunnelConfig {
            method,
            n_samples: 8,
            perturbation_prob: 0.5,
            ..HyperNoiseTunnelConfig::default()
        };
        tunnel.attribute(&cube, &config).unwrap()
    };

    // Same seed per run, so all three statistics see identical masks.
    let mean = run(SmoothingMethod::Smoothgrad);
    let sq = run(SmoothingMethod::SmoothgradSq);
    let var = run(SmoothingMethod::Vargrad);

    let expected = sq.values().clone() - mean.values().clone() * mean.values().clone();
    let residual = max_abs(var.values().clone() - expected);
    assert!(residual < 1e-4);
}

#[test]
fn same_seed_reproduces_attributions() {
    let cube = arange_cube([3, 4, 4]);
    let config = HyperNoiseTunnelConfig {
        n_samples: 6,
        perturbation_prob: 0.4,
        ..HyperNoiseTunnelConfig::default()
    };

    let run = |seed: u64| {
        HyperNoiseTunnel::new(IdentityAttribution)
            .with_seed(Seed::new(seed))
            .attribute(&cube, &config)
            .unwrap()
    };

    let residual = max_abs(run(13).values().clone() - run(13).values().clone());
    assert!(residual < 1e-7);
}

#[test]
fn inner_method_is_driven_unrectified() {
    let rectify = Arc::new(Mutex::new(None));
    let tunnel = HyperNoiseTunnel::new(RectifySpy {
        rectify: rectify.clone(),
    })
    .with_seed(Seed::new(2));

    let config = HyperNoiseTunnelConfig {
        num_perturbed_bands: Some(1),
        ..HyperNoiseTunnelConfig::default()
    };
    tunnel.attribute(&ones_cube([3, 4, 4]), &config).unwrap();

    assert_eq!(*rectify.lock().unwrap(), Some(false));
}

#[test]
fn non_canonical_orientation_fails_fast() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let tunnel = HyperNoiseTunnel::new(ChunkRecorder {
        sizes: sizes.clone(),
    })
    .with_seed(Seed::new(2));

    let device = Default::default();
    let cube = HsiCube::<TestBackend>::new(
        Tensor::ones([4, 4, 3], &device),
        "HWB".parse().unwrap(),
    );

    let err = tunnel
        .attribute(&cube, &HyperNoiseTunnelConfig::default())
        .unwrap_err();
    assert!(matches!(err, ExplainError::Core(_)));

    // Rejected before any perturbation was generated.
    assert!(sizes.lock().unwrap().is_empty());
}

#[test]
fn unknown_method_string_fails_before_configuration() {
    assert!(matches!(
        "gradcam".parse::<SmoothingMethod>().unwrap_err(),
        ExplainError::UnknownMethod(_)
    ));
}

#[test]
fn explicit_baseline_shape_is_validated() {
    let tunnel = HyperNoiseTunnel::new(IdentityAttribution).with_seed(Seed::new(5));
    let cube = ones_cube([3, 4, 4]);

    let device = Default::default();
    let wrong = Tensor::<TestBackend, 3>::zeros([3, 4, 5], &device);
    let config = HyperNoiseTunnelConfig {
        baseline: Baseline::Cube(wrong),
        ..HyperNoiseTunnelConfig::default()
    };

    assert!(tunnel.attribute(&cube, &config).is_err());
}

#[test]
fn saliency_through_autodiff_gradients() {
    // A linear scorer on an autodiff backend: score = sum(w * x), so the
    // input gradient is w everywhere. With no bands masked, smoothing over
    // saliency must return w exactly.
    type AD = Autodiff<NdArray>;

    let device: <AD as Backend>::Device = Default::default();
    let weight_data: Vec<f32> = (0..12).map(|i| 1.0 + i as f32).collect();
    let weight = Tensor::<AD, 1>::from_floats(weight_data.as_slice(), &device)
        .reshape([1, 3, 2, 2]);

    let forward_weight = weight.clone();
    let grad_weight = weight.clone();
    let model = Arc::new(
        ExplainableModel::<AD>::new(device.clone(), move |batch| {
            let [p, _, _, _] = batch.dims();
            (batch * forward_weight.clone()).reshape([p as i32, -1]).sum_dim(1)
        })
        .with_gradient(move |batch, _target| {
            let x = batch.require_grad();
            let [p, _, _, _] = x.dims();
            let score = (x.clone() * grad_weight.clone())
                .reshape([p as i32, -1])
                .sum_dim(1)
                .sum();
            let grads = score.backward();
            let grad = x.grad(&grads).expect("input gradient");
            Tensor::from_inner(grad)
        }),
    );

    let saliency = Saliency::new(model).unwrap();
    let tunnel = HyperNoiseTunnel::new(saliency).with_seed(Seed::new(3));

    let cube = HsiCube::<AD>::new(Tensor::ones([3, 2, 2], &device), Orientation::BHW);
    let config = HyperNoiseTunnelConfig {
        num_perturbed_bands: Some(0),
        n_samples: 3,
        steps_per_batch: 2,
        ..HyperNoiseTunnelConfig::default()
    };

    let attrs = tunnel.attribute(&cube, &config).unwrap();

    let expected = weight.reshape([3, 2, 2]);
    let residual: f32 = (attrs.values().clone() - expected)
        .abs()
        .max()
        .into_scalar()
        .elem();
    assert!(residual < 1e-5);
}
