//! Gaussian noise tunnel.

use burn::prelude::*;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};

use spectra_core::{HsiCube, Seed};

use crate::attributes::HsiAttributes;
use crate::error::{ExplainError, Result};
use crate::explainer::{AttributionOptions, Explainer, PointAttribution};
use crate::smoothing::{drive_chunks, SmoothingMethod};

/// Smooths an inner attribution method by averaging it over Gaussian
/// perturbations of the input.
///
/// Sibling of [`HyperNoiseTunnel`](crate::HyperNoiseTunnel): additive
/// N(0, stdev²) noise instead of band masking, same chunked driver and
/// smoothing statistics.
pub struct NoiseTunnel<M> {
    inner: M,
    seed: Seed,
}

/// Per-call configuration for [`NoiseTunnel`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoiseTunnelConfig {
    /// Target class index.
    pub target: Option<usize>,
    /// Number of noisy samples to draw.
    pub n_samples: usize,
    /// Upper bound on the batch size of one inner attribution call.
    pub steps_per_batch: usize,
    /// Standard deviation of the additive noise.
    pub stdev: f32,
    /// Statistic used to collapse the per-sample attributions.
    pub method: SmoothingMethod,
}

impl Default for NoiseTunnelConfig {
    fn default() -> Self {
        Self {
            target: None,
            n_samples: 5,
            steps_per_batch: 1,
            stdev: 1.0,
            method: SmoothingMethod::default(),
        }
    }
}

impl<M> NoiseTunnel<M> {
    /// Wrap an inner point-attribution method.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            seed: Seed::from_entropy(),
        }
    }

    /// Set the seed for the noise draws.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }
}

impl<B: Backend, M: PointAttribution<B>> Explainer<B> for NoiseTunnel<M> {
    type Config = NoiseTunnelConfig;

    fn attribute(&self, cube: &HsiCube<B>, config: &Self::Config) -> Result<HsiAttributes<B>> {
        cube.ensure_band_first()?;

        if config.n_samples < 1 {
            return Err(ExplainError::invalid_argument(
                "n_samples",
                "must be at least 1",
            ));
        }
        if config.steps_per_batch < 1 {
            return Err(ExplainError::invalid_argument(
                "steps_per_batch",
                "must be at least 1",
            ));
        }
        if !config.stdev.is_finite() || config.stdev < 0.0 {
            return Err(ExplainError::invalid_argument(
                "stdev",
                format!("must be finite and non-negative, got {}", config.stdev),
            ));
        }

        let x = cube.data().clone();
        let [c, h, w] = x.dims();
        let device = x.device();
        let n_samples = config.n_samples;

        // Noise comes from the explicit seed, not backend-global state.
        let normal = Normal::new(0.0f32, config.stdev)
            .map_err(|e| ExplainError::invalid_argument("stdev", e.to_string()))?;
        let mut rng = self.seed.to_rng();
        let noise_data: Vec<f32> = (0..n_samples * c * h * w)
            .map(|_| normal.sample(&mut rng))
            .collect();
        let noise =
            Tensor::<B, 1>::from_floats(noise_data.as_slice(), &device).reshape([n_samples, c, h, w]);

        let perturbed = (x.unsqueeze::<4>().repeat_dim(0, n_samples) + noise).require_grad();

        let options = AttributionOptions {
            target: config.target,
            rectify: false,
        };
        let buffer = drive_chunks(&self.inner, perturbed, config.steps_per_batch, &options)?;

        let raw: Tensor<B, 5> = buffer.unsqueeze_dim(1);
        let attr = config.method.aggregate(raw).squeeze(0);

        HsiAttributes::new(cube.clone(), attr, self.name())
    }

    fn name(&self) -> &'static str {
        "noise_tunnel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_core::backend::NdArray;
    use spectra_core::Orientation;

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

    fn ones_cube(dims: [usize; 3]) -> HsiCube<TestBackend> {
        let device = Default::default();
        HsiCube::new(Tensor::ones(dims, &device), Orientation::BHW)
    }

    #[test]
    fn test_zero_stdev_reduces_to_inner_method() {
        let tunnel = NoiseTunnel::new(IdentityAttribution).with_seed(Seed::new(3));
        let config = NoiseTunnelConfig {
            stdev: 0.0,
            n_samples: 4,
            steps_per_batch: 2,
            ..NoiseTunnelConfig::default()
        };

        let attrs = tunnel.attribute(&ones_cube([2, 3, 3]), &config).unwrap();
        let residual: f32 = (attrs.values().clone() - 1.0)
            .abs()
            .max()
            .into_scalar()
            .elem();
        assert!(residual < 1e-6);
    }

    #[test]
    fn test_same_seed_same_result() {
        let config = NoiseTunnelConfig::default();
        let cube = ones_cube([2, 3, 3]);

        let a = NoiseTunnel::new(IdentityAttribution)
            .with_seed(Seed::new(11))
            .attribute(&cube, &config)
            .unwrap();
        let b = NoiseTunnel::new(IdentityAttribution)
            .with_seed(Seed::new(11))
            .attribute(&cube, &config)
            .unwrap();

        let residual: f32 = (a.values().clone() - b.values().clone())
            .abs()
            .max()
            .into_scalar()
            .elem();
        assert!(residual < 1e-7);
    }

    #[test]
    fn test_parameter_validation() {
        let tunnel = NoiseTunnel::new(IdentityAttribution).with_seed(Seed::new(0));
        let cube = ones_cube([2, 3, 3]);

        for config in [
            NoiseTunnelConfig {
                n_samples: 0,
                ..NoiseTunnelConfig::default()
            },
            NoiseTunnelConfig {
                steps_per_batch: 0,
                ..NoiseTunnelConfig::default()
            },
            NoiseTunnelConfig {
                stdev: -1.0,
                ..NoiseTunnelConfig::default()
            },
            NoiseTunnelConfig {
                stdev: f32::NAN,
                ..NoiseTunnelConfig::default()
            },
        ] {
            assert!(matches!(
                tunnel.attribute(&cube, &config).unwrap_err(),
                ExplainError::InvalidArgument { .. }
            ));
        }
    }
}
