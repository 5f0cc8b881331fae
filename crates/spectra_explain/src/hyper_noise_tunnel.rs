//! Hyper Noise Tunnel: band-masking smoothing of an inner attribution
//! method.
//!
//! Instead of additive noise, perturbed samples are built by replacing
//! whole spectral band planes with baseline values. Which bands are
//! replaced is drawn either as a fixed-size uniform selection per sample
//! or as independent Bernoulli draws per (sample, band) pair. The
//! perturbations are pushed through the wrapped point-attribution in
//! bounded chunks and collapsed with one of the [`SmoothingMethod`]
//! statistics.

use burn::prelude::*;
use burn::tensor::{Bool, TensorData};
use rand::Rng;

use spectra_core::{Baseline, HsiCube, Seed};

use crate::attributes::HsiAttributes;
use crate::error::{ExplainError, Result};
use crate::explainer::{AttributionOptions, Explainer, PointAttribution};
use crate::smoothing::{drive_chunks, SmoothingMethod};

/// Draw `n_samples` independent band selections of exactly `k` out of `n`
/// bands, uniformly without replacement.
///
/// Returns an `(n_samples, n)` boolean matrix with exactly `k` true entries
/// per row. `k == n` short-circuits to an all-true matrix without consuming
/// any randomness.
///
/// # Errors
///
/// Fails if `k > n`.
pub fn random_band_choice<B: Backend, R: Rng>(
    n: usize,
    k: usize,
    n_samples: usize,
    rng: &mut R,
    device: &B::Device,
) -> Result<Tensor<B, 2, Bool>> {
    if k > n {
        return Err(ExplainError::invalid_argument(
            "num_perturbed_bands",
            format!("cannot select {k} bands out of {n}"),
        ));
    }
    if k == n {
        let rows = vec![true; n_samples * n];
        return Ok(Tensor::from_data(TensorData::new(rows, [n_samples, n]), device));
    }

    let mut rows = vec![false; n_samples * n];
    for sample in 0..n_samples {
        for index in rand::seq::index::sample(rng, n, k) {
            rows[sample * n + index] = true;
        }
    }
    Ok(Tensor::from_data(TensorData::new(rows, [n_samples, n]), device))
}

/// Build the perturbed batch for one image.
///
/// Replaces randomly selected band planes of `input` with the matching
/// planes of `baseline`, producing `n_samples` perturbed copies. With
/// `num_perturbed_bands` set, every sample has exactly that many bands
/// replaced; otherwise each band is replaced independently with
/// probability `perturbation_prob`.
///
/// Neither `input` nor `baseline` is mutated; the returned
/// `(n_samples, B, H, W)` batch requests gradient tracking for the
/// downstream attribution call.
///
/// # Errors
///
/// Fails fast on a baseline/input shape mismatch, `n_samples < 1`,
/// `perturbation_prob` outside `[0, 1]`, or `num_perturbed_bands` outside
/// `[0, n_bands]`.
pub fn perturb_input<B: Backend, R: Rng>(
    input: &Tensor<B, 3>,
    baseline: &Tensor<B, 3>,
    n_samples: usize,
    perturbation_prob: f32,
    num_perturbed_bands: Option<usize>,
    rng: &mut R,
) -> Result<Tensor<B, 4>> {
    let dims = input.dims();
    if baseline.dims() != dims {
        return Err(ExplainError::invalid_argument(
            "baseline",
            format!(
                "baseline shape {:?} does not match input shape {:?}",
                baseline.dims(),
                dims
            ),
        ));
    }
    if n_samples < 1 {
        return Err(ExplainError::invalid_argument(
            "n_samples",
            "must be at least 1",
        ));
    }
    if !(0.0..=1.0).contains(&perturbation_prob) {
        return Err(ExplainError::invalid_argument(
            "perturbation_prob",
            format!("must be in [0, 1], got {perturbation_prob}"),
        ));
    }

    let n_bands = dims[0];
    let device = input.device();

    let mask: Tensor<B, 2, Bool> = match num_perturbed_bands {
        Some(k) => {
            if k > n_bands {
                return Err(ExplainError::invalid_argument(
                    "num_perturbed_bands",
                    format!("must be in [0, {n_bands}], got {k}"),
                ));
            }
            random_band_choice(n_bands, k, n_samples, rng, &device)?
        }
        None => {
            let rows: Vec<bool> = (0..n_samples * n_bands)
                .map(|_| rng.gen_bool(f64::from(perturbation_prob)))
                .collect();
            Tensor::from_data(TensorData::new(rows, [n_samples, n_bands]), &device)
        }
    };

    // Arithmetic masking keeps the batch differentiable: masked band planes
    // come from the baseline, the rest from the input.
    let mask = mask.float().reshape([n_samples, n_bands, 1, 1]);
    let keep = -mask.clone() + 1.0;

    let inputs = input.clone().unsqueeze::<4>().repeat_dim(0, n_samples);
    let baselines = baseline.clone().unsqueeze::<4>().repeat_dim(0, n_samples);

    Ok((baselines * mask + inputs * keep).require_grad())
}

/// Smooths an inner attribution method over stochastic band-masking
/// perturbations.
///
/// The inner method is driven with signed (unrectified) attributions
/// ([`AttributionOptions::rectify`] is always false) because the variance
/// statistics are meaningless over rectified values.
pub struct HyperNoiseTunnel<M> {
    inner: M,
    seed: Seed,
}

/// Per-call configuration for [`HyperNoiseTunnel`].
#[derive(Debug, Clone)]
pub struct HyperNoiseTunnelConfig<B: Backend> {
    /// Replacement values for masked bands.
    pub baseline: Baseline<B>,
    /// Target class index.
    pub target: Option<usize>,
    /// Number of perturbed samples to draw.
    pub n_samples: usize,
    /// Upper bound on the batch size of one inner attribution call.
    pub steps_per_batch: usize,
    /// Per-band masking probability in probabilistic mode.
    pub perturbation_prob: f32,
    /// Exact number of masked bands per sample; `None` selects
    /// probabilistic mode.
    pub num_perturbed_bands: Option<usize>,
    /// Statistic used to collapse the per-sample attributions.
    pub method: SmoothingMethod,
}

impl<B: Backend> Default for HyperNoiseTunnelConfig<B> {
    fn default() -> Self {
        Self {
            baseline: Baseline::default(),
            target: None,
            n_samples: 5,
            steps_per_batch: 1,
            perturbation_prob: 0.5,
            num_perturbed_bands: None,
            method: SmoothingMethod::default(),
        }
    }
}

impl<M> HyperNoiseTunnel<M> {
    /// Wrap an inner point-attribution method.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            seed: Seed::from_entropy(),
        }
    }

    /// Set the seed for the band-masking draws.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Raw per-perturbation attributions for a mini-batch of images.
    ///
    /// For every image in `inputs` this generates its perturbed batch,
    /// pushes it through the inner method in chunks of
    /// `config.steps_per_batch`, and stacks the per-image buffers into an
    /// `(n_samples, N, B, H, W)` tensor for [`SmoothingMethod::aggregate`].
    /// The tail chunk of `n_samples mod steps_per_batch` perturbations is
    /// processed as one extra call.
    pub fn attribute_raw<B: Backend>(
        &self,
        inputs: Tensor<B, 4>,
        config: &HyperNoiseTunnelConfig<B>,
    ) -> Result<Tensor<B, 5>>
    where
        M: PointAttribution<B>,
    {
        let [n, c, h, w] = inputs.dims();
        let device = inputs.device();

        if config.steps_per_batch < 1 {
            return Err(ExplainError::invalid_argument(
                "steps_per_batch",
                "must be at least 1",
            ));
        }
        if config.n_samples < 1 {
            return Err(ExplainError::invalid_argument(
                "n_samples",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&config.perturbation_prob) {
            return Err(ExplainError::invalid_argument(
                "perturbation_prob",
                format!("must be in [0, 1], got {}", config.perturbation_prob),
            ));
        }
        if let Some(k) = config.num_perturbed_bands {
            if k > c {
                return Err(ExplainError::invalid_argument(
                    "num_perturbed_bands",
                    format!("must be in [0, {c}], got {k}"),
                ));
            }
        }

        let baseline = config.baseline.resolve_dims([c, h, w], &device)?;
        let options = AttributionOptions {
            target: config.target,
            rectify: false,
        };

        let mode = config
            .num_perturbed_bands
            .map_or_else(|| "bernoulli".to_string(), |k| format!("fixed({k})"));
        tracing::debug!(
            n_samples = config.n_samples,
            steps_per_batch = config.steps_per_batch,
            %mode,
            "generating band-masking perturbations"
        );

        let mut rng = self.seed.to_rng();
        let mut per_image = Vec::with_capacity(n);
        for index in 0..n {
            let image: Tensor<B, 3> = inputs.clone().slice([index..index + 1]).squeeze(0);
            let perturbed = perturb_input(
                &image,
                &baseline,
                config.n_samples,
                config.perturbation_prob,
                config.num_perturbed_bands,
                &mut rng,
            )?;
            let buffer = drive_chunks(&self.inner, perturbed, config.steps_per_batch, &options)?;
            per_image.push(buffer);
        }

        Ok(Tensor::stack(per_image, 1))
    }
}

impl<B: Backend, M: PointAttribution<B>> Explainer<B> for HyperNoiseTunnel<M> {
    type Config = HyperNoiseTunnelConfig<B>;

    fn attribute(&self, cube: &HsiCube<B>, config: &Self::Config) -> Result<HsiAttributes<B>> {
        cube.ensure_band_first()?;

        let batch = cube.data().clone().unsqueeze::<4>();
        let raw = self.attribute_raw(batch, config)?;
        let attr = config.method.aggregate(raw).squeeze(0);

        HsiAttributes::new(cube.clone(), attr, self.name())
    }

    fn name(&self) -> &'static str {
        "hyper_noise_tunnel"
    }
}
