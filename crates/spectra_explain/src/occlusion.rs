//! Sliding-window occlusion attribution.

use std::sync::Arc;

use burn::prelude::*;

use spectra_core::{Baseline, ExplainableModel, HsiCube};

use crate::attributes::HsiAttributes;
use crate::error::{ExplainError, Result};
use crate::explainer::Explainer;

/// Occlusion: slides a (band, height, width) window over the cube,
/// replaces the windowed region with the baseline, and attributes the
/// resulting score drop to every cell the window covers. Cells covered by
/// several windows receive the mean drop.
///
/// Needs only the model's forward closure; no gradients are needed.
pub struct Occlusion<B: Backend> {
    model: Arc<ExplainableModel<B>>,
}

/// Per-call configuration for [`Occlusion`].
#[derive(Debug, Clone)]
pub struct OcclusionConfig<B: Backend> {
    /// Window extents per axis (band, height, width).
    pub window: (usize, usize, usize),
    /// Stride per axis; must not exceed the window extent so every cell is
    /// occluded at least once.
    pub strides: (usize, usize, usize),
    /// Replacement values for occluded regions.
    pub baseline: Baseline<B>,
    /// Target class index.
    pub target: Option<usize>,
    /// How many occluded variants to batch through one forward call.
    pub perturbations_per_eval: usize,
}

impl<B: Backend> Default for OcclusionConfig<B> {
    fn default() -> Self {
        Self {
            window: (1, 1, 1),
            strides: (1, 1, 1),
            baseline: Baseline::default(),
            target: None,
            perturbations_per_eval: 1,
        }
    }
}

/// Window start offsets along one axis, tiled by the stride with a final
/// position added so the last window touches the axis end.
fn axis_positions(extent: usize, window: usize, stride: usize) -> Vec<usize> {
    let last = extent - window;
    let mut positions: Vec<usize> = (0..=last).step_by(stride).collect();
    if positions.last() != Some(&last) {
        positions.push(last);
    }
    positions
}

fn validate_axis(name: &str, extent: usize, window: usize, stride: usize) -> Result<()> {
    if window < 1 || window > extent {
        return Err(ExplainError::invalid_argument(
            name,
            format!("window extent {window} must be in [1, {extent}]"),
        ));
    }
    if stride < 1 || stride > window {
        return Err(ExplainError::invalid_argument(
            name,
            format!("stride {stride} must be in [1, {window}] (window extent)"),
        ));
    }
    Ok(())
}

impl<B: Backend> Occlusion<B> {
    /// Wrap a model.
    pub fn new(model: Arc<ExplainableModel<B>>) -> Self {
        Self { model }
    }
}

impl<B: Backend> Explainer<B> for Occlusion<B> {
    type Config = OcclusionConfig<B>;

    fn attribute(&self, cube: &HsiCube<B>, config: &Self::Config) -> Result<HsiAttributes<B>> {
        cube.ensure_band_first()?;

        let x = cube.data().clone();
        let [c, h, w] = x.dims();
        let (wc, wh, ww) = config.window;
        let (sc, sh, sw) = config.strides;

        validate_axis("window.band", c, wc, sc)?;
        validate_axis("window.height", h, wh, sh)?;
        validate_axis("window.width", w, ww, sw)?;
        if config.perturbations_per_eval < 1 {
            return Err(ExplainError::invalid_argument(
                "perturbations_per_eval",
                "must be at least 1",
            ));
        }

        let baseline = config.baseline.resolve(cube)?;
        let device = x.device();

        let original: f32 = self
            .model
            .score(x.clone().unsqueeze::<4>(), config.target)?
            .into_scalar()
            .elem();

        let mut positions = Vec::new();
        for bc in axis_positions(c, wc, sc) {
            for bh in axis_positions(h, wh, sh) {
                for bw in axis_positions(w, ww, sw) {
                    positions.push((bc, bh, bw));
                }
            }
        }
        tracing::debug!(
            windows = positions.len(),
            "occluding cube with {}x{}x{} windows",
            wc,
            wh,
            ww
        );

        let mut sums = vec![0.0f32; c * h * w];
        let mut counts = vec![0u32; c * h * w];

        for chunk in positions.chunks(config.perturbations_per_eval) {
            let variants: Vec<Tensor<B, 3>> = chunk
                .iter()
                .map(|&(bc, bh, bw)| {
                    let region = baseline
                        .clone()
                        .slice([bc..bc + wc, bh..bh + wh, bw..bw + ww]);
                    x.clone()
                        .slice_assign([bc..bc + wc, bh..bh + wh, bw..bw + ww], region)
                })
                .collect();

            let batch: Tensor<B, 4> = Tensor::stack(variants, 0);
            let data = self.model.score(batch, config.target)?.into_data();
            let scores: Vec<f32> = data.iter::<f32>().collect();

            for (&(bc, bh, bw), score) in chunk.iter().zip(scores) {
                let drop = original - score;
                for ci in bc..bc + wc {
                    for hi in bh..bh + wh {
                        for wi in bw..bw + ww {
                            let idx = (ci * h + hi) * w + wi;
                            sums[idx] += drop;
                            counts[idx] += 1;
                        }
                    }
                }
            }
        }

        let averaged: Vec<f32> = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| sum / count as f32)
            .collect();
        let values = Tensor::<B, 1>::from_floats(averaged.as_slice(), &device).reshape([c, h, w]);

        HsiAttributes::new(cube.clone(), values, self.name())
    }

    fn name(&self) -> &'static str {
        "occlusion"
    }
}
