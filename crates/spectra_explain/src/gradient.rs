//! Gradient-based point-attribution strategies.
//!
//! These are thin strategies over the model's delegated gradient closure;
//! the backpropagation itself happens wherever that closure was built
//! (typically an autodiff backend). Each type implements both
//! [`PointAttribution`] for batch-level use inside the tunnels and
//! [`Explainer`] for direct cube-level use.

use std::sync::Arc;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use spectra_core::{Baseline, ExplainableModel, HsiCube};

use crate::attributes::HsiAttributes;
use crate::error::{ExplainError, Result};
use crate::explainer::{
    AttributionCapabilities, AttributionOptions, Explainer, PointAttribution,
};

fn require_gradient<B: Backend>(
    model: &ExplainableModel<B>,
    strategy: &str,
) -> Result<()> {
    if model.has_gradient() {
        Ok(())
    } else {
        Err(ExplainError::Uninitialized(format!(
            "{strategy} requires a model with an attached gradient closure"
        )))
    }
}

/// Saliency: the attribution is the raw gradient of the target score.
///
/// The classic formulation rectifies the gradient; standalone calls do so
/// by default. The strategy declares sign control, so tunnels wrapping it
/// force signed output instead.
pub struct Saliency<B: Backend> {
    model: Arc<ExplainableModel<B>>,
}

/// Per-call configuration for [`Saliency`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaliencyConfig {
    /// Target class index.
    pub target: Option<usize>,
    /// Rectify the gradient (absolute value).
    pub rectify: bool,
}

impl Default for SaliencyConfig {
    fn default() -> Self {
        Self {
            target: None,
            rectify: true,
        }
    }
}

impl<B: Backend> Saliency<B> {
    /// Wrap a model.
    ///
    /// # Errors
    ///
    /// Fails with [`ExplainError::Uninitialized`] if the model has no
    /// gradient closure.
    pub fn new(model: Arc<ExplainableModel<B>>) -> Result<Self> {
        require_gradient(&model, "Saliency")?;
        Ok(Self { model })
    }
}

impl<B: Backend> std::fmt::Debug for Saliency<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Saliency").finish_non_exhaustive()
    }
}

impl<B: Backend> PointAttribution<B> for Saliency<B> {
    fn capabilities(&self) -> AttributionCapabilities {
        AttributionCapabilities { sign_control: true }
    }

    fn attribute_batch(
        &self,
        inputs: Tensor<B, 4>,
        options: &AttributionOptions,
    ) -> Result<Tensor<B, 4>> {
        let grads = self.model.gradient(inputs, options.target)?;
        if options.rectify {
            Ok(grads.abs())
        } else {
            Ok(grads)
        }
    }
}

impl<B: Backend> Explainer<B> for Saliency<B> {
    type Config = SaliencyConfig;

    fn attribute(&self, cube: &HsiCube<B>, config: &Self::Config) -> Result<HsiAttributes<B>> {
        cube.ensure_band_first()?;
        let options = AttributionOptions {
            target: config.target,
            rectify: config.rectify,
        };
        let batch = cube.data().clone().unsqueeze::<4>();
        let attr = self.attribute_batch(batch, &options)?.squeeze(0);
        HsiAttributes::new(cube.clone(), attr, self.name())
    }

    fn name(&self) -> &'static str {
        "saliency"
    }
}

/// Input × Gradient: elementwise product of the input and the gradient.
pub struct InputXGradient<B: Backend> {
    model: Arc<ExplainableModel<B>>,
}

/// Per-call configuration for [`InputXGradient`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InputXGradientConfig {
    /// Target class index.
    pub target: Option<usize>,
}

impl<B: Backend> InputXGradient<B> {
    /// Wrap a model.
    ///
    /// # Errors
    ///
    /// Fails with [`ExplainError::Uninitialized`] if the model has no
    /// gradient closure.
    pub fn new(model: Arc<ExplainableModel<B>>) -> Result<Self> {
        require_gradient(&model, "InputXGradient")?;
        Ok(Self { model })
    }
}

impl<B: Backend> PointAttribution<B> for InputXGradient<B> {
    fn attribute_batch(
        &self,
        inputs: Tensor<B, 4>,
        options: &AttributionOptions,
    ) -> Result<Tensor<B, 4>> {
        let grads = self.model.gradient(inputs.clone(), options.target)?;
        Ok(inputs * grads)
    }
}

impl<B: Backend> Explainer<B> for InputXGradient<B> {
    type Config = InputXGradientConfig;

    fn attribute(&self, cube: &HsiCube<B>, config: &Self::Config) -> Result<HsiAttributes<B>> {
        cube.ensure_band_first()?;
        let options = AttributionOptions {
            target: config.target,
            rectify: false,
        };
        let batch = cube.data().clone().unsqueeze::<4>();
        let attr = self.attribute_batch(batch, &options)?.squeeze(0);
        HsiAttributes::new(cube.clone(), attr, self.name())
    }

    fn name(&self) -> &'static str {
        "input_x_gradient"
    }
}

/// Integrated Gradients: the integral of gradients along the straight-line
/// path from a baseline to the input, scaled by (input − baseline).
///
/// The integral is a trapezoidal Riemann sum with `n_steps` segments.
/// Attributions are signed.
///
/// Reference: Sundararajan et al., "Axiomatic Attribution for Deep
/// Networks", ICML 2017.
pub struct IntegratedGradients<B: Backend> {
    model: Arc<ExplainableModel<B>>,
    baseline: Baseline<B>,
    n_steps: usize,
}

/// Per-call configuration for [`IntegratedGradients`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IntegratedGradientsConfig {
    /// Target class index.
    pub target: Option<usize>,
}

impl<B: Backend> IntegratedGradients<B> {
    /// Wrap a model with a zero baseline and 50 integration steps.
    ///
    /// # Errors
    ///
    /// Fails with [`ExplainError::Uninitialized`] if the model has no
    /// gradient closure.
    pub fn new(model: Arc<ExplainableModel<B>>) -> Result<Self> {
        require_gradient(&model, "IntegratedGradients")?;
        Ok(Self {
            model,
            baseline: Baseline::default(),
            n_steps: 50,
        })
    }

    /// Set the path baseline.
    #[must_use]
    pub fn with_baseline(mut self, baseline: Baseline<B>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Set the number of Riemann segments (minimum 1).
    #[must_use]
    pub fn with_n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    fn batch_baseline(&self, dims: [usize; 4], device: &B::Device) -> Result<Tensor<B, 4>> {
        match &self.baseline {
            Baseline::Scalar(value) => Ok(Tensor::full(dims, *value, device)),
            Baseline::Cube(tensor) => {
                let [_, c, h, w] = dims;
                if tensor.dims() != [c, h, w] {
                    return Err(ExplainError::invalid_argument(
                        "baseline",
                        format!(
                            "baseline shape {:?} does not match input shape {:?}",
                            tensor.dims(),
                            [c, h, w]
                        ),
                    ));
                }
                Ok(tensor.clone().unsqueeze::<4>().repeat_dim(0, dims[0]))
            }
        }
    }
}

impl<B: Backend> PointAttribution<B> for IntegratedGradients<B> {
    fn attribute_batch(
        &self,
        inputs: Tensor<B, 4>,
        options: &AttributionOptions,
    ) -> Result<Tensor<B, 4>> {
        let dims = inputs.dims();
        let device = inputs.device();
        let n_steps = self.n_steps.max(1);

        let baseline = self.batch_baseline(dims, &device)?;
        let diff = inputs - baseline.clone();

        let mut integral = Tensor::<B, 4>::zeros(dims, &device);
        for step in 0..=n_steps {
            let alpha = step as f32 / n_steps as f32;
            let interpolated = baseline.clone() + diff.clone() * alpha;
            let grads = self.model.gradient(interpolated, options.target)?;

            // Trapezoidal rule: endpoints weighted by 0.5.
            let weight = if step == 0 || step == n_steps { 0.5 } else { 1.0 };
            integral = integral + grads * weight;
        }

        let step_size = 1.0 / n_steps as f32;
        Ok(diff * integral * step_size)
    }
}

impl<B: Backend> Explainer<B> for IntegratedGradients<B> {
    type Config = IntegratedGradientsConfig;

    fn attribute(&self, cube: &HsiCube<B>, config: &Self::Config) -> Result<HsiAttributes<B>> {
        cube.ensure_band_first()?;
        let options = AttributionOptions {
            target: config.target,
            rectify: false,
        };
        let batch = cube.data().clone().unsqueeze::<4>();
        let attr = self.attribute_batch(batch, &options)?.squeeze(0);
        HsiAttributes::new(cube.clone(), attr, self.name())
    }

    fn name(&self) -> &'static str {
        "integrated_gradients"
    }
}
