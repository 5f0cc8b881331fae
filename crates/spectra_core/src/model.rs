//! Wrappers around opaque scorable models.

use std::fmt;

use burn::prelude::*;

use crate::error::{CoreError, Result};

/// Forward closure: maps a batch `(N, B, H, W)` to per-class scores `(N, K)`.
pub type ForwardFn<B> = dyn Fn(Tensor<B, 4>) -> Tensor<B, 2> + Send + Sync;

/// Gradient closure: gradients of the target class score with respect to the
/// input batch. Backpropagation is delegated entirely to this closure; the
/// caller typically builds it on an autodiff backend.
pub type GradientFn<B> = dyn Fn(Tensor<B, 4>, Option<usize>) -> Tensor<B, 4> + Send + Sync;

/// An opaque scorable model together with its device.
///
/// Attribution strategies never see the model itself, only these closures.
/// Perturbation-only strategies (occlusion, the tunnels' drivers) need just
/// the forward closure; gradient strategies additionally require the
/// gradient closure and refuse construction without it.
///
/// # Example
///
/// ```rust,ignore
/// let model = ExplainableModel::new(device, move |batch| net.forward(batch))
///     .with_gradient(move |batch, target| backprop(&net, batch, target));
/// ```
pub struct ExplainableModel<B: Backend> {
    forward: Box<ForwardFn<B>>,
    gradient: Option<Box<GradientFn<B>>>,
    device: B::Device,
}

impl<B: Backend> ExplainableModel<B> {
    /// Wrap a forward closure.
    pub fn new<F>(device: B::Device, forward: F) -> Self
    where
        F: Fn(Tensor<B, 4>) -> Tensor<B, 2> + Send + Sync + 'static,
    {
        Self {
            forward: Box::new(forward),
            gradient: None,
            device,
        }
    }

    /// Attach the delegated backpropagation closure.
    #[must_use]
    pub fn with_gradient<G>(mut self, gradient: G) -> Self
    where
        G: Fn(Tensor<B, 4>, Option<usize>) -> Tensor<B, 4> + Send + Sync + 'static,
    {
        self.gradient = Some(Box::new(gradient));
        self
    }

    /// Run the forward closure.
    pub fn forward(&self, batch: Tensor<B, 4>) -> Tensor<B, 2> {
        (self.forward)(batch)
    }

    /// Whether a gradient closure is attached.
    #[must_use]
    pub fn has_gradient(&self) -> bool {
        self.gradient.is_some()
    }

    /// Run the gradient closure.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Uninitialized`] if no gradient closure was
    /// attached.
    pub fn gradient(&self, batch: Tensor<B, 4>, target: Option<usize>) -> Result<Tensor<B, 4>> {
        match &self.gradient {
            Some(gradient) => Ok(gradient(batch, target)),
            None => Err(CoreError::Uninitialized(
                "gradient closure is not attached to the explainable model".to_string(),
            )),
        }
    }

    /// Per-sample score of the target class: `(N, B, H, W)` → `(N,)`.
    ///
    /// With `target = None` the model must be single-output.
    ///
    /// # Errors
    ///
    /// Fails if the target index is out of range, or if `target` is omitted
    /// for a multi-output model.
    pub fn score(&self, batch: Tensor<B, 4>, target: Option<usize>) -> Result<Tensor<B, 1>> {
        let out = self.forward(batch);
        let [n, k] = out.dims();
        let column = match target {
            Some(t) if t < k => t,
            Some(t) => {
                return Err(CoreError::invalid_argument(
                    "target",
                    format!("class index {t} out of range for {k} outputs"),
                ))
            }
            None if k == 1 => 0,
            None => {
                return Err(CoreError::invalid_argument(
                    "target",
                    format!("a class index is required for a model with {k} outputs"),
                ))
            }
        };
        Ok(out.slice([0..n, column..column + 1]).squeeze(1))
    }

    /// The device the model runs on.
    #[must_use]
    pub const fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: Backend> fmt::Debug for ExplainableModel<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplainableModel")
            .field("device", &self.device)
            .field("has_gradient", &self.has_gradient())
            .finish()
    }
}
