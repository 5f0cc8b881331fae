//! Strategy interfaces for attribution methods.
//!
//! Two seams: [`Explainer`] is the cube-level capability every strategy
//! exposes to callers, and [`PointAttribution`] is the batch-level contract
//! the tunnel strategies drive their wrapped inner method through. Chaining
//! is plain composition: a tunnel owns its inner strategy by value.

use burn::prelude::*;

use spectra_core::HsiCube;

use crate::attributes::HsiAttributes;
use crate::error::Result;

/// Options forwarded to a wrapped point-attribution call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributionOptions {
    /// Target class index, if the model is multi-output.
    pub target: Option<usize>,
    /// Request rectified (absolute-value) attributions. Only honored by
    /// strategies whose [`AttributionCapabilities::sign_control`] is set;
    /// the tunnels always pass `false` because their variance statistics
    /// need signed values.
    pub rectify: bool,
}

/// Optional behaviors a point-attribution declares at construction time.
///
/// This replaces runtime introspection of the wrapped method's signature:
/// whether a sign-control option exists is stated explicitly here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributionCapabilities {
    /// Whether the strategy honors [`AttributionOptions::rectify`].
    pub sign_control: bool,
}

/// A point-attribution method operating on raw batches.
///
/// Implementations map a batch of inputs `(P, B, H, W)` to attributions of
/// the same shape. This is the interface the noise tunnels wrap and batch
/// perturbations through.
pub trait PointAttribution<B: Backend>: Send + Sync {
    /// Declared optional behaviors.
    fn capabilities(&self) -> AttributionCapabilities {
        AttributionCapabilities::default()
    }

    /// Compute attributions for a batch of inputs.
    fn attribute_batch(
        &self,
        inputs: Tensor<B, 4>,
        options: &AttributionOptions,
    ) -> Result<Tensor<B, 4>>;
}

/// A cube-level attribution strategy.
///
/// Each strategy is an independent type with its own configuration; there
/// is no shared base state beyond what a strategy chooses to hold.
pub trait Explainer<B: Backend> {
    /// Per-call configuration for this strategy.
    type Config;

    /// Compute an attribution map for the given cube.
    fn attribute(&self, cube: &HsiCube<B>, config: &Self::Config) -> Result<HsiAttributes<B>>;

    /// Name tagged onto produced attribution results.
    fn name(&self) -> &'static str;
}
