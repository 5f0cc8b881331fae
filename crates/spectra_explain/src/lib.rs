//! # spectra_explain
//!
//! Post-hoc attribution methods for hyperspectral-image classifiers.
//!
//! This crate provides:
//! - [`Explainer`] / [`PointAttribution`]: the strategy seams
//! - [`Saliency`], [`InputXGradient`], [`IntegratedGradients`]: gradient
//!   strategies over a delegated backpropagation closure
//! - [`Occlusion`]: sliding-window perturbation attribution
//! - [`NoiseTunnel`]: Gaussian smoothing of an inner method
//! - [`HyperNoiseTunnel`]: band-masking smoothing of an inner method
//! - [`HsiAttributes`]: typed attribution results with reduction helpers
//!
//! ## Composition
//!
//! Strategies are independent types; the tunnels chain by owning an inner
//! [`PointAttribution`]:
//!
//! ```rust,ignore
//! let saliency = Saliency::new(model.clone())?;
//! let tunnel = HyperNoiseTunnel::new(saliency).with_seed(Seed::new(42));
//! let attrs = tunnel.attribute(&cube, &HyperNoiseTunnelConfig::default())?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod attributes;
mod error;
mod explainer;
mod gradient;
mod hyper_noise_tunnel;
mod noise_tunnel;
mod occlusion;
mod smoothing;

pub use attributes::HsiAttributes;
pub use error::{ExplainError, Result};
pub use explainer::{
    AttributionCapabilities, AttributionOptions, Explainer, PointAttribution,
};
pub use gradient::{
    InputXGradient, InputXGradientConfig, IntegratedGradients, IntegratedGradientsConfig,
    Saliency, SaliencyConfig,
};
pub use hyper_noise_tunnel::{
    perturb_input, random_band_choice, HyperNoiseTunnel, HyperNoiseTunnelConfig,
};
pub use noise_tunnel::{NoiseTunnel, NoiseTunnelConfig};
pub use occlusion::{Occlusion, OcclusionConfig};
pub use smoothing::SmoothingMethod;
