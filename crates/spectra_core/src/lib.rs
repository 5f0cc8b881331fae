//! # spectra_core
//!
//! Core types for spectra-rs hyperspectral explainability.
//!
//! This crate provides:
//! - [`Seed`] for deterministic random number generation
//! - [`Orientation`] and [`Axis`] for cube axis-order metadata
//! - [`HsiCube`] for hyperspectral cube data
//! - [`Baseline`] validation and broadcasting
//! - [`ExplainableModel`] wrapping opaque forward/gradient closures plus device
//! - Error types and common utilities
//!
//! ## Shape Convention
//!
//! Single cubes follow `(B, H, W)`, band then height then width, and batches
//! follow `(N, B, H, W)`. Attribution entry points reject any other axis
//! ordering rather than silently permuting.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod baseline;
mod error;
mod image;
mod model;
mod orientation;
mod seed;

pub use baseline::Baseline;
pub use error::{CoreError, Result};
pub use image::HsiCube;
pub use model::{ExplainableModel, ForwardFn, GradientFn};
pub use orientation::{Axis, Orientation};
pub use seed::Seed;

/// Backend type aliases for convenience
pub mod backend {
    #[cfg(feature = "backend-ndarray")]
    pub use burn_ndarray::NdArray;
}
