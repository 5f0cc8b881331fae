//! Baseline values substituted into perturbed regions.

use burn::prelude::*;

use crate::error::{CoreError, Result};
use crate::image::HsiCube;

/// A reference "absent" value for perturbation-based attribution.
///
/// Either a scalar broadcast over the whole cube, or an explicit tensor
/// that must match the cube's shape exactly.
#[derive(Debug, Clone)]
pub enum Baseline<B: Backend> {
    /// A single value broadcast to the cube's shape.
    Scalar(f32),
    /// An explicit per-entry baseline with the same shape as the cube.
    Cube(Tensor<B, 3>),
}

impl<B: Backend> Default for Baseline<B> {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

impl<B: Backend> Baseline<B> {
    /// Accept a batched baseline with a leading singleton axis.
    ///
    /// # Errors
    ///
    /// Fails if the leading axis extent is not 1.
    pub fn from_batch(tensor: Tensor<B, 4>) -> Result<Self> {
        let dims = tensor.dims();
        if dims[0] != 1 {
            return Err(CoreError::InvalidShape {
                expected: "(1, B, H, W)".to_string(),
                got: format!("{dims:?}"),
            });
        }
        Ok(Self::Cube(tensor.squeeze(0)))
    }

    /// Resolve this baseline against a cube, producing a tensor of the
    /// cube's exact shape on the cube's device.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::ShapeMismatch`] if an explicit baseline does
    /// not match the cube's shape.
    pub fn resolve(&self, cube: &HsiCube<B>) -> Result<Tensor<B, 3>> {
        self.resolve_dims(cube.dims(), &cube.device())
    }

    /// Resolve this baseline against explicit target dimensions.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::ShapeMismatch`] if an explicit baseline does
    /// not match `dims`.
    pub fn resolve_dims(&self, dims: [usize; 3], device: &B::Device) -> Result<Tensor<B, 3>> {
        match self {
            Self::Scalar(value) => Ok(Tensor::full(dims, *value, device)),
            Self::Cube(tensor) => {
                if tensor.dims() != dims {
                    return Err(CoreError::ShapeMismatch(format!(
                        "baseline shape {:?} does not match cube shape {:?}",
                        tensor.dims(),
                        dims
                    )));
                }
                Ok(tensor.clone())
            }
        }
    }
}

impl<B: Backend> From<f32> for Baseline<B> {
    fn from(value: f32) -> Self {
        Self::Scalar(value)
    }
}

impl<B: Backend> From<Tensor<B, 3>> for Baseline<B> {
    fn from(tensor: Tensor<B, 3>) -> Self {
        Self::Cube(tensor)
    }
}
