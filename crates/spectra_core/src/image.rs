//! Hyperspectral cube container.

use burn::prelude::*;

use crate::error::{CoreError, Result};
use crate::orientation::{Axis, Orientation};

/// A hyperspectral cube: a rank-3 float tensor with a declared axis ordering
/// and optional per-band wavelength metadata.
///
/// The cube is read-only to the attribution core; strategies clone the
/// underlying tensor before perturbing it.
///
/// # Type Parameters
///
/// * `B` - The Burn backend type
///
/// # Example
///
/// ```rust,ignore
/// use spectra_core::{HsiCube, Orientation};
///
/// let data = Tensor::<NdArray, 3>::ones([3, 64, 64], &device);
/// let cube = HsiCube::new(data, Orientation::BHW)
///     .with_wavelengths(vec![450.0, 550.0, 650.0])?;
/// ```
#[derive(Debug, Clone)]
pub struct HsiCube<B: Backend> {
    data: Tensor<B, 3>,
    orientation: Orientation,
    wavelengths: Option<Vec<f32>>,
}

impl<B: Backend> HsiCube<B> {
    /// Wrap a rank-3 tensor with its axis ordering.
    pub fn new(data: Tensor<B, 3>, orientation: Orientation) -> Self {
        Self {
            data,
            orientation,
            wavelengths: None,
        }
    }

    /// Wrap a tensor already in the canonical (band, height, width) ordering.
    pub fn band_first(data: Tensor<B, 3>) -> Self {
        Self::new(data, Orientation::BHW)
    }

    /// Attach per-band wavelengths (nanometres).
    ///
    /// # Errors
    ///
    /// Fails if the number of wavelengths does not match the band extent.
    pub fn with_wavelengths(mut self, wavelengths: Vec<f32>) -> Result<Self> {
        let bands = self.bands();
        if wavelengths.len() != bands {
            return Err(CoreError::invalid_argument(
                "wavelengths",
                format!("expected {} entries, got {}", bands, wavelengths.len()),
            ));
        }
        self.wavelengths = Some(wavelengths);
        Ok(self)
    }

    /// The underlying tensor.
    #[must_use]
    pub const fn data(&self) -> &Tensor<B, 3> {
        &self.data
    }

    /// Consume self and return the underlying tensor.
    #[must_use]
    pub fn into_data(self) -> Tensor<B, 3> {
        self.data
    }

    /// The axis ordering of the cube's dimensions.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Per-band wavelengths, if attached.
    #[must_use]
    pub fn wavelengths(&self) -> Option<&[f32]> {
        self.wavelengths.as_deref()
    }

    /// Dimension extents in the cube's own axis order.
    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.data.dims()
    }

    /// Number of spectral bands, honoring the axis ordering.
    #[must_use]
    pub fn bands(&self) -> usize {
        self.dims()[self.orientation.index_of(Axis::Band)]
    }

    /// The device the cube lives on.
    pub fn device(&self) -> B::Device {
        self.data.device()
    }

    /// Clone the cube onto a different device.
    pub fn to_device(&self, device: &B::Device) -> Self {
        Self {
            data: self.data.clone().to_device(device),
            orientation: self.orientation,
            wavelengths: self.wavelengths.clone(),
        }
    }

    /// Require the canonical (band, height, width) ordering.
    ///
    /// Automatic reorientation is intentionally disabled, so a cube in any
    /// other ordering is rejected rather than silently permuted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OrientationMismatch`] for non-canonical cubes.
    pub fn ensure_band_first(&self) -> Result<()> {
        if self.orientation.is_band_first() {
            return Ok(());
        }
        tracing::warn!(
            orientation = %self.orientation,
            "cube orientation is not BHW; reorientation is disabled, rejecting"
        );
        Err(CoreError::OrientationMismatch {
            expected: Orientation::BHW.to_string(),
            got: self.orientation.to_string(),
        })
    }
}
