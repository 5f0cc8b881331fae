//! Attribution result containers.

use burn::prelude::*;

use spectra_core::{Axis, CoreError, HsiCube};

use crate::error::Result;

/// An attribution map over a hyperspectral cube.
///
/// Pairs the source cube with a same-shape tensor of importance scores and
/// the name of the producing method. Immutable once built; the reduction
/// helpers return fresh tensors for visualization consumers.
#[derive(Debug, Clone)]
pub struct HsiAttributes<B: Backend> {
    cube: HsiCube<B>,
    values: Tensor<B, 3>,
    method: String,
}

impl<B: Backend> HsiAttributes<B> {
    /// Package an attribution tensor with its source cube.
    ///
    /// # Errors
    ///
    /// Fails if the attribution shape does not equal the cube shape.
    pub fn new(cube: HsiCube<B>, values: Tensor<B, 3>, method: impl Into<String>) -> Result<Self> {
        if values.dims() != cube.dims() {
            return Err(CoreError::ShapeMismatch(format!(
                "attribution shape {:?} does not match cube shape {:?}",
                values.dims(),
                cube.dims()
            ))
            .into());
        }
        Ok(Self {
            cube,
            values,
            method: method.into(),
        })
    }

    /// The source cube.
    #[must_use]
    pub const fn cube(&self) -> &HsiCube<B> {
        &self.cube
    }

    /// The raw attribution values.
    #[must_use]
    pub const fn values(&self) -> &Tensor<B, 3> {
        &self.values
    }

    /// Name of the method that produced this map.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Min–max normalize the attribution values to `[0, 1]`.
    ///
    /// A constant map is passed through unchanged.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let min_val: f32 = self.values.clone().min().into_scalar().elem();
        let max_val: f32 = self.values.clone().max().into_scalar().elem();
        let range = max_val - min_val;

        let normalized = if range > 1e-8 {
            (self.values.clone() - min_val) / range
        } else {
            self.values.clone()
        };

        Self {
            cube: self.cube.clone(),
            values: normalized,
            method: self.method.clone(),
        }
    }

    /// Mean absolute attribution per spectral band.
    ///
    /// Returns a rank-1 tensor of length `bands`, in band order; pair it
    /// with [`HsiCube::wavelengths`] for spectral plots.
    #[must_use]
    pub fn band_importance(&self) -> Tensor<B, 1> {
        let band = self.cube.orientation().index_of(Axis::Band);
        let bands = self.cube.bands();

        let mut reduced = self.values.clone().abs();
        for dim in 0..3 {
            if dim != band {
                reduced = reduced.mean_dim(dim);
            }
        }
        reduced.reshape([bands])
    }

    /// Mean attribution over bands, keeping the spatial axes in cube order.
    #[must_use]
    pub fn spatial_map(&self) -> Tensor<B, 2> {
        let band = self.cube.orientation().index_of(Axis::Band);
        self.values.clone().mean_dim(band).squeeze(band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_core::backend::NdArray;
    use spectra_core::Orientation;

    type TestBackend = NdArray;

    fn attributes(dims: [usize; 3]) -> HsiAttributes<TestBackend> {
        let device = Default::default();
        let cube = HsiCube::new(Tensor::ones(dims, &device), Orientation::BHW);
        let n = dims.iter().product::<usize>();
        let data: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let values = Tensor::<TestBackend, 1>::from_floats(data.as_slice(), &device).reshape(dims);
        HsiAttributes::new(cube, values, "saliency").unwrap()
    }

    #[test]
    fn test_shape_validated() {
        let device = Default::default();
        let cube =
            HsiCube::<TestBackend>::new(Tensor::ones([3, 4, 4], &device), Orientation::BHW);
        let wrong = Tensor::<TestBackend, 3>::zeros([3, 4, 5], &device);
        assert!(HsiAttributes::new(cube, wrong, "saliency").is_err());
    }

    #[test]
    fn test_normalize_bounds() {
        let normalized = attributes([3, 4, 4]).normalize();
        let min: f32 = normalized.values().clone().min().into_scalar().elem();
        let max: f32 = normalized.values().clone().max().into_scalar().elem();
        assert!(min >= -1e-6);
        assert!(max <= 1.0 + 1e-6);
    }

    #[test]
    fn test_normalize_constant_map_unchanged() {
        let device = Default::default();
        let cube =
            HsiCube::<TestBackend>::new(Tensor::ones([2, 2, 2], &device), Orientation::BHW);
        let flat = Tensor::<TestBackend, 3>::ones([2, 2, 2], &device) * 3.0;
        let attrs = HsiAttributes::new(cube, flat, "occlusion").unwrap();

        let sum: f32 = attrs.normalize().values().clone().sum().into_scalar().elem();
        assert!((sum - 24.0).abs() < 1e-5);
    }

    #[test]
    fn test_band_importance_length() {
        let importance = attributes([3, 4, 4]).band_importance();
        assert_eq!(importance.dims(), [3]);
    }

    #[test]
    fn test_spatial_map_shape() {
        let map = attributes([3, 4, 5]).spatial_map();
        assert_eq!(map.dims(), [4, 5]);
    }
}
