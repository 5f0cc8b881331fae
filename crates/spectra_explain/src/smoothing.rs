//! Smoothing statistics and batch plumbing shared by the tunnel strategies.

use std::fmt;
use std::str::FromStr;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, Result};
use crate::explainer::{AttributionOptions, PointAttribution};

/// Statistic used to collapse per-perturbation attributions into one map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMethod {
    /// Arithmetic mean across samples.
    #[default]
    Smoothgrad,
    /// Mean of squared values across samples (uncentered second moment).
    SmoothgradSq,
    /// Population variance across samples: mean-of-squares minus
    /// square-of-mean, with no Bessel correction.
    Vargrad,
}

impl SmoothingMethod {
    /// Wire name of the statistic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Smoothgrad => "smoothgrad",
            Self::SmoothgradSq => "smoothgrad_sq",
            Self::Vargrad => "vargrad",
        }
    }

    /// Collapse raw per-sample attributions `(S, N, B, H, W)` along the
    /// sample axis.
    pub fn aggregate<B: Backend>(self, samples: Tensor<B, 5>) -> Tensor<B, 4> {
        match self {
            Self::Smoothgrad => samples.mean_dim(0).squeeze(0),
            Self::SmoothgradSq => (samples.clone() * samples).mean_dim(0).squeeze(0),
            Self::Vargrad => {
                let mean = samples.clone().mean_dim(0);
                let mean_sq = (samples.clone() * samples).mean_dim(0);
                (mean_sq - mean.clone() * mean).squeeze(0)
            }
        }
    }
}

impl fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SmoothingMethod {
    type Err = ExplainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "smoothgrad" => Ok(Self::Smoothgrad),
            "smoothgrad_sq" => Ok(Self::SmoothgradSq),
            "vargrad" => Ok(Self::Vargrad),
            other => Err(ExplainError::UnknownMethod(other.to_string())),
        }
    }
}

/// Push one image's perturbed batch `(S, B, H, W)` through the wrapped
/// point-attribution in chunks of `steps_per_batch`, writing each chunk's
/// output into a preallocated buffer at the matching sample indices.
///
/// The tail chunk of size `n_samples mod steps_per_batch` is processed as
/// one extra call; every sample index is written exactly once.
pub(crate) fn drive_chunks<B: Backend, M: PointAttribution<B>>(
    inner: &M,
    perturbed: Tensor<B, 4>,
    steps_per_batch: usize,
    options: &AttributionOptions,
) -> Result<Tensor<B, 4>> {
    let dims = perturbed.dims();
    let n_samples = dims[0];
    let device = perturbed.device();

    let mut buffer = Tensor::<B, 4>::zeros(dims, &device);
    let mut start = 0;
    while start < n_samples {
        let end = usize::min(start + steps_per_batch, n_samples);
        let chunk = perturbed.clone().slice([start..end]);
        let out = inner.attribute_batch(chunk, options)?;
        buffer = buffer.slice_assign([start..end], out);
        start = end;
    }
    Ok(buffer)
}
