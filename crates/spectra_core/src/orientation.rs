//! Axis ordering for hyperspectral cubes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A single axis of a hyperspectral cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Spectral band axis.
    Band,
    /// Spatial height axis.
    Height,
    /// Spatial width axis.
    Width,
}

impl Axis {
    /// One-letter label used in orientation strings.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Band => 'B',
            Self::Height => 'H',
            Self::Width => 'W',
        }
    }

    fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'B' => Some(Self::Band),
            'H' => Some(Self::Height),
            'W' => Some(Self::Width),
            _ => None,
        }
    }
}

/// The axis ordering of a cube's three dimensions.
///
/// Attribution entry points require the canonical [`Orientation::BHW`]
/// ordering (band, height, width) and fail fast on anything else; automatic
/// reorientation is intentionally not performed.
///
/// # Example
///
/// ```rust
/// use spectra_core::Orientation;
///
/// let o: Orientation = "BHW".parse().unwrap();
/// assert_eq!(o, Orientation::BHW);
/// assert!(o.is_band_first());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation([Axis; 3]);

impl Orientation {
    /// Canonical ordering: (band, height, width).
    pub const BHW: Self = Self([Axis::Band, Axis::Height, Axis::Width]);

    /// Build an orientation from three distinct axes.
    pub fn new(axes: [Axis; 3]) -> Result<Self> {
        if axes[0] == axes[1] || axes[0] == axes[2] || axes[1] == axes[2] {
            return Err(CoreError::invalid_argument(
                "orientation",
                format!("axes must be a permutation of B, H, W, got {axes:?}"),
            ));
        }
        Ok(Self(axes))
    }

    /// The three axes in dimension order.
    #[must_use]
    pub const fn axes(&self) -> [Axis; 3] {
        self.0
    }

    /// Dimension index of the given axis.
    #[must_use]
    pub fn index_of(&self, axis: Axis) -> usize {
        // Constructor guarantees each axis appears exactly once.
        self.0.iter().position(|a| *a == axis).unwrap_or(0)
    }

    /// Whether this is the canonical (band, height, width) ordering.
    #[must_use]
    pub fn is_band_first(&self) -> bool {
        *self == Self::BHW
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::BHW
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.0 {
            write!(f, "{}", axis.letter())?;
        }
        Ok(())
    }
}

impl FromStr for Orientation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let letters: Vec<char> = s.chars().collect();
        if letters.len() != 3 {
            return Err(CoreError::invalid_argument(
                "orientation",
                format!("expected a 3-letter axis string, got {s:?}"),
            ));
        }
        let mut axes = [Axis::Band; 3];
        for (slot, letter) in axes.iter_mut().zip(letters) {
            *slot = Axis::from_letter(letter).ok_or_else(|| {
                CoreError::invalid_argument(
                    "orientation",
                    format!("unknown axis letter {letter:?} in {s:?}"),
                )
            })?;
        }
        Self::new(axes)
    }
}
