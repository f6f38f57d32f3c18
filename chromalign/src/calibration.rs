//! Per-axis physical scale of a dataset.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Component, Result};
use crate::grid::Dimensionality;

/// Physical length per sample along each spatial axis.
///
/// Every scale is finite and strictly positive; the channel axis carries no
/// calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Calibration {
    scale: Vec<f64>,
}

impl Calibration {
    pub fn new(scale: Vec<f64>) -> Result<Self> {
        Dimensionality::from_count(scale.len())
            .map_err(|e| e.in_component(Component::Calibration))?;
        if let Some((axis, &value)) = scale
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            return Err(AlignError::InvalidCalibration {
                component: Component::Calibration,
                axis,
                value,
            });
        }
        Ok(Self { scale })
    }

    /// Unit scale: sample index and physical coordinates coincide.
    pub fn identity(dims: Dimensionality) -> Self {
        Self {
            scale: vec![1.0; dims.count()],
        }
    }

    pub fn dims(&self) -> Dimensionality {
        match self.scale.len() {
            2 => Dimensionality::Two,
            _ => Dimensionality::Three,
        }
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Calibration with reciprocal scales; conjugating by it undoes
    /// conjugation by `self`.
    pub fn inverse(&self) -> Self {
        Self {
            scale: self.scale.iter().map(|s| 1.0 / s).collect(),
        }
    }

    pub fn smallest_scale(&self) -> f64 {
        self.scale.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Scale as a 3-vector; planar calibrations get a unit z scale.
    #[inline]
    pub fn scale_vec3(&self) -> DVec3 {
        DVec3::new(
            self.scale[0],
            self.scale[1],
            self.scale.get(2).copied().unwrap_or(1.0),
        )
    }

    /// Maps a sample-index position to physical coordinates.
    #[inline]
    pub fn to_physical(&self, index: DVec3) -> DVec3 {
        index * self.scale_vec3()
    }

    /// Maps physical coordinates to a (fractional) sample-index position.
    #[inline]
    pub fn to_index(&self, physical: DVec3) -> DVec3 {
        physical / self.scale_vec3()
    }
}

impl TryFrom<Vec<f64>> for Calibration {
    type Error = AlignError;

    fn try_from(scale: Vec<f64>) -> Result<Self> {
        Calibration::new(scale)
    }
}

impl From<Calibration> for Vec<f64> {
    fn from(calibration: Calibration) -> Self {
        calibration.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_scales() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = Calibration::new(vec![1.0, bad, 2.0]).unwrap_err();
            assert!(
                matches!(err, AlignError::InvalidCalibration { axis: 1, .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn rejects_wrong_axis_count() {
        let err = Calibration::new(vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            AlignError::UnsupportedDimensionality {
                component: Component::Calibration,
                dims: 1
            }
        ));
    }

    #[test]
    fn physical_index_round_trip() {
        let cal = Calibration::new(vec![0.1, 0.2, 0.5]).unwrap();
        let index = DVec3::new(10.0, 20.0, 4.0);
        let physical = cal.to_physical(index);
        assert!((physical - DVec3::new(1.0, 4.0, 2.0)).length() < 1e-12);
        assert!((cal.to_index(physical) - index).length() < 1e-12);
    }

    #[test]
    fn planar_calibration_keeps_z() {
        let cal = Calibration::new(vec![2.0, 3.0]).unwrap();
        assert_eq!(cal.dims(), Dimensionality::Two);
        assert_eq!(cal.scale_vec3(), DVec3::new(2.0, 3.0, 1.0));
        assert_eq!(cal.smallest_scale(), 2.0);
    }

    #[test]
    fn deserialization_validates() {
        let ok: Calibration = serde_json::from_str("[1.0, 1.0, 3.0]").unwrap();
        assert_eq!(ok.scale(), &[1.0, 1.0, 3.0]);
        assert!(serde_json::from_str::<Calibration>("[1.0, 0.0]").is_err());
    }
}
