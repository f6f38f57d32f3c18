//! Registration residual diagnostics.
//!
//! Sparse residuals (observed minus predicted correspondence offsets) are
//! rasterized into a dense volume by nearest-neighbor lookup: every grid
//! cell takes the residual of the closest sample in physical space.

use glam::DVec3;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::error::{AlignError, Component, Result};
use crate::field::{ResidualVolume, VectorField};
use crate::grid::{Dimensionality, GridShape};
use crate::spatial::KdTree;
use crate::transform::AffineTransform;


/// Matched locations (physical units) of one spot in the reference and another channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointCorrespondence {
    pub reference: DVec3,
    pub other: DVec3,
    /// Matcher verdict; `Some(false)` marks an outlier.
    pub inlier: Option<bool>,
}

impl PointCorrespondence {
    pub fn new(reference: DVec3, other: DVec3) -> Self {
        Self {
            reference,
            other,
            inlier: None,
        }
    }

    pub fn with_inlier(mut self, inlier: bool) -> Self {
        self.inlier = Some(inlier);
        self
    }

    #[inline]
    pub fn is_outlier(&self) -> bool {
        self.inlier == Some(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualSample {
    /// Physical location of the sample.
    pub location: DVec3,
    /// Observed minus predicted position; `z` is zero for planar data.
    pub residual: DVec3,
}

/// Transform the residuals are measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResidualSource {
    /// Model mapping reference locations onto the other channel.
    ForwardModel(AffineTransform),
    /// Correction mapping the other channel back onto the reference, such as
    /// a matcher's `FittedModel` or an `Alignment` transform.
    CorrectionTransform(AffineTransform),
}

/// Residuals of inlier correspondences, located at the other-channel position.
///
/// `ForwardModel`: `other - model(reference)`.
/// `CorrectionTransform`: `reference - T(other)`.
pub fn residual_samples(
    correspondences: &[PointCorrespondence],
    source: &ResidualSource,
) -> Vec<ResidualSample> {
    correspondences
        .iter()
        .filter(|c| !c.is_outlier())
        .map(|c| {
            let residual = match source {
                ResidualSource::ForwardModel(model) => c.other - model.apply_point(c.reference),
                ResidualSource::CorrectionTransform(t) => c.reference - t.apply_point(c.other),
            };
            ResidualSample {
                location: c.other,
                residual,
            }
        })
        .collect()
}

/// One nearest-neighbor tree per axis, each carrying that axis's residual.
#[derive(Debug)]
pub struct ResidualIndex {
    trees: Vec<KdTree<f64>>,
}

impl ResidualIndex {
    pub fn build(samples: &[ResidualSample], dims: Dimensionality) -> Result<Self> {
        if samples.is_empty() {
            return Err(AlignError::InsufficientSamples {
                component: Component::ResidualField,
                required: 1,
                actual: 0,
            });
        }
        let axes = dims.count();
        if let Some((index, sample)) = samples.iter().enumerate().find(|(_, s)| {
            !(0..axes).all(|axis| s.location[axis].is_finite() && s.residual[axis].is_finite())
        }) {
            return Err(AlignError::ShapeMismatch {
                component: Component::ResidualField,
                detail: format!(
                    "sample {index} is not finite (location {}, residual {})",
                    sample.location, sample.residual
                ),
            });
        }
        let locations: Vec<DVec3> = samples.iter().map(|s| s.location).collect();
        let trees = (0..axes)
            .into_par_iter()
            .map(|axis| {
                let values = samples.iter().map(|s| s.residual[axis]).collect();
                KdTree::build(&locations, values, dims)
            })
            .collect::<Option<Vec<_>>>()
            .ok_or(AlignError::InsufficientSamples {
                component: Component::ResidualField,
                required: 1,
                actual: samples.len(),
            })?;
        debug!(
            "Built {} residual indices over {} samples",
            trees.len(),
            samples.len()
        );
        Ok(Self { trees })
    }

    /// Residual of the nearest sample, per axis.
    pub fn query(&self, physical: DVec3) -> DVec3 {
        let mut v = DVec3::ZERO;
        for (axis, tree) in self.trees.iter().enumerate() {
            if let Some(value) = tree.nearest_value(physical) {
                v[axis] = *value;
            }
        }
        v
    }
}

/// Rasterizes residual samples onto `shape`; sample locations are physical,
/// grid cells are scaled by `calibration` before lookup.
pub fn interpolate(
    samples: &[ResidualSample],
    shape: GridShape,
    calibration: &Calibration,
) -> Result<ResidualVolume> {
    if calibration.dims() != shape.dims() {
        return Err(AlignError::DimensionMismatch {
            component: Component::ResidualField,
            expected: shape.dims().count(),
            actual: calibration.dims().count(),
        });
    }
    let index = ResidualIndex::build(samples, shape.dims())?;
    info!(
        "Interpolating {} residual samples over {}",
        samples.len(),
        shape
    );
    VectorField::rasterize(shape, |p| index.query(calibration.to_physical(p)))
}

/// Summary of residual magnitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualStats {
    pub count: usize,
    pub mean: f64,
    pub rms: f64,
    pub median: f64,
    pub max: f64,
}

impl ResidualStats {
    /// `None` for an empty sample set.
    pub fn compute(samples: &[ResidualSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut magnitudes: Vec<f64> = samples.iter().map(|s| s.residual.length()).collect();
        let n = magnitudes.len() as f64;

        let mean = magnitudes.iter().sum::<f64>() / n;
        let rms = (magnitudes.iter().map(|r| r * r).sum::<f64>() / n).sqrt();

        magnitudes.sort_by(f64::total_cmp);
        let mid = magnitudes.len() / 2;
        let median = if magnitudes.len() % 2 == 0 {
            (magnitudes[mid - 1] + magnitudes[mid]) / 2.0
        } else {
            magnitudes[mid]
        };

        Some(Self {
            count: magnitudes.len(),
            mean,
            rms,
            median,
            max: magnitudes[magnitudes.len() - 1],
        })
    }
}
