//! Affine transform algebra over 2-D and 3-D coordinates.
//!
//! Matrices are exchanged in row-packed order: for each output axis the
//! linear coefficients followed by the translation, i.e.
//! ```text
//! | m00 m01 m02 t0 |
//! | m10 m11 m12 t1 |   ->  [m00, m01, m02, t0, m10, ..., t2]
//! | m20 m21 m22 t2 |
//! ```
//! Composition follows the matrix product: `outer.compose(&inner)` applies
//! `inner` first.

use glam::{DAffine2, DAffine3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::error::{AlignError, Component, Result};
use crate::grid::Dimensionality;

pub mod io;
pub mod model;


pub use model::{FittedModel, ModelKind, TransformKind};

/// Linear parts with a smaller absolute determinant are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// An invertible affine map over two or three dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AffineTransform {
    D2(DAffine2),
    D3(DAffine3),
}

impl AffineTransform {
    pub fn identity(dims: Dimensionality) -> Self {
        match dims {
            Dimensionality::Two => AffineTransform::D2(DAffine2::IDENTITY),
            Dimensionality::Three => AffineTransform::D3(DAffine3::IDENTITY),
        }
    }

    pub fn translation_2d(t: DVec2) -> Self {
        AffineTransform::D2(DAffine2::from_translation(t))
    }

    pub fn translation_3d(t: DVec3) -> Self {
        AffineTransform::D3(DAffine3::from_translation(t))
    }

    /// Builds a transform from `N * (N + 1)` row-packed values (6 or 12).
    pub fn from_row_packed(m: &[f64]) -> Result<Self> {
        match m.len() {
            6 => Ok(AffineTransform::D2(DAffine2::from_cols(
                DVec2::new(m[0], m[3]),
                DVec2::new(m[1], m[4]),
                DVec2::new(m[2], m[5]),
            ))),
            12 => Ok(AffineTransform::D3(DAffine3::from_cols(
                DVec3::new(m[0], m[4], m[8]),
                DVec3::new(m[1], m[5], m[9]),
                DVec3::new(m[2], m[6], m[10]),
                DVec3::new(m[3], m[7], m[11]),
            ))),
            len => Err(match row_packed_dims(len) {
                Some(dims) => AlignError::UnsupportedDimensionality {
                    component: Component::TransformAlgebra,
                    dims,
                },
                None => AlignError::ShapeMismatch {
                    component: Component::TransformAlgebra,
                    detail: format!(
                        "{len} row-packed values do not form an N x (N+1) matrix"
                    ),
                },
            }),
        }
    }

    pub fn to_row_packed(&self) -> Vec<f64> {
        match self {
            AffineTransform::D2(a) => {
                let (m, t) = (a.matrix2, a.translation);
                vec![m.x_axis.x, m.y_axis.x, t.x, m.x_axis.y, m.y_axis.y, t.y]
            }
            AffineTransform::D3(a) => {
                let (m, t) = (a.matrix3, a.translation);
                vec![
                    m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x, //
                    m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y, //
                    m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z,
                ]
            }
        }
    }

    #[inline]
    pub fn dims(&self) -> Dimensionality {
        match self {
            AffineTransform::D2(_) => Dimensionality::Two,
            AffineTransform::D3(_) => Dimensionality::Three,
        }
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        match self {
            AffineTransform::D2(a) => a.matrix2.determinant(),
            AffineTransform::D3(a) => a.matrix3.determinant(),
        }
    }

    /// Maps a point given as one coordinate per axis.
    pub fn apply(&self, point: &[f64]) -> Result<Vec<f64>> {
        let dims = self.dims().count();
        if point.len() != dims {
            return Err(AlignError::DimensionMismatch {
                component: Component::TransformAlgebra,
                expected: dims,
                actual: point.len(),
            });
        }
        let mapped = match self {
            AffineTransform::D2(a) => a.transform_point2(DVec2::new(point[0], point[1])).to_array().to_vec(),
            AffineTransform::D3(a) => a
                .transform_point3(DVec3::new(point[0], point[1], point[2]))
                .to_array()
                .to_vec(),
        };
        Ok(mapped)
    }

    /// Maps a lattice position. Planar transforms act on `x, y` and leave `z` untouched.
    #[inline]
    pub fn apply_point(&self, p: DVec3) -> DVec3 {
        match self {
            AffineTransform::D2(a) => a.transform_point2(p.truncate()).extend(p.z),
            AffineTransform::D3(a) => a.transform_point3(p),
        }
    }

    pub fn invert(&self) -> Result<Self> {
        let determinant = self.determinant();
        if !determinant.is_finite() || determinant.abs() < SINGULAR_EPSILON {
            return Err(AlignError::SingularTransform {
                component: Component::TransformAlgebra,
                determinant,
            });
        }
        Ok(match self {
            AffineTransform::D2(a) => AffineTransform::D2(a.inverse()),
            AffineTransform::D3(a) => AffineTransform::D3(a.inverse()),
        })
    }

    /// Transform equivalent to applying `inner` first, then `self`.
    pub fn compose(&self, inner: &Self) -> Result<Self> {
        match (self, inner) {
            (AffineTransform::D2(outer), AffineTransform::D2(inner)) => {
                Ok(AffineTransform::D2(*outer * *inner))
            }
            (AffineTransform::D3(outer), AffineTransform::D3(inner)) => {
                Ok(AffineTransform::D3(*outer * *inner))
            }
            _ => Err(AlignError::DimensionMismatch {
                component: Component::TransformAlgebra,
                expected: self.dims().count(),
                actual: inner.dims().count(),
            }),
        }
    }

    /// Re-expresses a transform measured in physical units in sample-index
    /// space: `S⁻¹ · T · S` with `S = diag(calibration)`.
    ///
    /// Evaluated coefficient-wise (`m'ij = mij * sj / si`, `t'i = ti / si`)
    /// so unit scales leave the matrix bit-identical.
    pub fn calibrate(&self, calibration: &Calibration) -> Result<Self> {
        let n = self.dims().count();
        if calibration.dims() != self.dims() {
            return Err(AlignError::DimensionMismatch {
                component: Component::TransformAlgebra,
                expected: n,
                actual: calibration.dims().count(),
            });
        }
        let s = calibration.scale();
        let mut m = self.to_row_packed();
        for (i, row) in m.chunks_mut(n + 1).enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = if j < n {
                    *value * s[j] / s[i]
                } else {
                    *value / s[i]
                };
            }
        }
        Self::from_row_packed(&m)
    }
}

/// Largest `N` with `N * (N + 1) <= len`.
/// `N` when `len == N * (N + 1)`.
fn row_packed_dims(len: usize) -> Option<usize> {
    (0..)
        .take_while(|n| n * (n + 1) <= len)
        .find(|n| n * (n + 1) == len)
}

impl std::fmt::Display for AffineTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.dims().count();
        write!(f, "AffineTransform{}D[", n)?;
        for (i, row) in self.to_row_packed().chunks(n + 1).enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            let cells: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
            write!(f, "{}", cells.join(", "))?;
        }
        write!(f, "]")
    }
}
