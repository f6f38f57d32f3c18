//! Transform kinds requested from the matcher and the models it fits.

use glam::{DAffine2, DAffine3, DMat2, DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use super::AffineTransform;
use crate::error::{AlignError, Component, Result};
use crate::grid::Dimensionality;

/// Model families offered to the user, by their display name.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum TransformKind {
    #[serde(rename = "2d-translation")]
    #[strum(serialize = "2d-translation")]
    Translation2D,
    #[serde(rename = "2d-rigid")]
    #[strum(serialize = "2d-rigid")]
    Rigid2D,
    #[serde(rename = "2d-affine")]
    #[strum(serialize = "2d-affine")]
    Affine2D,
    #[serde(rename = "2d-affine + 3d-translation")]
    #[strum(serialize = "2d-affine + 3d-translation")]
    Affine2DTranslation3D,
    #[serde(rename = "3d-translation")]
    #[strum(serialize = "3d-translation")]
    Translation3D,
    #[serde(rename = "3d-rigid")]
    #[strum(serialize = "3d-rigid")]
    Rigid3D,
    #[default]
    #[serde(rename = "3d-similarity")]
    #[strum(serialize = "3d-similarity")]
    Similarity3D,
    #[serde(rename = "3d-affine")]
    #[strum(serialize = "3d-affine")]
    Affine3D,
}

impl TransformKind {
    /// Parses a display name; unknown names are an unsupported kind.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse().map_err(|_| AlignError::UnsupportedTransformKind {
            component: Component::Alignment,
            kind: name.to_string(),
        })
    }

    /// The model family to fit. Only volumetric kinds can be fitted.
    pub fn model_kind(self) -> Result<ModelKind> {
        match self {
            TransformKind::Translation3D => Ok(ModelKind::Translation),
            TransformKind::Rigid3D => Ok(ModelKind::Rigid),
            TransformKind::Similarity3D => Ok(ModelKind::Similarity),
            TransformKind::Affine3D => Ok(ModelKind::Affine),
            TransformKind::Translation2D
            | TransformKind::Rigid2D
            | TransformKind::Affine2D
            | TransformKind::Affine2DTranslation3D => Err(AlignError::UnsupportedTransformKind {
                component: Component::Alignment,
                kind: self.to_string(),
            }),
        }
    }

    pub fn dims(self) -> Dimensionality {
        match self {
            TransformKind::Translation2D | TransformKind::Rigid2D | TransformKind::Affine2D => {
                Dimensionality::Two
            }
            _ => Dimensionality::Three,
        }
    }
}

/// Degrees of freedom of a fitted model, independent of dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ModelKind {
    Translation,
    Rigid,
    Similarity,
    Affine,
}

/// A model produced by the correspondence matcher.
///
/// Every variant converts to an [`AffineTransform`] through [`FittedModel::to_affine`].
/// The model maps the matched channel onto the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FittedModel {
    Translation2D(DVec2),
    Rigid2D {
        angle: f64,
        translation: DVec2,
    },
    Similarity2D {
        scale: f64,
        angle: f64,
        translation: DVec2,
    },
    Affine2D(DAffine2),
    Translation3D(DVec3),
    Rigid3D(DAffine3),
    Similarity3D(DAffine3),
    Affine3D(DAffine3),
}

impl FittedModel {
    /// Planar model from a column-major array `[m00 m10 m01 m11 m02 m12]`.
    ///
    /// Rigid and similarity parameters are recovered from the first column.
    pub fn from_column_major_2d(kind: ModelKind, m: &[f64; 6]) -> Self {
        let translation = DVec2::new(m[4], m[5]);
        match kind {
            ModelKind::Translation => FittedModel::Translation2D(translation),
            ModelKind::Rigid => FittedModel::Rigid2D {
                angle: m[1].atan2(m[0]),
                translation,
            },
            ModelKind::Similarity => FittedModel::Similarity2D {
                scale: m[0].hypot(m[1]),
                angle: m[1].atan2(m[0]),
                translation,
            },
            ModelKind::Affine => FittedModel::Affine2D(DAffine2::from_cols(
                DVec2::new(m[0], m[1]),
                DVec2::new(m[2], m[3]),
                translation,
            )),
        }
    }

    /// Volumetric model from a column-major array
    /// `[m00 m10 m20 m01 m11 m21 m02 m12 m22 t0 t1 t2]`.
    pub fn from_column_major_3d(kind: ModelKind, m: &[f64; 12]) -> Self {
        let translation = DVec3::new(m[9], m[10], m[11]);
        let affine = DAffine3::from_mat3_translation(DMat3::from_cols_slice(&m[..9]), translation);
        match kind {
            ModelKind::Translation => FittedModel::Translation3D(translation),
            ModelKind::Rigid => FittedModel::Rigid3D(affine),
            ModelKind::Similarity => FittedModel::Similarity3D(affine),
            ModelKind::Affine => FittedModel::Affine3D(affine),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Translation2D(_) | FittedModel::Translation3D(_) => ModelKind::Translation,
            FittedModel::Rigid2D { .. } | FittedModel::Rigid3D(_) => ModelKind::Rigid,
            FittedModel::Similarity2D { .. } | FittedModel::Similarity3D(_) => {
                ModelKind::Similarity
            }
            FittedModel::Affine2D(_) | FittedModel::Affine3D(_) => ModelKind::Affine,
        }
    }

    pub fn dims(&self) -> Dimensionality {
        match self {
            FittedModel::Translation2D(_)
            | FittedModel::Rigid2D { .. }
            | FittedModel::Similarity2D { .. }
            | FittedModel::Affine2D(_) => Dimensionality::Two,
            FittedModel::Translation3D(_)
            | FittedModel::Rigid3D(_)
            | FittedModel::Similarity3D(_)
            | FittedModel::Affine3D(_) => Dimensionality::Three,
        }
    }

    pub fn to_affine(&self) -> AffineTransform {
        match *self {
            FittedModel::Translation2D(t) => AffineTransform::translation_2d(t),
            FittedModel::Rigid2D { angle, translation } => AffineTransform::D2(
                DAffine2::from_mat2_translation(DMat2::from_angle(angle), translation),
            ),
            FittedModel::Similarity2D {
                scale,
                angle,
                translation,
            } => AffineTransform::D2(DAffine2::from_mat2_translation(
                DMat2::from_angle(angle) * scale,
                translation,
            )),
            FittedModel::Affine2D(a) => AffineTransform::D2(a),
            FittedModel::Translation3D(t) => AffineTransform::translation_3d(t),
            FittedModel::Rigid3D(a) | FittedModel::Similarity3D(a) | FittedModel::Affine3D(a) => {
                AffineTransform::D3(a)
            }
        }
    }
}

impl From<FittedModel> for AffineTransform {
    fn from(model: FittedModel) -> Self {
        model.to_affine()
    }
}
