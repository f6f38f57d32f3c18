//! Dense displacement fields of affine transforms.

use log::debug;

use crate::error::{AlignError, Component, Result};
use crate::field::DisplacementField;
use crate::grid::GridShape;
use crate::transform::AffineTransform;

/// Evaluates `T(p) - p` at every integer point of a grid with the given extent.
pub fn evaluate(transform: &AffineTransform, extent: &[usize]) -> Result<DisplacementField> {
    let shape =
        GridShape::new(extent).map_err(|e| e.in_component(Component::DisplacementField))?;
    evaluate_on(transform, shape)
}

pub fn evaluate_on(transform: &AffineTransform, shape: GridShape) -> Result<DisplacementField> {
    if transform.dims() != shape.dims() {
        return Err(AlignError::DimensionMismatch {
            component: Component::DisplacementField,
            expected: shape.dims().count(),
            actual: transform.dims().count(),
        });
    }
    debug!("Evaluating displacement of {} over {}", transform, shape);

    DisplacementField::rasterize(shape, |p| transform.apply_point(p) - p)
}
