//! Dense per-axis vector fields over a grid.

use common::parallel::ParZipMut;
use glam::DVec3;
use rayon::prelude::*;

use crate::error::Result;
use crate::grid::{Dimensionality, GridShape};
use crate::volume::Volume;

/// One scalar volume per spatial axis, co-registered with `shape`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    shape: GridShape,
    components: Vec<Volume<f64>>,
}

/// `T(p) - p` sampled on a grid.
pub type DisplacementField = VectorField;

/// Nearest-neighbor rasterized registration residuals.
pub type ResidualVolume = VectorField;

impl VectorField {
    /// Assembles a field from per-axis sample buffers in axis order.
    pub(crate) fn from_components(shape: GridShape, components: Vec<Vec<f64>>) -> Result<Self> {
        debug_assert_eq!(components.len(), shape.dims().count());
        let components = components
            .into_iter()
            .map(|samples| Volume::new(shape, samples))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { shape, components })
    }

    /// Evaluates `f` at every lattice point of `shape` in parallel, one row
    /// chunk per task, splitting the result into per-axis volumes.
    pub(crate) fn rasterize<F>(shape: GridShape, f: F) -> Result<Self>
    where
        F: Fn(DVec3) -> DVec3 + Sync + Send,
    {
        let len = shape.len();
        if len == 0 {
            return Self::from_components(shape, vec![Vec::new(); shape.dims().count()]);
        }
        let row_len = shape.width();
        let mut dx = vec![0.0; len];
        let mut dy = vec![0.0; len];

        let components = match shape.dims() {
            Dimensionality::Two => {
                dx.as_mut_slice()
                    .par_zip(dy.as_mut_slice())
                    .par_rows_mut_auto(row_len)
                    .for_each(|(first_row, (cx, cy))| {
                        for (local, (rx, ry)) in cx
                            .chunks_mut(row_len)
                            .zip(cy.chunks_mut(row_len))
                            .enumerate()
                        {
                            for x in 0..row_len {
                                let v = f(shape.row_point(first_row + local, x));
                                rx[x] = v.x;
                                ry[x] = v.y;
                            }
                        }
                    });
                vec![dx, dy]
            }
            Dimensionality::Three => {
                let mut dz = vec![0.0; len];
                dx.as_mut_slice()
                    .par_zip(dy.as_mut_slice())
                    .par_zip(dz.as_mut_slice())
                    .par_rows_mut_auto(row_len)
                    .for_each(|(first_row, (cx, cy, cz))| {
                        for (local, ((rx, ry), rz)) in cx
                            .chunks_mut(row_len)
                            .zip(cy.chunks_mut(row_len))
                            .zip(cz.chunks_mut(row_len))
                            .enumerate()
                        {
                            for x in 0..row_len {
                                let v = f(shape.row_point(first_row + local, x));
                                rx[x] = v.x;
                                ry[x] = v.y;
                                rz[x] = v.z;
                            }
                        }
                    });
                vec![dx, dy, dz]
            }
        };

        Self::from_components(shape, components)
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Component along `axis` (0 = x).
    pub fn axis(&self, axis: usize) -> Option<&Volume<f64>> {
        self.components.get(axis)
    }

    pub fn components(&self) -> &[Volume<f64>] {
        &self.components
    }

    pub fn dx(&self) -> &Volume<f64> {
        &self.components[0]
    }

    pub fn dy(&self) -> &Volume<f64> {
        &self.components[1]
    }

    /// `None` for planar fields.
    pub fn dz(&self) -> Option<&Volume<f64>> {
        self.components.get(2)
    }

    /// Vector at one cell; `z` is zero for planar fields.
    pub fn at(&self, x: usize, y: usize, z: usize) -> DVec3 {
        let i = self.shape.index(x, y, z);
        let mut v = DVec3::ZERO;
        for (axis, component) in self.components.iter().enumerate() {
            v[axis] = component.samples()[i];
        }
        v
    }

    /// Largest absolute component value, for a display range centered on zero.
    pub fn symmetric_range(&self) -> f64 {
        self.components
            .iter()
            .flat_map(|c| c.samples().iter())
            .fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }

    /// Euclidean length of the vector at every cell.
    pub fn magnitude(&self) -> Volume<f64> {
        Volume::from_fn(self.shape, |x, y, z| self.at(x, y, z).length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> VectorField {
        let shape = GridShape::new_2d(2, 1);
        VectorField::from_components(shape, vec![vec![3.0, -1.0], vec![4.0, 0.5]]).unwrap()
    }

    #[test]
    fn accessors_follow_axis_order() {
        let f = field();
        assert_eq!(f.dx().samples(), &[3.0, -1.0]);
        assert_eq!(f.dy().samples(), &[4.0, 0.5]);
        assert!(f.dz().is_none());
        assert_eq!(f.at(1, 0, 0), DVec3::new(-1.0, 0.5, 0.0));
    }

    #[test]
    fn rasterize_visits_every_cell_once() {
        let shape = GridShape::new_3d(5, 4, 3);
        let f = VectorField::rasterize(shape, |p| p * 2.0).unwrap();
        for z in 0..3 {
            for y in 0..4 {
                for x in 0..5 {
                    assert_eq!(
                        f.at(x, y, z),
                        DVec3::new(x as f64, y as f64, z as f64) * 2.0
                    );
                }
            }
        }
    }

    #[test]
    fn display_helpers() {
        let f = field();
        assert_eq!(f.symmetric_range(), 4.0);
        assert_eq!(f.magnitude().samples()[0], 5.0);
    }
}
