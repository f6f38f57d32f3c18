//! Spatial dimensionality and dense grid shapes.
//!
//! Grids are stored x-fastest: the flat index of `(x, y, z)` is
//! `x + width * (y + height * z)`. A 2-D grid is a 3-D grid with depth 1.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Component, Result};

/// Number of spatial axes. Only planar and volumetric data are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimensionality {
    Two,
    Three,
}

impl Dimensionality {
    pub fn from_count(count: usize) -> Result<Self> {
        match count {
            2 => Ok(Dimensionality::Two),
            3 => Ok(Dimensionality::Three),
            dims => Err(AlignError::UnsupportedDimensionality {
                component: Component::TransformAlgebra,
                dims,
            }),
        }
    }

    #[inline]
    pub fn count(self) -> usize {
        match self {
            Dimensionality::Two => 2,
            Dimensionality::Three => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    dims: Dimensionality,
    extent: [usize; 3],
}

impl GridShape {
    pub fn new_2d(width: usize, height: usize) -> Self {
        Self {
            dims: Dimensionality::Two,
            extent: [width, height, 1],
        }
    }

    pub fn new_3d(width: usize, height: usize, depth: usize) -> Self {
        Self {
            dims: Dimensionality::Three,
            extent: [width, height, depth],
        }
    }

    /// Builds a shape from a per-axis extent list of length 2 or 3.
    pub fn new(extent: &[usize]) -> Result<Self> {
        match *extent {
            [width, height] => Ok(Self::new_2d(width, height)),
            [width, height, depth] => Ok(Self::new_3d(width, height, depth)),
            _ => Err(AlignError::UnsupportedDimensionality {
                component: Component::ChannelSet,
                dims: extent.len(),
            }),
        }
    }

    #[inline]
    pub fn dims(&self) -> Dimensionality {
        self.dims
    }

    /// Extent of the spatial axes only (length 2 or 3).
    pub fn extent(&self) -> &[usize] {
        &self.extent[..self.dims.count()]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.extent[0]
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.extent[1]
    }

    /// Number of z-planes; 1 for planar grids.
    #[inline]
    pub fn depth(&self) -> usize {
        self.extent[2]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.extent.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn plane_len(&self) -> usize {
        self.width() * self.height()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.width() && y < self.height() && z < self.depth());
        x + self.width() * (y + self.height() * z)
    }

    /// Flat index for signed coordinates, `None` outside the grid.
    #[inline]
    pub fn checked_index(&self, p: [i64; 3]) -> Option<usize> {
        let in_bounds = p
            .iter()
            .zip(self.extent.iter())
            .all(|(&c, &e)| c >= 0 && (c as u64) < e as u64);
        in_bounds.then(|| self.index(p[0] as usize, p[1] as usize, p[2] as usize))
    }

    /// Lattice position of cell `x` in global row `row` (rows run over y, then z).
    #[inline]
    pub fn row_point(&self, row: usize, x: usize) -> DVec3 {
        let y = row % self.height();
        let z = row / self.height();
        DVec3::new(x as f64, y as f64, z as f64)
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.dims {
            Dimensionality::Two => write!(f, "{}x{}", self.width(), self.height()),
            Dimensionality::Three => {
                write!(f, "{}x{}x{}", self.width(), self.height(), self.depth())
            }
        }
    }
}
