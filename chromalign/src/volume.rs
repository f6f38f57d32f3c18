//! Dense single-channel sample volumes.

use std::fmt::Debug;

use num_traits::Zero;

use crate::error::{AlignError, Component, Result};
use crate::grid::GridShape;

/// Pixel sample type. Conversions round and saturate for integer types.
pub trait Sample: Copy + Default + PartialEq + Debug + Zero + Send + Sync + 'static {
    /// Bits per sample, used for detector defaults.
    const BIT_DEPTH: u32;

    fn as_f64(self) -> f64;

    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_integer_sample {
    ($($t:ty),*) => {$(
        impl Sample for $t {
            const BIT_DEPTH: u32 = <$t>::BITS;

            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value.round() as $t
            }
        }
    )*};
}

macro_rules! impl_float_sample {
    ($($t:ty => $bits:expr),*) => {$(
        impl Sample for $t {
            const BIT_DEPTH: u32 = $bits;

            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    )*};
}

impl_integer_sample!(u8, u16, u32, i8, i16, i32);
impl_float_sample!(f32 => 32, f64 => 64);

/// One channel: a grid shape plus its samples in x-fastest order.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    shape: GridShape,
    samples: Vec<T>,
}

impl<T: Sample> Volume<T> {
    pub fn new(shape: GridShape, samples: Vec<T>) -> Result<Self> {
        if samples.len() != shape.len() {
            return Err(AlignError::ShapeMismatch {
                component: Component::ChannelSet,
                detail: format!(
                    "{} samples do not fill a {} grid ({} cells)",
                    samples.len(),
                    shape,
                    shape.len()
                ),
            });
        }
        Ok(Self { shape, samples })
    }

    pub fn filled(shape: GridShape, value: T) -> Self {
        Self {
            shape,
            samples: vec![value; shape.len()],
        }
    }

    /// Builds a volume by evaluating `f(x, y, z)` for every cell.
    pub fn from_fn(shape: GridShape, mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let mut samples = Vec::with_capacity(shape.len());
        for z in 0..shape.depth() {
            for y in 0..shape.height() {
                for x in 0..shape.width() {
                    samples.push(f(x, y, z));
                }
            }
        }
        Self { shape, samples }
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    #[inline]
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<T> {
        self.samples
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> T {
        self.samples[self.shape.index(x, y, z)]
    }

    /// Sample at signed lattice coordinates, `None` outside the grid.
    #[inline]
    pub fn get_signed(&self, p: [i64; 3]) -> Option<T> {
        self.shape.checked_index(p).map(|i| self.samples[i])
    }
}
