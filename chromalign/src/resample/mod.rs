//! Per-channel affine resampling of multi-channel datasets.
//!
//! Output voxel `x` takes the source value at `M⁻¹ x`, so content moves by
//! `M`. Sampling is N-linear with zero outside the source; positions that
//! land on the lattice copy the source sample exactly.

use glam::DVec3;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use common::parallel::fill_rows;

use crate::calibration::Calibration;
use crate::channel_set::ChannelSet;
use crate::error::{AlignError, Component, Result};
use crate::transform::AffineTransform;
use crate::volume::{Sample, Volume};


/// Source coordinates closer than this to an integer are sampled on the lattice.
pub const LATTICE_SNAP: f64 = common::EPSILON;

/// Which channels to transform and with what.
///
/// Entries past the dataset's channel count are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub per_channel_apply: Vec<bool>,
    pub per_channel_transform: Vec<Option<AffineTransform>>,
    /// Interpret transforms in physical units and conjugate them by the calibration.
    pub use_calibration: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            per_channel_apply: Vec::new(),
            per_channel_transform: Vec::new(),
            use_calibration: true,
        }
    }
}

/// What happens to one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelDecision {
    PassThrough,
    Apply(AffineTransform),
}

impl ResampleConfig {
    /// Enables channel `index` with `transform`.
    pub fn with_channel(mut self, index: usize, transform: AffineTransform) -> Self {
        if self.per_channel_apply.len() <= index {
            self.per_channel_apply.resize(index + 1, false);
        }
        if self.per_channel_transform.len() <= index {
            self.per_channel_transform.resize(index + 1, None);
        }
        self.per_channel_apply[index] = true;
        self.per_channel_transform[index] = Some(transform);
        self
    }

    pub fn with_use_calibration(mut self, use_calibration: bool) -> Self {
        self.use_calibration = use_calibration;
        self
    }

    /// Resolves the configuration against a dataset with `channel_count` channels.
    pub fn decisions(&self, channel_count: usize) -> Result<Vec<ChannelDecision>> {
        for index in channel_count..self.per_channel_apply.len() {
            if self.per_channel_apply[index] {
                info!(
                    "Channel index {} is configured but the dataset has {} channels, skipping",
                    index, channel_count
                );
            }
        }

        (0..channel_count)
            .map(|index| {
                if !self.per_channel_apply.get(index).copied().unwrap_or(false) {
                    return Ok(ChannelDecision::PassThrough);
                }
                self.per_channel_transform
                    .get(index)
                    .copied()
                    .flatten()
                    .map(ChannelDecision::Apply)
                    .ok_or(AlignError::MissingTransform {
                        component: Component::ChannelResampler,
                        channel: index,
                    })
            })
            .collect()
    }
}

/// Transform in sample-index space for a dataset with `calibration`.
pub fn effective_transform(
    transform: &AffineTransform,
    calibration: &Calibration,
    use_calibration: bool,
) -> Result<AffineTransform> {
    if transform.dims() != calibration.dims() {
        return Err(AlignError::ShapeMismatch {
            component: Component::ChannelResampler,
            detail: format!(
                "{}-D transform for {}-D data",
                transform.dims().count(),
                calibration.dims().count()
            ),
        });
    }
    if use_calibration {
        transform
            .calibrate(calibration)
            .map_err(|e| e.in_component(Component::ChannelResampler))
    } else {
        Ok(*transform)
    }
}

/// Applies the configured transforms and reassembles the channels in order,
/// keeping calibration, axes and display metadata.
pub fn resample<T: Sample>(set: &ChannelSet<T>, config: &ResampleConfig) -> Result<ChannelSet<T>> {
    let decisions = config
        .decisions(set.channel_count())?
        .into_iter()
        .enumerate()
        .map(|(index, decision)| match decision {
            ChannelDecision::PassThrough => Ok(ChannelDecision::PassThrough),
            ChannelDecision::Apply(t) => {
                let effective = effective_transform(&t, set.calibration(), config.use_calibration)?;
                info!(
                    "Applying effective transform to channel index {}: {}",
                    index, effective
                );
                Ok(ChannelDecision::Apply(effective))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let channels = decisions
        .par_iter()
        .zip(set.channels().par_iter())
        .map(|(decision, channel)| match decision {
            ChannelDecision::PassThrough => Ok(channel.clone()),
            ChannelDecision::Apply(m) => warp_volume(channel, m),
        })
        .collect::<Result<Vec<_>>>()?;

    set.replace_channels(channels)
}

/// Resamples one channel of `set` with `transform`.
pub fn resample_channel<T: Sample>(
    set: &ChannelSet<T>,
    index: usize,
    transform: &AffineTransform,
    use_calibration: bool,
) -> Result<Volume<T>> {
    let channel = set
        .channel(index)
        .ok_or(AlignError::ChannelIndexOutOfRange {
            component: Component::ChannelResampler,
            index,
            channel_count: set.channel_count(),
        })?;
    let effective = effective_transform(transform, set.calibration(), use_calibration)?;
    info!(
        "Applying effective transform to channel index {}: {}",
        index, effective
    );
    warp_volume(channel, &effective)
}

/// Moves the content of `source` by `transform` (sample-index space).
pub fn warp_volume<T: Sample>(source: &Volume<T>, transform: &AffineTransform) -> Result<Volume<T>> {
    let shape = source.shape();
    if transform.dims() != shape.dims() {
        return Err(AlignError::ShapeMismatch {
            component: Component::ChannelResampler,
            detail: format!(
                "{}-D transform for {} volume",
                transform.dims().count(),
                shape
            ),
        });
    }
    let inverse = transform
        .invert()
        .map_err(|e| e.in_component(Component::ChannelResampler))?;
    debug!("Warping {} volume with inverse {}", shape, inverse);

    let mut samples = vec![T::zero(); shape.len()];
    fill_rows(&mut samples, shape.width(), |row, x| {
        let src = inverse.apply_point(shape.row_point(row, x));
        T::from_f64(sample_linear(source, src))
    });
    Volume::new(shape, samples)
}

/// Integer base and fractional part of a coordinate, snapping to the
/// nearest integer within [`LATTICE_SNAP`].
#[inline]
pub fn split_coordinate(c: f64) -> (i64, f64) {
    let nearest = c.round();
    if (c - nearest).abs() < LATTICE_SNAP {
        (nearest as i64, 0.0)
    } else {
        let base = c.floor();
        (base as i64, c - base)
    }
}

/// N-linear interpolation with zero extension. Planar volumes ignore `z`.
pub fn sample_linear<T: Sample>(source: &Volume<T>, p: DVec3) -> f64 {
    if !p.is_finite() {
        return 0.0;
    }
    let dims = source.shape().dims().count();
    let mut base = [0i64; 3];
    let mut frac = [0.0f64; 3];
    for axis in 0..dims {
        (base[axis], frac[axis]) = split_coordinate(p[axis]);
    }

    let mut value = 0.0;
    for corner in 0..(1usize << dims) {
        let mut weight = 1.0;
        let mut index = base;
        for axis in 0..dims {
            if corner >> axis & 1 == 1 {
                weight *= frac[axis];
                index[axis] += 1;
            } else {
                weight *= 1.0 - frac[axis];
            }
        }
        if weight == 0.0 {
            continue;
        }
        if let Some(v) = source.get_signed(index) {
            value += weight * v.as_f64();
        }
    }
    value
}
