//! Channel alignment from detected spots.
//!
//! Detected point sets are converted into matcher peaks, the external
//! correspondence matcher fits one model per non-reference channel, and the
//! models become [`AffineTransform`]s that map each channel onto the
//! reference (physical units). Those transforms feed the resampler directly.

use std::io;
use std::path::{Path, PathBuf};

use glam::DVec3;
use log::{error, info, warn};

use crate::calibration::Calibration;
use crate::channel_set::ChannelSet;
use crate::config::{DetectorParams, MatchingParams};
use crate::error::{AlignError, Component, Result};
use crate::grid::Dimensionality;
use crate::resample::ResampleConfig;
use crate::residual::{residual_samples, PointCorrespondence, ResidualSample, ResidualSource};
use crate::transform::io::{self as transform_io, TRANSFORM_SUFFIX};
use crate::transform::{AffineTransform, FittedModel, ModelKind, TransformKind};
use crate::volume::{Sample, Volume};

mod session;

#[cfg(test)]
mod tests;

pub use session::DetectionSession;

/// A detected spot split into its lattice cell and sub-sample offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Integer part of each coordinate, truncated toward zero.
    pub position: [i64; 3],
    pub offset: [f64; 3],
}

impl Peak {
    pub fn from_point(p: DVec3) -> Self {
        let mut position = [0i64; 3];
        let mut offset = [0.0; 3];
        for axis in 0..3 {
            let whole = p[axis].trunc();
            position[axis] = whole as i64;
            offset[axis] = p[axis] - whole;
        }
        Self { position, offset }
    }

    pub fn location(&self) -> DVec3 {
        DVec3::new(
            self.position[0] as f64 + self.offset[0],
            self.position[1] as f64 + self.offset[1],
            self.position[2] as f64 + self.offset[2],
        )
    }
}

/// External spot detector. Points are returned in physical units.
pub trait SpotDetector<T: Sample> {
    fn detect(
        &self,
        channel: &Volume<T>,
        calibration: &Calibration,
        params: &DetectorParams,
    ) -> std::result::Result<Vec<DVec3>, String>;
}

/// Runs `detector` on every channel of `set`, in channel order.
pub fn detect_channels<T, D>(
    set: &ChannelSet<T>,
    detector: &D,
    params: &DetectorParams,
) -> Result<Vec<Vec<DVec3>>>
where
    T: Sample,
    D: SpotDetector<T> + ?Sized,
{
    set.channels()
        .iter()
        .enumerate()
        .map(|(channel, volume)| {
            let points = detector
                .detect(volume, set.calibration(), params)
                .map_err(|message| AlignError::DetectionFailed { channel, message })?;
            info!("Detected {} spots in channel index {}", points.len(), channel);
            Ok(points)
        })
        .collect()
}

/// Output of the external matcher. Entry `k` of both vectors belongs to the
/// `k + 1`-th peak set handed to the matcher (the first is the reference).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub correspondences: Vec<Vec<PointCorrespondence>>,
    pub models: Vec<FittedModel>,
}

/// External correspondence search and model fitting.
///
/// `peaks[0]` is the reference channel. Each fitted model maps its channel
/// onto the reference. `None` means no consistent model was found.
pub trait CorrespondenceMatcher {
    fn match_peaks(
        &self,
        peaks: &[Vec<Peak>],
        model: ModelKind,
        params: &MatchingParams,
    ) -> Option<MatchResult>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTransform {
    pub channel: usize,
    pub transform: AffineTransform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMatches {
    pub channel: usize,
    pub correspondences: Vec<PointCorrespondence>,
}

/// One transform per non-reference channel, in channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub reference: usize,
    pub transforms: Vec<ChannelTransform>,
    pub matches: Vec<ChannelMatches>,
}

impl Alignment {
    pub fn transform_for(&self, channel: usize) -> Option<&AffineTransform> {
        self.transforms
            .iter()
            .find(|t| t.channel == channel)
            .map(|t| &t.transform)
    }

    /// Resampler configuration applying every aligned transform in physical units.
    pub fn resample_config(&self) -> ResampleConfig {
        self.transforms
            .iter()
            .fold(ResampleConfig::default(), |config, t| {
                config.with_channel(t.channel, t.transform)
            })
    }

    /// Residuals left by the correction of `channel`, located in that channel.
    pub fn residual_samples(&self, channel: usize) -> Option<Vec<ResidualSample>> {
        let transform = self.transform_for(channel)?;
        let matches = self.matches.iter().find(|m| m.channel == channel)?;
        Some(residual_samples(
            &matches.correspondences,
            &ResidualSource::CorrectionTransform(*transform),
        ))
    }

    pub fn save(&self, dir: &Path, name: &str) -> Result<Vec<PathBuf>> {
        save_transforms(dir, name, &self.transforms)
    }
}

/// Aligns every point set to `point_sets[reference]`.
pub fn align<M>(
    point_sets: &[Vec<DVec3>],
    kind: TransformKind,
    reference: usize,
    matcher: &M,
    params: &MatchingParams,
) -> Result<Alignment>
where
    M: CorrespondenceMatcher + ?Sized,
{
    let model_kind = kind.model_kind()?;
    if point_sets.len() < 2 {
        return Err(AlignError::AlignmentFailed {
            reason: format!(
                "{} point set(s) given, at least two channels are required",
                point_sets.len()
            ),
        });
    }
    if reference >= point_sets.len() {
        return Err(AlignError::ChannelIndexOutOfRange {
            component: Component::Alignment,
            index: reference,
            channel_count: point_sets.len(),
        });
    }

    let others: Vec<usize> = (0..point_sets.len()).filter(|&c| c != reference).collect();
    let peaks: Vec<Vec<Peak>> = std::iter::once(reference)
        .chain(others.iter().copied())
        .map(|c| point_sets[c].iter().copied().map(Peak::from_point).collect())
        .collect();

    info!(
        "Matching {} channels against reference channel index {} with {} model",
        point_sets.len(),
        reference,
        kind
    );
    let Some(result) = matcher.match_peaks(&peaks, model_kind, params) else {
        error!("No transformation models could be found");
        return Err(AlignError::AlignmentFailed {
            reason: "no transformation models could be found".to_string(),
        });
    };

    if result.models.len() != others.len() {
        return Err(AlignError::AlignmentFailed {
            reason: format!(
                "matcher returned {} models for {} channels",
                result.models.len(),
                others.len()
            ),
        });
    }
    if !result.correspondences.is_empty() && result.correspondences.len() != others.len() {
        return Err(AlignError::AlignmentFailed {
            reason: format!(
                "matcher returned {} correspondence sets for {} channels",
                result.correspondences.len(),
                others.len()
            ),
        });
    }
    if let Some(model) = result
        .models
        .iter()
        .find(|m| m.dims() != Dimensionality::Three || m.kind() != model_kind)
    {
        return Err(AlignError::AlignmentFailed {
            reason: format!("matcher returned {:?} for a {} request", model, kind),
        });
    }

    let transforms: Vec<ChannelTransform> = others
        .iter()
        .zip(&result.models)
        .map(|(&channel, model)| ChannelTransform {
            channel,
            transform: model.to_affine(),
        })
        .collect();
    for t in &transforms {
        info!("Channel index {} aligned with {}", t.channel, t.transform);
    }

    let mut correspondences = result.correspondences.into_iter();
    let matches = others
        .iter()
        .map(|&channel| ChannelMatches {
            channel,
            correspondences: correspondences.next().unwrap_or_default(),
        })
        .collect();

    Ok(Alignment {
        reference,
        transforms,
        matches,
    })
}

/// `C{channel + 1}-{name}.transform`
pub fn transform_file_name(channel: usize, name: &str) -> String {
    format!("C{}-{}{}", channel + 1, name, TRANSFORM_SUFFIX)
}

/// Writes each transform into `dir`; the directory must exist.
pub fn save_transforms(
    dir: &Path,
    name: &str,
    transforms: &[ChannelTransform],
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        error!("Output folder {} doesn't exist", dir.display());
        return Err(AlignError::io(
            dir,
            io::Error::new(io::ErrorKind::NotFound, "output directory does not exist"),
        ));
    }

    let mut paths = Vec::with_capacity(transforms.len());
    for t in transforms {
        let path = dir.join(transform_file_name(t.channel, name));
        transform_io::save(&t.transform, &path).inspect_err(|e| {
            warn!("Error when saving transform for channel index {}: {}", t.channel, e)
        })?;
        paths.push(path);
    }
    info!("Saved {} transforms to {}", paths.len(), dir.display());
    Ok(paths)
}
