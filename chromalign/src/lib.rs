//! Chromalign - channel registration correction for multi-channel volumes.
//!
//! Corrects geometric misalignment between the channels of a volumetric
//! image (chromatic offsets in multi-color microscopy) and produces
//! diagnostics of what remains:
//! - Affine transform algebra with calibration-aware conjugation
//! - Per-channel resampling with N-linear interpolation
//! - Dense displacement fields of a transform
//! - Nearest-neighbor rasterization of registration residuals
//! - Alignment of detected spots through an external matcher, with
//!   `.transform` file persistence
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use chromalign::{resample, AffineTransform, Calibration, ChannelSet, ResampleConfig};
//!
//! let set = ChannelSet::new(channels, Calibration::new(vec![0.1, 0.1, 0.3])?)?;
//! let shift = chromalign::transform::io::open(Path::new("C2-beads.transform"))?;
//! let config = ResampleConfig::default().with_channel(1, shift);
//! let corrected = resample(&set, &config)?;
//! ```

pub mod align;
pub mod calibration;
pub mod channel_set;
pub mod config;
pub mod displacement;
pub mod error;
pub mod field;
pub mod grid;
pub mod resample;
pub mod residual;
pub mod spatial;
pub mod transform;
pub mod volume;

// ============================================================================
// Data model
// ============================================================================

pub use calibration::Calibration;
pub use channel_set::{AxisInfo, ChannelDisplay, ChannelLayout, ChannelSet, ColorTable};
pub use error::{AlignError, Component, Result};
pub use field::{DisplacementField, ResidualVolume, VectorField};
pub use grid::{Dimensionality, GridShape};
pub use volume::{Sample, Volume};

// ============================================================================
// Transforms
// ============================================================================

pub use transform::{AffineTransform, FittedModel, ModelKind, TransformKind};

// ============================================================================
// Operations
// ============================================================================

pub use align::{
    align, detect_channels, save_transforms, Alignment, ChannelMatches, ChannelTransform,
    CorrespondenceMatcher, DetectionSession, MatchResult, Peak, SpotDetector,
};
pub use config::{CorrectionConfig, DetectorParams, MatchingParams};
pub use displacement::evaluate as evaluate_displacement;
pub use resample::{resample, resample_channel, ChannelDecision, ResampleConfig};
pub use residual::{
    interpolate as interpolate_residuals, residual_samples, PointCorrespondence, ResidualSample,
    ResidualSource, ResidualStats,
};
