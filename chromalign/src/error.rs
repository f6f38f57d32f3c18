use std::path::PathBuf;

use strum_macros::Display;
use thiserror::Error;

/// The part of the pipeline that rejected an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Component {
    #[strum(serialize = "transform algebra")]
    TransformAlgebra,
    #[strum(serialize = "calibration")]
    Calibration,
    #[strum(serialize = "channel set")]
    ChannelSet,
    #[strum(serialize = "channel resampler")]
    ChannelResampler,
    #[strum(serialize = "displacement field evaluator")]
    DisplacementField,
    #[strum(serialize = "residual field interpolator")]
    ResidualField,
    #[strum(serialize = "alignment orchestrator")]
    Alignment,
    #[strum(serialize = "transform persistence")]
    Persistence,
}

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("{component}: expected {expected} dimensions, got {actual}")]
    DimensionMismatch {
        component: Component,
        expected: usize,
        actual: usize,
    },

    #[error("{component}: transform is not invertible (determinant {determinant:e})")]
    SingularTransform {
        component: Component,
        determinant: f64,
    },

    #[error("{component}: invalid scale {value} on axis {axis}")]
    InvalidCalibration {
        component: Component,
        axis: usize,
        value: f64,
    },

    #[error("{component}: {detail}")]
    ShapeMismatch { component: Component, detail: String },

    #[error("{component}: channel index {index} out of range for {channel_count} channels")]
    ChannelIndexOutOfRange {
        component: Component,
        index: usize,
        channel_count: usize,
    },

    #[error("{component}: unsupported dimensionality {dims}, only 2 or 3 are supported")]
    UnsupportedDimensionality { component: Component, dims: usize },

    #[error("{component}: {actual} samples given, at least {required} required")]
    InsufficientSamples {
        component: Component,
        required: usize,
        actual: usize,
    },

    #[error("{component}: unsupported transform kind '{kind}'")]
    UnsupportedTransformKind { component: Component, kind: String },

    #[error("alignment failed: {reason}")]
    AlignmentFailed { reason: String },

    #[error("{component}: channel {channel} is flagged for transformation but has no transform")]
    MissingTransform { component: Component, channel: usize },

    #[error("spot detection failed on channel {channel}: {message}")]
    DetectionFailed { channel: usize, message: String },

    #[error("I/O failure on '{}': {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AlignError {
    /// Re-attributes a validation error to the component that surfaced it.
    pub fn in_component(mut self, owner: Component) -> Self {
        match &mut self {
            AlignError::DimensionMismatch { component, .. }
            | AlignError::SingularTransform { component, .. }
            | AlignError::InvalidCalibration { component, .. }
            | AlignError::ShapeMismatch { component, .. }
            | AlignError::ChannelIndexOutOfRange { component, .. }
            | AlignError::UnsupportedDimensionality { component, .. }
            | AlignError::InsufficientSamples { component, .. }
            | AlignError::UnsupportedTransformKind { component, .. }
            | AlignError::MissingTransform { component, .. } => *component = owner,
            AlignError::AlignmentFailed { .. }
            | AlignError::DetectionFailed { .. }
            | AlignError::IoFailure { .. } => {}
        }
        self
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AlignError::IoFailure {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;
