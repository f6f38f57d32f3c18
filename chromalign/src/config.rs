//! Configuration for a correction run.
//!
//! All structs implement `Default` with the values the bead workflow uses and
//! provide `validate()` to check ranges before use.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::resample::ResampleConfig;
use crate::transform::TransformKind;

// =============================================================================
// Spot detection
// =============================================================================

/// Parameters handed to the external spot detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Expected spot radius in physical units.
    pub radius: f64,
    /// Detector quality threshold.
    pub threshold: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            threshold: 0.0,
        }
    }
}

impl DetectorParams {
    /// Defaults adapted to a dataset: the radius is raised to three times the
    /// finest axis scale when it is smaller than that scale, and the threshold
    /// follows the sample bit depth (10 for 8-bit, 1000 for 16-bit, 0 otherwise).
    pub fn suggested(calibration: &Calibration, bit_depth: u32) -> Self {
        let smallest = calibration.smallest_scale();
        let mut radius = Self::default().radius;
        if radius < smallest {
            radius = smallest * 3.0;
        }
        let threshold = match bit_depth {
            8 => 10.0,
            16 => 1000.0,
            _ => 0.0,
        };
        Self { radius, threshold }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.radius.is_finite() && self.radius > 0.0,
            "detector radius must be positive, got {}",
            self.radius
        );
        ensure!(
            self.threshold.is_finite() && self.threshold >= 0.0,
            "detector threshold must be non-negative, got {}",
            self.threshold
        );
        Ok(())
    }
}

// =============================================================================
// Correspondence matching
// =============================================================================

/// Descriptor matching parameters passed through to the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingParams {
    pub dimensionality: usize,
    /// Neighbors per descriptor.
    pub num_neighbors: usize,
    pub significance: f64,
    pub similar_orientation: bool,
    /// Maximal RANSAC inlier distance.
    pub ransac_threshold: f64,
    pub redundancy: usize,
}

impl Default for MatchingParams {
    fn default() -> Self {
        Self {
            dimensionality: 3,
            num_neighbors: 3,
            significance: 3.0,
            similar_orientation: true,
            ransac_threshold: 5.0,
            redundancy: 1,
        }
    }
}

impl MatchingParams {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.dimensionality == 3,
            "only volumetric matching is supported, got dimensionality {}",
            self.dimensionality
        );
        ensure!(
            self.num_neighbors >= 1,
            "num_neighbors must be at least 1"
        );
        ensure!(
            self.significance.is_finite() && self.significance > 0.0,
            "significance must be positive, got {}",
            self.significance
        );
        ensure!(
            self.ransac_threshold.is_finite() && self.ransac_threshold > 0.0,
            "ransac_threshold must be positive, got {}",
            self.ransac_threshold
        );
        Ok(())
    }
}

// =============================================================================
// Full run
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub transform_kind: TransformKind,
    pub reference_channel: usize,
    pub detector: DetectorParams,
    pub matching: MatchingParams,
    pub resample: ResampleConfig,
    /// Stem of saved transforms, stored as `C{channel}-{name}.transform`.
    pub transform_name: String,
    pub output_dir: Option<PathBuf>,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            transform_kind: TransformKind::default(),
            reference_channel: 0,
            detector: DetectorParams::default(),
            matching: MatchingParams::default(),
            resample: ResampleConfig::default(),
            transform_name: "chromatic".to_string(),
            output_dir: None,
        }
    }
}

impl CorrectionConfig {
    /// Reads a YAML or JSON file, chosen by extension, and validates it.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: Self = common::serde::load_file(path)?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        common::serde::save_file(self, path)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.transform_kind.model_kind()?;
        self.detector.validate()?;
        self.matching.validate()?;
        ensure!(
            !self.transform_name.is_empty(),
            "transform_name must not be empty"
        );
        ensure!(
            !self.transform_name.contains(['/', '\\']),
            "transform_name must not contain path separators, got '{}'",
            self.transform_name
        );
        Ok(())
    }
}
