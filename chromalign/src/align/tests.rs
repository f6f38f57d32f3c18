use std::cell::{Cell, RefCell};

use glam::{DAffine3, DVec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::grid::GridShape;
use crate::transform::io as transform_io;

/// Matcher stand-in: pairs peaks by index and fits the mean offset.
#[derive(Default)]
struct IndexPairMatcher {
    calls: Cell<usize>,
    seen: RefCell<Vec<Vec<Peak>>>,
    fail: bool,
    model_override: Option<Vec<FittedModel>>,
}

impl CorrespondenceMatcher for IndexPairMatcher {
    fn match_peaks(
        &self,
        peaks: &[Vec<Peak>],
        model: ModelKind,
        _params: &MatchingParams,
    ) -> Option<MatchResult> {
        self.calls.set(self.calls.get() + 1);
        *self.seen.borrow_mut() = peaks.to_vec();
        if self.fail {
            return None;
        }

        let reference = &peaks[0];
        let mut correspondences = Vec::new();
        let mut models = Vec::new();
        for other in &peaks[1..] {
            let pairs: Vec<PointCorrespondence> = reference
                .iter()
                .zip(other)
                .map(|(r, o)| PointCorrespondence::new(r.location(), o.location()).with_inlier(true))
                .collect();
            let mean = pairs
                .iter()
                .map(|p| p.reference - p.other)
                .sum::<DVec3>()
                / pairs.len() as f64;
            let affine = DAffine3::from_translation(mean);
            models.push(match model {
                ModelKind::Translation => FittedModel::Translation3D(mean),
                ModelKind::Rigid => FittedModel::Rigid3D(affine),
                ModelKind::Similarity => FittedModel::Similarity3D(affine),
                ModelKind::Affine => FittedModel::Affine3D(affine),
            });
            correspondences.push(pairs);
        }
        Some(MatchResult {
            correspondences,
            models: self.model_override.clone().unwrap_or(models),
        })
    }
}

fn random_points(seed: u64, n: usize) -> Vec<DVec3> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            DVec3::new(
                rng.random_range(0.0..30.0),
                rng.random_range(0.0..30.0),
                rng.random_range(0.0..8.0),
            )
        })
        .collect()
}

fn shifted(points: &[DVec3], by: DVec3) -> Vec<DVec3> {
    points.iter().map(|p| *p + by).collect()
}

#[test]
fn peak_conversion_is_lossless() {
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..200 {
        let p = DVec3::new(
            rng.random_range(-500.0..500.0),
            rng.random_range(-500.0..500.0),
            rng.random_range(-50.0..50.0),
        );
        assert_eq!(Peak::from_point(p).location(), p);
    }
}

#[test]
fn peak_truncates_toward_zero() {
    let peak = Peak::from_point(DVec3::new(2.75, -1.25, 0.5));
    assert_eq!(peak.position, [2, -1, 0]);
    assert_eq!(peak.offset, [0.75, -0.25, 0.5]);
}

#[test]
fn aligns_every_non_reference_channel_in_order() {
    let base = random_points(1, 25);
    let sets = vec![
        shifted(&base, DVec3::new(1.0, 0.0, 0.0)),
        base.clone(),
        shifted(&base, DVec3::new(0.0, -2.0, 0.5)),
    ];
    let matcher = IndexPairMatcher::default();
    let alignment = align(
        &sets,
        TransformKind::Translation3D,
        1,
        &matcher,
        &MatchingParams::default(),
    )
    .unwrap();

    assert_eq!(matcher.calls.get(), 1);
    let seen = matcher.seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0][0].location(), sets[1][0]);
    assert_eq!(seen[1][0].location(), sets[0][0]);
    assert_eq!(seen[2][0].location(), sets[2][0]);

    let channels: Vec<usize> = alignment.transforms.iter().map(|t| t.channel).collect();
    assert_eq!(channels, vec![0, 2]);

    let t0 = alignment.transform_for(0).unwrap().apply(&[5.0, 5.0, 5.0]).unwrap();
    assert!((t0[0] - 4.0).abs() < 1e-9);
    let t2 = alignment.transform_for(2).unwrap().apply(&[5.0, 5.0, 5.0]).unwrap();
    assert!((t2[1] - 7.0).abs() < 1e-9);
    assert!((t2[2] - 4.5).abs() < 1e-9);
    assert!(alignment.transform_for(1).is_none());
}

#[test]
fn residuals_vanish_for_exact_alignment() {
    let base = random_points(2, 10);
    let sets = vec![base.clone(), shifted(&base, DVec3::new(0.5, 0.25, -1.0))];
    let alignment = align(
        &sets,
        TransformKind::Similarity3D,
        0,
        &IndexPairMatcher::default(),
        &MatchingParams::default(),
    )
    .unwrap();
    let samples = alignment.residual_samples(1).unwrap();
    assert_eq!(samples.len(), 10);
    for s in &samples {
        assert!(s.residual.length() < 1e-9);
    }
    assert!(alignment.residual_samples(0).is_none());
}

#[test]
fn planar_kinds_fail_before_matching() {
    let sets = vec![random_points(3, 5), random_points(4, 5)];
    let matcher = IndexPairMatcher::default();
    for kind in [
        TransformKind::Translation2D,
        TransformKind::Rigid2D,
        TransformKind::Affine2D,
        TransformKind::Affine2DTranslation3D,
    ] {
        assert!(matches!(
            align(&sets, kind, 0, &matcher, &MatchingParams::default()),
            Err(AlignError::UnsupportedTransformKind { .. })
        ));
    }
    assert_eq!(matcher.calls.get(), 0);
}

#[test]
fn rejects_bad_channel_arguments() {
    let sets = vec![random_points(5, 5), random_points(6, 5)];
    let matcher = IndexPairMatcher::default();
    assert!(matches!(
        align(&sets, TransformKind::Rigid3D, 2, &matcher, &MatchingParams::default()),
        Err(AlignError::ChannelIndexOutOfRange {
            index: 2,
            channel_count: 2,
            ..
        })
    ));
    assert!(matches!(
        align(&sets[..1], TransformKind::Rigid3D, 0, &matcher, &MatchingParams::default()),
        Err(AlignError::AlignmentFailed { .. })
    ));
    assert_eq!(matcher.calls.get(), 0);
}

#[test]
fn matcher_without_models_fails() {
    let sets = vec![random_points(7, 5), random_points(8, 5)];
    let matcher = IndexPairMatcher {
        fail: true,
        ..Default::default()
    };
    assert!(matches!(
        align(&sets, TransformKind::Affine3D, 0, &matcher, &MatchingParams::default()),
        Err(AlignError::AlignmentFailed { .. })
    ));
}

#[test]
fn inconsistent_matcher_output_fails() {
    let sets = vec![random_points(9, 5), random_points(10, 5), random_points(11, 5)];

    let too_few = IndexPairMatcher {
        model_override: Some(vec![FittedModel::Affine3D(DAffine3::IDENTITY)]),
        ..Default::default()
    };
    assert!(matches!(
        align(&sets, TransformKind::Affine3D, 0, &too_few, &MatchingParams::default()),
        Err(AlignError::AlignmentFailed { .. })
    ));

    let wrong_kind = IndexPairMatcher {
        model_override: Some(vec![
            FittedModel::Affine3D(DAffine3::IDENTITY),
            FittedModel::Rigid3D(DAffine3::IDENTITY),
        ]),
        ..Default::default()
    };
    assert!(matches!(
        align(&sets, TransformKind::Affine3D, 0, &wrong_kind, &MatchingParams::default()),
        Err(AlignError::AlignmentFailed { .. })
    ));

    let planar = IndexPairMatcher {
        model_override: Some(vec![
            FittedModel::Translation2D(glam::DVec2::ZERO),
            FittedModel::Translation2D(glam::DVec2::ZERO),
        ]),
        ..Default::default()
    };
    assert!(matches!(
        align(&sets, TransformKind::Translation3D, 0, &planar, &MatchingParams::default()),
        Err(AlignError::AlignmentFailed { .. })
    ));
}

#[test]
fn resample_config_applies_aligned_channels() {
    let base = random_points(12, 6);
    let sets = vec![base.clone(), shifted(&base, DVec3::X), base.clone()];
    let alignment = align(
        &sets,
        TransformKind::Translation3D,
        0,
        &IndexPairMatcher::default(),
        &MatchingParams::default(),
    )
    .unwrap();
    let config = alignment.resample_config();
    assert_eq!(config.per_channel_apply, vec![false, true, true]);
    assert!(config.use_calibration);
    let t1 = config.per_channel_transform[1].unwrap().to_row_packed();
    let expected = AffineTransform::translation_3d(-DVec3::X).to_row_packed();
    for (a, b) in t1.iter().zip(&expected) {
        assert!((a - b).abs() < 1e-12);
    }
    assert_eq!(config.per_channel_transform[0], None);
}

#[test]
fn saves_named_transform_files() {
    let dir = tempfile::tempdir().unwrap();
    let transforms = [
        ChannelTransform {
            channel: 1,
            transform: AffineTransform::translation_3d(DVec3::new(0.1, 0.2, 0.3)),
        },
        ChannelTransform {
            channel: 2,
            transform: AffineTransform::identity(Dimensionality::Three),
        },
    ];
    let paths = save_transforms(dir.path(), "beads", &transforms).unwrap();
    assert_eq!(paths[0], dir.path().join("C2-beads.transform"));
    assert_eq!(paths[1], dir.path().join("C3-beads.transform"));
    assert_eq!(transform_io::open(&paths[0]).unwrap(), transforms[0].transform);
}

#[test]
fn saving_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let transforms = [ChannelTransform {
        channel: 1,
        transform: AffineTransform::identity(Dimensionality::Three),
    }];
    assert!(matches!(
        save_transforms(&missing, "beads", &transforms),
        Err(AlignError::IoFailure { path, .. }) if path == missing
    ));
}

struct ThresholdDetector;

impl SpotDetector<u8> for ThresholdDetector {
    fn detect(
        &self,
        channel: &Volume<u8>,
        calibration: &Calibration,
        params: &DetectorParams,
    ) -> std::result::Result<Vec<DVec3>, String> {
        let shape = channel.shape();
        let mut points = Vec::new();
        for z in 0..shape.depth() {
            for y in 0..shape.height() {
                for x in 0..shape.width() {
                    if channel.get(x, y, z) as f64 > params.threshold {
                        let p = DVec3::new(x as f64, y as f64, z as f64);
                        points.push(calibration.to_physical(p));
                    }
                }
            }
        }
        if points.is_empty() {
            return Err("no spots above threshold".to_string());
        }
        Ok(points)
    }
}

#[test]
fn detect_channels_reports_failing_channel() {
    let shape = GridShape::new_3d(4, 4, 2);
    let mut bright = vec![0u8; shape.len()];
    bright[shape.index(1, 2, 1)] = 200;
    let set = ChannelSet::new(
        vec![
            Volume::new(shape, bright).unwrap(),
            Volume::filled(shape, 0u8),
        ],
        Calibration::new(vec![0.5, 0.5, 2.0]).unwrap(),
    )
    .unwrap();

    let params = DetectorParams {
        radius: 1.0,
        threshold: 10.0,
    };
    assert!(matches!(
        detect_channels(&set, &ThresholdDetector, &params),
        Err(AlignError::DetectionFailed { channel: 1, ref message }) if message.contains("threshold")
    ));

    let only_first = ChannelSet::new(
        vec![set.extract_channel(0).unwrap()],
        set.calibration().clone(),
    )
    .unwrap();
    let points = detect_channels(&only_first, &ThresholdDetector, &params).unwrap();
    assert_eq!(points, vec![vec![DVec3::new(0.5, 1.0, 2.0)]]);
}
