use std::fs;

use chromalign::transform::io::{open, read_from, save, supports_open, supports_save, write_to};
use chromalign::{AffineTransform, AlignError, Dimensionality};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_row_packed(rng: &mut StdRng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.random_range(-1e3..1e3)).collect()
}

#[test]
fn volumetric_round_trip_is_exact() {
    let mut rng = StdRng::seed_from_u64(42);
    let dir = tempfile::tempdir().unwrap();
    for i in 0..10 {
        let values = random_row_packed(&mut rng, 12);
        let t = AffineTransform::from_row_packed(&values).unwrap();
        let path = dir.path().join(format!("C{i}-beads.transform"));
        save(&t, &path).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 4 + 12 * 8);
        assert_eq!(supports_open(&path), Some(Dimensionality::Three));
        let back = open(&path).unwrap();
        assert_eq!(back.to_row_packed(), values);
    }
}

#[test]
fn planar_round_trip_is_exact() {
    let mut rng = StdRng::seed_from_u64(43);
    let dir = tempfile::tempdir().unwrap();
    let values = random_row_packed(&mut rng, 6);
    let t = AffineTransform::from_row_packed(&values).unwrap();
    let path = dir.path().join("planar.transform");
    save(&t, &path).unwrap();

    assert_eq!(supports_open(&path), Some(Dimensionality::Two));
    assert_eq!(open(&path).unwrap().to_row_packed(), values);
}

#[test]
fn file_layout_is_big_endian() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shift.transform");
    let t = AffineTransform::translation_3d(glam::DVec3::new(2.0, 0.0, 0.0));
    save(&t, &path).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], &[0, 0, 0, 3]);
    // t0 is the fourth value of the first row
    let t0 = 4 + 3 * 8;
    assert_eq!(&bytes[t0..t0 + 8], &2.0f64.to_be_bytes());
}

#[test]
fn discovery_never_fails() {
    let dir = tempfile::tempdir().unwrap();

    let wrong_suffix = dir.path().join("shift.xml");
    let mut bytes = Vec::new();
    write_to(&AffineTransform::identity(Dimensionality::Three), &mut bytes).unwrap();
    fs::write(&wrong_suffix, &bytes).unwrap();
    assert_eq!(supports_open(&wrong_suffix), None);

    let garbage = dir.path().join("garbage.transform");
    fs::write(&garbage, b"not a transform at all").unwrap();
    assert_eq!(supports_open(&garbage), None);

    let short = dir.path().join("short.transform");
    fs::write(&short, [0u8, 0]).unwrap();
    assert_eq!(supports_open(&short), None);

    let four = dir.path().join("four.transform");
    fs::write(&four, 4i32.to_be_bytes()).unwrap();
    assert_eq!(supports_open(&four), None);

    assert_eq!(supports_open(&dir.path().join("missing.transform")), None);
}

#[test]
fn save_requires_transform_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shift.txt");
    assert!(!supports_save(&path));
    assert!(matches!(
        save(&AffineTransform::identity(Dimensionality::Two), &path),
        Err(AlignError::IoFailure { .. })
    ));
    assert!(!path.exists());
}

#[test]
fn open_reports_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.transform");
    assert!(matches!(open(&path), Err(AlignError::IoFailure { path: p, .. }) if p == path));

    let truncated = dir.path().join("truncated.transform");
    fs::write(&truncated, 3i32.to_be_bytes()).unwrap();
    assert!(matches!(open(&truncated), Err(AlignError::IoFailure { .. })));
}

#[test]
fn stream_round_trip() {
    let t = AffineTransform::from_row_packed(&[1.5, -0.5, 3.25, 0.0, 2.0, -7.0]).unwrap();
    let mut buf = Vec::new();
    write_to(&t, &mut buf).unwrap();
    assert_eq!(read_from(&mut buf.as_slice()).unwrap(), t);
}
