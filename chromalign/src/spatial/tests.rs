use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

fn brute_force(points: &[DVec3], query: DVec3) -> Neighbor {
    let mut best = Neighbor {
        index: usize::MAX,
        dist_sq: f64::INFINITY,
    };
    for (index, p) in points.iter().enumerate() {
        let candidate = Neighbor {
            index,
            dist_sq: query.distance_squared(*p),
        };
        if candidate.beats(&best) {
            best = candidate;
        }
    }
    best
}

#[test]
fn test_build_empty() {
    assert!(KdTree::<f64>::build(&[], Vec::new(), Dimensionality::Three).is_none());
}

#[test]
fn test_build_rejects_value_count_mismatch() {
    let points = [DVec3::ZERO, DVec3::ONE];
    assert!(KdTree::build(&points, vec![1.0], Dimensionality::Three).is_none());
}

#[test]
fn test_single_point_answers_everything() {
    let tree = KdTree::build(&[DVec3::new(5.0, 5.0, 5.0)], vec![42], Dimensionality::Three)
        .unwrap();
    for q in [DVec3::ZERO, DVec3::splat(1000.0), DVec3::new(-3.0, 7.0, 0.0)] {
        assert_eq!(tree.nearest_value(q), Some(&42));
    }
}

#[test]
fn test_nearest_matches_brute_force_3d() {
    let mut rng = StdRng::seed_from_u64(1);
    let points: Vec<DVec3> = (0..300)
        .map(|_| {
            DVec3::new(
                rng.random_range(0.0..50.0),
                rng.random_range(0.0..50.0),
                rng.random_range(0.0..10.0),
            )
        })
        .collect();
    let tree = KdTree::build(&points, (0..points.len()).collect(), Dimensionality::Three).unwrap();

    for _ in 0..500 {
        let q = DVec3::new(
            rng.random_range(-5.0..55.0),
            rng.random_range(-5.0..55.0),
            rng.random_range(-2.0..12.0),
        );
        let expected = brute_force(&points, q);
        let found = tree.nearest(q).unwrap();
        assert_eq!(found.index, expected.index);
        assert_eq!(*tree.value(found.index), expected.index);
    }
}

#[test]
fn test_ties_resolve_to_lowest_index() {
    // Lattice points produce many exactly equidistant candidates.
    let mut points = Vec::new();
    for z in 0..3 {
        for y in 0..4 {
            for x in 0..4 {
                points.push(DVec3::new(x as f64 * 2.0, y as f64 * 2.0, z as f64 * 2.0));
            }
        }
    }
    points.reverse();
    let tree = KdTree::build(&points, vec![(); points.len()], Dimensionality::Three).unwrap();

    for z in 0..5 {
        for y in 0..7 {
            for x in 0..7 {
                let q = DVec3::new(x as f64, y as f64, z as f64);
                assert_eq!(tree.nearest(q).unwrap().index, brute_force(&points, q).index);
            }
        }
    }
}

#[test]
fn test_duplicate_points_pick_first() {
    let p = DVec3::new(1.0, 2.0, 3.0);
    let tree = KdTree::build(&[p, p, p], vec!['a', 'b', 'c'], Dimensionality::Three).unwrap();
    assert_eq!(tree.nearest_value(DVec3::ZERO), Some(&'a'));
}

#[test]
fn test_planar_tree_ignores_z() {
    let points = [DVec3::new(0.0, 0.0, 100.0), DVec3::new(3.0, 0.0, 0.0)];
    let tree = KdTree::build(&points, vec![0, 1], Dimensionality::Two).unwrap();
    let n = tree.nearest(DVec3::new(1.0, 0.0, 0.0)).unwrap();
    assert_eq!(n.index, 0);
    assert_eq!(n.dist_sq, 1.0);
}

#[test]
fn test_non_finite_points_yield_no_neighbor() {
    let tree = KdTree::build(
        &[DVec3::new(f64::NAN, 0.0, 0.0)],
        vec![1.0],
        Dimensionality::Three,
    )
    .unwrap();
    assert!(tree.nearest(DVec3::ZERO).is_none());
    assert!(tree.nearest_value(DVec3::ZERO).is_none());
}
