use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tractdist_core::{dist2, Cloud, Error};
use tractdist_metrics::*;

const EPS: f64 = 1e-9;

fn cloud(pts: &[[f64; 3]]) -> Cloud { pts.iter().copied().collect() }

fn random_cloud(rng: &mut StdRng, n: usize) -> Cloud {
    (0..n).map(|_| [
        rng.gen_range(-20.0..20.0),
        rng.gen_range(-20.0..20.0),
        rng.gen_range(-20.0..20.0),
    ]).collect()
}

/// O(n·m) reference for one direction.
fn brute_directed(from: &Cloud, to: &Cloud) -> Vec<f64> {
    (0..from.len())
        .map(|i| (0..to.len()).map(|j| dist2(from.point(i), to.point(j))).fold(f64::INFINITY, f64::min).sqrt())
        .collect()
}

#[test]
fn directed_distances_differ_for_asymmetric_sets() {
    let mut a = cloud(&[[-10.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
    let mut b = cloud(&[[0.0, 0.0, 0.0]]);
    let s = compute_symmetric_distance(&mut a, &mut b, false).unwrap();
    assert!((s.max_a_to_b - 10.0).abs() < EPS);
    assert!((s.max_b_to_a - 10.0).abs() < EPS);

    let mut a = cloud(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
    let mut b = cloud(&[[4.0, 0.0, 0.0]]);
    let s = compute_symmetric_distance(&mut a, &mut b, false).unwrap();
    assert!((s.max_a_to_b - 6.0).abs() < EPS);
    assert!((s.max_b_to_a - 4.0).abs() < EPS);
    assert_ne!(s.max_a_to_b, s.max_b_to_a);
}

#[test]
fn self_distance_is_zero() {
    let mut rng = StdRng::seed_from_u64(11);
    let c = random_cloud(&mut rng, 300);
    let r = symmetric_distance((&c).into(), (&c).into(), &DistanceCfg::default()).unwrap();
    assert_eq!(r.summary.max_a_to_b, 0.0);
    assert_eq!(r.summary.max_b_to_a, 0.0);
    assert_eq!(r.summary.mean_a_to_b, 0.0);
    assert_eq!(r.summary.mean_b_to_a, 0.0);
}

#[test]
fn single_points_form_a_3_4_5_triangle() {
    let mut a = cloud(&[[0.0, 0.0, 0.0]]);
    let mut b = cloud(&[[3.0, 4.0, 0.0]]);
    let s = compute_symmetric_distance(&mut a, &mut b, false).unwrap();
    for v in [s.max_a_to_b, s.max_b_to_a, s.mean_a_to_b, s.mean_b_to_a] {
        assert!((v - 5.0).abs() < EPS);
    }
}

#[test]
fn farthest_point_drives_the_directed_max() {
    let mut a = cloud(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
    let mut b = cloud(&[[0.0, 0.0, 0.0]]);
    let s = compute_symmetric_distance(&mut a, &mut b, false).unwrap();
    assert!((s.max_a_to_b - 10.0).abs() < EPS);
    assert!((s.mean_a_to_b - 5.0).abs() < EPS);
    assert_eq!(s.max_b_to_a, 0.0);
    assert_eq!(s.headline(), s.max_a_to_b);
}

#[test]
fn empty_sets_are_rejected() {
    let mut full = cloud(&[[1.0, 1.0, 1.0]]);
    let mut empty = Cloud::default();
    assert!(matches!(
        compute_symmetric_distance(&mut full, &mut empty, true),
        Err(Error::EmptySet { .. })
    ));
    assert!(matches!(
        compute_symmetric_distance(&mut empty, &mut full, true),
        Err(Error::EmptySet { .. })
    ));
    assert!(full.attrs.is_empty());
}

#[test]
fn point_order_does_not_change_the_summary() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random_cloud(&mut rng, 60);
    let b = random_cloud(&mut rng, 45);
    let base = symmetric_distance((&a).into(), (&b).into(), &DistanceCfg::default()).unwrap();

    let mut order: Vec<usize> = (0..a.len()).collect();
    order.shuffle(&mut rng);
    let shuffled: Cloud = order.iter().map(|&i| a.point(i)).collect();
    let r = symmetric_distance((&shuffled).into(), (&b).into(), &DistanceCfg::default()).unwrap();

    assert!((r.summary.max_a_to_b - base.summary.max_a_to_b).abs() < EPS);
    assert!((r.summary.mean_a_to_b - base.summary.mean_a_to_b).abs() < EPS);
    assert!((r.summary.max_b_to_a - base.summary.max_b_to_a).abs() < EPS);
    assert!((r.summary.mean_b_to_a - base.summary.mean_b_to_a).abs() < EPS);
    for (k, &i) in order.iter().enumerate() {
        assert_eq!(r.per_point_a[k], base.per_point_a[i]);
    }
}

#[test]
fn indexed_distances_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..100 {
        let (n_a, n_b) = (rng.gen_range(1..=20), rng.gen_range(1..=20));
        let a = random_cloud(&mut rng, n_a);
        let b = random_cloud(&mut rng, n_b);
        let r = symmetric_distance((&a).into(), (&b).into(), &DistanceCfg::default()).unwrap();
        for (got, want) in r.per_point_a.iter().zip(brute_directed(&a, &b)) {
            assert!((got - want).abs() < EPS);
        }
        for (got, want) in r.per_point_b.iter().zip(brute_directed(&b, &a)) {
            assert!((got - want).abs() < EPS);
        }
    }
}

#[test]
fn annotation_attaches_per_point_fields() {
    let mut a = cloud(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
    let mut b = cloud(&[[0.0, 0.0, 0.0]]);
    compute_symmetric_distance(&mut a, &mut b, true).unwrap();
    assert_eq!(a.attrs[DEFAULT_FIELD], vec![0.0, 10.0]);
    assert_eq!(b.attrs[DEFAULT_FIELD], vec![0.0]);
    // geometry untouched
    assert_eq!(a.x, vec![0.0, 10.0]);
}

#[test]
fn self_pair_annotation_matches_cloud_length() {
    let mut a = cloud(&[[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]]);
    let mut b = a.clone();
    let s = compute_symmetric_distance(&mut a, &mut b, true).unwrap();
    assert_eq!(s.hausdorff(), 0.0);
    assert_eq!(a.attrs[DEFAULT_FIELD].len(), a.len());
    assert_eq!(b.attrs[DEFAULT_FIELD], vec![0.0; 3]);
}

#[test]
fn report_annotates_under_a_custom_name() {
    let mut a = cloud(&[[0.0, 0.0, 0.0], [0.0, 2.0, 0.0]]);
    let mut b = cloud(&[[0.0, 1.0, 0.0]]);
    let r = symmetric_distance((&a).into(), (&b).into(), &DistanceCfg::default()).unwrap();
    assert!(r.annotate_a(&mut a, "to_b"));
    assert!(r.annotate_b(&mut b, "to_a"));
    assert!(!r.annotate_a(&mut b, "wrong"));
    assert_eq!(a.attrs["to_b"], vec![1.0, 1.0]);
    assert_eq!(b.attrs["to_a"], vec![1.0]);
}

#[test]
fn matrix_matches_individual_calls() {
    let mut rng = StdRng::seed_from_u64(99);
    let clouds: Vec<Cloud> = (0..4).map(|_| random_cloud(&mut rng, 30)).collect();
    let labels: Vec<String> = (1..=4).map(|t| format!("team_{t}")).collect();
    let m = pairwise_matrix(&labels, &clouds, &DistanceCfg::default()).unwrap();
    assert_eq!(m.len(), 4);
    for i in 0..4 {
        assert_eq!(m.get(i, i), 0.0);
        for j in 0..4 {
            let r = symmetric_distance((&clouds[i]).into(), (&clouds[j]).into(), &DistanceCfg::default()).unwrap();
            assert!((m.get(i, j) - r.summary.headline()).abs() < EPS);
        }
    }
}

#[test]
fn summary_serializes_all_four_scalars() {
    let a = cloud(&[[0.0, 0.0, 0.0]]);
    let b = cloud(&[[3.0, 4.0, 0.0]]);
    let r = symmetric_distance((&a).into(), (&b).into(), &DistanceCfg::default()).unwrap();
    let v: serde_json::Value = serde_json::to_value(r.summary).unwrap();
    for key in ["max_a_to_b", "mean_a_to_b", "max_b_to_a", "mean_b_to_a"] {
        assert_eq!(v[key], 5.0);
    }
}
