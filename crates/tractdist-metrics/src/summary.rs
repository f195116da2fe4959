use serde::{Deserialize, Serialize};
use tractdist_core::Cloud;

/// The four headline scalars of a symmetric nearest-point comparison.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    /// Directed Hausdorff distance A→B.
    pub max_a_to_b: f64,
    pub mean_a_to_b: f64,
    /// Directed Hausdorff distance B→A.
    pub max_b_to_a: f64,
    pub mean_b_to_a: f64,
}

impl DistanceSummary {
    /// The value single-number callers report: max(A→B).
    pub fn headline(&self) -> f64 { self.max_a_to_b }

    /// Symmetric Hausdorff distance.
    pub fn hausdorff(&self) -> f64 { self.max_a_to_b.max(self.max_b_to_a) }
}

/// Distribution of one direction's per-point distances.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectedProfile {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub rmse: f64,
    pub p50: f64,
    pub p95: f64,
}

impl DirectedProfile {
    /// `d` must be non-empty; the engine never produces an empty pass.
    pub(crate) fn from_distances(d: &[f64]) -> Self {
        // running sum/max in point order keeps the result independent of thread count
        let (mut sum, mut sum2, mut max) = (0.0f64, 0.0f64, 0.0f64);
        for &v in d {
            sum += v;
            sum2 += v * v;
            if v > max { max = v; }
        }
        let n = d.len();
        let mut sorted = d.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let pct = |p: f64| -> f64 { sorted[((p * (n as f64 - 1.0)).round() as usize).min(n - 1)] };
        Self {
            count: n,
            min: sorted[0],
            max,
            mean: sum / n as f64,
            rmse: (sum2 / n as f64).sqrt(),
            p50: pct(0.50),
            p95: pct(0.95),
        }
    }
}

/// Full output of one A/B comparison.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistanceReport {
    pub summary: DistanceSummary,
    pub a_to_b: DirectedProfile,
    pub b_to_a: DirectedProfile,
    /// Nearest distance into B for every point of A, in A's order.
    pub per_point_a: Vec<f64>,
    /// Nearest distance into A for every point of B, in B's order.
    pub per_point_b: Vec<f64>,
}

impl DistanceReport {
    pub(crate) fn new(per_point_a: Vec<f64>, per_point_b: Vec<f64>) -> Self {
        let a_to_b = DirectedProfile::from_distances(&per_point_a);
        let b_to_a = DirectedProfile::from_distances(&per_point_b);
        let summary = DistanceSummary {
            max_a_to_b: a_to_b.max,
            mean_a_to_b: a_to_b.mean,
            max_b_to_a: b_to_a.max,
            mean_b_to_a: b_to_a.mean,
        };
        Self { summary, a_to_b, b_to_a, per_point_a, per_point_b }
    }

    /// Attach A's per-point distances to `a` as scalar field `name`.
    /// Returns false if `a` is not the cloud this report was computed from.
    pub fn annotate_a(&self, a: &mut Cloud, name: &str) -> bool {
        a.set_attr(name, self.per_point_a.clone())
    }

    pub fn annotate_b(&self, b: &mut Cloud, name: &str) -> bool {
        b.set_attr(name, self.per_point_b.clone())
    }
}
