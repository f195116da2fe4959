//! tractdist-metrics — symmetric nearest-point distances between point sets.
//!
//! For every point of A the nearest point of B is found (and vice versa);
//! the per-point distances give the directed Hausdorff (max) and mean
//! distance in each direction.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tractdist_core::{Cloud, CloudView, Error, Result};
use tractdist_nn::{BruteIndex, GridIndex, NearestIndex};

mod matrix;
mod summary;

pub use matrix::{pairwise_matrix, DistanceMatrix};
pub use summary::{DirectedProfile, DistanceReport, DistanceSummary};

/// Scalar field name used when annotating clouds.
pub const DEFAULT_FIELD: &str = "distance";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexBackend {
    #[default]
    Grid,
    Brute,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistanceCfg {
    /// grid cell size; None picks one from the point set's extent
    pub cell: Option<f64>,
    pub backend: IndexBackend,
    /// query points on the rayon pool
    pub parallel: bool,
    /// scalar field name for annotations
    pub field: String,
}

impl Default for DistanceCfg {
    fn default() -> Self {
        Self { cell: None, backend: IndexBackend::Grid, parallel: true, field: DEFAULT_FIELD.into() }
    }
}

/// Build the configured nearest-point index over `view`.
/// `which` names the set in the `EmptySet` error.
pub fn build_index<'a>(view: CloudView<'a>, cfg: &DistanceCfg, which: &str) -> Result<Box<dyn NearestIndex + 'a>> {
    if view.is_empty() { return Err(Error::empty(which)); }
    Ok(match (cfg.backend, cfg.cell) {
        (IndexBackend::Brute, _) => Box::new(BruteIndex::build(view)?),
        (IndexBackend::Grid, Some(cell)) => Box::new(GridIndex::build(view, cell)?),
        (IndexBackend::Grid, None) => Box::new(GridIndex::auto(view)?),
    })
}

/// Euclidean distance from every point of `from` to its nearest point in `to`,
/// in `from`'s order.
pub fn directed_distances<I>(from: CloudView<'_>, to: &I, parallel: bool) -> Vec<f64>
where
    I: NearestIndex + ?Sized,
{
    if parallel {
        (0..from.len()).into_par_iter().map(|i| to.nearest(from.point(i)).dist()).collect()
    } else {
        (0..from.len()).map(|i| to.nearest(from.point(i)).dist()).collect()
    }
}

/// Symmetric comparison of A and B. Fails with `EmptySet` if either side is empty.
pub fn symmetric_distance(a: CloudView<'_>, b: CloudView<'_>, cfg: &DistanceCfg) -> Result<DistanceReport> {
    let t = Instant::now();
    let index_b = build_index(b, cfg, "B")?;
    let index_a = build_index(a, cfg, "A")?;

    let (per_a, per_b) = if cfg.parallel {
        rayon::join(
            || directed_distances(a, index_b.as_ref(), true),
            || directed_distances(b, index_a.as_ref(), true),
        )
    } else {
        (directed_distances(a, index_b.as_ref(), false), directed_distances(b, index_a.as_ref(), false))
    };

    let report = DistanceReport::new(per_a, per_b);
    tracing::debug!(
        n_a = a.len(), n_b = b.len(),
        max_a_to_b = report.summary.max_a_to_b, max_b_to_a = report.summary.max_b_to_a,
        ms = t.elapsed().as_secs_f64() * 1000.0,
        "symmetric distance"
    );
    Ok(report)
}

/// Compare A and B with default settings. With `annotate`, each cloud gets
/// its per-point distances as the `"distance"` scalar field.
pub fn compute_symmetric_distance(a: &mut Cloud, b: &mut Cloud, annotate: bool) -> Result<DistanceSummary> {
    let report = symmetric_distance((&*a).into(), (&*b).into(), &DistanceCfg::default())?;
    if annotate {
        let DistanceReport { summary, per_point_a, per_point_b, .. } = report;
        let attached_a = a.set_attr(DEFAULT_FIELD, per_point_a);
        let attached_b = b.set_attr(DEFAULT_FIELD, per_point_b);
        debug_assert!(attached_a && attached_b, "per-point distances must match cloud lengths");
        return Ok(summary);
    }
    Ok(report.summary)
}
