use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tractdist_core::{Cloud, CloudView, Error, Result};

use crate::{build_index, directed_distances, DistanceCfg};

/// Square grid of headline distances: `values[i][j]` is max(labels[i] → labels[j]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    pub fn len(&self) -> usize { self.labels.len() }
    pub fn is_empty(&self) -> bool { self.labels.is_empty() }
    pub fn get(&self, i: usize, j: usize) -> f64 { self.values[i][j] }
}

/// Directed Hausdorff distance for every ordered pair of `clouds`, self-pairs
/// included. Each cloud is indexed once and shared across its pairs.
pub fn pairwise_matrix(labels: &[String], clouds: &[Cloud], cfg: &DistanceCfg) -> Result<DistanceMatrix> {
    if labels.len() != clouds.len() {
        return Err(Error::LabelMismatch { labels: labels.len(), clouds: clouds.len() });
    }
    let indices = clouds
        .iter()
        .zip(labels)
        .map(|(c, label)| build_index(c.into(), cfg, label))
        .collect::<Result<Vec<_>>>()?;

    let n = clouds.len();
    let pair = |k: usize| -> f64 {
        let (i, j) = (k / n, k % n);
        let from: CloudView<'_> = (&clouds[i]).into();
        directed_distances(from, indices[j].as_ref(), false).into_iter().fold(0.0, f64::max)
    };
    let flat: Vec<f64> = if cfg.parallel {
        (0..n * n).into_par_iter().map(pair).collect()
    } else {
        (0..n * n).map(pair).collect()
    };

    tracing::debug!(sets = n, pairs = n * n, "pairwise matrix");
    Ok(DistanceMatrix {
        labels: labels.to_vec(),
        values: flat.chunks(n.max(1)).map(|row| row.to_vec()).collect(),
    })
}
