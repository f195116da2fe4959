//! tractdist-nn — exact nearest-point indices for 3D point sets.
//!
//! `GridIndex` hashes points into a uniform grid and answers nearest-point
//! queries by growing Chebyshev shells of cells around the query until no
//! unseen cell can hold anything closer. `BruteIndex` is the O(n) reference.

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use nalgebra::Point3;
use tractdist_core::{dist2, CloudView, Error, Result};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Neighbor { pub idx: usize, pub dist2: f64 }

impl Neighbor {
    pub fn dist(&self) -> f64 { self.dist2.sqrt() }
}

/// Read-only nearest-point queries against a fixed, non-empty point set.
pub trait NearestIndex: Sync {
    /// Exact nearest point to `q`. Ties resolve to an arbitrary candidate.
    fn nearest(&self, q: [f64; 3]) -> Neighbor;
    /// Coordinates of indexed point `i`.
    fn point(&self, i: usize) -> [f64; 3];
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }

    /// (index, point, Euclidean distance) of the nearest indexed point.
    fn find_nearest(&self, q: [f64; 3]) -> (usize, Point3<f64>, f64) {
        let n = self.nearest(q);
        let [px, py, pz] = self.point(n.idx);
        (n.idx, Point3::new(px, py, pz), n.dist())
    }
}

/// Linear scan; exact by construction.
pub struct BruteIndex<'a> {
    pts: CloudView<'a>,
}

impl<'a> BruteIndex<'a> {
    pub fn build(pts: CloudView<'a>) -> Result<Self> {
        if pts.is_empty() { return Err(Error::empty("to index")); }
        Ok(Self { pts })
    }
}

fn scan(pts: &CloudView<'_>, q: [f64; 3]) -> Neighbor {
    let mut best = Neighbor { idx: 0, dist2: dist2(q, pts.point(0)) };
    for j in 1..pts.len() {
        let d2 = dist2(q, pts.point(j));
        if d2 < best.dist2 { best = Neighbor { idx: j, dist2: d2 }; }
    }
    best
}

impl<'a> NearestIndex for BruteIndex<'a> {
    fn nearest(&self, q: [f64; 3]) -> Neighbor { scan(&self.pts, q) }
    fn point(&self, i: usize) -> [f64; 3] { self.pts.point(i) }
    fn len(&self) -> usize { self.pts.len() }
}

/// Uniform grid hash over a point set.
pub struct GridIndex<'a> {
    pts: CloudView<'a>,
    cell: f64,
    inv: f64,
    buckets: HashMap<[i32;3], Vec<usize>>,
    key_min: [i64;3],
    key_max: [i64;3],
}

impl<'a> GridIndex<'a> {
    pub fn build(pts: CloudView<'a>, cell: f64) -> Result<Self> {
        if pts.is_empty() { return Err(Error::empty("to index")); }
        if !cell.is_finite() || cell <= 0.0 { return Err(Error::InvalidCellSize(cell)); }

        let inv = 1.0 / cell;
        let mut buckets: HashMap<[i32;3], Vec<usize>> = HashMap::new();
        let mut key_min = [i64::MAX; 3];
        let mut key_max = [i64::MIN; 3];
        for i in 0..pts.len() {
            let key = key_for(pts.point(i), inv);
            for a in 0..3 {
                key_min[a] = key_min[a].min(key[a] as i64);
                key_max[a] = key_max[a].max(key[a] as i64);
            }
            match buckets.entry(key) {
                Entry::Vacant(v) => { v.insert(vec![i]); }
                Entry::Occupied(mut o) => o.get_mut().push(i),
            }
        }
        tracing::debug!(points = pts.len(), cells = buckets.len(), cell, "grid index built");
        Ok(Self { pts, cell, inv, buckets, key_min, key_max })
    }

    /// Cell size from the bounding-box diagonal over the cube root of the
    /// point count, so occupied cells stay on the order of the point count.
    pub fn auto(pts: CloudView<'a>) -> Result<Self> {
        let bbox = pts.aabb().ok_or_else(|| Error::empty("to index"))?;
        let diag = bbox.diagonal();
        let extent = bbox.min.iter().chain(bbox.max.iter()).fold(0.0f64, |m, v| m.max(v.abs()));
        // floor keeps i32 keys in range for far-off coordinates
        let floor = (extent * 1e-9).max(1e-9);
        let cell = (diag / (pts.len() as f64).cbrt()).max(floor);
        Self::build(pts, cell)
    }

    pub fn cell(&self) -> f64 { self.cell }
    pub fn occupied_cells(&self) -> usize { self.buckets.len() }

    /// Number of cells in the cube of half-width `layer` around `base`,
    /// clipped to the occupied key range.
    fn clipped_cube(&self, base: [i64;3], layer: i64) -> u128 {
        if layer < 0 { return 0; }
        (0..3).map(|a| {
            let lo = (base[a] - layer).max(self.key_min[a]);
            let hi = (base[a] + layer).min(self.key_max[a]);
            if hi < lo { 0 } else { (hi - lo + 1) as u128 }
        }).product()
    }

    fn visit_shell(&self, base: [i64;3], layer: i64, q: [f64;3], best: &mut Option<Neighbor>) {
        let lo = |a: usize| (base[a] - layer).max(self.key_min[a]);
        let hi = |a: usize| (base[a] + layer).min(self.key_max[a]);
        for kx in lo(0)..=hi(0) {
            let on_x = (kx - base[0]).abs() == layer;
            for ky in lo(1)..=hi(1) {
                let on_xy = on_x || (ky - base[1]).abs() == layer;
                let mut visit = |kz: i64| {
                    let key = [kx as i32, ky as i32, kz as i32];
                    if let Some(bin) = self.buckets.get(&key) {
                        for &j in bin {
                            let d2 = dist2(q, self.pts.point(j));
                            if best.map_or(true, |b| d2 < b.dist2) {
                                *best = Some(Neighbor { idx: j, dist2: d2 });
                            }
                        }
                    }
                };
                if on_xy {
                    for kz in lo(2)..=hi(2) { visit(kz); }
                } else {
                    // interior column: only the two z faces belong to the shell
                    let (zl, zh) = (base[2] - layer, base[2] + layer);
                    if zl >= self.key_min[2] && zl <= self.key_max[2] { visit(zl); }
                    if zh != zl && zh >= self.key_min[2] && zh <= self.key_max[2] { visit(zh); }
                }
            }
        }
    }
}

#[inline]
fn key_for(p: [f64;3], inv: f64) -> [i32;3] {
    [
        (p[0] * inv).floor() as i32,
        (p[1] * inv).floor() as i32,
        (p[2] * inv).floor() as i32,
    ]
}

impl<'a> NearestIndex for GridIndex<'a> {
    fn nearest(&self, q: [f64; 3]) -> Neighbor {
        let k = key_for(q, self.inv);
        let base = [k[0] as i64, k[1] as i64, k[2] as i64];

        // shells closer than `first` lie wholly outside the occupied range;
        // beyond `last` every occupied cell has been seen
        let mut first = 0i64;
        let mut last = 0i64;
        for a in 0..3 {
            first = first.max(self.key_min[a] - base[a]).max(base[a] - self.key_max[a]);
            last = last.max((base[a] - self.key_min[a]).abs()).max((self.key_max[a] - base[a]).abs());
        }

        let mut best: Option<Neighbor> = None;
        for layer in first..=last {
            let shell = self.clipped_cube(base, layer) - self.clipped_cube(base, layer - 1);
            if shell > self.buckets.len() as u128 {
                // sparse grid relative to the shell: a flat scan is cheaper
                return scan(&self.pts, q);
            }
            self.visit_shell(base, layer, q, &mut best);
            if let Some(b) = best {
                // any unseen point is in a cell at least `layer` cells away
                let reach = layer as f64 * self.cell;
                if b.dist2 <= reach * reach { return b; }
            }
        }
        best.unwrap_or_else(|| scan(&self.pts, q))
    }

    fn point(&self, i: usize) -> [f64; 3] { self.pts.point(i) }
    fn len(&self) -> usize { self.pts.len() }
}
