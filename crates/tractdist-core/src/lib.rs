//! tractdist-core — point-set data model and the shared error type.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the index and distance crates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("point set {which} is empty")]
    EmptySet { which: String },

    #[error("grid cell size must be finite and positive, got {0}")]
    InvalidCellSize(f64),

    #[error("{labels} labels given for {clouds} point sets")]
    LabelMismatch { labels: usize, clouds: usize },
}

impl Error {
    pub fn empty(which: impl Into<String>) -> Self { Error::EmptySet { which: which.into() } }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structure-of-Arrays point set (one tract's vertex cloud).
/// Hot columns (x,y,z) stay tight; polylines and per-point scalars ride alongside.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct Cloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,

    /// Polyline topology as point-index lists. Ignored by distance code.
    pub lines: Vec<Vec<u32>>,

    /// Named per-point scalars (same length as x/y/z), e.g. "distance", "FA".
    pub attrs: HashMap<String, Vec<f64>>,
}

impl Cloud {
    pub fn len(&self) -> usize { self.x.len() }
    pub fn is_empty(&self) -> bool { self.x.is_empty() }
    pub fn push(&mut self, px: f64, py: f64, pz: f64) {
        self.x.push(px); self.y.push(py); self.z.push(pz);
    }
    pub fn reserve(&mut self, n: usize) {
        self.x.reserve(n); self.y.reserve(n); self.z.reserve(n);
        for v in self.attrs.values_mut() { v.reserve(n); }
    }
    pub fn point(&self, i: usize) -> [f64; 3] { [self.x[i], self.y[i], self.z[i]] }

    /// Attach (or replace) a per-point scalar field.
    /// Returns false and leaves the cloud untouched if the length is wrong.
    pub fn set_attr(&mut self, name: &str, values: Vec<f64>) -> bool {
        if values.len() != self.len() { return false; }
        self.attrs.insert(name.to_string(), values);
        true
    }

    pub fn aabb(&self) -> Option<Aabb> { CloudView::from(self).aabb() }
}

impl FromIterator<[f64; 3]> for Cloud {
    fn from_iter<I: IntoIterator<Item = [f64; 3]>>(iter: I) -> Self {
        let mut c = Cloud::default();
        for [px, py, pz] in iter { c.push(px, py, pz); }
        c
    }
}

/// Zero-copy view into a Cloud (slice-of-SoA).
#[derive(Copy, Clone, Debug)]
pub struct CloudView<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub z: &'a [f64],
}

impl<'a> From<&'a Cloud> for CloudView<'a> {
    fn from(c: &'a Cloud) -> Self { Self { x: &c.x, y: &c.y, z: &c.z } }
}

impl<'a> CloudView<'a> {
    pub fn len(&self) -> usize { self.x.len() }
    pub fn is_empty(&self) -> bool { self.x.is_empty() }
    #[inline]
    pub fn point(&self, i: usize) -> [f64; 3] { [self.x[i], self.y[i], self.z[i]] }

    pub fn aabb(&self) -> Option<Aabb> {
        if self.is_empty() { return None; }
        let mut b = Aabb { min: [f64::INFINITY; 3], max: [f64::NEG_INFINITY; 3] };
        for i in 0..self.len() { b.grow(self.point(i)); }
        Some(b)
    }
}

#[inline]
pub fn dist2(a: [f64; 3], b: [f64; 3]) -> f64 {
    (b[0]-a[0]).powi(2) + (b[1]-a[1]).powi(2) + (b[2]-a[2]).powi(2)
}

/// Simple AABB
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb { pub min: [f64;3], pub max: [f64;3] }
impl Aabb {
    pub fn grow(&mut self, p: [f64;3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }
    pub fn diagonal(&self) -> f64 { dist2(self.min, self.max).sqrt() }
}
