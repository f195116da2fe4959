//! tractdist-io — load tract point sets from legacy VTK polydata or PLY,
//! and write them back with per-point scalar fields attached.

use anyhow::{bail, Context, Result};
use std::io::Read;
use tractdist_core::Cloud;

mod ply;
mod vtk;

pub use ply::{read_ply, write_ply_ascii};
pub use vtk::{parse_vtk, read_vtk, write_vtk_ascii};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format { Vtk, Ply }

impl Format {
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".vtk") { return Some(Format::Vtk); }
        if lower.ends_with(".ply") { return Some(Format::Ply); }
        None
    }
}

/// Peek at the first bytes for a file with no recognized extension.
fn sniff(path: &str) -> Result<Option<Format>> {
    let mut head = [0u8; 16];
    let mut f = std::fs::File::open(path).with_context(|| format!("open {}", path))?;
    let n = f.read(&mut head)?;
    let head = &head[..n];
    if head.starts_with(b"# vtk") { return Ok(Some(Format::Vtk)); }
    if head.starts_with(b"ply") { return Ok(Some(Format::Ply)); }
    Ok(None)
}

pub fn read_auto(path: &str) -> Result<Cloud> {
    let format = match Format::from_path(path) {
        Some(f) => f,
        None => match sniff(path)? {
            Some(f) => f,
            None => bail!("unsupported file {} (expected legacy .vtk polydata or .ply)", path),
        },
    };
    match format {
        Format::Vtk => read_vtk(path),
        Format::Ply => read_ply(path),
    }
}

/// Write by extension; anything that is not `.ply` gets VTK.
pub fn write_auto(path: &str, cloud: &Cloud) -> Result<()> {
    match Format::from_path(path) {
        Some(Format::Ply) => write_ply_ascii(path, cloud),
        _ => write_vtk_ascii(path, cloud),
    }
}
