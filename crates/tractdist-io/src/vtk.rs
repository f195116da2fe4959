//! Legacy VTK polydata (`# vtk DataFile Version x.y`), ASCII and BINARY.
//!
//! Reads POINTS, LINES (both the classic `n size` layout and the 5.x
//! OFFSETS/CONNECTIVITY layout) and single-component point scalars
//! (SCALARS and FIELD arrays). Other cell kinds and attributes are skipped.

use anyhow::{anyhow, bail, ensure, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use tractdist_core::Cloud;

pub fn read_vtk(path: &str) -> Result<Cloud> {
    let bytes = std::fs::read(path).with_context(|| format!("open {}", path))?;
    let cloud = parse_vtk(&bytes).with_context(|| format!("parse {}", path))?;
    tracing::debug!(path, points = cloud.len(), lines = cloud.lines.len(), "read vtk");
    Ok(cloud)
}

struct Cursor<'a> { buf: &'a [u8], pos: usize, binary: bool }

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool { self.pos >= self.buf.len() }
    fn remaining(&self) -> usize { self.buf.len().saturating_sub(self.pos) }

    /// Raw line, without the terminator.
    fn line(&mut self) -> Result<&'a str> {
        ensure!(!self.at_end(), "unexpected end of file");
        let rest = &self.buf[self.pos..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        self.pos += (end + 1).min(rest.len());
        let s = std::str::from_utf8(&rest[..end]).map_err(|_| anyhow!("non-text header line"))?;
        Ok(s.trim_end_matches('\r'))
    }

    fn skip_ws(&mut self) {
        while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_whitespace() { self.pos += 1; }
    }

    /// Next non-blank line split into words; None at end of file.
    fn header(&mut self) -> Result<Option<Vec<&'a str>>> {
        self.skip_ws();
        if self.at_end() { return Ok(None); }
        Ok(Some(self.line()?.split_whitespace().collect()))
    }

    /// True if the next non-blank bytes spell `kw`; consumes nothing.
    fn peek_keyword(&self, kw: &str) -> bool {
        let mut p = self.pos;
        while p < self.buf.len() && self.buf[p].is_ascii_whitespace() { p += 1; }
        self.buf.get(p..p + kw.len()).map(|b| b.eq_ignore_ascii_case(kw.as_bytes())).unwrap_or(false)
    }

    fn token(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.buf.len() && !self.buf[self.pos].is_ascii_whitespace() { self.pos += 1; }
        ensure!(self.pos > start, "unexpected end of file");
        std::str::from_utf8(&self.buf[start..self.pos]).map_err(|_| anyhow!("non-text value"))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        ensure!(n <= self.remaining(), "truncated binary block ({} bytes wanted, {} left)", n, self.remaining());
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    /// `count` values of VTK type `dtype`, widened to f64.
    fn values(&mut self, count: usize, dtype: &str) -> Result<Vec<f64>> {
        if !self.binary {
            // every ASCII value takes at least one byte, so this never over-reserves
            let mut out = Vec::with_capacity(count.min(self.remaining()));
            for _ in 0..count {
                let t = self.token()?;
                out.push(t.parse::<f64>().with_context(|| format!("bad number '{}'", t))?);
            }
            return Ok(out);
        }
        let width = type_width(dtype)?;
        let raw = self.take(product(count, width, "binary block size")?)?;
        let mut out = Vec::with_capacity(count);
        for c in raw.chunks_exact(width) {
            out.push(decode_be(c, dtype));
        }
        Ok(out)
    }
}

fn type_width(dtype: &str) -> Result<usize> {
    Ok(match dtype.to_ascii_lowercase().as_str() {
        "char" | "unsigned_char" | "vtktypeint8" | "vtktypeuint8" => 1,
        "short" | "unsigned_short" | "vtktypeint16" | "vtktypeuint16" => 2,
        "int" | "unsigned_int" | "float" | "vtktypeint32" | "vtktypeuint32" | "vtktypefloat32" => 4,
        "long" | "unsigned_long" | "double" | "vtkidtype" | "vtktypeint64" | "vtktypeuint64" | "vtktypefloat64" => 8,
        other => bail!("unsupported VTK data type '{}'", other),
    })
}

fn decode_be(c: &[u8], dtype: &str) -> f64 {
    let lower = dtype.to_ascii_lowercase();
    let unsigned = lower.starts_with("unsigned") || lower.contains("uint");
    let float = lower == "float" || lower == "double" || lower.contains("float");
    match (c.len(), float, unsigned) {
        (1, _, true) => c[0] as f64,
        (1, _, false) => c[0] as i8 as f64,
        (2, _, true) => u16::from_be_bytes([c[0], c[1]]) as f64,
        (2, _, false) => i16::from_be_bytes([c[0], c[1]]) as f64,
        (4, true, _) => f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64,
        (4, false, true) => u32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64,
        (4, false, false) => i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64,
        (_, true, _) => f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]),
        (_, false, true) => u64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f64,
        (_, false, false) => i64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f64,
    }
}

fn count(word: Option<&&str>, what: &str) -> Result<usize> {
    let w = word.ok_or_else(|| anyhow!("{} missing", what))?;
    w.parse::<usize>().with_context(|| format!("bad {} '{}'", what, w))
}

/// Header-declared sizes are untrusted; reject products that overflow.
fn product(a: usize, b: usize, what: &str) -> Result<usize> {
    a.checked_mul(b).ok_or_else(|| anyhow!("{} overflows ({} x {})", what, a, b))
}

fn index(v: f64, n_points: usize) -> Result<u32> {
    ensure!(v >= 0.0 && (v as usize) < n_points, "cell references point {} of {}", v, n_points);
    Ok(v as u32)
}

/// Cell section after its `KEYWORD n size` line.
fn read_cells(cur: &mut Cursor<'_>, n: usize, size: usize, n_points: usize) -> Result<Vec<Vec<u32>>> {
    // 5.x layout: OFFSETS <type> / CONNECTIVITY <type>, n is the offsets count
    if cur.peek_keyword("OFFSETS") {
        let h = cur.header()?.unwrap_or_default();
        let offsets = cur.values(n, h.get(1).copied().unwrap_or("vtktypeint64"))?;
        let conn_h = cur.header()?.ok_or_else(|| anyhow!("CONNECTIVITY missing"))?;
        ensure!(conn_h.first().map(|w| w.eq_ignore_ascii_case("CONNECTIVITY")).unwrap_or(false),
            "expected CONNECTIVITY, found '{}'", conn_h.join(" "));
        let conn = cur.values(size, conn_h.get(1).copied().unwrap_or("vtktypeint64"))?;
        let mut cells = Vec::with_capacity(offsets.len().saturating_sub(1));
        for w in offsets.windows(2) {
            let (lo, hi) = (w[0] as usize, w[1] as usize);
            ensure!(lo <= hi && hi <= conn.len(), "bad cell offsets {}..{}", lo, hi);
            cells.push(conn[lo..hi].iter().map(|&v| index(v, n_points)).collect::<Result<Vec<_>>>()?);
        }
        return Ok(cells);
    }

    let flat = cur.values(size, "int")?;
    let mut cells = Vec::with_capacity(n.min(flat.len()));
    let mut k = 0usize;
    for _ in 0..n {
        ensure!(k < flat.len(), "cell list shorter than its declared size");
        let len = flat[k] as usize;
        ensure!(len < flat.len() - k, "cell list shorter than its declared size");
        cells.push(flat[k + 1..k + 1 + len].iter().map(|&v| index(v, n_points)).collect::<Result<Vec<_>>>()?);
        k += 1 + len;
    }
    Ok(cells)
}

fn decode_name(s: &str) -> String { s.replace("%20", " ") }
fn encode_name(s: &str) -> String { s.replace(char::is_whitespace, "%20") }

#[derive(Clone, Copy, PartialEq)]
enum Section { Geometry, Points(usize), Cells(usize) }

pub fn parse_vtk(bytes: &[u8]) -> Result<Cloud> {
    let mut cur = Cursor { buf: bytes, pos: 0, binary: false };
    let magic = cur.line()?;
    ensure!(magic.starts_with("# vtk DataFile"), "not a legacy VTK file");
    let _title = cur.line()?;
    let format = cur.line()?.trim();
    cur.binary = match format.to_ascii_uppercase().as_str() {
        "ASCII" => false,
        "BINARY" => true,
        other => bail!("unknown VTK format '{}'", other),
    };
    let ds = cur.header()?.ok_or_else(|| anyhow!("DATASET line missing"))?;
    ensure!(ds.len() >= 2 && ds[0].eq_ignore_ascii_case("DATASET"), "expected DATASET, found '{}'", ds.join(" "));
    ensure!(ds[1].eq_ignore_ascii_case("POLYDATA"), "unsupported dataset '{}' (expected POLYDATA)", ds[1]);

    let mut cloud = Cloud::default();
    let mut section = Section::Geometry;

    while let Some(h) = cur.header()? {
        let key = h[0].to_ascii_uppercase();
        match key.as_str() {
            "POINTS" => {
                let n = count(h.get(1), "point count")?;
                let dtype = h.get(2).copied().unwrap_or("float");
                let v = cur.values(product(n, 3, "point coordinate count")?, dtype)?;
                cloud.reserve(n);
                for p in v.chunks_exact(3) { cloud.push(p[0], p[1], p[2]); }
            }
            "VERTICES" | "LINES" | "POLYGONS" | "TRIANGLE_STRIPS" => {
                let n = count(h.get(1), "cell count")?;
                let size = count(h.get(2), "cell list size")?;
                let cells = read_cells(&mut cur, n, size, cloud.len())?;
                if key == "LINES" { cloud.lines.extend(cells); }
            }
            "POINT_DATA" => section = Section::Points(count(h.get(1), "point data count")?),
            "CELL_DATA" => section = Section::Cells(count(h.get(1), "cell data count")?),
            "SCALARS" => {
                let name = decode_name(h.get(1).copied().unwrap_or("scalars"));
                let dtype = h.get(2).copied().unwrap_or("float");
                let ncomp = h.get(3).map(|w| w.parse::<usize>()).transpose()?.unwrap_or(1);
                // LOOKUP_TABLE line is optional
                if cur.peek_keyword("LOOKUP_TABLE") { cur.header()?; }
                let n = tuples(section)?;
                let vals = cur.values(product(n, ncomp, "scalar value count")?, dtype)?;
                if matches!(section, Section::Points(_)) && ncomp == 1 {
                    cloud.set_attr(&name, vals);
                }
            }
            "VECTORS" | "NORMALS" => {
                cur.values(product(tuples(section)?, 3, "vector value count")?, h.get(2).copied().unwrap_or("float"))?;
            }
            "TENSORS" => {
                cur.values(product(tuples(section)?, 9, "tensor value count")?, h.get(2).copied().unwrap_or("float"))?;
            }
            "TEXTURE_COORDINATES" => {
                let dim = count(h.get(2), "texture dimension")?;
                cur.values(product(dim, tuples(section)?, "texture value count")?, h.get(3).copied().unwrap_or("float"))?;
            }
            "COLOR_SCALARS" => {
                let ncomp = count(h.get(2), "color components")?;
                let dtype = if cur.binary { "unsigned_char" } else { "float" };
                cur.values(product(ncomp, tuples(section)?, "color value count")?, dtype)?;
            }
            "LOOKUP_TABLE" => {
                let size = count(h.get(2), "lookup table size")?;
                let dtype = if cur.binary { "unsigned_char" } else { "float" };
                cur.values(product(size, 4, "lookup table value count")?, dtype)?;
            }
            "FIELD" => {
                let arrays = count(h.get(2), "field array count")?;
                for _ in 0..arrays {
                    let a = cur.header()?.ok_or_else(|| anyhow!("FIELD array header missing"))?;
                    let name = decode_name(a.first().copied().unwrap_or("field"));
                    let ncomp = count(a.get(1), "field components")?;
                    let ntup = count(a.get(2), "field tuples")?;
                    let vals = cur.values(product(ncomp, ntup, "field value count")?, a.get(3).copied().unwrap_or("float"))?;
                    if ncomp == 1 && matches!(section, Section::Points(n) if n == ntup) {
                        cloud.set_attr(&name, vals);
                    }
                }
            }
            "METADATA" => {
                // INFORMATION/COMPONENT_NAMES blocks end at a blank line
                while !cur.at_end() {
                    if cur.line()?.trim().is_empty() { break; }
                }
            }
            _ => {
                tracing::debug!(keyword = %h[0], "stopping at unsupported VTK section");
                break;
            }
        }
    }

    Ok(cloud)
}

fn tuples(section: Section) -> Result<usize> {
    match section {
        Section::Points(n) | Section::Cells(n) => Ok(n),
        Section::Geometry => bail!("attribute data before POINT_DATA/CELL_DATA"),
    }
}

/// ASCII legacy polydata with every full-length attribute as point SCALARS.
pub fn write_vtk_ascii(path: &str, cloud: &Cloud) -> Result<()> {
    let n = cloud.len();
    let mut w = BufWriter::new(File::create(path).with_context(|| format!("create {}", path))?);

    writeln!(w, "# vtk DataFile Version 3.0")?;
    writeln!(w, "tractdist")?;
    writeln!(w, "ASCII")?;
    writeln!(w, "DATASET POLYDATA")?;
    writeln!(w, "POINTS {} double", n)?;
    for i in 0..n {
        writeln!(w, "{} {} {}", cloud.x[i], cloud.y[i], cloud.z[i])?;
    }

    if !cloud.lines.is_empty() {
        let size: usize = cloud.lines.iter().map(|l| l.len() + 1).sum();
        writeln!(w, "LINES {} {}", cloud.lines.len(), size)?;
        for l in &cloud.lines {
            write!(w, "{}", l.len())?;
            for i in l { write!(w, " {}", i)?; }
            writeln!(w)?;
        }
    }

    let mut keys: Vec<&str> = cloud.attrs.iter()
        .filter_map(|(k, v)| if v.len() == n { Some(k.as_str()) } else { None })
        .collect();
    keys.sort();
    if !keys.is_empty() {
        writeln!(w, "POINT_DATA {}", n)?;
        for k in keys {
            writeln!(w, "SCALARS {} double 1", encode_name(k))?;
            writeln!(w, "LOOKUP_TABLE default")?;
            for v in &cloud.attrs[k] { writeln!(w, "{}", v)?; }
        }
    }
    w.flush()?;
    Ok(())
}
