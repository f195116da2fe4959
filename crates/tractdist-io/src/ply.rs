//! PLY vertex clouds via ply-rs. Only the `vertex` element is read.

use anyhow::{anyhow, bail, Context, Result};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Ply, Property};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use tractdist_core::Cloud;

pub fn read_ply(path: &str) -> Result<Cloud> {
    let f = File::open(path).with_context(|| format!("open {}", path))?;
    let mut reader = BufReader::new(f);
    let parser = Parser::<DefaultElement>::new();
    let ply: Ply<DefaultElement> = parser.read_ply(&mut reader).with_context(|| format!("parse {}", path))?;

    let vertex = ply.payload.get("vertex")
        .ok_or_else(|| anyhow!("PLY missing 'vertex' element"))?;

    let mut c = Cloud::default();
    c.reserve(vertex.len());

    for el in vertex {
        let x = get_f64(el, "x")?;
        let y = get_f64(el, "y")?;
        let z = get_f64(el, "z")?;
        c.push(x, y, z);
        let idx = c.len() - 1;

        for (k, prop) in el.iter() {
            if matches!(k.as_str(), "x" | "y" | "z") { continue; }
            let Some(val) = scalar(prop) else { continue };
            let col = c.attrs.entry(k.clone()).or_default();
            // keep columns aligned if a property shows up late
            if col.len() < idx { col.resize(idx, 0.0); }
            col.push(val);
        }
    }
    let n = c.len();
    for col in c.attrs.values_mut() { col.resize(n, 0.0); }
    tracing::debug!(path, points = n, "read ply");
    Ok(c)
}

fn scalar(p: &Property) -> Option<f64> {
    Some(match *p {
        Property::Char(v) => v as f64,
        Property::UChar(v) => v as f64,
        Property::Short(v) => v as f64,
        Property::UShort(v) => v as f64,
        Property::Int(v) => v as f64,
        Property::UInt(v) => v as f64,
        Property::Float(v) => v as f64,
        Property::Double(v) => v,
        _ => return None,
    })
}

fn get_f64(el: &DefaultElement, key: &str) -> Result<f64> {
    match el.get(key) {
        Some(p) => scalar(p).ok_or_else(|| anyhow!("property '{}' not scalar", key)),
        None => bail!("missing property '{}'", key),
    }
}

/// ASCII PLY with x y z followed by every full-length attribute, name-sorted.
pub fn write_ply_ascii(path: &str, cloud: &Cloud) -> Result<()> {
    let n = cloud.len();
    let mut w = BufWriter::new(File::create(path).with_context(|| format!("create {}", path))?);

    let mut keys: Vec<&str> = cloud
        .attrs
        .iter()
        .filter_map(|(k, v)| if v.len() == n { Some(k.as_str()) } else { None })
        .collect();
    keys.sort();

    writeln!(w, "ply")?;
    writeln!(w, "format ascii 1.0")?;
    writeln!(w, "element vertex {}", n)?;
    writeln!(w, "property double x")?;
    writeln!(w, "property double y")?;
    writeln!(w, "property double z")?;
    for k in &keys {
        writeln!(w, "property double {}", k)?;
    }
    writeln!(w, "end_header")?;

    for i in 0..n {
        write!(w, "{} {} {}", cloud.x[i], cloud.y[i], cloud.z[i])?;
        for k in &keys {
            write!(w, " {}", cloud.attrs[*k][i])?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}
