use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use tractdist_core::Cloud;
use tractdist_nn::GridIndex;
use tractdist_metrics::{
    pairwise_matrix, symmetric_distance, DirectedProfile, DistanceCfg, DistanceMatrix, DistanceSummary,
    IndexBackend,
};

// ---------- helpers ----------

fn lap(t: Instant, label: &str) {
    let ms = t.elapsed().as_secs_f64() * 1000.0;
    tracing::debug!("[{label}] {ms:.1} ms");
}

fn load(path: &str) -> Result<Cloud> {
    let t = Instant::now();
    let c = tractdist_io::read_auto(path)?;
    lap(t, &format!("read {path}"));
    Ok(c)
}

fn print_profile(label: &str, p: &DirectedProfile) {
    println!("{label}: n={}  max={:.6}  mean={:.6}  rmse={:.6}  p50={:.6}  p95={:.6}",
             p.count, p.max, p.mean, p.rmse, p.p50, p.p95);
}

fn init_logging(verbose: u8) {
    let default = match verbose { 0 => "info", 1 => "debug", _ => "trace" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ---------- CLI ----------

#[derive(Parser)]
#[command(name = "tractdist", version, about = "Nearest-point distances between fiber tracts")]
struct Args {
    /// -v for debug, -vv for trace (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::Args, Clone)]
struct IndexOpts {
    /// grid cell size (default: derived from each tract's extent)
    #[arg(long)] cell: Option<f64>,
    /// brute-force nearest search instead of the grid
    #[arg(long)] brute: bool,
    /// single-threaded
    #[arg(long)] sequential: bool,
}

impl IndexOpts {
    fn cfg(&self, field: Option<&str>) -> DistanceCfg {
        let mut cfg = DistanceCfg {
            cell: self.cell,
            backend: if self.brute { IndexBackend::Brute } else { IndexBackend::Grid },
            parallel: !self.sequential,
            ..Default::default()
        };
        if let Some(f) = field { cfg.field = f.to_string(); }
        cfg
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Print point / polyline counts and bounds of a tract file (.vtk / .ply)
    Info { input: String },

    /// Symmetric nearest-point distance between two tracts; headline is max(A→B)
    Distance {
        a: String,
        b: String,
        /// write A with its per-point distances attached
        #[arg(long)] annotate_a: Option<String>,
        /// write B with its per-point distances attached
        #[arg(long)] annotate_b: Option<String>,
        /// scalar field name used for annotations
        #[arg(long, default_value = tractdist_metrics::DEFAULT_FIELD)] field: String,
        /// print the full report as JSON
        #[arg(long)] json: bool,
        #[command(flatten)] index: IndexOpts,
    },

    /// Directed Hausdorff distance for every ordered pair of inputs
    Matrix {
        #[arg(required = true)] inputs: Vec<String>,
        #[arg(long)] json: bool,
        #[command(flatten)] index: IndexOpts,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    match args.cmd {
        Cmd::Info { input } => cmd_info(&input),
        Cmd::Distance { a, b, annotate_a, annotate_b, field, json, index } =>
            cmd_distance(&a, &b, annotate_a.as_deref(), annotate_b.as_deref(), &index.cfg(Some(&field)), json),
        Cmd::Matrix { inputs, json, index } => cmd_matrix(&inputs, &index.cfg(None), json),
    }
}

// ---------- commands ----------

fn cmd_info(path: &str) -> Result<()> {
    let cloud = load(path)?;
    println!("points: {}", cloud.len());
    println!("polylines: {}", cloud.lines.len());
    if let Some(b) = cloud.aabb() {
        println!("bounds: min={:?} max={:?}", b.min, b.max);
        let grid = GridIndex::auto((&cloud).into())?;
        println!("grid: cell={:.6}  occupied cells={}", grid.cell(), grid.occupied_cells());
    }
    let mut fields: Vec<&String> = cloud.attrs.keys().collect();
    fields.sort();
    if !fields.is_empty() { println!("fields: {:?}", fields); }
    Ok(())
}

#[derive(Serialize)]
struct DistanceOut<'a> {
    a: &'a str,
    b: &'a str,
    headline: f64,
    hausdorff: f64,
    summary: DistanceSummary,
    a_to_b: DirectedProfile,
    b_to_a: DirectedProfile,
}

fn cmd_distance(
    a_path: &str, b_path: &str, out_a: Option<&str>, out_b: Option<&str>, cfg: &DistanceCfg, json: bool,
) -> Result<()> {
    let mut a = load(a_path)?;
    let mut b = load(b_path)?;

    let t = Instant::now();
    let report = symmetric_distance((&a).into(), (&b).into(), cfg)?;
    lap(t, "distance");

    let s = report.summary;
    tracing::info!(a = a_path, b = b_path, max_a_to_b = s.max_a_to_b, max_b_to_a = s.max_b_to_a, "tract distance");

    if let Some(out) = out_a {
        ensure!(report.annotate_a(&mut a, &cfg.field), "annotation length mismatch for {}", a_path);
        tractdist_io::write_auto(out, &a)?;
        println!("wrote annotated A -> {}", out);
    }
    if let Some(out) = out_b {
        ensure!(report.annotate_b(&mut b, &cfg.field), "annotation length mismatch for {}", b_path);
        tractdist_io::write_auto(out, &b)?;
        println!("wrote annotated B -> {}", out);
    }

    if json {
        let out = DistanceOut {
            a: a_path, b: b_path,
            headline: s.headline(), hausdorff: s.hausdorff(),
            summary: s, a_to_b: report.a_to_b, b_to_a: report.b_to_a,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("distance A->B (max): {:.6}", s.headline());
        print_profile("A->B", &report.a_to_b);
        print_profile("B->A", &report.b_to_a);
        println!("hausdorff: {:.6}", s.hausdorff());
    }
    Ok(())
}

fn print_matrix(m: &DistanceMatrix) {
    let w = m.labels.iter().map(|l| l.len()).max().unwrap_or(0).max(12);
    print!("{:w$}", "");
    for l in &m.labels { print!("  {:>w$}", l); }
    println!();
    for (i, row) in m.values.iter().enumerate() {
        print!("{:w$}", m.labels[i]);
        for v in row { print!("  {:>w$.6}", v); }
        println!();
    }
}

fn cmd_matrix(inputs: &[String], cfg: &DistanceCfg, json: bool) -> Result<()> {
    let clouds = inputs.iter().map(|p| load(p)).collect::<Result<Vec<_>>>()?;
    let t = Instant::now();
    let m = pairwise_matrix(inputs, &clouds, cfg)?;
    lap(t, "matrix");
    tracing::info!(sets = m.len(), "pairwise matrix done");

    if json {
        println!("{}", serde_json::to_string_pretty(&m)?);
    } else {
        print_matrix(&m);
    }
    Ok(())
}
