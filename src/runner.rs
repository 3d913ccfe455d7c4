//! Per-file simplification driver and the statistics CSV writer.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::{error, info};

use crate::circuit::bench::{parse_bench_reader, print_annotated, write_bench};
use crate::simplify::db::Basis;
use crate::simplify::strategy::simplification_pipeline;
use crate::simplify::{RunStats, SimplifyContext, Transformer, MAX_TRACKED_ITERATIONS};

/// One CSV row: sizes and timing of a processed circuit plus the
/// minimizer's per-iteration counters.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub path: String,
    pub gates_before: usize,
    pub gates_after: usize,
    pub simplify_secs: f64,
    pub stats: RunStats,
}

impl StatsRow {
    pub fn csv_header() -> String {
        let mut header = String::from("File path,Gates before,Gates after,Simplify time");
        for group in [
            "subcircuits_number",
            "skipped_subcircuits",
            "max_subcircuits_size",
            "circuit_size",
        ] {
            for i in 0..MAX_TRACKED_ITERATIONS {
                header.push_str(&format!(",{}_{}", group, i));
            }
        }
        header.push_str(",iter_number,total_gates_in_subcircuits");
        header
    }

    pub fn to_csv_line(&self) -> String {
        let mut line = format!(
            "{},{},{},{:.3}",
            esc_csv(&self.path),
            self.gates_before,
            self.gates_after,
            self.simplify_secs
        );
        for group in [
            &self.stats.subcircuits_by_iter,
            &self.stats.skipped_subcircuits_by_iter,
            &self.stats.max_subcircuit_size_by_iter,
            &self.stats.circuit_size_by_iter,
        ] {
            for value in group.iter() {
                line.push_str(&format!(",{}", value));
            }
        }
        line.push_str(&format!(
            ",{},{}",
            self.stats.iterations, self.stats.total_gates_in_subcircuits
        ));
        line
    }
}

/// Simplifies a single BENCH file. The result is written into `output_dir`
/// under the original file name, or pretty-printed to stdout with id
/// annotations when no directory is configured.
pub fn process_file(
    path: &Path,
    output_dir: Option<&Path>,
    basis: Basis,
    ctx: &mut SimplifyContext,
) -> Result<StatsRow> {
    let file =
        File::open(path).with_context(|| format!("cannot open circuit {}", path.display()))?;
    let parsed = parse_bench_reader(BufReader::new(file))
        .with_context(|| format!("cannot parse circuit {}", path.display()))?;

    let gates_before = parsed.circuit.gate_count();
    ctx.stats.clear();
    let start = Instant::now();
    let (circuit, encoder) =
        simplification_pipeline(basis).transform(parsed.circuit, parsed.encoder, ctx)?;
    let simplify_secs = start.elapsed().as_secs_f64();
    let gates_after = circuit.gate_count();

    match output_dir {
        Some(dir) => {
            let file_name = path.file_name().context("input path has no file name")?;
            let out_path = dir.join(file_name);
            let mut out = BufWriter::new(
                File::create(&out_path)
                    .with_context(|| format!("cannot create {}", out_path.display()))?,
            );
            write_bench(&circuit, &encoder, &mut out)?;
            out.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            print_annotated(&circuit, &encoder, &mut lock)?;
        }
    }

    Ok(StatsRow {
        path: path.to_string_lossy().into_owned(),
        gates_before,
        gates_after,
        simplify_secs,
        stats: ctx.stats.clone(),
    })
}

/// Runs the pipeline over every `.bench` file of a directory. An I/O
/// failure on one circuit is logged and skipped; a malformed circuit or a
/// violated invariant aborts the whole run.
pub fn run_directory(
    input_dir: &Path,
    output_dir: Option<&Path>,
    stats_path: Option<&Path>,
    basis: Basis,
    ctx: &mut SimplifyContext,
) -> Result<Vec<StatsRow>> {
    let paths = discover_bench_paths(input_dir)?;

    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create output directory {}", dir.display()))?;
    }
    let mut csv = match stats_path {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("cannot create statistics file {}", path.display()))?;
            writeln!(file, "{}", StatsRow::csv_header())?;
            Some(file)
        }
        None => None,
    };

    let mut rows = Vec::new();
    for path in paths {
        info!("processing benchmark {}", path.display());
        let row = match process_file(&path, output_dir, basis, ctx) {
            Ok(row) => row,
            Err(err) => {
                let io_failure = err
                    .chain()
                    .any(|cause| cause.downcast_ref::<std::io::Error>().is_some());
                if io_failure {
                    error!("skipping {}: {:#}", path.display(), err);
                    continue;
                }
                return Err(err);
            }
        };
        if let Some(csv) = csv.as_mut() {
            writeln!(csv, "{}", row.to_csv_line())?;
            csv.flush()?;
        }
        rows.push(row);
    }
    Ok(rows)
}

fn discover_bench_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("cannot read input directory {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("bench") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn esc_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
