use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;

use benchsimp::runner::run_directory;
use benchsimp::simplify::db::{Basis, CircuitDb};
use benchsimp::simplify::SimplifyContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BasisArg {
    #[value(name = "AIG")]
    Aig,
    #[value(name = "BENCH")]
    Bench,
}

impl From<BasisArg> for Basis {
    fn from(arg: BasisArg) -> Basis {
        match arg {
            BasisArg::Aig => Basis::Aig,
            BasisArg::Bench => Basis::Bench,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "benchsimp")]
#[command(about = "Simplifies .bench circuits against a small-circuit database")]
struct Cli {
    /// Directory with input .bench files.
    input_path: PathBuf,

    /// Directory for the simplified circuits; created if absent. Without
    /// it, circuits are printed to stdout with id annotations.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path for the statistics CSV.
    #[arg(short, long, value_name = "FILE")]
    statistics: Option<PathBuf>,

    /// Operator basis of the input circuits.
    #[arg(short, long, default_value = "BENCH")]
    basis: BasisArg,

    /// Directory with the subcircuit databases.
    #[arg(short, long, default_value = "databases")]
    databases: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let basis = Basis::from(cli.basis);

    let db_path = cli.databases.join(basis.database_file_name());
    let start = std::time::Instant::now();
    let database = CircuitDb::load(&db_path, basis)?;
    debug!(
        "loaded {} database records from {} in {:.3}s",
        database.len(),
        db_path.display(),
        start.elapsed().as_secs_f64()
    );

    let mut ctx = SimplifyContext::new();
    ctx.set_database(basis, database);

    run_directory(
        &cli.input_path,
        cli.output.as_deref(),
        cli.statistics.as_deref(),
        basis,
        &mut ctx,
    )?;
    Ok(())
}
