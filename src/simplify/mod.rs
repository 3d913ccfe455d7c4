//! Circuit simplification passes and the machinery that composes them.

pub mod coloring;
pub mod constant_reducer;
pub mod db;
pub mod duplicate_gates;
pub mod duplicate_operands;
pub mod minimize;
pub mod redundant;
pub mod reduce_not;
pub mod strategy;

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::circuit::Circuit;
use crate::encoder::Encoder;
use crate::gate::GateInfo;

use self::db::{Basis, CircuitDb};

/// Number of per-iteration statistic slots kept by a run. The shipping
/// pipeline nests the minimizer at most this many times.
pub const MAX_TRACKED_ITERATIONS: usize = 5;

/// Counters the three-input minimizer accumulates over one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub iterations: usize,
    pub subcircuits_by_iter: [i64; MAX_TRACKED_ITERATIONS],
    pub skipped_subcircuits_by_iter: [i64; MAX_TRACKED_ITERATIONS],
    pub max_subcircuit_size_by_iter: [i64; MAX_TRACKED_ITERATIONS],
    pub circuit_size_by_iter: [i64; MAX_TRACKED_ITERATIONS],
    pub total_gates_in_subcircuits: u64,
    pub last_iteration_rewrites: u64,
}

impl RunStats {
    pub fn clear(&mut self) {
        *self = RunStats::default();
    }
}

/// Shared state threaded through every pass of a run: the loaded pattern
/// databases, the minimizer statistics and the PRNG used to mint unique
/// prefixes for synthesized gate names.
#[derive(Debug)]
pub struct SimplifyContext {
    aig_db: Option<CircuitDb>,
    bench_db: Option<CircuitDb>,
    pub stats: RunStats,
    rng: StdRng,
}

impl SimplifyContext {
    pub fn new() -> Self {
        Self {
            aig_db: None,
            bench_db: None,
            stats: RunStats::default(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn set_database(&mut self, basis: Basis, database: CircuitDb) {
        match basis {
            Basis::Aig => self.aig_db = Some(database),
            Basis::Bench => self.bench_db = Some(database),
        }
    }

    pub fn database(&self, basis: Basis) -> Result<&CircuitDb> {
        let db = match basis {
            Basis::Aig => self.aig_db.as_ref(),
            Basis::Bench => self.bench_db.as_ref(),
        };
        match db {
            Some(db) => Ok(db),
            None => bail!("{} subcircuit database is not loaded", basis.as_str()),
        }
    }

    /// Fresh prefix for the names of gates a pass synthesizes. A new tag is
    /// drawn per pass invocation so repeated invocations never collide in
    /// the encoder.
    pub fn fresh_name_prefix(&mut self, pass: &str) -> String {
        let tag: u32 = self.rng.gen_range(100_000_000..1_000_000_000);
        format!("{}::new_gate_{}@", tag, pass)
    }
}

impl Default for SimplifyContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Contract shared by all simplification passes: consume a circuit and its
/// encoder, produce the next pair. Passes that renumber gates return an
/// encoder aligned with the new ids.
pub trait Transformer {
    fn transform(
        &mut self,
        circuit: Circuit,
        encoder: Encoder,
        ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)>;
}

/// Applies passes left to right.
pub struct Composition {
    passes: Vec<Box<dyn Transformer>>,
}

impl Composition {
    pub fn new(passes: Vec<Box<dyn Transformer>>) -> Self {
        Self { passes }
    }
}

impl Transformer for Composition {
    fn transform(
        &mut self,
        circuit: Circuit,
        encoder: Encoder,
        ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)> {
        let mut state = (circuit, encoder);
        for pass in &mut self.passes {
            state = pass.transform(state.0, state.1, ctx)?;
        }
        Ok(state)
    }
}

/// Applies a composition `rounds` times. Fixpoint detection is left to the
/// passes themselves (the minimizer turns itself into a no-op once an
/// iteration stops rewriting).
pub struct Nest {
    rounds: usize,
    inner: Composition,
}

impl Nest {
    pub fn new(rounds: usize, passes: Vec<Box<dyn Transformer>>) -> Self {
        Self {
            rounds,
            inner: Composition::new(passes),
        }
    }
}

impl Transformer for Nest {
    fn transform(
        &mut self,
        circuit: Circuit,
        encoder: Encoder,
        ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)> {
        let mut state = (circuit, encoder);
        for _ in 0..self.rounds {
            state = self.inner.transform(state.0, state.1, ctx)?;
        }
        Ok(state)
    }
}

/// Turns the `Option<GateInfo>` slots passes build up into the final gate
/// list, failing if any slot was left unfilled.
pub(crate) fn collect_gates(slots: Vec<Option<GateInfo>>) -> Result<Vec<GateInfo>> {
    let mut gates = Vec::with_capacity(slots.len());
    for (id, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(info) => gates.push(info),
            None => bail!("internal error: gate slot {} left undefined", id),
        }
    }
    Ok(gates)
}
