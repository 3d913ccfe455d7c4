//! Read-only catalog of optimal small circuits, keyed by the sorted truth
//! tables of a subcircuit's outputs.
//!
//! The file is a whitespace-separated token stream of records:
//!
//! ```text
//! inputs_count outputs_count
//! tt_1 ... tt_k          truth tables, sorted, the lookup key
//! pos_1 ... pos_k        output positions in the record's gate numbering
//! OP a [b]               one gate per position inputs_count.., NOT is unary
//! ...
//! ```
//!
//! A record runs until the largest position mentioned so far is defined.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::gate::GateType;

/// Operator alphabet of a circuit and of the database serving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basis {
    Aig,
    Bench,
}

impl Basis {
    pub fn as_str(self) -> &'static str {
        match self {
            Basis::Aig => "AIG",
            Basis::Bench => "BENCH",
        }
    }

    /// Conventional database file name for the basis.
    pub fn database_file_name(self) -> &'static str {
        match self {
            Basis::Aig => "database_aig.txt",
            Basis::Bench => "database_bench.txt",
        }
    }

    fn allows(self, gate_type: GateType) -> bool {
        match self {
            Basis::Aig => matches!(gate_type, GateType::And | GateType::Not),
            Basis::Bench => matches!(
                gate_type,
                GateType::And
                    | GateType::Not
                    | GateType::Or
                    | GateType::Xor
                    | GateType::Nand
                    | GateType::Nor
                    | GateType::Nxor
            ),
        }
    }
}

/// One stored realization: gates in topological order, positions below
/// `inputs_count` denote the subcircuit inputs.
#[derive(Debug, Clone)]
pub struct DbRecord {
    pub inputs_count: usize,
    /// Output positions, aligned with the sorted truth-table key.
    pub outputs: Vec<usize>,
    pub gate_types: Vec<GateType>,
    pub gate_operands: Vec<Vec<usize>>,
    /// Count of non-NOT gates, the cost the minimizer compares.
    pub binary_gate_count: usize,
}

#[derive(Debug)]
pub struct CircuitDb {
    records: Vec<DbRecord>,
    pattern_to_index: std::collections::HashMap<Vec<u8>, usize>,
}

impl CircuitDb {
    pub fn load(path: &Path, basis: Basis) -> Result<CircuitDb> {
        let file = File::open(path)
            .with_context(|| format!("no subcircuit database at {}", path.display()))?;
        Self::parse(BufReader::new(file), basis)
            .with_context(|| format!("malformed database {}", path.display()))
    }

    pub fn parse<R: BufRead>(mut reader: R, basis: Basis) -> Result<CircuitDb> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .context("failed to read database stream")?;
        let mut tokens = text.split_whitespace();

        let mut records = Vec::new();
        let mut pattern_to_index = std::collections::HashMap::new();

        while let Some(first) = tokens.next() {
            let inputs_count: usize = first.parse().context("invalid inputs count")?;
            let outputs_count: usize = next_number(&mut tokens, "outputs count")?;

            let mut patterns = Vec::with_capacity(outputs_count);
            for _ in 0..outputs_count {
                let tt: u16 = next_number(&mut tokens, "output truth table")?;
                if tt > u8::MAX as u16 {
                    bail!("truth table {} does not fit in 8 bits", tt);
                }
                patterns.push(tt as u8);
            }

            let mut outputs = Vec::with_capacity(outputs_count);
            let mut max_position = 0usize;
            for _ in 0..outputs_count {
                let position: usize = next_number(&mut tokens, "output position")?;
                if position < inputs_count {
                    bail!(
                        "output position {} lies below the {} inputs",
                        position,
                        inputs_count
                    );
                }
                max_position = max_position.max(position);
                outputs.push(position);
            }

            let mut gate_types = Vec::new();
            let mut gate_operands = Vec::new();
            let mut binary_gate_count = 0usize;

            let mut position = inputs_count;
            while position <= max_position {
                let op = tokens
                    .next()
                    .context("database record ends inside a gate")?;
                let gate_type = GateType::from_name(op)?;
                if !basis.allows(gate_type) {
                    bail!("operator {} not allowed in {} database", op, basis.as_str());
                }

                let first_operand: usize = next_number(&mut tokens, "gate operand")?;
                max_position = max_position.max(first_operand);
                let mut operands = vec![first_operand];
                if gate_type != GateType::Not {
                    let second_operand: usize = next_number(&mut tokens, "gate operand")?;
                    max_position = max_position.max(second_operand);
                    operands.push(second_operand);
                    binary_gate_count += 1;
                }
                gate_types.push(gate_type);
                gate_operands.push(operands);
                position += 1;
            }

            let index = records.len();
            pattern_to_index.insert(patterns, index);
            records.push(DbRecord {
                inputs_count,
                outputs,
                gate_types,
                gate_operands,
                binary_gate_count,
            });
        }

        Ok(CircuitDb {
            records,
            pattern_to_index,
        })
    }

    /// Looks a sorted truth-table vector up, returning the record index.
    pub fn lookup(&self, sorted_patterns: &[u8]) -> Option<usize> {
        self.pattern_to_index.get(sorted_patterns).copied()
    }

    pub fn record(&self, index: usize) -> &DbRecord {
        &self.records[index]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn next_number<'a, T: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let token = tokens
        .next()
        .with_context(|| format!("database ended while reading {}", what))?;
    token
        .parse::<T>()
        .with_context(|| format!("invalid {}: '{}'", what, token))
}
