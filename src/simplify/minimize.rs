//! Three-input subcircuit minimization against the pattern database.
//!
//! Every three-color identifies a small sub-DAG dominated by its three
//! parents. The sub-DAG's outputs are canonicalized as 8-bit truth tables
//! over the parents, looked up in the database of optimal realizations and
//! spliced out when the stored circuit is strictly cheaper.

use anyhow::{bail, Result};
use log::debug;

use crate::circuit::Circuit;
use crate::encoder::Encoder;
use crate::gate::{GateId, GateInfo, GateType};
use crate::simplify::coloring::{ThreeColoring, NO_COLOR};
use crate::simplify::db::Basis;
use crate::simplify::{SimplifyContext, Transformer};

/// Canonical seed patterns for the three parents, one per input position.
const SEED: [u8; 3] = [0xF0, 0xCC, 0xAA];

/// Input-position permutations tried against the database, expressed as the
/// seed index given to (first, second, third) parent.
const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [2, 0, 1],
    [1, 2, 0],
    [2, 1, 0],
];

pub struct SubcircuitMinimizer {
    basis: Basis,
}

impl SubcircuitMinimizer {
    pub fn new(basis: Basis) -> Self {
        Self { basis }
    }
}

/// Tallies of how the examined subcircuits fared, logged per pass.
#[derive(Debug, Default)]
struct ColorOutcomes {
    not_in_db: u32,
    smaller_size: u32,
    same_size: u32,
    bigger_size: u32,
    many_outputs: u32,
}

/// Rewrites `gate` in place when its truth table is a constant, a parent
/// wire or a parent negation. Returns false for non-primitive patterns.
fn update_primitive_gate(
    gate: GateId,
    pattern: u8,
    gate_info: &mut [GateInfo],
    parents: [GateId; 3],
) -> bool {
    let info = match pattern {
        0x00 => GateInfo::new(GateType::Xor, vec![parents[0], parents[0]]),
        0xFF => GateInfo::new(GateType::Nxor, vec![parents[0], parents[0]]),
        0xF0 => GateInfo::new(GateType::And, vec![parents[0], parents[0]]),
        0xCC => GateInfo::new(GateType::And, vec![parents[1], parents[1]]),
        0xAA => GateInfo::new(GateType::And, vec![parents[2], parents[2]]),
        0x0F => GateInfo::new(GateType::Not, vec![parents[0]]),
        0x33 => GateInfo::new(GateType::Not, vec![parents[1]]),
        0x55 => GateInfo::new(GateType::Not, vec![parents[2]]),
        _ => return false,
    };
    gate_info[gate] = info;
    true
}

/// True when rewriting `gate` by its primitive `pattern` would reproduce the
/// gate as it already stands (a NOT of the right parent).
fn primitive_rewrite_is_identity(
    circuit: &Circuit,
    gate: GateId,
    pattern: u8,
    parents: [GateId; 3],
) -> bool {
    let parent = match pattern {
        0x0F => parents[0],
        0x33 => parents[1],
        0x55 => parents[2],
        _ => return false,
    };
    circuit.gate_type(gate) == GateType::Not && circuit.operands(gate)[0] == parent
}

fn bitwise_eval(basis: Basis, gate_type: GateType, a: u8, b: u8) -> Result<u8> {
    Ok(match (basis, gate_type) {
        (_, GateType::And) => a & b,
        (_, GateType::Not) => !a,
        (Basis::Bench, GateType::Or) => a | b,
        (Basis::Bench, GateType::Xor) => a ^ b,
        (Basis::Bench, GateType::Nand) => !(a & b),
        (Basis::Bench, GateType::Nor) => !(a | b),
        (Basis::Bench, GateType::Nxor) => !(a ^ b),
        _ => bail!(
            "operator {} is not part of the {} basis",
            gate_type.as_str(),
            basis.as_str()
        ),
    })
}

impl Transformer for SubcircuitMinimizer {
    fn transform(
        &mut self,
        circuit: Circuit,
        mut encoder: Encoder,
        ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)> {
        // A previous iteration without rewrites means the run converged;
        // every later invocation is a no-op.
        if ctx.stats.iterations != 0 && ctx.stats.last_iteration_rewrites == 0 {
            return Ok((circuit, encoder));
        }
        ctx.stats.iterations += 1;
        ctx.stats.last_iteration_rewrites = 0;
        let iter_slot = ctx.stats.iterations - 1;

        let circuit_size = circuit.gate_count();
        if let Some(slot) = ctx.stats.circuit_size_by_iter.get_mut(iter_slot) {
            *slot = circuit_size as i64;
        }

        debug!(
            "start subcircuit minimization, iteration {}",
            ctx.stats.iterations
        );

        let coloring = ThreeColoring::build(&circuit)?;
        let mut gate_info: Vec<GateInfo> = (0..circuit_size)
            .map(|id| circuit.gate_info(id).clone())
            .collect();

        let mut skipped: i64 = 0;
        let mut max_subcircuit_size: i64 = 0;
        let mut total_gates: u64 = 0;
        let mut rewrites: u64 = 0;
        let mut outcomes = ColorOutcomes::default();

        // Last color a gate was gathered for.
        let mut used_gates = vec![NO_COLOR; circuit_size];
        let mut is_removed = vec![false; circuit_size];
        let mut is_modified = vec![false; circuit_size];

        let db = ctx.database(self.basis)?;

        for color_id in 0..coloring.colors.len() {
            let color = &coloring.colors[color_id];
            let parents = color.parents();

            if parents.iter().any(|&p| is_removed[p]) {
                skipped += 1;
                continue;
            }

            for &parent in &parents {
                used_gates[parent] = color_id;
            }

            // Gather the subcircuit: parents' immediate negations, gates of
            // the three pair colors, then the triple's own gates.
            let mut gates_by_color = Vec::new();
            for &parent in &parents {
                let negation = coloring.negation_users[parent];
                if negation != NO_COLOR {
                    gather(negation, color_id, &mut used_gates, &mut gates_by_color);
                }
            }
            for &(a, b) in &[
                (parents[0], parents[1]),
                (parents[0], parents[2]),
                (parents[1], parents[2]),
            ] {
                if let Some(pair_color) = coloring.two.color_of_parents(a, b) {
                    for &gate in coloring.two.colors[pair_color].gates() {
                        gather(gate, color_id, &mut used_gates, &mut gates_by_color);
                    }
                }
            }
            for &gate in color.gates() {
                gather(gate, color_id, &mut used_gates, &mut gates_by_color);
            }

            max_subcircuit_size = max_subcircuit_size.max(gates_by_color.len() as i64 + 3);
            total_gates += gates_by_color.len() as u64 + 3;

            if gates_by_color
                .iter()
                .any(|&gate| is_removed[gate] || is_modified[gate])
            {
                continue;
            }

            // Truth tables of every subcircuit gate under all six parent
            // permutations.
            let mut patterns: Vec<Vec<Option<u8>>> = vec![vec![None; circuit_size]; 6];
            for (perm, seed_index) in PERMUTATIONS.iter().enumerate() {
                for position in 0..3 {
                    patterns[perm][parents[position]] = Some(SEED[seed_index[position]]);
                }
            }

            let mut color_is_stale = false;
            for &gate in &gates_by_color {
                let operands = circuit.operands(gate);
                let gate_type = circuit.gate_type(gate);
                for perm in 0..6 {
                    let a = patterns[perm][operands[0]];
                    let b = if operands.len() > 1 {
                        patterns[perm][operands[1]]
                    } else {
                        Some(0)
                    };
                    let (Some(a), Some(b)) = (a, b) else {
                        color_is_stale = true;
                        break;
                    };
                    patterns[perm][gate] = Some(bitwise_eval(self.basis, gate_type, a, b)?);
                }
                if color_is_stale {
                    break;
                }
            }
            if color_is_stale {
                // An operand outside the gathered cone; leave the color as is.
                skipped += 1;
                continue;
            }

            let pattern0 = |gate: GateId| patterns[0][gate].expect("pattern computed");

            // Constant gates plus gates equal to parents or their negations.
            let mut primitive_gates = Vec::new();
            for &gate in &gates_by_color {
                let p0 = pattern0(gate);
                match p0 {
                    0x00 | 0xFF | 0xF0 | 0xCC | 0xAA => primitive_gates.push(gate),
                    0x0F | 0x33 | 0x55 => {
                        if !primitive_rewrite_is_identity(&circuit, gate, p0, parents) {
                            primitive_gates.push(gate);
                        }
                    }
                    _ => {}
                }
            }

            // Subcircuit outputs. The dedup heuristic reroutes outputs that
            // repeat (or complement) an earlier output's truth table, so the
            // database key rarely exceeds three entries.
            let mut outputs = Vec::<GateId>::new();
            let mut output_patterns: Vec<Vec<u8>> = vec![Vec::new(); 6];
            let mut all_outputs = Vec::<GateId>::new();

            for &gate in &gates_by_color {
                let escapes = circuit.is_output(gate)
                    || circuit
                        .users(gate)
                        .iter()
                        .any(|&user| used_gates[user] != color_id);
                if !escapes {
                    continue;
                }

                all_outputs.push(gate);
                let p0 = pattern0(gate);
                if update_primitive_gate(gate, p0, &mut gate_info, parents) {
                    if !primitive_rewrite_is_identity(&circuit, gate, p0, parents) {
                        is_modified[gate] = true;
                        rewrites += 1;
                    }
                    continue;
                }

                let mut handled = false;
                for i in 0..output_patterns[0].len() {
                    let earlier = output_patterns[0][i];
                    if p0 == earlier {
                        is_modified[gate] = true;
                        rewrites += 1;
                        gate_info[gate] =
                            GateInfo::new(GateType::And, vec![outputs[i], outputs[i]]);
                        handled = true;
                        break;
                    }
                    if p0 == !earlier {
                        let already_that_not = circuit.gate_type(gate) == GateType::Not
                            && circuit.operands(gate)[0] == outputs[i];
                        if !already_that_not {
                            is_modified[gate] = true;
                            rewrites += 1;
                            gate_info[gate] = GateInfo::new(GateType::Not, vec![outputs[i]]);
                        }
                        handled = true;
                        break;
                    }
                }
                if handled {
                    continue;
                }

                outputs.push(gate);
                for perm in 0..6 {
                    output_patterns[perm].push(patterns[perm][gate].expect("pattern computed"));
                }
            }

            let rewrite_primitives =
                |primitive_gates: &[GateId], gate_info: &mut Vec<GateInfo>,
                 is_modified: &mut Vec<bool>, rewrites: &mut u64| {
                    for &gate in primitive_gates {
                        update_primitive_gate(gate, pattern0(gate), gate_info, parents);
                        is_modified[gate] = true;
                        *rewrites += 1;
                    }
                };

            if outputs.len() > 3 {
                outcomes.many_outputs += 1;
                rewrite_primitives(&primitive_gates, &mut gate_info, &mut is_modified, &mut rewrites);
                continue;
            }

            // First permutation whose sorted pattern vector the database knows.
            let mut hit: Option<(usize, Vec<u8>, usize)> = None;
            for perm in 0..6 {
                let mut key = output_patterns[perm].clone();
                key.sort_unstable();
                if let Some(record_index) = db.lookup(&key) {
                    hit = Some((perm, key, record_index));
                    break;
                }
            }
            let Some((perm, sorted_key, record_index)) = hit else {
                outcomes.not_in_db += 1;
                rewrite_primitives(&primitive_gates, &mut gate_info, &mut is_modified, &mut rewrites);
                continue;
            };

            let record = db.record(record_index);
            if record.inputs_count != 3 {
                bail!(
                    "database record {} has {} inputs, expected 3",
                    record_index,
                    record.inputs_count
                );
            }

            let current_cost = gates_by_color
                .iter()
                .filter(|&&gate| circuit.gate_type(gate) != GateType::Not)
                .count();
            if record.binary_gate_count >= current_cost {
                if record.binary_gate_count == current_cost {
                    outcomes.same_size += 1;
                } else {
                    outcomes.bigger_size += 1;
                }
                continue;
            }

            outcomes.smaller_size += 1;
            rewrites += 1;
            for &gate in &gates_by_color {
                is_removed[gate] = true;
            }
            for &output in &all_outputs {
                is_modified[output] = true;
                is_removed[output] = false;
            }

            // Bijection from record positions to circuit ids: 0..3 are the
            // parents in the winning permutation's order, database outputs
            // map to the retained outputs matched by truth table, the rest
            // mint fresh gates.
            let mut bijection: Vec<Option<GateId>> = vec![None; record.gate_operands.len() + 3];
            for position in 0..3 {
                bijection[position] = Some(parents[PERMUTATIONS[perm][position]]);
            }
            for (i, &db_output) in record.outputs.iter().enumerate() {
                let wanted = sorted_key[i];
                let matched = outputs
                    .iter()
                    .position(|&output| {
                        patterns[perm][output].expect("pattern computed") == wanted
                    })
                    .expect("database key was built from these outputs");
                bijection[db_output] = Some(outputs[matched]);
            }
            for i in 0..record.gate_operands.len() {
                if bijection[i + 3].is_none() {
                    let name = format!(
                        "new_gate_pattern_{}_{}_{}_{}_{}",
                        record_index,
                        color_id,
                        coloring.colors.len(),
                        i,
                        encoder.len()
                    );
                    let new_id = encoder.encode(&name);
                    debug_assert_eq!(new_id, gate_info.len());
                    gate_info.push(GateInfo::new(GateType::Not, vec![parents[0]]));
                    bijection[i + 3] = Some(new_id);
                }
            }
            for i in 0..record.gate_operands.len() {
                let operands: Vec<GateId> = record.gate_operands[i]
                    .iter()
                    .map(|&position| bijection[position].expect("all positions assigned"))
                    .collect();
                let target = bijection[i + 3].expect("all positions assigned");
                gate_info[target] = GateInfo::new(record.gate_types[i], operands);
            }
        }

        if let Some(slot) = ctx.stats.subcircuits_by_iter.get_mut(iter_slot) {
            *slot += coloring.colors.len() as i64;
        }
        if let Some(slot) = ctx.stats.skipped_subcircuits_by_iter.get_mut(iter_slot) {
            *slot += skipped;
        }
        if let Some(slot) = ctx.stats.max_subcircuit_size_by_iter.get_mut(iter_slot) {
            *slot = (*slot).max(max_subcircuit_size);
        }
        ctx.stats.total_gates_in_subcircuits += total_gates;
        ctx.stats.last_iteration_rewrites += rewrites;

        debug!(
            "end subcircuit minimization: {} colors, many outputs {}, smaller {}, same {}, bigger {}, not in db {}",
            coloring.colors.len(),
            outcomes.many_outputs,
            outcomes.smaller_size,
            outcomes.same_size,
            outcomes.bigger_size,
            outcomes.not_in_db
        );

        let outputs = circuit.outputs().to_vec();
        Ok((Circuit::new(gate_info, outputs)?, encoder))
    }
}

/// Marks `gate` as belonging to the color being gathered, appending it once.
fn gather(gate: GateId, color_id: usize, used: &mut [usize], out: &mut Vec<GateId>) {
    if used[gate] != color_id {
        used[gate] = color_id;
        out.push(gate);
    }
}
