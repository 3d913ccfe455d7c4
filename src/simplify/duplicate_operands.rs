use std::collections::BTreeMap;

use anyhow::Result;
use log::debug;

use crate::circuit::Circuit;
use crate::dfs::top_sort;
use crate::encoder::Encoder;
use crate::gate::{GateId, GateInfo, GateType};
use crate::simplify::{collect_gates, SimplifyContext, Transformer};

/// Normalizes repeated and complementary operands within each gate.
///
/// AND/NAND/OR/NOR keep one occurrence per operand, XOR/NXOR keep them
/// modulo two. A gate degenerating to a single operand becomes a
/// pass-through (or a synthesized NOT for the negated types); complementary
/// operand pairs turn the whole gate into a constant for the AND/OR family
/// and into counted CONST_TRUE operands for the XOR family.
///
/// One CONST_TRUE and one CONST_FALSE helper are appended per invocation
/// and shared by every rewrite; helpers that end up unused are dead and the
/// redundant-gate pass that follows sweeps them.
pub struct DuplicateOperandsCleaner;

impl DuplicateOperandsCleaner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DuplicateOperandsCleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn link(id: GateId, old_to_new: &[GateId]) -> GateId {
    if old_to_new[id] != usize::MAX {
        old_to_new[id]
    } else {
        id
    }
}

/// Counts operand occurrences through the links built so far, reduced per
/// the operator family.
fn reduced_operand_counts(
    circuit: &Circuit,
    id: GateId,
    old_to_new: &[GateId],
) -> BTreeMap<GateId, usize> {
    let gate_type = circuit.gate_type(id);
    let mut counts = BTreeMap::<GateId, usize>::new();
    for &operand in circuit.operands(id) {
        *counts.entry(link(operand, old_to_new)).or_insert(0) += 1;
    }

    match gate_type {
        GateType::Xor | GateType::Nxor => {
            counts.retain(|_, count| {
                *count %= 2;
                *count != 0
            });
        }
        GateType::And | GateType::Nand | GateType::Or | GateType::Nor => {
            for count in counts.values_mut() {
                *count = 1;
            }
        }
        _ => {}
    }
    counts
}

fn has_complementary_pair(
    gate_info: &[Option<GateInfo>],
    counts: &BTreeMap<GateId, usize>,
) -> bool {
    counts.keys().any(|&operand| {
        matches!(&gate_info[operand], Some(info)
            if info.gate_type() == GateType::Not
                && counts.contains_key(&info.operands()[0]))
    })
}

/// Cancels complementary pairs inside a XOR/NXOR operand multiset. Each
/// cancelled pair contributes one TRUE; an odd pair count leaves a single
/// CONST_TRUE operand behind.
fn rebuild_xor_operands(
    gate_info: &[Option<GateInfo>],
    counts: &mut BTreeMap<GateId, usize>,
    id_const_true: GateId,
) -> Vec<GateId> {
    let mut pairs = 0usize;
    let keys: Vec<GateId> = counts.keys().copied().collect();
    for operand in keys {
        let inner = match &gate_info[operand] {
            Some(info) if info.gate_type() == GateType::Not => info.operands()[0],
            _ => continue,
        };
        if counts.get(&operand).copied().unwrap_or(0) > 0
            && counts.get(&inner).copied().unwrap_or(0) > 0
        {
            *counts.get_mut(&operand).expect("present") -= 1;
            *counts.get_mut(&inner).expect("present") -= 1;
            pairs += 1;
        }
    }

    let mut operands = flatten_counts(counts);
    if pairs % 2 == 1 {
        operands.push(id_const_true);
    }
    operands
}

fn flatten_counts(counts: &BTreeMap<GateId, usize>) -> Vec<GateId> {
    let mut operands = Vec::new();
    for (&operand, &count) in counts {
        for _ in 0..count {
            operands.push(operand);
        }
    }
    operands
}

impl Transformer for DuplicateOperandsCleaner {
    fn transform(
        &mut self,
        circuit: Circuit,
        mut encoder: Encoder,
        ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)> {
        debug!("start duplicate operands cleanup");
        let prefix = ctx.fresh_name_prefix("DuplicateOperandsCleaner");

        let order = top_sort(&circuit);
        let mut circuit_size = circuit.gate_count();
        let mut gate_info: Vec<Option<GateInfo>> = vec![None; circuit_size];
        let mut old_to_new: Vec<GateId> = vec![usize::MAX; circuit_size];

        // Shared constant helpers, appended up front.
        let id_const_true = encoder.encode(&format!("{}CONST_TRUE", prefix));
        debug_assert_eq!(id_const_true, circuit_size);
        gate_info.push(Some(GateInfo::new(GateType::ConstTrue, vec![])));
        old_to_new.push(id_const_true);
        circuit_size += 1;

        let id_const_false = encoder.encode(&format!("{}CONST_FALSE", prefix));
        debug_assert_eq!(id_const_false, circuit_size);
        gate_info.push(Some(GateInfo::new(GateType::ConstFalse, vec![])));
        old_to_new.push(id_const_false);
        circuit_size += 1;

        let synthesize_not = |operand: GateId,
                                  encoder: &mut Encoder,
                                  gate_info: &mut Vec<Option<GateInfo>>,
                                  old_to_new: &mut Vec<GateId>,
                                  circuit_size: &mut usize|
         -> GateId {
            let new_id = encoder.encode(&format!("{}{}", prefix, *circuit_size));
            debug_assert_eq!(new_id, *circuit_size);
            gate_info.push(Some(GateInfo::new(GateType::Not, vec![operand])));
            old_to_new.push(new_id);
            *circuit_size += 1;
            new_id
        };

        for &gate_id in &order {
            let gate_type = circuit.gate_type(gate_id);
            let mut counts = reduced_operand_counts(&circuit, gate_id, &old_to_new);
            let mut rebuild_gate = false;

            if matches!(
                gate_type,
                GateType::And
                    | GateType::Nand
                    | GateType::Or
                    | GateType::Nor
                    | GateType::Xor
                    | GateType::Nxor
            ) {
                if counts.len() == 1 {
                    let unique = *counts.keys().next().expect("one operand");
                    if matches!(gate_type, GateType::And | GateType::Or | GateType::Xor) {
                        // Users move straight to the operand.
                        old_to_new[gate_id] = unique;
                    } else {
                        // Users move to the operand's negation.
                        let not_id = synthesize_not(
                            unique,
                            &mut encoder,
                            &mut gate_info,
                            &mut old_to_new,
                            &mut circuit_size,
                        );
                        old_to_new[gate_id] = not_id;
                    }
                } else if counts.is_empty() {
                    // Only XOR/NXOR can cancel down to nothing.
                    old_to_new[gate_id] = if gate_type == GateType::Xor {
                        id_const_false
                    } else {
                        id_const_true
                    };
                } else if has_complementary_pair(&gate_info, &counts) {
                    match gate_type {
                        GateType::And | GateType::Nor => old_to_new[gate_id] = id_const_false,
                        GateType::Nand | GateType::Or => old_to_new[gate_id] = id_const_true,
                        _ => {
                            // XOR/NXOR swap each pair for a TRUE operand.
                            rebuild_gate = true;
                            old_to_new[gate_id] = gate_id;
                        }
                    }
                } else {
                    old_to_new[gate_id] = gate_id;
                }
            } else {
                old_to_new[gate_id] = gate_id;
            }

            let operands = if rebuild_gate {
                let operands = rebuild_xor_operands(&gate_info, &mut counts, id_const_true);
                if operands.len() == 1 {
                    if gate_type == GateType::Xor {
                        old_to_new[gate_id] = operands[0];
                    } else {
                        let not_id = synthesize_not(
                            operands[0],
                            &mut encoder,
                            &mut gate_info,
                            &mut old_to_new,
                            &mut circuit_size,
                        );
                        old_to_new[gate_id] = not_id;
                    }
                } else if operands.is_empty() {
                    old_to_new[gate_id] = if gate_type == GateType::Xor {
                        id_const_false
                    } else {
                        id_const_true
                    };
                }
                operands
            } else if gate_type.is_symmetric() {
                flatten_counts(&counts)
            } else {
                circuit
                    .operands(gate_id)
                    .iter()
                    .map(|&operand| link(operand, &old_to_new))
                    .collect()
            };

            gate_info[gate_id] = Some(GateInfo::new(gate_type, operands));
        }

        let new_outputs: Vec<GateId> = circuit
            .outputs()
            .iter()
            .map(|&output| old_to_new[output])
            .collect();

        debug!("end duplicate operands cleanup");
        Ok((Circuit::new(collect_gates(gate_info)?, new_outputs)?, encoder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::bench::parse_bench_str;

    fn run(src: &str) -> (Circuit, Encoder) {
        let parsed = parse_bench_str(src).expect("parse");
        let mut ctx = SimplifyContext::new();
        DuplicateOperandsCleaner::new()
            .transform(parsed.circuit, parsed.encoder, &mut ctx)
            .expect("transform")
    }

    #[test]
    fn repeated_and_operand_collapses() {
        let (circuit, _) = run("INPUT(a)\nOUTPUT(o)\no = AND(a, a)\n");
        // AND(a, a) passes through to a; output is rerouted to the input.
        assert_eq!(circuit.outputs(), &[0]);
    }

    #[test]
    fn xor_pair_cancels_to_const_false() {
        let (circuit, _) = run("INPUT(a)\nOUTPUT(o)\no = XOR(a, a)\n");
        let out = circuit.outputs()[0];
        assert_eq!(circuit.gate_type(out), GateType::ConstFalse);
    }

    #[test]
    fn nand_of_equal_operands_becomes_not() {
        let (circuit, _) = run("INPUT(a)\nOUTPUT(o)\no = NAND(a, a)\n");
        let out = circuit.outputs()[0];
        assert_eq!(circuit.gate_type(out), GateType::Not);
        assert_eq!(circuit.operands(out), &[0]);
    }

    #[test]
    fn complementary_pair_in_and_is_false() {
        let (circuit, _) = run("INPUT(a)\nOUTPUT(o)\nn = NOT(a)\no = AND(a, n)\n");
        let out = circuit.outputs()[0];
        assert_eq!(circuit.gate_type(out), GateType::ConstFalse);
    }

    #[test]
    fn complementary_pair_in_or_is_true() {
        let (circuit, _) = run("INPUT(a)\nOUTPUT(o)\nn = NOT(a)\no = OR(a, n)\n");
        let out = circuit.outputs()[0];
        assert_eq!(circuit.gate_type(out), GateType::ConstTrue);
    }

    #[test]
    fn xor_complementary_pair_becomes_true_operand() {
        // XOR(a, NOT(a), b) = XOR(TRUE, b); the pair is replaced by the
        // shared CONST_TRUE helper.
        let (circuit, _) = run(
            "INPUT(a)\nINPUT(b)\nOUTPUT(o)\nn = NOT(a)\no = XOR(a, n, b)\n",
        );
        let out = circuit.outputs()[0];
        assert_eq!(circuit.gate_type(out), GateType::Xor);
        let operands = circuit.operands(out);
        assert_eq!(operands.len(), 2);
        assert!(operands
            .iter()
            .any(|&x| circuit.gate_type(x) == GateType::ConstTrue));
        assert!(operands.contains(&1));
    }

    #[test]
    fn xor_all_pairs_cancel_to_single_operand() {
        // XOR(a, NOT(a), b) with b the only survivor after one TRUE and...
        // Two complementary pairs cancel completely: XOR(a, NOT(a), b, NOT(b)).
        let (circuit, _) = run(
            "INPUT(a)\nINPUT(b)\nOUTPUT(o)\nna = NOT(a)\nnb = NOT(b)\no = XOR(a, na, b, nb)\n",
        );
        let out = circuit.outputs()[0];
        // Two pairs -> even TRUE count -> empty operand set -> CONST_FALSE.
        assert_eq!(circuit.gate_type(out), GateType::ConstFalse);
    }
}
