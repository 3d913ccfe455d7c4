use anyhow::{Context, Result};
use log::debug;

use crate::assignment::Assignment;
use crate::circuit::Circuit;
use crate::dfs::top_sort;
use crate::encoder::Encoder;
use crate::gate::{GateId, GateInfo, GateState, GateType};
use crate::simplify::{collect_gates, SimplifyContext, Transformer};

/// Folds away everything the circuit's own constants already determine.
///
/// The circuit is evaluated under the empty input assignment. Gates whose
/// value comes out defined are replaced by the matching constant; undefined
/// gates drop operands whose known value is the operator's identity (with
/// the XOR/NXOR polarity flip when an odd number of TRUE operands is
/// dropped) and degenerate single-operand gates turn into pass-throughs or
/// synthesized NOTs. A MUX with a known selector routes users straight to
/// the active branch.
///
/// An output whose value is determined is replaced by a small gadget over
/// the first input — `OR(in, NOT(in))` for TRUE, `AND(in, NOT(in))` for
/// FALSE — so the written circuit always mentions a real variable.
pub struct ConstantGateReducer;

impl ConstantGateReducer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConstantGateReducer {
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

impl Transformer for ConstantGateReducer {
    fn transform(
        &mut self,
        circuit: Circuit,
        mut encoder: Encoder,
        ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)> {
        debug!("start constant gate reduction");
        let prefix = ctx.fresh_name_prefix("ConstantGateReducer");

        let order = top_sort(&circuit);
        let mut circuit_size = circuit.gate_count();
        let mut gate_info: Vec<Option<GateInfo>> = vec![None; circuit_size];
        let mut old_to_new: Vec<GateId> = vec![usize::MAX; circuit_size];

        let result = circuit.evaluate(&Assignment::new())?;

        for &gate_id in &order {
            let mut gate_type = circuit.gate_type(gate_id);

            if result.is_undefined(gate_id) || gate_type.is_constant() {
                let mut operands = Vec::new();
                if !gate_type.is_symmetric() {
                    // Positional operators keep every operand.
                    for &operand in circuit.operands(gate_id) {
                        operands.push(link(operand, &old_to_new));
                    }
                } else {
                    let mut true_count = 0usize;
                    for &operand in circuit.operands(gate_id) {
                        let linked = link(operand, &old_to_new);
                        match result.get(linked) {
                            // A defined operand is the operator's identity
                            // here (a significant one would have defined the
                            // gate itself); only TRUE matters, for the XOR
                            // polarity below.
                            GateState::True => true_count += 1,
                            GateState::False => {}
                            GateState::Undefined => operands.push(linked),
                        }
                    }
                    if matches!(gate_type, GateType::Xor | GateType::Nxor) && true_count % 2 == 1 {
                        gate_type = match gate_type {
                            GateType::Xor => GateType::Nxor,
                            _ => GateType::Xor,
                        };
                    }
                }

                gate_info[gate_id] = Some(GateInfo::new(gate_type, operands.clone()));

                if operands.len() == 1
                    && matches!(
                        gate_type,
                        GateType::And | GateType::Or | GateType::Xor | GateType::Iff
                    )
                {
                    old_to_new[gate_id] = operands[0];
                } else if operands.len() == 1
                    && matches!(gate_type, GateType::Nand | GateType::Nor | GateType::Nxor)
                {
                    let new_id = encoder.encode(&format!("{}{}", prefix, circuit_size));
                    debug_assert_eq!(new_id, circuit_size);
                    gate_info.push(Some(GateInfo::new(GateType::Not, vec![operands[0]])));
                    old_to_new[gate_id] = new_id;
                    old_to_new.push(new_id);
                    circuit_size += 1;
                } else if gate_type == GateType::Mux {
                    let selector = link(circuit.operands(gate_id)[0], &old_to_new);
                    match result.get(selector) {
                        GateState::True => {
                            old_to_new[gate_id] = link(circuit.operands(gate_id)[2], &old_to_new);
                        }
                        GateState::False => {
                            old_to_new[gate_id] = link(circuit.operands(gate_id)[1], &old_to_new);
                        }
                        GateState::Undefined => {
                            old_to_new[gate_id] = gate_id;
                        }
                    }
                } else {
                    old_to_new[gate_id] = gate_id;
                }
            } else if result.get(gate_id) == GateState::True {
                gate_info[gate_id] = Some(GateInfo::new(GateType::ConstTrue, vec![]));
            } else {
                gate_info[gate_id] = Some(GateInfo::new(GateType::ConstFalse, vec![]));
            }
        }

        let mut new_outputs = Vec::with_capacity(circuit.outputs().len());
        for &output in circuit.outputs() {
            if result.is_undefined(output) {
                new_outputs.push(old_to_new[output]);
            } else {
                let gadget = build_constant_gadget(
                    &mut gate_info,
                    &mut encoder,
                    &prefix,
                    &mut circuit_size,
                    result.get(output),
                )?;
                new_outputs.push(gadget);
            }
        }

        debug!("end constant gate reduction");
        Ok((Circuit::new(collect_gates(gate_info)?, new_outputs)?, encoder))
    }
}

/// Appends `OR(in, NOT(in))` or `AND(in, NOT(in))` over the first input and
/// returns the gadget's output id. The preset applies the input-preserving
/// redundant pass before this one, so an input always exists.
fn build_constant_gadget(
    gate_info: &mut Vec<Option<GateInfo>>,
    encoder: &mut Encoder,
    prefix: &str,
    circuit_size: &mut usize,
    state: GateState,
) -> Result<GateId> {
    let left = gate_info
        .iter()
        .position(|slot| matches!(slot, Some(info) if info.gate_type() == GateType::Input))
        .context("constant output requires at least one input gate")?;

    let right = *circuit_size;
    let output = *circuit_size + 1;
    *circuit_size += 2;

    let not_id = encoder.encode(&format!("{}{}", prefix, right));
    debug_assert_eq!(not_id, right);
    gate_info.push(Some(GateInfo::new(GateType::Not, vec![left])));

    let out_id = encoder.encode(&format!("{}{}", prefix, output));
    debug_assert_eq!(out_id, output);
    let top_type = if state == GateState::True {
        GateType::Or
    } else {
        GateType::And
    };
    gate_info.push(Some(GateInfo::new(top_type, vec![left, right])));

    Ok(output)
}
