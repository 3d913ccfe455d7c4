use anyhow::Result;
use indexmap::IndexMap;
use log::debug;

use crate::circuit::Circuit;
use crate::dfs::top_sort;
use crate::encoder::Encoder;
use crate::gate::{GateId, GateInfo, GateType};
use crate::simplify::{collect_gates, SimplifyContext, Transformer};

/// Merges gates that compute the same function through the same operands.
///
/// Each gate gets a fingerprint of its type and the (already merged) keys of
/// its operands; two gates with equal fingerprints collapse into the first
/// occurrence and later users are rewired to it. Requires dead gates to be
/// absent, so the presets run the redundant-gate cleaner right before.
pub struct DuplicateGatesCleaner;

impl DuplicateGatesCleaner {
    pub fn new() -> Self {
        Self
    }

    fn fingerprint(
        circuit: &Circuit,
        id: GateId,
        old_to_new: &[usize],
    ) -> String {
        let gate_type = circuit.gate_type(id);
        let mut key = String::from(gate_type.as_str());

        if gate_type == GateType::Input {
            // Inputs are distinct variables and must never merge.
            key.push('_');
            key.push_str(&id.to_string());
            return key;
        }

        let mut operand_keys: Vec<GateId> = circuit
            .operands(id)
            .iter()
            .map(|&operand| old_to_new[operand])
            .collect();
        if gate_type.is_symmetric() {
            operand_keys.sort_unstable();
            if matches!(
                gate_type,
                GateType::And | GateType::Nand | GateType::Or | GateType::Nor
            ) {
                // Repetition does not change these operators.
                operand_keys.dedup();
            }
        }
        for operand_key in operand_keys {
            key.push('_');
            key.push_str(&operand_key.to_string());
        }
        key
    }
}

impl Default for DuplicateGatesCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for DuplicateGatesCleaner {
    fn transform(
        &mut self,
        circuit: Circuit,
        encoder: Encoder,
        _ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)> {
        debug!("start duplicate gates cleanup");

        let order = top_sort(&circuit);

        // Fingerprint -> new id; insertion order equals new id order.
        let mut fingerprints: IndexMap<String, GateId> = IndexMap::new();
        let mut old_to_new = vec![usize::MAX; circuit.gate_count()];
        let mut kept_old_ids = Vec::new();

        for &id in &order {
            let key = Self::fingerprint(&circuit, id, &old_to_new);
            if let Some(new_id) = fingerprints.get(&key).copied() {
                debug!("gate {} duplicates new gate {}", id, new_id);
                old_to_new[id] = new_id;
            } else {
                let new_id = fingerprints.len();
                fingerprints.insert(key, new_id);
                old_to_new[id] = new_id;
                kept_old_ids.push(id);
            }
        }

        let mut gate_info: Vec<Option<GateInfo>> = vec![None; kept_old_ids.len()];
        for (new_id, &old_id) in kept_old_ids.iter().enumerate() {
            let operands: Vec<GateId> = circuit
                .operands(old_id)
                .iter()
                .map(|&operand| old_to_new[operand])
                .collect();
            gate_info[new_id] = Some(GateInfo::new(circuit.gate_type(old_id), operands));
        }

        let new_outputs: Vec<GateId> = circuit
            .outputs()
            .iter()
            .map(|&output| old_to_new[output])
            .collect();

        let new_encoder = encoder.remap(&kept_old_ids)?;
        debug!(
            "end duplicate gates cleanup: {} -> {} gates",
            circuit.gate_count(),
            kept_old_ids.len()
        );
        Ok((Circuit::new(collect_gates(gate_info)?, new_outputs)?, new_encoder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::bench::parse_bench_str;

    #[test]
    fn structurally_equal_gates_merge() {
        let src = "\
INPUT(a)
INPUT(b)
OUTPUT(o)
n1 = AND(a, b)
n2 = AND(b, a)
o = XOR(n1, n2)
";
        let parsed = parse_bench_str(src).expect("parse");
        let mut ctx = SimplifyContext::new();
        let (circuit, _) = DuplicateGatesCleaner::new()
            .transform(parsed.circuit, parsed.encoder, &mut ctx)
            .expect("transform");
        // n1 and n2 merge; the XOR now reads the surviving AND twice.
        assert_eq!(circuit.gate_count(), 4);
        let output = circuit.outputs()[0];
        assert_eq!(circuit.operands(output).len(), 2);
        assert_eq!(circuit.operands(output)[0], circuit.operands(output)[1]);
    }

    #[test]
    fn inputs_never_merge() {
        let src = "\
INPUT(a)
INPUT(b)
OUTPUT(o)
o = AND(a, b)
";
        let parsed = parse_bench_str(src).expect("parse");
        let mut ctx = SimplifyContext::new();
        let (circuit, encoder) = DuplicateGatesCleaner::new()
            .transform(parsed.circuit, parsed.encoder, &mut ctx)
            .expect("transform");
        assert_eq!(circuit.inputs().len(), 2);
        assert_eq!(circuit.gate_count(), 3);
        assert!(encoder.contains("a") && encoder.contains("b"));
    }

    #[test]
    fn duplicate_operands_do_not_distinguish_idempotent_gates() {
        let src = "\
INPUT(a)
INPUT(b)
OUTPUT(o)
n1 = AND(a, b)
n2 = AND(a, a, b)
o = OR(n1, n2)
";
        let parsed = parse_bench_str(src).expect("parse");
        let mut ctx = SimplifyContext::new();
        let (circuit, _) = DuplicateGatesCleaner::new()
            .transform(parsed.circuit, parsed.encoder, &mut ctx)
            .expect("transform");
        // AND(a, b) and AND(a, a, b) share a fingerprint.
        assert_eq!(circuit.gate_count(), 4);
    }
}
