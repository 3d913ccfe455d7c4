use anyhow::Result;
use log::debug;

use crate::circuit::Circuit;
use crate::dfs::{perform_dfs, DfsDirection, DfsState};
use crate::encoder::Encoder;
use crate::gate::{GateId, GateInfo, GateType};
use crate::simplify::{SimplifyContext, Transformer};

/// Removes every gate that is not reachable backward from the outputs and
/// renumbers the survivors to a dense `0..M`, preserving relative order.
///
/// With `preserve_inputs` set, INPUT gates survive regardless of
/// reachability. The constant-gate reducer relies on this: its output
/// gadget must anchor at a real input even when every output folded to a
/// constant.
pub struct RedundantGatesCleaner {
    preserve_inputs: bool,
}

impl RedundantGatesCleaner {
    pub fn new() -> Self {
        Self {
            preserve_inputs: false,
        }
    }

    pub fn preserving_inputs() -> Self {
        Self {
            preserve_inputs: true,
        }
    }
}

impl Default for RedundantGatesCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for RedundantGatesCleaner {
    fn transform(
        &mut self,
        circuit: Circuit,
        encoder: Encoder,
        _ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)> {
        debug!("start redundant gates cleanup");

        let reachable = perform_dfs(
            &circuit,
            circuit.outputs(),
            DfsDirection::ToOperands,
            |_| {},
            |_| {},
        );

        let mut old_to_new = vec![usize::MAX; circuit.gate_count()];
        let mut kept_old_ids = Vec::new();
        for id in 0..circuit.gate_count() {
            let keep = reachable[id] != DfsState::Unvisited
                || (self.preserve_inputs && circuit.gate_type(id) == GateType::Input);
            if keep {
                old_to_new[id] = kept_old_ids.len();
                kept_old_ids.push(id);
            } else {
                debug!("gate {} is redundant and will be removed", id);
            }
        }

        let mut gate_info = Vec::with_capacity(kept_old_ids.len());
        for &old_id in &kept_old_ids {
            let operands: Vec<GateId> = circuit
                .operands(old_id)
                .iter()
                .map(|&operand| old_to_new[operand])
                .collect();
            gate_info.push(GateInfo::new(circuit.gate_type(old_id), operands));
        }

        let new_outputs: Vec<GateId> = circuit
            .outputs()
            .iter()
            .map(|&output| old_to_new[output])
            .collect();

        let new_encoder = encoder.remap(&kept_old_ids)?;
        debug!(
            "end redundant gates cleanup: {} -> {} gates",
            circuit.gate_count(),
            kept_old_ids.len()
        );
        Ok((Circuit::new(gate_info, new_outputs)?, new_encoder))
    }
}
