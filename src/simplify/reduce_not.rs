use anyhow::Result;
use log::debug;

use crate::circuit::Circuit;
use crate::encoder::Encoder;
use crate::gate::{GateId, GateInfo, GateType};
use crate::simplify::{SimplifyContext, Transformer};

/// Rewrites every operand that heads a NOT chain to the chain's fixpoint:
/// the endpoint when the chain length is even, the last NOT when it is odd.
/// The chains themselves become dead and are swept by the redundant-gate
/// pass that follows in every preset.
pub struct NotChainCollapser;

impl NotChainCollapser {
    pub fn new() -> Self {
        Self
    }

    /// Walks down from `not_gate` (known to be a NOT) counting parity.
    fn collapsed_operand(circuit: &Circuit, not_gate: GateId) -> GateId {
        let mut even_count = false;
        let mut current = not_gate;
        let mut below = circuit.operands(current)[0];
        while circuit.gate_type(below) == GateType::Not {
            even_count = !even_count;
            current = below;
            below = circuit.operands(current)[0];
        }
        if even_count {
            below
        } else {
            current
        }
    }
}

impl Default for NotChainCollapser {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for NotChainCollapser {
    fn transform(
        &mut self,
        circuit: Circuit,
        encoder: Encoder,
        _ctx: &mut SimplifyContext,
    ) -> Result<(Circuit, Encoder)> {
        debug!("start double negation collapse");

        let mut gate_info = Vec::with_capacity(circuit.gate_count());
        for id in 0..circuit.gate_count() {
            let operands: Vec<GateId> = circuit
                .operands(id)
                .iter()
                .map(|&operand| {
                    if circuit.gate_type(operand) == GateType::Not {
                        Self::collapsed_operand(&circuit, operand)
                    } else {
                        operand
                    }
                })
                .collect();
            gate_info.push(GateInfo::new(circuit.gate_type(id), operands));
        }

        let outputs = circuit.outputs().to_vec();
        debug!("end double negation collapse");
        Ok((Circuit::new(gate_info, outputs)?, encoder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::bench::parse_bench_str;

    #[test]
    fn odd_chain_collapses_to_single_not() {
        let src = "\
INPUT(a)
INPUT(b)
OUTPUT(o)
n1 = NOT(a)
n2 = NOT(n1)
n3 = NOT(n2)
o = AND(n3, b)
";
        let parsed = parse_bench_str(src).expect("parse");
        let mut ctx = SimplifyContext::new();
        let (circuit, _) = NotChainCollapser::new()
            .transform(parsed.circuit, parsed.encoder, &mut ctx)
            .expect("transform");
        // a=0, b=1, o=2, n1=3, n2=4, n3=5; o now reads NOT(a) directly.
        assert_eq!(circuit.operands(2), &[1, 3]);
    }

    #[test]
    fn even_chain_collapses_to_endpoint() {
        let src = "\
INPUT(a)
INPUT(b)
OUTPUT(o)
n1 = NOT(a)
n2 = NOT(n1)
o = AND(n2, b)
";
        let parsed = parse_bench_str(src).expect("parse");
        let mut ctx = SimplifyContext::new();
        let (circuit, _) = NotChainCollapser::new()
            .transform(parsed.circuit, parsed.encoder, &mut ctx)
            .expect("transform");
        // o = AND(a, b)
        assert_eq!(circuit.operands(2), &[0, 1]);
    }
}
