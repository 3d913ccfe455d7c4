//! Circuit data model: an immutable gate DAG with derived reverse edges.

pub mod bench;

use anyhow::{bail, Result};

use crate::assignment::Assignment;
use crate::gate::{GateId, GateInfo, GateType};
use crate::op;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Node {
    info: GateInfo,
    users: Vec<GateId>,
}

/// Directed acyclic graph of gates. Construction derives the user lists
/// (reverse edges) in one linear pass; all queries afterwards are O(1).
///
/// Passes never mutate a live circuit: they emit a fresh gate list and
/// output list and construct a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Circuit {
    nodes: Vec<Node>,
    inputs: Vec<GateId>,
    outputs: Vec<GateId>,
}

impl Circuit {
    pub fn new(gates: Vec<GateInfo>, outputs: Vec<GateId>) -> Result<Circuit> {
        let gate_count = gates.len();
        let mut nodes: Vec<Node> = gates
            .into_iter()
            .map(|info| Node {
                info,
                users: Vec::new(),
            })
            .collect();

        let mut inputs = Vec::new();
        for id in 0..gate_count {
            if nodes[id].info.gate_type() == GateType::Input {
                inputs.push(id);
            }
            for idx in 0..nodes[id].info.operands().len() {
                let operand = nodes[id].info.operands()[idx];
                if operand >= gate_count {
                    bail!(
                        "gate {} references operand {} outside of circuit of size {}",
                        id,
                        operand,
                        gate_count
                    );
                }
                nodes[operand].users.push(id);
            }
        }

        for &output in &outputs {
            if output >= gate_count {
                bail!("output gate {} outside of circuit of size {}", output, gate_count);
            }
        }

        Ok(Circuit {
            nodes,
            inputs,
            outputs,
        })
    }

    pub fn gate_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn gate_type(&self, id: GateId) -> GateType {
        self.nodes[id].info.gate_type()
    }

    pub fn operands(&self, id: GateId) -> &[GateId] {
        self.nodes[id].info.operands()
    }

    pub fn users(&self, id: GateId) -> &[GateId] {
        &self.nodes[id].users
    }

    pub fn gate_info(&self, id: GateId) -> &GateInfo {
        &self.nodes[id].info
    }

    pub fn inputs(&self) -> &[GateId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[GateId] {
        &self.outputs
    }

    pub fn is_output(&self, id: GateId) -> bool {
        self.outputs.contains(&id)
    }

    /// Forward-propagates `input` through the circuit and returns the
    /// assignment of every gate reachable from the outputs whose value is
    /// implied. The result never assigns UNDEFINED where a definite value
    /// can be derived, and never overlaps `input` in a contradictory way:
    /// gates present in `input` adopt the given value.
    ///
    /// The walk is an explicit stack; a gate that resurfaces with an
    /// unresolved operand witnesses a cycle, which is a fatal error.
    pub fn evaluate(&self, input: &Assignment) -> Result<Assignment> {
        let mut result = Assignment::with_capacity(self.gate_count());
        let mut evaluated = vec![false; self.gate_count()];

        for &sink in &self.outputs {
            self.evaluate_gate(sink, input, &mut result, &mut evaluated)?;
        }
        Ok(result)
    }

    fn evaluate_gate(
        &self,
        start: GateId,
        input: &Assignment,
        result: &mut Assignment,
        evaluated: &mut [bool],
    ) -> Result<()> {
        let mut stack = vec![start];
        let mut entered = vec![false; self.gate_count()];

        while let Some(&id) = stack.last() {
            if evaluated[id] {
                stack.pop();
                continue;
            }

            if self.gate_type(id) == GateType::Input || !input.is_undefined(id) {
                result.assign(id, input.get(id));
                evaluated[id] = true;
                stack.pop();
                continue;
            }

            let mut operands_ready = true;
            for &operand in self.operands(id) {
                if !evaluated[operand] {
                    operands_ready = false;
                    stack.push(operand);
                }
            }

            if operands_ready {
                let mut lookup = |operand: GateId| {
                    if result.is_undefined(operand) {
                        input.get(operand)
                    } else {
                        result.get(operand)
                    }
                };
                let state = op::eval_gate(self.gate_type(id), self.operands(id), &mut lookup)?;
                result.assign(id, state);
                evaluated[id] = true;
                stack.pop();
            } else if entered[id] {
                bail!("cycle detected while evaluating gate {}", id);
            } else {
                entered[id] = true;
            }
        }
        Ok(())
    }
}
