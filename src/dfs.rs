//! Iterative depth-first traversal over circuit gates.
//!
//! Edges can be followed toward operands (the usual direction) or toward
//! users. Hooks fire on the state transitions: `previsit` when a gate is
//! first entered, `postvisit` when its whole subtree has been finished.

use crate::circuit::Circuit;
use crate::gate::GateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfsState {
    Unvisited,
    Entered,
    Visited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfsDirection {
    ToOperands,
    ToUsers,
}

/// Runs an explicit-stack DFS from each start gate in order and returns the
/// final per-gate state vector. Gates unreachable from the starts stay
/// `Unvisited`.
pub fn perform_dfs(
    circuit: &Circuit,
    starts: &[GateId],
    direction: DfsDirection,
    mut previsit: impl FnMut(GateId),
    mut postvisit: impl FnMut(GateId),
) -> Vec<DfsState> {
    let mut states = vec![DfsState::Unvisited; circuit.gate_count()];
    let mut stack = Vec::new();

    for &start in starts {
        if states[start] == DfsState::Unvisited {
            stack.push(start);
        }
        while let Some(&top) = stack.last() {
            match states[top] {
                DfsState::Unvisited => {
                    previsit(top);
                    states[top] = DfsState::Entered;
                    let next = match direction {
                        DfsDirection::ToOperands => circuit.operands(top),
                        DfsDirection::ToUsers => circuit.users(top),
                    };
                    for &n in next.iter().rev() {
                        if states[n] == DfsState::Unvisited {
                            stack.push(n);
                        }
                    }
                }
                DfsState::Entered => {
                    states[top] = DfsState::Visited;
                    postvisit(top);
                    stack.pop();
                }
                DfsState::Visited => {
                    stack.pop();
                }
            }
        }
    }

    states
}

/// Topological ordering of all gates: every gate appears before each of its
/// users. The order is the DFS postorder from the sink gates (gates without
/// users) along operand edges; disconnected gates are appended afterwards in
/// ascending id order so the result is a permutation of `0..N`.
pub fn top_sort(circuit: &Circuit) -> Vec<GateId> {
    let sinks: Vec<GateId> = (0..circuit.gate_count())
        .filter(|&id| circuit.users(id).is_empty())
        .collect();

    let mut order = Vec::with_capacity(circuit.gate_count());
    let states = perform_dfs(
        circuit,
        &sinks,
        DfsDirection::ToOperands,
        |_| {},
        |id| order.push(id),
    );
    for (id, state) in states.iter().enumerate() {
        if *state == DfsState::Unvisited {
            order.push(id);
        }
    }
    order
}
