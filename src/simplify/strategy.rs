//! Shipping pass pipelines.
//!
//! Each preset bundles a cleaner with the normalization passes it requires
//! around it, so a preset is always safe to run on any well-formed circuit.

use crate::simplify::constant_reducer::ConstantGateReducer;
use crate::simplify::db::Basis;
use crate::simplify::duplicate_gates::DuplicateGatesCleaner;
use crate::simplify::duplicate_operands::DuplicateOperandsCleaner;
use crate::simplify::minimize::SubcircuitMinimizer;
use crate::simplify::redundant::RedundantGatesCleaner;
use crate::simplify::reduce_not::NotChainCollapser;
use crate::simplify::{Composition, Nest, Transformer};

pub fn redundant_gates_cleaner() -> Composition {
    Composition::new(vec![Box::new(RedundantGatesCleaner::new())])
}

pub fn duplicate_gates_cleaner() -> Composition {
    Composition::new(vec![
        Box::new(RedundantGatesCleaner::new()),
        Box::new(DuplicateGatesCleaner::new()),
    ])
}

pub fn reduce_not_composition() -> Composition {
    Composition::new(vec![
        Box::new(NotChainCollapser::new()),
        Box::new(RedundantGatesCleaner::new()),
    ])
}

pub fn constant_gate_reducer() -> Composition {
    Composition::new(vec![
        Box::new(ConstantGateReducer::new()),
        Box::new(NotChainCollapser::new()),
        Box::new(RedundantGatesCleaner::new()),
        Box::new(DuplicateGatesCleaner::new()),
    ])
}

pub fn duplicate_operands_cleaner() -> Composition {
    Composition::new(vec![
        Box::new(RedundantGatesCleaner::new()),
        Box::new(DuplicateOperandsCleaner::new()),
        // Keep the variables alive: the constant reducer's output gadget
        // needs at least one input to anchor at.
        Box::new(RedundantGatesCleaner::preserving_inputs()),
        Box::new(ConstantGateReducer::new()),
        Box::new(NotChainCollapser::new()),
        Box::new(RedundantGatesCleaner::new()),
        Box::new(DuplicateGatesCleaner::new()),
    ])
}

/// End-to-end simplification for a basis: five rounds of cleanup plus
/// subcircuit minimization, then a final cleanup. The minimizer stops
/// rewriting on its own once an iteration changes nothing.
pub fn simplification_pipeline(basis: Basis) -> Composition {
    let rounds: Vec<Box<dyn Transformer>> = vec![
        Box::new(duplicate_operands_cleaner()),
        Box::new(SubcircuitMinimizer::new(basis)),
    ];
    Composition::new(vec![
        Box::new(Nest::new(5, rounds)),
        Box::new(duplicate_operands_cleaner()),
    ])
}
