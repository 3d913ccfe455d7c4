//! Three-valued operator tables.
//!
//! Operators are total over {FALSE, TRUE, UNDEFINED} and encoded as lookup
//! arrays indexed by the packed state discriminants, so evaluation never
//! branches on operand values. The fold-map entry point evaluates a variadic
//! operator over a gate id container, short-circuiting on the absorbing
//! element where one exists (FALSE for the AND family, TRUE for the OR
//! family).

use anyhow::{bail, Result};

use crate::gate::{GateId, GateState, GateType};

use GateState::{False, True, Undefined};

const NOT_TABLE: [GateState; 3] = [True, False, Undefined];

const AND_TABLE: [GateState; 9] = [
    False, False, False, //     a = FALSE
    False, True, Undefined, //  a = TRUE
    False, Undefined, Undefined, // a = UNDEFINED
];

const OR_TABLE: [GateState; 9] = [
    False, True, Undefined, //  a = FALSE
    True, True, True, //        a = TRUE
    Undefined, True, Undefined, // a = UNDEFINED
];

const XOR_TABLE: [GateState; 9] = [
    False, True, Undefined, //  a = FALSE
    True, False, Undefined, //  a = TRUE
    Undefined, Undefined, Undefined, // a = UNDEFINED
];

// MUX(s, a, b): a when s = FALSE, b when s = TRUE, UNDEFINED when s is.
const MUX_TABLE: [GateState; 27] = [
    // s = FALSE: value of a
    False, False, False, //
    True, True, True, //
    Undefined, Undefined, Undefined, //
    // s = TRUE: value of b
    False, True, Undefined, //
    False, True, Undefined, //
    False, True, Undefined, //
    // s = UNDEFINED
    Undefined, Undefined, Undefined, //
    Undefined, Undefined, Undefined, //
    Undefined, Undefined, Undefined, //
];

pub fn not(a: GateState) -> GateState {
    NOT_TABLE[a as usize]
}

pub fn and(a: GateState, b: GateState) -> GateState {
    AND_TABLE[a as usize * 3 + b as usize]
}

pub fn or(a: GateState, b: GateState) -> GateState {
    OR_TABLE[a as usize * 3 + b as usize]
}

pub fn xor(a: GateState, b: GateState) -> GateState {
    XOR_TABLE[a as usize * 3 + b as usize]
}

pub fn mux(s: GateState, a: GateState, b: GateState) -> GateState {
    MUX_TABLE[s as usize * 9 + a as usize * 3 + b as usize]
}

fn fold(
    table: &[GateState; 9],
    operands: &[GateId],
    lookup: &mut impl FnMut(GateId) -> GateState,
    absorbing: Option<GateState>,
) -> GateState {
    let mut state = table[lookup(operands[0]) as usize * 3 + lookup(operands[1]) as usize];
    for &operand in &operands[2..] {
        if Some(state) == absorbing {
            return state;
        }
        state = table[state as usize * 3 + lookup(operand) as usize];
    }
    state
}

/// Evaluates `gate_type` over `operands`, resolving operand values through
/// `lookup`. Fails on arity violations; INPUT gates carry no operator and
/// must be resolved by the caller.
pub fn eval_gate(
    gate_type: GateType,
    operands: &[GateId],
    lookup: &mut impl FnMut(GateId) -> GateState,
) -> Result<GateState> {
    if operands.len() < gate_type.min_arity() {
        bail!(
            "operator {} applied to {} operands",
            gate_type.as_str(),
            operands.len()
        );
    }
    Ok(match gate_type {
        GateType::Not => not(lookup(operands[0])),
        GateType::Iff | GateType::Buff => lookup(operands[0]),
        GateType::And => fold(&AND_TABLE, operands, lookup, Some(False)),
        GateType::Nand => not(fold(&AND_TABLE, operands, lookup, Some(False))),
        GateType::Or => fold(&OR_TABLE, operands, lookup, Some(True)),
        GateType::Nor => not(fold(&OR_TABLE, operands, lookup, Some(True))),
        GateType::Xor => fold(&XOR_TABLE, operands, lookup, None),
        GateType::Nxor => not(fold(&XOR_TABLE, operands, lookup, None)),
        GateType::Mux => mux(lookup(operands[0]), lookup(operands[1]), lookup(operands[2])),
        GateType::ConstFalse => False,
        GateType::ConstTrue => True,
        GateType::Input => bail!("INPUT gates have no operator"),
    })
}
