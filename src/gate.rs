use anyhow::{bail, Result};

/// Dense gate identifier. Ids of a circuit always cover `0..N` with no holes.
pub type GateId = usize;

/// Ternary value a gate can take during symbolic evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateState {
    False = 0,
    True = 1,
    Undefined = 2,
}

impl GateState {
    pub fn is_undefined(self) -> bool {
        self == GateState::Undefined
    }
}

/// Closed set of supported gate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GateType {
    Input,
    Not,
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Nxor,
    Iff,
    Mux,
    Buff,
    ConstFalse,
    ConstTrue,
}

impl GateType {
    /// True when operands can be reordered without changing the result.
    /// MUX is the only positional operator.
    pub fn is_symmetric(self) -> bool {
        self != GateType::Mux
    }

    /// True for operators that accept more operands than their minimum arity.
    pub fn is_expandable(self) -> bool {
        matches!(
            self,
            GateType::And
                | GateType::Nand
                | GateType::Or
                | GateType::Nor
                | GateType::Xor
                | GateType::Nxor
        )
    }

    pub fn is_constant(self) -> bool {
        matches!(self, GateType::ConstFalse | GateType::ConstTrue)
    }

    /// Minimum number of operands the operator is well formed with.
    pub fn min_arity(self) -> usize {
        match self {
            GateType::Input | GateType::ConstFalse | GateType::ConstTrue => 0,
            GateType::Not | GateType::Iff | GateType::Buff => 1,
            GateType::And
            | GateType::Nand
            | GateType::Or
            | GateType::Nor
            | GateType::Xor
            | GateType::Nxor => 2,
            GateType::Mux => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateType::Input => "INPUT",
            GateType::Not => "NOT",
            GateType::And => "AND",
            GateType::Nand => "NAND",
            GateType::Or => "OR",
            GateType::Nor => "NOR",
            GateType::Xor => "XOR",
            GateType::Nxor => "NXOR",
            GateType::Iff => "IFF",
            GateType::Mux => "MUX",
            GateType::Buff => "BUFF",
            GateType::ConstFalse => "CONST_FALSE",
            GateType::ConstTrue => "CONST_TRUE",
        }
    }

    pub fn from_name(name: &str) -> Result<GateType> {
        Ok(match name {
            "NOT" => GateType::Not,
            "AND" => GateType::And,
            "NAND" => GateType::Nand,
            "OR" => GateType::Or,
            "NOR" => GateType::Nor,
            "XOR" => GateType::Xor,
            "NXOR" | "XNOR" => GateType::Nxor,
            "IFF" => GateType::Iff,
            "MUX" => GateType::Mux,
            "BUFF" | "BUF" => GateType::Buff,
            "CONST_FALSE" => GateType::ConstFalse,
            "CONST_TRUE" => GateType::ConstTrue,
            _ => bail!("unsupported operator '{}'", name),
        })
    }
}

/// One gate's operator and operand list.
///
/// Invariant: operands of symmetric operators are stored in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GateInfo {
    gate_type: GateType,
    operands: Vec<GateId>,
}

impl GateInfo {
    pub fn new(gate_type: GateType, mut operands: Vec<GateId>) -> Self {
        if gate_type.is_symmetric() {
            operands.sort_unstable();
        }
        Self {
            gate_type,
            operands,
        }
    }

    pub fn gate_type(&self) -> GateType {
        self.gate_type
    }

    pub fn operands(&self) -> &[GateId] {
        &self.operands
    }
}
