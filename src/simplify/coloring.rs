//! Anchor-parent colorings used to enumerate candidate subcircuits.
//!
//! A two-color groups the gates dominated by an unordered pair of parent
//! gates; a three-color does the same for a triple. Parents are kept in
//! ascending id order so the pair/triple is a canonical map key.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::circuit::Circuit;
use crate::dfs::top_sort;
use crate::gate::{GateId, GateType};

pub type ColorId = usize;

pub const NO_COLOR: usize = usize::MAX;

#[derive(Debug, Clone)]
pub struct TwoColor {
    pub first_parent: GateId,
    pub second_parent: GateId,
    gates: Vec<GateId>,
}

impl TwoColor {
    fn new(a: GateId, b: GateId) -> Self {
        Self {
            first_parent: a.min(b),
            second_parent: a.max(b),
            gates: Vec::new(),
        }
    }

    pub fn gates(&self) -> &[GateId] {
        &self.gates
    }

    pub fn has_parent(&self, id: GateId) -> bool {
        self.first_parent == id || self.second_parent == id
    }
}

#[derive(Debug)]
pub struct TwoColoring {
    pub colors: Vec<TwoColor>,
    /// Color of each gate, `NO_COLOR` when unpainted.
    pub gate_color: Vec<ColorId>,
    pub parents_to_color: HashMap<(GateId, GateId), ColorId>,
}

impl TwoColoring {
    fn add_color(&mut self, a: GateId, b: GateId) -> ColorId {
        let color_id = self.colors.len();
        let color = TwoColor::new(a, b);
        self.parents_to_color
            .insert((color.first_parent, color.second_parent), color_id);
        self.colors.push(color);
        color_id
    }

    fn paint(&mut self, gate: GateId, color: ColorId) {
        self.colors[color].gates.push(gate);
        self.gate_color[gate] = color;
    }

    pub fn color_of_parents(&self, a: GateId, b: GateId) -> Option<ColorId> {
        self.parents_to_color.get(&(a.min(b), a.max(b))).copied()
    }

    /// Paints the whole circuit in one inputs-first topological walk.
    /// Operands reached through chains of unary gates are skipped down to
    /// their first non-unary ancestor before the paint rules apply.
    pub fn build(circuit: &Circuit) -> Result<TwoColoring> {
        let order = top_sort(circuit);
        let mut coloring = TwoColoring {
            colors: Vec::new(),
            gate_color: vec![NO_COLOR; circuit.gate_count()],
            parents_to_color: HashMap::new(),
        };

        for &gate_id in &order {
            let operands = circuit.operands(gate_id);
            if operands.is_empty() {
                continue;
            }
            if operands.len() == 1 {
                let operand_color = coloring.gate_color[operands[0]];
                if operand_color != NO_COLOR {
                    coloring.paint(gate_id, operand_color);
                }
                continue;
            }
            if operands.len() > 2 {
                bail!(
                    "coloring requires binary gates, gate {} has {} operands",
                    gate_id,
                    operands.len()
                );
            }

            let child_1 = skip_unary_chain(circuit, operands[0]);
            let child_2 = skip_unary_chain(circuit, operands[1]);
            let color_1 = coloring.gate_color[child_1];
            let color_2 = coloring.gate_color[child_2];

            if child_1 == child_2 {
                if color_1 != NO_COLOR {
                    coloring.paint(gate_id, color_1);
                }
                continue;
            }

            if color_1 != NO_COLOR && color_1 == color_2 {
                coloring.paint(gate_id, color_1);
            } else if color_1 != NO_COLOR && coloring.colors[color_1].has_parent(child_2) {
                coloring.paint(gate_id, color_1);
            } else if color_2 != NO_COLOR && coloring.colors[color_2].has_parent(child_1) {
                coloring.paint(gate_id, color_2);
            } else if let Some(existing) = coloring.color_of_parents(child_1, child_2) {
                coloring.paint(gate_id, existing);
            } else {
                let fresh = coloring.add_color(child_1, child_2);
                coloring.paint(gate_id, fresh);
            }
        }

        Ok(coloring)
    }
}

fn skip_unary_chain(circuit: &Circuit, mut id: GateId) -> GateId {
    while circuit.operands(id).len() == 1 {
        id = circuit.operands(id)[0];
    }
    id
}

#[derive(Debug, Clone)]
pub struct ThreeColor {
    pub first_parent: GateId,
    pub second_parent: GateId,
    pub third_parent: GateId,
    gates: Vec<GateId>,
}

impl ThreeColor {
    fn new(a: GateId, b: GateId, c: GateId) -> Self {
        let [p0, p1, p2] = sorted_triple(a, b, c);
        Self {
            first_parent: p0,
            second_parent: p1,
            third_parent: p2,
            gates: Vec::new(),
        }
    }

    pub fn gates(&self) -> &[GateId] {
        &self.gates
    }

    pub fn parents(&self) -> [GateId; 3] {
        [self.first_parent, self.second_parent, self.third_parent]
    }

    pub fn has_parent(&self, id: GateId) -> bool {
        self.first_parent == id || self.second_parent == id || self.third_parent == id
    }
}

fn sorted_triple(a: GateId, b: GateId, c: GateId) -> [GateId; 3] {
    let mut parents = [a, b, c];
    parents.sort_unstable();
    parents
}

#[derive(Debug)]
pub struct ThreeColoring {
    /// The two-coloring the cascade is built on, exposed so the minimizer
    /// shares it instead of painting twice.
    pub two: TwoColoring,
    pub colors: Vec<ThreeColor>,
    /// Up to two colors per gate.
    pub gate_colors: Vec<Vec<ColorId>>,
    pub parents_to_color: HashMap<[GateId; 3], ColorId>,
    /// For each gate, the id of an immediate NOT user, last one wins;
    /// `NO_COLOR` when there is none.
    pub negation_users: Vec<GateId>,
}

impl ThreeColoring {
    fn add_color(&mut self, parents: [GateId; 3]) -> ColorId {
        let color_id = self.colors.len();
        self.parents_to_color.insert(parents, color_id);
        self.colors
            .push(ThreeColor::new(parents[0], parents[1], parents[2]));
        color_id
    }

    fn paint(&mut self, gate: GateId, color: ColorId) {
        self.colors[color].gates.push(gate);
        self.gate_colors[gate].push(color);
    }

    fn paint_triple(&mut self, gate: GateId, parents: [GateId; 3]) {
        let color = match self.parents_to_color.get(&parents).copied() {
            Some(existing) => existing,
            None => self.add_color(parents),
        };
        self.paint(gate, color);
    }

    pub fn build(circuit: &Circuit) -> Result<ThreeColoring> {
        let order = top_sort(circuit);
        let two = TwoColoring::build(circuit)?;
        let mut coloring = ThreeColoring {
            two,
            colors: Vec::new(),
            gate_colors: vec![Vec::new(); circuit.gate_count()],
            parents_to_color: HashMap::new(),
            negation_users: vec![NO_COLOR; circuit.gate_count()],
        };

        for &gate_id in &order {
            let operands = circuit.operands(gate_id);
            if operands.is_empty() {
                continue;
            }
            if operands.len() == 1 {
                let inherited = coloring.gate_colors[operands[0]].clone();
                for color in inherited {
                    coloring.paint(gate_id, color);
                }
                if circuit.gate_type(gate_id) == GateType::Not {
                    coloring.negation_users[operands[0]] = gate_id;
                }
                continue;
            }
            if operands.len() > 2 {
                bail!(
                    "coloring requires binary gates, gate {} has {} operands",
                    gate_id,
                    operands.len()
                );
            }

            let two_color = coloring.two.gate_color[gate_id];
            if two_color == NO_COLOR {
                continue;
            }
            let child_1 = coloring.two.colors[two_color].first_parent;
            let child_2 = coloring.two.colors[two_color].second_parent;

            // Without any colored child the gate cannot witness a triple.
            if coloring.two.gate_color[child_1] == NO_COLOR
                && coloring.two.gate_color[child_2] == NO_COLOR
            {
                continue;
            }

            // Classify how the children's three-colors relate to each other.
            let mut common_colors = Vec::new();
            let mut color_type_13 = NO_COLOR;
            let mut color_type_31 = NO_COLOR;
            for &first_color in &coloring.gate_colors[child_1] {
                for &second_color in &coloring.gate_colors[child_2] {
                    if first_color == second_color {
                        common_colors.push(first_color);
                    } else if coloring.colors[second_color].has_parent(child_1) {
                        color_type_13 = second_color;
                    }
                }
                if coloring.colors[first_color].has_parent(child_2) {
                    color_type_31 = first_color;
                }
            }

            if common_colors.len() == 2 {
                coloring.paint(gate_id, common_colors[0]);
                coloring.paint(gate_id, common_colors[1]);
                continue;
            }

            if common_colors.len() == 1 {
                coloring.paint(gate_id, common_colors[0]);
                if color_type_13 != NO_COLOR {
                    coloring.paint(gate_id, color_type_13);
                } else if color_type_31 != NO_COLOR {
                    coloring.paint(gate_id, color_type_31);
                }
                continue;
            }

            if color_type_13 != NO_COLOR {
                coloring.paint(gate_id, color_type_13);
                let first_child_two = coloring.two.gate_color[child_1];
                if first_child_two != NO_COLOR {
                    let parent_1 = coloring.two.colors[first_child_two].first_parent;
                    let parent_2 = coloring.two.colors[first_child_two].second_parent;
                    let found = coloring.gate_colors[child_2]
                        .iter()
                        .copied()
                        .find(|&c| {
                            coloring.colors[c].has_parent(parent_1)
                                && coloring.colors[c].has_parent(parent_2)
                        });
                    match found {
                        Some(color) => coloring.paint(gate_id, color),
                        None => coloring
                            .paint_triple(gate_id, sorted_triple(parent_1, parent_2, child_2)),
                    }
                }
                continue;
            }

            if color_type_31 != NO_COLOR {
                coloring.paint(gate_id, color_type_31);
                let second_child_two = coloring.two.gate_color[child_2];
                if second_child_two != NO_COLOR {
                    let parent_1 = coloring.two.colors[second_child_two].first_parent;
                    let parent_2 = coloring.two.colors[second_child_two].second_parent;
                    let found = coloring.gate_colors[child_1]
                        .iter()
                        .copied()
                        .find(|&c| {
                            coloring.colors[c].has_parent(parent_1)
                                && coloring.colors[c].has_parent(parent_2)
                        });
                    match found {
                        Some(color) => coloring.paint(gate_id, color),
                        None => coloring
                            .paint_triple(gate_id, sorted_triple(parent_1, parent_2, child_1)),
                    }
                }
                continue;
            }

            let first_child_two = coloring.two.gate_color[child_1];
            let second_child_two = coloring.two.gate_color[child_2];

            // One child's triple spans the other child's two-color parents.
            if second_child_two != NO_COLOR {
                let parent_1 = coloring.two.colors[second_child_two].first_parent;
                let parent_2 = coloring.two.colors[second_child_two].second_parent;
                let found = coloring.gate_colors[child_1].iter().copied().find(|&c| {
                    coloring.colors[c].has_parent(parent_1)
                        && coloring.colors[c].has_parent(parent_2)
                });
                if let Some(color) = found {
                    coloring.paint(gate_id, color);
                    continue;
                }
            }
            if first_child_two != NO_COLOR {
                let parent_1 = coloring.two.colors[first_child_two].first_parent;
                let parent_2 = coloring.two.colors[first_child_two].second_parent;
                let found = coloring.gate_colors[child_2].iter().copied().find(|&c| {
                    coloring.colors[c].has_parent(parent_1)
                        && coloring.colors[c].has_parent(parent_2)
                });
                if let Some(color) = found {
                    coloring.paint(gate_id, color);
                    continue;
                }
            }

            // Both children carry two-colors.
            if first_child_two != NO_COLOR && second_child_two != NO_COLOR {
                let parent_1 = coloring.two.colors[first_child_two].first_parent;
                let parent_2 = coloring.two.colors[first_child_two].second_parent;
                let parent_3 = coloring.two.colors[second_child_two].first_parent;
                let parent_4 = coloring.two.colors[second_child_two].second_parent;
                if coloring.two.colors[second_child_two].has_parent(parent_1) {
                    coloring.paint_triple(gate_id, sorted_triple(parent_2, parent_3, parent_4));
                } else if coloring.two.colors[second_child_two].has_parent(parent_2) {
                    coloring.paint_triple(gate_id, sorted_triple(parent_1, parent_3, parent_4));
                } else {
                    coloring.paint_triple(gate_id, sorted_triple(parent_1, parent_2, child_2));
                    coloring.paint_triple(gate_id, sorted_triple(parent_3, parent_4, child_1));
                }
                continue;
            }

            // Exactly one child carries a two-color: its parents plus the
            // other child form the triple.
            let parents = if first_child_two != NO_COLOR {
                let parent_1 = coloring.two.colors[first_child_two].first_parent;
                let parent_2 = coloring.two.colors[first_child_two].second_parent;
                sorted_triple(parent_1, parent_2, child_2)
            } else {
                let parent_1 = coloring.two.colors[second_child_two].first_parent;
                let parent_2 = coloring.two.colors[second_child_two].second_parent;
                sorted_triple(parent_1, parent_2, child_1)
            };
            coloring.paint_triple(gate_id, parents);
        }

        Ok(coloring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::bench::parse_bench_str;

    #[test]
    fn pair_color_groups_gates_of_same_parents() {
        let src = "\
INPUT(a)
INPUT(b)
OUTPUT(o)
n1 = AND(a, b)
n2 = NAND(a, b)
o = AND(n1, n2)
";
        let parsed = parse_bench_str(src).expect("parse");
        let coloring = TwoColoring::build(&parsed.circuit).expect("coloring");
        // a=0, b=1, o=2, n1=3, n2=4. n1 and n2 share the (a, b) color;
        // o joins it because both children resolve to that pair's color.
        let color = coloring.gate_color[3];
        assert_ne!(color, NO_COLOR);
        assert_eq!(coloring.gate_color[4], color);
        assert_eq!(coloring.gate_color[2], color);
        assert_eq!(coloring.colors[color].first_parent, 0);
        assert_eq!(coloring.colors[color].second_parent, 1);
    }

    #[test]
    fn unary_gates_inherit_colors() {
        let src = "\
INPUT(a)
INPUT(b)
OUTPUT(o)
n1 = AND(a, b)
o = NOT(n1)
";
        let parsed = parse_bench_str(src).expect("parse");
        let coloring = TwoColoring::build(&parsed.circuit).expect("coloring");
        assert_eq!(coloring.gate_color[2], coloring.gate_color[3]);
    }

    #[test]
    fn triple_emerges_from_two_pair_children() {
        let src = "\
INPUT(a)
INPUT(b)
INPUT(c)
OUTPUT(o)
t1 = AND(a, b)
t2 = AND(a, c)
o = AND(t1, t2)
";
        let parsed = parse_bench_str(src).expect("parse");
        let coloring = ThreeColoring::build(&parsed.circuit).expect("coloring");
        // a=0, b=1, c=2, o=3, t1=4, t2=5.
        let colors = &coloring.gate_colors[3];
        assert_eq!(colors.len(), 1);
        assert_eq!(coloring.colors[colors[0]].parents(), [0, 1, 2]);
        assert_eq!(coloring.colors[colors[0]].gates(), &[3]);
    }

    #[test]
    fn negation_users_are_tracked() {
        let src = "\
INPUT(a)
INPUT(b)
OUTPUT(o)
n = NOT(a)
o = AND(n, b)
";
        let parsed = parse_bench_str(src).expect("parse");
        let coloring = ThreeColoring::build(&parsed.circuit).expect("coloring");
        // a=0, n=3.
        assert_eq!(coloring.negation_users[0], 3);
        assert_eq!(coloring.negation_users[1], NO_COLOR);
    }

    #[test]
    fn ternary_gates_are_rejected() {
        let src = "\
INPUT(a)
INPUT(b)
INPUT(c)
OUTPUT(o)
o = MUX(a, b, c)
";
        let parsed = parse_bench_str(src).expect("parse");
        assert!(TwoColoring::build(&parsed.circuit).is_err());
    }
}
