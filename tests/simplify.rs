use benchsimp::assignment::Assignment;
use benchsimp::circuit::bench::parse_bench_str;
use benchsimp::circuit::Circuit;
use benchsimp::encoder::Encoder;
use benchsimp::gate::{GateState, GateType};
use benchsimp::simplify::strategy::{
    constant_gate_reducer, duplicate_gates_cleaner, duplicate_operands_cleaner,
    redundant_gates_cleaner, reduce_not_composition,
};
use benchsimp::simplify::{Composition, SimplifyContext, Transformer};

fn cleaned(src: &str, preset: fn() -> Composition) -> (Circuit, Encoder) {
    let parsed = parse_bench_str(src).expect("parse");
    let mut ctx = SimplifyContext::new();
    preset()
        .transform(parsed.circuit, parsed.encoder, &mut ctx)
        .expect("simplify")
}

/// Evaluates the named outputs under a total assignment of the named inputs.
fn eval_by_name(
    circuit: &Circuit,
    encoder: &Encoder,
    inputs: &[(&str, bool)],
) -> Vec<Option<bool>> {
    let mut asmt = Assignment::new();
    for &(name, value) in inputs {
        if let Some(id) = encoder.get(name) {
            asmt.assign(
                id,
                if value {
                    GateState::True
                } else {
                    GateState::False
                },
            );
        }
    }
    let result = circuit.evaluate(&asmt).expect("evaluate");
    circuit
        .outputs()
        .iter()
        .map(|&out| match result.get(out) {
            GateState::True => Some(true),
            GateState::False => Some(false),
            GateState::Undefined => None,
        })
        .collect()
}

/// Checks that simplification preserved the function over every assignment
/// of the original circuit's inputs.
fn assert_equivalent(src: &str, preset: fn() -> Composition) -> (Circuit, Encoder) {
    let parsed = parse_bench_str(src).expect("parse");
    let original = parsed.circuit;
    let original_encoder = parsed.encoder;
    let input_names: Vec<String> = original
        .inputs()
        .iter()
        .map(|&id| original_encoder.decode(id).expect("name").to_string())
        .collect();

    let (simplified, simplified_encoder) = cleaned(src, preset);

    for bits in 0..(1u32 << input_names.len()) {
        let values: Vec<(&str, bool)> = input_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), bits & (1 << i) != 0))
            .collect();
        let before = eval_by_name(&original, &original_encoder, &values);
        let after = eval_by_name(&simplified, &simplified_encoder, &values);
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            if let (Some(b), Some(a)) = (b, a) {
                assert_eq!(b, a, "function changed for input pattern {:b}", bits);
            }
        }
    }
    (simplified, simplified_encoder)
}

fn assert_idempotent(src: &str, preset: fn() -> Composition) {
    let (once, encoder) = cleaned(src, preset);
    let mut ctx = SimplifyContext::new();
    let (twice, _) = preset()
        .transform(once.clone(), encoder, &mut ctx)
        .expect("second application");
    assert_eq!(once, twice);
}

#[test]
fn pass_through_via_duplicate_operands() {
    let src = "\
INPUT(0)
INPUT(1)
OUTPUT(5)
2 = NOT(0)
3 = AND(2, 0)
4 = NOT(3)
5 = XOR(4, 1)
";
    // AND(x, NOT(x)) = FALSE, so the XOR degenerates to NOT(1).
    let (circuit, _) = assert_equivalent(src, duplicate_operands_cleaner);
    assert_eq!(circuit.gate_count(), 2);
    assert_eq!(circuit.inputs().len(), 1);
    let out = circuit.outputs()[0];
    assert_eq!(circuit.gate_type(out), GateType::Not);
    assert_eq!(circuit.operands(out), circuit.inputs());
}

#[test]
fn double_negation_chain_collapses() {
    let src = "\
INPUT(0)
INPUT(1)
OUTPUT(9)
6 = NOT(0)
7 = NOT(6)
8 = NOT(7)
9 = AND(8, 1)
";
    let (circuit, _) = assert_equivalent(src, duplicate_operands_cleaner);
    assert_eq!(circuit.gate_count(), 4);
    let not_gates = (0..circuit.gate_count())
        .filter(|&id| circuit.gate_type(id) == GateType::Not)
        .count();
    assert_eq!(not_gates, 1);
    let out = circuit.outputs()[0];
    assert_eq!(circuit.gate_type(out), GateType::And);
}

#[test]
fn redundant_cone_is_removed() {
    let src = "\
INPUT(0)
INPUT(1)
INPUT(2)
INPUT(3)
OUTPUT(4)
4 = AND(0, 2)
5 = OR(1, 3)
";
    let (circuit, _) = assert_equivalent(src, redundant_gates_cleaner);
    assert_eq!(circuit.gate_count(), 3);
    assert_eq!(circuit.inputs().len(), 2);
    let out = circuit.outputs()[0];
    assert_eq!(circuit.gate_type(out), GateType::And);
}

#[test]
fn constant_true_operand_vanishes() {
    let src = "\
INPUT(0)
OUTPUT(2)
1 = CONST(1)
2 = AND(0, 1)
";
    let (circuit, _) = assert_equivalent(src, duplicate_operands_cleaner);
    // A single INPUT acting as the output.
    assert_eq!(circuit.gate_count(), 1);
    assert_eq!(circuit.gate_type(circuit.outputs()[0]), GateType::Input);
}

#[test]
fn constant_output_gets_the_or_gadget() {
    let src = "\
INPUT(0)
OUTPUT(2)
1 = CONST(1)
2 = MUX(1, 0, 1)
";
    // MUX with a TRUE selector routes to its third operand: constantly TRUE.
    let (circuit, encoder) = cleaned(src, duplicate_operands_cleaner);
    assert_eq!(circuit.gate_count(), 3);
    let out = circuit.outputs()[0];
    assert_eq!(circuit.gate_type(out), GateType::Or);
    let operands = circuit.operands(out);
    let input = circuit.inputs()[0];
    assert!(operands.contains(&input));
    let other = operands.iter().find(|&&x| x != input).copied().expect("not");
    assert_eq!(circuit.gate_type(other), GateType::Not);
    assert_eq!(circuit.operands(other), &[input]);
    // The output is TRUE whatever the input.
    let input_name = encoder.decode(input).expect("name").to_string();
    for value in [false, true] {
        let states = eval_by_name(&circuit, &encoder, &[(&input_name, value)]);
        assert_eq!(states[0], Some(true));
    }
}

#[test]
fn xor_of_equal_operands_gets_the_and_gadget() {
    let src = "\
INPUT(0)
OUTPUT(1)
1 = XOR(0, 0)
";
    let (circuit, encoder) = cleaned(src, duplicate_operands_cleaner);
    assert_eq!(circuit.gate_count(), 3);
    let out = circuit.outputs()[0];
    assert_eq!(circuit.gate_type(out), GateType::And);
    let input_name = encoder
        .decode(circuit.inputs()[0])
        .expect("name")
        .to_string();
    for value in [false, true] {
        let states = eval_by_name(&circuit, &encoder, &[(&input_name, value)]);
        assert_eq!(states[0], Some(false));
    }
}

#[test]
fn cleaners_are_idempotent() {
    let src = "\
INPUT(0)
INPUT(1)
INPUT(2)
OUTPUT(9)
3 = NOT(0)
4 = NOT(3)
5 = AND(0, 1)
6 = AND(1, 0)
7 = OR(5, 6)
8 = XOR(4, 2)
9 = AND(7, 8)
";
    assert_idempotent(src, redundant_gates_cleaner);
    assert_idempotent(src, duplicate_gates_cleaner);
    assert_idempotent(src, reduce_not_composition);
    assert_idempotent(src, constant_gate_reducer);

    // The duplicate-gate merge above manufactures a repeated-operand OR, so
    // the operand cleaner needs one more round there; on a duplicate-free
    // circuit it settles after a single application.
    let duplicate_free = "\
INPUT(0)
INPUT(1)
INPUT(2)
OUTPUT(7)
3 = NOT(0)
4 = NOT(3)
5 = AND(0, 1)
6 = OR(5, 2)
7 = XOR(4, 6)
";
    assert_idempotent(duplicate_free, duplicate_operands_cleaner);
}

#[test]
fn pipeline_preserves_structure_invariants() {
    let src = "\
INPUT(a)
INPUT(b)
INPUT(c)
OUTPUT(o1)
OUTPUT(o2)
n1 = AND(a, b)
n2 = AND(b, a)
n3 = NOT(n1)
n4 = NOT(n3)
o1 = OR(n4, c)
o2 = XOR(n2, n2)
";
    let (circuit, encoder) = assert_equivalent(src, duplicate_operands_cleaner);

    // Encoder stays a bijection over the surviving ids.
    let mut names = std::collections::HashSet::new();
    for id in 0..circuit.gate_count() {
        let name = encoder.decode(id).expect("every gate has a name");
        assert!(names.insert(name.to_string()));
        assert_eq!(encoder.get(name), Some(id));
    }

    // Users and operands stay dual.
    for id in 0..circuit.gate_count() {
        for &user in circuit.users(id) {
            assert!(circuit.operands(user).contains(&id));
        }
        for &operand in circuit.operands(id) {
            assert!(circuit.users(operand).contains(&id));
        }
    }
}

#[test]
fn gate_count_never_grows() {
    let sources = [
        "INPUT(a)\nOUTPUT(o)\no = AND(a, a)\n",
        "INPUT(a)\nINPUT(b)\nOUTPUT(o)\nn1 = AND(a, b)\nn2 = AND(b, a)\no = OR(n1, n2)\n",
        "INPUT(a)\nINPUT(b)\nOUTPUT(o)\nc = CONST(1)\nn = AND(a, c)\no = XOR(n, b)\n",
    ];
    for src in sources {
        let parsed = parse_bench_str(src).expect("parse");
        let non_input_before = parsed.circuit.gate_count() - parsed.circuit.inputs().len();
        let (simplified, _) = cleaned(src, duplicate_operands_cleaner);
        let non_input_after = simplified.gate_count() - simplified.inputs().len();
        assert!(non_input_after <= non_input_before);
    }
}
