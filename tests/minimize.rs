use std::io::Cursor;

use benchsimp::assignment::Assignment;
use benchsimp::circuit::bench::parse_bench_str;
use benchsimp::circuit::Circuit;
use benchsimp::encoder::Encoder;
use benchsimp::gate::{GateState, GateType};
use benchsimp::simplify::db::{Basis, CircuitDb};
use benchsimp::simplify::minimize::SubcircuitMinimizer;
use benchsimp::simplify::strategy::simplification_pipeline;
use benchsimp::simplify::{SimplifyContext, Transformer};

/// Three ANDs computing a & b & c; the database knows a two-AND realization
/// with output truth table 0x80.
const THREE_AND_SRC: &str = "\
INPUT(a)
INPUT(b)
INPUT(c)
OUTPUT(o)
t1 = AND(a, b)
t2 = AND(a, c)
o = AND(t1, t2)
";

const TWO_AND_DB: &str = "3 1 128 4 AND 0 1 AND 3 2\n";

fn context_with_db(db_text: &str) -> SimplifyContext {
    let db = CircuitDb::parse(Cursor::new(db_text), Basis::Aig).expect("parse db");
    let mut ctx = SimplifyContext::new();
    ctx.set_database(Basis::Aig, db);
    ctx
}

fn and_gate_count(circuit: &Circuit) -> usize {
    (0..circuit.gate_count())
        .filter(|&id| circuit.gate_type(id) == GateType::And)
        .count()
}

/// Evaluates all outputs with inputs a, b, c assigned by name, so the check
/// survives the id renumbering the passes perform.
fn eval_outputs(
    circuit: &Circuit,
    encoder: &Encoder,
    a: bool,
    b: bool,
    c: bool,
) -> Vec<bool> {
    let to_state = |v: bool| if v { GateState::True } else { GateState::False };
    let mut asmt = Assignment::new();
    for (name, value) in [("a", a), ("b", b), ("c", c)] {
        let id = encoder.get(name).expect("input name");
        asmt.assign(id, to_state(value));
    }
    let result = circuit.evaluate(&asmt).expect("evaluate");
    circuit
        .outputs()
        .iter()
        .map(|&out| result.get(out) == GateState::True)
        .collect()
}

fn all_input_triples() -> Vec<(bool, bool, bool)> {
    let mut triples = Vec::new();
    for bits in 0..8u8 {
        triples.push((bits & 1 != 0, bits & 2 != 0, bits & 4 != 0));
    }
    triples
}

#[test]
fn cheaper_database_record_is_spliced_in() {
    let parsed = parse_bench_str(THREE_AND_SRC).expect("parse");
    let mut ctx = context_with_db(TWO_AND_DB);

    let (circuit, encoder) = SubcircuitMinimizer::new(Basis::Aig)
        .transform(parsed.circuit.clone(), parsed.encoder.clone(), &mut ctx)
        .expect("minimize");

    assert_eq!(ctx.stats.iterations, 1);
    assert_eq!(ctx.stats.last_iteration_rewrites, 1);
    assert_eq!(ctx.stats.subcircuits_by_iter[0], 1);

    // One gate was minted for the record's inner AND; the displaced gates
    // are still present but dead until the next cleanup.
    assert_eq!(circuit.gate_count(), parsed.circuit.gate_count() + 1);
    for (a, b, c) in all_input_triples() {
        assert_eq!(
            eval_outputs(&circuit, &encoder, a, b, c),
            vec![a && b && c]
        );
    }
}

#[test]
fn database_miss_leaves_the_subcircuit_intact() {
    let parsed = parse_bench_str(THREE_AND_SRC).expect("parse");
    // A database with an unrelated key only.
    let mut ctx = context_with_db("3 1 192 3 AND 0 1\n");

    let (circuit, _) = SubcircuitMinimizer::new(Basis::Aig)
        .transform(parsed.circuit.clone(), parsed.encoder, &mut ctx)
        .expect("minimize");

    assert_eq!(circuit, parsed.circuit);
    assert_eq!(ctx.stats.last_iteration_rewrites, 0);
}

#[test]
fn equal_cost_record_is_not_spliced() {
    let parsed = parse_bench_str(THREE_AND_SRC).expect("parse");
    // Same function, same three-AND cost: no improvement, no rewrite.
    let mut ctx = context_with_db("3 1 128 5 AND 0 1 AND 0 2 AND 3 4\n");

    let (circuit, _) = SubcircuitMinimizer::new(Basis::Aig)
        .transform(parsed.circuit.clone(), parsed.encoder, &mut ctx)
        .expect("minimize");

    assert_eq!(circuit, parsed.circuit);
    assert_eq!(ctx.stats.last_iteration_rewrites, 0);
}

#[test]
fn missing_database_is_fatal() {
    let parsed = parse_bench_str(THREE_AND_SRC).expect("parse");
    let mut ctx = SimplifyContext::new();
    let result =
        SubcircuitMinimizer::new(Basis::Aig).transform(parsed.circuit, parsed.encoder, &mut ctx);
    assert!(result.is_err());
}

#[test]
fn full_pipeline_converges_and_shrinks() {
    let parsed = parse_bench_str(THREE_AND_SRC).expect("parse");
    let mut ctx = context_with_db(TWO_AND_DB);

    let before_ands = and_gate_count(&parsed.circuit);
    let (circuit, encoder) = simplification_pipeline(Basis::Aig)
        .transform(parsed.circuit.clone(), parsed.encoder, &mut ctx)
        .expect("pipeline");

    assert!(and_gate_count(&circuit) < before_ands);
    assert_eq!(circuit.gate_count(), 5);
    // The second iteration found nothing new and the run settled there.
    assert_eq!(ctx.stats.iterations, 2);
    assert_eq!(ctx.stats.last_iteration_rewrites, 0);

    for (a, b, c) in all_input_triples() {
        assert_eq!(
            eval_outputs(&circuit, &encoder, a, b, c),
            vec![a && b && c],
            "function changed for inputs ({}, {}, {})",
            a,
            b,
            c
        );
    }

    // Fixpoint: a fresh run over the settled circuit changes nothing.
    let mut ctx2 = context_with_db(TWO_AND_DB);
    let (again, _) = simplification_pipeline(Basis::Aig)
        .transform(circuit.clone(), encoder, &mut ctx2)
        .expect("second pipeline run");
    assert_eq!(again, circuit);
}

#[test]
fn complement_output_is_deduplicated() {
    // `neg` complements `inner`; the dedup heuristic keeps the database key
    // at one entry, so the cheap record still applies and `neg` survives as
    // the NOT it already was.
    let src = "\
INPUT(a)
INPUT(b)
INPUT(c)
OUTPUT(inner)
OUTPUT(neg)
t1 = AND(a, b)
t2 = AND(a, c)
inner = AND(t1, t2)
neg = NOT(inner)
";
    let parsed = parse_bench_str(src).expect("parse");
    let mut ctx = context_with_db(TWO_AND_DB);

    let (circuit, encoder) = simplification_pipeline(Basis::Aig)
        .transform(parsed.circuit.clone(), parsed.encoder, &mut ctx)
        .expect("pipeline");

    assert_eq!(and_gate_count(&circuit), 2);
    for (a, b, c) in all_input_triples() {
        let expected = a && b && c;
        assert_eq!(
            eval_outputs(&circuit, &encoder, a, b, c),
            vec![expected, !expected],
            "function changed for inputs ({}, {}, {})",
            a,
            b,
            c
        );
    }
}
