//! Reader and writer for the BENCH circuit format.
//!
//! Recognized lines: `INPUT(name)`, `OUTPUT(name)`, `name = OP(a, b, ...)`,
//! `name = CONST(0|1)` and `name = vdd` (constant TRUE, no brackets).
//! Comments start with `#`; blank lines are skipped; whitespace is allowed
//! anywhere. Ids are assigned by first mention, so outputs and operands may
//! be named before their defining line.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

use crate::circuit::Circuit;
use crate::encoder::Encoder;
use crate::gate::{GateId, GateInfo, GateType};

/// Parsed circuit together with the name encoder built while reading.
pub struct ParsedCircuit {
    pub circuit: Circuit,
    pub encoder: Encoder,
}

pub fn parse_bench_str(s: &str) -> Result<ParsedCircuit> {
    parse_bench_reader(std::io::Cursor::new(s.as_bytes()))
}

pub fn parse_bench_reader<R: BufRead>(r: R) -> Result<ParsedCircuit> {
    let mut encoder = Encoder::new();
    let mut gates: Vec<Option<GateInfo>> = Vec::new();
    let mut outputs = Vec::<GateId>::new();

    for (idx, line) in r.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.context("failed to read bench line")?;
        let clean = strip_comment(&line).trim();
        if clean.is_empty() {
            continue;
        }
        parse_line(clean, &mut encoder, &mut gates, &mut outputs)
            .with_context(|| format!("line {}: '{}'", line_no, clean))?;
    }

    if gates.len() < encoder.len() {
        // Names mentioned only as operands near the end of the file.
        gates.resize(encoder.len(), None);
    }
    let mut gate_info = Vec::with_capacity(gates.len());
    for (id, slot) in gates.into_iter().enumerate() {
        match slot {
            Some(info) => gate_info.push(info),
            None => bail!(
                "gate '{}' is referenced but never defined",
                encoder.decode(id).unwrap_or("?")
            ),
        }
    }

    let circuit = Circuit::new(gate_info, outputs)?;
    Ok(ParsedCircuit { circuit, encoder })
}

fn parse_line(
    line: &str,
    encoder: &mut Encoder,
    gates: &mut Vec<Option<GateInfo>>,
    outputs: &mut Vec<GateId>,
) -> Result<()> {
    if let Some(name) = parse_decl(line, "INPUT")? {
        let id = encoder.encode(name);
        define_gate(gates, id, GateInfo::new(GateType::Input, vec![]))?;
        return Ok(());
    }
    if let Some(name) = parse_decl(line, "OUTPUT")? {
        outputs.push(encoder.encode(name));
        return Ok(());
    }

    let (lhs_raw, rhs_raw) = line
        .split_once('=')
        .context("expected INPUT, OUTPUT or an assignment with '='")?;
    let lhs = lhs_raw.trim();
    if !is_valid_name(lhs) {
        bail!("invalid gate name '{}'", lhs);
    }
    let rhs = rhs_raw.trim();
    let id = encoder.encode(lhs);

    // Constant TRUE written without brackets.
    if rhs == "vdd" {
        define_gate(gates, id, GateInfo::new(GateType::ConstTrue, vec![]))?;
        return Ok(());
    }

    let (op_name, args) = parse_call(rhs)?;
    if op_name == "CONST" {
        let info = match args.as_slice() {
            ["0"] => GateInfo::new(GateType::ConstFalse, vec![]),
            ["1"] => GateInfo::new(GateType::ConstTrue, vec![]),
            _ => bail!("CONST takes a single 0 or 1 operand"),
        };
        define_gate(gates, id, info)?;
        return Ok(());
    }

    let gate_type = GateType::from_name(op_name)?;
    if gate_type == GateType::Input {
        bail!("INPUT is not an operator");
    }
    let expected = gate_type.min_arity();
    let arity_ok = if gate_type.is_expandable() {
        args.len() >= expected
    } else {
        args.len() == expected
    };
    if !arity_ok {
        bail!(
            "operator {} expects {} operand(s), got {}",
            op_name,
            expected,
            args.len()
        );
    }

    let mut operand_ids = Vec::with_capacity(args.len());
    for arg in &args {
        if !is_valid_name(arg) {
            bail!("invalid operand name '{}'", arg);
        }
        operand_ids.push(encoder.encode(arg));
    }
    define_gate(gates, id, GateInfo::new(gate_type, operand_ids))
}

fn define_gate(gates: &mut Vec<Option<GateInfo>>, id: GateId, info: GateInfo) -> Result<()> {
    if gates.len() <= id {
        gates.resize(id + 1, None);
    }
    if gates[id].is_some() {
        bail!("gate redefined");
    }
    gates[id] = Some(info);
    Ok(())
}

fn parse_decl<'a>(line: &'a str, kind: &str) -> Result<Option<&'a str>> {
    let Some(rest) = line.strip_prefix(kind) else {
        return Ok(None);
    };
    let rest = rest.trim_start();
    if !rest.starts_with('(') {
        // `INPUTx = ...` is an ordinary assignment, not a declaration.
        return Ok(None);
    }
    let close = rest
        .rfind(')')
        .with_context(|| format!("missing ')' in {}", kind))?;
    if !rest[close + 1..].trim().is_empty() {
        bail!("trailing text after {}", kind);
    }
    let name = rest[1..close].trim();
    if !is_valid_name(name) {
        bail!("invalid name '{}' in {}", name, kind);
    }
    Ok(Some(name))
}

fn parse_call(s: &str) -> Result<(&str, Vec<&str>)> {
    let open = s.find('(').context("missing '(' in expression")?;
    let close = s.rfind(')').context("missing ')' in expression")?;
    if close < open {
        bail!("malformed brackets in expression");
    }
    if !s[close + 1..].trim().is_empty() {
        bail!("trailing tokens after ')'");
    }
    let name = s[..open].trim();
    let inside = s[open + 1..close].trim();
    let args = if inside.is_empty() {
        Vec::new()
    } else {
        inside.split(',').map(str::trim).collect::<Vec<_>>()
    };
    if args.iter().any(|a| a.is_empty()) {
        bail!("empty operand in operator call");
    }
    Ok((name, args))
}

fn strip_comment(s: &str) -> &str {
    match s.find('#') {
        Some(idx) => &s[..idx],
        None => s,
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['=', '(', ')', ','])
}

/// Writes the circuit back as BENCH text: inputs in declaration order, a
/// blank line, outputs in declaration order, a blank line, then all
/// non-input gate definitions in ascending id order.
pub fn write_bench<W: Write>(circuit: &Circuit, encoder: &Encoder, out: &mut W) -> Result<()> {
    let name = |id: GateId| {
        encoder
            .decode(id)
            .with_context(|| format!("gate id {} has no name", id))
    };

    for &input in circuit.inputs() {
        writeln!(out, "INPUT({})", name(input)?)?;
    }
    writeln!(out)?;
    for &output in circuit.outputs() {
        writeln!(out, "OUTPUT({})", name(output)?)?;
    }
    writeln!(out)?;
    for id in 0..circuit.gate_count() {
        if circuit.gate_type(id) == GateType::Input {
            continue;
        }
        let operands = circuit
            .operands(id)
            .iter()
            .map(|&o| name(o))
            .collect::<Result<Vec<_>>>()?;
        writeln!(
            out,
            "{} = {}({})",
            name(id)?,
            circuit.gate_type(id).as_str(),
            operands.join(", ")
        )?;
    }
    Ok(())
}

/// Prints the circuit to `out` with `<id> => <name>` annotations. Used when
/// no output directory is configured.
pub fn print_annotated<W: Write>(circuit: &Circuit, encoder: &Encoder, out: &mut W) -> Result<()> {
    let name = |id: GateId| {
        encoder
            .decode(id)
            .with_context(|| format!("gate id {} has no name", id))
    };

    for &input in circuit.inputs() {
        writeln!(out, "INPUT({} => {})", input, name(input)?)?;
    }
    for &output in circuit.outputs() {
        writeln!(out, "OUTPUT({} => {})", output, name(output)?)?;
    }
    for id in 0..circuit.gate_count() {
        if circuit.gate_type(id) == GateType::Input {
            continue;
        }
        let operands = circuit
            .operands(id)
            .iter()
            .map(|&o| Ok(format!("{} => {}", o, name(o)?)))
            .collect::<Result<Vec<_>>>()?;
        writeln!(
            out,
            "{} => {} = {}({})",
            id,
            name(id)?,
            circuit.gate_type(id).as_str(),
            operands.join(", ")
        )?;
    }
    Ok(())
}
