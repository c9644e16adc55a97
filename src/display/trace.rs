//! Presentation of compute results: rounding and a readable calculation trace.
//!
//! Values are only rounded here. Everything upstream keeps full precision.
use crate::computation::{ComputeResult, Step};
use crate::store::FormulaDefinition;
use std::fmt::Write;

pub const DEFAULT_DIGITS: u32 = 6;
/// Beyond this an f64 has no meaningful fractional digits left to show.
pub const MAX_DISPLAY_DIGITS: u32 = 15;

/// Rounds to `digits` fractional digits, half away from zero.
///
/// Values too large to scale are returned unchanged.
pub fn round_for_display(value: f64, digits: u32) -> f64 {
    let k = 10f64.powi(digits as i32);
    let scaled = value * k;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / k;
    // avoid "-0" in output
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn round_step(step: &Step, digits: u32) -> Step {
    Step { value: round_for_display(step.value, digits), ..step.clone() }
}

/// Rounds every step to `digits`; the result itself uses the formula's own
/// precision when it declares one.
pub fn round_result(result: &ComputeResult, digits: u32) -> ComputeResult {
    ComputeResult {
        result: round_step(&result.result, result.result_digits.unwrap_or(digits)),
        steps: result.steps.iter().map(|s| round_step(s, digits)).collect(),
        result_digits: result.result_digits,
    }
}

pub fn format_trace(definition: &FormulaDefinition, result: &ComputeResult, digits: u32) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "CALCULATION TRACE for '{}' ({}):", definition.id, definition.title);
    let _ = writeln!(output, "--------------------------------------------------");
    let _ = writeln!(output, "Formula: {}", definition.display_expression);
    for step in &definition.intermediates {
        let _ = writeln!(output, "  {} = {}", step.name, step.expression);
    }
    let _ = writeln!(output, "  {} = {}", definition.result_label, definition.expression);
    let _ = writeln!(output);

    let result_digits = definition.result_digits.unwrap_or(digits);
    let _ = writeln!(output, "{}", format_step(&result.result, result_digits));
    for (i, step) in result.steps.iter().enumerate() {
        let connector = if i == result.steps.len() - 1 { "`--" } else { "|--" };
        let _ = writeln!(output, "{} {}", connector, format_step(step, digits));
    }
    output
}

fn format_step(step: &Step, digits: u32) -> String {
    let value = round_for_display(step.value, digits);
    match &step.unit {
        Some(unit) => format!("{} = {} {}", step.label, value, unit),
        None => format!("{} = {}", step.label, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::builtin_definitions;
    use rstest::rstest;

    #[rstest]
    #[case(166.666_666_666_7, 6, 166.666_667)]
    #[case(2.5, 0, 3.0)]
    #[case(-2.5, 0, -3.0)]
    #[case(0.0015, 6, 0.0015)]
    #[case(-0.000_000_1, 6, 0.0)]
    #[case(1e305, 6, 1e305)]
    fn test_round_for_display(#[case] value: f64, #[case] digits: u32, #[case] expected: f64) {
        assert_eq!(round_for_display(value, digits), expected);
    }

    #[test]
    fn test_format_trace() {
        let def = builtin_definitions().into_iter().find(|d| d.id == "steel-axial-stress").unwrap();
        let result = ComputeResult {
            result: Step { label: "σ".into(), value: 166.666_666_666_7, unit: Some("MPa".into()) },
            steps: vec![
                Step { label: "Axial force N".into(), value: 250.0, unit: Some("kN".into()) },
                Step { label: "Area A".into(), value: 1500.0, unit: Some("mm²".into()) },
                Step { label: "N".into(), value: 250_000.0, unit: Some("N".into()) },
            ],
            result_digits: None,
        };
        let trace = format_trace(&def, &result, DEFAULT_DIGITS);
        let lines: Vec<&str> = trace.lines().collect();

        assert!(lines[0].starts_with("CALCULATION TRACE for 'steel-axial-stress'"));
        assert!(trace.contains("  N = N_kN * 1000\n"));
        assert!(trace.contains("σ = 166.666667 MPa\n"));
        assert!(trace.contains("|-- Axial force N = 250 kN\n"));
        assert_eq!(lines.last(), Some(&"`-- N = 250000 N"));
    }

    #[test]
    fn test_result_uses_formula_precision() {
        let def = builtin_definitions().into_iter().find(|d| d.id == "unit-mm2-to-m2").unwrap();
        let result = ComputeResult {
            result: Step { label: "A".into(), value: 0.4 / 1e6, unit: Some("m²".into()) },
            steps: vec![Step { label: "Area".into(), value: 0.123_456_789, unit: Some("mm²".into()) }],
            result_digits: def.result_digits,
        };

        let rounded = round_result(&result, DEFAULT_DIGITS);
        assert_eq!(rounded.result.value, 4e-7);
        assert_eq!(rounded.steps[0].value, 0.123_457);

        let trace = format_trace(&def, &result, DEFAULT_DIGITS);
        assert!(trace.contains("A = 0.0000004 m²\n"));
    }
}
