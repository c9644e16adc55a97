//! The built-in formula table.
//!
//! Units are normalized through intermediates (kN to N, kN·m to N·mm) so that
//! stresses come out in MPa (N/mm²).
use super::types::{FormulaDefinition, Intermediate, Parameter};

fn param(name: &str, label: &str, unit: Option<&str>, min: Option<f64>, placeholder: &str) -> Parameter {
    Parameter {
        min,
        placeholder: Some(format!("e.g. {}", placeholder)),
        ..Parameter::new(name, label, unit)
    }
}

fn step(name: &str, label: &str, unit: &str, expression: &str) -> Intermediate {
    Intermediate {
        name: name.to_string(),
        label: label.to_string(),
        unit: Some(unit.to_string()),
        expression: expression.to_string(),
    }
}

struct Builtin {
    id: &'static str,
    title: &'static str,
    description: Option<&'static str>,
    display: &'static str,
    params: Vec<Parameter>,
    intermediates: Vec<Intermediate>,
    expression: &'static str,
    result_label: &'static str,
    result_unit: Option<&'static str>,
    result_digits: Option<u32>,
}

impl From<Builtin> for FormulaDefinition {
    fn from(b: Builtin) -> Self {
        FormulaDefinition {
            id: b.id.to_string(),
            title: b.title.to_string(),
            description: b.description.map(str::to_string),
            display_expression: b.display.to_string(),
            params: b.params,
            intermediates: b.intermediates,
            expression: b.expression.to_string(),
            result_label: b.result_label.to_string(),
            result_unit: b.result_unit.map(str::to_string),
            result_digits: b.result_digits,
        }
    }
}

/// Every built-in definition, in presentation order.
pub fn builtin_definitions() -> Vec<FormulaDefinition> {
    let positive = Some(1e-9);
    let non_negative = Some(0.0);

    vec![
        Builtin {
            id: "steel-axial-stress",
            title: "Normal stress from axial force",
            description: Some("Axial force N distributed over area A. Units are reduced to MPa (N/mm²)."),
            display: r"\sigma = \dfrac{N}{A}",
            params: vec![
                param("N_kN", "Axial force N", Some("kN"), non_negative, "250"),
                param("A_mm2", "Area A", Some("mm²"), positive, "1500"),
            ],
            intermediates: vec![step("N", "N", "N", "N_kN * 1000")],
            expression: "N / A_mm2",
            result_label: "σ",
            result_unit: Some("MPa"),
            result_digits: None,
        },
        Builtin {
            id: "steel-shear-stress",
            title: "Shear stress over a given shear area",
            description: Some("Shear force V distributed over the shear area Aw supplied by the user."),
            display: r"\tau = \dfrac{V}{A_w}",
            params: vec![
                param("V_kN", "Shear force V", Some("kN"), non_negative, "80"),
                param("Aw_mm2", "Shear area Aw", Some("mm²"), positive, "900"),
            ],
            intermediates: vec![step("V", "V", "N", "V_kN * 1000")],
            expression: "V / Aw_mm2",
            result_label: "τ",
            result_unit: Some("MPa"),
            result_digits: None,
        },
        Builtin {
            id: "steel-bending-stress",
            title: "Normal stress from bending for a given W",
            description: Some("Bending moment M divided by the section modulus W supplied by the user."),
            display: r"\sigma = \dfrac{M}{W}",
            params: vec![
                param("M_kNm", "Bending moment M", Some("kN·m"), non_negative, "35"),
                param("W_mm3", "Section modulus W", Some("mm³"), positive, "2.5e6"),
            ],
            intermediates: vec![step("M", "M", "N·mm", "M_kNm * 1_000_000")],
            expression: "M / W_mm3",
            result_label: "σ",
            result_unit: Some("MPa"),
            result_digits: None,
        },
        Builtin {
            id: "utilization",
            title: "Utilization ratio",
            description: Some("Ratio of demand to capacity, usable for any check."),
            display: r"u = \dfrac{\text{demand}}{\text{capacity}}",
            params: vec![
                param("demand", "Demand", None, non_negative, "120"),
                param("capacity", "Capacity", None, positive, "150"),
            ],
            intermediates: vec![],
            expression: "demand / capacity",
            result_label: "u",
            result_unit: None,
            result_digits: None,
        },
        Builtin {
            id: "rect-area",
            title: "Rectangle area (reference)",
            description: None,
            display: r"A = b \cdot t",
            params: vec![
                param("b_mm", "Width b", Some("mm"), non_negative, "200"),
                param("t_mm", "Thickness t", Some("mm"), non_negative, "10"),
            ],
            intermediates: vec![],
            expression: "b_mm * t_mm",
            result_label: "A",
            result_unit: Some("mm²"),
            result_digits: None,
        },
        Builtin {
            id: "rect-inertia",
            title: "Rectangle moment of inertia (Ix)",
            description: None,
            display: r"I_x = \dfrac{b\,t^3}{12}",
            params: vec![
                param("b_mm", "Width b", Some("mm"), non_negative, "200"),
                param("t_mm", "Height/thickness t", Some("mm"), non_negative, "10"),
            ],
            intermediates: vec![],
            expression: "b_mm * t_mm ** 3 / 12",
            result_label: "Ix",
            result_unit: Some("mm⁴"),
            result_digits: None,
        },
        Builtin {
            id: "rect-section-modulus",
            title: "Rectangle section modulus (Wx)",
            description: None,
            display: r"W_x = \dfrac{b\,t^2}{6}",
            params: vec![
                param("b_mm", "Width b", Some("mm"), non_negative, "200"),
                param("t_mm", "Height t", Some("mm"), non_negative, "10"),
            ],
            intermediates: vec![],
            expression: "b_mm * t_mm ** 2 / 6",
            result_label: "Wx",
            result_unit: Some("mm³"),
            result_digits: None,
        },
        Builtin {
            id: "unit-kN-to-N",
            title: "Conversion: kN to N",
            description: None,
            display: r"N = 1000 \cdot N_{kN}",
            params: vec![param("N_kN", "Force", Some("kN"), None, "12")],
            intermediates: vec![],
            expression: "N_kN * 1000",
            result_label: "N",
            result_unit: Some("N"),
            result_digits: None,
        },
        Builtin {
            id: "unit-N-to-kN",
            title: "Conversion: N to kN",
            description: None,
            display: r"N_{kN} = \dfrac{N}{1000}",
            params: vec![param("N", "Force", Some("N"), None, "12000")],
            intermediates: vec![],
            expression: "N / 1000",
            result_label: "N_kN",
            result_unit: Some("kN"),
            result_digits: None,
        },
        Builtin {
            id: "unit-kNm-to-Nmm",
            title: "Conversion: kN·m to N·mm",
            description: None,
            display: r"M_{N\cdot mm} = 10^6 \cdot M_{kN\cdot m}",
            params: vec![param("M_kNm", "Moment", Some("kN·m"), None, "3.5")],
            intermediates: vec![],
            expression: "M_kNm * 1e6",
            result_label: "M",
            result_unit: Some("N·mm"),
            result_digits: None,
        },
        Builtin {
            id: "unit-mm2-to-m2",
            title: "Conversion: mm² to m²",
            description: None,
            display: r"A_{m^2} = \dfrac{A_{mm^2}}{10^6}",
            params: vec![param("A_mm2", "Area", Some("mm²"), None, "1500")],
            intermediates: vec![],
            expression: "A_mm2 / 1e6",
            result_label: "A",
            result_unit: Some("m²"),
            result_digits: Some(12),
        },
    ]
    .into_iter()
    .map(FormulaDefinition::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{CompiledFormula, Limits};
    use crate::validation::check_declarations;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_are_unique() {
        let defs = builtin_definitions();
        let ids: HashSet<_> = defs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), defs.len());
        assert_eq!(defs.len(), 11);
    }

    #[test]
    fn test_every_builtin_passes_authoring_rules_and_compiles() {
        for def in builtin_definitions() {
            let errors = check_declarations(&def.params, &def.intermediates);
            assert!(errors.is_empty(), "{}: {:?}", def.id, errors);
            CompiledFormula::compile(def.clone(), &Limits::default())
                .unwrap_or_else(|e| panic!("{} does not compile: {}", def.id, e));
        }
    }

    #[test]
    fn test_builtin_values() {
        let limits = Limits::default();
        let eval = |id: &str, params: Vec<f64>| {
            let def = builtin_definitions().into_iter().find(|d| d.id == id).unwrap();
            CompiledFormula::compile(def, &limits).unwrap().evaluate(params).unwrap().value
        };
        assert_eq!(eval("rect-area", vec![200.0, 10.0]), 2000.0);
        assert!((eval("rect-inertia", vec![200.0, 10.0]) - 16_666.666_666).abs() < 1e-3);
        assert_eq!(eval("steel-bending-stress", vec![35.0, 2.5e6]), 14.0);
        assert_eq!(eval("unit-kNm-to-Nmm", vec![3.5]), 3_500_000.0);
        assert_eq!(eval("unit-mm2-to-m2", vec![1500.0]), 0.0015);
    }
}
