//! Authoring pipeline for user-written and generated formulas.
//!
//! A draft is checked in three passes before it can be stored: required
//! fields, declaration rules, then a full compile. Nothing a draft contains
//! is ever executed before the compile succeeds.
use super::types::{FormulaDefinition, Intermediate, Parameter};
use crate::compute::{CompiledFormula, ComputationError, FormulaCompileError, Limits};
use crate::display::trace::MAX_DISPLAY_DIGITS;
use crate::validation::{check_declarations, RawValue, ValidationError, Validator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Label used when a draft does not name its result.
pub const DEFAULT_RESULT_LABEL: &str = "Result";

fn join_messages(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthoringError {
    #[error("Field '{0}' is required")]
    MissingField(&'static str),
    #[error("Invalid declarations: {}", join_messages(.0))]
    Schema(Vec<ValidationError>),
    #[error("Formula does not compile: {0}")]
    Compile(#[from] FormulaCompileError),
    #[error("Result precision of {digits} digits exceeds the maximum of {max}")]
    ResultDigits { digits: u32, max: u32 },
    #[error("Generator output contains no JSON object")]
    NoJson,
    #[error("Generator output is not a valid formula: {0}")]
    MalformedJson(String),
    #[error("Generator failed: {0}")]
    Generator(String),
    #[error("Invalid sample values: {}", join_messages(.0))]
    InvalidValues(Vec<ValidationError>),
    #[error("Sample evaluation failed: {0}")]
    Evaluation(#[from] ComputationError),
}

/// An unchecked formula as submitted by an author or a generator.
///
/// Accepts camelCase and snake_case field names, and `latex` for the display
/// expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "latex", alias = "display_expression")]
    pub display_expression: String,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intermediates: Vec<Intermediate>,
    #[serde(default)]
    pub expression: String,
    #[serde(default, alias = "result_label", skip_serializing_if = "Option::is_none")]
    pub result_label: Option<String>,
    #[serde(default, alias = "result_unit", skip_serializing_if = "Option::is_none")]
    pub result_unit: Option<String>,
    #[serde(default, alias = "result_digits", skip_serializing_if = "Option::is_none")]
    pub result_digits: Option<u32>,
}

fn non_empty(opt: Option<String>) -> Option<String> {
    opt.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Checks a draft and compiles it under the given id.
pub fn prepare_formula(id: &str, draft: FormulaDraft, limits: &Limits) -> Result<CompiledFormula, AuthoringError> {
    // 1. Required fields
    if draft.title.trim().is_empty() {
        return Err(AuthoringError::MissingField("title"));
    }
    if draft.display_expression.trim().is_empty() {
        return Err(AuthoringError::MissingField("displayExpression"));
    }
    if draft.expression.trim().is_empty() {
        return Err(AuthoringError::MissingField("expression"));
    }

    if let Some(digits) = draft.result_digits.filter(|&d| d > MAX_DISPLAY_DIGITS) {
        return Err(AuthoringError::ResultDigits { digits, max: MAX_DISPLAY_DIGITS });
    }

    // 2. Declaration rules
    let errors = check_declarations(&draft.params, &draft.intermediates);
    if !errors.is_empty() {
        return Err(AuthoringError::Schema(errors));
    }

    // 3. Compile
    let definition = FormulaDefinition {
        id: id.to_string(),
        title: draft.title.trim().to_string(),
        description: non_empty(draft.description),
        display_expression: draft.display_expression.trim().to_string(),
        params: draft.params,
        intermediates: draft.intermediates,
        expression: draft.expression.trim().to_string(),
        result_label: non_empty(draft.result_label).unwrap_or_else(|| DEFAULT_RESULT_LABEL.to_string()),
        result_unit: non_empty(draft.result_unit),
        result_digits: draft.result_digits,
    };
    Ok(CompiledFormula::compile(definition, limits)?)
}

/// Extracts a draft from free-form generator output.
///
/// Takes the span from the first `{` to the last `}`, so prose or code fences
/// around the object are ignored.
pub fn parse_generated_formula(text: &str) -> Result<FormulaDraft, AuthoringError> {
    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => return Err(AuthoringError::NoJson),
    };
    let draft: FormulaDraft =
        serde_json::from_str(&text[start..=end]).map_err(|e| AuthoringError::MalformedJson(e.to_string()))?;

    if draft.title.trim().is_empty() {
        return Err(AuthoringError::MissingField("title"));
    }
    if draft.display_expression.trim().is_empty() {
        return Err(AuthoringError::MissingField("latex"));
    }
    if draft.expression.trim().is_empty() {
        return Err(AuthoringError::MissingField("expression"));
    }
    Ok(draft)
}

/// A text generator producing formula drafts from a natural-language prompt.
#[async_trait]
pub trait FormulaGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AuthoringError>;
}

/// Asks the generator for a draft and checks it the same way an authored
/// formula is checked.
pub async fn generate_formula(
    generator: &dyn FormulaGenerator,
    prompt: &str,
    limits: &Limits,
) -> Result<FormulaDraft, AuthoringError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AuthoringError::MissingField("prompt"));
    }

    let text = generator.generate(prompt).await?;
    let draft = parse_generated_formula(&text).map_err(|e| {
        tracing::warn!(error = %e, "generator returned an unusable formula");
        e
    })?;
    prepare_formula("generated", draft.clone(), limits)?;
    tracing::info!(title = %draft.title, "generated formula accepted");
    Ok(draft)
}

/// Evaluates a draft against sample values without storing it.
pub fn dry_run(draft: &FormulaDraft, values: &HashMap<String, RawValue>, limits: &Limits) -> Result<f64, AuthoringError> {
    let formula = prepare_formula("dry-run", draft.clone(), limits)?;
    let bound = Validator::new(&formula.definition().params)
        .validate(values)
        .map_err(AuthoringError::InvalidValues)?;
    Ok(formula.evaluate(bound)?.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CompileError;
    use crate::validation::ValidationErrorType;

    const GENERATED: &str = r#"Here is the formula:
```json
{
  "title": "Axial compression stress",
  "latex": "\\sigma = \\dfrac{N}{A}",
  "params": [
    {"name": "N", "label": "Axial force", "unit": "kN", "min": 0},
    {"name": "A", "label": "Section area", "unit": "mm²", "min": 1}
  ],
  "expression": "(values.N * 1000) / values.A",
  "result_label": "σ",
  "result_unit": "MPa"
}
```"#;

    struct Canned(&'static str);

    #[async_trait]
    impl FormulaGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String, AuthoringError> {
            Ok(self.0.to_string())
        }
    }

    fn draft() -> FormulaDraft {
        parse_generated_formula(GENERATED).unwrap()
    }

    #[test]
    fn test_parse_generated_formula_accepts_snake_case_and_latex() {
        let d = draft();
        assert_eq!(d.display_expression, r"\sigma = \dfrac{N}{A}");
        assert_eq!(d.result_label.as_deref(), Some("σ"));
        assert_eq!(d.result_unit.as_deref(), Some("MPa"));
        assert_eq!(d.params.len(), 2);
    }

    #[test]
    fn test_parse_generated_formula_errors() {
        assert_eq!(parse_generated_formula("no object here"), Err(AuthoringError::NoJson));
        assert!(matches!(parse_generated_formula("{ not json }"), Err(AuthoringError::MalformedJson(_))));
        assert_eq!(
            parse_generated_formula(r#"{"title": "x", "latex": "x"}"#),
            Err(AuthoringError::MissingField("expression"))
        );
    }

    #[test]
    fn test_prepare_defaults_result_label() {
        let mut d = draft();
        d.result_label = Some("  ".into());
        let formula = prepare_formula("f1", d, &Limits::default()).unwrap();
        assert_eq!(formula.definition().result_label, DEFAULT_RESULT_LABEL);
        assert_eq!(formula.id(), "f1");
    }

    #[test]
    fn test_prepare_keeps_result_precision_within_bounds() {
        let mut d = draft();
        d.result_digits = Some(12);
        let formula = prepare_formula("f1", d.clone(), &Limits::default()).unwrap();
        assert_eq!(formula.definition().result_digits, Some(12));

        d.result_digits = Some(40);
        assert_eq!(
            prepare_formula("f1", d, &Limits::default()).unwrap_err(),
            AuthoringError::ResultDigits { digits: 40, max: MAX_DISPLAY_DIGITS }
        );
    }

    #[test]
    fn test_prepare_rejects_bad_declarations_before_compiling() {
        let mut d = draft();
        d.params[1].name = "sqrt".into();
        d.expression = "require('fs')".into();
        match prepare_formula("f1", d, &Limits::default()) {
            Err(AuthoringError::Schema(errors)) => {
                assert_eq!(errors[0].error_type, ValidationErrorType::ReservedName);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_prepare_rejects_non_arithmetic_expressions() {
        let mut d = draft();
        d.expression = "require('fs')".into();
        assert!(matches!(
            prepare_formula("f1", d, &Limits::default()),
            Err(AuthoringError::Compile(FormulaCompileError::Expression(CompileError::StringLiteral { .. })))
        ));
    }

    #[test]
    fn test_dry_run() {
        let values: HashMap<String, RawValue> =
            [("N".to_string(), RawValue::Number(250.0)), ("A".to_string(), RawValue::Text("1500".into()))]
                .into_iter()
                .collect();
        let value = dry_run(&draft(), &values, &Limits::default()).unwrap();
        assert!((value - 166.666_666_67).abs() < 1e-6);

        let empty = HashMap::new();
        assert!(matches!(dry_run(&draft(), &empty, &Limits::default()), Err(AuthoringError::InvalidValues(e)) if e.len() == 2));
    }

    #[tokio::test]
    async fn test_generate_formula() {
        let limits = Limits::default();
        let d = generate_formula(&Canned(GENERATED), "axial stress", &limits).await.unwrap();
        assert_eq!(d.title, "Axial compression stress");

        let err = generate_formula(&Canned("sorry, I cannot"), "axial stress", &limits).await.unwrap_err();
        assert_eq!(err, AuthoringError::NoJson);

        let err = generate_formula(&Canned(GENERATED), "   ", &limits).await.unwrap_err();
        assert_eq!(err, AuthoringError::MissingField("prompt"));
    }
}
