//! Rules for parameter declarations, checked when a formula is authored.
use crate::compute::is_reserved_name;
use crate::store::types::{Intermediate, Parameter};
use crate::validation::error::{ValidationError, ValidationErrorType};
use std::collections::HashSet;

/// ASCII letters, digits and underscore, not starting with a digit.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Checks every parameter and intermediate declaration, collecting all errors.
pub(crate) fn check_declarations(
    params: &[Parameter],
    intermediates: &[Intermediate],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    let declared = params
        .iter()
        .map(|p| (p.name.as_str(), p.label.as_str()))
        .chain(intermediates.iter().map(|i| (i.name.as_str(), i.label.as_str())));

    for (name, label) in declared {
        if let Some(err) = check_name(name) {
            errors.push(err.for_field(name));
        } else if !names.insert(name) {
            errors.push(
                ValidationError::new(
                    ValidationErrorType::DuplicateName,
                    format!("Name '{}' is declared more than once.", name),
                )
                .for_field(name),
            );
        }
        if label.trim().is_empty() {
            errors.push(
                ValidationError::new(
                    ValidationErrorType::MissingField,
                    format!("Name '{}' needs a non-empty label.", name),
                )
                .for_field(name),
            );
        }
    }

    for param in params {
        if let (Some(min), Some(max)) = (param.min, param.max) {
            if min > max {
                errors.push(
                    ValidationError::new(
                        ValidationErrorType::InvertedBounds,
                        format!("Field '{}' has min {} greater than max {}.", param.label, min, max),
                    )
                    .for_field(&param.name),
                );
            }
        }
    }

    errors
}

fn check_name(name: &str) -> Option<ValidationError> {
    if !is_identifier(name) {
        return Some(ValidationError::new(
            ValidationErrorType::InvalidName,
            format!("Name '{}' must use only Latin letters, digits and '_' and not start with a digit.", name),
        ));
    }
    if is_reserved_name(name) {
        return Some(ValidationError::new(
            ValidationErrorType::ReservedName,
            format!("Name '{}' is reserved by the math namespace.", name),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("N_kN", true)]
    #[case("_tmp", true)]
    #[case("b2", true)]
    #[case("2b", false)]
    #[case("", false)]
    #[case("a-b", false)]
    #[case("σ", false)]
    #[case("a b", false)]
    fn test_is_identifier(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_identifier(name), expected);
    }

    #[test]
    fn test_collects_every_declaration_problem() {
        let params = vec![
            Parameter::new("b", "Width", Some("mm")),
            Parameter::new("b", "Width again", None),
            Parameter::new("sqrt", "Root", None),
            Parameter::new("1x", "Bad", None),
            Parameter::new("h", " ", None).with_min(5.0).with_max(1.0),
        ];
        let errors = check_declarations(&params, &[]);
        let kinds: Vec<ValidationErrorType> = errors.iter().map(|e| e.error_type).collect();
        assert_eq!(
            kinds,
            vec![
                ValidationErrorType::DuplicateName,
                ValidationErrorType::ReservedName,
                ValidationErrorType::InvalidName,
                ValidationErrorType::MissingField,
                ValidationErrorType::InvertedBounds,
            ]
        );
    }

    #[test]
    fn test_intermediate_may_not_shadow_parameter() {
        let params = vec![Parameter::new("N", "Force", Some("kN"))];
        let intermediates = vec![Intermediate {
            name: "N".into(),
            label: "Force in N".into(),
            unit: Some("N".into()),
            expression: "N * 1000".into(),
        }];
        let errors = check_declarations(&params, &intermediates);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ValidationErrorType::DuplicateName);
    }
}
