//! The validator that checks a full set of inputs against a parameter schema.
use super::error::ValidationError;
use super::rules::numeric::{validate_raw_value, Bounds, RawValue};
use crate::store::types::Parameter;
use std::collections::HashMap;

/// Validates client-supplied values against a formula's declared parameters.
///
/// Every parameter is checked, so a caller gets all problems in one round
/// trip instead of stopping at the first bad field.
pub struct Validator<'a> {
    params: &'a [Parameter],
}

impl<'a> Validator<'a> {
    pub fn new(params: &'a [Parameter]) -> Self {
        Self { params }
    }

    /// # Returns
    /// - `Ok(values)` in declaration order when every parameter is valid.
    /// - `Err(errors)` with one entry per offending parameter.
    pub fn validate(&self, values: &HashMap<String, RawValue>) -> Result<Vec<f64>, Vec<ValidationError>> {
        let mut bound = Vec::with_capacity(self.params.len());
        let mut errors = Vec::new();

        for param in self.params {
            let bounds = Bounds { min: param.min, max: param.max };
            match validate_raw_value(&param.label, values.get(&param.name), bounds) {
                Ok(v) => bound.push(v),
                Err(e) => errors.push(e.for_field(&param.name)),
            }
        }

        for key in values.keys() {
            if !self.params.iter().any(|p| &p.name == key) {
                tracing::debug!(field = %key, "ignoring value for undeclared parameter");
            }
        }

        if errors.is_empty() {
            Ok(bound)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorType;
    use proptest::prelude::*;

    fn schema() -> Vec<Parameter> {
        vec![
            Parameter::new("N_kN", "Axial force N", Some("kN")).with_min(0.0),
            Parameter::new("A_mm2", "Area A", Some("mm²")).with_min(1e-9),
            Parameter::new("k", "Factor", None).with_min(0.5).with_max(2.0),
        ]
    }

    fn values(pairs: &[(&str, RawValue)]) -> HashMap<String, RawValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_valid_values_come_back_in_declaration_order() {
        let params = schema();
        let input = values(&[
            ("k", "1,5".into()),
            ("A_mm2", 1500.0.into()),
            ("N_kN", 250.0.into()),
            ("extra", 1.0.into()),
        ]);
        let bound = Validator::new(&params).validate(&input).unwrap();
        assert_eq!(bound, vec![250.0, 1500.0, 1.5]);
    }

    #[test]
    fn test_errors_are_batched_per_parameter() {
        let params = schema();
        let input = values(&[("N_kN", (-1.0).into()), ("k", "abc".into())]);
        let errors = Validator::new(&params).validate(&input).unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "N_kN");
        assert_eq!(errors[0].error_type, ValidationErrorType::BelowMinimum);
        assert_eq!(errors[1].field, "A_mm2");
        assert_eq!(errors[1].error_type, ValidationErrorType::NotANumber);
        assert_eq!(errors[2].field, "k");
        assert!(errors[2].message.contains("Factor"));
    }

    proptest! {
        #[test]
        fn prop_one_error_per_offending_parameter(
            picks in prop::collection::vec((any::<bool>(), 0.0f64..100.0), 1..12)
        ) {
            // Parameter i accepts [0, 50]; a "bad" pick is pushed out of range.
            let params: Vec<Parameter> = (0..picks.len())
                .map(|i| Parameter::new(&format!("p{}", i), &format!("P{}", i), None).with_min(0.0).with_max(50.0))
                .collect();
            let mut input = HashMap::new();
            let mut expected_bad = Vec::new();
            for (i, (bad, v)) in picks.iter().enumerate() {
                let value = if *bad { 51.0 + v } else { v / 2.0 };
                if *bad {
                    expected_bad.push(format!("p{}", i));
                }
                input.insert(format!("p{}", i), RawValue::Number(value));
            }

            match Validator::new(&params).validate(&input) {
                Ok(_) => prop_assert!(expected_bad.is_empty()),
                Err(errors) => {
                    let fields: Vec<String> = errors.into_iter().map(|e| e.field).collect();
                    prop_assert_eq!(fields, expected_bad);
                }
            }
        }
    }
}
