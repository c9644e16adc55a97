use serde::{Deserialize, Serialize};

/// A named numeric input of a formula.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl Parameter {
    pub fn new(name: &str, label: &str, unit: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            unit: unit.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

/// A derived quantity evaluated before the main expression and reported as a step.
///
/// Intermediates are evaluated in declaration order; each one sees the
/// parameters and all earlier intermediates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intermediate {
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaDefinition {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Human-readable form (LaTeX), never executed.
    pub display_expression: String,
    pub params: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intermediates: Vec<Intermediate>,
    pub expression: String,
    pub result_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_unit: Option<String>,
    /// Fractional digits shown for the result; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_digits: Option<u32>,
}

/// A user-authored formula as persisted by the custom-formula store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFormulaRecord {
    pub id: String,
    /// Document code partitioning custom formulas.
    pub scope: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub display_expression: String,
    pub params: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intermediates: Vec<Intermediate>,
    pub expression: String,
    pub result_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_unit: Option<String>,
    /// Fractional digits shown for the result; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_digits: Option<u32>,
    pub is_active: bool,
}

impl CustomFormulaRecord {
    pub fn from_definition(scope: &str, definition: FormulaDefinition) -> Self {
        Self {
            id: definition.id,
            scope: scope.to_string(),
            title: definition.title,
            description: definition.description,
            display_expression: definition.display_expression,
            params: definition.params,
            intermediates: definition.intermediates,
            expression: definition.expression,
            result_label: definition.result_label,
            result_unit: definition.result_unit,
            result_digits: definition.result_digits,
            is_active: true,
        }
    }

    pub fn to_definition(&self) -> FormulaDefinition {
        FormulaDefinition {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            display_expression: self.display_expression.clone(),
            params: self.params.clone(),
            intermediates: self.intermediates.clone(),
            expression: self.expression.clone(),
            result_label: self.result_label.clone(),
            result_unit: self.result_unit.clone(),
            result_digits: self.result_digits,
        }
    }
}
