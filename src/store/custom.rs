//! The seam to wherever custom formulas are persisted, and an in-memory
//! implementation of it.
use super::authoring::{prepare_formula, AuthoringError, FormulaDraft};
use super::types::CustomFormulaRecord;
use crate::compute::Limits;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Formula '{id}' not found")]
    NotFound { id: String },
    #[error("Formula '{id}' already exists")]
    Duplicate { id: String },
    #[error("Invalid formula: {0}")]
    Invalid(#[from] AuthoringError),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to persisted custom formulas.
#[async_trait]
pub trait CustomFormulaSource: Send + Sync {
    /// Active formulas of one scope.
    async fn list_active(&self, scope: &str) -> Result<Vec<CustomFormulaRecord>, StoreError>;
}

/// Reference store: create with a generated id, update, soft delete, list.
///
/// Every write goes through the same authoring checks, so a stored record
/// always compiles under the limits the store was built with.
#[derive(Default)]
pub struct InMemoryFormulaStore {
    records: RwLock<HashMap<String, CustomFormulaRecord>>,
    limits: Limits,
}

impl InMemoryFormulaStore {
    pub fn new(limits: Limits) -> Self {
        Self { records: RwLock::new(HashMap::new()), limits }
    }

    pub async fn create(&self, scope: &str, draft: FormulaDraft) -> Result<CustomFormulaRecord, StoreError> {
        let id = Uuid::new_v4().to_string();
        let compiled = prepare_formula(&id, draft, &self.limits)?;
        let record = CustomFormulaRecord::from_definition(scope, compiled.definition().clone());

        self.records.write().await.insert(id.clone(), record.clone());
        tracing::info!(id = %id, scope = %scope, "custom formula created");
        Ok(record)
    }

    /// Inserts a record under its own id. Used to seed the store.
    ///
    /// The record goes through the same checks as [`Self::create`] and is
    /// stored in normalized form; its scope and active flag are kept.
    pub async fn insert(&self, record: CustomFormulaRecord) -> Result<(), StoreError> {
        let compiled = prepare_formula(&record.id, draft_of(&record), &self.limits)?;
        let mut normalized = CustomFormulaRecord::from_definition(&record.scope, compiled.definition().clone());
        normalized.is_active = record.is_active;

        let mut records = self.records.write().await;
        if records.contains_key(&normalized.id) {
            return Err(StoreError::Duplicate { id: normalized.id });
        }
        records.insert(normalized.id.clone(), normalized);
        Ok(())
    }

    pub async fn update(&self, id: &str, draft: FormulaDraft) -> Result<CustomFormulaRecord, StoreError> {
        let compiled = prepare_formula(id, draft, &self.limits)?;

        let mut records = self.records.write().await;
        let existing = records.get_mut(id).ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        let mut updated = CustomFormulaRecord::from_definition(&existing.scope, compiled.definition().clone());
        updated.is_active = existing.is_active;
        *existing = updated.clone();
        tracing::info!(id = %id, "custom formula updated");
        Ok(updated)
    }

    /// Soft delete: the record stays but is no longer listed.
    pub async fn deactivate(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id).ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        record.is_active = false;
        tracing::info!(id = %id, "custom formula deactivated");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<CustomFormulaRecord> {
        self.records.read().await.get(id).cloned()
    }
}

fn draft_of(record: &CustomFormulaRecord) -> FormulaDraft {
    FormulaDraft {
        title: record.title.clone(),
        description: record.description.clone(),
        display_expression: record.display_expression.clone(),
        params: record.params.clone(),
        intermediates: record.intermediates.clone(),
        expression: record.expression.clone(),
        result_label: Some(record.result_label.clone()),
        result_unit: record.result_unit.clone(),
        result_digits: record.result_digits,
    }
}

#[async_trait]
impl CustomFormulaSource for InMemoryFormulaStore {
    async fn list_active(&self, scope: &str) -> Result<Vec<CustomFormulaRecord>, StoreError> {
        let records = self.records.read().await;
        let mut active: Vec<CustomFormulaRecord> =
            records.values().filter(|r| r.is_active && r.scope == scope).cloned().collect();
        active.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::Parameter;
    use crate::store::DEFAULT_RESULT_LABEL;

    fn area_draft() -> FormulaDraft {
        FormulaDraft {
            title: "Area".into(),
            display_expression: r"A = b \cdot h".into(),
            params: vec![
                Parameter::new("b", "Width", Some("mm")).with_min(1.0),
                Parameter::new("h", "Height", Some("mm")).with_min(1.0),
            ],
            expression: "values.b * values.h".into(),
            result_label: Some("A".into()),
            result_unit: Some("mm²".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_list_deactivate() {
        let store = InMemoryFormulaStore::new(Limits::default());
        let created = store.create("SP16", area_draft()).await.unwrap();
        assert!(Uuid::parse_str(&created.id).is_ok());
        assert!(created.is_active);

        assert_eq!(store.list_active("SP16").await.unwrap().len(), 1);
        assert!(store.list_active("SP20").await.unwrap().is_empty());

        store.deactivate(&created.id).await.unwrap();
        assert!(store.list_active("SP16").await.unwrap().is_empty());
        assert!(!store.get(&created.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_update_keeps_scope_and_state() {
        let store = InMemoryFormulaStore::new(Limits::default());
        let created = store.create("SP16", area_draft()).await.unwrap();

        let mut draft = area_draft();
        draft.expression = "b * h / 2".into();
        let updated = store.update(&created.id, draft).await.unwrap();
        assert_eq!(updated.scope, "SP16");
        assert_eq!(updated.expression, "b * h / 2");

        assert_eq!(
            store.update("missing", area_draft()).await.unwrap_err(),
            StoreError::NotFound { id: "missing".into() }
        );
    }

    #[tokio::test]
    async fn test_writes_are_checked() {
        let store = InMemoryFormulaStore::new(Limits::default());
        let mut draft = area_draft();
        draft.expression = "process.exit(1)".into();
        assert!(matches!(store.create("SP16", draft).await, Err(StoreError::Invalid(AuthoringError::Compile(_)))));
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_ids() {
        let store = InMemoryFormulaStore::new(Limits::default());
        let created = store.create("SP16", area_draft()).await.unwrap();
        assert_eq!(store.insert(created.clone()).await, Err(StoreError::Duplicate { id: created.id }));
    }

    #[tokio::test]
    async fn test_insert_stores_normalized_record() {
        let store = InMemoryFormulaStore::new(Limits::default());
        let mut record = CustomFormulaRecord::from_definition(
            "SP16",
            prepare_formula("seeded", area_draft(), &Limits::default()).unwrap().definition().clone(),
        );
        record.title = "  Area  ".into();
        record.result_label = String::new();
        record.is_active = false;
        store.insert(record).await.unwrap();

        let stored = store.get("seeded").await.unwrap();
        assert_eq!(stored.title, "Area");
        assert_eq!(stored.result_label, DEFAULT_RESULT_LABEL);
        assert_eq!(stored.scope, "SP16");
        assert!(!stored.is_active);
    }
}
