use super::builtin::builtin_definitions;
use super::cache::{CompiledEntry, ScopedFormulaCache};
use super::custom::CustomFormulaSource;
use super::types::FormulaDefinition;
use crate::compute::{CompiledFormula, FormulaCompileError, Limits};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Resolves formula ids: built-ins first, then the custom formulas of a scope.
///
/// Built-ins are compiled once at construction and never change afterwards.
pub struct FormulaRegistry {
    builtins: HashMap<String, Arc<CompiledFormula>>,
    order: Vec<String>,
    custom: Option<ScopedFormulaCache>,
    limits: Limits,
}

impl FormulaRegistry {
    /// An empty registry. Mostly useful for tests.
    pub fn new(limits: Limits) -> Self {
        Self { builtins: HashMap::new(), order: Vec::new(), custom: None, limits }
    }

    pub fn with_builtins(limits: Limits) -> Result<Self, FormulaCompileError> {
        let mut registry = Self::new(limits);
        for def in builtin_definitions() {
            registry.register(def)?;
        }
        tracing::debug!(count = registry.order.len(), "built-in formulas compiled");
        Ok(registry)
    }

    /// Attaches a custom-formula source behind a scoped cache.
    pub fn with_custom_source(mut self, source: Arc<dyn CustomFormulaSource>, ttl: Duration) -> Self {
        self.custom = Some(ScopedFormulaCache::new(source, ttl, self.limits.clone()));
        self
    }

    fn register(&mut self, definition: FormulaDefinition) -> Result<(), FormulaCompileError> {
        let compiled = CompiledFormula::compile(definition, &self.limits)?;
        let id = compiled.id().to_string();
        if self.builtins.insert(id.clone(), Arc::new(compiled)).is_none() {
            self.order.push(id);
        }
        Ok(())
    }

    pub fn builtin(&self, id: &str) -> Option<Arc<CompiledFormula>> {
        self.builtins.get(id).cloned()
    }

    /// Built-in definitions in registration order.
    pub fn builtins(&self) -> impl Iterator<Item = &FormulaDefinition> + '_ {
        self.order.iter().filter_map(|id| self.builtins.get(id)).map(|f| f.definition())
    }

    pub fn custom_cache(&self) -> Option<&ScopedFormulaCache> {
        self.custom.as_ref()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// # Returns
    /// - `None` when neither a built-in nor an active custom formula has this id.
    /// - `Some(Err(_))` when the custom formula exists but its expression is unusable.
    ///
    /// A failing custom source is logged and treated as "not found".
    pub async fn resolve(&self, id: &str, scope: Option<&str>) -> Option<CompiledEntry> {
        if let Some(found) = self.builtins.get(id) {
            return Some(Ok(found.clone()));
        }

        let (Some(scope), Some(cache)) = (scope, &self.custom) else {
            return None;
        };
        match cache.get(scope, id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(id = %id, scope = %scope, error = %e, "custom formula lookup failed");
                None
            }
        }
    }
}
