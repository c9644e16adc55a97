//! Scoped Custom Formula Cache
//!
//! Read-through cache in front of a [`CustomFormulaSource`]. A whole scope is
//! loaded and compiled at once, then served until its TTL expires or it is
//! invalidated. The source stays authoritative.

use super::custom::{CustomFormulaSource, StoreError};
use crate::compute::{CompiledFormula, FormulaCompileError, Limits};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A compiled custom formula, or the reason its stored expression is unusable.
pub type CompiledEntry = Result<Arc<CompiledFormula>, FormulaCompileError>;

struct ScopeEntry {
    loaded_at: Instant,
    formulas: HashMap<String, CompiledEntry>,
}

pub struct ScopedFormulaCache {
    source: Arc<dyn CustomFormulaSource>,
    scopes: Arc<RwLock<HashMap<String, ScopeEntry>>>,
    ttl: Duration,
    limits: Limits,
}

impl ScopedFormulaCache {
    pub fn new(source: Arc<dyn CustomFormulaSource>, ttl: Duration, limits: Limits) -> Self {
        Self { source, scopes: Arc::new(RwLock::new(HashMap::new())), ttl, limits }
    }

    /// Looks up one formula of a scope, loading the scope on a miss.
    pub async fn get(&self, scope: &str, id: &str) -> Result<Option<CompiledEntry>, StoreError> {
        {
            let scopes = self.scopes.read().await;
            if let Some(entry) = scopes.get(scope) {
                if entry.loaded_at.elapsed() < self.ttl {
                    tracing::debug!(scope = %scope, "custom formula cache hit");
                    return Ok(entry.formulas.get(id).cloned());
                }
            }
        }

        let entry = self.load(scope).await?;
        let found = entry.formulas.get(id).cloned();
        self.scopes.write().await.insert(scope.to_string(), entry);
        Ok(found)
    }

    async fn load(&self, scope: &str) -> Result<ScopeEntry, StoreError> {
        let records = self.source.list_active(scope).await?;
        let mut formulas = HashMap::with_capacity(records.len());

        for record in records {
            let compiled = CompiledFormula::compile(record.to_definition(), &self.limits).map(Arc::new);
            if let Err(e) = &compiled {
                tracing::warn!(scope = %scope, id = %record.id, error = %e, "stored custom formula does not compile");
            }
            formulas.insert(record.id, compiled);
        }

        tracing::debug!(scope = %scope, count = formulas.len(), "custom formulas loaded");
        Ok(ScopeEntry { loaded_at: Instant::now(), formulas })
    }

    pub async fn invalidate(&self, scope: &str) {
        self.scopes.write().await.remove(scope);
    }

    pub async fn clear(&self) {
        self.scopes.write().await.clear();
    }
}
