//! Cache of rendered CRUD statements.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tablemap_core::{Result, TableMap};
use tablemap_query::Statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum StatementKind {
    Insert,
    Update,
    Delete,
    Get,
    Exists,
}

/// Statements keyed by table and kind. Tables are frozen before their statements are
/// built, so a cached statement never goes stale.
#[derive(Debug, Default)]
pub(crate) struct PlanCache {
    plans: RwLock<HashMap<(String, StatementKind), Arc<Statement>>>,
}

impl PlanCache {
    pub(crate) fn get_or_build(
        &self,
        table: &TableMap,
        kind: StatementKind,
        build: impl FnOnce() -> Result<Statement>,
    ) -> Result<Arc<Statement>> {
        let key = (table.qualified_name(), kind);
        if let Some(plan) = self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(plan));
        }

        let plan = Arc::new(build()?);
        tracing::trace!(table = %key.0, ?kind, sql = %plan.sql, "cached statement");
        Ok(Arc::clone(
            self.plans
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_insert(plan),
        ))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
