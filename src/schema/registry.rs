//! Process-wide cache of entity schemas.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::schema::{EntitySchema, GraphEntity};

static GLOBAL: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::default);

/// Write-once, read-many map from entity type to its [`EntitySchema`].
///
/// Schemas are pure functions of the type, so two threads racing on a first
/// access build equal values and the first insert wins. The lock is never
/// held while a schema is being built.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<TypeId, Arc<EntitySchema>>>,
}

impl SchemaRegistry {
    /// The registry shared by every repository in the process.
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL
    }

    /// Returns the cached schema for `T`, building it on first request.
    pub fn schema_of<T: GraphEntity>(&self) -> Arc<EntitySchema> {
        let key = TypeId::of::<T>();
        if let Some(schema) = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(schema);
        }

        let built = Arc::new(EntitySchema::new(T::LABEL, T::fields()));
        tracing::trace!(label = T::LABEL, "Built entity schema");

        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(schemas.entry(key).or_insert(built))
    }

    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
