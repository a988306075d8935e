pub mod callback;
pub mod record;
pub mod scope;
pub mod selector;

mod persist;

#[cfg(test)]
mod tests;

pub use persist::SaveOptions;

use crate::{
    Error,
    db::scope::Scope,
    model::{ModelDef, Registry},
    store::{Collection, DocumentStore},
};
use std::sync::Arc;

pub(crate) const ID_FIELD: &str = "id";
pub(crate) const CREATED_AT: &str = "createdAt";
pub(crate) const UPDATED_AT: &str = "updatedAt";

///
/// Db
///
/// Handle combining a document store with the model registry. Cheap to
/// clone; everything behind it is shared.
///

#[derive(Clone)]
pub struct Db {
    store: Arc<dyn DocumentStore>,
    registry: Arc<Registry>,
}

impl Db {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, registry: Arc<Registry>) -> Self {
        Self { store, registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Root scope of a registered model, carrying its default selector.
    pub fn model(&self, name: &str) -> Result<Scope, Error> {
        let model = self.registry.expect(name)?;

        Ok(Scope::root(self.clone(), model))
    }

    pub(crate) fn collection_for(&self, model: &ModelDef) -> Arc<dyn Collection> {
        self.store.collection(model.collection())
    }
}
