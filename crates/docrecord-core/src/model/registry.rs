use crate::{Error, model::{ModelBuilder, ModelDef}};
use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

///
/// Registry
///
/// Explicit map of registered model descriptors, keyed by model name. All
/// relation lookups go through here, so the set of reachable models is
/// inspectable: `dangling_relations` lists every relation whose target has
/// not been registered, for a startup check.
///

#[derive(Default)]
pub struct Registry {
    models: RwLock<BTreeMap<String, Arc<ModelDef>>>,
}

///
/// DanglingRelation
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DanglingRelation {
    pub model: String,
    pub relation: String,
    pub target: String,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model. Names are unique; a second registration under the
    /// same name is rejected rather than silently replaced.
    pub fn register(&self, builder: ModelBuilder) -> Result<Arc<ModelDef>, Error> {
        let model = Arc::new(builder.build());
        let mut models = self
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if models.contains_key(model.name()) {
            return Err(Error::DuplicateModel(model.name().to_string()));
        }
        models.insert(model.name().to_string(), Arc::clone(&model));

        Ok(model)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ModelDef>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn expect(&self, name: &str) -> Result<Arc<ModelDef>, Error> {
        self.get(name)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Relations pointing at models that were never registered. Intended as
    /// a startup assertion; resolution itself stays lazy.
    #[must_use]
    pub fn dangling_relations(&self) -> Vec<DanglingRelation> {
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);

        let mut dangling = Vec::new();
        for model in models.values() {
            for (relation, target) in model.relation_targets() {
                if !models.contains_key(target) {
                    dangling.push(DanglingRelation {
                        model: model.name().to_string(),
                        relation: relation.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        dangling
    }
}
