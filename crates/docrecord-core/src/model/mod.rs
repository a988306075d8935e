pub mod registry;
pub mod relation;

pub use registry::{DanglingRelation, Registry};
pub use relation::{BelongsTo, HasMany, HasOne};

use crate::{
    db::{
        callback::{CallbackFn, CallbackOutcome, CallbackSet, LifecycleStage},
        record::Record,
        selector::Filter,
    },
    names,
    schema::{FieldDef, Schema},
    value::Value,
};
use relation::{BelongsToDef, HasManyDef, HasOneDef};
use std::collections::BTreeMap;

///
/// ModelDef
///
/// Immutable descriptor of one registered model: normalized schema, resolved
/// relations, named scopes, and lifecycle handlers. Built once through the
/// builder and shared behind an `Arc` by the registry.
///

#[derive(Clone)]
pub struct ModelDef {
    name: String,
    collection: String,
    schema: Schema,
    default_scope: Option<Filter>,
    belongs_to: Vec<BelongsToDef>,
    has_many: Vec<HasManyDef>,
    has_one: Vec<HasOneDef>,
    scopes: BTreeMap<String, Filter>,
    callbacks: CallbackSet,
}

impl ModelDef {
    /// Start declaring a model with the given name.
    #[must_use]
    pub fn define(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            collection: None,
            fields: Vec::new(),
            default_scope: None,
            belongs_to: Vec::new(),
            has_many: Vec::new(),
            has_one: Vec::new(),
            scopes: BTreeMap::new(),
            callbacks: CallbackSet::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub const fn default_scope(&self) -> Option<&Filter> {
        self.default_scope.as_ref()
    }

    #[must_use]
    pub fn named_scope(&self, name: &str) -> Option<&Filter> {
        self.scopes.get(name)
    }

    pub(crate) fn belongs_to_def(&self, name: &str) -> Option<&BelongsToDef> {
        self.belongs_to.iter().find(|def| def.name == name)
    }

    pub(crate) fn has_many_def(&self, name: &str) -> Option<&HasManyDef> {
        self.has_many.iter().find(|def| def.name == name)
    }

    pub(crate) fn has_one_def(&self, name: &str) -> Option<&HasOneDef> {
        self.has_one.iter().find(|def| def.name == name)
    }

    pub(crate) fn has_many_defs(&self) -> &[HasManyDef] {
        &self.has_many
    }

    pub(crate) fn has_one_defs(&self) -> &[HasOneDef] {
        &self.has_one
    }

    pub(crate) fn stage_handlers(&self, stage: LifecycleStage) -> Vec<CallbackFn> {
        self.callbacks.stage_handlers(stage)
    }

    /// Names of every relation target, paired with the relation name.
    pub(crate) fn relation_targets(&self) -> Vec<(&str, &str)> {
        let belongs = self
            .belongs_to
            .iter()
            .map(|def| (def.name.as_str(), def.target.as_str()));
        let many = self
            .has_many
            .iter()
            .map(|def| (def.name.as_str(), def.target.as_str()));
        let one = self
            .has_one
            .iter()
            .map(|def| (def.name.as_str(), def.target.as_str()));

        belongs.chain(many).chain(one).collect()
    }
}

///
/// ModelBuilder
///
/// Declaration-order builder for a `ModelDef`. Foreign-key fields of
/// belongs-to relations are appended to the schema at build time, so they
/// validate and default like declared fields.
///

pub struct ModelBuilder {
    name: String,
    collection: Option<String>,
    fields: Vec<(String, FieldDef)>,
    default_scope: Option<Filter>,
    belongs_to: Vec<(String, BelongsTo)>,
    has_many: Vec<(String, HasMany)>,
    has_one: Vec<(String, HasOne)>,
    scopes: BTreeMap<String, Filter>,
    callbacks: CallbackSet,
}

impl ModelBuilder {
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.push((name.into(), def));
        self
    }

    /// Selector conjoined into every scope derived from this model.
    #[must_use]
    pub fn default_scope(mut self, filter: Filter) -> Self {
        self.default_scope = Some(filter);
        self
    }

    #[must_use]
    pub fn belongs_to(mut self, name: impl Into<String>, decl: BelongsTo) -> Self {
        self.belongs_to.push((name.into(), decl));
        self
    }

    #[must_use]
    pub fn has_many(mut self, name: impl Into<String>, decl: HasMany) -> Self {
        self.has_many.push((name.into(), decl));
        self
    }

    #[must_use]
    pub fn has_one(mut self, name: impl Into<String>, decl: HasOne) -> Self {
        self.has_one.push((name.into(), decl));
        self
    }

    #[must_use]
    pub fn scope(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.scopes.insert(name.into(), filter);
        self
    }

    #[must_use]
    pub fn callback(
        mut self,
        stage: LifecycleStage,
        handler: impl Fn(&mut Record) -> CallbackOutcome + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.register(stage, handler);
        self
    }

    pub(crate) fn build(self) -> ModelDef {
        let belongs_to: Vec<BelongsToDef> = self
            .belongs_to
            .into_iter()
            .map(|(name, decl)| decl.resolve(&name))
            .collect();

        // Inject one identifier field per belongs-to, plus the model-name
        // field of polymorphic relations, before normalizing.
        let mut fields = self.fields;
        for def in &belongs_to {
            if !fields.iter().any(|(name, _)| *name == def.foreign_key) {
                fields.push((
                    def.foreign_key.clone(),
                    FieldDef::id()
                        .required_if(def.required)
                        .default_value(Value::Null),
                ));
            }
            if let Some(model_field) = &def.model_field
                && !fields.iter().any(|(name, _)| name == model_field)
            {
                fields.push((model_field.clone(), FieldDef::text()));
            }
        }

        let has_many = self
            .has_many
            .into_iter()
            .map(|(name, decl)| decl.resolve(&name, &self.name))
            .collect();
        let has_one = self
            .has_one
            .into_iter()
            .map(|(name, decl)| decl.resolve(&name, &self.name))
            .collect();

        ModelDef {
            collection: self
                .collection
                .unwrap_or_else(|| names::collection_name(&self.name)),
            name: self.name,
            schema: Schema::normalize(&fields),
            default_scope: self.default_scope,
            belongs_to,
            has_many,
            has_one,
            scopes: self.scopes,
            callbacks: self.callbacks,
        }
    }
}

///
/// TESTS
///
