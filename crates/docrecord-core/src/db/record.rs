use crate::{
    Error,
    db::{
        CREATED_AT, Db, ID_FIELD, UPDATED_AT,
        callback::{CallbackOutcome, LifecycleStage, SkipCallbacks},
        scope::Scope,
        selector::Filter,
    },
    model::ModelDef,
    schema::validator::{IssueKind, ValidationIssue},
    store::RecordId,
    value::{Document, Value},
};
use std::sync::Arc;

///
/// Record
///
/// One document bound to its model descriptor. Attributes pass through the
/// schema: writes to undeclared fields are dropped, validation failures
/// accumulate in `errors`, and a destroyed record refuses further writes.
///

#[derive(Clone)]
pub struct Record {
    db: Db,
    model: Arc<ModelDef>,
    attrs: Document,
    errors: Vec<ValidationIssue>,
    destroyed: bool,
}

impl Record {
    pub(crate) fn new(db: Db, model: Arc<ModelDef>) -> Self {
        Self {
            db,
            model,
            attrs: Document::new(),
            errors: Vec::new(),
            destroyed: false,
        }
    }

    /// Wrap a document read back from the store. The identifier is kept as
    /// stored, bypassing the schema gate.
    pub(crate) fn hydrate(db: Db, model: Arc<ModelDef>, doc: Document) -> Self {
        Self {
            db,
            model,
            attrs: doc,
            errors: Vec::new(),
            destroyed: false,
        }
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub(crate) fn model_def(&self) -> &Arc<ModelDef> {
        &self.model
    }

    pub(crate) const fn db(&self) -> &Db {
        &self.db
    }

    /// Store-assigned identifier, present once saved.
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        match self.attrs.get(ID_FIELD) {
            Some(Value::Text(id)) => Some(RecordId::new(id.clone())),
            _ => None,
        }
    }

    /// Identifier as a selector value; `Null` before the first save, so
    /// relation lookups on unsaved records match nothing persisted.
    pub(crate) fn id_value(&self) -> Value {
        self.id().map_or(Value::Null, |id| id.to_value())
    }

    pub(crate) fn set_id(&mut self, id: &RecordId) {
        self.attrs.insert(ID_FIELD.to_string(), id.to_value());
    }

    pub(crate) fn clear_id(&mut self) {
        self.attrs.remove(ID_FIELD);
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !self.is_new() && !self.destroyed
    }

    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) const fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    pub(crate) fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub(crate) fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attrs.get(field)
    }

    /// Write one attribute. Only schema fields and the timestamp columns are
    /// writable; anything else is silently dropped, the identifier included.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        if self.model.schema().contains(&field) || field == CREATED_AT || field == UPDATED_AT {
            self.attrs.insert(field, value.into());
        }
    }

    /// Write several attributes through the same schema gate.
    pub fn extend(&mut self, attrs: Document) {
        for (field, value) in attrs {
            self.set(field, value);
        }
    }

    /// Fill every unset schema field with its declared default.
    pub(crate) fn apply_defaults(&mut self) {
        let defaults: Vec<(String, Value)> = self
            .model
            .schema()
            .iter()
            .filter(|(name, _)| !self.attrs.contains_key(*name))
            .map(|(name, spec)| (name.to_string(), spec.default.clone()))
            .collect();
        self.attrs.extend(defaults);
    }

    /// Snapshot of the record: every schema field (unset reads as `Null`)
    /// plus identifier and timestamps when present.
    #[must_use]
    pub fn attributes(&self) -> Document {
        let mut doc: Document = self
            .model
            .schema()
            .iter()
            .map(|(name, _)| {
                let value = self.attrs.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();

        for field in [ID_FIELD, CREATED_AT, UPDATED_AT] {
            if let Some(value) = self.attrs.get(field) {
                doc.insert(field.to_string(), value.clone());
            }
        }

        doc
    }

    pub(crate) fn insert_document(&self) -> Document {
        let mut doc = self.attributes();
        doc.remove(ID_FIELD);
        doc
    }

    pub(crate) fn update_document(&self) -> Document {
        let mut doc = self.attributes();
        doc.remove(ID_FIELD);
        doc.remove(CREATED_AT);
        doc
    }

    /// Run one lifecycle stage's handlers in registration order, stopping at
    /// the first abort.
    pub(crate) fn run_stage(
        &mut self,
        stage: LifecycleStage,
        skip: &SkipCallbacks,
    ) -> CallbackOutcome {
        if skip.skips(stage) {
            return CallbackOutcome::Continue;
        }

        let handlers = self.model.stage_handlers(stage);
        for handler in handlers {
            if handler(self) == CallbackOutcome::Abort {
                return CallbackOutcome::Abort;
            }
        }

        CallbackOutcome::Continue
    }

    /// Validate every schema field, accumulating all failures. Validation
    /// handlers run around the checks; an abort marks the record invalid.
    pub fn validate(&mut self, skip: &SkipCallbacks) -> bool {
        self.clear_errors();

        if self.run_stage(LifecycleStage::BeforeValidation, skip) == CallbackOutcome::Abort {
            self.push_abort_issue(LifecycleStage::BeforeValidation);
            return false;
        }

        let issues: Vec<ValidationIssue> = self
            .model
            .schema()
            .iter()
            .flat_map(|(name, spec)| {
                let value = self.attrs.get(name);
                spec.validators
                    .iter()
                    .filter_map(|validator| validator.check(value))
                    .map(|kind| ValidationIssue::new(name, kind))
                    .collect::<Vec<_>>()
            })
            .collect();
        self.errors.extend(issues);

        if self.run_stage(LifecycleStage::AfterValidation, skip) == CallbackOutcome::Abort {
            self.push_abort_issue(LifecycleStage::AfterValidation);
            return false;
        }

        self.errors.is_empty()
    }

    fn push_abort_issue(&mut self, stage: LifecycleStage) {
        self.push_error(ValidationIssue::new(
            ValidationIssue::BASE,
            IssueKind::Custom(format!("stopped by {stage}")),
        ));
    }

    // --- relations ---

    /// Resolve a belongs-to relation to its target record, or `None` when
    /// the foreign key is unset.
    pub fn belongs_to(&self, name: &str) -> Result<Option<Self>, Error> {
        let def = self
            .model
            .belongs_to_def(name)
            .ok_or_else(|| self.unknown_relation(name))?;

        let fk = self.attrs.get(&def.foreign_key).cloned();
        let Some(fk) = fk.filter(|v| !v.is_null()) else {
            return Ok(None);
        };

        // Polymorphic relations read the target model from the sibling
        // field, falling back to the conventional name.
        let target = def
            .model_field
            .as_ref()
            .and_then(|field| self.attrs.get(field))
            .and_then(Value::as_text)
            .map_or_else(|| def.target.clone(), ToString::to_string);

        let scope = self.relation_scope(name, &target)?;
        scope.find_with(Filter::eq(ID_FIELD, fk), def.options.clone())
    }

    /// Point a belongs-to relation at the given record. Copies its
    /// identifier into the foreign key; polymorphic relations also record
    /// the target's model name.
    pub fn assign_belongs_to(&mut self, name: &str, target: &Self) -> Result<(), Error> {
        let def = self
            .model
            .belongs_to_def(name)
            .ok_or_else(|| self.unknown_relation(name))?
            .clone();

        self.attrs.insert(def.foreign_key, target.id_value());
        if let Some(model_field) = def.model_field {
            self.attrs
                .insert(model_field, Value::from(target.model_name()));
        }

        Ok(())
    }

    /// Scope over the related records of a has-many relation. On an unsaved
    /// record the foreign key reads as `Null`, matching nothing persisted.
    pub fn has_many(&self, name: &str) -> Result<Scope, Error> {
        let def = self
            .model
            .has_many_def(name)
            .ok_or_else(|| self.unknown_relation(name))?;

        let scope = self.relation_scope(name, &def.target)?;

        Ok(scope.filtered(Filter::eq(def.foreign_key.clone(), self.id_value())))
    }

    /// The single related record of a has-one relation, oldest first when
    /// several match.
    pub fn has_one(&self, name: &str) -> Result<Option<Self>, Error> {
        let def = self
            .model
            .has_one_def(name)
            .ok_or_else(|| self.unknown_relation(name))?;

        let scope = self.relation_scope(name, &def.target)?;
        scope
            .filtered(Filter::eq(def.foreign_key.clone(), self.id_value()))
            .first()
    }

    fn relation_scope(&self, relation: &str, target: &str) -> Result<Scope, Error> {
        self.db.model(target).map_err(|_| {
            tracing::warn!(
                model = self.model.name(),
                relation,
                target,
                "relation targets an unregistered model"
            );
            Error::UnresolvedRelation {
                model: self.model.name().to_string(),
                relation: relation.to_string(),
                target: target.to_string(),
            }
        })
    }

    fn unknown_relation(&self, name: &str) -> Error {
        Error::UnknownRelation {
            model: self.model.name().to_string(),
            relation: name.to_string(),
        }
    }
}
