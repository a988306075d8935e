use crate::{
    Error,
    db::{
        CREATED_AT, UPDATED_AT,
        callback::{CallbackOutcome, LifecycleStage, SkipCallbacks},
        record::Record,
        selector::Filter,
    },
    schema::validator::ValidationIssue,
    value::{Document, Value},
};
use std::time::{SystemTime, UNIX_EPOCH};

///
/// SaveOptions
///
/// Per-call switches of the save pipeline. Everything runs by default.
///

#[derive(Clone, Debug, Default)]
pub struct SaveOptions {
    pub skip_validation: bool,
    pub skip_touch: bool,
    pub skip_apply_defaults: bool,
    pub skip_callbacks: SkipCallbacks,
}

/// Milliseconds since the epoch, for the timestamp columns.
fn now_ms() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}

impl Record {
    /// Persist the record: insert when new, partial update otherwise.
    ///
    /// Returns `Ok(true)` on commit, `Ok(false)` when validation failed or
    /// the store rejected the write (the failure lands in `errors`), and
    /// `Err` when a before-commit handler aborted or the record was already
    /// destroyed.
    pub fn save(&mut self, options: &SaveOptions) -> Result<bool, Error> {
        if self.is_destroyed() {
            return Err(Error::DestroyedRecord);
        }

        self.clear_errors();
        if !options.skip_apply_defaults {
            self.apply_defaults();
        }

        let valid = options.skip_validation || self.validate(&options.skip_callbacks);

        self.guard_stage(LifecycleStage::BeforeCommit, &options.skip_callbacks)?;
        self.guard_stage(LifecycleStage::BeforeSave, &options.skip_callbacks)?;

        if !valid {
            return Ok(false);
        }
        if !options.skip_touch {
            self.touch();
        }

        let committed = if self.is_new() {
            self.commit_insert(options)?
        } else {
            self.commit_update(options)?
        };
        if !committed {
            return Ok(false);
        }

        self.run_stage(LifecycleStage::AfterSave, &options.skip_callbacks);
        self.run_stage(LifecycleStage::AfterCommit, &options.skip_callbacks);

        Ok(true)
    }

    fn commit_insert(&mut self, options: &SaveOptions) -> Result<bool, Error> {
        self.guard_stage(LifecycleStage::BeforeInsert, &options.skip_callbacks)?;

        let collection = self.db().collection_for(self.model_def());
        match collection.insert(self.insert_document()) {
            Ok(id) => self.set_id(&id),
            Err(err) => {
                self.push_error(ValidationIssue::storage(err.to_string()));
                return Ok(false);
            }
        }

        self.run_stage(LifecycleStage::AfterInsert, &options.skip_callbacks);

        Ok(true)
    }

    fn commit_update(&mut self, options: &SaveOptions) -> Result<bool, Error> {
        self.guard_stage(LifecycleStage::BeforeUpdate, &options.skip_callbacks)?;

        let collection = self.db().collection_for(self.model_def());
        let keyed = Filter::eq(super::ID_FIELD, self.id_value());
        if let Err(err) = collection.update(&keyed, self.update_document()) {
            self.push_error(ValidationIssue::storage(err.to_string()));
            return Ok(false);
        }

        self.run_stage(LifecycleStage::AfterUpdate, &options.skip_callbacks);

        Ok(true)
    }

    /// Merge the given attributes and save.
    pub fn update(&mut self, attrs: Document, options: &SaveOptions) -> Result<bool, Error> {
        self.extend(attrs);
        self.save(options)
    }

    /// Remove the record from the store, destroying dependent relations
    /// first. Cascades are not transactional: children destroyed before a
    /// failure stay destroyed.
    pub fn destroy(&mut self, skip: &SkipCallbacks) -> Result<(), Error> {
        if self.is_destroyed() {
            return Err(Error::DestroyedRecord);
        }

        self.guard_stage(LifecycleStage::BeforeCommit, skip)?;
        self.guard_stage(LifecycleStage::BeforeDestroy, skip)?;

        if let Some(id) = self.id() {
            self.destroy_dependents(skip)?;
            self.db()
                .collection_for(self.model_def())
                .remove(&id)?;
            self.clear_id();
        }
        self.mark_destroyed();

        self.run_stage(LifecycleStage::AfterDestroy, skip);
        self.run_stage(LifecycleStage::AfterCommit, skip);

        Ok(())
    }

    fn destroy_dependents(&mut self, skip: &SkipCallbacks) -> Result<(), Error> {
        let dependent_ones: Vec<String> = self
            .model_def()
            .has_one_defs()
            .iter()
            .filter(|def| def.dependent_destroy)
            .map(|def| def.name.clone())
            .collect();
        for name in dependent_ones {
            match self.has_one(&name) {
                Ok(Some(mut child)) => child.destroy(skip)?,
                Ok(None) => {}
                // Already logged; an unresolved target has nothing to cascade into.
                Err(Error::UnresolvedRelation { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        let dependent_many: Vec<String> = self
            .model_def()
            .has_many_defs()
            .iter()
            .filter(|def| def.dependent_destroy)
            .map(|def| def.name.clone())
            .collect();
        for name in dependent_many {
            match self.has_many(&name) {
                Ok(scope) => {
                    scope.destroy_all(skip)?;
                }
                Err(Error::UnresolvedRelation { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Stamp the timestamp columns: `createdAt` once, `updatedAt` on every
    /// touch.
    pub fn touch(&mut self) {
        let now = Value::Int(now_ms());
        if self.get(CREATED_AT).is_none_or(Value::is_null) {
            self.set(CREATED_AT, now.clone());
        }
        self.set(UPDATED_AT, now);
    }

    fn guard_stage(&mut self, stage: LifecycleStage, skip: &SkipCallbacks) -> Result<(), Error> {
        match self.run_stage(stage, skip) {
            CallbackOutcome::Continue => Ok(()),
            CallbackOutcome::Abort => Err(Error::CallbackAborted(stage)),
        }
    }
}
