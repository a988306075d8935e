use crate::{
    Error,
    db::{CREATED_AT, Db, SaveOptions, callback::SkipCallbacks, record::Record, selector::Filter},
    model::ModelDef,
    store::{FindOptions, SortOrder},
    value::{Document, Value},
};
use std::sync::Arc;

///
/// Scope
///
/// Immutable view onto one model's collection: a model descriptor plus an
/// accumulated selector. Narrowing returns a new scope and leaves the
/// receiver untouched; fragments merge by conjunction, and re-applying an
/// active fragment changes nothing.
///

#[derive(Clone)]
pub struct Scope {
    db: Db,
    model: Arc<ModelDef>,
    filter: Filter,
}

impl Scope {
    pub(crate) fn root(db: Db, model: Arc<ModelDef>) -> Self {
        let filter = model.default_scope().cloned().unwrap_or(Filter::All);

        Self { db, model, filter }
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Narrow by an arbitrary selector fragment.
    #[must_use]
    pub fn filtered(&self, fragment: Filter) -> Self {
        let fragment = fragment.alias_identifier(self.model.name());

        Self {
            db: self.db.clone(),
            model: Arc::clone(&self.model),
            filter: Filter::conjoin(vec![self.filter.clone(), fragment]),
        }
    }

    /// Narrow by a scope declared on the model.
    pub fn named(&self, name: &str) -> Result<Self, Error> {
        let fragment = self
            .model
            .named_scope(name)
            .cloned()
            .ok_or_else(|| Error::UnknownScope {
                model: self.model.name().to_string(),
                scope: name.to_string(),
            })?;

        Ok(self.filtered(fragment))
    }

    /// Narrow by field equality.
    #[must_use]
    pub fn with_field(&self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filtered(Filter::eq(field, value))
    }

    fn read_options(&self, options: FindOptions) -> FindOptions {
        if options.sort.is_some() {
            options
        } else {
            FindOptions {
                sort: Some((CREATED_AT.to_string(), SortOrder::Asc)),
                ..options
            }
        }
    }

    fn query(&self, selector: Filter) -> Filter {
        Filter::conjoin(vec![
            self.filter.clone(),
            selector.alias_identifier(self.model.name()),
        ])
    }

    fn hydrate(&self, doc: Document) -> Record {
        Record::hydrate(self.db.clone(), Arc::clone(&self.model), doc)
    }

    /// First record matching the selector within this scope.
    pub fn find(&self, selector: Filter) -> Result<Option<Record>, Error> {
        self.find_with(selector, FindOptions::default())
    }

    pub fn find_with(
        &self,
        selector: Filter,
        options: FindOptions,
    ) -> Result<Option<Record>, Error> {
        let doc = self
            .db
            .collection_for(&self.model)
            .find_one(&self.query(selector), &self.read_options(options))?;

        Ok(doc.map(|doc| self.hydrate(doc)))
    }

    /// Every record matching the selector within this scope.
    pub fn find_all(&self, selector: Filter, options: FindOptions) -> Result<Vec<Record>, Error> {
        let cursor = self
            .db
            .collection_for(&self.model)
            .find(&self.query(selector), &self.read_options(options))?;

        Ok(cursor
            .fetch()
            .into_iter()
            .map(|doc| self.hydrate(doc))
            .collect())
    }

    pub fn all(&self) -> Result<Vec<Record>, Error> {
        self.find_all(Filter::All, FindOptions::default())
    }

    pub fn count(&self) -> Result<usize, Error> {
        let cursor = self
            .db
            .collection_for(&self.model)
            .find(&self.query(Filter::All), &FindOptions::default())?;

        Ok(cursor.count())
    }

    pub fn has_any(&self) -> Result<bool, Error> {
        Ok(self.count()? > 0)
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.count()? == 0)
    }

    /// Oldest record in the scope, by creation time.
    pub fn first(&self) -> Result<Option<Record>, Error> {
        self.find_with(
            Filter::All,
            FindOptions::sorted(CREATED_AT, SortOrder::Asc),
        )
    }

    /// Newest record in the scope, by creation time.
    pub fn last(&self) -> Result<Option<Record>, Error> {
        self.find_with(
            Filter::All,
            FindOptions::sorted(CREATED_AT, SortOrder::Desc),
        )
    }

    /// New unsaved record: the scope's equality fragments seed it first,
    /// then schema defaults fill the gaps, then the given attributes are
    /// applied. Keys outside the schema are dropped.
    #[must_use]
    pub fn build(&self, attrs: Document) -> Record {
        let mut record = Record::new(self.db.clone(), Arc::clone(&self.model));
        for (field, value) in self.filter.equality_pairs() {
            record.set(field, value.clone());
        }
        record.apply_defaults();
        record.extend(attrs);

        record
    }

    /// Build and immediately save. The record is returned even when
    /// validation failed; check `is_persistent` or `errors`.
    pub fn create(&self, attrs: Document) -> Result<Record, Error> {
        let mut record = self.build(attrs);
        record.save(&SaveOptions::default())?;

        Ok(record)
    }

    /// Destroy every record in the scope, cascades included. Returns the
    /// number of records destroyed; an empty scope is a no-op.
    pub fn destroy_all(&self, skip: &SkipCallbacks) -> Result<usize, Error> {
        let records = self.all()?;
        let destroyed = records.len();
        for mut record in records {
            record.destroy(skip)?;
        }

        Ok(destroyed)
    }
}
