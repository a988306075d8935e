pub mod memory;

use crate::{
    db::selector::Filter,
    value::{Document, Value},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// RecordId
///
/// Opaque document identifier assigned by the store on first insert.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RecordId(String);

impl RecordId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Text(self.0.clone())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

///
/// SortOrder
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

///
/// FindOptions
///
/// Per-query read options passed through to the collaborator. An unset sort
/// is defaulted to `createdAt` ascending at the scope layer.
///

#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl FindOptions {
    #[must_use]
    pub fn sorted(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            sort: Some((field.into(), order)),
            limit: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

///
/// Cursor
///
/// Materialized query result. External clients may stream; this layer only
/// needs fetch-all and count.
///

#[derive(Debug, Default)]
pub struct Cursor {
    docs: Vec<Document>,
}

impl Cursor {
    #[must_use]
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }

    #[must_use]
    pub fn fetch(self) -> Vec<Document> {
        self.docs
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

///
/// AccessOp
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum AccessOp {
    #[display("insert")]
    Insert,
    #[display("update")]
    Update,
    #[display("remove")]
    Remove,
}

///
/// AccessRules
///
/// Allow/deny predicates over a proposed document, evaluated by the store.
/// Deny wins over allow; registering any allow rule for an operation makes
/// that operation allow-listed.
///

pub type AccessPredicate = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct AccessRules {
    pub insert: Option<AccessPredicate>,
    pub update: Option<AccessPredicate>,
    pub remove: Option<AccessPredicate>,
}

impl AccessRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules permitting every operation.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::new()
            .insert(|_| true)
            .update(|_| true)
            .remove(|_| true)
    }

    #[must_use]
    pub fn insert(mut self, check: impl Fn(&Document) -> bool + Send + Sync + 'static) -> Self {
        self.insert = Some(Arc::new(check));
        self
    }

    #[must_use]
    pub fn update(mut self, check: impl Fn(&Document) -> bool + Send + Sync + 'static) -> Self {
        self.update = Some(Arc::new(check));
        self
    }

    #[must_use]
    pub fn remove(mut self, check: impl Fn(&Document) -> bool + Send + Sync + 'static) -> Self {
        self.remove = Some(Arc::new(check));
        self
    }

    #[must_use]
    pub fn predicate(&self, op: AccessOp) -> Option<&AccessPredicate> {
        match op {
            AccessOp::Insert => self.insert.as_ref(),
            AccessOp::Update => self.update.as_ref(),
            AccessOp::Remove => self.remove.as_ref(),
        }
    }
}

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("{0} denied by collection access rules")]
    AccessDenied(AccessOp),

    #[error("document {0} not found")]
    NotFound(RecordId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

///
/// Collection
///
/// Handle onto one named document collection of the external store.
/// Reads take a filter plus options; writes are one document at a time.
///

pub trait Collection: Send + Sync {
    fn find_one(&self, filter: &Filter, options: &FindOptions)
    -> Result<Option<Document>, StoreError>;

    fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Cursor, StoreError>;

    /// Insert a document without an identifier; the store assigns one.
    fn insert(&self, doc: Document) -> Result<RecordId, StoreError>;

    /// Partial field-set write applied to every matching document.
    /// Returns the number of documents touched.
    fn update(&self, filter: &Filter, set: Document) -> Result<u64, StoreError>;

    /// Remove by identifier. Removing an absent document is a no-op.
    fn remove(&self, id: &RecordId) -> Result<(), StoreError>;

    fn allow(&self, rules: AccessRules);

    fn deny(&self, rules: AccessRules);
}

///
/// DocumentStore
///

pub trait DocumentStore: Send + Sync {
    fn collection(&self, name: &str) -> Arc<dyn Collection>;
}
