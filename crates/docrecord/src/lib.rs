//! Facade crate over the docrecord engine.
//!
//! ## Crate layout
//! - `core`: model registry, schema validation, scopes, relations, and the
//!   callback-wrapped persistence pipeline.
//!
//! The `prelude` module mirrors the surface used by application code.

pub use docrecord_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use docrecord_core::Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        Error,
        db::{
            Db, SaveOptions,
            callback::{CallbackOutcome, LifecycleStage, SkipCallbacks},
            record::Record,
            scope::Scope,
            selector::{CompareOp, Filter},
        },
        model::{BelongsTo, DanglingRelation, HasMany, HasOne, ModelDef, Registry},
        schema::{
            FieldDef, FieldType,
            validator::{IssueKind, ValidationIssue},
        },
        store::{
            AccessRules, Collection, Cursor, DocumentStore, FindOptions, RecordId, SortOrder,
            StoreError, memory::MemoryStore,
        },
        value::{Document, Value},
    };
}
