use crate::{db::callback::LifecycleStage, store::StoreError};
use thiserror::Error as ThisError;

///
/// Error
///
/// Fatal failures of the mapping layer. Field-level validation failures are
/// not errors; they accumulate on the record and merely mark the commit as
/// not performed.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("model {0} is already registered")]
    DuplicateModel(String),

    #[error("model {0} is not registered")]
    UnknownModel(String),

    #[error("model {model} has no relation named {relation}")]
    UnknownRelation { model: String, relation: String },

    #[error("relation {relation} on {model} targets unregistered model {target}")]
    UnresolvedRelation {
        model: String,
        relation: String,
        target: String,
    },

    #[error("model {model} has no scope named {scope}")]
    UnknownScope { model: String, scope: String },

    #[error("record was destroyed and accepts no further operations")]
    DestroyedRecord,

    #[error("stopped by {0}")]
    CallbackAborted(LifecycleStage),

    #[error(transparent)]
    Store(#[from] StoreError),
}
