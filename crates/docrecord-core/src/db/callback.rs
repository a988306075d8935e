use crate::db::record::Record;
use derive_more::Display;
use std::sync::Arc;

///
/// LifecycleStage
///
/// Fixed points of the persistence state machine at which registered
/// handlers run. Display names match the hook names surfaced in abort
/// errors ("stopped by beforeSave").
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum LifecycleStage {
    #[display("beforeValidation")]
    BeforeValidation,
    #[display("afterValidation")]
    AfterValidation,
    #[display("beforeCommit")]
    BeforeCommit,
    #[display("beforeSave")]
    BeforeSave,
    #[display("beforeInsert")]
    BeforeInsert,
    #[display("beforeUpdate")]
    BeforeUpdate,
    #[display("afterInsert")]
    AfterInsert,
    #[display("afterUpdate")]
    AfterUpdate,
    #[display("afterSave")]
    AfterSave,
    #[display("afterCommit")]
    AfterCommit,
    #[display("beforeDestroy")]
    BeforeDestroy,
    #[display("afterDestroy")]
    AfterDestroy,
}

///
/// CallbackOutcome
///
/// Typed result of one handler. `Abort` at a before-commit stage stops the
/// operation with an error naming the stage; at a validation stage it marks
/// the validation as failed; at after stages it is ignored.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallbackOutcome {
    Continue,
    Abort,
}

pub type CallbackFn = Arc<dyn Fn(&mut Record) -> CallbackOutcome + Send + Sync>;

///
/// CallbackSet
///
/// Ordered lifecycle handlers of one model. Handlers run synchronously in
/// registration order within their stage.
///

#[derive(Clone, Default)]
pub struct CallbackSet {
    handlers: Vec<(LifecycleStage, CallbackFn)>,
}

impl CallbackSet {
    pub(crate) fn register(
        &mut self,
        stage: LifecycleStage,
        handler: impl Fn(&mut Record) -> CallbackOutcome + Send + Sync + 'static,
    ) {
        self.handlers.push((stage, Arc::new(handler)));
    }

    /// Handlers registered for one stage, in registration order.
    pub(crate) fn stage_handlers(&self, stage: LifecycleStage) -> Vec<CallbackFn> {
        self.handlers
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, f)| Arc::clone(f))
            .collect()
    }
}

///
/// SkipCallbacks
///
/// Suppression list passed through save/destroy: nothing, everything, or a
/// set of individual stages.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SkipCallbacks {
    #[default]
    None,
    All,
    Stages(Vec<LifecycleStage>),
}

impl SkipCallbacks {
    #[must_use]
    pub fn stages(stages: impl IntoIterator<Item = LifecycleStage>) -> Self {
        Self::Stages(stages.into_iter().collect())
    }

    #[must_use]
    pub fn skips(&self, stage: LifecycleStage) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Stages(stages) => stages.contains(&stage),
        }
    }
}
