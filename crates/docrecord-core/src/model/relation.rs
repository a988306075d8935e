use crate::{names, store::FindOptions};

///
/// Relation declarations
///
/// As written on the model builder. Resolution happens once at registration:
/// foreign keys and target model names are computed there, so nothing is
/// derived from strings at query time. The target *descriptor* lookup stays
/// lazy (through the registry) so models may reference each other regardless
/// of registration order; `Registry::dangling_relations` makes unresolved
/// targets detectable at startup.
///

#[derive(Clone, Debug, Default)]
pub struct BelongsTo {
    foreign_key: Option<String>,
    model: Option<String>,
    polymorphic: bool,
    optional: bool,
    options: FindOptions,
}

impl BelongsTo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the foreign-key base name; `Id` is appended by convention.
    #[must_use]
    pub fn foreign_key(mut self, base: impl Into<String>) -> Self {
        self.foreign_key = Some(base.into());
        self
    }

    #[must_use]
    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.model = Some(name.into());
        self
    }

    #[must_use]
    pub const fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    /// Foreign keys are required unless the relation is optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Relation-level read options applied when resolving the target.
    #[must_use]
    pub fn options(mut self, options: FindOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn resolve(self, name: &str) -> BelongsToDef {
        let base = self.foreign_key.unwrap_or_else(|| name.to_string());
        let target = if self.polymorphic {
            names::class_name(&base)
        } else {
            self.model.unwrap_or_else(|| names::class_name(name))
        };

        BelongsToDef {
            name: name.to_string(),
            foreign_key: names::foreign_key(&base),
            model_field: self.polymorphic.then(|| names::model_field(&base)),
            target,
            required: !self.optional,
            options: self.options,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HasMany {
    foreign_key: Option<String>,
    model: Option<String>,
    dependent_destroy: bool,
}

impl HasMany {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the child-side foreign-key field, used verbatim.
    #[must_use]
    pub fn foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = Some(field.into());
        self
    }

    #[must_use]
    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.model = Some(name.into());
        self
    }

    /// Destroy related records when the owner is destroyed.
    #[must_use]
    pub const fn dependent_destroy(mut self) -> Self {
        self.dependent_destroy = true;
        self
    }

    pub(crate) fn resolve(self, name: &str, owner: &str) -> HasManyDef {
        HasManyDef {
            name: name.to_string(),
            foreign_key: self
                .foreign_key
                .unwrap_or_else(|| names::id_alias(owner)),
            target: self.model.unwrap_or_else(|| names::class_name(name)),
            dependent_destroy: self.dependent_destroy,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HasOne {
    foreign_key: Option<String>,
    model: Option<String>,
    dependent_destroy: bool,
}

impl HasOne {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = Some(field.into());
        self
    }

    #[must_use]
    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.model = Some(name.into());
        self
    }

    #[must_use]
    pub const fn dependent_destroy(mut self) -> Self {
        self.dependent_destroy = true;
        self
    }

    pub(crate) fn resolve(self, name: &str, owner: &str) -> HasOneDef {
        HasOneDef {
            name: name.to_string(),
            foreign_key: self
                .foreign_key
                .unwrap_or_else(|| names::id_alias(owner)),
            target: self.model.unwrap_or_else(|| names::class_name(name)),
            dependent_destroy: self.dependent_destroy,
        }
    }
}

///
/// Resolved relation descriptors
///

#[derive(Clone, Debug)]
pub(crate) struct BelongsToDef {
    pub name: String,
    pub foreign_key: String,
    /// Sibling field recording the target model name; present iff the
    /// relation is polymorphic.
    pub model_field: Option<String>,
    pub target: String,
    pub required: bool,
    pub options: FindOptions,
}

#[derive(Clone, Debug)]
pub(crate) struct HasManyDef {
    pub name: String,
    pub foreign_key: String,
    pub target: String,
    pub dependent_destroy: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct HasOneDef {
    pub name: String,
    pub foreign_key: String,
    pub target: String,
    pub dependent_destroy: bool,
}
