pub mod validator;

use crate::value::Value;
use derive_more::Display;
use validator::{CustomValidator, Validator};

///
/// FieldType
///
/// Declared type of a schema field. `Untyped` is the sentinel filled in for
/// declarations without a type; it matches anything. `Id` is the identifier
/// family used by injected foreign keys.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum FieldType {
    #[display("untyped")]
    Untyped,
    #[display("text")]
    Text,
    #[display("number")]
    Number,
    #[display("bool")]
    Bool,
    #[display("list")]
    List,
    #[display("map")]
    Map,
    #[display("identifier")]
    Id,
}

impl FieldType {
    /// Type-check one present value. Untyped accepts anything; identifiers
    /// are stored as text.
    #[must_use]
    pub const fn matches(self, value: &Value) -> bool {
        match self {
            Self::Untyped => true,
            Self::Text | Self::Id => matches!(value, Value::Text(_)),
            Self::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::List => matches!(value, Value::List(_)),
            Self::Map => matches!(value, Value::Map(_)),
        }
    }
}

///
/// FieldDef
///
/// One field declaration as written on the model builder. Normalization
/// turns it into a `FieldSpec` with a concrete validator list.
///

#[derive(Clone, Default)]
pub struct FieldDef {
    field_type: Option<FieldType>,
    required: bool,
    default: Option<Value>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_number: Option<f64>,
    max_number: Option<f64>,
    allowed_values: Option<Vec<Value>>,
    custom: Vec<CustomValidator>,
}

impl FieldDef {
    #[must_use]
    pub fn untyped() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text() -> Self {
        Self::typed(FieldType::Text)
    }

    #[must_use]
    pub fn number() -> Self {
        Self::typed(FieldType::Number)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::typed(FieldType::Bool)
    }

    #[must_use]
    pub fn list() -> Self {
        Self::typed(FieldType::List)
    }

    #[must_use]
    pub fn map() -> Self {
        Self::typed(FieldType::Map)
    }

    #[must_use]
    pub fn id() -> Self {
        Self::typed(FieldType::Id)
    }

    fn typed(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub(crate) const fn required_if(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub const fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    #[must_use]
    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    #[must_use]
    pub const fn min_number(mut self, min: f64) -> Self {
        self.min_number = Some(min);
        self
    }

    #[must_use]
    pub const fn max_number(mut self, max: f64) -> Self {
        self.max_number = Some(max);
        self
    }

    #[must_use]
    pub fn allowed_values(mut self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn validator(
        mut self,
        check: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.custom.push(std::sync::Arc::new(check));
        self
    }
}

///
/// FieldSpec
///
/// Normalized field: resolved type, defaulted `default`, and the full
/// validator list. Built fresh from the declaration, never appended to,
/// so repeated normalization cannot duplicate validators.
///

#[derive(Clone)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub required: bool,
    pub default: Value,
    pub validators: Vec<Validator>,
}

impl FieldSpec {
    fn normalize(def: &FieldDef) -> Self {
        let field_type = def.field_type.unwrap_or(FieldType::Untyped);
        let mut validators = Vec::new();

        if field_type != FieldType::Untyped {
            validators.push(Validator::Type(field_type));
        }
        if def.required {
            validators.push(Validator::Required);
        }
        if let Some(min) = def.min_length {
            validators.push(Validator::MinLength(min));
        }
        if let Some(max) = def.max_length {
            validators.push(Validator::MaxLength(max));
        }
        if let Some(min) = def.min_number {
            validators.push(Validator::MinNumber(min));
        }
        if let Some(max) = def.max_number {
            validators.push(Validator::MaxNumber(max));
        }
        if let Some(allowed) = &def.allowed_values {
            validators.push(Validator::OneOf(allowed.clone()));
        }
        for check in &def.custom {
            validators.push(Validator::Custom(check.clone()));
        }

        Self {
            field_type,
            required: def.required,
            default: def.default.clone().unwrap_or(Value::Null),
            validators,
        }
    }
}

///
/// Schema
///
/// Normalized field map of one model, in declaration order. Foreign keys
/// derived from belongs-to relations are injected by the model builder
/// before normalization.
///

#[derive(Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    pub(crate) fn normalize(decls: &[(String, FieldDef)]) -> Self {
        Self {
            fields: decls
                .iter()
                .map(|(name, def)| (name.clone(), FieldSpec::normalize(def)))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, spec)| spec)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

///
/// TESTS
///
