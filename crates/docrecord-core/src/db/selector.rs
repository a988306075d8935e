use crate::{names, value::{Document, Value}};
use std::cmp::Ordering;

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

///
/// Filter
///
/// Pure representation of a selector. Scopes compose filters by conjunction;
/// `All` and the empty conjunction match every document.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    All,
    Cmp {
        field: String,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Filter>),
}

impl Filter {
    fn cmp(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Cmp {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(field, CompareOp::Gte, value)
    }

    #[must_use]
    pub fn in_(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::cmp(field, CompareOp::In, Value::List(values))
    }

    #[must_use]
    pub const fn and(fragments: Vec<Filter>) -> Self {
        Self::And(fragments)
    }

    /// True when the filter matches every document.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        match self {
            Self::All => true,
            Self::Cmp { .. } => false,
            Self::And(fragments) => fragments.iter().all(Self::is_match_all),
        }
    }

    /// Evaluate against one document. A missing field reads as `Null`.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::And(fragments) => fragments.iter().all(|f| f.matches(doc)),
            Self::Cmp { field, op, value } => {
                let current = doc.get(field).unwrap_or(&Value::Null);
                Self::compare(current, *op, value)
            }
        }
    }

    fn compare(current: &Value, op: CompareOp, expected: &Value) -> bool {
        match op {
            CompareOp::Eq => current.loosely_eq(expected),
            CompareOp::Ne => !current.loosely_eq(expected),
            CompareOp::Lt => current.compare(expected) == Some(Ordering::Less),
            CompareOp::Lte => matches!(
                current.compare(expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Gt => current.compare(expected) == Some(Ordering::Greater),
            CompareOp::Gte => matches!(
                current.compare(expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            CompareOp::In => match expected {
                Value::List(values) => values.iter().any(|v| current.loosely_eq(v)),
                _ => false,
            },
        }
    }

    /// Conjunction of fragments: nested conjunctions are flattened,
    /// match-all fragments are compacted away, and duplicates are dropped
    /// so that re-applying an active selector is a no-op.
    #[must_use]
    pub fn conjoin(fragments: Vec<Filter>) -> Self {
        let mut flat: Vec<Filter> = Vec::new();
        Self::flatten_into(fragments, &mut flat);

        match flat.len() {
            0 => Self::All,
            1 => flat.swap_remove(0),
            _ => Self::And(flat),
        }
    }

    fn flatten_into(fragments: Vec<Filter>, out: &mut Vec<Filter>) {
        for fragment in fragments {
            match fragment {
                Self::All => {}
                Self::And(inner) => Self::flatten_into(inner, out),
                other => {
                    if !out.contains(&other) {
                        out.push(other);
                    }
                }
            }
        }
    }

    /// Rewrite the identifier aliases a model answers to (`id` stays, the
    /// decapitalized `<modelName>Id` maps to `id`) onto the canonical
    /// identifier field.
    #[must_use]
    pub(crate) fn alias_identifier(self, model_name: &str) -> Self {
        let alias = names::id_alias(model_name);
        self.rewrite_field(&alias, "id")
    }

    fn rewrite_field(self, from: &str, to: &str) -> Self {
        match self {
            Self::Cmp { field, op, value } if field == from => Self::Cmp {
                field: to.to_string(),
                op,
                value,
            },
            Self::And(fragments) => Self::And(
                fragments
                    .into_iter()
                    .map(|f| f.rewrite_field(from, to))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Equality pairs of the filter, used to seed new records with the
    /// attributes of an active default scope. Range fragments have no
    /// materializable attribute value and are skipped.
    pub(crate) fn equality_pairs(&self) -> Vec<(&str, &Value)> {
        match self {
            Self::Cmp {
                field,
                op: CompareOp::Eq,
                value,
            } => vec![(field.as_str(), value)],
            Self::And(fragments) => fragments
                .iter()
                .flat_map(Self::equality_pairs)
                .collect(),
            _ => Vec::new(),
        }
    }
}

///
/// TESTS
///
