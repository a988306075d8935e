use crate::{schema::FieldType, value::Value};
use std::{fmt, sync::Arc};

///
/// CustomValidator
///
/// User-supplied field check. Returns a message describing the failure;
/// a panicking or misconfigured validator is the caller's bug, the engine
/// only ever invokes it with the field's current value.
///

pub type CustomValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

///
/// Validator
///
/// One normalized field check. Null or missing values pass every check
/// except `Required`: nullability is opted out of via `required`, not via
/// type or length validators, so optional fields skip checks when absent.
///

#[derive(Clone)]
pub enum Validator {
    Type(FieldType),
    Required,
    MinLength(usize),
    MaxLength(usize),
    MinNumber(f64),
    MaxNumber(f64),
    OneOf(Vec<Value>),
    Custom(CustomValidator),
}

impl Validator {
    /// Check one value; `None` means the field is unset.
    /// Returns the failure kind, or `None` when the check passes.
    #[must_use]
    pub fn check(&self, value: Option<&Value>) -> Option<IssueKind> {
        let present = match value {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        };

        match (self, present) {
            (Self::Required, None) => Some(IssueKind::Required),
            (_, None) => None,
            (Self::Required, Some(_)) => None,
            (Self::Type(expected), Some(v)) => {
                if expected.matches(v) {
                    None
                } else {
                    Some(IssueKind::WrongType(*expected))
                }
            }
            (Self::MinLength(min), Some(v)) => match v.length() {
                Some(len) if len < *min => Some(IssueKind::TooShort(*min)),
                _ => None,
            },
            (Self::MaxLength(max), Some(v)) => match v.length() {
                Some(len) if len > *max => Some(IssueKind::TooLong(*max)),
                _ => None,
            },
            (Self::MinNumber(min), Some(v)) => match v.as_f64() {
                Some(n) if n < *min => Some(IssueKind::TooSmall(*min)),
                _ => None,
            },
            (Self::MaxNumber(max), Some(v)) => match v.as_f64() {
                Some(n) if n > *max => Some(IssueKind::TooLarge(*max)),
                _ => None,
            },
            (Self::OneOf(allowed), Some(v)) => {
                if allowed.iter().any(|a| a.loosely_eq(v)) {
                    None
                } else {
                    Some(IssueKind::NotAllowed)
                }
            }
            (Self::Custom(check), Some(v)) => check(v).err().map(IssueKind::Custom),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(t) => write!(f, "Type({t})"),
            Self::Required => write!(f, "Required"),
            Self::MinLength(n) => write!(f, "MinLength({n})"),
            Self::MaxLength(n) => write!(f, "MaxLength({n})"),
            Self::MinNumber(n) => write!(f, "MinNumber({n})"),
            Self::MaxNumber(n) => write!(f, "MaxNumber({n})"),
            Self::OneOf(values) => write!(f, "OneOf({values:?})"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

///
/// IssueKind
///

#[derive(Clone, Debug, PartialEq)]
pub enum IssueKind {
    Required,
    WrongType(FieldType),
    TooShort(usize),
    TooLong(usize),
    TooSmall(f64),
    TooLarge(f64),
    NotAllowed,
    Custom(String),
    /// Insert/update failure reported by the store collaborator.
    Storage(String),
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "is required"),
            Self::WrongType(t) => write!(f, "is not of type {t}"),
            Self::TooShort(min) => write!(f, "is shorter than minimum length {min}"),
            Self::TooLong(max) => write!(f, "is longer than maximum length {max}"),
            Self::TooSmall(min) => write!(f, "is lower than minimum {min}"),
            Self::TooLarge(max) => write!(f, "is greater than maximum {max}"),
            Self::NotAllowed => write!(f, "is not an allowed value"),
            Self::Custom(msg) => write!(f, "{msg}"),
            Self::Storage(msg) => write!(f, "could not be persisted: {msg}"),
        }
    }
}

///
/// ValidationIssue
///
/// One accumulated validation failure: the failing column and what failed.
/// Storage failures use the pseudo-column `base` (the record as a whole).
///

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationIssue {
    pub column: String,
    pub kind: IssueKind,
}

impl ValidationIssue {
    pub const BASE: &'static str = "base";

    #[must_use]
    pub fn new(column: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }

    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(Self::BASE, IssueKind::Storage(message.into()))
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.kind)
    }
}

///
/// TESTS
///
