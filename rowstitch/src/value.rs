//! Wire values and column types.
//!
//! - [`Value`]
//! - [`Type`]
//! - [`Field`]
use std::fmt;

/// A value as it travels on the wire.
///
/// `STRUCT` values are encoded as a [`Value::List`] of their field values in
/// declaration order. `INT64` and most other scalars are encoded as
/// [`Value::String`].
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Return `true` if value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string slice if value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list items if value is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(items) => f.debug_list().entries(items).finish(),
        }
    }
}

/// Column type, drives how chunked values are merged.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Bool,
    Int64,
    Float64,
    Numeric,
    String,
    Bytes,
    Json,
    Date,
    Timestamp,
    Array(Box<Type>),
    Struct(Vec<Field>),
}

impl Type {
    /// Shorthand for `Type::Array(Box::new(element))`.
    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    /// Returns `true` for `ARRAY` and `STRUCT`.
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Struct(_))
    }
}

/// A named, typed column or struct member.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }

    /// Returns `true` if the field has no name.
    pub fn is_nameless(&self) -> bool {
        self.name.is_empty()
    }
}
