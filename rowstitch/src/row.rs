//! Assembled result row.
//!
//! - [`Row`]
//! - [`Column`]
//! - [`FromRow`]
//! - [`Decode`]
//!
//! - [`Index`]
//! - [`DecodeError`]
use std::{borrow::Cow, fmt, sync::Arc};

use crate::value::{Field, Type, Value};

/// A fixed-width result row.
///
/// All rows of one stream share the same column metadata.
#[derive(Clone, PartialEq)]
pub struct Row {
    fields: Arc<[Field]>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(fields: Arc<[Field]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(fields.len(), values.len(), "row width missmatch with metadata");
        Self { fields, values }
    }

    /// Returns `true` if row contains no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the column metadata.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the raw wire values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume self into the raw wire values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Returns the raw value of a column.
    pub fn get<I: Index>(&self, idx: I) -> Option<&Value> {
        idx.position(&self.fields).ok().map(|nth| &self.values[nth])
    }

    /// Try get and decode column.
    pub fn try_get<I: Index, D: Decode>(&self, idx: I) -> Result<D, DecodeError> {
        let nth = idx.position(&self.fields)?;
        D::decode(Column {
            field: self.fields[nth].clone(),
            value: self.values[nth].clone(),
        })
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D, DecodeError> {
        D::from_row(self)
    }
}

impl IntoIterator for Row {
    type Item = Column;

    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            fields: self.fields,
            values: self.values.into_iter(),
            iter_n: 0,
        }
    }
}

/// [`IntoIterator`] implementation from [`Row`].
#[derive(Debug)]
pub struct IntoIter {
    fields: Arc<[Field]>,
    values: std::vec::IntoIter<Value>,
    iter_n: usize,
}

impl Iterator for IntoIter {
    type Item = Column;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.next()?;
        let field = self.fields[self.iter_n].clone();
        self.iter_n += 1;
        Some(Column { field, value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        for (field, value) in self.fields.iter().zip(&self.values) {
            dbg.entry(&field.name, value);
        }
        dbg.finish()
    }
}

/// Single column of a [`Row`].
#[derive(Debug, Clone)]
pub struct Column {
    field: Field,
    value: Value,
}

impl Column {
    /// Returns column name.
    pub fn name(&self) -> &str {
        &self.field.name
    }

    /// Returns column type.
    pub fn ty(&self) -> &Type {
        &self.field.ty
    }

    /// Return `true` if value is NULL.
    pub const fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Returns the raw wire value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume self into the raw wire value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Try consume self into the raw wire value.
    ///
    /// Return [`DecodeError::Null`] if value is `NULL`.
    pub fn try_into_value(self) -> Result<Value, DecodeError> {
        match self.value {
            Value::Null => Err(DecodeError::Null),
            value => Ok(value),
        }
    }

    /// Try decode type using [`Decode`] implementation.
    pub fn decode<D: Decode>(self) -> Result<D, DecodeError> {
        D::decode(self)
    }
}

// ===== Traits =====

/// Type that can be constructed from a row.
pub trait FromRow: Sized {
    /// Construct self from row.
    fn from_row(row: Row) -> Result<Self, DecodeError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(row)
    }
}

impl FromRow for () {
    fn from_row(_: Row) -> Result<Self, DecodeError> {
        Ok(())
    }
}

macro_rules! from_row_tuple {
    ($($t:ident $i:literal),*) => {
        impl<$($t),*> FromRow for ($($t),*,)
        where
            $($t: Decode),*
        {
            fn from_row(row: Row) -> Result<Self, DecodeError> {
                Ok((
                    $(row.try_get::<usize, $t>($i)?),*,
                ))
            }
        }
    };
}

from_row_tuple!(T0 0);
from_row_tuple!(T0 0, T1 1);
from_row_tuple!(T0 0, T1 1, T2 2);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3);

/// A type that can be constructed from [`Column`].
pub trait Decode: Sized {
    /// Try decode self from column.
    fn decode(column: Column) -> Result<Self, DecodeError>;
}

impl Decode for Column {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        Ok(column)
    }
}

impl Decode for Value {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        Ok(column.value)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        match column.is_null() {
            true => Ok(None),
            false => column.decode().map(Some),
        }
    }
}

impl Decode for bool {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        match col.try_into_value()? {
            Value::Bool(b) => Ok(b),
            _ => Err(DecodeError::TypeMissmatch),
        }
    }
}

impl Decode for i64 {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if col.ty() != &Type::Int64 {
            return Err(DecodeError::TypeMissmatch);
        }
        match col.try_into_value()? {
            Value::String(s) => s.parse().map_err(|_| DecodeError::OutOfRange(s.into())),
            Value::Number(n) if n.fract() == 0.0 => Ok(n as i64),
            _ => Err(DecodeError::TypeMissmatch),
        }
    }
}

impl Decode for f64 {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if col.ty() != &Type::Float64 {
            return Err(DecodeError::TypeMissmatch);
        }
        match col.try_into_value()? {
            Value::Number(n) => Ok(n),
            // NaN, Infinity and -Infinity are sent as strings
            Value::String(s) => s.parse().map_err(|_| DecodeError::TypeMissmatch),
            _ => Err(DecodeError::TypeMissmatch),
        }
    }
}

impl Decode for String {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if col.ty().is_container() {
            return Err(DecodeError::TypeMissmatch);
        }
        match col.try_into_value()? {
            Value::String(s) => Ok(s),
            _ => Err(DecodeError::TypeMissmatch),
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        let Column { field, value } = col;
        let Type::Array(element) = field.ty else {
            return Err(DecodeError::TypeMissmatch);
        };
        let items = match value {
            Value::List(items) => items,
            Value::Null => return Err(DecodeError::Null),
            _ => return Err(DecodeError::TypeMissmatch),
        };
        items
            .into_iter()
            .map(|value| {
                T::decode(Column {
                    field: Field::new(field.name.clone(), (*element).clone()),
                    value,
                })
            })
            .collect()
    }
}

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns the position of the column.
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError> {
        match self < fields.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, fields: &[Field]) -> Result<usize, DecodeError> {
        fields
            .iter()
            .position(|f| f.name == self)
            .ok_or_else(|| DecodeError::ColumnNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

/// An error when decoding row value.
pub enum DecodeError {
    /// Column requested not found.
    ColumnNotFound(Cow<'static,str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Column type does not match the requested type.
    TypeMissmatch,
    /// Value is null.
    Null,
    /// Integer does not fit in the requested type.
    OutOfRange(Cow<'static,str>),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            Self::TypeMissmatch => write!(f, "data type missmatch"),
            Self::Null => write!(f, "unexpected NULL value"),
            Self::OutOfRange(v) => write!(f, "integer out of range: {v}"),
        }
    }
}

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{DecodeError, Row};
    use crate::value::{Field, Type, Value};

    fn row() -> Row {
        let fields: Arc<[Field]> = Arc::from(vec![
            Field::new("id", Type::Int64),
            Field::new("name", Type::String),
            Field::new("tags", Type::array(Type::String)),
            Field::new("score", Type::Float64),
        ]);
        Row::new(fields, vec![
            "42".into(),
            Value::Null,
            vec!["a", "b"].into(),
            "NaN".into(),
        ])
    }

    #[test]
    fn try_get_by_index_and_name() {
        let row = row();
        assert_eq!(row.try_get::<_, i64>(0usize).unwrap(), 42);
        assert_eq!(row.try_get::<_, i64>("id").unwrap(), 42);
        assert_eq!(row.try_get::<_, Option<String>>("name").unwrap(), None);
        assert_eq!(
            row.try_get::<_, Vec<String>>("tags").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(row.try_get::<_, f64>("score").unwrap().is_nan());
    }

    #[test]
    fn decode_errors() {
        let row = row();
        assert!(matches!(row.try_get::<_, String>("name"), Err(DecodeError::Null)));
        assert!(matches!(row.try_get::<_, String>(9usize), Err(DecodeError::IndexOutOfBounds(9))));
        assert!(matches!(row.try_get::<_, String>("nope"), Err(DecodeError::ColumnNotFound(_))));
        assert!(matches!(row.try_get::<_, bool>("id"), Err(DecodeError::TypeMissmatch)));
    }

    #[test]
    fn from_row_tuple() {
        let (id, name) = row().decode::<(i64, Option<String>)>().unwrap();
        assert_eq!(id, 42);
        assert!(name.is_none());
    }

    #[test]
    fn into_iter_columns() {
        let names = row().into_iter().map(|c| c.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names, ["id", "name", "tags", "score"]);
    }
}
