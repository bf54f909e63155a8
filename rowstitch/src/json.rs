//! JSON form of [`Row`].
use serde_json::{Map, Number, Value as Json};

use crate::{
    row::{DecodeError, Row},
    value::{Field, Type, Value},
};

/// A row converted into a JSON object keyed by column name.
pub type JsonRow = Map<String, Json>;

/// Largest integer a JSON number can hold without losing precision.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Options for [`Row::to_json`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonOptions {
    /// Keep `INT64` and `FLOAT64` as `{"value": ..}` instead of plain numbers.
    pub wrap_numbers: bool,
    /// Keep `STRUCT` as a list of `{"name": .., "value": ..}` instead of an object.
    pub wrap_structs: bool,
    /// Include nameless columns, keyed by their position.
    pub include_nameless: bool,
}

impl JsonOptions {
    pub fn wrap_numbers(mut self, value: bool) -> Self {
        self.wrap_numbers = value;
        self
    }

    pub fn wrap_structs(mut self, value: bool) -> Self {
        self.wrap_structs = value;
        self
    }

    pub fn include_nameless(mut self, value: bool) -> Self {
        self.include_nameless = value;
        self
    }
}

impl Row {
    /// Convert row into a JSON object.
    ///
    /// Returns [`DecodeError::OutOfRange`] if an `INT64` does not fit a JSON number
    /// and [`JsonOptions::wrap_numbers`] is not set.
    pub fn to_json(&self, options: &JsonOptions) -> Result<JsonRow, DecodeError> {
        object(self.fields(), self.values(), options)
    }
}

fn object(fields: &[Field], values: &[Value], options: &JsonOptions) -> Result<JsonRow, DecodeError> {
    let mut map = Map::with_capacity(fields.len());
    for (nth, (field, value)) in fields.iter().zip(values).enumerate() {
        let key = match (field.is_nameless(), options.include_nameless) {
            (false, _) => field.name.clone(),
            (true, true) => itoa::Buffer::new().format(nth).to_owned(),
            (true, false) => continue,
        };
        map.insert(key, convert(field, value, options)?);
    }
    Ok(map)
}

fn convert(field: &Field, value: &Value, options: &JsonOptions) -> Result<Json, DecodeError> {
    let wrap = |value: Json| match options.wrap_numbers {
        true => Json::Object(Map::from_iter([("value".to_owned(), value)])),
        false => value,
    };

    Ok(match (&field.ty, value) {
        (_, Value::Null) => Json::Null,
        (Type::Int64, Value::String(s)) if options.wrap_numbers => wrap(Json::String(s.clone())),
        (Type::Int64, Value::String(s)) => {
            let n = s.parse::<i64>().map_err(|_| DecodeError::OutOfRange(s.clone().into()))?;
            if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&n) {
                return Err(DecodeError::OutOfRange(
                    format!(
                        "{s} in column {:?}, enable `wrap_numbers` to keep it as string",
                        field.name
                    )
                    .into(),
                ));
            }
            Json::Number(n.into())
        }
        (Type::Int64 | Type::Float64, Value::Number(n)) => wrap(number(*n)),
        (Type::Float64, Value::String(s)) => wrap(Json::String(s.clone())),
        (Type::Array(element), Value::List(items)) => {
            let element = Field::new(field.name.clone(), (**element).clone());
            Json::Array(
                items
                    .iter()
                    .map(|item| convert(&element, item, options))
                    .collect::<Result<_, _>>()?,
            )
        }
        (Type::Struct(members), Value::List(items)) if options.wrap_structs => Json::Array(
            members
                .iter()
                .zip(items)
                .map(|(member, item)| -> Result<Json, DecodeError> {
                    Ok(Json::Object(Map::from_iter([
                        ("name".to_owned(), Json::String(member.name.clone())),
                        ("value".to_owned(), convert(member, item, options)?),
                    ])))
                })
                .collect::<Result<_, DecodeError>>()?,
        ),
        (Type::Struct(members), Value::List(items)) => Json::Object(object(members, items, options)?),
        (_, Value::List(_)) => return Err(DecodeError::TypeMissmatch),
        (_, Value::Bool(b)) => Json::Bool(*b),
        (_, Value::Number(n)) => number(*n),
        (_, Value::String(s)) => Json::String(s.clone()),
    })
}

fn number(n: f64) -> Json {
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use serde_json::json;

    use super::JsonOptions;
    use crate::{
        row::{DecodeError, Row},
        value::{Field, Type, Value},
    };

    fn row(values: Vec<Value>) -> Row {
        let fields: Arc<[Field]> = Arc::from(vec![
            Field::new("id", Type::Int64),
            Field::new("point", Type::Struct(vec![
                Field::new("x", Type::Float64),
                Field::new("label", Type::String),
            ])),
            Field::new("", Type::Bool),
        ]);
        Row::new(fields, values)
    }

    #[test]
    fn plain() {
        let row = row(vec!["7".into(), vec![Value::from(1.5), "p".into()].into(), true.into()]);
        let json = row.to_json(&JsonOptions::default()).unwrap();
        assert_eq!(
            serde_json::Value::Object(json),
            json!({ "id": 7, "point": { "x": 1.5, "label": "p" } })
        );
    }

    #[test]
    fn wrapped() {
        let row = row(vec!["7".into(), vec![Value::from(1.5), "p".into()].into(), true.into()]);
        let options = JsonOptions::default()
            .wrap_numbers(true)
            .wrap_structs(true)
            .include_nameless(true);
        let json = row.to_json(&options).unwrap();
        assert_eq!(
            serde_json::Value::Object(json),
            json!({
                "id": { "value": "7" },
                "point": [
                    { "name": "x", "value": { "value": 1.5 } },
                    { "name": "label", "value": "p" },
                ],
                "2": true,
            })
        );
    }

    #[test]
    fn unsafe_integer() {
        let row = row(vec!["9007199254740993".into(), Value::Null, Value::Null]);
        let err = row.to_json(&JsonOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange(_)));

        let json = row.to_json(&JsonOptions::default().wrap_numbers(true)).unwrap();
        assert_eq!(json["id"], json!({ "value": "9007199254740993" }));
    }
}
