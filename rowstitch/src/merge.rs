//! Merging of values split across fragment boundaries.
use crate::value::{Type, Value};

/// Merge the trailing value of a chunked fragment with the leading value of the next one.
///
/// - Strings of a scalar column are concatenated.
/// - Lists of an `ARRAY` or `STRUCT` column are spliced, merging the last item of `head`
///   with the first item of `tail` recursively.
/// - Anything else, including a NULL on either side, is returned unmerged as `[head, tail]`.
pub fn merge(ty: &Type, head: Value, tail: Value) -> Vec<Value> {
    match (head, tail) {
        (Value::String(mut head), Value::String(tail)) if !ty.is_container() => {
            head.push_str(&tail);
            vec![Value::String(head)]
        }
        (Value::List(mut head), Value::List(tail)) if !head.is_empty() && !tail.is_empty() => {
            let Some(element) = element_type(ty, head.len() - 1) else {
                return vec![Value::List(head), Value::List(tail)];
            };

            let mut tail = tail.into_iter();
            if let (Some(last), Some(first)) = (head.pop(), tail.next()) {
                head.extend(merge(element, last, first));
            }
            head.extend(tail);

            vec![Value::List(head)]
        }
        (head, tail) => vec![head, tail],
    }
}

/// Type of the list item at `nth`, `None` when `ty` is not a container or the
/// struct has no such field.
fn element_type(ty: &Type, nth: usize) -> Option<&Type> {
    match ty {
        Type::Array(element) => Some(element.as_ref()),
        Type::Struct(fields) => fields.get(nth).map(|f| &f.ty),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::merge;
    use crate::value::{Field, Type, Value};

    fn list(items: Vec<Value>) -> Value {
        Value::List(items)
    }

    #[test]
    fn concat_string() {
        let merged = merge(&Type::String, "ab".into(), "cd".into());
        assert_eq!(merged, vec![Value::from("abcd")]);
    }

    #[test]
    fn int64_string_concat() {
        let merged = merge(&Type::Int64, "12".into(), "34".into());
        assert_eq!(merged, vec![Value::from("1234")]);
    }

    #[test]
    fn numbers_not_merged() {
        let merged = merge(&Type::Float64, 1.5.into(), 2.5.into());
        assert_eq!(merged, vec![Value::Number(1.5), Value::Number(2.5)]);
    }

    #[test]
    fn null_head() {
        let tail = list(vec![1.0.into()]);
        let merged = merge(&Type::array(Type::Float64), Value::Null, tail.clone());
        assert_eq!(merged, vec![Value::Null, tail]);
    }

    #[test]
    fn float_array() {
        let head = list(vec![1.0.into(), 2.0.into()]);
        let tail = list(vec![3.0.into(), 4.0.into()]);
        let merged = merge(&Type::array(Type::Float64), head, tail);
        assert_eq!(
            merged,
            vec![list(vec![1.0.into(), 2.0.into(), 3.0.into(), 4.0.into()])]
        );
    }

    #[test]
    fn string_array() {
        let head = list(vec!["a".into(), "b".into()]);
        let tail = list(vec!["c".into(), "d".into()]);
        let merged = merge(&Type::array(Type::String), head, tail);
        assert_eq!(merged, vec![list(vec!["a".into(), "bc".into(), "d".into()])]);
    }

    #[test]
    fn nested_array() {
        let ty = Type::array(Type::array(Type::String));
        let head = list(vec![list(vec!["x".into()]), list(vec!["a".into(), "b".into()])]);
        let tail = list(vec![list(vec!["c".into()]), list(vec!["y".into()])]);
        let merged = merge(&ty, head, tail);
        assert_eq!(
            merged,
            vec![list(vec![
                list(vec!["x".into()]),
                list(vec!["a".into(), "bc".into()]),
                list(vec!["y".into()]),
            ])]
        );
    }

    #[test]
    fn struct_uses_field_type() {
        let ty = Type::Struct(vec![
            Field::new("n", Type::Float64),
            Field::new("s", Type::String),
        ]);
        let head = list(vec![1.0.into(), "he".into()]);
        let tail = list(vec!["llo".into()]);
        let merged = merge(&ty, head, tail);
        assert_eq!(merged, vec![list(vec![1.0.into(), "hello".into()])]);
    }

    #[test]
    fn empty_list_not_merged() {
        let head = list(vec![]);
        let tail = list(vec!["a".into()]);
        let merged = merge(&Type::array(Type::String), head.clone(), tail.clone());
        assert_eq!(merged, vec![head, tail]);
    }

    #[test]
    fn struct_out_of_fields_not_merged() {
        let ty = Type::Struct(vec![Field::new("s", Type::String)]);
        let head = list(vec!["a".into(), "b".into()]);
        let tail = list(vec!["c".into()]);
        let merged = merge(&ty, head.clone(), tail.clone());
        assert_eq!(merged, vec![head, tail]);
    }
}
