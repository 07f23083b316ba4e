use bytes::Bytes;

use crate::error::ErrorReply;

/// A type-erased command result, used for pipeline elements.
///
/// `Unit` marks commands whose reply carries no information beyond success
/// (MSET, SETEX, ...); it is distinct from `Null`, which reports a missing
/// key or value. `Error` carries a per-command server error inside a
/// pipeline result list without failing the pipeline as a whole.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Unit,
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Simple(String),
    Bulk(Bytes),
    Array(Vec<Value>),
    Error(ErrorReply),
}

impl Value {
    /// Whether this element is a per-command server error.
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bulk(value)
    }
}

impl From<Option<Bytes>> for Value {
    fn from(value: Option<Bytes>) -> Self {
        match value {
            Some(data) => Value::Bulk(data),
            None => Value::Null,
        }
    }
}

impl From<Vec<Option<Bytes>>> for Value {
    fn from(values: Vec<Option<Bytes>>) -> Self {
        Value::Array(values.into_iter().map(Value::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_and_null_are_distinct() {
        assert_ne!(Value::from(()), Value::Null);
        assert_eq!(Value::from(()), Value::Unit);
    }

    #[test]
    fn optional_bulk_conversion() {
        assert_eq!(
            Value::from(Some(Bytes::from("hello"))),
            Value::Bulk(Bytes::from("hello"))
        );
        assert_eq!(Value::from(None::<Bytes>), Value::Null);
    }

    #[test]
    fn bulk_list_conversion() {
        let values = vec![Some(Bytes::from("v1")), None, Some(Bytes::from("v2"))];

        assert_eq!(
            Value::from(values),
            Value::Array(vec![
                Value::Bulk(Bytes::from("v1")),
                Value::Null,
                Value::Bulk(Bytes::from("v2")),
            ])
        );
    }
}
