use serde::{
    Deserialize,
    Serialize,
};

use crate::core::hash::HashMap;

/// Type alias for integers on the wire, such as message type tags.
pub type Integer = u64;

/// An ordered mapping from string keys to JSON-compatible values.
pub type Dictionary = HashMap<String, Value>;

/// A list of JSON-compatible values.
pub type List = Vec<Value>;

/// A JSON-compatible value, as carried in message details, options, and payloads.
///
/// The broker never interprets payload values. They are decoded for validation and re-emitted
/// verbatim on fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(List),
    Dictionary(Dictionary),
}

impl Value {
    /// The value as a bool, if it is one.
    pub fn bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a string, if it is one.
    pub fn string(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// The value as a dictionary, if it is one.
    pub fn dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<List> for Value {
    fn from(value: List) -> Self {
        Self::List(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Self::Dictionary(value)
    }
}

#[cfg(test)]
mod types_test {
    use crate::core::types::{
        Dictionary,
        Value,
    };

    #[test]
    fn deserializes_json_scalars() {
        assert_matches::assert_matches!(serde_json::from_str::<Value>("null"), Ok(Value::Null));
        assert_matches::assert_matches!(
            serde_json::from_str::<Value>("true"),
            Ok(Value::Bool(true))
        );
        assert_matches::assert_matches!(
            serde_json::from_str::<Value>("-17"),
            Ok(Value::Integer(-17))
        );
        assert_matches::assert_matches!(serde_json::from_str::<Value>("2.5"), Ok(Value::Float(f)) => {
            assert_eq!(f, 2.5);
        });
    }

    #[test]
    fn equality_is_structural() {
        let a = Dictionary::from_iter([
            ("x".to_owned(), Value::Integer(1)),
            ("y".to_owned(), Value::Integer(2)),
        ]);
        let b = Dictionary::from_iter([
            ("y".to_owned(), Value::Integer(2)),
            ("x".to_owned(), Value::Integer(1)),
        ]);
        assert_eq!(a, b);
    }
}
