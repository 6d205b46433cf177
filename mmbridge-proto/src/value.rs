//! Field values and their JSON representation.

use std::collections::BTreeMap;

use serde_json::Number;

use crate::schema::ValueType;

/// Nested string-keyed document.
pub type Document = BTreeMap<String, Value>;

/// A field value.
///
/// Lists hold primitives only; [`Value::from_json`] refuses anything else and
/// envelope construction rejects hand-built lists that violate it.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// Nested document.
    Document(Document),
    /// List of primitives.
    List(Vec<Value>),
}

impl Value {
    /// Runtime type of this value.
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Integer(_) => ValueType::Integer,
            Self::Float(_) => ValueType::Float,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Document(_) => ValueType::Document,
            Self::List(_) => ValueType::List,
        }
    }

    /// Whether this is a string, integer, float or boolean.
    pub const fn is_primitive(&self) -> bool {
        !matches!(self, Self::Document(_) | Self::List(_))
    }

    /// Borrows the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float, if this is one.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrows the nested document, if this is one.
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Borrows the list, if this is one.
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Checks the structural rules the wire format relies on.
    pub(crate) fn check(&self) -> Result<(), Malformed> {
        match self {
            Self::Float(f) if !f.is_finite() => Err(Malformed::NonFiniteFloat),
            Self::Document(doc) => doc.values().try_for_each(Self::check),
            Self::List(items) => items.iter().try_for_each(|item| {
                if item.is_primitive() {
                    item.check()
                } else {
                    Err(Malformed::NestedList)
                }
            }),
            _ => Ok(()),
        }
    }

    /// Converts to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;

        match self {
            Self::String(s) => J::String(s.clone()),
            Self::Integer(i) => J::Number((*i).into()),
            // Non-finite floats never pass envelope validation.
            Self::Float(f) => Number::from_f64(*f).map_or(J::Null, J::Number),
            Self::Boolean(b) => J::Bool(*b),
            Self::Document(doc) => J::Object(
                doc.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::List(items) => J::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Converts from JSON, or `None` when the JSON has no counterpart:
    /// `null`, integers outside `i64`, or lists containing lists or objects.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        use serde_json::Value as J;

        match json {
            J::Null => None,
            J::Bool(b) => Some(Self::Boolean(*b)),
            J::Number(n) => number(n),
            J::String(s) => Some(Self::String(s.clone())),
            J::Array(items) => items
                .iter()
                .map(|item| Self::from_json(item).filter(Self::is_primitive))
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            J::Object(map) => map
                .iter()
                .map(|(k, v)| Self::from_json(v).map(|v| (k.clone(), v)))
                .collect::<Option<Document>>()
                .map(Self::Document),
        }
    }

    /// Converts JSON to a value of the declared type.
    ///
    /// A JSON integer is accepted for a [`ValueType::Float`] field; a JSON
    /// float is never accepted for a [`ValueType::Integer`] field.
    pub fn from_json_as(json: &serde_json::Value, ty: ValueType) -> Option<Self> {
        use serde_json::Value as J;

        match (ty, json) {
            (ValueType::Float, J::Number(n)) => n.as_f64().map(Self::Float),
            _ => Self::from_json(json).filter(|v| v.value_type() == ty),
        }
    }
}

/// Maps a JSON number onto an integer or float value.
fn number(n: &Number) -> Option<Value> {
    if n.is_f64() {
        n.as_f64().map(Value::Float)
    } else {
        n.as_i64().map(Value::Integer)
    }
}

/// Diagnostic name of a JSON value's type, matching [`ValueType::name`]
/// where the two overlap.
pub fn json_type_name(json: &serde_json::Value) -> &'static str {
    use serde_json::Value as J;

    match json {
        J::Null => "null",
        J::Bool(_) => "boolean",
        J::Number(n) if n.is_f64() => "float",
        J::Number(_) => "integer",
        J::String(_) => "string",
        J::Array(_) => "list",
        J::Object(_) => "document",
    }
}

/// Structural problem found by [`Value::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Malformed {
    /// NaN or infinity somewhere in the value.
    NonFiniteFloat,
    /// A list element is a document or list.
    NestedList,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Self::Document(d)
    }
}

impl From<Vec<Self>> for Value {
    fn from(l: Vec<Self>) -> Self {
        Self::List(l)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_numbers_keep_their_shape() {
        assert_eq!(Value::from_json(&json!(3)), Some(Value::Integer(3)));
        assert_eq!(Value::from_json(&json!(-3)), Some(Value::Integer(-3)));
        assert_eq!(Value::from_json(&json!(3.0)), Some(Value::Float(3.0)));
        assert_eq!(Value::from_json(&json!(u64::MAX)), None);
    }

    #[test]
    fn float_fields_accept_integers_but_not_the_reverse() {
        assert_eq!(
            Value::from_json_as(&json!(10), ValueType::Float),
            Some(Value::Float(10.0))
        );
        assert_eq!(Value::from_json_as(&json!(10.5), ValueType::Integer), None);
        assert_eq!(Value::from_json_as(&json!("10"), ValueType::Integer), None);
    }

    #[test]
    fn lists_hold_primitives_only() {
        assert_eq!(
            Value::from_json(&json!(["a", 1, true])),
            Some(Value::List(vec!["a".into(), 1.into(), true.into()]))
        );
        assert_eq!(Value::from_json(&json!([[1]])), None);
        assert_eq!(Value::from_json(&json!([{"a": 1}])), None);
        assert_eq!(Value::from_json(&json!([null])), None);
    }

    #[test]
    fn channel_settings_document() {
        let raw = json!({
            "group": "Channel",
            "config": "DAPI",
            "color": [0, 0, 255],
            "exposure": 12.5,
            "use": true,
        });
        let value = Value::from_json(&raw).unwrap();
        let doc = value.as_document().unwrap();
        assert_eq!(doc["exposure"], Value::Float(12.5));
        assert_eq!(doc["color"].as_list().map(<[Value]>::len), Some(3));
        assert_eq!(value.to_json(), raw);
    }

    #[test]
    fn check_rejects_non_finite_and_nested_lists() {
        assert_eq!(Value::Float(f64::NAN).check(), Err(Malformed::NonFiniteFloat));
        let mut doc = Document::new();
        doc.insert("gain".into(), Value::Float(f64::INFINITY));
        assert_eq!(Value::Document(doc).check(), Err(Malformed::NonFiniteFloat));
        assert_eq!(
            Value::List(vec![Value::List(vec![])]).check(),
            Err(Malformed::NestedList)
        );
        assert_eq!(Value::List(vec![1.5.into(), "x".into()]).check(), Ok(()));
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(1)), "integer");
        assert_eq!(json_type_name(&json!(1.5)), "float");
        assert_eq!(json_type_name(&json!({})), "document");
    }
}
