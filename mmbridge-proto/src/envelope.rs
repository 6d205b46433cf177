//! Validated in-memory message.

use std::collections::BTreeMap;

use crate::error::{FieldNotPresent, SchemaViolation};
use crate::kind::MessageKind;
use crate::schema::{FieldSpec, ValueType, schema_for};
use crate::value::{Document, Malformed, Value};

/// One message: a kind plus exactly the fields its schema declares.
///
/// There is no way to obtain an `Envelope` whose fields disagree with the
/// schema; both [`Envelope::new`] and the codec validate before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Message kind.
    kind: MessageKind,
    /// Field values keyed by their schema names.
    fields: BTreeMap<&'static str, Value>,
}

impl Envelope {
    /// Builds an envelope, validating `fields` against the schema of `kind`.
    ///
    /// ```
    /// use mmbridge_proto::{Envelope, MessageKind, Value};
    ///
    /// let env = Envelope::new(MessageKind::Command, [("command", Value::from("snap"))])?;
    /// assert_eq!(env.get_str("command")?, "snap");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new<K, I>(kind: MessageKind, fields: I) -> Result<Self, SchemaViolation>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let schema = schema_for(kind);
        let mut map = BTreeMap::new();

        for (name, value) in fields {
            let name = name.as_ref();
            let spec = schema
                .field(name)
                .ok_or_else(|| SchemaViolation::UnknownField {
                    kind,
                    field: name.to_owned(),
                })?;
            validate(kind, spec, &value)?;
            if map.contains_key(spec.name) {
                return Err(SchemaViolation::DuplicateField {
                    kind,
                    field: spec.name,
                });
            }
            map.insert(spec.name, value);
        }

        if let Some(missing) = schema.fields().iter().find(|f| !map.contains_key(f.name)) {
            return Err(SchemaViolation::MissingField {
                kind,
                field: missing.name,
            });
        }

        Ok(Self { kind, fields: map })
    }

    /// Builds an envelope for a kind that carries no fields.
    pub fn empty(kind: MessageKind) -> Result<Self, SchemaViolation> {
        Self::new(kind, std::iter::empty::<(&str, Value)>())
    }

    /// Message kind.
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        schema_for(self.kind)
            .fields()
            .iter()
            .filter_map(|spec| self.fields.get(spec.name).map(|v| (spec.name, v)))
    }

    /// Consumes the envelope, returning its field map.
    pub fn into_fields(self) -> BTreeMap<&'static str, Value> {
        self.fields
    }

    /// Returns the value of `name`.
    pub fn get(&self, name: &str) -> Result<&Value, FieldNotPresent> {
        self.fields.get(name).ok_or_else(|| FieldNotPresent {
            kind: self.kind,
            field: name.to_owned(),
            expected: schema_for(self.kind).field(name).map(|f| f.ty),
        })
    }

    /// Returns the string field `name`.
    pub fn get_str(&self, name: &str) -> Result<&str, FieldNotPresent> {
        self.typed(name, ValueType::String, Value::as_str)
    }

    /// Returns the integer field `name`.
    pub fn get_i64(&self, name: &str) -> Result<i64, FieldNotPresent> {
        self.typed(name, ValueType::Integer, Value::as_i64)
    }

    /// Returns the float field `name`.
    pub fn get_f64(&self, name: &str) -> Result<f64, FieldNotPresent> {
        self.typed(name, ValueType::Float, Value::as_f64)
    }

    /// Returns the boolean field `name`.
    pub fn get_bool(&self, name: &str) -> Result<bool, FieldNotPresent> {
        self.typed(name, ValueType::Boolean, Value::as_bool)
    }

    /// Returns the document field `name`.
    pub fn get_document(&self, name: &str) -> Result<&Document, FieldNotPresent> {
        self.typed(name, ValueType::Document, Value::as_document)
    }

    /// Returns the list field `name`.
    pub fn get_list(&self, name: &str) -> Result<&[Value], FieldNotPresent> {
        self.typed(name, ValueType::List, Value::as_list)
    }

    /// Looks up `name` and projects it with `project`.
    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: ValueType,
        project: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, FieldNotPresent> {
        self.fields
            .get(name)
            .and_then(project)
            .ok_or_else(|| FieldNotPresent {
                kind: self.kind,
                field: name.to_owned(),
                expected: Some(expected),
            })
    }
}

/// Checks one supplied value against its field spec.
fn validate(kind: MessageKind, spec: &FieldSpec, value: &Value) -> Result<(), SchemaViolation> {
    let actual = value.value_type();
    if actual != spec.ty {
        return Err(SchemaViolation::TypeMismatch {
            kind,
            field: spec.name,
            expected: spec.ty,
            actual,
        });
    }
    value.check().map_err(|m| match m {
        Malformed::NonFiniteFloat => SchemaViolation::NonFiniteFloat {
            kind,
            field: spec.name,
        },
        Malformed::NestedList => SchemaViolation::NestedList {
            kind,
            field: spec.name,
        },
    })
}
