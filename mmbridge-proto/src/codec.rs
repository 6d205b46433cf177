//! Envelope ⇄ wire document conversion.
//!
//! A wire document is a JSON object whose [`MSG_TYPE`] key holds the kind
//! tag and whose remaining keys are exactly the fields of that kind's
//! schema, emitted in schema order.

use crate::envelope::Envelope;
use crate::error::DecodeError;
use crate::kind::MSG_TYPE;
use crate::schema::{kind_for, schema_for};
use crate::strict::Parsed;
use crate::value::{Value, json_type_name};

/// Serialized, transport-ready form of an [`Envelope`].
pub type WireDocument = serde_json::Map<String, serde_json::Value>;

/// Encodes an envelope. Infallible: the envelope is already schema-valid.
pub fn encode(env: &Envelope) -> WireDocument {
    let mut doc = WireDocument::new();
    doc.insert(MSG_TYPE.to_owned(), env.kind().tag().into());
    for (name, value) in env.fields() {
        doc.insert(name.to_owned(), value.to_json());
    }
    doc
}

/// Decodes a wire document into a validated envelope.
///
/// Fails on the first problem found: an unknown tag, then each schema field
/// in order (missing or mistyped), then any undeclared key.
pub fn decode(doc: &WireDocument) -> Result<Envelope, DecodeError> {
    let kind = match doc.get(MSG_TYPE) {
        Some(serde_json::Value::String(tag)) => {
            kind_for(tag).ok_or_else(|| DecodeError::UnknownKind(Some(tag.clone())))?
        }
        Some(other) => return Err(DecodeError::UnknownKind(Some(other.to_string()))),
        None => return Err(DecodeError::UnknownKind(None)),
    };
    let schema = schema_for(kind);

    let mut fields = Vec::with_capacity(schema.len());
    for spec in schema.fields() {
        let raw = doc
            .get(spec.name)
            .ok_or(DecodeError::MissingField(spec.name))?;
        let value =
            Value::from_json_as(raw, spec.ty).ok_or_else(|| DecodeError::TypeMismatch {
                field: spec.name,
                expected: spec.ty,
                actual: json_type_name(raw),
            })?;
        fields.push((spec.name, value));
    }

    if let Some(extra) = doc
        .keys()
        .find(|k| k.as_str() != MSG_TYPE && schema.field(k).is_none())
    {
        return Err(DecodeError::UnexpectedField(extra.clone()));
    }

    Ok(Envelope::new(kind, fields)?)
}

/// Encodes an envelope to JSON bytes.
pub fn to_vec(env: &Envelope) -> Vec<u8> {
    serde_json::Value::Object(encode(env))
        .to_string()
        .into_bytes()
}

/// Decodes JSON bytes into a validated envelope.
///
/// A key repeated at any depth is an error.
pub fn from_slice(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    decode(&parse(bytes)?)
}

/// Parses JSON bytes into a wire document without interpreting it.
pub fn parse(bytes: &[u8]) -> Result<WireDocument, DecodeError> {
    let entries = match serde_json::from_slice(bytes).map_err(DecodeError::Malformed)? {
        Parsed::Entries(entries) => entries,
        Parsed::Other(name) => return Err(DecodeError::NotAnObject(name)),
    };
    let mut doc = WireDocument::new();
    for (key, value) in entries {
        if doc.contains_key(&key) {
            return Err(DecodeError::DuplicateField(key));
        }
        doc.insert(key, value);
    }
    Ok(doc)
}
