//! Error types for envelope construction, decoding and dispatch.

use crate::kind::MessageKind;
use crate::schema::ValueType;

/// An envelope was built with fields that do not match its kind's schema.
///
/// Always a local programming error on the sending side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaViolation {
    /// A field name the schema does not declare.
    #[error("{kind} has no field `{field}`")]
    UnknownField {
        /// Kind being constructed.
        kind: MessageKind,
        /// Offending field name.
        field: String,
    },

    /// A declared field was not supplied.
    #[error("{kind} is missing field `{field}`")]
    MissingField {
        /// Kind being constructed.
        kind: MessageKind,
        /// Missing field name.
        field: &'static str,
    },

    /// The same field was supplied more than once.
    #[error("{kind} field `{field}` supplied twice")]
    DuplicateField {
        /// Kind being constructed.
        kind: MessageKind,
        /// Repeated field name.
        field: &'static str,
    },

    /// A value's type disagrees with the schema.
    #[error("{kind} field `{field}`: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Kind being constructed.
        kind: MessageKind,
        /// Field name.
        field: &'static str,
        /// Declared type.
        expected: ValueType,
        /// Supplied type.
        actual: ValueType,
    },

    /// A float somewhere in the value is NaN or infinite.
    #[error("{kind} field `{field}` contains a non-finite float")]
    NonFiniteFloat {
        /// Kind being constructed.
        kind: MessageKind,
        /// Field name.
        field: &'static str,
    },

    /// A list contains a document or another list.
    #[error("{kind} field `{field}` contains a non-primitive list element")]
    NestedList {
        /// Kind being constructed.
        kind: MessageKind,
        /// Field name.
        field: &'static str,
    },
}

/// A wire document could not be turned into an envelope.
///
/// Every variant is terminal for the message: nothing is defaulted or
/// partially filled in.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The payload is not valid JSON.
    #[error("malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("payload is a {0}, expected a document")]
    NotAnObject(&'static str),

    /// The kind tag is absent, not a string, or not in the closed set.
    #[error("unknown message kind {}", .0.as_deref().map_or("<missing>", |t| t))]
    UnknownKind(Option<String>),

    /// A declared field is absent. Usually an older peer.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A declared field has the wrong type.
    #[error("field `{field}`: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field name.
        field: &'static str,
        /// Declared type.
        expected: ValueType,
        /// Type found on the wire.
        actual: &'static str,
    },

    /// A key appears twice in the same object.
    #[error("field `{0}` appears more than once")]
    DuplicateField(String),

    /// A key the schema does not declare. Usually a newer peer.
    #[error("unexpected field `{0}`")]
    UnexpectedField(String),

    /// The decoded fields failed envelope validation.
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
}

/// A field was requested that the envelope does not hold with that type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "{kind} has no {}field `{field}`",
    .expected.map_or(String::new(), |ty| format!("{ty} "))
)]
#[non_exhaustive]
pub struct FieldNotPresent {
    /// Kind of the envelope.
    pub kind: MessageKind,
    /// Requested field name.
    pub field: String,
    /// Requested type; `None` when the kind declares no such field.
    pub expected: Option<ValueType>,
}

/// An envelope could not be converted to a typed payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PayloadError {
    /// The envelope is of another kind.
    #[error("expected {expected}, got {actual}")]
    WrongKind {
        /// Kind the payload type represents.
        expected: MessageKind,
        /// Kind of the envelope.
        actual: MessageKind,
    },

    /// A field the payload needs is absent.
    #[error(transparent)]
    Field(#[from] FieldNotPresent),
}

/// A handler could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RegistrationError {
    /// A handler is already bound to this kind.
    #[error("a handler for {0} is already registered")]
    DuplicateHandler(MessageKind),
}

/// An envelope could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// No handler is bound to the envelope's kind.
    #[error("no handler registered for {0}")]
    NoHandler(MessageKind),

    /// The envelope could not be converted to the handler's payload type.
    #[error(transparent)]
    Payload(#[from] PayloadError),
}
