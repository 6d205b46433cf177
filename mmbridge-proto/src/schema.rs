//! Field schema registry: the static map from each kind to its fields.
//!
//! Schemas are plain `static` data. The tag lookup table is built on first
//! use and is read-only afterwards, so every function here is safe to call
//! from any thread without locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::kind::MessageKind;

/// Type a field value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::exhaustive_enums)]
pub enum ValueType {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Finite 64-bit float.
    Float,
    /// Boolean.
    Boolean,
    /// String-keyed nested document.
    Document,
    /// List of primitives (string, integer, float, boolean).
    List,
}

impl ValueType {
    /// Lower-case name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Document => "document",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One named, typed field of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct FieldSpec {
    /// Wire name of the field.
    pub name: &'static str,
    /// Declared value type.
    pub ty: ValueType,
}

impl FieldSpec {
    /// Declares a field.
    const fn new(name: &'static str, ty: ValueType) -> Self {
        Self { name, ty }
    }
}

/// Ordered field list legal for one [`MessageKind`].
#[derive(Debug, PartialEq, Eq)]
pub struct FieldSchema {
    /// Kind this schema belongs to.
    kind: MessageKind,
    /// Fields in wire order.
    fields: &'static [FieldSpec],
}

impl FieldSchema {
    /// Kind this schema describes.
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Fields in declared (wire) order.
    pub const fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Number of declared fields.
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the kind carries no fields.
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

static COMMAND: FieldSchema = FieldSchema {
    kind: MessageKind::Command,
    fields: &[FieldSpec::new("command", ValueType::String)],
};

static CLASSDEF: FieldSchema = FieldSchema {
    kind: MessageKind::ClassDef,
    fields: &[FieldSpec::new("api", ValueType::String)],
};

static NEWCONNECTION: FieldSchema = FieldSchema {
    kind: MessageKind::NewConnection,
    fields: &[],
};

static CONNECTED: FieldSchema = FieldSchema {
    kind: MessageKind::Connected,
    fields: &[FieldSpec::new("version", ValueType::String)],
};

static EXCEPTION: FieldSchema = FieldSchema {
    kind: MessageKind::Exception,
    fields: &[FieldSpec::new("message", ValueType::String)],
};

/// Returns the schema registered for `kind`.
pub fn schema_for(kind: MessageKind) -> &'static FieldSchema {
    match kind {
        MessageKind::Command => &COMMAND,
        MessageKind::ClassDef => &CLASSDEF,
        MessageKind::NewConnection => &NEWCONNECTION,
        MessageKind::Connected => &CONNECTED,
        MessageKind::Exception => &EXCEPTION,
    }
}

/// Resolves a wire tag to its kind, or `None` if the tag is not in the
/// closed set.
pub fn kind_for(tag: &str) -> Option<MessageKind> {
    static TAGS: OnceLock<HashMap<&'static str, MessageKind>> = OnceLock::new();
    TAGS.get_or_init(|| MessageKind::ALL.iter().map(|k| (k.tag(), *k)).collect())
        .get(tag)
        .copied()
}
