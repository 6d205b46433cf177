//! Strongly-typed views of each message kind.

use crate::envelope::Envelope;
use crate::error::PayloadError;
use crate::kind::MessageKind;
use crate::value::Value;

/// A typed message that maps one-to-one onto an [`Envelope`] of [`Self::KIND`].
pub trait Payload: Sized {
    /// Kind of the envelopes this type converts to and from.
    const KIND: MessageKind;

    /// Converts into a validated envelope.
    fn into_envelope(self) -> Envelope;

    /// Reconstructs the payload from an envelope of [`Self::KIND`].
    fn from_envelope(env: &Envelope) -> Result<Self, PayloadError>;
}

/// Fails unless `env` is of kind `expected`.
fn expect_kind(env: &Envelope, expected: MessageKind) -> Result<(), PayloadError> {
    let actual = env.kind();
    if actual == expected {
        Ok(())
    } else {
        Err(PayloadError::WrongKind { expected, actual })
    }
}

/// Builds an envelope from fields that satisfy the schema by construction.
fn build<const N: usize>(kind: MessageKind, fields: [(&'static str, Value); N]) -> Envelope {
    match Envelope::new(kind, fields) {
        Ok(env) => env,
        Err(e) => unreachable!("{kind} payload out of sync with its schema: {e}"),
    }
}

/// Run a command on the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Command {
    /// Command text.
    pub command: String,
}

impl Command {
    /// Creates a command message.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Declare a class interface.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ClassDef {
    /// Serialized interface description.
    pub api: String,
}

impl ClassDef {
    /// Creates a class definition message.
    pub fn new(api: impl Into<String>) -> Self {
        Self { api: api.into() }
    }
}

/// Session-opening handshake request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::exhaustive_structs)]
pub struct NewConnection;

/// Handshake reply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Connected {
    /// Protocol version of the server.
    pub version: String,
}

impl Connected {
    /// Creates a handshake reply.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

/// Failure reply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Exception {
    /// Human-readable description of the failure.
    pub message: String,
}

impl Exception {
    /// Creates a failure reply.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Implements [`Payload`] for a struct with a single string field.
macro_rules! string_payload {
    ($ty:ident, $kind:ident, $field:ident) => {
        impl Payload for $ty {
            const KIND: MessageKind = MessageKind::$kind;

            fn into_envelope(self) -> Envelope {
                build(
                    Self::KIND,
                    [(stringify!($field), Value::String(self.$field))],
                )
            }

            fn from_envelope(env: &Envelope) -> Result<Self, PayloadError> {
                expect_kind(env, Self::KIND)?;
                Ok(Self {
                    $field: env.get_str(stringify!($field))?.to_owned(),
                })
            }
        }
    };
}

string_payload!(Command, Command, command);
string_payload!(ClassDef, ClassDef, api);
string_payload!(Connected, Connected, version);
string_payload!(Exception, Exception, message);

impl Payload for NewConnection {
    const KIND: MessageKind = MessageKind::NewConnection;

    fn into_envelope(self) -> Envelope {
        build(Self::KIND, [])
    }

    fn from_envelope(env: &Envelope) -> Result<Self, PayloadError> {
        expect_kind(env, Self::KIND)?;
        Ok(Self)
    }
}

/// Any message, reconstructed from its envelope by kind alone.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum Message {
    /// See [`Command`].
    Command(Command),
    /// See [`ClassDef`].
    ClassDef(ClassDef),
    /// See [`NewConnection`].
    NewConnection(NewConnection),
    /// See [`Connected`].
    Connected(Connected),
    /// See [`Exception`].
    Exception(Exception),
}

impl Message {
    /// Reconstructs the typed message matching the envelope's kind.
    pub fn from_envelope(env: &Envelope) -> Result<Self, PayloadError> {
        Ok(match env.kind() {
            MessageKind::Command => Self::Command(Command::from_envelope(env)?),
            MessageKind::ClassDef => Self::ClassDef(ClassDef::from_envelope(env)?),
            MessageKind::NewConnection => Self::NewConnection(NewConnection::from_envelope(env)?),
            MessageKind::Connected => Self::Connected(Connected::from_envelope(env)?),
            MessageKind::Exception => Self::Exception(Exception::from_envelope(env)?),
        })
    }

    /// Kind of this message.
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Command(_) => MessageKind::Command,
            Self::ClassDef(_) => MessageKind::ClassDef,
            Self::NewConnection(_) => MessageKind::NewConnection,
            Self::Connected(_) => MessageKind::Connected,
            Self::Exception(_) => MessageKind::Exception,
        }
    }

    /// Converts into a validated envelope.
    pub fn into_envelope(self) -> Envelope {
        match self {
            Self::Command(m) => m.into_envelope(),
            Self::ClassDef(m) => m.into_envelope(),
            Self::NewConnection(m) => m.into_envelope(),
            Self::Connected(m) => m.into_envelope(),
            Self::Exception(m) => m.into_envelope(),
        }
    }
}
