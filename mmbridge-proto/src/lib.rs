//! Wire protocol for mmbridge control-application ↔ script communication.
//!
//! Every message is an [`Envelope`]: a [`MessageKind`] plus exactly the
//! fields that kind's schema declares. On the wire an envelope is a JSON
//! object tagged with [`MSG_TYPE`], framed with a 4-byte big-endian length
//! prefix, suitable for any reliable byte stream (TCP, Unix socket).
//!
//! ```
//! use mmbridge_proto::{Command, Dispatcher, Message, Payload, codec};
//!
//! let bytes = codec::to_vec(&Command::new("snap").into_envelope());
//! assert_eq!(bytes, br#"{"msgType":"COMMAND","command":"snap"}"#);
//!
//! let env = codec::from_slice(&bytes)?;
//! assert_eq!(Message::from_envelope(&env)?, Message::Command(Command::new("snap")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
mod dispatch;
mod envelope;
mod error;
pub mod frame;
mod kind;
mod payload;
mod schema;
mod strict;
mod value;

pub use codec::{WireDocument, decode, encode, parse};
pub use dispatch::Dispatcher;
pub use envelope::Envelope;
pub use error::{
    DecodeError, DispatchError, FieldNotPresent, PayloadError, RegistrationError, SchemaViolation,
};
pub use frame::{MAX_FRAME, read_frame, recv, send, write_frame};
pub use kind::{MSG_TYPE, MessageKind};
pub use payload::{ClassDef, Command, Connected, Exception, Message, NewConnection, Payload};
pub use schema::{FieldSchema, FieldSpec, ValueType, kind_for, schema_for};
pub use value::{Document, Value, json_type_name};

/// Default TCP port of the control application's bridge server.
pub const DEFAULT_PORT: u16 = 4827;

/// Protocol version reported in the [`Connected`] handshake reply.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
