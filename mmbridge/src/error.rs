//! Error types for bridge operations.

use std::path::PathBuf;
use std::time::Duration;

use mmbridge_proto::{
    DecodeError, DispatchError, MessageKind, PayloadError, RegistrationError, SchemaViolation,
};

/// Alias for `Result<T, mmbridge::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by bridge clients and servers.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Socket or file I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A received frame was not a valid envelope.
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),

    /// An envelope could not be built.
    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    /// A reply could not be converted to its typed payload.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// An envelope could not be routed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A handler could not be registered.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The peer answered with an `EXCEPTION` message.
    #[error("peer exception: {0}")]
    Remote(String),

    /// The peer did not answer in time.
    #[error("no reply within {0:?}; is the control application running with the bridge enabled?")]
    Timeout(Duration),

    /// The peer answered with a kind the exchange does not allow.
    #[error("unexpected {0} reply")]
    UnexpectedReply(MessageKind),

    /// A configuration file could not be parsed.
    #[error("invalid config {}: {source}", path.display())]
    Config {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser error.
        source: serde_json::Error,
    },

    /// An environment override holds an unusable value.
    #[error("invalid value {value:?} for ${var}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}
