//! Socket bridge between a device-control application and external scripts.
//!
//! The control application runs a [`Server`] that routes each request to a
//! handler registered on a [`Dispatcher`]; scripts talk to it through a
//! [`Client`]. Both ends exchange [`Envelope`]s as defined by
//! [`mmbridge_proto`].
//!
//! # Quick start
//!
//! ```no_run
//! use mmbridge::{BridgeConfig, Client};
//!
//! # async fn demo() -> mmbridge::Result<()> {
//! let config = BridgeConfig::discover(None)?;
//! let mut client = Client::connect(&config).await?;
//! let reply = client.command("snap").await?;
//! println!("{}", reply.kind());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod server;
mod transport;

pub use client::Client;
pub use config::{BridgeConfig, ENV_PORT};
pub use error::{Error, Result};
pub use mmbridge_proto::{
    ClassDef, Command, Connected, Dispatcher, Envelope, Exception, Message, MessageKind,
    NewConnection, Payload, Value,
};
pub use server::{Server, respond, session};
pub use transport::{StreamTransport, TcpTransport, Transport};
