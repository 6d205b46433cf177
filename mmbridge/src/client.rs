//! Script-side client for talking to the control application's bridge.
//!
//! A session starts with a `NEWCONNECTION` handshake, after which every
//! request is answered by exactly one reply envelope.

use std::time::Duration;

use mmbridge_proto::{
    ClassDef, Command, Connected, Envelope, Exception, MessageKind, NewConnection, Payload, codec,
};
use tokio::time::timeout;

use crate::config::BridgeConfig;
use crate::transport::{TcpTransport, Transport};
use crate::{Error, Result};

/// A connected, handshaken bridge session.
#[derive(Debug)]
pub struct Client<T = TcpTransport> {
    /// The underlying transport.
    transport: T,
    /// Reply timeout for requests after the handshake.
    recv_timeout: Option<Duration>,
    /// Version the server reported during the handshake.
    server_version: String,
}

impl Client<TcpTransport> {
    /// Connects to the server named by `config` and performs the handshake.
    ///
    /// Connecting and the handshake reply share `config.connect_timeout()`.
    pub async fn connect(config: &BridgeConfig) -> Result<Self> {
        let limit = config.connect_timeout();
        let transport = timeout(limit, TcpTransport::connect(config.addr()))
            .await
            .map_err(|_| Error::Timeout(limit))??;
        tracing::debug!(addr = %config.addr(), "connected");
        Self::handshake(transport, config).await
    }
}

impl<T: Transport> Client<T> {
    /// Performs the handshake over an already-connected transport.
    ///
    /// A server version different from `config.expected_version` is logged
    /// as a warning; the session continues.
    pub async fn handshake(mut transport: T, config: &BridgeConfig) -> Result<Self> {
        let hello = NewConnection.into_envelope();
        transport.send(&codec::to_vec(&hello)).await?;
        let reply = receive(&mut transport, Some(config.connect_timeout())).await?;
        let Connected { version, .. } = expect::<Connected>(&reply)?;

        if version != config.expected_version {
            tracing::warn!(
                server = %version,
                expected = %config.expected_version,
                "bridge version mismatch between server and client"
            );
        }
        tracing::info!(server_version = %version, "bridge session established");

        Ok(Self {
            transport,
            recv_timeout: config.recv_timeout(),
            server_version: version,
        })
    }

    /// Version the server reported during the handshake.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Sends `request` and returns the reply.
    ///
    /// An `EXCEPTION` reply becomes [`Error::Remote`].
    pub async fn request(&mut self, request: &Envelope) -> Result<Envelope> {
        tracing::debug!(kind = %request.kind(), "sending request");
        self.transport.send(&codec::to_vec(request)).await?;
        let reply = receive(&mut self.transport, self.recv_timeout).await?;
        if reply.kind() == MessageKind::Exception {
            let Exception { message, .. } = Exception::from_envelope(&reply)?;
            return Err(Error::Remote(message));
        }
        Ok(reply)
    }

    /// Sends a `COMMAND` message.
    pub async fn command(&mut self, command: impl Into<String>) -> Result<Envelope> {
        self.request(&Command::new(command).into_envelope()).await
    }

    /// Sends a `CLASSDEF` message.
    pub async fn class_def(&mut self, api: impl Into<String>) -> Result<Envelope> {
        self.request(&ClassDef::new(api).into_envelope()).await
    }

    /// Ends the session, returning the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// Receives and decodes one envelope, optionally bounded by `limit`.
async fn receive<T: Transport>(transport: &mut T, limit: Option<Duration>) -> Result<Envelope> {
    let bytes = match limit {
        Some(limit) => timeout(limit, transport.receive())
            .await
            .map_err(|_| Error::Timeout(limit))??,
        None => transport.receive().await?,
    };
    Ok(codec::from_slice(&bytes)?)
}

/// Converts `reply` into `P`, mapping `EXCEPTION` to [`Error::Remote`] and
/// any other kind to [`Error::UnexpectedReply`].
fn expect<P: Payload>(reply: &Envelope) -> Result<P> {
    match reply.kind() {
        kind if kind == P::KIND => Ok(P::from_envelope(reply)?),
        MessageKind::Exception => Err(Error::Remote(Exception::from_envelope(reply)?.message)),
        other => Err(Error::UnexpectedReply(other)),
    }
}
