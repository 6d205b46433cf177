//! Byte transport between the two bridge peers.
//!
//! The protocol layer only needs "send these bytes" and "receive the next
//! message's bytes"; [`StreamTransport`] provides both over any tokio byte
//! stream using the length-prefixed framing from [`mmbridge_proto::frame`].

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Discrete-message byte transport.
pub trait Transport {
    /// Sends one message.
    fn send(&mut self, payload: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Receives the next message.
    ///
    /// Returns [`io::ErrorKind::UnexpectedEof`] when the peer closed the
    /// connection between messages.
    fn receive(&mut self) -> impl Future<Output = io::Result<Vec<u8>>> + Send;
}

/// Length-prefixed framing over a buffered byte stream.
#[derive(Debug)]
pub struct StreamTransport<S> {
    /// The underlying stream.
    stream: BufStream<S>,
}

/// [`StreamTransport`] over TCP.
pub type TcpTransport = StreamTransport<TcpStream>;

impl<S: AsyncRead + AsyncWrite> StreamTransport<S> {
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
        }
    }

    /// Returns the underlying stream, discarding buffered data.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }
}

impl TcpTransport {
    /// Connects to `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.get_ref().peer_addr()
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        mmbridge_proto::send(&mut self.stream, payload).await?;
        self.stream.flush().await
    }

    async fn receive(&mut self) -> io::Result<Vec<u8>> {
        mmbridge_proto::recv(&mut self.stream).await
    }
}
