//! Control-application side: TCP listener and per-connection dispatch.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use mmbridge_proto::{
    Connected, Dispatcher, Envelope, Exception, MessageKind, PROTOCOL_VERSION, Payload, codec,
};
use tokio::net::TcpListener;

use crate::config::BridgeConfig;
use crate::transport::{StreamTransport, Transport};
use crate::{Error, Result};

/// Accepts script connections and answers their requests through a shared
/// [`Dispatcher`].
#[derive(Debug)]
pub struct Server {
    /// Bound listener.
    listener: TcpListener,
    /// Handlers, shared read-only by every session.
    dispatcher: Arc<Dispatcher<Envelope>>,
}

impl Server {
    /// Binds to `config.addr()`.
    pub async fn bind(config: &BridgeConfig, dispatcher: Dispatcher<Envelope>) -> Result<Self> {
        let listener = TcpListener::bind(config.addr()).await?;
        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, one task per connection.
    ///
    /// Session failures are logged and never stop the listener.
    pub async fn run(self) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "bridge server listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(%peer, error = %e, "set_nodelay failed");
            }
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                tracing::info!(%peer, "client connected");
                match session(StreamTransport::new(stream), &dispatcher).await {
                    Ok(()) => tracing::info!(%peer, "client disconnected"),
                    Err(e) => tracing::warn!(%peer, error = %e, "session error"),
                }
            });
        }
    }
}

/// Serves one connection until the peer disconnects.
///
/// The first message must be `NEWCONNECTION`; anything else is answered
/// with `EXCEPTION` and the session ends. Every later frame gets exactly one
/// reply: the handler's envelope, or `EXCEPTION` describing why the frame
/// could not be decoded or routed.
pub async fn session<T: Transport>(mut transport: T, dispatcher: &Dispatcher<Envelope>) -> Result<()> {
    let Some(first) = next_frame(&mut transport).await? else {
        return Ok(());
    };
    let greeting = match codec::from_slice(&first) {
        Ok(env) if env.kind() == MessageKind::NewConnection => None,
        Ok(env) => Some(format!(
            "expected {} handshake, got {}",
            MessageKind::NewConnection,
            env.kind()
        )),
        Err(e) => Some(format!("handshake: {e}")),
    };
    if let Some(message) = greeting {
        tracing::warn!(%message, "rejecting session");
        let reply = Exception::new(message).into_envelope();
        transport.send(&codec::to_vec(&reply)).await?;
        return Ok(());
    }
    let hello = Connected::new(PROTOCOL_VERSION).into_envelope();
    transport.send(&codec::to_vec(&hello)).await?;

    while let Some(frame) = next_frame(&mut transport).await? {
        let reply = respond(dispatcher, &frame);
        transport.send(&codec::to_vec(&reply)).await?;
    }
    Ok(())
}

/// Decodes and dispatches one request frame, producing its reply.
pub fn respond(dispatcher: &Dispatcher<Envelope>, frame: &[u8]) -> Envelope {
    let result = codec::from_slice(frame)
        .map_err(Error::from)
        .and_then(|request| {
            tracing::debug!(kind = %request.kind(), "dispatching request");
            dispatcher.dispatch(&request).map_err(Error::from)
        });
    match result {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "request rejected");
            Exception::new(e.to_string()).into_envelope()
        }
    }
}

/// Receives the next frame, or `None` once the peer has closed the stream
/// between frames. A stream cut off inside a frame is an error.
async fn next_frame<T: Transport>(transport: &mut T) -> Result<Option<Vec<u8>>> {
    match transport.receive().await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use mmbridge_proto::{ClassDef, Command, NewConnection};

    use super::*;
    use crate::client::Client;

    /// Echoes commands back as class definitions naming the command.
    fn dispatcher() -> Dispatcher<Envelope> {
        let mut d = Dispatcher::new();
        d.on(|cmd: Command| ClassDef::new(format!("api:{}", cmd.command)).into_envelope())
            .unwrap();
        d
    }

    #[tokio::test]
    async fn command_round_trip() {
        let (a, b) = tokio::io::duplex(4096);
        let d = dispatcher();
        let server = session(StreamTransport::new(b), &d);
        let client = async {
            let config = BridgeConfig::default();
            let mut client = Client::handshake(StreamTransport::new(a), &config).await?;
            assert_eq!(client.server_version(), PROTOCOL_VERSION);
            let reply = client.command("snap").await?;
            drop(client);
            Ok::<_, Error>(reply)
        };
        let (served, reply) = tokio::join!(server, client);
        served.unwrap();
        assert_eq!(reply.unwrap(), ClassDef::new("api:snap").into_envelope());
    }

    #[tokio::test]
    async fn unroutable_request_gets_an_exception_and_the_session_continues() {
        let (a, b) = tokio::io::duplex(4096);
        let d = dispatcher();
        let server = session(StreamTransport::new(b), &d);
        let client = async {
            let config = BridgeConfig::default();
            let mut client = Client::handshake(StreamTransport::new(a), &config).await.unwrap();
            let unroutable = client.class_def("{}").await;
            let routed = client.command("live").await;
            (unroutable, routed)
        };
        let (served, (unroutable, routed)) = tokio::join!(server, client);
        served.unwrap();
        match unroutable {
            Err(Error::Remote(message)) => assert!(message.contains("CLASSDEF"), "{message}"),
            other => panic!("expected remote error, got {other:?}"),
        }
        assert_eq!(routed.unwrap(), ClassDef::new("api:live").into_envelope());
    }

    #[test]
    fn malformed_frames_are_answered_with_exceptions() {
        let d = dispatcher();
        let cases: [(&[u8], &str); 5] = [
            (b"not json", "malformed"),
            (br#"{"msgType":"BOGUS"}"#, "unknown message kind BOGUS"),
            (br#"{"msgType":"COMMAND"}"#, "missing field `command`"),
            (
                br#"{"msgType":"COMMAND","command":"snap","command":"rm"}"#,
                "field `command` appears more than once",
            ),
            (
                br#"{"msgType":"NEWCONNECTION","extra":1}"#,
                "unexpected field `extra`",
            ),
        ];
        for (frame, needle) in cases {
            let reply = respond(&d, frame);
            assert_eq!(reply.kind(), MessageKind::Exception);
            let message = reply.get_str("message").unwrap();
            assert!(message.contains(needle), "{message}");
        }
    }

    #[tokio::test]
    async fn first_message_must_be_the_handshake() {
        let (a, b) = tokio::io::duplex(4096);
        let d = dispatcher();
        let server = session(StreamTransport::new(b), &d);
        let client = async {
            let mut raw = StreamTransport::new(a);
            raw.send(&codec::to_vec(&Command::new("snap").into_envelope()))
                .await
                .unwrap();
            let reply = codec::from_slice(&raw.receive().await.unwrap()).unwrap();
            let closed = raw.receive().await;
            (reply, closed)
        };
        let (served, (reply, closed)) = tokio::join!(server, client);
        served.unwrap();
        assert_eq!(reply.kind(), MessageKind::Exception);
        assert_eq!(closed.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn truncated_frame_is_a_session_error() {
        use tokio::io::AsyncWriteExt;

        let (a, b) = tokio::io::duplex(4096);
        let d = dispatcher();
        let server = session(StreamTransport::new(b), &d);
        let client = async {
            let mut raw = StreamTransport::new(a);
            raw.send(&codec::to_vec(&NewConnection.into_envelope()))
                .await
                .unwrap();
            raw.receive().await.unwrap();
            let mut stream = raw.into_inner();
            stream.write_all(&[0, 0, 0, 40, b'{']).await.unwrap();
        };
        let (served, ()) = tokio::join!(server, client);
        match served {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_disconnect_is_clean() {
        let (a, b) = tokio::io::duplex(64);
        drop(a);
        session(StreamTransport::new(b), &dispatcher()).await.unwrap();
    }

    #[tokio::test]
    async fn serves_tcp_clients() {
        let mut config = BridgeConfig::default();
        config.port = 0;
        let server = Server::bind(&config, dispatcher()).await.unwrap();
        config.port = server.local_addr().unwrap().port();
        let listener = tokio::spawn(server.run());

        for text in ["snap", "live"] {
            let mut client = Client::connect(&config).await.unwrap();
            let reply = client.command(text).await.unwrap();
            assert_eq!(reply, ClassDef::new(format!("api:{text}")).into_envelope());
        }

        let mut client = Client::connect(&config).await.unwrap();
        let err = client
            .request(&NewConnection.into_envelope())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));

        listener.abort();
    }
}
