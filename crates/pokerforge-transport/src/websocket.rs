//! `tokio-tungstenite` implementation of [`Transport`] and [`Connection`].

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Frame, Transport, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type Socket = WebSocketStream<TcpStream>;

/// TCP listener that upgrades every accepted stream to a WebSocket.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds the listener. Port 0 picks a free port; see
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::Listen)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (tcp, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Listen)?;

        let socket = tokio_tungstenite::accept_async(tcp).await.map_err(|e| {
            TransportError::Upgrade {
                peer,
                reason: e.to_string(),
            }
        })?;

        let id =
            ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(conn_id = %id, %peer, "WebSocket upgraded");

        let (writer, reader) = socket.split();
        Ok(WebSocketConnection {
            id,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }
}

/// One upgraded WebSocket.
///
/// The write half and the read half sit behind separate locks.
pub struct WebSocketConnection {
    id: ConnectionId,
    writer: Mutex<SplitSink<Socket, Message>>,
    reader: Mutex<SplitStream<Socket>>,
}

impl WebSocketConnection {
    async fn write(&self, msg: Message) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::Write(as_io(e)))
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.write(Message::Binary(data.to_vec().into())).await
    }

    async fn recv(&self) -> Result<Option<Frame>, TransportError> {
        let mut reader = self.reader.lock().await;
        while let Some(msg) = reader.next().await {
            match msg.map_err(|e| TransportError::Read(as_io(e)))? {
                Message::Binary(bytes) => return Ok(Some(Frame::Data(bytes.into()))),
                Message::Text(text) => {
                    return Ok(Some(Frame::Data(text.as_str().as_bytes().to_vec())));
                }
                Message::Pong(_) => return Ok(Some(Frame::Pong)),
                Message::Close(_) => return Ok(None),
                // tungstenite queues the pong for inbound pings itself.
                Message::Ping(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn ping(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.write(Message::Ping(payload.to_vec().into())).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::Write(as_io(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

fn as_io(err: tungstenite::Error) -> io::Error {
    match err {
        tungstenite::Error::Io(e) => e,
        other => io::Error::other(other),
    }
}
