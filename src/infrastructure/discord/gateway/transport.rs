use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::codec::ZlibStream;
use super::constants::CONNECTION_TIMEOUT;
use super::error::{GatewayError, GatewayResult};
use super::payloads::{GatewayMessage, GatewayPayload};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// What the socket produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Frame(GatewayMessage),
    /// A frame arrived but was not a gateway payload. The socket stays up.
    Malformed(String),
    /// The peer closed; `None` when no close code was given.
    Closed(Option<u16>),
}

/// A frame-level gateway socket.
///
/// `receive` must be cancel-safe: the connection polls it inside
/// `tokio::select!` next to the heartbeat timer and the command channel.
#[async_trait]
pub trait GatewayTransport: Send {
    async fn connect(&mut self, url: &str) -> GatewayResult<()>;
    async fn send(&mut self, payload: &GatewayPayload) -> GatewayResult<()>;
    async fn receive(&mut self) -> GatewayResult<TransportEvent>;
    /// Sends a close frame with `code` and drops the socket.
    async fn close(&mut self, code: u16) -> GatewayResult<()>;
    fn is_connected(&self) -> bool;
}

/// Creates one transport per socket.
pub type TransportFactory = Box<dyn Fn() -> Box<dyn GatewayTransport> + Send + Sync>;

/// WebSocket transport over rustls, with optional zlib-stream inflation.
pub struct WebSocketTransport {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    zlib: ZlibStream,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            zlib: ZlibStream::new(),
        }
    }

    /// Factory producing a fresh WebSocket transport per socket.
    #[must_use]
    pub fn factory() -> TransportFactory {
        Box::new(|| Box::new(Self::new()))
    }

    fn drop_socket(&mut self) {
        self.writer = None;
        self.reader = None;
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTransport for WebSocketTransport {
    async fn connect(&mut self, url: &str) -> GatewayResult<()> {
        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| GatewayError::timeout("connection"))?
            .map_err(|e| GatewayError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.zlib.reset();

        debug!("WebSocket connected");
        Ok(())
    }

    async fn send(&mut self, payload: &GatewayPayload) -> GatewayResult<()> {
        let writer = self.writer.as_mut().ok_or(GatewayError::NotConnected)?;

        let json = serde_json::to_string(payload)
            .map_err(|e| GatewayError::serialization(e.to_string()))?;

        writer
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| GatewayError::websocket(e.to_string()))
    }

    async fn receive(&mut self) -> GatewayResult<TransportEvent> {
        loop {
            let reader = self.reader.as_mut().ok_or(GatewayError::NotConnected)?;

            match reader.next().await {
                Some(Ok(WsMessage::Binary(data))) => {
                    if let Some(json) = self.zlib.push(&data)? {
                        trace!(len = json.len(), "Inflated gateway frame");
                        return Ok(parse_frame(&json));
                    }
                }
                Some(Ok(WsMessage::Text(text))) => {
                    return Ok(parse_frame(&text));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    self.drop_socket();
                    let code = frame.map(|f| u16::from(f.code));
                    return Ok(TransportEvent::Closed(code));
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => {
                    self.drop_socket();
                    return Err(GatewayError::websocket(e.to_string()));
                }
                None => {
                    self.drop_socket();
                    return Ok(TransportEvent::Closed(None));
                }
            }
        }
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        self.reader = None;
        self.zlib.reset();
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        let sent = writer.send(WsMessage::Close(Some(frame))).await;
        let closed = writer.close().await;
        sent.and(closed)
            .map_err(|e| GatewayError::websocket(e.to_string()))?;

        debug!(code, "WebSocket closed locally");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }
}

fn parse_frame(json: &str) -> TransportEvent {
    GatewayMessage::parse(json).map_or_else(
        |e| TransportEvent::Malformed(e.to_string()),
        TransportEvent::Frame,
    )
}
