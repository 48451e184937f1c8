//! WebSocket transport (requires `ws` feature).
//!
//! HoloPlay Service listens on `ws://localhost:11222/driver` and speaks the
//! nanomsg request/reply WebSocket mapping, so the client must offer the
//! [`DEFAULT_SUBPROTOCOL`](crate::DEFAULT_SUBPROTOCOL) and use binary
//! messages only.

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Writing half of a WebSocket connection.
pub struct WebSocketSink {
    inner: SplitSink<WsStream, Message>,
}

/// Reading half of a WebSocket connection.
pub struct WebSocketSource {
    inner: SplitStream<WsStream>,
}

/// Open a WebSocket connection, optionally offering a subprotocol.
pub async fn connect(
    url: &str,
    subprotocol: Option<&str>,
) -> Result<(WebSocketSink, WebSocketSource)> {
    let connect_error = |reason: String| TransportError::Connect {
        url: url.to_string(),
        reason,
    };

    let mut request = url
        .into_client_request()
        .map_err(|err| connect_error(err.to_string()))?;
    if let Some(protocol) = subprotocol {
        let value = HeaderValue::from_str(protocol)
            .map_err(|err| connect_error(format!("invalid subprotocol: {err}")))?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    }

    let (stream, response) = connect_async(request)
        .await
        .map_err(|err| connect_error(err.to_string()))?;
    info!(url, status = %response.status(), "websocket connected");

    let (sink, source) = stream.split();
    Ok((
        WebSocketSink { inner: sink },
        WebSocketSource { inner: source },
    ))
}

impl FrameSink for WebSocketSink {
    async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        trace!(len = frame.len(), "websocket send");
        self.inner.send(Message::binary(frame)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}

impl FrameSource for WebSocketSource {
    async fn next_frame(&mut self) -> Option<Result<Bytes>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Binary(data)) => return Some(Ok(Bytes::from(data))),
                Ok(Message::Text(text)) => {
                    debug!(len = text.len(), "ignoring text message");
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "websocket closed by peer");
                    return None;
                }
                // Ping/pong are answered by tungstenite.
                Ok(_) => {}
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

impl std::fmt::Debug for WebSocketSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSink").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for WebSocketSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSource").finish_non_exhaustive()
    }
}
